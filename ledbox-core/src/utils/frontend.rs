//! Door-lock web UI, served uncompressed.

pub(crate) const HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Door lock</title>
<style>
body { font-family: sans-serif; max-width: 28rem; margin: 2rem auto; }
button { margin: 0.2rem; }
#status { font-weight: bold; }
li { font-family: monospace; }
</style>
</head>
<body>
<h1>Door lock</h1>
<p id="status">connecting...</p>
<button id="toggle">Lock / unlock</button>
<button id="refresh">Refresh</button>
<h2>Add the tag on the reader</h2>
<input id="name" maxlength="31" placeholder="Name">
<button id="add">Add</button>
<h2>Registered tags</h2>
<ul id="tags"></ul>
<p id="error"></p>
<script src="/script.js"></script>
</body>
</html>
"#;

pub(crate) const JAVA: &str = r#"const ws = new WebSocket(`ws://${location.host}/ws`, "messages");
const $ = (id) => document.getElementById(id);
const send = (cmd) => ws.send(JSON.stringify(cmd));

function refresh() {
  send({ lc: "status" });
  send({ lc: "list_tags" });
}

ws.onopen = refresh;
ws.onclose = () => { $("status").textContent = "disconnected"; };
ws.onmessage = (ev) => {
  let msg;
  try { msg = JSON.parse(ev.data); } catch (_) { return; }
  $("error").textContent = "";
  switch (msg.reply) {
    case "status":
      $("status").textContent =
        (msg.locked ? "locked" : "unlocked") +
        (msg.tag_present ? (msg.valid_tag_present ? ", valid tag" : ", unknown tag") : "");
      break;
    case "tags":
      $("tags").replaceChildren(...msg.tags.map((t) => {
        const li = document.createElement("li");
        const del = document.createElement("button");
        del.textContent = "remove";
        del.onclick = () => { send({ lc: "remove_tag", uid: t.uid }); send({ lc: "list_tags" }); };
        li.append(`${t.uid} ${t.name} `, del);
        return li;
      }));
      break;
    case "ok":
      refresh();
      break;
    case "error":
      $("error").textContent = msg.reason.replaceAll("_", " ");
      break;
  }
};

$("toggle").onclick = () => send({ lc: "toggle_lock" });
$("refresh").onclick = refresh;
$("add").onclick = () => send({ lc: "add_tag", name: $("name").value });
"#;

//! Door lock state machine.
//!
//! Every input, whether from the RFID reader, the close timer or the web UI,
//! arrives as a [`DoorEvent`] and goes through [`DoorLock::dispatch`]. The
//! door task owns the lock, so nothing else touches its flags.

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, mutex::Mutex};
use embassy_time::{with_deadline, Duration, Instant};
use embedded_hal::pwm::SetDutyCycle;
use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use super::{
    tags::{parse_uid, TagEntry, TagList, Uid, UidHex, MAX_TAGS},
    LockError,
};
use crate::utils::{config::DoorConfig, controllers::servo::Servo};

/// Events for the door task.
pub static LOCK_CHANNEL: Channel<CriticalSectionRawMutex, DoorEvent, 8> = Channel::new();

/// Replies to [`DoorEvent::Web`], tagged with the request id.
pub static REPLY_CHANNEL: Channel<CriticalSectionRawMutex, (u32, LockReply), 1> = Channel::new();

/// Serializes web requests and hands out their ids.
static NEXT_REQUEST: Mutex<CriticalSectionRawMutex, u32> = Mutex::new(0);

/// Commands sent by the web UI, tagged with `"lc"`.
///
/// ```json
/// {"lc":"add_tag","name":"Front door"}
/// {"lc":"remove_tag","uid":"E3 59 28 F7"}
/// {"lc":"toggle_lock"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "lc", rename_all = "snake_case")]
pub enum LockCommand {
    /// Register the tag currently on the reader.
    AddTag { name: String<64> },
    RemoveTag { uid: String<32> },
    ToggleLock,
    ListTags,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum LockReply {
    Ok,
    Tags {
        tags: Vec<TagEntry, MAX_TAGS>,
    },
    Status {
        locked: bool,
        tag_present: bool,
        valid_tag_present: bool,
        close_pending: bool,
    },
    Error {
        reason: LockError,
    },
}

impl From<Result<(), LockError>> for LockReply {
    fn from(r: Result<(), LockError>) -> Self {
        match r {
            Ok(()) => LockReply::Ok,
            Err(reason) => LockReply::Error { reason },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoorEvent {
    /// A card became active on the reader.
    TagDetected(Uid),
    /// The active card left the field.
    TagRemoved,
    /// The delay returned by [`Effect::ScheduleClose`] has passed.
    CloseTimerElapsed,
    /// A web command; the reply carries the same `id`.
    Web { id: u32, cmd: LockCommand },
}

/// What the caller has to do after a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Idle,
    /// Send [`DoorEvent::CloseTimerElapsed`] after this many milliseconds.
    ScheduleClose(u32),
    Reply(LockReply),
}

pub struct DoorLock<P> {
    servo: Servo<P>,
    tags: TagList,
    config: DoorConfig,
    current: Option<Uid>,
    tag_present: bool,
    valid_tag_present: bool,
    close_pending: bool,
    locked: bool,
}

impl<P: SetDutyCycle> DoorLock<P> {
    /// Take the servo, drive it to the closed position and start unlocked
    /// with the seeded tag list.
    pub fn new(
        pwm: P,
        config: DoorConfig,
    ) -> Result<Self, P::Error> {
        let mut servo = Servo::new(pwm);
        servo.set_angle(config.closed_angle())?;
        Ok(Self {
            servo,
            tags: TagList::seeded(),
            config,
            current: None,
            tag_present: false,
            valid_tag_present: false,
            close_pending: false,
            locked: false,
        })
    }

    pub fn tags(&self) -> &TagList {
        &self.tags
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn servo_angle(&self) -> u16 {
        self.servo.angle()
    }

    pub fn status(&self) -> LockReply {
        LockReply::Status {
            locked: self.locked,
            tag_present: self.tag_present,
            valid_tag_present: self.valid_tag_present,
            close_pending: self.close_pending,
        }
    }

    fn open(&mut self) -> Result<(), P::Error> {
        tracing::info!("opening door");
        self.servo.set_angle(self.config.open_angle())
    }

    fn close(&mut self) -> Result<(), P::Error> {
        tracing::info!("closing door");
        self.servo.set_angle(self.config.closed_angle())
    }

    pub fn dispatch(
        &mut self,
        event: DoorEvent,
    ) -> Result<Effect, P::Error> {
        match event {
            DoorEvent::TagDetected(uid) => {
                self.tag_present = true;
                let valid = self.tags.contains(&uid);
                tracing::info!(uid = %UidHex(&uid), valid, "tag detected");
                self.current = Some(uid);
                if valid {
                    self.valid_tag_present = true;
                    if !self.locked {
                        self.open()?;
                    }
                }
                Ok(Effect::Idle)
            }
            DoorEvent::TagRemoved => {
                tracing::info!("tag removed");
                self.tag_present = false;
                self.valid_tag_present = false;
                self.current = None;
                if self.close_pending || self.locked {
                    return Ok(Effect::Idle);
                }
                self.close_pending = true;
                Ok(Effect::ScheduleClose(self.config.close_delay_ms))
            }
            DoorEvent::CloseTimerElapsed => {
                if !self.tag_present {
                    self.close()?;
                }
                self.close_pending = false;
                Ok(Effect::Idle)
            }
            DoorEvent::Web { cmd, .. } => self.command(cmd).map(Effect::Reply),
        }
    }

    fn command(
        &mut self,
        cmd: LockCommand,
    ) -> Result<LockReply, P::Error> {
        tracing::debug!(?cmd, "web command");
        let reply = match cmd {
            LockCommand::AddTag { name } => self.add_current(&name).into(),
            LockCommand::RemoveTag { uid } => self.remove(&uid).into(),
            LockCommand::ToggleLock => {
                if self.locked {
                    self.locked = false;
                    tracing::info!("door unlocked");
                } else {
                    self.close()?;
                    self.locked = true;
                    tracing::info!("door locked");
                }
                self.status()
            }
            LockCommand::ListTags => LockReply::Tags {
                tags: self.tags.iter().cloned().collect(),
            },
            LockCommand::Status => self.status(),
        };
        Ok(reply)
    }

    fn add_current(
        &mut self,
        name: &str,
    ) -> Result<(), LockError> {
        let uid = match &self.current {
            Some(uid) if self.tag_present => uid.clone(),
            _ => return Err(LockError::NoTagPresent),
        };
        if self.valid_tag_present {
            return Err(LockError::TagAlreadyValid);
        }
        self.tags.add(uid, name)?;
        tracing::info!(tag = name, "tag added");
        Ok(())
    }

    fn remove(
        &mut self,
        uid: &str,
    ) -> Result<(), LockError> {
        let uid = parse_uid(uid).ok_or(LockError::InvalidUid)?;
        let entry = self.tags.remove(&uid)?;
        tracing::info!(tag = entry.name.as_str(), "tag removed from list");
        Ok(())
    }
}

/// Send a web command to the door task and wait for its reply.
///
/// A caller dropped while waiting leaves its reply in [`REPLY_CHANNEL`];
/// the next caller skips it by id.
pub async fn request(cmd: LockCommand) -> LockReply {
    let mut next = NEXT_REQUEST.lock().await;
    let id = *next;
    *next = next.wrapping_add(1);
    LOCK_CHANNEL.send(DoorEvent::Web { id, cmd }).await;
    loop {
        let (reply_id, reply) = REPLY_CHANNEL.receive().await;
        if reply_id == id {
            return reply;
        }
        tracing::warn!(reply_id, id, "dropping stale door reply");
    }
}

/// Door task: owns the lock and runs the close timer.
pub async fn run<P: SetDutyCycle>(mut door: DoorLock<P>) -> ! {
    let mut close_at: Option<Instant> = None;
    loop {
        let event = match close_at {
            Some(at) => match with_deadline(at, LOCK_CHANNEL.receive()).await {
                Ok(event) => event,
                Err(_) => {
                    close_at = None;
                    DoorEvent::CloseTimerElapsed
                }
            },
            None => LOCK_CHANNEL.receive().await,
        };

        let web_id = match &event {
            DoorEvent::Web { id, .. } => Some(*id),
            _ => None,
        };
        match (door.dispatch(event), web_id) {
            (Ok(Effect::ScheduleClose(ms)), _) => {
                close_at = Some(Instant::now() + Duration::from_millis(ms as u64));
            }
            (Ok(Effect::Reply(reply)), Some(id)) => REPLY_CHANNEL.send((id, reply)).await,
            (Ok(_), _) => {}
            (Err(e), id) => {
                tracing::error!(?e, "servo error");
                if let Some(id) = id {
                    let reply = LockReply::Error {
                        reason: LockError::ServoFault,
                    };
                    REPLY_CHANNEL.send((id, reply)).await;
                }
            }
        }
    }
}

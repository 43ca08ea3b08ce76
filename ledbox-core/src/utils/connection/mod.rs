//! Module Exports
//!
//! Network-facing pieces of the board.
//!
//! # Modules
//! - `server`: HTTP + WebSocket server for the door-lock web UI.
//! - `publish`: formats sensor readings and hands them to the broker client.
//! - `softap`: access point settings and station events.

pub mod publish;
/// Module for managing the WebSocket server, including routes and connection
/// handling.
pub mod server;
pub mod softap;

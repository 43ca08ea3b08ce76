//! RFID door lock.
//!
//! - `tags`: the list of tags allowed to open the door
//! - `door`: lock state machine, web commands and the door task

pub mod door;
pub mod tags;

use serde::Serialize;

/// Why a web command was refused. Sent back to the browser as snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockError {
    NoTagPresent,
    TagAlreadyValid,
    TagAlreadyRegistered,
    TagListFull,
    TagNotFound,
    InvalidUid,
    /// The servo driver failed while handling the command.
    ServoFault,
}

impl From<tags::TagListError> for LockError {
    fn from(e: tags::TagListError) -> Self {
        match e {
            tags::TagListError::Duplicate => LockError::TagAlreadyRegistered,
            tags::TagListError::Full => LockError::TagListFull,
            tags::TagListError::NotFound => LockError::TagNotFound,
        }
    }
}

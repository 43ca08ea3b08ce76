//! Utility re-exports and helper macros for the LED-matrix board.
//!
//! - `config`: serde-backed settings for the access point, broker, door and games
//! - `connection`: web UI server for the door lock and the sensor-to-broker bridge
//! - `controllers`: LED strip, buttons, servo and sensor drivers
//! - `games`: snake, dice, egg timer and reaction game state machines
//! - `lock`: RFID tag list and door lock state machine
//! - `math`: grid addressing for the LED matrix
//! - `frontend`: HTML/JS assets for the door-lock web UI
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod config;
pub mod connection;
pub mod controllers;
pub(crate) mod frontend;
pub mod games;
pub mod lock;
pub mod math;

pub use connection::server::run as wss;
pub use embassy_time::*;
pub use games::snake::SnakeGame;
pub use lock::door::DoorLock;
pub use math::grid::Grid;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}

//! Core logic for the 5x5 LED-matrix demo board on no-std embedded platforms.
//!
//! Games, the RFID door lock and the sensor bridge are written against
//! `embedded-hal` and `smart-leds-trait`, so the same code runs on the MCU and
//! on the host simulator in `ledbox-app/mock-mcu`.
#![no_std]

pub mod utils;

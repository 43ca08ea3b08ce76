//! Math utilities for the LED matrix.
//!
//! This module provides linear-index <-> (row, column) addressing for the grid.

pub mod grid;

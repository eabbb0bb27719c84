//! Analysis Layer
//!
//! Turns raw display text into validated readings.

pub mod reading;

pub use reading::{parse_time, FieldError, Reading};

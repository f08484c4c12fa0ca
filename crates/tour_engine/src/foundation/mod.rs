//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and distance helpers
//! - Monotonic clocks for preload timers
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;

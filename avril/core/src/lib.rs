#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # Avril Core
//!
//! Core types and traits for the avril support library for 8-bit AVR
//! microcontrollers. This crate provides the error model, the tick
//! counter used for relative delays, and the task abstraction consumed
//! by the cooperative scheduler.

use core::fmt;

pub mod task;
pub mod tick;

pub use task::*;
pub use tick::*;

/// Avril library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the avril crates
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for avril operations
///
/// Every fallible operation returns one of these instead of calling a
/// global handler; the application decides once, at its boundary, what
/// failure means (typically halt and let the watchdog reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An allocator returned no memory for a mandatory allocation
    BadAlloc,
    /// Index-based access exceeded the container length
    OutOfRange,
    /// A static container would exceed its compile-time capacity
    LengthError,
    /// A cursor or position no longer refers to a live element
    NullPointer,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadAlloc => write!(f, "allocation failed"),
            Error::OutOfRange => write!(f, "index out of range"),
            Error::LengthError => write!(f, "static capacity exceeded"),
            Error::NullPointer => write!(f, "dangling cursor"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::BadAlloc => defmt::write!(fmt, "BadAlloc"),
            Error::OutOfRange => defmt::write!(fmt, "OutOfRange"),
            Error::LengthError => defmt::write!(fmt, "LengthError"),
            Error::NullPointer => defmt::write!(fmt, "NullPointer"),
        }
    }
}

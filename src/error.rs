//! Errors reported by peripheral operations
//!
//! Failures to acquire hardware resources during initialization are not
//! errors: the board description is authoritative, so a missing mandatory pin
//! or an unobtainable GPIO line is a programming error and the affected code
//! panics with a message naming the pin and peripheral.

/// An error that can occur while operating a peripheral
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The operation's hardware precondition does not hold
    ///
    /// Returned by `power_on` when the status line already reports "on", and
    /// by `power_off` when it already reports "off". Nothing was driven.
    NoDevice,

    /// A status wait ended with the line at the wrong level
    ///
    /// The requested pulse sequence was fully driven, but the status line did
    /// not reach the expected value within the timeout. Whether to retry is
    /// up to the caller.
    StatusTimeout,

    /// The requested state transition is not allowed from the current state
    InvalidTransition,

    /// The peripheral is already in the requested state
    SameState,

    /// The requested state name is not in the peripheral's state table
    UnknownState,

    /// The command queue is full; nothing was enqueued
    QueueFull,

    /// The registry has no room for another peripheral
    RegistryFull,

    /// A written value could not be parsed
    InvalidValue,

    /// Attempt to write the value of an input pin
    NotAnOutput,

    /// No attribute with the given name exists on this peripheral
    NoSuchAttribute,

    /// The peripheral has no status pin, so status supervision is impossible
    NoStatusPin,
}

impl Error {
    /// The errno-style code delivered through command completions
    ///
    /// Zero is success; negative values mirror the usual errno assignments;
    /// positive `1` is the transient "sequence ran, status wrong" outcome.
    pub fn code(self) -> i32 {
        match self {
            Error::NoDevice => -19,          // ENODEV
            Error::StatusTimeout => 1,
            Error::InvalidTransition => -22, // EINVAL
            Error::SameState => -11,         // EAGAIN
            Error::UnknownState => -2,       // ENOENT
            Error::QueueFull => -12,         // ENOMEM
            Error::RegistryFull => -12,      // ENOMEM
            Error::InvalidValue => -22,      // EINVAL
            Error::NotAnOutput => -22,       // EINVAL
            Error::NoSuchAttribute => -2,    // ENOENT
            Error::NoStatusPin => -2,        // ENOENT
        }
    }
}

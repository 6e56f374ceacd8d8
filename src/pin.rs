//! Pin model
//!
//! A peripheral is described as an ordered set of GPIO lines, each carrying
//! direction, polarity and a logical *function* tag. The function is what the
//! driver core works in terms of: a power-on sequence drives "the power key",
//! not "pin 23", and the board description decides which physical line that
//! is on a given hardware revision.

use crate::hw::{EdgeFlag, Hardware};

/// Maximum number of pins a single peripheral may declare
pub const MAX_PINS: usize = 32;

/// The logical role a pin plays for its peripheral
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinFunction {
    /// No driver-visible role; the pin is exposed through its attribute only
    None,
    /// Controls a switch that can cut the device's supply entirely
    Power,
    /// Drives the device's own power-key input
    PowerKey,
    /// Reports whether the device is running
    Status,
    /// Drives the device's reset input
    Reset,
}

/// Electrical direction and initial configuration of a pin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Input pin
    Input {
        /// Enable the internal pull-up
        pull_up: bool,
        /// Enable the input deglitch filter
        deglitch: bool,
    },
    /// Output pin
    Output {
        /// Level to drive immediately after configuration
        init_high: bool,
    },
}

/// Which raw electrical level represents logical "1" for a pin
///
/// Polarity is applied only when interpreting or emitting logical values.
/// Raw reads and raw writes (the per-pin attribute surface) are never
/// corrected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveLevel {
    /// High level is active
    High,
    /// Low level is active
    Low,
}

/// One GPIO line of a peripheral, as declared by the board description
#[derive(Clone, Copy)]
pub struct PinDesc {
    /// Hardware pin identifier, passed through to [`Hardware`]
    pub pin_no: u16,
    /// Human-readable role description, e.g. `"sim900 status pin"`
    pub description: &'static str,
    /// Net name from the schematics, e.g. `"STATUS_GSM"`; also the name of
    /// the pin's attribute
    pub schematics_name: &'static str,
    /// Logical function of the pin
    pub function: PinFunction,
    /// Direction and initial configuration
    pub direction: Direction,
    /// Polarity of the pin
    pub active: ActiveLevel,
    /// When present, level changes on this pin raise the flag and generate
    /// an attribute-change notification
    pub edge_notify: Option<&'static EdgeFlag>,
}

impl PinDesc {
    /// Returns whether the pin is configured as an input
    pub fn is_input(&self) -> bool {
        matches!(self.direction, Direction::Input { .. })
    }
}

/// Applies pin polarity to a value
///
/// Maps a raw level to the logical value it represents, and a logical value
/// to the raw level that represents it; the correction is its own inverse.
pub fn active_value(pin: &PinDesc, value: bool) -> bool {
    (pin.active == ActiveLevel::Low) != value
}

/// Claims and configures a pin
///
/// Failure to acquire the line is fatal: the board description said the pin
/// exists, so there is no way to continue that leaves the hardware in a
/// usable state.
pub(crate) fn request<P: Hardware>(hw: &mut P, pin: &PinDesc, owner: &'static str) {
    if let Err(e) = hw.gpio_request(pin.pin_no, pin.schematics_name) {
        panic!(
            "failed to request pin {} #{} of {}: {:?}",
            pin.schematics_name, pin.pin_no, owner, e
        );
    }

    match pin.direction {
        Direction::Input { pull_up, deglitch } => {
            hw.gpio_into_input(pin.pin_no, pull_up);
            hw.gpio_set_deglitch(pin.pin_no, deglitch);
        }
        Direction::Output { init_high } => {
            hw.gpio_into_output(pin.pin_no, init_high);
        }
    }
}

//! Platform interface consumed by the driver core
//!
//! The driver core never touches hardware directly. Everything it needs from
//! the platform — GPIO primitives, interrupt registration and millisecond
//! delays — is collected in the [`Hardware`] trait, so the same core runs on
//! any HAL that can provide these operations, and on a mock implementation in
//! tests.
//!
//! Interrupt delivery follows a strict handoff contract: an interrupt handler
//! may not allocate, sleep or touch GPIO. The only thing a handler is allowed
//! to do is raise a pre-allocated [`EdgeFlag`], which the peripheral's worker
//! consumes the next time it runs.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::blocking::delay::DelayMs;

/// An interrupt line, as reported by [`Hardware::gpio_to_irq`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IrqLine(pub u32);

/// Which signal edges an interrupt registration fires on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeTrigger {
    /// Low-to-high transitions only
    Rising,
    /// High-to-low transitions only
    Falling,
    /// Both transitions
    Both,
}

/// A pre-allocated, wait-free work descriptor for interrupt handoff
///
/// One `EdgeFlag` is allocated per interrupt source, statically, before the
/// interrupt is ever enabled. The host's interrupt handler calls [`raise`] and
/// returns; the owning peripheral's worker picks the event up with [`take`].
/// Both operations are single atomic accesses, so the handler side is safe in
/// any context.
///
/// Coalescing is intentional: if the line bounces several times before the
/// worker runs, the worker sees one event. The worker re-reads the actual
/// status level anyway, so no information is lost.
///
/// [`raise`]: EdgeFlag::raise
/// [`take`]: EdgeFlag::take
pub struct EdgeFlag(AtomicBool);

impl EdgeFlag {
    /// Creates a lowered flag
    pub const fn new() -> Self {
        EdgeFlag(AtomicBool::new(false))
    }

    /// Marks the event as pending
    ///
    /// Safe to call from interrupt context.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consumes a pending event, if any
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Returns whether an event is pending without consuming it
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Platform operations required by the driver core
///
/// Pin numbers are the opaque hardware identifiers from the board
/// description; the implementation maps them onto its GPIO controller.
///
/// The `DelayMs` supertrait provides the blocking sleeps used by the
/// sequence engine. They are always executed from a worker context, never
/// from an interrupt handler.
pub trait Hardware: DelayMs<u32> {
    /// Error returned by fallible acquisition operations
    type Error: core::fmt::Debug;

    /// Claims a GPIO line for exclusive use, under the given label
    fn gpio_request(&mut self, pin: u16, label: &'static str) -> Result<(), Self::Error>;

    /// Releases a previously claimed GPIO line
    fn gpio_release(&mut self, pin: u16);

    /// Programs a line as an input, optionally with the internal pull-up
    fn gpio_into_input(&mut self, pin: u16, pull_up: bool);

    /// Programs a line as an output at the given initial level
    fn gpio_into_output(&mut self, pin: u16, init_high: bool);

    /// Enables or disables the input deglitch filter on a line
    fn gpio_set_deglitch(&mut self, pin: u16, enable: bool);

    /// Reads the raw electrical level of a line
    fn gpio_read(&mut self, pin: u16) -> bool;

    /// Drives the raw electrical level of an output line
    fn gpio_write(&mut self, pin: u16, high: bool);

    /// Maps a line to its interrupt, if the line can generate one
    fn gpio_to_irq(&mut self, pin: u16) -> Option<IrqLine>;

    /// Registers an edge interrupt that raises `flag` when it fires
    ///
    /// The flag reference is `'static` because the interrupt may outlive any
    /// particular borrow of the peripheral that registered it.
    fn irq_register(
        &mut self,
        irq: IrqLine,
        trigger: EdgeTrigger,
        flag: &'static EdgeFlag,
        label: &'static str,
    ) -> Result<(), Self::Error>;

    /// Releases an interrupt registration
    fn irq_release(&mut self, irq: IrqLine);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_flag_take_consumes() {
        let flag = EdgeFlag::new();
        assert!(!flag.take());

        flag.raise();
        assert!(flag.is_raised());
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn edge_flag_coalesces() {
        let flag = EdgeFlag::new();
        flag.raise();
        flag.raise();
        assert!(flag.take());
        assert!(!flag.take());
    }
}

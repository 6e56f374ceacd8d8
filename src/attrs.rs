//! The attribute surface
//!
//! Each peripheral exposes a small directory of named attributes: the five
//! command attributes every peripheral has (`status`, `power_on`,
//! `power_off`, `reset`, `check_and_power_on`) plus one attribute per pin,
//! named after the pin's schematics name. The host adapts this to whatever
//! its user-facing filesystem looks like; the core only formats, parses and
//! dispatches.
//!
//! Reads are synchronous. Writes that trigger a command return the command's
//! [`Completion`] so the host can let its caller block on it; the command
//! itself runs later, on the peripheral's worker. Pin writes take effect
//! immediately and touch the raw electrical level — polarity correction is a
//! driver concern, not a surface concern.

use core::fmt::{self, Write as _};

use crate::error::Error;
use crate::hw::Hardware;
use crate::periph::Peripheral;
use crate::queue::{CommandKind, Completion};
use crate::state;

/// What a successful attribute write resulted in
pub enum StoreOutcome {
    /// The write took effect immediately
    Done,
    /// The write enqueued a command; await the completion for its result
    Queued(Completion),
}

struct SliceWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        if self.len + bytes.len() > self.buf.len() {
            return Err(fmt::Error);
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }
}

fn first_token(buf: &[u8]) -> Option<&str> {
    core::str::from_utf8(buf).ok()?.split_whitespace().next()
}

impl<P: Hardware> Peripheral<P> {
    /// Reads the attribute `name` into `out`, returning the byte count
    ///
    /// `status` reports `on`/`off`, or the current state name when the
    /// device has a state table. The command attributes read back empty. A
    /// pin attribute reports the pin's raw level.
    pub fn attr_show(&self, hw: &mut P, name: &str, out: &mut [u8]) -> Result<usize, Error> {
        let mut w = SliceWriter { buf: out, len: 0 };

        match name {
            "status" => {
                let written = match self.state_table() {
                    Some(table) => {
                        let state_name = state::name_of(table, self.current_state())
                            .unwrap_or("unknown");
                        writeln!(w, "{}", state_name)
                    }
                    None => writeln!(w, "{}", if self.status(hw) { "on" } else { "off" }),
                };
                written.map_err(|_| Error::InvalidValue)?;
                Ok(w.len)
            }
            "power_on" | "power_off" | "reset" | "check_and_power_on" => Ok(0),
            _ => {
                let desc = self.pin_by_name(name).ok_or(Error::NoSuchAttribute)?;
                writeln!(w, "{}", hw.gpio_read(desc.pin_no) as u8)
                    .map_err(|_| Error::InvalidValue)?;
                Ok(w.len)
            }
        }
    }

    /// Writes `buf` to the attribute `name`
    ///
    /// Any write to a command attribute enqueues the corresponding command.
    /// A write to `status` on a peripheral with a state table parses a state
    /// name and enqueues the transition; without a state table it is
    /// accepted and ignored. A write to an output pin's attribute drives the
    /// raw level immediately; input pins reject writes.
    pub fn attr_store(
        &mut self,
        hw: &mut P,
        name: &str,
        buf: &[u8],
    ) -> Result<StoreOutcome, Error> {
        match name {
            "power_on" => Ok(StoreOutcome::Queued(self.enqueue(CommandKind::PowerOn)?)),
            "power_off" => Ok(StoreOutcome::Queued(self.enqueue(CommandKind::PowerOff)?)),
            "reset" => Ok(StoreOutcome::Queued(self.enqueue(CommandKind::Reset)?)),
            "check_and_power_on" => Ok(StoreOutcome::Queued(
                self.enqueue(CommandKind::CheckAndPowerOn)?,
            )),
            "status" => {
                let table = match self.state_table() {
                    Some(t) => t,
                    // Nothing to transition; the write is accepted as-is.
                    None => return Ok(StoreOutcome::Done),
                };
                let requested = first_token(buf).ok_or(Error::InvalidValue)?;
                log::debug!("{}: got request for state {}", self.name(), requested);
                let target =
                    state::lookup_by_name(table, requested).ok_or(Error::UnknownState)?;
                Ok(StoreOutcome::Queued(
                    self.enqueue_arg(CommandKind::StateTransition, target as i32)?,
                ))
            }
            _ => {
                let desc = self.pin_by_name(name).ok_or(Error::NoSuchAttribute)?;
                if desc.is_input() {
                    log::error!("not allowing to set value of input pin {}", name);
                    return Err(Error::NotAnOutput);
                }
                let value: i32 = first_token(buf)
                    .and_then(|t| t.parse().ok())
                    .ok_or(Error::InvalidValue)?;
                hw.gpio_write(desc.pin_no, value != 0);
                Ok(StoreOutcome::Done)
            }
        }
    }

    /// Delivers pending change notifications for pins that request them
    ///
    /// For every pin whose edge flag has been raised since the last call,
    /// `emit` receives the pin's attribute name. The host forwards this to
    /// whatever wakes its attribute pollers.
    pub fn poll_notifications<F: FnMut(&'static str)>(&mut self, mut emit: F) {
        for p in self.pins.iter() {
            if let Some(flag) = p.desc.edge_notify {
                if flag.take() {
                    emit(p.desc.schematics_name);
                }
            }
        }
    }
}

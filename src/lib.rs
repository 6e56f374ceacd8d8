//! Driver core for GPIO-controlled board peripherals
//!
//! Many board-level devices — GSM modems, GNSS receivers, power-management
//! ICs — are operated entirely through a handful of GPIO lines: a supply
//! switch, a pulse-driven power key, a status output, sometimes a reset
//! input. Bringing such a device up or down means driving a timed pulse
//! diagram on those lines and watching the status line settle.
//!
//! This crate turns a declarative board description ([`PeriphDesc`] plus
//! [`PinDesc`]s) into live [`Peripheral`] objects that accept a small command
//! vocabulary — power-on, power-off, reset, check-and-power-on, state
//! transition — serialized through a per-peripheral queue and executed by the
//! timed [sequence engine](seq). A status-edge interrupt can be hooked up to
//! keep a device powered: whenever the status line drops, the core schedules
//! a check and powers the device back on.
//!
//! The crate is `no_std` and hardware-agnostic: everything it needs from the
//! platform is behind the [`Hardware`] trait, and blocking delays come from
//! `embedded_hal`. Command completions are awaited `nb`-style.
//!
//! # Usage
//!
//! The host provides three things: a `Hardware` implementation, static
//! storage per peripheral ([`PeriphStatics`]), and a worker context that
//! calls [`Peripheral::service`] — a thread, an RTOS task, or a main-loop
//! slot. Interrupt handlers only ever raise [`EdgeFlag`]s.
//!
//! ```ignore
//! static GSM_STATICS: PeriphStatics = PeriphStatics::new();
//!
//! let mut registry: Registry<Board, 3> = Registry::new();
//! let gsm = registry.add(&GSM_DESC, &GSM_STATICS, &mut board)?;
//!
//! // user-facing surface
//! let mut done = match gsm.attr_store(&mut board, "power_on", b"1\n")? {
//!     StoreOutcome::Queued(c) => c,
//!     StoreOutcome::Done => return Ok(()),
//! };
//!
//! // worker context
//! registry.service_all(&mut board);
//! let code = nb::block!(done.wait())?;
//! ```

#![no_std]
#![warn(missing_docs)]

#[cfg(test)]
extern crate std;

pub mod attrs;
pub mod devices;
pub mod error;
pub mod hw;
pub mod periph;
pub mod pin;
pub mod queue;
pub mod registry;
pub mod seq;
pub mod state;

#[cfg(test)]
pub(crate) mod mock;

pub use crate::attrs::StoreOutcome;
pub use crate::error::Error;
pub use crate::hw::{EdgeFlag, EdgeTrigger, Hardware, IrqLine};
pub use crate::periph::{DeviceKind, DeviceModel, PeriphDesc, PeriphStatics, Peripheral};
pub use crate::pin::{ActiveLevel, Direction, PinDesc, PinFunction, MAX_PINS};
pub use crate::queue::{CommandKind, CommandQueue, Completion, COMMAND_SLOTS};
pub use crate::registry::Registry;
pub use crate::seq::{Step, STATUS_POLL_INTERVAL_MS};
pub use crate::state::{DeviceState, StateDesc};

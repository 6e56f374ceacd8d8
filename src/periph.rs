//! Peripheral objects and their serialized workers
//!
//! A [`Peripheral`] is the owned, runtime form of a board-description entry:
//! its pins, its device driver, its command queue and its supervision state.
//! All mutable hardware access for one peripheral is funneled through its
//! worker methods ([`process_one`], [`service`]), which the host calls from a
//! single thread or task per peripheral; between peripherals, workers are
//! fully independent.
//!
//! The statically-allocated half of a peripheral lives in [`PeriphStatics`]:
//! the command queue (so completions can outlive any borrow of the
//! peripheral) and the status-edge flag (so the interrupt handler has a
//! stable, wait-free target).
//!
//! [`process_one`]: Peripheral::process_one
//! [`service`]: Peripheral::service

use core::convert::TryFrom;

use heapless::Vec;

use crate::devices::{self, Device};
use crate::error::Error;
use crate::hw::{EdgeFlag, EdgeTrigger, Hardware};
use crate::pin::{self, PinDesc, PinFunction, MAX_PINS};
use crate::queue::{CommandKind, CommandQueue, Completion};
use crate::state::{DeviceState, StateDesc};

/// Broad class of a peripheral
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// Not classified
    Unknown,
    /// Cellular modem
    Gsm,
    /// Satellite navigation receiver
    Gps,
    /// Power-management IC
    Power,
}

/// Which device driver operates a peripheral
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceModel {
    /// SIMCom Sim508 GSM modem
    Sim508,
    /// SIMCom Sim900 GSM modem (with firmware-load states)
    Sim900,
    /// SIMCom Sim900D GSM modem
    Sim900d,
    /// GPS section of the SIMCom Sim508
    GpsSim508,
    /// Transystem EB-500 GPS receiver
    Eb500,
    /// NVS NV08C-CSM GNSS receiver
    Nv08cCsm,
    /// Driver that accepts every command and does nothing
    Stub,
}

/// One peripheral of a board description
///
/// Pure static data; the runtime object is built from it by
/// [`Peripheral::new`].
pub struct PeriphDesc {
    /// Broad class of the device
    pub kind: DeviceKind,
    /// System-wide unique name, e.g. `"gsm"`; names the attribute directory
    pub name: &'static str,
    /// Human-readable model, e.g. `"Sim900 GSM"`
    pub description: &'static str,
    /// The driver to bind
    pub model: DeviceModel,
    /// The peripheral's pins; at most [`MAX_PINS`] are used
    pub pins: &'static [PinDesc],
}

/// Statically allocated shared state of one peripheral
pub struct PeriphStatics {
    /// The peripheral's command queue
    pub queue: CommandQueue,
    /// Raised by the status-pin interrupt while keep-on is installed
    pub status_edge: EdgeFlag,
}

impl PeriphStatics {
    /// Creates the static half of a peripheral
    pub const fn new() -> Self {
        PeriphStatics {
            queue: CommandQueue::new(),
            status_edge: EdgeFlag::new(),
        }
    }
}

pub(crate) struct Pin {
    pub desc: PinDesc,
    pub requested: bool,
}

/// A live peripheral
///
/// Owns its pins, its worker and its interrupt registrations. Constructed
/// once from a board-description entry and released exactly once; releasing
/// drains the command queue first.
pub struct Peripheral<P: Hardware + 'static> {
    pub(crate) desc: &'static PeriphDesc,
    pub(crate) pins: Vec<Pin, MAX_PINS>,
    pub(crate) device: &'static dyn Device<P>,
    pub(crate) queue: &'static CommandQueue,
    pub(crate) status_edge: &'static EdgeFlag,
    pub(crate) state_table: Option<&'static [StateDesc]>,
    pub(crate) current_state: DeviceState,
    pub(crate) keep_on_installed: bool,
}

impl<P: Hardware + 'static> Peripheral<P> {
    /// Builds and sets up a peripheral from its board-description entry
    ///
    /// Requests the general-purpose pins, hooks up change notification for
    /// pins that ask for it, then runs the device driver's setup, which
    /// claims the functional pins and usually enqueues an initial command.
    ///
    /// Panics if a mandatory pin is missing or cannot be acquired; the board
    /// description is authoritative and such a failure is not recoverable.
    pub fn new(
        desc: &'static PeriphDesc,
        statics: &'static PeriphStatics,
        hw: &mut P,
    ) -> Result<Self, Error> {
        let mut pins = Vec::new();
        for d in desc.pins.iter().take(MAX_PINS) {
            // Capacity equals the take() bound, so this cannot fail.
            let _ = pins.push(Pin {
                desc: *d,
                requested: false,
            });
        }

        let mut periph = Peripheral {
            desc,
            pins,
            device: devices::device_for::<P>(desc.model),
            queue: &statics.queue,
            status_edge: &statics.status_edge,
            state_table: None,
            current_state: DeviceState::Off,
            keep_on_installed: false,
        };

        periph.configure_general_pins(hw);
        periph.register_notify_irqs(hw);

        let device = periph.device;
        device.setup(&mut periph, hw)?;

        log::info!("peripheral {} ({}) added", desc.name, desc.description);
        Ok(periph)
    }

    /// The peripheral's unique name
    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    /// The peripheral's human-readable description
    pub fn description(&self) -> &'static str {
        self.desc.description
    }

    /// The peripheral's class
    pub fn kind(&self) -> DeviceKind {
        self.desc.kind
    }

    /// The state the peripheral last successfully entered
    pub fn current_state(&self) -> DeviceState {
        self.current_state
    }

    /// The peripheral's state table, if its driver installed one
    pub fn state_table(&self) -> Option<&'static [StateDesc]> {
        self.state_table
    }

    /// Installs a state table; called by drivers that accept named
    /// transitions through the status attribute
    pub fn set_state_table(&mut self, table: &'static [StateDesc]) {
        self.state_table = Some(table);
    }

    /// The flag the host's status-pin interrupt handler must raise
    pub fn status_edge(&self) -> &'static EdgeFlag {
        self.status_edge
    }

    pub(crate) fn set_current_state(&mut self, state: DeviceState) {
        self.current_state = state;
    }

    /// Refreshes `current_state` from the status line
    ///
    /// Suppressed while keep-on supervision is installed: there the state is
    /// managed by explicit transitions, and an automatic recovery must not
    /// demote the peripheral out of `KeepOn`.
    pub(crate) fn update_status_state(&mut self, hw: &mut P) {
        if self.keep_on_installed {
            return;
        }
        self.current_state = if self.status(hw) {
            DeviceState::On
        } else {
            DeviceState::Off
        };
    }

    // ---- pin access -------------------------------------------------------

    /// Finds the first pin carrying `function`
    ///
    /// Duplicate function declarations are legal but dead: only the first is
    /// ever used.
    pub fn find_pin(&self, function: PinFunction) -> Option<usize> {
        self.pins.iter().position(|p| p.desc.function == function)
    }

    /// Returns a copy of the first pin descriptor carrying `function`
    pub fn pin_by_function(&self, function: PinFunction) -> Option<PinDesc> {
        self.find_pin(function).map(|i| self.pins[i].desc)
    }

    pub(crate) fn pin_by_name(&self, name: &str) -> Option<PinDesc> {
        self.pins
            .iter()
            .find(|p| p.desc.schematics_name == name)
            .map(|p| p.desc)
    }

    /// Claims and configures the pin carrying `function`
    ///
    /// A missing mandatory pin panics; a missing optional pin is a no-op.
    pub fn configure_pin(
        &mut self,
        hw: &mut P,
        function: PinFunction,
        mandatory: bool,
    ) -> Option<usize> {
        let index = match self.find_pin(function) {
            Some(i) => i,
            None if mandatory => panic!(
                "couldn't find function {:?} for peripheral {}",
                function, self.desc.name
            ),
            None => return None,
        };

        let desc = self.pins[index].desc;
        pin::request(hw, &desc, self.desc.name);
        self.pins[index].requested = true;
        Some(index)
    }

    fn configure_general_pins(&mut self, hw: &mut P) {
        for i in 0..self.pins.len() {
            let desc = self.pins[i].desc;
            // Functional pins are claimed by the device setup.
            if desc.function != PinFunction::None {
                continue;
            }
            pin::request(hw, &desc, self.desc.name);
            self.pins[i].requested = true;
        }
    }

    fn register_notify_irqs(&mut self, hw: &mut P) {
        for p in self.pins.iter() {
            let desc = p.desc;
            let flag = match desc.edge_notify {
                Some(f) => f,
                None => continue,
            };
            match hw.gpio_to_irq(desc.pin_no) {
                Some(irq) => {
                    if hw
                        .irq_register(irq, EdgeTrigger::Both, flag, desc.schematics_name)
                        .is_err()
                    {
                        log::error!(
                            "couldn't set up change handler for pin {}",
                            desc.schematics_name
                        );
                    }
                }
                None => log::error!("pin {} has no interrupt line", desc.schematics_name),
            }
        }
    }

    /// Drives the logical value of the pin carrying `function`
    ///
    /// Polarity is applied here: the raw level is `value` corrected by the
    /// pin's active level. A missing optional pin is skipped with a log
    /// entry; a missing mandatory pin, or driving an input pin, panics.
    pub fn set_output(&mut self, hw: &mut P, function: PinFunction, value: bool, mandatory: bool) {
        let desc = match self.pin_by_function(function) {
            Some(d) => d,
            None if mandatory => panic!(
                "couldn't find function {:?} for peripheral {}",
                function, self.desc.name
            ),
            None => {
                log::debug!("non-mandatory pin for function {:?} not found", function);
                return;
            }
        };

        if desc.is_input() {
            panic!(
                "tried to drive input pin {} of {}",
                desc.pin_no, self.desc.name
            );
        }

        hw.gpio_write(desc.pin_no, pin::active_value(&desc, value));
    }

    // ---- device operations ------------------------------------------------

    /// Reads the device's logical status: `true` means running
    pub fn status(&self, hw: &mut P) -> bool {
        self.device.status(self, hw)
    }

    /// Runs the device's power-on operation synchronously
    pub fn power_on(&mut self, hw: &mut P) -> Result<(), Error> {
        let device = self.device;
        device.power_on(self, hw)
    }

    /// Runs the device's power-off operation synchronously
    pub fn power_off(&mut self, hw: &mut P) -> Result<(), Error> {
        let device = self.device;
        device.power_off(self, hw)
    }

    /// Runs the device's reset operation synchronously
    pub fn reset(&mut self, hw: &mut P) -> Result<(), Error> {
        let device = self.device;
        device.reset(self, hw)
    }

    /// Powers the device on if its status reports "off"
    pub fn check_and_power_on(&mut self, hw: &mut P) -> Result<(), Error> {
        let device = self.device;
        device.check_and_power_on(self, hw)
    }

    /// Requests a transition to `target` synchronously
    pub fn state_transition(&mut self, hw: &mut P, target: DeviceState) -> Result<(), Error> {
        let device = self.device;
        device.state_transition(self, hw, target)
    }

    // ---- keep-on supervision ----------------------------------------------

    /// Installs keep-on supervision on the status pin
    ///
    /// Registers a both-edges interrupt whose only effect is raising the
    /// status-edge flag; the worker picks the event up and, if the device
    /// reports "off", enqueues a `CheckAndPowerOn`.
    ///
    /// Entering keep-on while already in it is a caller error and returns
    /// [`Error::SameState`] without touching the interrupt registration.
    pub fn install_keep_on(&mut self, hw: &mut P) -> Result<(), Error> {
        let desc = self
            .pin_by_function(PinFunction::Status)
            .ok_or(Error::NoStatusPin)?;

        if self.keep_on_installed || self.current_state == DeviceState::KeepOn {
            log::warn!("{}: don't try to enter keep-on twice", self.desc.name);
            return Err(Error::SameState);
        }

        let irq = match hw.gpio_to_irq(desc.pin_no) {
            Some(irq) => irq,
            None => panic!(
                "status pin {} of {} has no interrupt line",
                desc.pin_no, self.desc.name
            ),
        };
        if hw
            .irq_register(irq, EdgeTrigger::Both, self.status_edge, desc.description)
            .is_err()
        {
            panic!("can not request irq for status pin of {}", self.desc.name);
        }

        self.keep_on_installed = true;
        self.current_state = DeviceState::KeepOn;
        Ok(())
    }

    /// Removes keep-on supervision and re-derives the state from the status
    /// line
    pub fn remove_keep_on(&mut self, hw: &mut P) -> Result<(), Error> {
        let desc = self
            .pin_by_function(PinFunction::Status)
            .ok_or(Error::NoStatusPin)?;

        if !self.keep_on_installed {
            return Ok(());
        }

        if let Some(irq) = hw.gpio_to_irq(desc.pin_no) {
            hw.irq_release(irq);
        }
        self.keep_on_installed = false;
        self.update_status_state(hw);
        Ok(())
    }

    // ---- worker -----------------------------------------------------------

    /// Enqueues a command without an argument
    pub fn enqueue(&self, kind: CommandKind) -> Result<Completion, Error> {
        self.queue.enqueue(kind, -1)
    }

    /// Enqueues a command carrying an argument
    pub fn enqueue_arg(&self, kind: CommandKind, argument: i32) -> Result<Completion, Error> {
        self.queue.enqueue(kind, argument)
    }

    /// Handles a pending status-edge event, if any
    ///
    /// This is the deferred half of the keep-on interrupt: it runs in worker
    /// context, reads the device status, and enqueues a recovery command if
    /// the device fell off.
    pub fn process_pending_check(&mut self, hw: &mut P) {
        if !self.status_edge.take() {
            return;
        }

        let on = self.status(hw);
        log::debug!("{}: status reading is {}", self.desc.name, on);
        if !on {
            // The completion is deliberately dropped: recovery is
            // fire-and-forget, nobody awaits it.
            if self.queue.enqueue(CommandKind::CheckAndPowerOn, -1).is_err() {
                log::error!("{}: queue full, recovery dropped", self.desc.name);
            }
        }
    }

    /// Dispatches the head command of the queue, if any
    ///
    /// Returns whether a command was executed. At most one command runs at a
    /// time; completions fire in submission order.
    pub fn process_one(&mut self, hw: &mut P) -> bool {
        let cmd = match self.queue.pop() {
            Some(c) => c,
            None => return false,
        };

        let code = match self.dispatch(hw, cmd.kind, cmd.argument) {
            Ok(()) => 0,
            Err(e) => {
                log::warn!("{}: command {:?} failed: {:?}", self.desc.name, cmd.kind, e);
                e.code()
            }
        };
        self.queue.complete(cmd.slot, code);
        true
    }

    /// Runs the worker until the peripheral is idle
    ///
    /// Processes pending status-edge events and drains the command queue,
    /// re-checking for edge events between commands. Returns the number of
    /// commands executed.
    pub fn service(&mut self, hw: &mut P) -> usize {
        self.process_pending_check(hw);
        let mut executed = 0;
        while self.process_one(hw) {
            executed += 1;
            self.process_pending_check(hw);
        }
        executed
    }

    fn dispatch(&mut self, hw: &mut P, kind: CommandKind, argument: i32) -> Result<(), Error> {
        match kind {
            CommandKind::NoOp => {
                log::info!("{}: no-op command issued", self.desc.name);
                Ok(())
            }
            CommandKind::PowerOn => self.power_on(hw),
            CommandKind::PowerOff => self.power_off(hw),
            CommandKind::Reset => self.reset(hw),
            CommandKind::CheckAndPowerOn => self.check_and_power_on(hw),
            CommandKind::StateTransition => {
                let target =
                    DeviceState::try_from(argument).map_err(|_| Error::UnknownState)?;
                self.state_transition(hw, target)
            }
        }
    }

    /// Drains the worker and gives all hardware resources back
    ///
    /// Every queued command still runs to completion before anything is
    /// released.
    pub fn release(&mut self, hw: &mut P) {
        self.service(hw);

        if self.keep_on_installed {
            let _ = self.remove_keep_on(hw);
        }

        for i in 0..self.pins.len() {
            let desc = self.pins[i].desc;
            if desc.edge_notify.is_some() {
                if let Some(irq) = hw.gpio_to_irq(desc.pin_no) {
                    hw.irq_release(irq);
                }
            }
            if self.pins[i].requested {
                hw.gpio_release(desc.pin_no);
                self.pins[i].requested = false;
            }
        }
    }
}

//! SIMCom GSM modem drivers
//!
//! All supported SIMCom modems share the same functional pin set: a
//! mandatory STATUS input, a mandatory PWRKEY output, and — on boards that
//! can cut the modem supply entirely — an optional POWER output. They differ
//! in the power-key pulse timings and in what happens around them; the
//! timings below are taken from the respective hardware design manuals.

use crate::devices::Device;
use crate::error::Error;
use crate::hw::Hardware;
use crate::periph::Peripheral;
use crate::pin::{self, PinFunction};
use crate::queue::CommandKind;
use crate::seq::{perform_sequence, Step};
use crate::state::{DeviceState, StateDesc};

/// Configures the functional pins shared by all SIMCom modems
///
/// Claims STATUS as a mandatory input and PWRKEY as a mandatory output, and
/// POWER if the board has one. When `supervise` is set, keep-on supervision
/// is installed right away, so the modem is auto-recovered from the moment
/// it is set up.
pub(crate) fn generic_setup<P: Hardware>(
    periph: &mut Peripheral<P>,
    hw: &mut P,
    supervise: bool,
) -> Result<(), Error> {
    periph.configure_pin(hw, PinFunction::Status, true);

    if supervise {
        let _ = periph.install_keep_on(hw);
    }

    periph.configure_pin(hw, PinFunction::PowerKey, true);
    // It doesn't really matter if this one is not found.
    periph.configure_pin(hw, PinFunction::Power, false);

    Ok(())
}

/// Status pin value, corrected by its polarity
pub(crate) fn status_pin_value<P: Hardware>(periph: &Peripheral<P>, hw: &mut P) -> bool {
    let desc = match periph.pin_by_function(PinFunction::Status) {
        Some(d) => d,
        None => panic!(
            "couldn't find function Status for peripheral {}",
            periph.name()
        ),
    };
    pin::active_value(&desc, hw.gpio_read(desc.pin_no))
}

/// Runs a power-on pulse sequence with the common pre- and post-checks
///
/// Refuses with `NoDevice` when the modem already reports "on"; afterwards
/// the final status decides the outcome, not the engine result.
fn run_power_on<P: Hardware>(
    periph: &mut Peripheral<P>,
    hw: &mut P,
    steps: &[Step],
) -> Result<(), Error> {
    if periph.status(hw) {
        log::error!("{}: tried to power on device with status pin 1", periph.name());
        return Err(Error::NoDevice);
    }

    let _ = perform_sequence(periph, hw, steps);

    let status = periph.status(hw);
    log::debug!("{}: status pin is {}", periph.name(), status);
    if status {
        Ok(())
    } else {
        Err(Error::StatusTimeout)
    }
}

/// Runs a power-off pulse sequence with the common pre- and post-checks
fn run_power_off<P: Hardware>(
    periph: &mut Peripheral<P>,
    hw: &mut P,
    steps: &[Step],
) -> Result<(), Error> {
    if !periph.status(hw) {
        log::error!("{}: tried to power off device with status pin 0", periph.name());
        return Err(Error::NoDevice);
    }

    let _ = perform_sequence(periph, hw, steps);

    let status = periph.status(hw);
    log::debug!("{}: status pin is {}", periph.name(), status);
    if status {
        Err(Error::StatusTimeout)
    } else {
        Ok(())
    }
}

const fn drive(
    label: &'static str,
    description: &'static str,
    function: PinFunction,
    value: bool,
    mandatory: bool,
    sleep_ms: u32,
) -> Step {
    Step {
        label,
        description,
        function,
        value,
        mandatory,
        sleep_ms,
        timeout_ms: 0,
    }
}

const fn wait_status(
    label: &'static str,
    description: &'static str,
    value: bool,
    timeout_ms: u32,
) -> Step {
    Step {
        label,
        description,
        function: PinFunction::Status,
        value,
        mandatory: true,
        sleep_ms: 0,
        timeout_ms,
    }
}

const fn trace(label: &'static str, description: &'static str) -> Step {
    Step {
        label,
        description,
        function: PinFunction::None,
        value: false,
        mandatory: true,
        sleep_ms: 0,
        timeout_ms: 0,
    }
}

/// SIMCom Sim508 GSM module
///
/// Timings per Sim508 Hardware Design 2.08, sections 3.4.1 and 3.4.2.
pub struct Sim508;

const SIM508_POWER_ON: [Step; 6] = [
    drive("0", "turn on POWER pin if available", PinFunction::Power, true, false, 0),
    drive("1", "pwrkey to 1 for 0.5s, ends at t0", PinFunction::PowerKey, true, true, 500),
    drive("2", "pwrkey to 0 for t - t0 > 2s", PinFunction::PowerKey, false, true, 2100),
    drive("3", "pwrkey back to 1", PinFunction::PowerKey, true, true, 0),
    wait_status("4", "wait for status pin to come up", true, 12_000),
    trace("5", "finally, status pin is 1 when all is ok"),
];

const SIM508_POWER_OFF: [Step; 5] = [
    drive("1", "pwrkey to 1 for 500ms", PinFunction::PowerKey, true, true, 500),
    drive("2", "pwrkey to 0 for 1s < t < 2s", PinFunction::PowerKey, false, true, 1500),
    drive("3", "pwrkey back to 1", PinFunction::PowerKey, true, true, 0),
    wait_status("4", "wait 2 to 8 seconds for status pin to come down", false, 10_000),
    trace("5", "finally, status pin is 0 when all is ok"),
];

impl<P: Hardware> Device<P> for Sim508 {
    fn setup(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        generic_setup(periph, hw, true)?;
        let _ = periph.enqueue(CommandKind::CheckAndPowerOn);
        Ok(())
    }

    fn power_on(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        run_power_on(periph, hw, &SIM508_POWER_ON)
    }

    fn power_off(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        run_power_off(periph, hw, &SIM508_POWER_OFF)
    }

    fn status(&self, periph: &Peripheral<P>, hw: &mut P) -> bool {
        status_pin_value(periph, hw)
    }
}

/// SIMCom Sim900D GSM module
///
/// Timings per Sim900D Hardware Design V1.04, figures 9 and 10.
pub struct Sim900d;

const SIM900D_POWER_ON: [Step; 6] = [
    drive("0", "turn on POWER pin if available", PinFunction::Power, true, false, 0),
    drive("1", "pwrkey to 1 for 0.5s, ends at t0", PinFunction::PowerKey, true, true, 500),
    drive("2", "pwrkey to 0 for t - t0 > 1s", PinFunction::PowerKey, false, true, 1100),
    drive("3", "pwrkey back to 1", PinFunction::PowerKey, true, true, 0),
    wait_status("4", "wait for status pin to come up", true, 10_000),
    trace("5", "finally, status pin is 1 when all is ok"),
];

const SIM900D_POWER_OFF: [Step; 4] = [
    drive("1", "pwrkey to 0 for 1s < t < 5s", PinFunction::PowerKey, false, true, 2000),
    drive("2", "pwrkey back to 1", PinFunction::PowerKey, true, true, 50),
    wait_status("3", "wait for status pin to come down", false, 10_000),
    trace("4", "finally, status pin is 0 when all is ok"),
];

impl<P: Hardware> Device<P> for Sim900d {
    fn setup(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        generic_setup(periph, hw, true)?;
        let _ = periph.enqueue(CommandKind::CheckAndPowerOn);
        Ok(())
    }

    fn power_on(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        run_power_on(periph, hw, &SIM900D_POWER_ON)
    }

    fn power_off(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        run_power_off(periph, hw, &SIM900D_POWER_OFF)
    }

    fn status(&self, periph: &Peripheral<P>, hw: &mut P) -> bool {
        status_pin_value(periph, hw)
    }
}

/// SIMCom Sim900 GSM module
///
/// Pulse timings are the Sim900D's (Sim900 Hardware Design, figure 9), with
/// one extra step on power-off: boards carrying this modem have a supply
/// switch, which is opened once the modem has shut down.
///
/// The Sim900 additionally supports firmware download over its serial link,
/// which needs the power key held low and the supply toggled in a particular
/// order; those procedures are modeled as the firmware states of its state
/// table rather than as power operations.
pub struct Sim900;

const SIM900_POWER_ON: [Step; 6] = [
    drive("0", "turn on POWER pin if available", PinFunction::Power, true, false, 0),
    drive("1", "pwrkey to 1 for 0.5s, ends at t0", PinFunction::PowerKey, true, true, 500),
    drive("2", "pwrkey to 0 for t - t0 > 1s", PinFunction::PowerKey, false, true, 1100),
    drive("3", "pwrkey back to 1", PinFunction::PowerKey, true, true, 0),
    wait_status("4", "wait for status pin to come up for t - t0 > 2.2s", true, 10_000),
    trace("5", "finally, status pin is 1 when all is ok"),
];

const SIM900_POWER_OFF: [Step; 5] = [
    drive("1", "pwrkey to 0 for 1s < t < 5s", PinFunction::PowerKey, false, true, 2000),
    drive("2", "pwrkey back to 1", PinFunction::PowerKey, true, true, 50),
    wait_status("3", "wait for status pin to come down", false, 10_000),
    drive("4", "turn off gsm enable pin", PinFunction::Power, false, true, 1),
    trace("5", "finally, status pin is 0 when all is ok"),
];

/// State names accepted by the Sim900's status attribute
pub static SIM900_STATES: [StateDesc; 5] = [
    StateDesc { name: "off", state: DeviceState::Off },
    StateDesc { name: "on", state: DeviceState::On },
    StateDesc { name: "on-keep", state: DeviceState::KeepOn },
    StateDesc { name: "firmware-prepare", state: DeviceState::FirmwarePrepare },
    StateDesc { name: "firmware-load", state: DeviceState::FirmwareLoad },
];

impl<P: Hardware> Device<P> for Sim900 {
    fn setup(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        // Keep-on is not installed here: on this modem it is one of the
        // states, entered and left through the state machine.
        generic_setup(periph, hw, false)?;
        periph.set_state_table(&SIM900_STATES);
        let _ = periph.enqueue_arg(CommandKind::StateTransition, DeviceState::On as i32);
        Ok(())
    }

    fn power_on(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        match run_power_on(periph, hw, &SIM900_POWER_ON) {
            Err(Error::NoDevice) => Err(Error::NoDevice),
            result => {
                periph.update_status_state(hw);
                result
            }
        }
    }

    fn power_off(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        match run_power_off(periph, hw, &SIM900_POWER_OFF) {
            Err(Error::NoDevice) => Err(Error::NoDevice),
            result => {
                periph.update_status_state(hw);
                result
            }
        }
    }

    fn status(&self, periph: &Peripheral<P>, hw: &mut P) -> bool {
        status_pin_value(periph, hw)
    }

    /// The Sim900 transition table
    ///
    /// Results of the power operations taken along an edge are logged but do
    /// not veto the transition; only a forbidden cell does. `current_state`
    /// is updated only when the transition is allowed.
    fn state_transition(
        &self,
        periph: &mut Peripheral<P>,
        hw: &mut P,
        target: DeviceState,
    ) -> Result<(), Error> {
        use DeviceState::*;

        let current = periph.current_state();
        if current == target {
            log::info!("{}: trying to enter the same state", periph.name());
            return Err(Error::SameState);
        }

        let result = match (current, target) {
            (Off, On) => {
                let _ = periph.power_on(hw);
                Ok(())
            }
            (Off, KeepOn) => {
                let _ = periph.install_keep_on(hw);
                let _ = periph.power_on(hw);
                Ok(())
            }
            (Off, FirmwarePrepare) => {
                periph.set_output(hw, PinFunction::PowerKey, false, true);
                hw.delay_ms(10);
                Ok(())
            }
            (Off, FirmwareLoad) => Err(Error::InvalidTransition),

            (On, Off) => {
                let _ = periph.power_off(hw);
                Ok(())
            }
            (On, KeepOn) => {
                let _ = periph.install_keep_on(hw);
                Ok(())
            }
            (On, FirmwarePrepare) => {
                let _ = periph.power_off(hw);
                periph.set_output(hw, PinFunction::PowerKey, false, true);
                Ok(())
            }
            (On, FirmwareLoad) => Err(Error::InvalidTransition),

            (KeepOn, Off) => {
                let _ = periph.remove_keep_on(hw);
                let _ = periph.power_off(hw);
                Ok(())
            }
            (KeepOn, On) => {
                let _ = periph.remove_keep_on(hw);
                Ok(())
            }
            (KeepOn, FirmwarePrepare) => {
                let _ = periph.remove_keep_on(hw);
                let _ = periph.power_off(hw);
                periph.set_output(hw, PinFunction::PowerKey, false, true);
                hw.delay_ms(10);
                Ok(())
            }
            (KeepOn, FirmwareLoad) => Err(Error::InvalidTransition),

            (FirmwarePrepare, Off) => {
                periph.set_output(hw, PinFunction::PowerKey, true, true);
                hw.delay_ms(10);
                Ok(())
            }
            (FirmwarePrepare, On) => {
                let _ = periph.power_on(hw);
                Ok(())
            }
            (FirmwarePrepare, KeepOn) => {
                let _ = periph.power_on(hw);
                let _ = periph.install_keep_on(hw);
                Ok(())
            }
            (FirmwarePrepare, FirmwareLoad) => {
                periph.set_output(hw, PinFunction::Power, true, true);
                Ok(())
            }

            (FirmwareLoad, Off) => {
                periph.set_output(hw, PinFunction::Power, false, true);
                periph.set_output(hw, PinFunction::PowerKey, true, true);
                hw.delay_ms(10);
                Ok(())
            }
            (FirmwareLoad, On) => {
                periph.set_output(hw, PinFunction::Power, false, true);
                hw.delay_ms(100); // quick discharge
                let _ = periph.power_on(hw); // pwrkey is toggled there
                Ok(())
            }
            (FirmwareLoad, KeepOn) => {
                periph.set_output(hw, PinFunction::Power, false, true);
                hw.delay_ms(100);
                let _ = periph.power_on(hw);
                Ok(())
            }
            (FirmwareLoad, FirmwarePrepare) => {
                periph.set_output(hw, PinFunction::Power, false, true);
                hw.delay_ms(100);
                Ok(())
            }

            _ => Err(Error::InvalidTransition),
        };

        if result.is_ok() {
            periph.set_current_state(target);
        }
        result
    }
}

//! GNSS receiver drivers
//!
//! The navigation receivers have no status output of their own; their status
//! is derived from the level of the supply switch that feeds them. Power
//! control is correspondingly simple — drive the switch and wait for the
//! supply to settle.

use crate::devices::Device;
use crate::error::Error;
use crate::hw::Hardware;
use crate::periph::Peripheral;
use crate::pin::{self, PinFunction};
use crate::seq::{perform_sequence, Step};

/// Logical level of the POWER pin, which doubles as the status reading
fn power_pin_value<P: Hardware>(periph: &Peripheral<P>, hw: &mut P) -> bool {
    let desc = match periph.pin_by_function(PinFunction::Power) {
        Some(d) => d,
        None => panic!(
            "couldn't find function Power for peripheral {}",
            periph.name()
        ),
    };
    pin::active_value(&desc, hw.gpio_read(desc.pin_no))
}

/// GPS section of the SIMCom Sim508
///
/// Per Sim508 Hardware Design 2.08, figure 28: the receiver is up 220 ms
/// after its supply. There is no graceful shutdown; the supply is simply
/// cut and given 500 ms to drain.
pub struct GpsSim508;

const GPS_SIM508_POWER_ON: [Step; 1] = [Step {
    label: "1",
    description: "set power to on and wait 220 ms",
    function: PinFunction::Power,
    value: true,
    mandatory: true,
    sleep_ms: 220,
    timeout_ms: 0,
}];

const GPS_SIM508_POWER_OFF: [Step; 1] = [Step {
    label: "1",
    description: "set power to off and wait some time",
    function: PinFunction::Power,
    value: false,
    mandatory: true,
    sleep_ms: 500,
    timeout_ms: 0,
}];

impl<P: Hardware> Device<P> for GpsSim508 {
    fn setup(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        periph.configure_pin(hw, PinFunction::Power, true);
        periph.set_output(hw, PinFunction::Power, true, true);
        Ok(())
    }

    fn power_on(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        if periph.status(hw) {
            log::error!("{}: GPS already seems to work", periph.name());
            return Err(Error::NoDevice);
        }

        let _ = perform_sequence(periph, hw, &GPS_SIM508_POWER_ON);

        let status = periph.status(hw);
        log::debug!("{}: device status is {}", periph.name(), status);
        if status {
            Ok(())
        } else {
            Err(Error::StatusTimeout)
        }
    }

    fn power_off(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        if !periph.status(hw) {
            log::error!("{}: GPS already seems to be turned off", periph.name());
            return Err(Error::NoDevice);
        }

        let _ = perform_sequence(periph, hw, &GPS_SIM508_POWER_OFF);
        Ok(())
    }

    fn status(&self, periph: &Peripheral<P>, hw: &mut P) -> bool {
        power_pin_value(periph, hw)
    }
}

/// Transystem EB-500 GPS receiver
pub struct Eb500;

impl<P: Hardware> Device<P> for Eb500 {
    fn setup(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        periph.configure_pin(hw, PinFunction::Power, true);
        periph.set_output(hw, PinFunction::Power, true, true);
        Ok(())
    }

    fn power_on(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        periph.set_output(hw, PinFunction::Power, true, true);
        hw.delay_ms(200);
        Ok(())
    }

    fn power_off(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        periph.set_output(hw, PinFunction::Power, false, true);
        hw.delay_ms(500);
        Ok(())
    }

    fn status(&self, periph: &Peripheral<P>, hw: &mut P) -> bool {
        power_pin_value(periph, hw)
    }
}

/// NVS NV08C-CSM GNSS receiver (hardware V2.1)
pub struct Nv08cCsm;

// Per the NV08C-CSM datasheet, section 2.4.2: the digital section is forced
// into reset by a low pulse of at least 1 us on #RESET; the on-module
// supervisor then holds it in reset for at least 140 ms after the line is
// released back to 1.
const NV08C_RESET: [Step; 4] = [
    Step {
        label: "1",
        description: "initially, reset is on",
        function: PinFunction::Reset,
        value: true,
        mandatory: true,
        sleep_ms: 500,
        timeout_ms: 0,
    },
    Step {
        label: "2",
        description: "reset to 0 for 1 ms",
        function: PinFunction::Reset,
        value: false,
        mandatory: true,
        sleep_ms: 1,
        timeout_ms: 0,
    },
    Step {
        label: "3",
        description: "reset to 1 for 140 ms",
        function: PinFunction::Reset,
        value: true,
        mandatory: true,
        sleep_ms: 140,
        timeout_ms: 0,
    },
    Step {
        label: "4",
        description: "finally, we have no way to check if everything is ok",
        function: PinFunction::None,
        value: false,
        mandatory: true,
        sleep_ms: 0,
        timeout_ms: 0,
    },
];

impl<P: Hardware> Device<P> for Nv08cCsm {
    fn setup(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        periph.configure_pin(hw, PinFunction::Reset, true);
        periph.configure_pin(hw, PinFunction::Power, true);
        Ok(())
    }

    fn power_on(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        periph.set_output(hw, PinFunction::Power, true, true);
        hw.delay_ms(200);
        Ok(())
    }

    fn power_off(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        periph.set_output(hw, PinFunction::Power, false, true);
        hw.delay_ms(500);
        Ok(())
    }

    fn status(&self, periph: &Peripheral<P>, hw: &mut P) -> bool {
        power_pin_value(periph, hw)
    }

    fn reset(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        let _ = perform_sequence(periph, hw, &NV08C_RESET);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{fixtures, Event, MockHw};
    use crate::periph::{Peripheral, PeriphStatics};

    const GPS_PWR: u16 = 20;
    const EB_PWR: u16 = 21;
    const RESET: u16 = 22;

    #[test]
    fn nv08c_reset_pulse_trace() {
        static S: PeriphStatics = PeriphStatics::new();
        let mut hw = MockHw::new();
        let mut periph =
            Peripheral::new(&fixtures::GPS_NV08C_DESC, &S, &mut hw).unwrap();
        hw.events.clear();

        assert_eq!(periph.reset(&mut hw), Ok(()));
        assert_eq!(
            hw.events,
            [
                Event::Write { pin: RESET, high: true },
                Event::Sleep(500),
                Event::Write { pin: RESET, high: false },
                Event::Sleep(1),
                Event::Write { pin: RESET, high: true },
                Event::Sleep(140),
            ]
        );
    }

    #[test]
    fn gps_sim508_round_trips_through_its_supply() {
        static S: PeriphStatics = PeriphStatics::new();
        let mut hw = MockHw::new();
        // Setup drives the supply on, so the receiver starts out running.
        let mut periph =
            Peripheral::new(&fixtures::GPS_SIM508_DESC, &S, &mut hw).unwrap();
        assert!(periph.status(&mut hw));
        assert_eq!(periph.power_on(&mut hw), Err(Error::NoDevice));

        assert_eq!(periph.power_off(&mut hw), Ok(()));
        assert!(!periph.status(&mut hw));

        assert_eq!(periph.power_on(&mut hw), Ok(()));
        assert!(periph.status(&mut hw));
    }

    #[test]
    fn eb500_polarity_is_applied_to_the_supply_switch() {
        static S: PeriphStatics = PeriphStatics::new();
        let mut hw = MockHw::new();
        // The EB-500 fixture's POWER line is active low.
        let mut periph = Peripheral::new(&fixtures::EB500_DESC, &S, &mut hw).unwrap();
        hw.events.clear();

        periph.power_off(&mut hw).unwrap();
        periph.power_on(&mut hw).unwrap();
        assert_eq!(
            hw.events,
            [
                Event::Write { pin: EB_PWR, high: true }, // logical off
                Event::Sleep(500),
                Event::Write { pin: EB_PWR, high: false }, // logical on
                Event::Sleep(200),
            ]
        );
        assert!(periph.status(&mut hw));
    }

    #[test]
    fn generic_reset_power_cycles_a_running_receiver() {
        static S: PeriphStatics = PeriphStatics::new();
        let mut hw = MockHw::new();
        let mut periph =
            Peripheral::new(&fixtures::GPS_SIM508_DESC, &S, &mut hw).unwrap();
        hw.events.clear();

        // Running, so the generic reset goes off-then-on.
        assert_eq!(periph.reset(&mut hw), Ok(()));
        assert_eq!(
            hw.events,
            [
                Event::Write { pin: GPS_PWR, high: false },
                Event::Sleep(500),
                Event::Write { pin: GPS_PWR, high: true },
                Event::Sleep(220),
            ]
        );
    }
}

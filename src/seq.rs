//! Timed pin-sequence engine
//!
//! Device operations — power-on, power-off, reset — are pulse diagrams in the
//! hardware manuals: drive a line, hold it for some time, then watch the
//! status line until it settles. [`perform_sequence`] executes such a diagram
//! described as an ordered list of [`Step`]s.
//!
//! Within one step the order is fixed: the output (if any) is driven first,
//! then the sleep elapses, then the status wait (if any) runs. Sequences run
//! on a peripheral's worker and block it; they must never be invoked from an
//! interrupt context.

use crate::error::Error;
use crate::hw::Hardware;
use crate::periph::Peripheral;
use crate::pin::PinFunction;

/// Granularity of status polling during a wait step
///
/// Not a hardware requirement; the manuals only bound total settle times, so
/// any interval well below the shortest timeout works.
pub const STATUS_POLL_INTERVAL_MS: u32 = 500;

/// One step of a timed pin sequence
#[derive(Clone, Copy)]
pub struct Step {
    /// Short step identifier used in trace output
    pub label: &'static str,
    /// What the step does, in the words of the hardware manual
    pub description: &'static str,
    /// Pin function to drive; `None` and `Status` drive nothing
    pub function: PinFunction,
    /// Logical value to drive, or the status value to wait for
    pub value: bool,
    /// Whether the driven pin must exist; missing optional pins are skipped
    pub mandatory: bool,
    /// Time to sleep after driving, in milliseconds
    pub sleep_ms: u32,
    /// For `Status` steps: how long to poll for `value`, in milliseconds
    pub timeout_ms: u32,
}

/// Executes a sequence against a peripheral
///
/// Returns success if the last status wait observed its target value, or if
/// the sequence contains no status wait at all. Intermediate irregularities
/// (an absent optional output pin) are logged and the sequence continues;
/// only the final status decides the outcome.
pub fn perform_sequence<P: Hardware>(
    periph: &mut Peripheral<P>,
    hw: &mut P,
    steps: &[Step],
) -> Result<(), Error> {
    let mut outcome = Ok(());

    for step in steps {
        log::trace!("step {}: {}", step.label, step.description);

        if step.function != PinFunction::None && step.function != PinFunction::Status {
            periph.set_output(hw, step.function, step.value, step.mandatory);
        }

        if step.sleep_ms != 0 {
            hw.delay_ms(step.sleep_ms);
        }

        // A timeout is only meaningful on the status function.
        if step.function == PinFunction::Status && step.timeout_ms != 0 {
            let mut waited = 0;
            let mut status = periph.status(hw);
            while waited < step.timeout_ms && status != step.value {
                hw.delay_ms(STATUS_POLL_INTERVAL_MS);
                waited += STATUS_POLL_INTERVAL_MS;
                status = periph.status(hw);
            }
            outcome = if status == step.value {
                Ok(())
            } else {
                Err(Error::StatusTimeout)
            };
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{fixtures, Event, MockHw};
    use crate::periph::{Peripheral, PeriphStatics};

    // Raw pin numbers from the fixture board table.
    const STATUS: u16 = 10;
    const PWRKEY: u16 = 11;

    fn steps() -> [Step; 3] {
        [
            Step {
                label: "1",
                description: "power key low",
                function: PinFunction::PowerKey,
                value: false,
                mandatory: true,
                sleep_ms: 1000,
                timeout_ms: 0,
            },
            Step {
                label: "2",
                description: "power key high",
                function: PinFunction::PowerKey,
                value: true,
                mandatory: true,
                sleep_ms: 50,
                timeout_ms: 0,
            },
            Step {
                label: "3",
                description: "wait for status",
                function: PinFunction::Status,
                value: true,
                mandatory: true,
                sleep_ms: 0,
                timeout_ms: 2000,
            },
        ]
    }

    fn make_periph(hw: &mut MockHw, statics: &'static PeriphStatics) -> Peripheral<MockHw> {
        Peripheral::new(&fixtures::GSM_SIM508_DESC, statics, hw).unwrap()
    }

    #[test]
    fn writes_precede_sleeps_precede_waits() {
        static S: PeriphStatics = PeriphStatics::new();
        let mut hw = MockHw::new();
        let mut periph = make_periph(&mut hw, &S);
        hw.events.clear();

        hw.script_reads(STATUS, &[false, true]);
        let res = perform_sequence(&mut periph, &mut hw, &steps());
        assert_eq!(res, Ok(()));

        assert_eq!(
            hw.events,
            [
                Event::Write { pin: PWRKEY, high: false },
                Event::Sleep(1000),
                Event::Write { pin: PWRKEY, high: true },
                Event::Sleep(50),
                Event::Sleep(STATUS_POLL_INTERVAL_MS),
            ]
        );
    }

    #[test]
    fn identical_inputs_give_identical_traces() {
        static S1: PeriphStatics = PeriphStatics::new();
        static S2: PeriphStatics = PeriphStatics::new();

        let mut hw1 = MockHw::new();
        let mut p1 = make_periph(&mut hw1, &S1);
        hw1.events.clear();
        hw1.script_reads(STATUS, &[false, false, true]);
        perform_sequence(&mut p1, &mut hw1, &steps()).unwrap();

        let mut hw2 = MockHw::new();
        let mut p2 = make_periph(&mut hw2, &S2);
        hw2.events.clear();
        hw2.script_reads(STATUS, &[false, false, true]);
        perform_sequence(&mut p2, &mut hw2, &steps()).unwrap();

        assert_eq!(hw1.events, hw2.events);
    }

    #[test]
    fn status_wait_stops_at_timeout() {
        static S: PeriphStatics = PeriphStatics::new();
        let mut hw = MockHw::new();
        let mut periph = make_periph(&mut hw, &S);
        hw.events.clear();

        // Status never comes up.
        hw.script_reads(STATUS, &[false]);
        let res = perform_sequence(&mut periph, &mut hw, &steps());
        assert_eq!(res, Err(Error::StatusTimeout));

        let polls = hw
            .events
            .iter()
            .filter(|e| **e == Event::Sleep(STATUS_POLL_INTERVAL_MS))
            .count();
        assert_eq!(polls as u32, 2000 / STATUS_POLL_INTERVAL_MS);
    }

    #[test]
    fn sleep_only_steps_are_pure_delays() {
        static S: PeriphStatics = PeriphStatics::new();
        let mut hw = MockHw::new();
        let mut periph = make_periph(&mut hw, &S);
        hw.events.clear();

        let delay = [Step {
            label: "1",
            description: "settle",
            function: PinFunction::None,
            value: false,
            mandatory: true,
            sleep_ms: 220,
            timeout_ms: 0,
        }];
        assert_eq!(perform_sequence(&mut periph, &mut hw, &delay), Ok(()));
        assert_eq!(hw.events, [Event::Sleep(220)]);
    }

    #[test]
    fn missing_optional_output_is_skipped() {
        static S: PeriphStatics = PeriphStatics::new();
        let mut hw = MockHw::new();
        // The Sim508 fixture has no POWER pin.
        let mut periph = make_periph(&mut hw, &S);
        hw.events.clear();

        let seq = [Step {
            label: "0",
            description: "turn on POWER pin if available",
            function: PinFunction::Power,
            value: true,
            mandatory: false,
            sleep_ms: 0,
            timeout_ms: 0,
        }];
        assert_eq!(perform_sequence(&mut periph, &mut hw, &seq), Ok(()));
        assert!(hw.events.is_empty());
    }
}

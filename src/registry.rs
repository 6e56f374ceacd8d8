//! The registry of live peripherals
//!
//! Process-wide state, created once at driver initialization and torn down
//! once at shutdown. Between those two points the set of peripherals is
//! immutable; only the peripherals themselves change state.

use heapless::Vec;

use crate::error::Error;
use crate::hw::Hardware;
use crate::periph::{Peripheral, PeriphDesc, PeriphStatics};

/// An owned collection of up to `N` live peripherals
pub struct Registry<P: Hardware + 'static, const N: usize> {
    peripherals: Vec<Peripheral<P>, N>,
}

impl<P: Hardware + 'static, const N: usize> Registry<P, N> {
    /// Creates an empty registry
    pub const fn new() -> Self {
        Registry {
            peripherals: Vec::new(),
        }
    }

    /// Creates a peripheral from its board-description entry and adds it
    ///
    /// Runs the device setup; any initial command it enqueues stays queued
    /// until the peripheral is first serviced.
    pub fn add(
        &mut self,
        desc: &'static PeriphDesc,
        statics: &'static PeriphStatics,
        hw: &mut P,
    ) -> Result<&mut Peripheral<P>, Error> {
        if self.peripherals.is_full() {
            return Err(Error::RegistryFull);
        }

        let periph = Peripheral::new(desc, statics, hw)?;
        // Checked for room above.
        let _ = self.peripherals.push(periph);
        Ok(self.peripherals.last_mut().unwrap())
    }

    /// Looks a peripheral up by its unique name
    pub fn by_name(&mut self, name: &str) -> Option<&mut Peripheral<P>> {
        self.peripherals.iter_mut().find(|p| p.name() == name)
    }

    /// Iterates over all peripherals
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Peripheral<P>> + '_ {
        self.peripherals.iter_mut()
    }

    /// Services every peripheral's worker once; returns commands executed
    pub fn service_all(&mut self, hw: &mut P) -> usize {
        self.peripherals.iter_mut().map(|p| p.service(hw)).sum()
    }

    /// Drains and releases every peripheral, emptying the registry
    pub fn release_all(&mut self, hw: &mut P) {
        for p in self.peripherals.iter_mut() {
            p.release(hw);
        }
        self.peripherals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{fixtures, Event, MockHw};
    use crate::state::DeviceState;

    #[test]
    fn registers_services_and_releases_a_board() {
        static GSM: PeriphStatics = PeriphStatics::new();
        static GPS: PeriphStatics = PeriphStatics::new();

        let mut hw = MockHw::new();
        let mut registry: Registry<MockHw, 3> = Registry::new();

        registry
            .add(&fixtures::GSM_SIM900_DESC, &GSM, &mut hw)
            .unwrap();
        registry
            .add(&fixtures::GPS_NV08C_DESC, &GPS, &mut hw)
            .unwrap();

        // The Sim900 setup queued its initial transition to "on".
        hw.script_reads(10, &[false, false, true]);
        let executed = registry.service_all(&mut hw);
        assert_eq!(executed, 1);
        assert_eq!(
            registry.by_name("gsm").unwrap().current_state(),
            DeviceState::On
        );
        assert!(registry.by_name("nonexistent").is_none());

        registry.release_all(&mut hw);
        assert!(registry.by_name("gsm").is_none());
        assert!(hw
            .events
            .iter()
            .any(|e| matches!(e, Event::GpioRelease(_))));
    }

    #[test]
    fn rejects_more_peripherals_than_it_has_room_for() {
        static S1: PeriphStatics = PeriphStatics::new();
        static S2: PeriphStatics = PeriphStatics::new();

        let mut hw = MockHw::new();
        let mut registry: Registry<MockHw, 1> = Registry::new();

        registry
            .add(&fixtures::POWER_DESC, &S1, &mut hw)
            .unwrap();
        assert!(matches!(
            registry.add(&fixtures::GPS_NV08C_DESC, &S2, &mut hw),
            Err(Error::RegistryFull)
        ));
    }
}

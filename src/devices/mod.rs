//! Device drivers
//!
//! Each supported device implements [`Device`]: the set of operations a
//! peripheral's worker dispatches commands onto. The reset and
//! check-and-power-on operations have generic implementations that almost
//! every device keeps; power-on, power-off and status are always
//! device-specific, built from the pulse diagrams in the hardware manuals.

use crate::error::Error;
use crate::hw::Hardware;
use crate::periph::{DeviceModel, Peripheral};
use crate::state::DeviceState;

pub mod gnss;
pub mod simcom;

/// The operations of one device model
///
/// Implementations are stateless unit structs; all mutable state lives in the
/// [`Peripheral`] that the operations receive. Every operation runs
/// synchronously on the peripheral's worker and may sleep.
pub trait Device<P: Hardware> {
    /// Binds the driver to a freshly created peripheral
    ///
    /// Claims the functional pins, installs supervision or a state table
    /// where the device calls for it, and usually enqueues an initial
    /// command.
    fn setup(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error>;

    /// Powers the device on
    ///
    /// Fails with [`Error::NoDevice`] if the status line already reports
    /// "on"; in that case nothing is driven.
    fn power_on(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error>;

    /// Powers the device off
    ///
    /// Fails with [`Error::NoDevice`] if the status line already reports
    /// "off"; in that case nothing is driven.
    fn power_off(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error>;

    /// Reads the device's logical status: `true` means running
    fn status(&self, periph: &Peripheral<P>, hw: &mut P) -> bool;

    /// Power-cycles the device
    ///
    /// The generic implementation powers off first when the device is
    /// running, aborting if that fails, then powers on.
    fn reset(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        if self.status(periph, hw) {
            self.power_off(periph, hw)?;
        }
        self.power_on(periph, hw)
    }

    /// Powers the device on only if it is off; otherwise does nothing
    fn check_and_power_on(&self, periph: &mut Peripheral<P>, hw: &mut P) -> Result<(), Error> {
        if !self.status(periph, hw) {
            self.power_on(periph, hw)
        } else {
            Ok(())
        }
    }

    /// Moves the device to `target`
    ///
    /// Only devices that install a state table accept transitions; the
    /// default rejects everything.
    fn state_transition(
        &self,
        _periph: &mut Peripheral<P>,
        _hw: &mut P,
        _target: DeviceState,
    ) -> Result<(), Error> {
        Err(Error::InvalidTransition)
    }
}

/// Driver that accepts every command and touches nothing
///
/// Bound to power-management ICs that need an attribute directory but have
/// no controllable behaviour.
pub struct Stub;

impl<P: Hardware> Device<P> for Stub {
    fn setup(&self, _periph: &mut Peripheral<P>, _hw: &mut P) -> Result<(), Error> {
        Ok(())
    }

    fn power_on(&self, _periph: &mut Peripheral<P>, _hw: &mut P) -> Result<(), Error> {
        Ok(())
    }

    fn power_off(&self, _periph: &mut Peripheral<P>, _hw: &mut P) -> Result<(), Error> {
        Ok(())
    }

    fn status(&self, _periph: &Peripheral<P>, _hw: &mut P) -> bool {
        false
    }

    fn reset(&self, _periph: &mut Peripheral<P>, _hw: &mut P) -> Result<(), Error> {
        Ok(())
    }

    fn check_and_power_on(&self, _periph: &mut Peripheral<P>, _hw: &mut P) -> Result<(), Error> {
        Ok(())
    }
}

/// Resolves a board-description model to its driver
pub(crate) fn device_for<P: Hardware>(model: DeviceModel) -> &'static dyn Device<P> {
    match model {
        DeviceModel::Sim508 => &simcom::Sim508,
        DeviceModel::Sim900 => &simcom::Sim900,
        DeviceModel::Sim900d => &simcom::Sim900d,
        DeviceModel::GpsSim508 => &gnss::GpsSim508,
        DeviceModel::Eb500 => &gnss::Eb500,
        DeviceModel::Nv08cCsm => &gnss::Nv08cCsm,
        DeviceModel::Stub => &Stub,
    }
}

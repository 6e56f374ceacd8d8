//! Operational states for peripherals with a state table

use num_enum::TryFromPrimitive;

/// Operational state of a peripheral
///
/// Every peripheral tracks one of these; only peripherals that declare a
/// state table accept explicit transition requests. The firmware states are
/// specific to modems whose flash can be reprogrammed over the serial link
/// while the power key is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(i32)]
pub enum DeviceState {
    /// Powered down
    Off = 0,
    /// Powered up
    On = 1,
    /// Powered up and supervised: a falling status edge triggers automatic
    /// recovery
    KeepOn = 2,
    /// Held ready for firmware download
    FirmwarePrepare = 3,
    /// Firmware download in progress
    FirmwareLoad = 4,
}

/// One entry of a peripheral's state table
pub struct StateDesc {
    /// Name accepted and reported by the status attribute
    pub name: &'static str,
    /// The state the name maps to
    pub state: DeviceState,
}

/// Resolves a state name against a table
pub fn lookup_by_name(table: &[StateDesc], name: &str) -> Option<DeviceState> {
    table.iter().find(|d| d.name == name).map(|d| d.state)
}

/// Returns the name a table assigns to a state
pub fn name_of(table: &[StateDesc], state: DeviceState) -> Option<&'static str> {
    table.iter().find(|d| d.state == state).map(|d| d.name)
}

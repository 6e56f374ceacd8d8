//! Test double for the platform interface
//!
//! Records every hardware access as an [`Event`] so tests can assert exact
//! GPIO traces, keeps a raw level per pin (updated by writes, so pins wired
//! back to status inputs behave like the real board), and lets tests script
//! the readings of one pin to play out a status-line settling scenario.

use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal::blocking::delay::DelayMs;

use crate::hw::{EdgeFlag, EdgeTrigger, Hardware, IrqLine};

/// One recorded hardware access
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Request(u16),
    GpioRelease(u16),
    Input { pin: u16, pull_up: bool },
    Output { pin: u16, init_high: bool },
    Deglitch { pin: u16, enable: bool },
    Write { pin: u16, high: bool },
    Sleep(u32),
    IrqRegister { irq: u32 },
    IrqRelease(u32),
}

pub struct MockHw {
    pub events: Vec<Event>,
    pub now_ms: u64,
    levels: [bool; 256],
    script_pin: Option<u16>,
    script: VecDeque<bool>,
}

impl MockHw {
    pub fn new() -> Self {
        MockHw {
            events: Vec::new(),
            now_ms: 0,
            levels: [false; 256],
            script_pin: None,
            script: VecDeque::new(),
        }
    }

    /// Forces a pin's raw level
    pub fn set_level(&mut self, pin: u16, high: bool) {
        self.levels[pin as usize] = high;
    }

    /// Scripts successive raw readings of one pin; the last value sticks
    pub fn script_reads(&mut self, pin: u16, values: &[bool]) {
        self.script_pin = Some(pin);
        self.script = values.iter().copied().collect();
    }
}

impl DelayMs<u32> for MockHw {
    fn delay_ms(&mut self, ms: u32) {
        self.events.push(Event::Sleep(ms));
        self.now_ms += u64::from(ms);
    }
}

impl Hardware for MockHw {
    type Error = ();

    fn gpio_request(&mut self, pin: u16, _label: &'static str) -> Result<(), ()> {
        self.events.push(Event::Request(pin));
        Ok(())
    }

    fn gpio_release(&mut self, pin: u16) {
        self.events.push(Event::GpioRelease(pin));
    }

    fn gpio_into_input(&mut self, pin: u16, pull_up: bool) {
        self.events.push(Event::Input { pin, pull_up });
    }

    fn gpio_into_output(&mut self, pin: u16, init_high: bool) {
        self.events.push(Event::Output { pin, init_high });
        self.levels[pin as usize] = init_high;
    }

    fn gpio_set_deglitch(&mut self, pin: u16, enable: bool) {
        self.events.push(Event::Deglitch { pin, enable });
    }

    fn gpio_read(&mut self, pin: u16) -> bool {
        if self.script_pin == Some(pin) && !self.script.is_empty() {
            return if self.script.len() > 1 {
                self.script.pop_front().unwrap()
            } else {
                *self.script.front().unwrap()
            };
        }
        self.levels[pin as usize]
    }

    fn gpio_write(&mut self, pin: u16, high: bool) {
        self.events.push(Event::Write { pin, high });
        self.levels[pin as usize] = high;
    }

    fn gpio_to_irq(&mut self, pin: u16) -> Option<IrqLine> {
        Some(IrqLine(100 + u32::from(pin)))
    }

    fn irq_register(
        &mut self,
        irq: IrqLine,
        _trigger: EdgeTrigger,
        _flag: &'static EdgeFlag,
        _label: &'static str,
    ) -> Result<(), ()> {
        self.events.push(Event::IrqRegister { irq: irq.0 });
        Ok(())
    }

    fn irq_release(&mut self, irq: IrqLine) {
        self.events.push(Event::IrqRelease(irq.0));
    }
}

/// Board-description fixtures modeled on the supported hardware revisions
pub mod fixtures {
    use crate::hw::EdgeFlag;
    use crate::periph::{DeviceKind, DeviceModel, PeriphDesc};
    use crate::pin::{ActiveLevel, Direction, PinDesc, PinFunction};

    pub static NET_ANT_EDGE: EdgeFlag = EdgeFlag::new();

    pub static GSM_SIM508_DESC: PeriphDesc = PeriphDesc {
        kind: DeviceKind::Gsm,
        name: "gsm",
        description: "Sim508 GSM",
        model: DeviceModel::Sim508,
        pins: &[
            PinDesc {
                pin_no: 10,
                description: "sim508 status pin",
                schematics_name: "STATUS_GSM",
                function: PinFunction::Status,
                direction: Direction::Input {
                    pull_up: true,
                    deglitch: true,
                },
                active: ActiveLevel::High,
                edge_notify: None,
            },
            PinDesc {
                pin_no: 11,
                description: "sim508 power key pin",
                schematics_name: "PWRkey",
                function: PinFunction::PowerKey,
                direction: Direction::Output { init_high: false },
                active: ActiveLevel::High,
                edge_notify: None,
            },
        ],
    };

    pub static GSM_SIM900_DESC: PeriphDesc = PeriphDesc {
        kind: DeviceKind::Gsm,
        name: "gsm",
        description: "Sim900 GSM",
        model: DeviceModel::Sim900,
        pins: &[
            PinDesc {
                pin_no: 10,
                description: "sim900 status pin",
                schematics_name: "STATUS_GSM",
                function: PinFunction::Status,
                direction: Direction::Input {
                    pull_up: true,
                    deglitch: true,
                },
                active: ActiveLevel::High,
                edge_notify: None,
            },
            PinDesc {
                pin_no: 11,
                description: "sim900 power key pin",
                schematics_name: "PWRkey",
                function: PinFunction::PowerKey,
                direction: Direction::Output { init_high: true },
                active: ActiveLevel::High,
                edge_notify: None,
            },
            PinDesc {
                pin_no: 12,
                description: "sim900 supply switch",
                schematics_name: "GSM_PWR",
                function: PinFunction::Power,
                direction: Direction::Output { init_high: false },
                active: ActiveLevel::High,
                edge_notify: None,
            },
        ],
    };

    pub static GPS_SIM508_DESC: PeriphDesc = PeriphDesc {
        kind: DeviceKind::Gps,
        name: "gps",
        description: "Sim508 GPS",
        model: DeviceModel::GpsSim508,
        pins: &[PinDesc {
            pin_no: 20,
            description: "gps supply switch",
            schematics_name: "GPS_PWR",
            function: PinFunction::Power,
            direction: Direction::Output { init_high: false },
            active: ActiveLevel::High,
            edge_notify: None,
        }],
    };

    pub static EB500_DESC: PeriphDesc = PeriphDesc {
        kind: DeviceKind::Gps,
        name: "gps",
        description: "EB-500",
        model: DeviceModel::Eb500,
        pins: &[PinDesc {
            pin_no: 21,
            description: "gps supply switch, active low",
            schematics_name: "GPS_PWR_N",
            function: PinFunction::Power,
            direction: Direction::Output { init_high: true },
            active: ActiveLevel::Low,
            edge_notify: None,
        }],
    };

    pub static GPS_NV08C_DESC: PeriphDesc = PeriphDesc {
        kind: DeviceKind::Gps,
        name: "gps",
        description: "NV08C-CSM",
        model: DeviceModel::Nv08cCsm,
        pins: &[
            PinDesc {
                pin_no: 22,
                description: "gnss reset pin",
                schematics_name: "GPS_RESET",
                function: PinFunction::Reset,
                direction: Direction::Output { init_high: true },
                active: ActiveLevel::High,
                edge_notify: None,
            },
            PinDesc {
                pin_no: 23,
                description: "gnss supply switch",
                schematics_name: "GPS_PWR",
                function: PinFunction::Power,
                direction: Direction::Output { init_high: false },
                active: ActiveLevel::High,
                edge_notify: None,
            },
            PinDesc {
                pin_no: 24,
                description: "1 when the active antenna is connected",
                schematics_name: "NET_ANT",
                function: PinFunction::None,
                direction: Direction::Input {
                    pull_up: true,
                    deglitch: false,
                },
                active: ActiveLevel::High,
                edge_notify: Some(&NET_ANT_EDGE),
            },
        ],
    };

    pub static POWER_DESC: PeriphDesc = PeriphDesc {
        kind: DeviceKind::Power,
        name: "power",
        description: "LM-something",
        model: DeviceModel::Stub,
        pins: &[],
    };
}

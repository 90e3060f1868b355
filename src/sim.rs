//! Simulated two-wire bus for tests.
//!
//! Lines are open-drain with pull-ups: the wire is low if the master drives it low or the slave
//! pulls it low. Every level change is fed to a simulated slave device and to a bus analyzer that
//! decodes start/stop conditions, bytes and acknowledgment bits the way a logic analyzer would.

use crate::delay::TimingSource;
use crate::gpio::{Direction, GpioLine, Level};
use std::cell::RefCell;
use std::rc::Rc;

/// Decoded bus activity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    Start,
    Byte(u8),
    Ack,
    Nack,
    Stop,
}

/// One SCL high period
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Pulse {
    pub sda_at_rise: Level,
    pub sda_steady: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlaveState {
    Idle,
    Rx { bits: u8, value: u8, address: bool },
    AckOut { then_tx: bool },
    Tx { byte: u8, sent: u8 },
    AwaitMasterAck { acked: bool },
    // Not addressed, or gave up. Waits for the next start condition.
    Ignore,
}

/// Slave device reacting to clock edges
pub(crate) struct SimSlave {
    address: Option<u8>,
    ack_budget: usize,
    tx: Vec<u8>,
    tx_pos: usize,
    received: Vec<u8>,
    state: SlaveState,
    pull_low: bool,
}

impl SimSlave {
    /// No device on the bus; nothing ever acknowledges
    pub fn absent() -> Self {
        SimSlave {
            address: None,
            ack_budget: 0,
            tx: Vec::new(),
            tx_pos: 0,
            received: Vec::new(),
            state: SlaveState::Idle,
            pull_low: false,
        }
    }

    /// Device at `address` acknowledging every byte
    pub fn at(address: u8) -> Self {
        SimSlave {
            address: Some(address),
            ack_budget: usize::MAX,
            ..SimSlave::absent()
        }
    }

    /// Acknowledge only the first `n` data bytes of each write
    pub fn acking_bytes(self, n: usize) -> Self {
        SimSlave {
            ack_budget: n,
            ..self
        }
    }

    /// Bytes sent to the master on reads. 0xFF (line released) once exhausted.
    pub fn transmitting(self, data: &[u8]) -> Self {
        SimSlave {
            tx: data.to_vec(),
            ..self
        }
    }

    fn on_start(&mut self) {
        self.pull_low = false;
        self.received.clear();
        self.state = SlaveState::Rx {
            bits: 0,
            value: 0,
            address: true,
        };
    }

    fn on_stop(&mut self) {
        self.pull_low = false;
        self.state = SlaveState::Idle;
    }

    fn on_rise(&mut self, sda: Level) {
        self.state = match self.state {
            SlaveState::Rx {
                bits,
                value,
                address,
            } if bits < 8 => SlaveState::Rx {
                bits: bits + 1,
                value: (value << 1) | sda.is_high() as u8,
                address,
            },
            SlaveState::Tx { byte, sent } => SlaveState::Tx {
                byte,
                sent: sent + 1,
            },
            SlaveState::AwaitMasterAck { .. } => SlaveState::AwaitMasterAck {
                acked: sda.is_low(),
            },
            other => other,
        };
    }

    fn on_fall(&mut self) {
        match self.state {
            SlaveState::Rx {
                bits: 8,
                value,
                address: true,
            } => {
                if self.address == Some(value >> 1) {
                    self.pull_low = true;
                    self.state = SlaveState::AckOut {
                        then_tx: value & 1 == 1,
                    };
                } else {
                    self.state = SlaveState::Ignore;
                }
            }
            SlaveState::Rx {
                bits: 8,
                value,
                address: false,
            } => {
                self.received.push(value);
                if self.received.len() <= self.ack_budget {
                    self.pull_low = true;
                    self.state = SlaveState::AckOut { then_tx: false };
                } else {
                    self.state = SlaveState::Ignore;
                }
            }
            SlaveState::AckOut { then_tx } => {
                self.pull_low = false;
                if then_tx {
                    self.load_next();
                } else {
                    self.state = SlaveState::Rx {
                        bits: 0,
                        value: 0,
                        address: false,
                    };
                }
            }
            SlaveState::Tx { byte, sent } => {
                if sent < 8 {
                    self.pull_low = (byte >> (7 - sent)) & 1 == 0;
                } else {
                    self.pull_low = false;
                    self.state = SlaveState::AwaitMasterAck { acked: false };
                }
            }
            SlaveState::AwaitMasterAck { acked } => {
                if acked {
                    self.load_next();
                } else {
                    self.state = SlaveState::Ignore;
                }
            }
            _ => {}
        }
    }

    fn load_next(&mut self) {
        let byte = self.tx.get(self.tx_pos).copied().unwrap_or(0xFF);
        self.tx_pos += 1;
        self.pull_low = byte & 0x80 == 0;
        self.state = SlaveState::Tx { byte, sent: 0 };
    }
}

#[derive(Default)]
struct Analyzer {
    active: bool,
    bits: u8,
    value: u8,
    frames: Vec<Frame>,
}

impl Analyzer {
    fn on_start(&mut self) {
        self.active = true;
        self.bits = 0;
        self.value = 0;
        self.frames.push(Frame::Start);
    }

    fn on_stop(&mut self) {
        // SDA rising with SCL high outside a transaction is not worth reporting
        if self.active {
            self.frames.push(Frame::Stop);
        }
        self.active = false;
    }

    fn on_rise(&mut self, sda: Level) {
        if !self.active {
            return;
        }
        if self.bits < 8 {
            self.value = (self.value << 1) | sda.is_high() as u8;
            self.bits += 1;
            if self.bits == 8 {
                self.frames.push(Frame::Byte(self.value));
            }
        } else {
            self.frames.push(if sda.is_low() { Frame::Ack } else { Frame::Nack });
            self.bits = 0;
            self.value = 0;
        }
    }
}

#[derive(Clone, Copy)]
struct Wire {
    dir: Direction,
    level: Level,
}

impl Wire {
    fn driven(self) -> Level {
        match self.dir {
            Direction::Output => self.level,
            Direction::Input => Level::High,
        }
    }
}

struct State {
    scl: Wire,
    sda: Wire,
    slave: SimSlave,
    analyzer: Analyzer,
    pulses: Vec<Pulse>,
    open_pulse: Option<Pulse>,
    delays: Vec<u32>,
    sda_reads: usize,
}

impl State {
    fn scl_level(&self) -> Level {
        self.scl.driven()
    }

    fn sda_level(&self) -> Level {
        if self.slave.pull_low {
            Level::Low
        } else {
            self.sda.driven()
        }
    }

    // Apply a master action, then propagate the resulting edges
    fn apply<F: FnOnce(&mut State)>(&mut self, f: F) {
        let (scl_before, sda_before) = (self.scl_level(), self.sda_level());
        f(self);
        let (scl, sda) = (self.scl_level(), self.sda_level());

        if scl != scl_before {
            if scl.is_high() {
                self.open_pulse = Some(Pulse {
                    sda_at_rise: sda,
                    sda_steady: true,
                });
                self.analyzer.on_rise(sda);
                self.slave.on_rise(sda);
            } else {
                if let Some(pulse) = self.open_pulse.take() {
                    self.pulses.push(pulse);
                }
                self.slave.on_fall();
            }
        } else if sda != sda_before && scl.is_high() {
            if let Some(pulse) = self.open_pulse.as_mut() {
                pulse.sda_steady = false;
            }
            if sda.is_low() {
                self.analyzer.on_start();
                self.slave.on_start();
            } else {
                self.analyzer.on_stop();
                self.slave.on_stop();
            }
        }
    }
}

/// Shared bus state. Lines and delay handed to the engine point back into it.
pub(crate) struct SimBus {
    state: Rc<RefCell<State>>,
}

impl SimBus {
    pub fn new(slave: SimSlave) -> Self {
        let released = Wire {
            dir: Direction::Input,
            level: Level::High,
        };
        SimBus {
            state: Rc::new(RefCell::new(State {
                scl: released,
                sda: released,
                slave,
                analyzer: Analyzer::default(),
                pulses: Vec::new(),
                open_pulse: None,
                delays: Vec::new(),
                sda_reads: 0,
            })),
        }
    }

    pub fn scl(&self) -> SimLine {
        SimLine {
            state: self.state.clone(),
            which: Which::Scl,
        }
    }

    pub fn sda(&self) -> SimLine {
        SimLine {
            state: self.state.clone(),
            which: Which::Sda,
        }
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay {
            state: self.state.clone(),
        }
    }

    /// Forget recorded activity. Line levels and device state are kept.
    pub fn clear_trace(&self) {
        let mut s = self.state.borrow_mut();
        s.analyzer.frames.clear();
        s.pulses.clear();
        s.delays.clear();
        s.sda_reads = 0;
    }

    pub fn scl_level(&self) -> Level {
        self.state.borrow().scl_level()
    }

    pub fn sda_level(&self) -> Level {
        self.state.borrow().sda_level()
    }

    pub fn sda_direction(&self) -> Direction {
        self.state.borrow().sda.dir
    }

    /// Both wires high
    pub fn is_idle(&self) -> bool {
        let s = self.state.borrow();
        s.scl_level().is_high() && s.sda_level().is_high()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.state.borrow().analyzer.frames.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.state
            .borrow()
            .analyzer
            .frames
            .iter()
            .filter(|f| **f == Frame::Stop)
            .count()
    }

    /// Completed SCL pulses
    pub fn pulses(&self) -> Vec<Pulse> {
        self.state.borrow().pulses.clone()
    }

    /// Completed pulses packed eight at a time, MSB first
    pub fn shifted_bytes(&self) -> Vec<u8> {
        self.pulses()
            .chunks(8)
            .filter(|c| c.len() == 8)
            .map(|c| {
                c.iter()
                    .fold(0u8, |acc, p| (acc << 1) | p.sda_at_rise.is_high() as u8)
            })
            .collect()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.state.borrow().delays.clone()
    }

    pub fn sda_reads(&self) -> usize {
        self.state.borrow().sda_reads
    }

    /// Data bytes the slave clocked in during the current or last write
    pub fn received(&self) -> Vec<u8> {
        self.state.borrow().slave.received.clone()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Which {
    Scl,
    Sda,
}

pub(crate) struct SimLine {
    state: Rc<RefCell<State>>,
    which: Which,
}

impl SimLine {
    fn wire<'a>(&self, s: &'a mut State) -> &'a mut Wire {
        match self.which {
            Which::Scl => &mut s.scl,
            Which::Sda => &mut s.sda,
        }
    }
}

impl GpioLine for SimLine {
    fn set_output(&mut self) {
        let mut s = self.state.borrow_mut();
        s.apply(|s| self.wire(s).dir = Direction::Output);
    }

    fn set_input(&mut self) {
        let mut s = self.state.borrow_mut();
        s.apply(|s| self.wire(s).dir = Direction::Input);
    }

    fn write(&mut self, level: Level) {
        let mut s = self.state.borrow_mut();
        s.apply(|s| self.wire(s).level = level);
    }

    fn read(&mut self) -> Level {
        let mut s = self.state.borrow_mut();
        match self.which {
            Which::Scl => s.scl_level(),
            Which::Sda => {
                s.sda_reads += 1;
                s.sda_level()
            }
        }
    }
}

pub(crate) struct SimDelay {
    state: Rc<RefCell<State>>,
}

impl TimingSource for SimDelay {
    fn delay_us(&mut self, us: u32) {
        self.state.borrow_mut().delays.push(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wired_and_sda() {
        let sim = SimBus::new(SimSlave::absent());
        let mut sda = sim.sda();
        assert_eq!(sim.sda_level(), Level::High);
        sda.write(Level::Low);
        // Input mode: master write not driven
        assert_eq!(sim.sda_level(), Level::High);
        sda.set_output();
        assert_eq!(sim.sda_level(), Level::Low);
        sim.state.borrow_mut().slave.pull_low = true;
        sda.write(Level::High);
        assert_eq!(sda.read(), Level::Low);
        assert_eq!(sim.sda_reads(), 1);
    }

    #[test]
    fn analyzer_decodes_manual_waveform() {
        let sim = SimBus::new(SimSlave::absent());
        let (mut scl, mut sda) = (sim.scl(), sim.sda());
        scl.set_output();
        sda.set_output();
        // Start
        sda.write(Level::Low);
        scl.write(Level::Low);
        // 0x81 then a high ack bit
        for &bit in &[true, false, false, false, false, false, false, true, true] {
            sda.write(Level::from_bit(bit));
            scl.write(Level::High);
            scl.write(Level::Low);
        }
        // Stop
        sda.write(Level::Low);
        scl.write(Level::High);
        sda.write(Level::High);

        assert_eq!(
            sim.frames(),
            vec![
                Frame::Start,
                Frame::Byte(0x81),
                Frame::Nack,
                Frame::Stop
            ]
        );
        assert_eq!(sim.pulses().len(), 9);
        assert_eq!(sim.shifted_bytes(), vec![0x81]);
    }
}

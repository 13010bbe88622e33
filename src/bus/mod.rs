//! Clocked SUMI bus: shared signal state, driver and monitor.
//!
//! The bus wires are plain cells in [`SumiBus`], shared between a driver
//! and a monitor (and the test harness) through [`SharedBus`]. There is
//! no clock object here: the scheduling substrate calls `clock_edge()`
//! on each state machine once per rising edge, in edge order. Within one
//! edge, monitors sample first (they observe the wires as driven during
//! the previous cycle), then drivers update the wires for the next
//! cycle.
//!
//! Signal contract (wire names):
//!
//! | Signal    | Direction      | Description                       |
//! |:----------|:---------------|:----------------------------------|
//! | `valid`   | driver -> peer | Transaction fields are live       |
//! | `ready`   | peer -> driver | Peer accepts on the next edge     |
//! | `cmd`     | driver -> peer | 32-bit command header             |
//! | `dstaddr` | driver -> peer | Destination address               |
//! | `srcaddr` | driver -> peer | Source address (response route)   |
//! | `data`    | driver -> peer | Payload, padded to the bus width  |

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

pub mod driver;
pub mod monitor;

pub use driver::SumiDriver;
pub use monitor::{SumiMonitor, SumiObserver};

/// Geometry of one bus instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Width of the `data` signal in bytes.
    pub data_width_bytes: usize,
    /// Width of the address signals in bits.
    pub addr_width_bits: u32,
}

impl BusConfig {
    pub fn new(data_width_bytes: usize, addr_width_bits: u32) -> Self {
        Self {
            data_width_bytes,
            addr_width_bits,
        }
    }

    /// Mask selecting the configured address bits.
    pub fn addr_mask(&self) -> u64 {
        if self.addr_width_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.addr_width_bits) - 1
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        // 256-bit data bus, 64-bit addressing.
        Self {
            data_width_bytes: 32,
            addr_width_bits: 64,
        }
    }
}

/// Current values of the bus wires.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SumiBus {
    pub valid: bool,
    pub ready: bool,
    pub cmd: u32,
    pub dstaddr: u64,
    pub srcaddr: u64,
    pub data: Vec<u8>,
}

impl SumiBus {
    /// A fresh bus wrapped for sharing between driver, monitor and
    /// harness.
    pub fn shared() -> SharedBus {
        Rc::new(RefCell::new(SumiBus::default()))
    }
}

/// Bus wires shared between the state machines on one channel.
pub type SharedBus = Rc<RefCell<SumiBus>>;

#[cfg(test)]
mod tests_handshake;

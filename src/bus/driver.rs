//! SUMI bus driver state machine.
//!
//! Serializes a FIFO queue of transactions onto the bus wires under the
//! valid/ready handshake. Two states: `Idle` (queue empty, valid low)
//! and `Driving` (the front transaction's fields held stable on the
//! wires). A transaction is accepted when valid and ready are both
//! observed true at a rising edge; only then does the driver move on.

use std::collections::VecDeque;

use log::trace;

use crate::error::UmiError;
use crate::sumi::SumiTransaction;

use super::{BusConfig, SharedBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Idle,
    Driving,
}

pub struct SumiDriver {
    bus: SharedBus,
    config: BusConfig,
    queue: VecDeque<SumiTransaction>,
    state: DriverState,
}

impl SumiDriver {
    pub fn new(bus: SharedBus, config: BusConfig) -> Self {
        {
            let mut wires = bus.borrow_mut();
            wires.valid = false;
            wires.data.resize(config.data_width_bytes, 0);
        }
        Self {
            bus,
            config,
            queue: VecDeque::new(),
            state: DriverState::Idle,
        }
    }

    pub fn config(&self) -> BusConfig {
        self.config
    }

    /// Queue a transaction for transfer. FIFO: units go out strictly in
    /// append order. A payload wider than the bus is a construction-side
    /// defect; the transport layer exists to fragment such transfers.
    pub fn append(&mut self, txn: SumiTransaction) -> Result<(), UmiError> {
        if txn.payload().len() > self.config.data_width_bytes {
            return Err(UmiError::PayloadExceedsBus {
                len: txn.payload().len(),
                bus_width: self.config.data_width_bytes,
            });
        }
        self.queue.push_back(txn);
        Ok(())
    }

    /// Number of transactions not yet accepted by the peer.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.state == DriverState::Idle
    }

    /// Discard all pending transactions, including one currently on the
    /// wires but not yet accepted. Silent by design; once a transaction
    /// has been accepted it cannot be recalled.
    pub fn clear_pending(&mut self) {
        self.queue.clear();
        self.state = DriverState::Idle;
        self.bus.borrow_mut().valid = false;
    }

    /// Advance one rising clock edge: sample the handshake, retire the
    /// front transaction on acceptance, then drive the next (or go
    /// idle). Calling this once per edge, in edge order, is the entire
    /// scheduling contract.
    pub fn clock_edge(&mut self) {
        let accepted = {
            let wires = self.bus.borrow();
            wires.valid && wires.ready
        };

        if accepted && self.state == DriverState::Driving {
            if let Some(txn) = self.queue.pop_front() {
                trace!(
                    "driver: accepted cmd=0x{:08x} da=0x{:x}",
                    txn.cmd().raw(),
                    txn.dstaddr()
                );
            }
        }

        match self.queue.front() {
            Some(txn) => {
                let mut wires = self.bus.borrow_mut();
                wires.valid = true;
                wires.cmd = txn.cmd().raw();
                wires.dstaddr = txn.dstaddr() & self.config.addr_mask();
                wires.srcaddr = txn.srcaddr() & self.config.addr_mask();
                wires.data.clear();
                wires.data.extend_from_slice(txn.payload());
                wires.data.resize(self.config.data_width_bytes, 0);
                self.state = DriverState::Driving;
            }
            None => {
                self.bus.borrow_mut().valid = false;
                self.state = DriverState::Idle;
            }
        }
    }
}

//! SUMI bus monitor.
//!
//! Samples the wires at every rising edge; when valid and ready are both
//! high, the visible header, addresses and payload become a new
//! transaction, delivered synchronously to every registered observer in
//! registration order. An observer returning an error is logged and
//! skipped; it never blocks delivery to the observers behind it.

use std::cell::RefCell;
use std::rc::Rc;

use log::{trace, warn};

use crate::error::UmiError;
use crate::sumi::{SumiCmd, SumiTransaction};

use super::{BusConfig, SharedBus};

/// Receives transactions captured by a [`SumiMonitor`].
pub trait SumiObserver {
    fn on_transaction(&mut self, txn: &SumiTransaction) -> Result<(), UmiError>;
}

pub struct SumiMonitor {
    bus: SharedBus,
    config: BusConfig,
    observers: Vec<Rc<RefCell<dyn SumiObserver>>>,
    captured: u64,
}

impl SumiMonitor {
    pub fn new(bus: SharedBus, config: BusConfig) -> Self {
        Self {
            bus,
            config,
            observers: Vec::new(),
            captured: 0,
        }
    }

    pub fn config(&self) -> BusConfig {
        self.config
    }

    /// Total number of transactions captured since construction.
    pub fn captured(&self) -> u64 {
        self.captured
    }

    pub fn add_observer(&mut self, observer: Rc<RefCell<dyn SumiObserver>>) {
        self.observers.push(observer);
    }

    /// Sample the wires for one rising edge.
    ///
    /// The payload is sliced to the length the header declares, bounded
    /// by the bus width, and only for data-carrying commands; bytes
    /// beyond the driven payload read as the driver's zero padding.
    pub fn clock_edge(&mut self) {
        let txn = {
            let wires = self.bus.borrow();
            if !(wires.valid && wires.ready) {
                return;
            }
            let cmd = SumiCmd::from_raw(wires.cmd);
            let take = cmd
                .expected_payload_len()
                .min(self.config.data_width_bytes)
                .min(wires.data.len());
            SumiTransaction::observed(
                cmd,
                wires.dstaddr,
                wires.srcaddr,
                wires.data[..take].to_vec(),
            )
        };

        self.captured += 1;
        trace!(
            "monitor: captured cmd=0x{:08x} da=0x{:x} sa=0x{:x} bytes={}",
            txn.cmd().raw(),
            txn.dstaddr(),
            txn.srcaddr(),
            txn.payload().len()
        );

        for observer in &self.observers {
            if let Err(e) = observer.borrow_mut().on_transaction(&txn) {
                warn!("monitor: observer rejected transaction: {e}");
            }
        }
    }
}

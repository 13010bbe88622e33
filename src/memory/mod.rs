//! Virtual memory device responding to SUMI requests.
//!
//! The device observes request transactions through a [`SumiMonitor`]
//! feed and pushes response transactions into a [`SumiDriver`] sink.
//! Its backing store is a byte-addressable sparse map owned exclusively
//! by the device: reads of unmapped bytes return zero, writes populate
//! the map, and `clear()` resets everything.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{info, warn};
use serde::Serialize;

use crate::bus::{BusConfig, SumiDriver, SumiMonitor, SumiObserver};
use crate::error::UmiError;
use crate::sumi::{AtomicOp, CmdFields, CmdType, ErrorCode, SumiTransaction};
use crate::tumi::TumiTransaction;

pub struct UmiMemoryDevice {
    memory: BTreeMap<u64, u8>,
    config: BusConfig,
    responses: Rc<RefCell<SumiDriver>>,
}

/// Serializable snapshot of the device for inspection.
#[derive(Debug, Serialize)]
struct DeviceState<'a> {
    config: &'a BusConfig,
    memory: &'a BTreeMap<u64, u8>,
}

impl UmiMemoryDevice {
    pub fn new(responses: Rc<RefCell<SumiDriver>>, config: BusConfig) -> Self {
        Self {
            memory: BTreeMap::new(),
            config,
            responses,
        }
    }

    /// Build a device wired to `monitor` for requests and `responses`
    /// for replies, and register it as an observer. The returned handle
    /// keeps direct access for test setup and inspection.
    pub fn attach(
        monitor: &mut SumiMonitor,
        responses: Rc<RefCell<SumiDriver>>,
        config: BusConfig,
    ) -> Rc<RefCell<UmiMemoryDevice>> {
        let device = Rc::new(RefCell::new(UmiMemoryDevice::new(responses, config)));
        monitor.add_observer(device.clone());
        device
    }

    /// Read `len` bytes starting at `addr`; unmapped bytes read as zero.
    pub fn read(&self, addr: u64, len: usize) -> Vec<u8> {
        (0..len as u64)
            .map(|i| self.memory.get(&(addr + i)).copied().unwrap_or(0))
            .collect()
    }

    /// Write bytes at `addr` (direct accessor for test setup).
    pub fn write(&mut self, addr: u64, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.memory.insert(addr + i as u64, *byte);
        }
    }

    /// All mapped bytes as sorted `(address, value)` pairs.
    pub fn dump(&self) -> Vec<(u64, u8)> {
        self.memory.iter().map(|(a, b)| (*a, *b)).collect()
    }

    /// Number of mapped bytes.
    pub fn mapped_bytes(&self) -> usize {
        self.memory.len()
    }

    /// Forget all memory contents.
    pub fn clear(&mut self) {
        self.memory.clear();
    }

    /// JSON snapshot of configuration and memory contents.
    pub fn read_state(&self) -> serde_json::Value {
        serde_json::to_value(DeviceState {
            config: &self.config,
            memory: &self.memory,
        })
        .unwrap_or(serde_json::Value::Null)
    }

    fn handle_write(&mut self, txn: &SumiTransaction, respond: bool) -> Result<(), UmiError> {
        let addr = txn.dstaddr();
        info!(
            "MEM WRITE: addr=0x{:08x} size={} respond={}",
            addr,
            txn.payload().len(),
            respond
        );
        self.write(addr, txn.payload());

        if respond {
            let cmd = CmdFields {
                eom: true,
                ..CmdFields::of(CmdType::RespWrite)
            }
            .encode()?;
            let resp = SumiTransaction::new(cmd, txn.srcaddr(), txn.dstaddr(), Vec::new())?;
            self.responses.borrow_mut().append(resp)?;
        }
        Ok(())
    }

    fn handle_read(&mut self, txn: &SumiTransaction) -> Result<(), UmiError> {
        let addr = txn.dstaddr();
        let total = txn.cmd().total_bytes();
        let data = self.read(addr, total);
        info!("MEM READ: addr=0x{:08x} size={}", addr, total);

        let cmd = CmdFields {
            size: txn.cmd().size(),
            len: txn.cmd().len(),
            ..CmdFields::of(CmdType::RespRead)
        }
        .encode()?;
        // Responses wider than the bus go back through the transport
        // layer, one fragment per bus beat.
        let resp = TumiTransaction::new(cmd, txn.srcaddr(), txn.dstaddr(), data);
        let mut driver = self.responses.borrow_mut();
        for fragment in resp.to_sumi(self.config.data_width_bytes)? {
            driver.append(fragment)?;
        }
        Ok(())
    }

    fn handle_atomic(&mut self, txn: &SumiTransaction) -> Result<(), UmiError> {
        let word = txn.cmd().bytes_per_word();
        let op = match AtomicOp::from_raw(txn.cmd().atype()) {
            Some(op) if txn.payload().len() >= word => op,
            _ => {
                warn!(
                    "malformed atomic: atype=0x{:02x} operand bytes={} word={}",
                    txn.cmd().atype(),
                    txn.payload().len(),
                    word
                );
                return self.send_error(txn, ErrorCode::DevErr);
            }
        };

        let addr = txn.dstaddr();
        let old = self.read(addr, word);
        let new = op.apply(&old, &txn.payload()[..word]);
        self.write(addr, &new);
        info!("MEM ATOMIC: addr=0x{:08x} op={:?} width={}", addr, op, word);

        // The caller observes the pre-operation value.
        let cmd = CmdFields {
            size: txn.cmd().size(),
            eom: true,
            ..CmdFields::of(CmdType::RespRead)
        }
        .encode()?;
        let resp = SumiTransaction::new(cmd, txn.srcaddr(), txn.dstaddr(), old)?;
        self.responses.borrow_mut().append(resp)?;
        Ok(())
    }

    /// Emit an error response. Memory state is never touched on this
    /// path; the device keeps servicing subsequent requests.
    fn send_error(&mut self, txn: &SumiTransaction, code: ErrorCode) -> Result<(), UmiError> {
        let cmd = CmdFields {
            user: code as u8,
            eom: true,
            ..CmdFields::of(CmdType::ReqError)
        }
        .encode()?;
        let resp = SumiTransaction::new(cmd, txn.srcaddr(), txn.dstaddr(), Vec::new())?;
        self.responses.borrow_mut().append(resp)?;
        Ok(())
    }
}

impl SumiObserver for UmiMemoryDevice {
    fn on_transaction(&mut self, txn: &SumiTransaction) -> Result<(), UmiError> {
        match txn.cmd().cmd_type() {
            Some(CmdType::ReqWrite) => self.handle_write(txn, true),
            Some(CmdType::ReqPosted) => self.handle_write(txn, false),
            Some(CmdType::ReqRead) => self.handle_read(txn),
            Some(CmdType::ReqAtomic) => self.handle_atomic(txn),
            Some(t) if t.is_response() => {
                // A response on the request feed is someone else's
                // traffic; answering it would loop.
                warn!("ignoring response command on request feed: {t:?}");
                Ok(())
            }
            other => {
                warn!(
                    "unhandled command type 0x{:02x} ({other:?})",
                    txn.cmd().fields().cmd_type
                );
                self.send_error(txn, ErrorCode::DevErr)
            }
        }
    }
}

#![no_main]

//! Memory Device Request Storm Fuzzer
//!
//! Drives arbitrary request streams at a memory responder and checks:
//! - The device never panics, even on malformed or reserved opcodes
//! - Every non-posted request eventually produces a response
//! - Memory state stays readable after arbitrary traffic

use std::cell::RefCell;
use std::rc::Rc;

use libfuzzer_sys::fuzz_target;
use umibus::{
    BusConfig, CmdFields, CmdType, SumiBus, SumiCmd, SumiDriver, SumiMonitor, SumiObserver,
    SumiTransaction, UmiError, UmiMemoryDevice,
};

struct ResponseCount(Rc<RefCell<usize>>);

impl SumiObserver for ResponseCount {
    fn on_transaction(&mut self, _txn: &SumiTransaction) -> Result<(), UmiError> {
        *self.0.borrow_mut() += 1;
        Ok(())
    }
}

fuzz_target!(|ops: Vec<(u8, u8, u32, u32)>| {
    let config = BusConfig {
        data_width_bytes: 16,
        addr_width_bits: 64,
    };

    let req_bus = SumiBus::shared();
    let mut host = SumiDriver::new(req_bus.clone(), config);
    let mut req_monitor = SumiMonitor::new(req_bus.clone(), config);

    let resp_bus = SumiBus::shared();
    let resp_driver = Rc::new(RefCell::new(SumiDriver::new(resp_bus.clone(), config)));
    let mut resp_monitor = SumiMonitor::new(resp_bus.clone(), config);

    let device = UmiMemoryDevice::attach(&mut req_monitor, resp_driver.clone(), config);
    let seen = Rc::new(RefCell::new(0usize));
    resp_monitor.add_observer(Rc::new(RefCell::new(ResponseCount(seen.clone()))));

    req_bus.borrow_mut().ready = true;
    resp_bus.borrow_mut().ready = true;

    let mut expected_responses = 0usize;
    for (op, raw_size, addr, value) in &ops {
        let addr = (*addr as u64) & 0xFFFF;
        let cmd = match op % 5 {
            0 => CmdFields::of(CmdType::ReqWrite).encode().unwrap(),
            1 => CmdFields::of(CmdType::ReqPosted).encode().unwrap(),
            2 => CmdFields::of(CmdType::ReqRead).encode().unwrap(),
            3 => {
                // Atomic with a possibly-reserved atype in the len field.
                let fields = CmdFields {
                    len: raw_size % 12,
                    ..CmdFields::of(CmdType::ReqAtomic)
                };
                fields.encode().unwrap()
            }
            4 => {
                // Arbitrary opcode, including reserved and malformed ones.
                SumiCmd::from_raw(u32::from_le_bytes([
                    *raw_size,
                    0,
                    0,
                    0,
                ]))
            }
            _ => unreachable!(),
        };

        let payload_len = cmd.expected_payload_len().min(config.data_width_bytes);
        let payload: Vec<u8> = value.to_le_bytes()[..payload_len.min(4)]
            .iter()
            .copied()
            .chain(std::iter::repeat(0))
            .take(payload_len)
            .collect();

        let Ok(txn) = SumiTransaction::new(cmd, addr, 0x9000, payload) else {
            continue;
        };
        if host.append(txn).is_err() {
            continue;
        }
        // Everything but posted writes and (loop-guarded) response
        // opcodes draws at least one response beat; reads may draw more
        // when the reply fragments.
        match cmd.cmd_type() {
            Some(CmdType::ReqPosted) => {}
            Some(kind) if kind.is_response() => {}
            _ => expected_responses += 1,
        }
    }

    // Enough edges to drain every queued request plus its responses.
    for _ in 0..(ops.len() * 8 + 16) {
        req_monitor.clock_edge();
        resp_monitor.clock_edge();
        host.clock_edge();
        resp_driver.borrow_mut().clock_edge();
    }

    assert!(*seen.borrow() >= expected_responses);
    let _ = device.borrow().read_state();
    let _ = device.borrow().mapped_bytes();
});

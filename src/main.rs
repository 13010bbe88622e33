//! Loopback demo: a host issuing requests to a virtual memory device
//! over a pair of SUMI channels. Run with `RUST_LOG=trace` to watch the
//! handshake and the device's memory traffic.

use std::cell::RefCell;
use std::rc::Rc;

use umibus::stimulus::{ReadyToggler, WaveToggle};
use umibus::{
    BusConfig, CmdFields, CmdType, SumiBus, SumiDriver, SumiMonitor, SumiObserver,
    SumiTransaction, UmiError, UmiMemoryDevice,
};

/// Collects everything the host sees on the response channel.
struct ResponseLog {
    seen: Vec<SumiTransaction>,
}

impl SumiObserver for ResponseLog {
    fn on_transaction(&mut self, txn: &SumiTransaction) -> Result<(), UmiError> {
        self.seen.push(txn.clone());
        Ok(())
    }
}

fn main() -> Result<(), UmiError> {
    env_logger::init();

    let config = BusConfig::new(32, 64);

    // Request channel: host driver -> device monitor.
    let req_bus = SumiBus::shared();
    let mut host = SumiDriver::new(req_bus.clone(), config);
    let mut req_monitor = SumiMonitor::new(req_bus.clone(), config);

    // Response channel: device driver -> host monitor.
    let resp_bus = SumiBus::shared();
    let resp_driver = Rc::new(RefCell::new(SumiDriver::new(resp_bus.clone(), config)));
    let mut resp_monitor = SumiMonitor::new(resp_bus.clone(), config);

    let device = UmiMemoryDevice::attach(&mut req_monitor, resp_driver.clone(), config);
    let responses = Rc::new(RefCell::new(ResponseLog { seen: Vec::new() }));
    resp_monitor.add_observer(responses.clone());

    // The device accepts every cycle; the host stutters its ready line
    // so the trace shows the handshake riding out backpressure.
    req_bus.borrow_mut().ready = true;
    let mut host_ready = ReadyToggler::new(resp_bus.clone(), WaveToggle::new(3, 8, 2, 8));

    // Write four bytes at 0x1000, then read them back.
    let write = CmdFields {
        size: 0,
        len: 3,
        eom: true,
        ..CmdFields::of(CmdType::ReqWrite)
    }
    .encode()?;
    host.append(SumiTransaction::new(
        write,
        0x1000,
        0x8000,
        vec![0xDE, 0xAD, 0xBE, 0xEF],
    )?)?;

    let read = CmdFields {
        size: 0,
        len: 3,
        eom: true,
        ..CmdFields::of(CmdType::ReqRead)
    }
    .encode()?;
    host.append(SumiTransaction::new(read, 0x1000, 0x8000, Vec::new())?)?;

    for _ in 0..32 {
        req_monitor.clock_edge();
        resp_monitor.clock_edge();
        host.clock_edge();
        resp_driver.borrow_mut().clock_edge();
        host_ready.clock_edge();
    }

    for txn in &responses.borrow().seen {
        println!(
            "response: cmd={:?} da=0x{:x} payload={:02x?}",
            txn.cmd().cmd_type(),
            txn.dstaddr(),
            txn.payload()
        );
    }
    println!("device state: {}", device.borrow().read_state());
    Ok(())
}

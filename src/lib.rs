//! Umibus - a transaction-level model of the UMI memory-access protocol
//!
//! This library models the SUMI (transaction) and TUMI (transport)
//! layers of the protocol: the 32-bit command header codec, the
//! fragmentation of large transfers into bus-sized units, the
//! valid/ready driver and monitor state machines, and a virtual memory
//! device that answers requests, including atomics and error responses.

pub mod bits;
pub mod bus;
pub mod error;
pub mod memory;
pub mod stimulus;
pub mod sumi;
pub mod tumi;

pub use bus::{BusConfig, SharedBus, SumiBus, SumiDriver, SumiMonitor, SumiObserver};
pub use error::UmiError;
pub use memory::UmiMemoryDevice;
pub use sumi::{AtomicOp, CmdFields, CmdType, ErrorCode, ProtMode, SumiCmd, SumiTransaction};
pub use tumi::{Reassembler, TumiTransaction};

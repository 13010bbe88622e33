#![no_main]

//! Fragmentation Round-Trip Fuzzer
//!
//! Lowers arbitrary payloads over arbitrary bus widths and checks:
//! - Every fragment fits in one bus beat
//! - Exactly the last fragment carries eom
//! - Reassembly reproduces the original transfer exactly

use libfuzzer_sys::fuzz_target;
use umibus::{CmdFields, CmdType, Reassembler, TumiTransaction};

fuzz_target!(|input: (Vec<u8>, u16, u64, u64)| {
    let (payload, width, dstaddr, srcaddr) = input;
    let bus_width = width as usize;
    if bus_width == 0 || payload.is_empty() {
        return;
    }
    // Keep headroom so dstaddr + offset stays in range.
    let dstaddr = dstaddr & 0x0000_FFFF_FFFF_FFFF;

    let cmd = match CmdFields::of(CmdType::ReqWrite).encode() {
        Ok(cmd) => cmd,
        Err(_) => return,
    };
    let transfer = TumiTransaction::new(cmd, dstaddr, srcaddr, payload);

    let fragments = match transfer.to_sumi(bus_width) {
        Ok(f) => f,
        Err(_) => return,
    };
    assert!(!fragments.is_empty());

    let last = fragments.len() - 1;
    for (i, frag) in fragments.iter().enumerate() {
        assert!(frag.payload().len() <= bus_width);
        assert_eq!(frag.cmd().eom(), i == last);
        assert_eq!(frag.srcaddr(), transfer.srcaddr);
    }

    let mut reasm = Reassembler::new();
    let mut rebuilt = None;
    for frag in &fragments {
        rebuilt = reasm.push(frag).expect("in-order fragments must chain");
    }
    let rebuilt = rebuilt.expect("eom fragment must complete the transfer");
    assert_eq!(rebuilt.dstaddr, transfer.dstaddr);
    assert_eq!(rebuilt.payload, transfer.payload);
});

//! TUMI transport layer: fragmentation and reassembly.
//!
//! A transport-level unit is a logical transfer of arbitrary payload
//! length. [`TumiTransaction::to_sumi`] lowers it into an ordered run of
//! transaction-layer units sized to a bus; [`Reassembler`] is the
//! inverse, accumulating observed fragments until end-of-message. Both
//! directions share [`fragment_spans`], so concatenating the lowered
//! payloads always reproduces the original transfer.

use std::ops::Range;

use log::trace;

use crate::error::UmiError;
use crate::sumi::{CmdFields, SumiCmd, SumiTransaction, MAX_TRANSFERS, MAX_WORD_BYTES};

/// A transport-level unit prior to fragmentation.
///
/// `cmd` is a header template: opcode, qos, prot, hostid and friends are
/// copied into every fragment; size, len and eom are overwritten per
/// fragment during lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TumiTransaction {
    pub cmd: SumiCmd,
    pub dstaddr: u64,
    pub srcaddr: u64,
    pub payload: Vec<u8>,
}

impl TumiTransaction {
    pub fn new(cmd: SumiCmd, dstaddr: u64, srcaddr: u64, payload: Vec<u8>) -> Self {
        Self {
            cmd,
            dstaddr,
            srcaddr,
            payload,
        }
    }

    /// Lower this transfer into bus-sized transaction-layer units.
    ///
    /// The word size is the largest power of two that fits the bus,
    /// capped at the protocol maximum of 128 bytes. Each fragment
    /// carries at most one bus beat of whole words, never more than the
    /// `word_size * 256` the LEN field can declare. Destination
    /// addresses advance with the payload offset; the source address
    /// (the response route) is identical across fragments, and exactly
    /// the last fragment has `eom` set.
    pub fn to_sumi(&self, bus_width_bytes: usize) -> Result<Vec<SumiTransaction>, UmiError> {
        if self.payload.is_empty() {
            return Err(UmiError::EmptyTransfer);
        }
        let (size, word) = word_size_for(bus_width_bytes)?;
        let beat = (bus_width_bytes / word) * word;
        let max_chunk = beat.min(word * MAX_TRANSFERS);
        let spans = fragment_spans(self.payload.len(), max_chunk);
        let last = spans.len() - 1;

        let mut out = Vec::with_capacity(spans.len());
        for (i, span) in spans.into_iter().enumerate() {
            let offset = span.start;
            let chunk = &self.payload[span];
            let words = chunk.len().div_ceil(word);
            let cmd = CmdFields {
                size,
                len: (words - 1) as u8,
                eom: i == last,
                ..self.cmd.fields()
            }
            .encode()?;
            trace!(
                "fragment {}: off={} bytes={} eom={}",
                i,
                offset,
                chunk.len(),
                cmd.eom()
            );
            let dstaddr = self.dstaddr + offset as u64;
            let txn = if chunk.len() == words * word {
                SumiTransaction::new(cmd, dstaddr, self.srcaddr, chunk.to_vec())?
            } else {
                SumiTransaction::new_partial(cmd, dstaddr, self.srcaddr, chunk.to_vec())?
            };
            out.push(txn);
        }
        Ok(out)
    }
}

/// Word size (SIZE value, byte width) for a bus: the largest power of
/// two no wider than the bus, capped at [`MAX_WORD_BYTES`].
pub fn word_size_for(bus_width_bytes: usize) -> Result<(u8, usize), UmiError> {
    if bus_width_bytes == 0 {
        return Err(UmiError::UnsupportedBusWidth(bus_width_bytes));
    }
    let capped = bus_width_bytes.min(MAX_WORD_BYTES);
    let size = capped.ilog2() as u8;
    Ok((size, 1usize << size))
}

/// Consecutive byte ranges of at most `max_chunk` covering `0..total`.
/// Shared by lowering and reassembly so the two stay in lockstep.
pub fn fragment_spans(total: usize, max_chunk: usize) -> Vec<Range<usize>> {
    let mut spans = Vec::with_capacity(total.div_ceil(max_chunk));
    let mut start = 0;
    while start < total {
        let end = (start + max_chunk).min(total);
        spans.push(start..end);
        start = end;
    }
    spans
}

/// Rebuilds one logical transfer from fragments observed in bus order.
///
/// Fragments of a single message are assumed contiguous: each one's
/// destination address must continue where the previous left off, and a
/// mismatched source address means a foreign message interleaved into
/// the stream, which this model treats as a protocol violation rather
/// than attempting to demultiplex.
#[derive(Debug, Default)]
pub struct Reassembler {
    inflight: Option<Inflight>,
}

#[derive(Debug)]
struct Inflight {
    cmd: SumiCmd,
    dstaddr: u64,
    srcaddr: u64,
    payload: Vec<u8>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when fragments have been accepted but no eom seen yet.
    pub fn is_inflight(&self) -> bool {
        self.inflight.is_some()
    }

    /// Discard any partially accumulated message.
    pub fn reset(&mut self) {
        self.inflight = None;
    }

    /// Feed one observed fragment. Returns the rebuilt transfer when the
    /// fragment carries `eom`, `None` while the message is still open.
    pub fn push(&mut self, txn: &SumiTransaction) -> Result<Option<TumiTransaction>, UmiError> {
        match &mut self.inflight {
            None => {
                self.inflight = Some(Inflight {
                    cmd: txn.cmd(),
                    dstaddr: txn.dstaddr(),
                    srcaddr: txn.srcaddr(),
                    payload: txn.payload().to_vec(),
                });
            }
            Some(msg) => {
                let expected_addr = msg.dstaddr + msg.payload.len() as u64;
                if txn.srcaddr() != msg.srcaddr || txn.dstaddr() != expected_addr {
                    return Err(UmiError::FragmentSequence {
                        expected_addr,
                        actual_addr: txn.dstaddr(),
                    });
                }
                msg.payload.extend_from_slice(txn.payload());
            }
        }

        if txn.cmd().eom() {
            Ok(self
                .inflight
                .take()
                .map(|msg| TumiTransaction::new(msg.cmd, msg.dstaddr, msg.srcaddr, msg.payload)))
        } else {
            Ok(None)
        }
    }
}

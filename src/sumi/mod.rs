//! SUMI transaction layer: command header codec and transaction model.
//!
//! A SUMI command header is a single 32-bit word interpreted as named
//! fields:
//!
//! | Bits    | Field    | Description                               |
//! |:--------|:---------|:------------------------------------------|
//! | [4:0]   | cmd_type | Command opcode                            |
//! | [7:5]   | size     | Word size (bytes per word = 2^SIZE)       |
//! | [15:8]  | len      | Word transfers minus one (ATYPE for atomics) |
//! | [19:16] | qos      | Quality of service                        |
//! | [21:20] | prot     | Protection mode                           |
//! | [22]    | eom      | End of message                            |
//! | [23]    | eof      | End of frame                              |
//! | [24]    | ex       | Exclusive access                          |
//! | [26:25] | u        | User bits (requests) / ERR (responses)    |
//! | [31:27] | hostid   | Host ID                                   |
//!
//! [`SumiCmd`] is an immutable value wrapping the raw word; there are no
//! field setters, so a header placed on the bus cannot change under a
//! driver's feet. [`CmdFields`] is the named-field view used to build
//! and inspect headers; encoding rejects out-of-width values.

use serde::{Deserialize, Serialize};

use crate::bits::BitField;
use crate::error::UmiError;

pub mod atomic;
pub use atomic::AtomicOp;

/// Largest word size the SIZE field can express (2^7 bytes).
pub const MAX_WORD_BYTES: usize = 128;

/// Largest transfer count the LEN field can express (LEN = 0xFF).
pub const MAX_TRANSFERS: usize = 256;

const CMD_TYPE: BitField = BitField::new(0, 5);
const SIZE: BitField = BitField::new(5, 3);
const LEN: BitField = BitField::new(8, 8);
const QOS: BitField = BitField::new(16, 4);
const PROT: BitField = BitField::new(20, 2);
const EOM: BitField = BitField::new(22, 1);
const EOF: BitField = BitField::new(23, 1);
const EX: BitField = BitField::new(24, 1);
const USER: BitField = BitField::new(25, 2);
const HOSTID: BitField = BitField::new(27, 5);

/// SUMI command opcodes.
///
/// The discriminant is the wire opcode, except for `ReqLink`, which
/// shares opcode 0x0F with `ReqError` and is distinguished by SIZE=1;
/// its discriminant folds that SIZE bit in at position 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CmdType {
    /// Invalid transaction indicator.
    Invalid = 0x00,

    // Requests (host -> device)
    ReqRead = 0x01,
    ReqWrite = 0x03,
    ReqPosted = 0x05,
    ReqRdma = 0x07,
    ReqAtomic = 0x09,
    ReqUser0 = 0x0B,
    ReqFuture0 = 0x0D,
    /// Error message (SIZE=0).
    ReqError = 0x0F,
    /// Link control (opcode 0x0F with SIZE=1).
    ReqLink = 0x2F,

    // Responses (device -> host)
    RespRead = 0x02,
    RespWrite = 0x04,
    RespUser0 = 0x06,
    RespUser1 = 0x08,
    RespFuture0 = 0x0A,
    RespFuture1 = 0x0C,
    RespLink = 0x0E,
}

impl CmdType {
    /// Classify a raw (opcode, size) pair; `None` for reserved opcodes.
    pub fn from_raw(opcode: u32, size: u32) -> Option<CmdType> {
        match opcode & 0x1F {
            0x00 => Some(CmdType::Invalid),
            0x01 => Some(CmdType::ReqRead),
            0x03 => Some(CmdType::ReqWrite),
            0x05 => Some(CmdType::ReqPosted),
            0x07 => Some(CmdType::ReqRdma),
            0x09 => Some(CmdType::ReqAtomic),
            0x0B => Some(CmdType::ReqUser0),
            0x0D => Some(CmdType::ReqFuture0),
            0x0F if size == 0x1 => Some(CmdType::ReqLink),
            0x0F => Some(CmdType::ReqError),
            0x02 => Some(CmdType::RespRead),
            0x04 => Some(CmdType::RespWrite),
            0x06 => Some(CmdType::RespUser0),
            0x08 => Some(CmdType::RespUser1),
            0x0A => Some(CmdType::RespFuture0),
            0x0C => Some(CmdType::RespFuture1),
            0x0E => Some(CmdType::RespLink),
            _ => None,
        }
    }

    /// The 5-bit wire opcode.
    pub const fn opcode(self) -> u8 {
        (self as u8) & 0x1F
    }

    /// SIZE value implied by the opcode (only `ReqLink` carries one).
    pub const fn size_tag(self) -> u8 {
        (self as u8) >> 5
    }

    /// True for host -> device commands.
    pub fn is_request(self) -> bool {
        matches!(
            self,
            CmdType::ReqRead
                | CmdType::ReqWrite
                | CmdType::ReqPosted
                | CmdType::ReqRdma
                | CmdType::ReqAtomic
                | CmdType::ReqUser0
                | CmdType::ReqFuture0
                | CmdType::ReqError
                | CmdType::ReqLink
        )
    }

    /// True for device -> host commands.
    pub fn is_response(self) -> bool {
        matches!(
            self,
            CmdType::RespRead
                | CmdType::RespWrite
                | CmdType::RespUser0
                | CmdType::RespUser1
                | CmdType::RespFuture0
                | CmdType::RespFuture1
                | CmdType::RespLink
        )
    }

    /// True if the command carries a data payload.
    pub fn has_data(self) -> bool {
        matches!(
            self,
            CmdType::ReqWrite
                | CmdType::ReqPosted
                | CmdType::ReqAtomic
                | CmdType::ReqUser0
                | CmdType::ReqFuture0
                | CmdType::RespRead
                | CmdType::RespUser1
                | CmdType::RespFuture1
        )
    }

    /// True if the command carries a source address.
    pub fn has_source_addr(self) -> bool {
        matches!(
            self,
            CmdType::ReqRead
                | CmdType::ReqWrite
                | CmdType::ReqPosted
                | CmdType::ReqRdma
                | CmdType::ReqAtomic
                | CmdType::ReqUser0
                | CmdType::ReqFuture0
                | CmdType::ReqError
        )
    }

    /// True if a logical message of this type may span multiple
    /// transaction-layer units.
    pub fn supports_streaming(self) -> bool {
        matches!(
            self,
            CmdType::ReqWrite | CmdType::ReqPosted | CmdType::RespRead
        )
    }
}

/// Error codes carried in the U field of responses (ERR[1:0]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorCode {
    Ok = 0b00,
    /// Successful exclusive access.
    ExOk = 0b01,
    /// Device error.
    DevErr = 0b10,
    /// Network error.
    NetErr = 0b11,
}

impl ErrorCode {
    pub const fn from_raw(raw: u32) -> ErrorCode {
        match raw & 0b11 {
            0b00 => ErrorCode::Ok,
            0b01 => ErrorCode::ExOk,
            0b10 => ErrorCode::DevErr,
            _ => ErrorCode::NetErr,
        }
    }
}

/// Protection modes (PROT[1:0]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProtMode {
    UnprivilegedSecure = 0b00,
    PrivilegedSecure = 0b01,
    UnprivilegedNonsecure = 0b10,
    PrivilegedNonsecure = 0b11,
}

impl ProtMode {
    pub const fn from_raw(raw: u32) -> ProtMode {
        match raw & 0b11 {
            0b00 => ProtMode::UnprivilegedSecure,
            0b01 => ProtMode::PrivilegedSecure,
            0b10 => ProtMode::UnprivilegedNonsecure,
            _ => ProtMode::PrivilegedNonsecure,
        }
    }
}

/// Named-field view of a SUMI command header.
///
/// `cmd_type` holds the raw 5-bit opcode so that decode(encode(f)) == f
/// over the whole field space, including reserved opcodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdFields {
    pub cmd_type: u8,
    pub size: u8,
    pub len: u8,
    pub qos: u8,
    pub prot: u8,
    pub eom: bool,
    pub eof: bool,
    pub ex: bool,
    pub user: u8,
    pub hostid: u8,
}

impl CmdFields {
    /// Fields for a command of the given type, all other fields zero.
    pub fn of(cmd_type: CmdType) -> Self {
        CmdFields {
            cmd_type: cmd_type.opcode(),
            size: cmd_type.size_tag(),
            ..CmdFields::default()
        }
    }

    /// Pack the fields into a header word, rejecting out-of-width values.
    pub fn encode(&self) -> Result<SumiCmd, UmiError> {
        let checks: [(&'static str, u32, BitField); 7] = [
            ("cmd_type", self.cmd_type as u32, CMD_TYPE),
            ("size", self.size as u32, SIZE),
            ("len", self.len as u32, LEN),
            ("qos", self.qos as u32, QOS),
            ("prot", self.prot as u32, PROT),
            ("u", self.user as u32, USER),
            ("hostid", self.hostid as u32, HOSTID),
        ];
        for (name, value, field) in checks {
            if !field.fits(value) {
                return Err(UmiError::FieldOverflow {
                    field: name,
                    value,
                    width: field.width,
                });
            }
        }

        let mut word = 0u32;
        word = CMD_TYPE.insert(word, self.cmd_type as u32);
        word = SIZE.insert(word, self.size as u32);
        word = LEN.insert(word, self.len as u32);
        word = QOS.insert(word, self.qos as u32);
        word = PROT.insert(word, self.prot as u32);
        word = EOM.insert(word, self.eom as u32);
        word = EOF.insert(word, self.eof as u32);
        word = EX.insert(word, self.ex as u32);
        word = USER.insert(word, self.user as u32);
        word = HOSTID.insert(word, self.hostid as u32);
        Ok(SumiCmd(word))
    }
}

/// An immutable 32-bit SUMI command header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumiCmd(u32);

impl SumiCmd {
    pub const fn from_raw(word: u32) -> SumiCmd {
        SumiCmd(word)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Unpack into the named-field view. Pure inverse of
    /// [`CmdFields::encode`].
    pub fn fields(self) -> CmdFields {
        CmdFields {
            cmd_type: CMD_TYPE.extract(self.0) as u8,
            size: SIZE.extract(self.0) as u8,
            len: LEN.extract(self.0) as u8,
            qos: QOS.extract(self.0) as u8,
            prot: PROT.extract(self.0) as u8,
            eom: EOM.extract(self.0) != 0,
            eof: EOF.extract(self.0) != 0,
            ex: EX.extract(self.0) != 0,
            user: USER.extract(self.0) as u8,
            hostid: HOSTID.extract(self.0) as u8,
        }
    }

    /// Classify the opcode; `None` for reserved encodings.
    pub fn cmd_type(self) -> Option<CmdType> {
        CmdType::from_raw(CMD_TYPE.extract(self.0), SIZE.extract(self.0))
    }

    pub fn size(self) -> u8 {
        SIZE.extract(self.0) as u8
    }

    pub fn len(self) -> u8 {
        LEN.extract(self.0) as u8
    }

    pub fn qos(self) -> u8 {
        QOS.extract(self.0) as u8
    }

    pub fn prot(self) -> ProtMode {
        ProtMode::from_raw(PROT.extract(self.0))
    }

    pub fn eom(self) -> bool {
        EOM.extract(self.0) != 0
    }

    pub fn eof(self) -> bool {
        EOF.extract(self.0) != 0
    }

    pub fn ex(self) -> bool {
        EX.extract(self.0) != 0
    }

    pub fn user(self) -> u8 {
        USER.extract(self.0) as u8
    }

    pub fn hostid(self) -> u8 {
        HOSTID.extract(self.0) as u8
    }

    /// The LEN field reinterpreted as the atomic operation type.
    pub fn atype(self) -> u8 {
        self.len()
    }

    /// The U field reinterpreted as a response error code.
    pub fn err_code(self) -> ErrorCode {
        ErrorCode::from_raw(USER.extract(self.0))
    }

    pub fn bytes_per_word(self) -> usize {
        1usize << self.size()
    }

    pub fn transfer_count(self) -> usize {
        self.len() as usize + 1
    }

    pub fn total_bytes(self) -> usize {
        self.bytes_per_word() * self.transfer_count()
    }

    pub fn is_request(self) -> bool {
        self.cmd_type().is_some_and(CmdType::is_request)
    }

    pub fn is_response(self) -> bool {
        self.cmd_type().is_some_and(CmdType::is_response)
    }

    pub fn has_data(self) -> bool {
        self.cmd_type().is_some_and(CmdType::has_data)
    }

    pub fn has_source_addr(self) -> bool {
        self.cmd_type().is_some_and(CmdType::has_source_addr)
    }

    pub fn supports_streaming(self) -> bool {
        self.cmd_type().is_some_and(CmdType::supports_streaming)
    }

    /// Payload length this header declares: one word for atomics (the
    /// operand), LEN+1 words for data-carrying commands, zero otherwise.
    pub fn expected_payload_len(self) -> usize {
        match self.cmd_type() {
            Some(CmdType::ReqAtomic) => self.bytes_per_word(),
            _ if self.has_data() => self.total_bytes(),
            _ => 0,
        }
    }
}

/// One transaction-layer unit: header, addresses, bounded payload.
///
/// Immutable after construction; the only constructors are the
/// validating [`SumiTransaction::new`] / [`SumiTransaction::new_partial`]
/// and the monitor's bus-capture path.
#[derive(Debug, Clone)]
pub struct SumiTransaction {
    cmd: SumiCmd,
    dstaddr: u64,
    srcaddr: u64,
    payload: Vec<u8>,
    partial_final: bool,
}

impl SumiTransaction {
    /// Build a transaction, enforcing the payload-length invariant: a
    /// data-carrying header must be accompanied by exactly the number of
    /// bytes it declares, and a non-data header by none.
    pub fn new(
        cmd: SumiCmd,
        dstaddr: u64,
        srcaddr: u64,
        payload: Vec<u8>,
    ) -> Result<Self, UmiError> {
        let expected = cmd.expected_payload_len();
        if payload.len() != expected {
            return Err(UmiError::PayloadLengthMismatch {
                expected,
                actual: payload.len(),
            });
        }
        Ok(Self {
            cmd,
            dstaddr,
            srcaddr,
            payload,
            partial_final: false,
        })
    }

    /// Build the final fragment of a larger transfer, whose payload may
    /// be shorter than the header declares (but never longer or empty).
    pub fn new_partial(
        cmd: SumiCmd,
        dstaddr: u64,
        srcaddr: u64,
        payload: Vec<u8>,
    ) -> Result<Self, UmiError> {
        let expected = cmd.expected_payload_len();
        if payload.is_empty() || payload.len() > expected {
            return Err(UmiError::PayloadLengthMismatch {
                expected,
                actual: payload.len(),
            });
        }
        Ok(Self {
            cmd,
            dstaddr,
            srcaddr,
            payload,
            partial_final: true,
        })
    }

    /// Capture path for the bus monitor: the observed wires are ground
    /// truth, so no validation applies.
    pub(crate) fn observed(cmd: SumiCmd, dstaddr: u64, srcaddr: u64, payload: Vec<u8>) -> Self {
        let partial_final = payload.len() < cmd.expected_payload_len();
        Self {
            cmd,
            dstaddr,
            srcaddr,
            payload,
            partial_final,
        }
    }

    pub fn cmd(&self) -> SumiCmd {
        self.cmd
    }

    pub fn dstaddr(&self) -> u64 {
        self.dstaddr
    }

    pub fn srcaddr(&self) -> u64 {
        self.srcaddr
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_partial_final(&self) -> bool {
        self.partial_final
    }

    /// Serialize header + addresses (little-endian, `addr_width_bits`
    /// per address) for logging and link-layer experiments.
    pub fn header_bytes(&self, addr_width_bits: u32) -> Vec<u8> {
        let addr_bytes = (addr_width_bits as usize) / 8;
        let mut out = Vec::with_capacity(4 + 2 * addr_bytes);
        out.extend_from_slice(&self.cmd.raw().to_le_bytes());
        out.extend_from_slice(&self.dstaddr.to_le_bytes()[..addr_bytes.min(8)]);
        out.extend_from_slice(&self.srcaddr.to_le_bytes()[..addr_bytes.min(8)]);
        out
    }
}

impl PartialEq for SumiTransaction {
    fn eq(&self, other: &Self) -> bool {
        if self.cmd != other.cmd {
            return false;
        }
        // Write acks carry no payload and route purely by destination.
        if self.cmd.cmd_type() == Some(CmdType::RespWrite) {
            self.dstaddr == other.dstaddr
        } else {
            self.dstaddr == other.dstaddr
                && self.srcaddr == other.srcaddr
                && self.payload == other.payload
        }
    }
}

impl Eq for SumiTransaction {}

#[cfg(test)]
mod tests_header;

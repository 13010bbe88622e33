use super::*;

#[test]
fn test_encode_known_layout() {
    let cmd = CmdFields {
        cmd_type: CmdType::ReqWrite.opcode(),
        size: 0b011,
        len: 0x7F,
        qos: 0xA,
        prot: 0b10,
        eom: true,
        eof: false,
        ex: true,
        user: 0b01,
        hostid: 0x15,
    }
    .encode()
    .unwrap();

    // Hand-packed per the bit table.
    let expected = 0x03
        | (0b011 << 5)
        | (0x7F << 8)
        | (0xA << 16)
        | (0b10 << 20)
        | (1 << 22)
        | (1 << 24)
        | (0b01 << 25)
        | (0x15 << 27);
    assert_eq!(cmd.raw(), expected);
}

#[test]
fn test_decode_known_word() {
    let cmd = SumiCmd::from_raw(0xF800_0001);
    let f = cmd.fields();
    assert_eq!(f.cmd_type, 0x01);
    assert_eq!(f.hostid, 0x1F);
    assert_eq!(f.size, 0);
    assert_eq!(f.len, 0);
    assert!(!f.eom);
}

#[test]
fn test_opcode_constants() {
    // Wire encodings are fixed for interoperability.
    assert_eq!(CmdType::Invalid.opcode(), 0x00);
    assert_eq!(CmdType::ReqRead.opcode(), 0x01);
    assert_eq!(CmdType::ReqWrite.opcode(), 0x03);
    assert_eq!(CmdType::ReqPosted.opcode(), 0x05);
    assert_eq!(CmdType::ReqRdma.opcode(), 0x07);
    assert_eq!(CmdType::ReqAtomic.opcode(), 0x09);
    assert_eq!(CmdType::ReqUser0.opcode(), 0x0B);
    assert_eq!(CmdType::ReqFuture0.opcode(), 0x0D);
    assert_eq!(CmdType::ReqError.opcode(), 0x0F);
    assert_eq!(CmdType::ReqLink as u8, 0x2F);
    assert_eq!(CmdType::RespRead.opcode(), 0x02);
    assert_eq!(CmdType::RespWrite.opcode(), 0x04);
    assert_eq!(CmdType::RespUser0.opcode(), 0x06);
    assert_eq!(CmdType::RespUser1.opcode(), 0x08);
    assert_eq!(CmdType::RespFuture0.opcode(), 0x0A);
    assert_eq!(CmdType::RespFuture1.opcode(), 0x0C);
    assert_eq!(CmdType::RespLink.opcode(), 0x0E);
}

#[test]
fn test_atomic_opcode_constants() {
    assert_eq!(AtomicOp::Add as u8, 0x00);
    assert_eq!(AtomicOp::And as u8, 0x01);
    assert_eq!(AtomicOp::Or as u8, 0x02);
    assert_eq!(AtomicOp::Xor as u8, 0x03);
    assert_eq!(AtomicOp::Max as u8, 0x04);
    assert_eq!(AtomicOp::Min as u8, 0x05);
    assert_eq!(AtomicOp::MaxU as u8, 0x06);
    assert_eq!(AtomicOp::MinU as u8, 0x07);
    assert_eq!(AtomicOp::Swap as u8, 0x08);
}

#[test]
fn test_field_overflow_rejected() {
    let bad = CmdFields {
        size: 8, // 3-bit field
        ..CmdFields::of(CmdType::ReqRead)
    };
    assert_eq!(
        bad.encode(),
        Err(UmiError::FieldOverflow {
            field: "size",
            value: 8,
            width: 3
        })
    );

    let bad = CmdFields {
        hostid: 32, // 5-bit field
        ..CmdFields::of(CmdType::ReqRead)
    };
    assert!(matches!(
        bad.encode(),
        Err(UmiError::FieldOverflow { field: "hostid", .. })
    ));
}

#[test]
fn test_link_opcode_disambiguated_by_size() {
    let err = CmdFields::of(CmdType::ReqError).encode().unwrap();
    assert_eq!(err.cmd_type(), Some(CmdType::ReqError));

    let link = CmdFields::of(CmdType::ReqLink).encode().unwrap();
    assert_eq!(link.fields().cmd_type, 0x0F);
    assert_eq!(link.fields().size, 1);
    assert_eq!(link.cmd_type(), Some(CmdType::ReqLink));
}

#[test]
fn test_reserved_opcode_classifies_as_none() {
    let cmd = CmdFields {
        cmd_type: 0x1F,
        ..CmdFields::default()
    }
    .encode()
    .unwrap();
    assert_eq!(cmd.cmd_type(), None);
    assert!(!cmd.is_request());
    assert!(!cmd.is_response());
    assert!(!cmd.has_data());
}

#[test]
fn test_classification_predicates() {
    assert!(CmdType::ReqRead.is_request());
    assert!(!CmdType::ReqRead.has_data());
    assert!(CmdType::ReqRead.has_source_addr());

    assert!(CmdType::ReqWrite.has_data());
    assert!(CmdType::ReqWrite.supports_streaming());
    assert!(CmdType::ReqPosted.supports_streaming());
    assert!(CmdType::RespRead.supports_streaming());
    assert!(!CmdType::ReqAtomic.supports_streaming());

    assert!(CmdType::RespWrite.is_response());
    assert!(!CmdType::RespWrite.has_data());
    assert!(!CmdType::RespWrite.has_source_addr());
    assert!(CmdType::RespRead.has_data());

    assert!(CmdType::ReqLink.is_request());
    assert!(!CmdType::ReqLink.has_source_addr());
}

#[test]
fn test_request_response_mutually_exclusive() {
    // The all-zero word decodes to Invalid, which is neither side.
    let zero = SumiCmd::from_raw(0);
    assert_eq!(zero.cmd_type(), Some(CmdType::Invalid));
    assert!(!zero.is_request());
    assert!(!zero.is_response());

    for opcode in 0u32..32 {
        for size in [0u32, 1] {
            if let Some(kind) = CmdType::from_raw(opcode, size) {
                assert!(!(kind.is_request() && kind.is_response()), "{kind:?}");
            }
        }
    }
}

#[test]
fn test_size_arithmetic() {
    let cmd = CmdFields {
        size: 3,
        len: 3,
        ..CmdFields::of(CmdType::ReqRead)
    }
    .encode()
    .unwrap();
    assert_eq!(cmd.bytes_per_word(), 8);
    assert_eq!(cmd.transfer_count(), 4);
    assert_eq!(cmd.total_bytes(), 32);

    let max = CmdFields {
        size: 7,
        len: 255,
        ..CmdFields::of(CmdType::ReqRead)
    }
    .encode()
    .unwrap();
    assert_eq!(max.bytes_per_word(), MAX_WORD_BYTES);
    assert_eq!(max.transfer_count(), MAX_TRANSFERS);
    assert_eq!(max.total_bytes(), 32768);
}

#[test]
fn test_atype_and_err_aliases() {
    let atomic = CmdFields {
        size: 2,
        len: AtomicOp::Xor as u8,
        ..CmdFields::of(CmdType::ReqAtomic)
    }
    .encode()
    .unwrap();
    assert_eq!(atomic.atype(), 0x03);
    assert_eq!(AtomicOp::from_raw(atomic.atype()), Some(AtomicOp::Xor));

    let resp = CmdFields {
        user: ErrorCode::DevErr as u8,
        ..CmdFields::of(CmdType::ReqError)
    }
    .encode()
    .unwrap();
    assert_eq!(resp.err_code(), ErrorCode::DevErr);
}

#[test]
fn test_expected_payload_len() {
    let write = CmdFields {
        size: 1,
        len: 7,
        ..CmdFields::of(CmdType::ReqWrite)
    }
    .encode()
    .unwrap();
    assert_eq!(write.expected_payload_len(), 16);

    // Atomics carry one operand word; LEN is the ATYPE, not a count.
    let atomic = CmdFields {
        size: 2,
        len: AtomicOp::Add as u8,
        ..CmdFields::of(CmdType::ReqAtomic)
    }
    .encode()
    .unwrap();
    assert_eq!(atomic.expected_payload_len(), 4);

    let read = CmdFields {
        size: 3,
        len: 3,
        ..CmdFields::of(CmdType::ReqRead)
    }
    .encode()
    .unwrap();
    assert_eq!(read.expected_payload_len(), 0);
}

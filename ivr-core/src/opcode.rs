//! The closed opcode catalog (§4.3): every `OperationCode` a validated
//! flow may use, and which handler family claims it.

/// `(opcode, family name)` pairs, in the order declared by §4.3.
pub const OPCODE_TABLE: &[(i64, &str)] = &[
    (10, "audio"),
    (11, "audio"),
    (20, "input"),
    (30, "audio"),
    (31, "audio"),
    (40, "recording"),
    (50, "audio"),
    (100, "transfer"),
    (101, "transfer"),
    (105, "input"),
    (107, "transfer"),
    (108, "transfer"),
    (111, "api"),
    (112, "api"),
    (120, "logic"),
    (200, "termination"),
    (330, "tts"),
    (331, "tts"),
    (341, "recording"),
];

/// Every opcode in [`OPCODE_TABLE`], for validation against
/// `Node::operation_code`.
pub fn known_opcodes() -> Vec<i64> {
    OPCODE_TABLE.iter().map(|(op, _)| *op).collect()
}

/// The handler family name registered for `opcode`, if it is in the
/// closed set.
pub fn family_for(opcode: i64) -> Option<&'static str> {
    OPCODE_TABLE.iter().find(|(op, _)| *op == opcode).map(|(_, f)| *f)
}

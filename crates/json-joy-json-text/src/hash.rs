//! Hash state functions shared by primitive hashing and structural tree
//! hashing.
//!
//! Algorithm: djb2-style mixing with wrapping 64-bit arithmetic, one
//! discriminator constant per value family.

pub const START_STATE: u64 = 5381;

pub const NULL_CONST: u64 = 982_452_847;
pub const TRUE_CONST: u64 = 982_453_247;
pub const FALSE_CONST: u64 = 982_454_243;
pub const ARRAY_CONST: u64 = 982_452_259;
pub const STRING_CONST: u64 = 982_453_601;
pub const OBJECT_CONST: u64 = 982_454_533;
pub const BINARY_CONST: u64 = 982_454_837;
pub const UNDEFINED_CONST: u64 = 982_455_149;
pub const INTEGER_CONST: u64 = 982_455_571;
pub const FLOAT_CONST: u64 = 982_456_019;
pub const DATE_CONST: u64 = 982_456_421;
pub const GUID_CONST: u64 = 982_456_897;
pub const URI_CONST: u64 = 982_457_213;
pub const TIMESPAN_CONST: u64 = 982_457_633;
pub const COMMENT_CONST: u64 = 982_458_007;
pub const RAW_CONST: u64 = 982_458_419;
pub const CONSTRUCTOR_CONST: u64 = 982_458_811;
pub const PROPERTY_CONST: u64 = 982_459_229;

/// `state = (state << 5) + state + num` with wrapping semantics.
pub fn update_num(state: u64, num: u64) -> u64 {
    state.wrapping_shl(5).wrapping_add(state).wrapping_add(num)
}

pub fn update_str(state: u64, s: &str) -> u64 {
    let mut state = update_num(state, STRING_CONST);
    state = update_num(state, s.len() as u64);
    for &b in s.as_bytes().iter().rev() {
        state = update_num(state, u64::from(b));
    }
    state
}

pub fn update_bytes(state: u64, bin: &[u8]) -> u64 {
    let mut state = update_num(state, BINARY_CONST);
    state = update_num(state, bin.len() as u64);
    for &b in bin.iter().rev() {
        state = update_num(state, u64::from(b));
    }
    state
}

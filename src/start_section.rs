//! Encoding of a replacement start section.
//!
//! A start section is the section id, followed by the payload size, followed by the payload: a
//! single function index.  Both numbers use unsigned LEB128.

/// Section id of the start section.
pub const START_SECTION_ID: u8 = 8;

/// A `u32` never needs more than 5 LEB128 bytes.
pub const MAX_U32_LEB128_LEN: usize = 5;

/// Appends `value` to `sink` as unsigned LEB128.  Returns the number of bytes written.
pub fn write_u32_leb128(sink: &mut Vec<u8>, mut value: u32) -> usize {
    let mut written = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        written += 1;

        if value == 0 {
            sink.push(byte);
            return written;
        }

        sink.push(byte | 0x80);
    }
}

/// Complete start section that makes `function_index` the start function.
pub fn encode_start_section(function_index: u32) -> Vec<u8> {
    let mut index = Vec::with_capacity(MAX_U32_LEB128_LEN);
    let index_len = write_u32_leb128(&mut index, function_index);

    let mut section = Vec::with_capacity(1 + MAX_U32_LEB128_LEN + index_len);
    section.push(START_SECTION_ID);
    // `index_len` is at most 5.
    write_u32_leb128(&mut section, index_len as u32);
    section.extend_from_slice(&index);
    section
}

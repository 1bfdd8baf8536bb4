//! GIF-flavoured LZW compression.
//!
//! Codes are variable width (minimum code size + 1 up to 12 bits), packed
//! least-significant bit first, and the compressed stream is framed into
//! sub-blocks of at most 255 bytes.

use std::collections::HashMap;

use crate::error::ConvertError;

/// Largest code a GIF code table may hold
pub const MAX_CODE: u16 = 4095;

/// Largest code width in bits
const MAX_CODE_SIZE: u8 = 12;

/// Longest data sub-block
const SUB_BLOCK_LEN: usize = 255;

/// Minimum code size for a color table addressed with `table_bits` bits.
///
/// GIF does not allow a minimum code size below 2.
pub fn min_code_size(table_bits: u8) -> u8 {
    table_bits.max(2)
}

/// Compress `indices` into a complete GIF image data section: the minimum
/// code size byte, the LZW stream split into sub-blocks, and the zero-length
/// terminator.
pub fn compress(indices: &[u8], min_code_size: u8) -> Result<Vec<u8>, ConvertError> {
    let stream = lzw_encode(indices, min_code_size)?;
    let mut out = Vec::with_capacity(stream.len() + stream.len() / SUB_BLOCK_LEN + 3);
    out.push(min_code_size);
    pack_sub_blocks(&stream, &mut out);
    Ok(out)
}

/// Split `data` into length-prefixed sub-blocks followed by a zero-length block.
pub fn pack_sub_blocks(data: &[u8], out: &mut Vec<u8>) {
    for chunk in data.chunks(SUB_BLOCK_LEN) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
}

/// LZW-encode `indices` into a raw code stream.
///
/// The stream opens with a clear code and closes with the end code. When the
/// table reaches [`MAX_CODE`] a clear code is emitted and the table restarts.
pub fn lzw_encode(indices: &[u8], min_code_size: u8) -> Result<Vec<u8>, ConvertError> {
    if !(2..=8).contains(&min_code_size) {
        return Err(ConvertError::encoding(format!(
            "minimum code size {} outside 2..=8",
            min_code_size
        )));
    }

    let mut table = CodeTable::new(min_code_size);
    let mut writer = BitWriter::new();
    let check = |index: u8| -> Result<u16, ConvertError> {
        let code = u16::from(index);
        if code >= table_clear(min_code_size) {
            return Err(ConvertError::encoding(format!(
                "index {} does not fit minimum code size {}",
                index, min_code_size
            )));
        }
        Ok(code)
    };

    writer.write(table.clear_code(), table.code_size)?;

    let mut pixels = indices.iter();
    let Some(&first) = pixels.next() else {
        writer.write(table.end_code(), table.code_size)?;
        return Ok(writer.finish());
    };
    let mut prefix = check(first)?;

    for &index in pixels {
        let suffix = check(index)?;
        if let Some(code) = table.get(prefix, index) {
            prefix = code;
            continue;
        }

        writer.write(prefix, table.code_size)?;
        table.grow_after_emit();

        if table.is_full() {
            writer.write(table.clear_code(), table.code_size)?;
            table.reset();
        } else {
            table.insert(prefix, index);
        }
        prefix = suffix;
    }

    writer.write(prefix, table.code_size)?;
    table.grow_after_emit();
    writer.write(table.end_code(), table.code_size)?;

    Ok(writer.finish())
}

fn table_clear(min_code_size: u8) -> u16 {
    1 << min_code_size
}

/// String table keyed by (prefix code, next index).
struct CodeTable {
    entries: HashMap<(u16, u8), u16>,
    min_code_size: u8,
    code_size: u8,
    next_code: u16,
}

impl CodeTable {
    fn new(min_code_size: u8) -> Self {
        let mut table = Self {
            entries: HashMap::new(),
            min_code_size,
            code_size: 0,
            next_code: 0,
        };
        table.reset();
        table
    }

    fn clear_code(&self) -> u16 {
        table_clear(self.min_code_size)
    }

    fn end_code(&self) -> u16 {
        self.clear_code() + 1
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.code_size = self.min_code_size + 1;
        self.next_code = self.end_code() + 1;
    }

    fn get(&self, prefix: u16, suffix: u8) -> Option<u16> {
        self.entries.get(&(prefix, suffix)).copied()
    }

    fn is_full(&self) -> bool {
        self.next_code > MAX_CODE
    }

    fn insert(&mut self, prefix: u16, suffix: u8) {
        self.entries.insert((prefix, suffix), self.next_code);
        self.next_code += 1;
    }

    /// Widen codes once the decoder's table will have outgrown the current width.
    ///
    /// The decoder adds its entry one code later than the encoder, so the
    /// check runs after each emitted code rather than after each insert.
    fn grow_after_emit(&mut self) {
        if self.next_code >= (1 << self.code_size) && self.code_size < MAX_CODE_SIZE {
            self.code_size += 1;
        }
    }
}

/// LSB-first bit packer.
struct BitWriter {
    out: Vec<u8>,
    bit_buf: u32,
    bits_in_buf: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self { out: Vec::new(), bit_buf: 0, bits_in_buf: 0 }
    }

    fn write(&mut self, code: u16, size: u8) -> Result<(), ConvertError> {
        if size > MAX_CODE_SIZE || u32::from(code) >> size != 0 {
            return Err(ConvertError::encoding(format!(
                "code {} does not fit in {} bits",
                code, size
            )));
        }
        self.bit_buf |= u32::from(code) << self.bits_in_buf;
        self.bits_in_buf += size;
        while self.bits_in_buf >= 8 {
            self.out.push(self.bit_buf as u8);
            self.bit_buf >>= 8;
            self.bits_in_buf -= 8;
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits_in_buf > 0 {
            self.out.push(self.bit_buf as u8);
        }
        self.out
    }
}

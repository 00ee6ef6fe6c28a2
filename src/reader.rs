//! Byte-level reading primitives: a bounds-checked cursor over an in-memory MIDI buffer plus the
//! number and string decoders every chunk and event is built from

use crate::chunk::ParseError;

/// Mask for the 7 payload bits of a variable length quantity byte
const VLQ_PAYLOAD_MASK: u8 = 0x7F;
/// Continuation bit of a variable length quantity byte
const VLQ_CONTINUE_BIT: u8 = 0x80;
/// MIDI caps variable length quantities at 4 bytes (28 bits)
const VLQ_MAX_BYTES: usize = 4;

/// A forward-only cursor over a borrowed byte buffer. Every read advances the cursor, and every
/// read that would run past the end of the buffer fails instead of panicking
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    /// Underlying bytes
    data: &'a [u8],
    /// Offset of the next unread byte
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Offset of the next unread byte
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns true once every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Looks at the next byte without consuming it
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    /// Consumes a single byte
    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        let byte = self
            .peek()
            .ok_or(ParseError::MalformedInput("unexpected end of data"))?;
        self.position += 1;
        Ok(byte)
    }

    /// Consumes exactly `n` bytes, returning them as a slice of the underlying buffer
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        if n > self.remaining() {
            return Err(ParseError::MalformedInput(
                "declared length runs past the end of data",
            ));
        }

        let bytes = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(bytes)
    }

    /// Consumes the raw bytes of one variable length quantity: every byte with the top bit set,
    /// followed by the first byte with it clear. Fails if the buffer ends before that byte
    pub fn read_variable_length_bytes(&mut self) -> Result<&'a [u8], ParseError> {
        let start = self.position;

        loop {
            let byte = self.peek().ok_or(ParseError::MalformedInput(
                "variable length quantity runs past the end of data",
            ))?;
            self.position += 1;
            if byte & VLQ_CONTINUE_BIT == 0 {
                break;
            }
        }

        Ok(&self.data[start..self.position])
    }

    /// Consumes and decodes a variable length quantity
    pub fn read_variable_length_quantity(&mut self) -> Result<u32, ParseError> {
        decode_variable_length_quantity(self.read_variable_length_bytes()?)
    }

    /// Consumes `n` bytes and decodes them as a big-endian unsigned integer
    pub fn read_big_endian(&mut self, n: usize) -> Result<u32, ParseError> {
        decode_big_endian(self.take(n)?)
    }
}

/// Decodes a big-endian unsigned integer where every byte contributes its full 8 bits
pub fn decode_big_endian(bytes: &[u8]) -> Result<u32, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::MalformedInput("no bytes to decode as a number"));
    }
    if bytes.len() > core::mem::size_of::<u32>() {
        return Err(ParseError::MalformedInput("number wider than 32 bits"));
    }

    Ok(bytes
        .iter()
        .fold(0u32, |acc, byte| (acc << 8) | *byte as u32))
}

/// Decodes a variable length quantity, where each byte contributes its low 7 bits MSB first
pub fn decode_variable_length_quantity(bytes: &[u8]) -> Result<u32, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::MalformedInput(
            "no bytes to decode as a variable length quantity",
        ));
    }
    if bytes.len() > VLQ_MAX_BYTES {
        return Err(ParseError::MalformedInput(
            "variable length quantity longer than 4 bytes",
        ));
    }

    Ok(bytes
        .iter()
        .fold(0u32, |acc, byte| (acc << 7) | (byte & VLQ_PAYLOAD_MASK) as u32))
}

/// Maps every byte to the character with the same code point
pub fn decode_ascii_run(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| *byte as char).collect()
}

/// Renders a byte as `0x..` for diagnostics
pub fn to_hex(byte: u8) -> String {
    format!("{byte:#x}")
}

//! Chunk type constants

/// Creates a chunk type identifier
macro_rules! chunk_type {
    ($const_name:ident, $tag:literal) => {
        /// MIDI chunk type
        pub const $const_name: [u8; 4] = *$tag;
    };
}

chunk_type!(HEADER_CHUNK, b"MThd");
chunk_type!(TRACK_DATA_CHUNK, b"MTrk");

/// Bytes taken by a chunk's type tag and length field
pub const CHUNK_PREAMBLE_LENGTH: usize = 8;

/// The only header payload length the format defines
pub const HEADER_LENGTH: u32 = 6;

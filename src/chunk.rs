//! Chunk framing and the error taxonomy shared by every stage of decoding

use header::InvalidHeader;
use thiserror::Error;

use crate::{
    chunk::chunk_types::{CHUNK_PREAMBLE_LENGTH, TRACK_DATA_CHUNK},
    reader::{decode_ascii_run, ByteCursor},
    Chunk,
};

pub mod chunk_types;
pub mod header;
pub mod track;

/// Every way decoding a MIDI buffer can fail. All of them are fatal: the whole parse aborts and
/// no partial result is produced
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The `MThd` chunk is missing, mis-sized or declares an unknown format
    #[error("malformed midi header: {0}")]
    MalformedHeader(#[from] InvalidHeader),
    /// A chunk following the header is not an `MTrk` chunk
    #[error("malformed chunk: expected \"MTrk\" but found {:?}", decode_ascii_run(.0))]
    MalformedChunk([u8; 4]),
    /// The header's declared track count disagrees with the chunks actually present
    #[error("parsed wrong number of tracks: expected ({expected}), but got ({actual})")]
    TrackCountMismatch {
        /// Track count declared in the header
        expected: u16,
        /// Number of `MTrk` chunks decoded
        actual: usize,
    },
    /// A status byte matches no event class and running status could not resolve it
    #[error("unknown event code {0:#x}")]
    UnknownEventCode(u8),
    /// A meta event subtype with no known layout
    #[error("unknown meta event {0:#x}")]
    UnknownMetaEvent(u8),
    /// A note-off arrived for a note with no sounding note-on
    #[error("no starting event for note {0}")]
    UnmatchedNoteOff(u8),
    /// A recognized construct whose payload is not decoded
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),
    /// A low level read was attempted on missing or out-of-range data
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),
}

impl Chunk {
    /// Reads one chunk preamble (4 byte id, 32 bit big-endian length) and returns it with the
    /// payload slice it declares
    pub fn read<'a>(cursor: &mut ByteCursor<'a>) -> Result<(Chunk, &'a [u8]), ParseError> {
        if cursor.remaining() < CHUNK_PREAMBLE_LENGTH {
            return Err(ParseError::MalformedInput("truncated chunk preamble"));
        }

        let mut chunk_type = [0u8; 4];
        chunk_type.copy_from_slice(cursor.take(4)?);
        let length = cursor.read_big_endian(4)?;

        let chunk = Chunk { chunk_type, length };
        let payload = cursor.take(chunk.len())?;

        Ok((chunk, payload))
    }
}

/// Splits everything after the header into track payloads, rejecting any chunk that is not `MTrk`
pub(crate) fn split_track_chunks(data: &[u8]) -> Result<Vec<&[u8]>, ParseError> {
    let mut cursor = ByteCursor::new(data);
    let mut payloads = vec![];

    while !cursor.is_empty() {
        let (chunk, payload) = Chunk::read(&mut cursor)?;
        if chunk.chunk_type != TRACK_DATA_CHUNK {
            return Err(ParseError::MalformedChunk(chunk.chunk_type));
        }

        payloads.push(payload);
    }

    Ok(payloads)
}

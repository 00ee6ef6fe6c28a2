//! # smf-events
//!
//! A Standard MIDI File decoder that turns an in-memory `.mid` buffer into a header, an ordered
//! list of tracks, and per-track typed events. Note-on events come out already paired with their
//! note-offs, carrying the note's duration in ticks.
//!
//! ## Overview
//!
//! MIDI files are structured as a series of chunks. Each chunk contains a 4-character ASCII
//! type identifier and a 32-bit length that specifies how many bytes of data follow. The first
//! chunk is the `MThd` header, every following chunk is an `MTrk` track whose payload is a
//! stream of delta-timed events.
//!
//! - **Strongly typed events**: meta events, notes and channel messages are variants of
//!   [`EventKind`], each carrying only its own fields.
//! - **Duration aware**: note-offs are paired first-in first-out with sounding note-ons of the
//!   same key, and the note-on receives its `length`.
//! - **Running status** and note-on/velocity-0 note-offs are handled transparently.
//! - **No panics on bad input**: every failure is a [`ParseError`], and a parse either yields a
//!   complete [`Midi`] or nothing.
//!
//! ## Example Usage
//!
//! ```rust
//! use smf_events::{EventKind, NoteEvent};
//!
//! let bytes = [
//!     0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, // MThd, length 6
//!     0x00, 0x00, 0x00, 0x01, 0x00, 0x60, //             format 0, 1 track, 96 ticks per beat
//!     0x4D, 0x54, 0x72, 0x6B, 0x00, 0x00, 0x00, 0x0C, // MTrk, length 12
//!     0x00, 0x90, 0x3C, 0x40, //                         note on
//!     0x60, 0x80, 0x3C, 0x40, //                         note off 96 ticks later
//!     0x00, 0xFF, 0x2F, 0x00, //                         end of track
//! ];
//!
//! let midi = smf_events::parse(&bytes).expect("Parse MIDI bytes");
//! let first = &midi.tracks()[0].events()[0];
//!
//! assert!(matches!(
//!     first.kind(),
//!     EventKind::Note(NoteEvent::On { note: 60, length: Some(96), .. })
//! ));
//! ```
//!
//! ## Library Structure
//!
//! - **[`reader`]**: the bounds-checked [`reader::ByteCursor`] and the big-endian, variable
//!   length quantity and ASCII decoders.
//! - **[`chunk`]**: chunk framing and [`ParseError`], with the `header` and `track` modules
//!   below it. `track` owns the event stream decoder, the status byte classifier and the meta
//!   event mapper.
//!
//! ## Features
//!
//! - `serde`: derives `Serialize`/`Deserialize` for every decoded type.
//! - `parallel`: decodes track payloads on a rayon thread pool. Tracks share no decoder state,
//!   and results are joined in file order.

pub mod chunk;
pub mod reader;

pub use chunk::{
    header::{Division, Format, InvalidHeader, MidiHeader},
    track::{
        event::{ChannelEvent, EventKind, MidiEvent, NoteEvent},
        meta::{KeySignature, MetaEvent, SmpteOffset, TimeSignature},
        status::EventType,
        MidiTrack,
    },
    ParseError,
};

use chunk::{header::HEADER_CHUNK_LENGTH, split_track_chunks};
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result alias for decoding operations
pub type Result<T> = core::result::Result<T, ParseError>;

/// Represents a raw MIDI Chunk.
/// A MIDI Chunk consists of a 4-character ASCII type identifier and a 32-bit unsigned integer specifying the length of its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Chunk {
    /// 4 character ASCII chunk type
    pub chunk_type: [u8; 4],
    /// Length of the data that follows
    length: u32,
}

impl Chunk {
    /// Gets the length of the chunk as a usize
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Returns if the chunk has no attributed data
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// A fully decoded MIDI file. The track list always matches the header's track count
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Midi {
    /// File header
    header: MidiHeader,
    /// Tracks in file order
    tracks: Vec<MidiTrack>,
}

impl Midi {
    /// Decodes a complete Standard MIDI File held in memory
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let header = MidiHeader::decode(bytes)?;
        debug!(
            "Header: format {:?}, {} tracks declared, division {:?}",
            header.format(),
            header.track_count(),
            header.division()
        );

        let payloads = split_track_chunks(&bytes[HEADER_CHUNK_LENGTH..])?;
        let tracks = decode_tracks(&payloads)?;

        if tracks.len() != header.track_count() as usize {
            return Err(ParseError::TrackCountMismatch {
                expected: header.track_count(),
                actual: tracks.len(),
            });
        }

        Ok(Self { header, tracks })
    }

    /// File header
    pub fn header(&self) -> &MidiHeader {
        &self.header
    }

    /// Tracks in file order
    pub fn tracks(&self) -> &[MidiTrack] {
        &self.tracks
    }
}

impl TryFrom<&[u8]> for Midi {
    type Error = ParseError;
    fn try_from(value: &[u8]) -> Result<Self> {
        Midi::parse(value)
    }
}

/// Decodes a complete Standard MIDI File held in memory
pub fn parse(bytes: &[u8]) -> Result<Midi> {
    Midi::parse(bytes)
}

/// 1-based track index of the payload at `position`. Indices past `u16::MAX` cannot be stamped
/// onto events
fn track_index(position: usize) -> Result<u16> {
    u16::try_from(position + 1)
        .map_err(|_| ParseError::MalformedInput("more track chunks than a header can declare"))
}

/// Decodes every track payload in order
#[cfg(not(feature = "parallel"))]
fn decode_tracks(payloads: &[&[u8]]) -> Result<Vec<MidiTrack>> {
    payloads
        .iter()
        .enumerate()
        .map(|(position, payload)| MidiTrack::decode(payload, track_index(position)?))
        .collect()
}

/// Decodes every track payload on the rayon pool, keeping file order
#[cfg(feature = "parallel")]
fn decode_tracks(payloads: &[&[u8]]) -> Result<Vec<MidiTrack>> {
    use rayon::prelude::*;

    payloads
        .par_iter()
        .enumerate()
        .map(|(position, payload)| MidiTrack::decode(payload, track_index(position)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{track_index, Chunk, Midi, ParseError};

    #[test]
    fn chunk_length_accessors() {
        let chunk = Chunk {
            chunk_type: *b"MTrk",
            length: 0,
        };

        assert!(chunk.is_empty());
        assert_eq!(chunk.len(), 0);
    }

    #[test]
    fn track_indices_are_one_based() {
        assert_eq!(track_index(0), Ok(1));
        assert_eq!(track_index(4), Ok(5));
        assert_eq!(track_index(65_534), Ok(u16::MAX));
    }

    #[test]
    fn track_indices_past_u16_are_malformed() {
        assert!(matches!(
            track_index(65_535),
            Err(ParseError::MalformedInput(_))
        ));
    }

    #[test]
    fn header_only_file_with_zero_tracks_parses() {
        let bytes = [
            0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x60,
        ];
        let midi = Midi::try_from(&bytes[..]).expect("Parse header only file");

        assert!(midi.tracks().is_empty());
        assert_eq!(midi.header().track_count(), 0);
    }

    #[test]
    fn missing_tracks_are_a_count_mismatch() {
        let bytes = [
            0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x02, 0x00, 0x60,
        ];

        assert_eq!(
            Midi::parse(&bytes),
            Err(ParseError::TrackCountMismatch {
                expected: 2,
                actual: 0
            })
        );
    }
}

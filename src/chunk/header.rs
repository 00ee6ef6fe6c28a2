//! Header Chunk Enum and Struct Definitions

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    chunk::chunk_types::{CHUNK_PREAMBLE_LENGTH, HEADER_CHUNK, HEADER_LENGTH},
    reader::ByteCursor,
};

/// Bytes taken by the whole `MThd` chunk, preamble included
pub const HEADER_CHUNK_LENGTH: usize = CHUNK_PREAMBLE_LENGTH + HEADER_LENGTH as usize;

/// Header chunk data: format, track count and the raw time division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MidiHeader {
    /// The MIDI format
    format: Format,
    /// Number of tracks
    track_count: u16,
    /// Time division, interpreted through [`MidiHeader::division`]
    time_division: u16,
}

impl MidiHeader {
    /// Builds a header from already validated fields
    pub fn new(format: Format, track_count: u16, time_division: u16) -> Self {
        Self {
            format,
            track_count,
            time_division,
        }
    }

    /// Decodes the 14 byte `MThd` chunk at the start of a MIDI buffer
    pub fn decode(bytes: &[u8]) -> Result<Self, InvalidHeader> {
        if bytes.len() < HEADER_CHUNK_LENGTH {
            return Err(InvalidHeader::Truncated);
        }

        let mut cursor = ByteCursor::new(&bytes[..HEADER_CHUNK_LENGTH]);
        let read_u16 = |cursor: &mut ByteCursor<'_>| {
            cursor
                .read_big_endian(2)
                .map(|value| value as u16)
                .map_err(|_| InvalidHeader::Truncated)
        };

        let magic = cursor.take(4).map_err(|_| InvalidHeader::Truncated)?;
        if magic != HEADER_CHUNK {
            return Err(InvalidHeader::MissingMagic);
        }

        let size = cursor
            .read_big_endian(4)
            .map_err(|_| InvalidHeader::Truncated)?;
        if size != HEADER_LENGTH {
            return Err(InvalidHeader::UnexpectedSize(size));
        }

        let format = Format::try_from(read_u16(&mut cursor)?)?;
        let track_count = read_u16(&mut cursor)?;
        let time_division = read_u16(&mut cursor)?;

        Ok(Self::new(format, track_count, time_division))
    }

    /// The file's organization
    pub fn format(&self) -> Format {
        self.format
    }

    /// Number of tracks the header declares
    pub fn track_count(&self) -> u16 {
        self.track_count
    }

    /// The raw 16 bit time division
    pub fn time_division(&self) -> u16 {
        self.time_division
    }

    /// True when delta times count ticks per quarter note (bit 15 clear)
    pub fn is_ticks_per_beat(&self) -> bool {
        self.time_division & 0x8000 == 0
    }

    /// True when delta times are SMPTE frame subdivisions (bit 15 set)
    pub fn is_frames_per_second(&self) -> bool {
        !self.is_ticks_per_beat()
    }

    /// Typed view of the time division
    pub fn division(&self) -> Division {
        Division::from(self.time_division)
    }
}

/// Why a header chunk was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidHeader {
    /// Fewer than 14 bytes available
    #[error("header chunk is truncated")]
    Truncated,
    /// First four bytes are not `MThd`
    #[error("could not find \"MThd\"")]
    MissingMagic,
    /// Declared header length other than 6
    #[error("unexpected header size ({0})")]
    UnexpectedSize(u32),
    /// Format outside 0..=2
    #[error("unknown format ({0})")]
    UnknownFormat(u16),
}

/// The overall organization of the MIDI file. Only three values are valid, making most of the 16
/// bits irrelevant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Format {
    /// The file contains a single multi-channel track
    Zero,
    /// The file contains one or more simultaneous tracks (or MIDI outputs) of a sequence
    One,
    /// The file contains one or more sequentially independent single-track patterns
    Two,
}

impl TryFrom<u16> for Format {
    type Error = InvalidHeader;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Format::Zero),
            1 => Ok(Format::One),
            2 => Ok(Format::Two),
            other => Err(InvalidHeader::UnknownFormat(other)),
        }
    }
}

impl From<Format> for u16 {
    fn from(value: Format) -> Self {
        match value {
            Format::Zero => 0,
            Format::One => 1,
            Format::Two => 2,
        }
    }
}

/// The meaning of the delta-times in the MIDI sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Division {
    /// When bit 15 is a 0, bits 14-0 represent ticks per quarter note
    TicksPerBeat(u16),
    /// When bit 15 is 1, bits 14-8 hold the negative SMPTE frame rate and bits 7-0 the ticks
    /// per frame
    Timecode {
        /// Negative SMPTE frame rate (-24, -25, -29 or -30)
        frames_per_second: i8,
        /// Subdivisions of one frame
        ticks_per_frame: u8,
    },
}

impl From<u16> for Division {
    fn from(value: u16) -> Self {
        const MASK: u16 = 0x7FFF;

        if value >> 15 == 0 {
            Division::TicksPerBeat(value & MASK)
        } else {
            // The high byte is already two's complement with bit 7 set
            let [high, low] = value.to_be_bytes();
            Division::Timecode {
                frames_per_second: high as i8,
                ticks_per_frame: low,
            }
        }
    }
}

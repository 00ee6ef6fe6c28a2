//! Meta Event Structs and Parsing

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    chunk::ParseError,
    reader::{decode_ascii_run, decode_big_endian},
};

/// Meta event subtype tags
pub mod tags {
    /// Sequence number
    pub const SEQUENCE_NUMBER: u8 = 0x00;
    /// Free text
    pub const TEXT: u8 = 0x01;
    /// Copyright notice
    pub const COPYRIGHT: u8 = 0x02;
    /// Sequence or track name
    pub const TRACK_NAME: u8 = 0x03;
    /// Instrument name
    pub const INSTRUMENT_NAME: u8 = 0x04;
    /// Lyric
    pub const LYRIC: u8 = 0x05;
    /// Marker
    pub const MARKER: u8 = 0x06;
    /// Cue point
    pub const CUE_POINT: u8 = 0x07;
    /// MIDI channel prefix
    pub const CHANNEL_PREFIX: u8 = 0x20;
    /// End of track
    pub const END_OF_TRACK: u8 = 0x2F;
    /// Tempo
    pub const TEMPO: u8 = 0x51;
    /// SMPTE offset
    pub const SMPTE_OFFSET: u8 = 0x54;
    /// Time signature
    pub const TIME_SIGNATURE: u8 = 0x58;
    /// Key signature
    pub const KEY_SIGNATURE: u8 = 0x59;
    /// Sequencer specific
    pub const SEQUENCER_SPECIFIC: u8 = 0x7F;
}

/// A meta level event
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MetaEvent {
    /// Text metadata, tag 0x01
    Text(String),
    /// Copyright, tag 0x02
    Copyright(String),
    /// Track name, tag 0x03
    TrackName(String),
    /// Instrument name, tag 0x04
    InstrumentName(String),
    /// Lyric, tag 0x05
    Lyric(String),
    /// Marker, tag 0x06
    Marker(String),
    /// End of Track Identifier, tag 0x2F
    EndOfTrack,
    /// Tempo in microseconds per quarter note, tag 0x51
    Tempo(u32),
    /// Smpte Offset, tag 0x54
    SmpteOffset(SmpteOffset),
    /// Time signature, tag 0x58
    TimeSignature(TimeSignature),
    /// Key Signature, tag 0x59
    KeySignature(KeySignature),
}

impl MetaEvent {
    /// Returns the specific event's tag
    pub fn get_tag(&self) -> u8 {
        match self {
            Self::Text(_) => tags::TEXT,
            Self::Copyright(_) => tags::COPYRIGHT,
            Self::TrackName(_) => tags::TRACK_NAME,
            Self::InstrumentName(_) => tags::INSTRUMENT_NAME,
            Self::Lyric(_) => tags::LYRIC,
            Self::Marker(_) => tags::MARKER,
            Self::EndOfTrack => tags::END_OF_TRACK,
            Self::Tempo(_) => tags::TEMPO,
            Self::SmpteOffset(_) => tags::SMPTE_OFFSET,
            Self::TimeSignature(_) => tags::TIME_SIGNATURE,
            Self::KeySignature(_) => tags::KEY_SIGNATURE,
        }
    }

    /// Subtype label of the event
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Copyright(_) => "copyright",
            Self::TrackName(_) => "track_name",
            Self::InstrumentName(_) => "instrument_name",
            Self::Lyric(_) => "lyric",
            Self::Marker(_) => "marker",
            Self::EndOfTrack => "end",
            Self::Tempo(_) => "tempo",
            Self::SmpteOffset(_) => "smpte_offset",
            Self::TimeSignature(_) => "time_signature",
            Self::KeySignature(_) => "key_signature",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A key signature. Fields are read from data bytes 1 and 2; byte 0 is skipped, so a standard
/// two byte payload leaves `mi` empty
pub struct KeySignature {
    /// Sharps (positive) or flats (negative), as the raw byte
    pub sf: Option<u8>,
    /// 0 for major, 1 for minor
    pub mi: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// An SMPTE Offset
pub struct SmpteOffset {
    /// Frame rate in the top two bits, hours in the low six
    pub frame_rate: u8,
    /// Minutes of offset
    pub min: u8,
    /// Seconds of offset
    pub sec: u8,
    /// Frames of offset
    pub frames: u8,
    /// Hundredths of a frame
    pub subframes: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A Time Signature
pub struct TimeSignature {
    /// The time signature's numerator
    pub numerator: u8,
    /// The time signature's denominator, already raised from its power-of-two exponent
    pub denominator: u32,
    /// Metronome clicks per tick
    pub metronome_clicks_per_tick: u8,
    /// Thirty second notes per beat
    pub thirty_second_notes_per_beat: u8,
}

/// Returns exactly `N` leading bytes of a meta payload, failing if the payload is shorter
fn fixed<const N: usize>(data: &[u8]) -> Result<[u8; N], ParseError> {
    data.get(..N)
        .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
        .ok_or(ParseError::MalformedInput("meta event payload is too short"))
}

impl TryFrom<(u8, &[u8])> for MetaEvent {
    type Error = ParseError;
    fn try_from(value: (u8, &[u8])) -> Result<Self, Self::Error> {
        let (event_tag, data) = value;

        match event_tag {
            tags::SEQUENCE_NUMBER => Err(ParseError::Unimplemented("sequence number meta event")),
            tags::TEXT => Ok(MetaEvent::Text(decode_ascii_run(data))),
            tags::COPYRIGHT => Ok(MetaEvent::Copyright(decode_ascii_run(data))),
            tags::TRACK_NAME => Ok(MetaEvent::TrackName(decode_ascii_run(data))),
            tags::INSTRUMENT_NAME => Ok(MetaEvent::InstrumentName(decode_ascii_run(data))),
            tags::LYRIC => Ok(MetaEvent::Lyric(decode_ascii_run(data))),
            tags::MARKER => Ok(MetaEvent::Marker(decode_ascii_run(data))),
            tags::CUE_POINT => Err(ParseError::Unimplemented("cue point meta event")),
            tags::CHANNEL_PREFIX => Err(ParseError::Unimplemented("channel prefix meta event")),
            tags::END_OF_TRACK => Ok(MetaEvent::EndOfTrack),

            tags::TEMPO => Ok(MetaEvent::Tempo(decode_big_endian(data)?)),
            tags::SMPTE_OFFSET => {
                let [frame_rate, min, sec, frames, subframes] = fixed(data)?;
                Ok(MetaEvent::SmpteOffset(SmpteOffset {
                    frame_rate,
                    min,
                    sec,
                    frames,
                    subframes,
                }))
            }
            tags::TIME_SIGNATURE => {
                let [numerator, exponent, metronome_clicks_per_tick, thirty_second_notes_per_beat] =
                    fixed(data)?;
                let denominator = 1u32.checked_shl(exponent as u32).ok_or(
                    ParseError::MalformedInput("time signature denominator overflows"),
                )?;

                Ok(MetaEvent::TimeSignature(TimeSignature {
                    numerator,
                    denominator,
                    metronome_clicks_per_tick,
                    thirty_second_notes_per_beat,
                }))
            }
            tags::KEY_SIGNATURE => Ok(MetaEvent::KeySignature(KeySignature {
                sf: data.get(1).copied(),
                mi: data.get(2).copied(),
            })),

            tags::SEQUENCER_SPECIFIC => {
                Err(ParseError::Unimplemented("sequencer specific meta event"))
            }

            _ => Err(ParseError::UnknownMetaEvent(event_tag)),
        }
    }
}

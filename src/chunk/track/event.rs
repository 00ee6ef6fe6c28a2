//! Decoded track events. Every event keeps its raw status byte, delta time and owning track next
//! to a typed payload

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{
    meta::MetaEvent,
    status::{EventType, META_EVENT},
};

/// One event of a track, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MidiEvent {
    /// Raw status byte, after running status and note-off reinterpretation are applied
    code: u8,
    /// Ticks since the previous event in the same track
    delta: u32,
    /// 1-based index of the owning track
    track: u16,
    /// Typed payload
    kind: EventKind,
}

impl MidiEvent {
    /// Assembles an event
    pub fn new(code: u8, delta: u32, track: u16, kind: EventKind) -> Self {
        Self {
            code,
            delta,
            track,
            kind,
        }
    }

    /// Builds a meta event, which always carries the `0xFF` status
    pub fn meta(delta: u32, track: u16, meta: MetaEvent) -> Self {
        Self::new(META_EVENT, delta, track, EventKind::Meta(meta))
    }

    /// Raw status byte
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Ticks since the previous event in the same track
    pub fn delta(&self) -> u32 {
        self.delta
    }

    /// 1-based index of the owning track
    pub fn track(&self) -> u16 {
        self.track
    }

    /// Typed payload
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Top level class of the event
    pub fn event_type(&self) -> EventType {
        match &self.kind {
            EventKind::Meta(_) => EventType::Meta,
            EventKind::Note(_) => EventType::Note,
            EventKind::Channel(_) => EventType::Channel,
        }
    }

    /// Variant label, such as `tempo`, `on` or `control_change`
    pub fn subtype(&self) -> &'static str {
        match &self.kind {
            EventKind::Meta(meta) => meta.subtype(),
            EventKind::Note(note) => note.subtype(),
            EventKind::Channel(channel) => channel.subtype(),
        }
    }

    /// Channel of a note or channel event
    pub fn channel(&self) -> Option<u8> {
        match &self.kind {
            EventKind::Meta(_) => None,
            EventKind::Note(note) => Some(note.channel()),
            EventKind::Channel(channel) => Some(channel.channel()),
        }
    }

    /// The meta payload, if this is a meta event
    pub fn as_meta(&self) -> Option<&MetaEvent> {
        match &self.kind {
            EventKind::Meta(meta) => Some(meta),
            _ => None,
        }
    }

    /// The note payload, if this is a note event
    pub fn as_note(&self) -> Option<&NoteEvent> {
        match &self.kind {
            EventKind::Note(note) => Some(note),
            _ => None,
        }
    }

    /// Returns a copy of a note-on event carrying `length`. Any other event is returned unchanged
    pub(crate) fn with_length(&self, length: u32) -> Self {
        let kind = match self.kind {
            EventKind::Note(NoteEvent::On {
                channel,
                note,
                velocity,
                ..
            }) => EventKind::Note(NoteEvent::On {
                channel,
                note,
                velocity,
                length: Some(length),
            }),
            ref other => other.clone(),
        };

        Self { kind, ..*self }
    }
}

/// Payload of an event, one variant per event class
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventKind {
    /// Meta event
    Meta(MetaEvent),
    /// Note on or note off
    Note(NoteEvent),
    /// Any other channel voice message
    Channel(ChannelEvent),
}

/// Note on and note off messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NoteEvent {
    /// A key was pressed
    On {
        /// Channel 0-15
        channel: u8,
        /// Key number
        note: u8,
        /// Strike velocity
        velocity: u8,
        /// Ticks until the paired note-off, `None` if the note was never released
        length: Option<u32>,
    },
    /// A key was released
    Off {
        /// Channel 0-15
        channel: u8,
        /// Key number
        note: u8,
        /// Release velocity
        velocity: u8,
    },
}

impl NoteEvent {
    /// Channel 0-15
    pub fn channel(&self) -> u8 {
        match *self {
            Self::On { channel, .. } | Self::Off { channel, .. } => channel,
        }
    }

    /// Key number
    pub fn note(&self) -> u8 {
        match *self {
            Self::On { note, .. } | Self::Off { note, .. } => note,
        }
    }

    /// Velocity byte
    pub fn velocity(&self) -> u8 {
        match *self {
            Self::On { velocity, .. } | Self::Off { velocity, .. } => velocity,
        }
    }

    /// Duration in ticks of a paired note-on
    pub fn length(&self) -> Option<u32> {
        match *self {
            Self::On { length, .. } => length,
            Self::Off { .. } => None,
        }
    }

    /// True for note-on
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On { .. })
    }

    /// `on` or `off`
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::On { .. } => "on",
            Self::Off { .. } => "off",
        }
    }
}

/// Channel voice messages other than notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChannelEvent {
    /// Per-key pressure after the key bottoms out
    PolyphonicAftertouch {
        /// Channel 0-15
        channel: u8,
        /// Key number
        note: u8,
        /// Pressure amount
        pressure: u8,
    },
    /// A controller changed value
    ControlChange {
        /// Channel 0-15
        channel: u8,
        /// Controller number
        controller: u8,
        /// New value
        value: u8,
    },
    /// Patch change
    ProgramChange {
        /// Channel 0-15
        channel: u8,
        /// New program number
        program: u8,
    },
    /// Channel wide pressure
    ChannelAftertouch {
        /// Channel 0-15
        channel: u8,
        /// Pressure amount
        pressure: u8,
    },
    /// Pitch bend, a 14 bit value centered on `0x2000`
    PitchWheel {
        /// Channel 0-15
        channel: u8,
        /// Bend amount
        value: u16,
    },
}

impl ChannelEvent {
    /// Channel 0-15
    pub fn channel(&self) -> u8 {
        match *self {
            Self::PolyphonicAftertouch { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::ChannelAftertouch { channel, .. }
            | Self::PitchWheel { channel, .. } => channel,
        }
    }

    /// Variant label
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::PolyphonicAftertouch { .. } => "polyphonic-aftertouch",
            Self::ControlChange { .. } => "control_change",
            Self::ProgramChange { .. } => "program_change",
            Self::ChannelAftertouch { .. } => "channel_aftertouch",
            Self::PitchWheel { .. } => "pitch_wheel",
        }
    }
}

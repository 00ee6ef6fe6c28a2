//! Status byte classification. Every predicate is a plain range test on the raw status byte

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Status byte that introduces a meta event
pub const META_EVENT: u8 = 0xFF;
/// Offset between a note-on status and the note-off status on the same channel
pub const NOTE_ON_TO_OFF: u8 = 0x10;
/// Low nibble of a channel status byte
pub const CHANNEL_MASK: u8 = 0x0F;

/// Meta events, `0xFF`
pub const fn is_meta_event(code: u8) -> bool {
    code == META_EVENT
}

/// System exclusive and system common events, `0xF0..=0xF7`
pub const fn is_sysex_event(code: u8) -> bool {
    0xF0 <= code && code <= 0xF7
}

/// Note off, `0x80..=0x8F`
pub const fn is_note_off(code: u8) -> bool {
    0x80 <= code && code <= 0x8F
}

/// Note on, `0x90..=0x9F`
pub const fn is_note_on(code: u8) -> bool {
    0x90 <= code && code <= 0x9F
}

/// Either note on or note off
pub const fn is_note_event(code: u8) -> bool {
    is_note_on(code) || is_note_off(code)
}

/// Polyphonic key pressure, `0xA0..=0xAF`
pub const fn is_polyphonic_aftertouch(code: u8) -> bool {
    0xA0 <= code && code <= 0xAF
}

/// Control change, `0xB0..=0xBF`
pub const fn is_control_change(code: u8) -> bool {
    0xB0 <= code && code <= 0xBF
}

/// Program change, `0xC0..=0xCF`
pub const fn is_program_change(code: u8) -> bool {
    0xC0 <= code && code <= 0xCF
}

/// Channel pressure, `0xD0..=0xDF`
pub const fn is_channel_aftertouch(code: u8) -> bool {
    0xD0 <= code && code <= 0xDF
}

/// Pitch wheel change, `0xE0..=0xEF`
pub const fn is_pitch_wheel(code: u8) -> bool {
    0xE0 <= code && code <= 0xEF
}

/// Any status scoped to one of the 16 channels
pub const fn is_channel_event(code: u8) -> bool {
    is_note_event(code)
        || is_polyphonic_aftertouch(code)
        || is_control_change(code)
        || is_program_change(code)
        || is_channel_aftertouch(code)
        || is_pitch_wheel(code)
}

/// True for any byte that can start an event. Anything else found where a status byte is
/// expected is a data byte under running status
pub const fn is_valid_event_code(code: u8) -> bool {
    is_meta_event(code) || is_sysex_event(code) || is_channel_event(code)
}

/// Channel number carried in the low nibble of a channel status byte
pub const fn channel_of(code: u8) -> u8 {
    code & CHANNEL_MASK
}

/// Top level classification of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventType {
    /// Non-sounding instructions introduced by `0xFF`
    Meta,
    /// Note on and note off
    Note,
    /// Every other channel voice message
    Channel,
    /// System exclusive and system common messages
    System,
}

impl EventType {
    /// Classifies a status byte, or `None` if it cannot start an event
    pub const fn from_code(code: u8) -> Option<Self> {
        if is_meta_event(code) {
            Some(Self::Meta)
        } else if is_sysex_event(code) {
            Some(Self::System)
        } else if is_note_event(code) {
            Some(Self::Note)
        } else if is_channel_event(code) {
            Some(Self::Channel)
        } else {
            None
        }
    }

    /// Lowercase tag for this class
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Note => "note",
            Self::Channel => "channel",
            Self::System => "system",
        }
    }
}

impl core::fmt::Display for EventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn note_event_boundaries() {
        assert!(!is_note_event(0x7F));
        assert!(is_note_event(0x80));
        assert!(is_note_event(0x8F));
        assert!(is_note_event(0x90));
        assert!(is_note_event(0x9F));
        assert!(!is_note_event(0xA0));

        assert!(is_note_off(0x8F) && !is_note_on(0x8F));
        assert!(is_note_on(0x90) && !is_note_off(0x90));
    }

    #[test]
    fn channel_event_boundaries() {
        assert!(is_polyphonic_aftertouch(0xA3));
        assert!(is_control_change(0xB0) && !is_control_change(0xAF));
        assert!(is_program_change(0xCF) && !is_program_change(0xD0));
        assert!(is_channel_aftertouch(0xD7));
        assert!(is_pitch_wheel(0xEF) && !is_pitch_wheel(0xF0));
        assert!(is_channel_event(0x80) && is_channel_event(0xEF));
        assert!(!is_channel_event(0x7F) && !is_channel_event(0xF0));
    }

    #[test]
    fn valid_event_code_boundaries() {
        assert!(!is_valid_event_code(0x7F));
        assert!(is_valid_event_code(0xA0));
        assert!(is_valid_event_code(0xF0));
        assert!(is_valid_event_code(0xF7));
        assert!(!is_valid_event_code(0xF8));
        assert!(!is_valid_event_code(0xFE));
        assert!(is_valid_event_code(0xFF));
    }

    #[test]
    fn sysex_and_meta_are_disjoint() {
        assert!(is_sysex_event(0xF0) && is_sysex_event(0xF7));
        assert!(!is_sysex_event(0xFF) && is_meta_event(0xFF));
    }

    #[test]
    fn event_types_classify() {
        assert_eq!(EventType::from_code(0xFF), Some(EventType::Meta));
        assert_eq!(EventType::from_code(0xF0), Some(EventType::System));
        assert_eq!(EventType::from_code(0x91), Some(EventType::Note));
        assert_eq!(EventType::from_code(0xB2), Some(EventType::Channel));
        assert_eq!(EventType::from_code(0x3C), None);
        assert_eq!(EventType::Note.to_string(), "note");
    }

    #[test]
    fn channel_is_low_nibble() {
        assert_eq!(channel_of(0x9A), 10);
        assert_eq!(channel_of(0x80), 0);
    }
}

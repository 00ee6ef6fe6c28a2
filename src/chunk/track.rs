//! Track chunk data and the event stream decoder that walks a track payload

use std::collections::{HashMap, VecDeque};

use event::{ChannelEvent, EventKind, MidiEvent, NoteEvent};
use log::{debug, trace, warn};
use meta::MetaEvent;
use status::{
    channel_of, is_channel_aftertouch, is_control_change, is_meta_event, is_note_event,
    is_note_on, is_pitch_wheel, is_polyphonic_aftertouch, is_program_change, is_sysex_event,
    is_valid_event_code, NOTE_ON_TO_OFF,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    chunk::ParseError,
    reader::{to_hex, ByteCursor},
};

pub mod event;
pub mod meta;
pub mod status;

/// A decoded track: its events in file order and a display name
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MidiTrack {
    /// All events of this track, in the order they appear in the file
    events: Vec<MidiEvent>,
    /// Text of the first instrument name meta event, or empty
    name: String,
}

impl MidiTrack {
    /// Wraps decoded events, deriving the track name from the first instrument name event
    pub fn new(events: Vec<MidiEvent>) -> Self {
        let name = events
            .iter()
            .find_map(|event| match event.as_meta() {
                Some(MetaEvent::InstrumentName(name)) => Some(name.clone()),
                _ => None,
            })
            .unwrap_or_default();

        Self { events, name }
    }

    /// Decodes one `MTrk` payload. `track` is the 1-based index stamped onto every event
    pub fn decode(payload: &[u8], track: u16) -> Result<Self, ParseError> {
        let events = TrackDecoder::new(payload, track).decode()?;

        debug!(
            "Track {track}: decoded {} events from {} bytes",
            events.len(),
            payload.len()
        );
        if !matches!(
            events.last().and_then(MidiEvent::as_meta),
            Some(MetaEvent::EndOfTrack)
        ) {
            warn!("Track {track} does not end with an end of track event");
        }

        Ok(Self::new(events))
    }

    /// Events in file order
    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    /// Instrument name of the track, empty if none was given
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Events paired with their absolute tick, the running sum of delta times
    pub fn timed_events(&self) -> impl Iterator<Item = (u64, &MidiEvent)> + '_ {
        self.events.iter().scan(0u64, |ticks, event| {
            *ticks += event.delta() as u64;
            Some((*ticks, event))
        })
    }
}

/// A note-on still waiting for its note-off
#[derive(Debug, Clone, Copy)]
struct PendingNote {
    /// Slot of the note-on in the staged event list
    index: usize,
}

/// Stateful walk over a single track payload. State never outlives one track
struct TrackDecoder<'a> {
    /// Position in the track payload
    cursor: ByteCursor<'a>,
    /// 1-based track index
    track: u16,
    /// Staged output. Note-on slots are replaced once their length is known
    events: Vec<MidiEvent>,
    /// Sounding note-ons per key, oldest first
    pending: HashMap<u8, VecDeque<PendingNote>>,
    /// Status of the previous event, reused under running status
    last_event_code: u8,
}

impl<'a> TrackDecoder<'a> {
    /// Prepares to decode `payload`
    fn new(payload: &'a [u8], track: u16) -> Self {
        Self {
            cursor: ByteCursor::new(payload),
            track,
            events: vec![],
            pending: HashMap::new(),
            last_event_code: 0,
        }
    }

    /// Runs until the payload is exhausted
    fn decode(mut self) -> Result<Vec<MidiEvent>, ParseError> {
        while !self.cursor.is_empty() {
            let event = self.next_event()?;
            self.events.push(event);
        }

        Ok(self.events)
    }

    /// Decodes one delta time and event
    fn next_event(&mut self) -> Result<MidiEvent, ParseError> {
        let delta = self.cursor.read_variable_length_quantity()?;

        let event_code = match self.cursor.peek() {
            Some(code) if is_valid_event_code(code) => self.cursor.read_u8()?,
            _ => {
                trace!(
                    "Track {}: running status {} at byte {}",
                    self.track,
                    to_hex(self.last_event_code),
                    self.cursor.position()
                );
                self.last_event_code
            }
        };

        let event = if is_meta_event(event_code) {
            self.meta_event(delta)?
        } else if is_sysex_event(event_code) {
            return Err(ParseError::Unimplemented("sysex event processing"));
        } else if is_note_event(event_code) {
            self.note_event(event_code, delta)?
        } else {
            self.channel_event(event_code, delta)?
        };

        self.last_event_code = event_code;
        Ok(event)
    }

    /// Subtype byte, length quantity, then exactly that many data bytes
    fn meta_event(&mut self, delta: u32) -> Result<MidiEvent, ParseError> {
        let subtype = self.cursor.read_u8()?;
        let length = self.cursor.read_variable_length_quantity()?;
        let data = self.cursor.take(length as usize)?;

        let meta = MetaEvent::try_from((subtype, data))?;
        Ok(MidiEvent::meta(delta, self.track, meta))
    }

    /// Builds a note event and pairs note-offs with the oldest sounding note-on of the same key
    fn note_event(&mut self, event_code: u8, delta: u32) -> Result<MidiEvent, ParseError> {
        let [note, velocity] = self.data_bytes()?;
        let channel = channel_of(event_code);

        let is_on = is_note_on(event_code);
        let releases_sounding_note = velocity == 0 && self.pending.contains_key(&note);

        if is_on && !releases_sounding_note {
            self.pending
                .entry(note)
                .or_default()
                .push_back(PendingNote {
                    index: self.events.len(),
                });

            return Ok(MidiEvent::new(
                event_code,
                delta,
                self.track,
                EventKind::Note(NoteEvent::On {
                    channel,
                    note,
                    velocity,
                    length: None,
                }),
            ));
        }

        let code = if is_on {
            trace!(
                "Track {}: zero velocity note-on for {note} treated as note-off",
                self.track
            );
            event_code - NOTE_ON_TO_OFF
        } else {
            event_code
        };

        self.release(note, delta)?;

        Ok(MidiEvent::new(
            code,
            delta,
            self.track,
            EventKind::Note(NoteEvent::Off {
                channel,
                note,
                velocity,
            }),
        ))
    }

    /// Pops the oldest pending note-on for `note` and replaces its slot with a copy carrying the
    /// computed length. `delta` belongs to the note-off not yet pushed
    fn release(&mut self, note: u8, delta: u32) -> Result<(), ParseError> {
        let queue = self
            .pending
            .get_mut(&note)
            .ok_or(ParseError::UnmatchedNoteOff(note))?;
        let pending = queue
            .pop_front()
            .ok_or(ParseError::UnmatchedNoteOff(note))?;
        if queue.is_empty() {
            self.pending.remove(&note);
        }

        // Accumulation stops at the first note-off of the same key after the note-on, inclusive
        let mut length = 0u32;
        for event in &self.events[pending.index + 1..] {
            length = length.saturating_add(event.delta());
            if matches!(event.as_note(), Some(NoteEvent::Off { note: key, .. }) if *key == note) {
                break;
            }
        }
        let length = length.saturating_add(delta);

        let patched = self.events[pending.index].with_length(length);
        self.events[pending.index] = patched;

        Ok(())
    }

    /// Fixed size channel voice messages
    fn channel_event(&mut self, event_code: u8, delta: u32) -> Result<MidiEvent, ParseError> {
        let channel = channel_of(event_code);

        let kind = if is_polyphonic_aftertouch(event_code) {
            let [note, pressure] = self.data_bytes()?;
            ChannelEvent::PolyphonicAftertouch {
                channel,
                note,
                pressure,
            }
        } else if is_control_change(event_code) {
            let [controller, value] = self.data_bytes()?;
            ChannelEvent::ControlChange {
                channel,
                controller,
                value,
            }
        } else if is_program_change(event_code) {
            let [program] = self.data_bytes()?;
            ChannelEvent::ProgramChange { channel, program }
        } else if is_channel_aftertouch(event_code) {
            let [pressure] = self.data_bytes()?;
            ChannelEvent::ChannelAftertouch { channel, pressure }
        } else if is_pitch_wheel(event_code) {
            let [lsb, msb] = self.data_bytes()?;
            ChannelEvent::PitchWheel {
                channel,
                value: ((msb as u16 & 0x7F) << 7) | (lsb as u16 & 0x7F),
            }
        } else {
            return Err(ParseError::UnknownEventCode(event_code));
        };

        Ok(MidiEvent::new(
            event_code,
            delta,
            self.track,
            EventKind::Channel(kind),
        ))
    }

    /// Consumes the `N` data bytes of a channel message
    fn data_bytes<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.cursor.take(N)?);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        event::{ChannelEvent, EventKind, NoteEvent},
        meta::MetaEvent,
        MidiTrack,
    };
    use crate::chunk::ParseError;

    fn note(track: &MidiTrack, index: usize) -> NoteEvent {
        *track.events()[index]
            .as_note()
            .expect("Event should be a note")
    }

    #[test]
    fn note_pairing_produces_length() {
        let payload = [0x00, 0x90, 0x3C, 0x40, 0x60, 0x80, 0x3C, 0x40];
        let track = MidiTrack::decode(&payload, 1).expect("Decode track");

        assert_eq!(track.events().len(), 2);
        assert_eq!(
            note(&track, 0),
            NoteEvent::On {
                channel: 0,
                note: 60,
                velocity: 64,
                length: Some(96),
            }
        );
        assert_eq!(
            note(&track, 1),
            NoteEvent::Off {
                channel: 0,
                note: 60,
                velocity: 64,
            }
        );
        assert_eq!(track.events()[1].delta(), 96);
    }

    #[test]
    fn running_status_reuses_previous_code() {
        // Second note-on and both note-offs omit their status byte
        let payload = [
            0x00, 0x91, 0x3C, 0x40, 0x00, 0x40, 0x40, 0x10, 0x3C, 0x00, 0x10, 0x40, 0x00,
        ];
        let track = MidiTrack::decode(&payload, 1).expect("Decode track");

        assert_eq!(track.events().len(), 4);
        assert_eq!(track.events()[1].code(), 0x91);
        assert_eq!(note(&track, 1).note(), 64);
        assert_eq!(note(&track, 0).length(), Some(16));
        assert_eq!(note(&track, 1).length(), Some(32));
        assert_eq!(track.events()[2].code(), 0x81);
        assert!(!note(&track, 2).is_on());
    }

    #[test]
    fn running_status_without_previous_event_fails() {
        let payload = [0x00, 0x3C, 0x40];

        assert_eq!(
            MidiTrack::decode(&payload, 1),
            Err(ParseError::UnknownEventCode(0x00))
        );
    }

    #[test]
    fn zero_velocity_note_on_releases_sounding_note() {
        let payload = [0x00, 0x92, 0x3C, 0x64, 0x30, 0x92, 0x3C, 0x00];
        let track = MidiTrack::decode(&payload, 1).expect("Decode track");

        assert_eq!(note(&track, 0).length(), Some(0x30));
        assert_eq!(track.events()[1].code(), 0x82);
        assert_eq!(
            note(&track, 1),
            NoteEvent::Off {
                channel: 2,
                note: 60,
                velocity: 0,
            }
        );
    }

    #[test]
    fn zero_velocity_note_on_without_sounding_note_stays_on() {
        let payload = [0x00, 0x90, 0x3C, 0x00];
        let track = MidiTrack::decode(&payload, 1).expect("Decode track");

        assert_eq!(
            note(&track, 0),
            NoteEvent::On {
                channel: 0,
                note: 60,
                velocity: 0,
                length: None,
            }
        );
    }

    #[test]
    fn unmatched_note_off_fails() {
        let payload = [0x00, 0x80, 0x3C, 0x40];

        assert_eq!(
            MidiTrack::decode(&payload, 1),
            Err(ParseError::UnmatchedNoteOff(60))
        );
    }

    #[test]
    fn overlapping_same_pitch_notes_pair_first_in_first_out() {
        // on(60) @0, on(60) @10, off(60) @30, cc @35, off(60) @65
        let payload = [
            0x00, 0x90, 0x3C, 0x40, // on #1
            0x0A, 0x90, 0x3C, 0x41, // on #2
            0x14, 0x80, 0x3C, 0x00, // off pairs with on #1
            0x05, 0xB0, 0x07, 0x64, // unrelated controller
            0x1E, 0x80, 0x3C, 0x00, // off pairs with on #2
        ];
        let track = MidiTrack::decode(&payload, 1).expect("Decode track");

        // First note: 10 + 20
        assert_eq!(note(&track, 0).length(), Some(30));
        // Second note stops summing at the first same-pitch off after it: 20 + 30
        assert_eq!(note(&track, 1).length(), Some(50));
        assert_eq!(note(&track, 1).velocity(), 0x41);
    }

    #[test]
    fn channel_events_decode_payloads() {
        let payload = [
            0x00, 0xA1, 0x3C, 0x20, // poly aftertouch
            0x00, 0xB2, 0x07, 0x64, // control change
            0x00, 0xC3, 0x05, // program change
            0x00, 0xD4, 0x30, // channel aftertouch
            0x00, 0xE5, 0x00, 0x40, // pitch wheel center
        ];
        let track = MidiTrack::decode(&payload, 3).expect("Decode track");
        let kinds: Vec<&EventKind> = track.events().iter().map(|event| event.kind()).collect();

        assert_eq!(
            kinds,
            vec![
                &EventKind::Channel(ChannelEvent::PolyphonicAftertouch {
                    channel: 1,
                    note: 60,
                    pressure: 0x20,
                }),
                &EventKind::Channel(ChannelEvent::ControlChange {
                    channel: 2,
                    controller: 7,
                    value: 100,
                }),
                &EventKind::Channel(ChannelEvent::ProgramChange {
                    channel: 3,
                    program: 5,
                }),
                &EventKind::Channel(ChannelEvent::ChannelAftertouch {
                    channel: 4,
                    pressure: 0x30,
                }),
                &EventKind::Channel(ChannelEvent::PitchWheel {
                    channel: 5,
                    value: 0x2000,
                }),
            ]
        );
        assert!(track.events().iter().all(|event| event.track() == 3));
    }

    #[test]
    fn meta_events_decode_and_name_track() {
        let payload = [
            0x00, 0xFF, 0x04, 0x04, b'B', b'a', b's', b's', // instrument name
            0x00, 0xFF, 0x04, 0x03, b'S', b'u', b'b', // later instrument name is ignored
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo
            0x00, 0xFF, 0x2F, 0x00, // end of track
        ];
        let track = MidiTrack::decode(&payload, 1).expect("Decode track");

        assert_eq!(track.name(), "Bass");
        assert_eq!(
            track.events()[2].as_meta(),
            Some(&MetaEvent::Tempo(500_000))
        );
        assert_eq!(track.events()[3].subtype(), "end");
    }

    #[test]
    fn track_without_instrument_name_is_unnamed() {
        let payload = [0x00, 0xFF, 0x03, 0x02, b'H', b'i', 0x00, 0xFF, 0x2F, 0x00];
        let track = MidiTrack::decode(&payload, 1).expect("Decode track");

        assert_eq!(track.name(), "");
    }

    #[test]
    fn sysex_is_unimplemented() {
        let payload = [0x00, 0xF0, 0x01, 0x7E, 0xF7];

        assert!(matches!(
            MidiTrack::decode(&payload, 1),
            Err(ParseError::Unimplemented(_))
        ));
    }

    #[test]
    fn truncated_event_is_malformed() {
        let payload = [0x00, 0x90, 0x3C];

        assert!(matches!(
            MidiTrack::decode(&payload, 1),
            Err(ParseError::MalformedInput(_))
        ));
    }

    #[test]
    fn delta_cut_off_by_end_of_track_is_malformed() {
        let truncated =
            ParseError::MalformedInput("variable length quantity runs past the end of data");

        assert_eq!(MidiTrack::decode(&[0x81], 1), Err(truncated.clone()));
        assert_eq!(
            MidiTrack::decode(&[0x00, 0xFF, 0x2F, 0x00, 0x81], 1),
            Err(truncated.clone())
        );
        assert_eq!(
            MidiTrack::decode(&[0x00, 0x90, 0x3C, 0x40, 0x81], 1),
            Err(truncated)
        );
    }

    #[test]
    fn track_without_end_of_track_still_decodes() {
        let payload = [0x00, 0x90, 0x3C, 0x40, 0x60, 0x80, 0x3C, 0x40];
        let track = MidiTrack::decode(&payload, 1).expect("Decode track");

        assert_eq!(track.events().len(), 2);
        assert_eq!(track.events()[1].subtype(), "off");
        assert_eq!(note(&track, 0).length(), Some(96));
    }

    #[test]
    fn long_tracks_decode_iteratively() {
        let mut payload = vec![];
        for _ in 0..50_000 {
            payload.extend_from_slice(&[0x00, 0x90, 0x3C, 0x40, 0x01, 0x80, 0x3C, 0x40]);
        }
        payload.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

        let track = MidiTrack::decode(&payload, 1).expect("Decode track");

        assert_eq!(track.events().len(), 100_001);
        assert!(track
            .events()
            .iter()
            .filter_map(|event| event.as_note())
            .filter(|note| note.is_on())
            .all(|note| note.length() == Some(1)));
    }

    #[test]
    fn timed_events_accumulate_deltas() {
        let payload = [
            0x00, 0x90, 0x3C, 0x40, 0x60, 0x80, 0x3C, 0x40, 0x81, 0x00, 0xFF, 0x2F, 0x00,
        ];
        let track = MidiTrack::decode(&payload, 1).expect("Decode track");
        let ticks: Vec<u64> = track.timed_events().map(|(tick, _)| tick).collect();

        assert_eq!(ticks, vec![0, 96, 224]);
    }
}

// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! Standard MIDI File decoding.
//!
//! Only the parts of a file that affect rendering are kept: notes, the control
//! events the renderers react to, tempo changes and a final snapshot of every
//! channel's state. Truncated or slightly malformed files are decoded as far as
//! possible and the problems are logged rather than returned.

use std::{collections::BTreeMap, fs, path::Path};

use midly::{Format, MetaMessage, MidiMessage, Timing, TrackEvent, TrackEventKind, TrackIter};
use tracing::{debug, warn};

use super::{
    error::MidiError,
    tempo::{TempoMap, DEFAULT_TEMPO},
};

/// The percussion channel in General MIDI (channel 10, zero-based 9).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// RPN selection meaning "no parameter selected".
const RPN_NULL: u16 = 0x3FFF;

/// The contents of the `MThd` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiHeader {
    pub format: u16,
    pub track_count: u16,
    /// Ticks per quarter note.
    pub division: u16,
}

/// A note with both ends resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiNote {
    pub start_tick: u32,
    pub end_tick: u32,
    pub note: u8,
    pub velocity: u8,
    pub channel: u8,
    pub track: u16,
}

/// What a control event changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    PitchBend,
    Pan,
    Modulation,
    Expression,
    Volume,
    Sustain,
    PortamentoTime,
    PortamentoSwitch,
    FilterCutoff,
    FilterResonance,
    Tremolo,
    ChannelPressure,
    PolyKeyPressure,
    ProgramChange,
    RawMidiCc,
}

/// A timed change to one channel's controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub tick: u32,
    pub channel: u8,
    pub kind: ControlKind,
    /// The CC number, the key for poly pressure, zero otherwise.
    pub controller: u8,
    /// 0-127 for most kinds, -8192..=8191 for pitch bend.
    pub value: i16,
}

/// A tempo change in microseconds per quarter note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoEvent {
    pub tick: u32,
    pub tempo: u32,
}

/// A channel's state once the whole file has been read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelState {
    pub program: u8,
    pub bank: u16,
    pub pan: u8,
    pub volume: u8,
    pub expression: u8,
    pub modulation: u8,
    pub pitch_bend: i16,
    /// Semitones covered by a full pitch wheel deflection.
    pub pitch_bend_range: f32,
    pub sustain: bool,
    pub portamento_time: u8,
    pub portamento_on: bool,
    pub filter_cutoff: u8,
    pub filter_resonance: u8,
    pub tremolo: u8,
}

impl Default for ChannelState {
    fn default() -> Self {
        ChannelState {
            program: 0,
            bank: 0,
            pan: 64,
            volume: 100,
            expression: 127,
            modulation: 0,
            pitch_bend: 0,
            pitch_bend_range: 2.0,
            sustain: false,
            portamento_time: 0,
            portamento_on: false,
            filter_cutoff: 127,
            filter_resonance: 0,
            tremolo: 0,
        }
    }
}

/// A decoded MIDI file.
#[derive(Debug, Clone)]
pub struct MidiSequence {
    pub header: MidiHeader,
    /// Sorted by start tick.
    pub notes: Vec<MidiNote>,
    /// Sorted by tick, file order within a tick.
    pub controls: Vec<ControlEvent>,
    /// Sorted by tick. Always starts at tick zero.
    pub tempos: Vec<TempoEvent>,
    pub channels: [ChannelState; 16],
}

impl MidiSequence {
    /// Reads and decodes a MIDI file.
    pub fn read(path: &Path) -> Result<MidiSequence, MidiError> {
        let bytes = fs::read(path)?;
        MidiSequence::parse(&bytes)
    }

    /// Decodes a MIDI file held in memory.
    pub fn parse(bytes: &[u8]) -> Result<MidiSequence, MidiError> {
        let (header, tracks) = open(bytes)?;
        let mut builder = SequenceBuilder::default();
        let mut parsed = 0u16;

        for (track, events) in (0..header.track_count).zip(tracks) {
            match events {
                Ok(events) => builder.parse_track(events, track),
                Err(e) => {
                    warn!(track, err = %e, "Unreadable track chunk, stopping");
                    break;
                }
            }
            parsed += 1;
        }

        if parsed < header.track_count {
            warn!(
                parsed,
                declared = header.track_count,
                "MIDI file ends before all declared tracks"
            );
        }

        let sequence = builder.finish(header);
        if sequence.notes.is_empty() {
            return Err(MidiError::NoNotes);
        }

        debug!(
            format = header.format,
            tracks = header.track_count,
            division = header.division,
            notes = sequence.notes.len(),
            controls = sequence.controls.len(),
            tempos = sequence.tempos.len(),
            "Decoded MIDI file"
        );
        Ok(sequence)
    }

    /// The latest note end, in ticks.
    pub fn max_end_tick(&self) -> u32 {
        self.notes.iter().map(|note| note.end_tick).max().unwrap_or(0)
    }

    /// The tempo map of this sequence at the given output rate.
    pub fn tempo_map(&self, sample_rate: u32) -> TempoMap {
        TempoMap::new(&self.tempos, self.header.division, sample_rate)
    }
}

/// Validates the 14-byte `MThd` chunk and returns its contents.
pub fn parse_header(bytes: &[u8]) -> Result<MidiHeader, MidiError> {
    open(bytes).map(|(header, _)| header)
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let field = bytes.get(at..at + 2)?;
    Some(u16::from_be_bytes([field[0], field[1]]))
}

/// Checks the header and the first chunk, then hands the tracks to midly.
///
/// midly is lenient about header length and skips unknown chunks, so the
/// checks it does not make are done on the raw bytes first.
fn open(bytes: &[u8]) -> Result<(MidiHeader, TrackIter<'_>), MidiError> {
    let magic = bytes.get(..4).ok_or(MidiError::TruncatedHeader)?;
    if magic != b"MThd" {
        let mut found = [0u8; 4];
        found.copy_from_slice(magic);
        return Err(MidiError::BadMagic(found));
    }

    let length = bytes.get(4..8).ok_or(MidiError::TruncatedHeader)?;
    let length = u32::from_be_bytes([length[0], length[1], length[2], length[3]]);
    if length != 6 {
        return Err(MidiError::BadHeaderLength(length));
    }

    let track_count = be_u16(bytes, 10).ok_or(MidiError::TruncatedHeader)?;
    let raw_division = be_u16(bytes, 12).ok_or(MidiError::TruncatedHeader)?;
    if raw_division & 0x8000 != 0 {
        return Err(MidiError::SmpteDivision(raw_division));
    }

    if let Some(chunk) = bytes.get(14..18) {
        if chunk != b"MTrk" {
            return Err(MidiError::BadChunk {
                track: 0,
                found: String::from_utf8_lossy(chunk).into_owned(),
            });
        }
    }

    let (smf, tracks) = midly::parse(bytes)?;
    let division = match smf.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        Timing::Timecode(..) => return Err(MidiError::SmpteDivision(raw_division)),
    };
    if division == 0 {
        return Err(MidiError::ZeroDivision);
    }

    let format = match smf.format {
        Format::SingleTrack => 0,
        Format::Parallel => 1,
        Format::Sequential => 2,
    };

    Ok((
        MidiHeader {
            format,
            track_count,
            division,
        },
        tracks,
    ))
}

/// Accumulates the events of every track.
struct SequenceBuilder {
    notes: Vec<MidiNote>,
    controls: Vec<ControlEvent>,
    tempos: Vec<TempoEvent>,
    channels: [ChannelState; 16],
    /// Selected registered parameter per channel, `(msb << 7) | lsb`.
    rpn: [u16; 16],
}

impl Default for SequenceBuilder {
    fn default() -> Self {
        SequenceBuilder {
            notes: Vec::new(),
            controls: Vec::new(),
            tempos: Vec::new(),
            channels: [ChannelState::default(); 16],
            rpn: [RPN_NULL; 16],
        }
    }
}

/// Notes waiting for their Note-Off, keyed by `(channel << 8) | note`.
type ActiveNotes = BTreeMap<u16, MidiNote>;

fn note_key(channel: u8, note: u8) -> u16 {
    (u16::from(channel) << 8) | u16::from(note)
}

impl SequenceBuilder {
    /// Decodes one track. Parsing stops at End of Track or at the first event
    /// that cannot be read, and notes still sounding are closed at the last
    /// tick reached.
    fn parse_track<'a, I>(&mut self, events: I, track: u16)
    where
        I: IntoIterator<Item = Result<TrackEvent<'a>, midly::Error>>,
    {
        let mut active = ActiveNotes::new();
        let mut tick = 0u32;
        let notes_before = self.notes.len();

        for event in events {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!(track, tick, err = %e, "Track data is damaged, stopping");
                    break;
                }
            };
            tick = tick.saturating_add(event.delta.as_int());

            match event.kind {
                TrackEventKind::Midi { channel, message } => {
                    self.channel_event(message, channel.as_int(), tick, track, &mut active);
                }
                TrackEventKind::Meta(MetaMessage::EndOfTrack) => break,
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    let tempo = tempo.as_int();
                    if tempo == 0 {
                        warn!(tick, "Ignoring zero tempo");
                    } else {
                        self.tempos.push(TempoEvent { tick, tempo });
                    }
                }
                TrackEventKind::Meta(_) | TrackEventKind::SysEx(_) | TrackEventKind::Escape(_) => {}
            }
        }

        for (_, mut note) in active {
            note.end_tick = tick;
            self.notes.push(note);
        }

        debug!(
            track,
            notes = self.notes.len() - notes_before,
            end_tick = tick,
            "Parsed track"
        );
    }

    /// Handles a channel voice message.
    fn channel_event(
        &mut self,
        message: MidiMessage,
        channel: u8,
        tick: u32,
        track: u16,
        active: &mut ActiveNotes,
    ) {
        match message {
            MidiMessage::NoteOff { key, .. } => {
                self.close_note(active, channel, key.as_int(), tick);
            }
            MidiMessage::NoteOn { key, vel } => {
                let note = key.as_int();
                let velocity = vel.as_int();
                // A retriggered key ends the note already sounding.
                self.close_note(active, channel, note, tick);
                if velocity > 0 {
                    active.insert(
                        note_key(channel, note),
                        MidiNote {
                            start_tick: tick,
                            end_tick: tick,
                            note,
                            velocity,
                            channel,
                            track,
                        },
                    );
                }
            }
            MidiMessage::Aftertouch { key, vel } => {
                self.push_control(
                    tick,
                    channel,
                    ControlKind::PolyKeyPressure,
                    key.as_int(),
                    vel.as_int().into(),
                );
            }
            MidiMessage::Controller { controller, value } => {
                self.control_change(tick, channel, controller.as_int(), value.as_int());
            }
            MidiMessage::ProgramChange { program } => {
                let program = program.as_int();
                self.channels[usize::from(channel)].program = program;
                self.push_control(tick, channel, ControlKind::ProgramChange, 0, program.into());
            }
            MidiMessage::ChannelAftertouch { vel } => {
                let pressure = vel.as_int();
                self.push_control(tick, channel, ControlKind::ChannelPressure, 0, pressure.into());
            }
            MidiMessage::PitchBend { bend } => {
                let bend = bend.as_int();
                self.channels[usize::from(channel)].pitch_bend = bend;
                self.push_control(tick, channel, ControlKind::PitchBend, 0, bend);
            }
        }
    }

    fn close_note(&mut self, active: &mut ActiveNotes, channel: u8, note: u8, tick: u32) {
        if let Some(mut sounding) = active.remove(&note_key(channel, note)) {
            sounding.end_tick = tick;
            self.notes.push(sounding);
        }
    }

    fn push_control(
        &mut self,
        tick: u32,
        channel: u8,
        kind: ControlKind,
        controller: u8,
        value: i16,
    ) {
        self.controls.push(ControlEvent {
            tick,
            channel,
            kind,
            controller,
            value,
        });
    }

    fn control_change(&mut self, tick: u32, channel: u8, controller: u8, value: u8) {
        let state = &mut self.channels[usize::from(channel)];
        let rpn = &mut self.rpn[usize::from(channel)];
        let switch = if value >= 64 { 127 } else { 0 };

        let (kind, value) = match controller {
            1 => {
                state.modulation = value;
                (ControlKind::Modulation, value)
            }
            5 => {
                state.portamento_time = value;
                (ControlKind::PortamentoTime, value)
            }
            7 => {
                state.volume = value;
                (ControlKind::Volume, value)
            }
            10 => {
                state.pan = value;
                (ControlKind::Pan, value)
            }
            11 => {
                state.expression = value;
                (ControlKind::Expression, value)
            }
            64 => {
                state.sustain = switch != 0;
                (ControlKind::Sustain, switch)
            }
            65 => {
                state.portamento_on = switch != 0;
                (ControlKind::PortamentoSwitch, switch)
            }
            71 => {
                state.filter_resonance = value;
                (ControlKind::FilterResonance, value)
            }
            74 => {
                state.filter_cutoff = value;
                (ControlKind::FilterCutoff, value)
            }
            92 => {
                state.tremolo = value;
                (ControlKind::Tremolo, value)
            }
            0 => {
                state.bank = (u16::from(value) << 7) | (state.bank & 0x7F);
                (ControlKind::RawMidiCc, value)
            }
            32 => {
                state.bank = (state.bank & !0x7F) | u16::from(value);
                (ControlKind::RawMidiCc, value)
            }
            6 => {
                if *rpn == 0 {
                    state.pitch_bend_range = f32::from(value) + state.pitch_bend_range.fract();
                }
                (ControlKind::RawMidiCc, value)
            }
            38 => {
                if *rpn == 0 {
                    state.pitch_bend_range =
                        state.pitch_bend_range.trunc() + f32::from(value) / 100.0;
                }
                (ControlKind::RawMidiCc, value)
            }
            101 => {
                *rpn = (u16::from(value) << 7) | (*rpn & 0x7F);
                (ControlKind::RawMidiCc, value)
            }
            100 => {
                *rpn = (*rpn & !0x7F) | u16::from(value);
                (ControlKind::RawMidiCc, value)
            }
            98 | 99 => {
                *rpn = RPN_NULL;
                (ControlKind::RawMidiCc, value)
            }
            120 | 121 | 123..=127 => (ControlKind::RawMidiCc, value),
            _ => {
                warn!(channel, controller, value, "Skipping unhandled controller");
                return;
            }
        };

        self.push_control(tick, channel, kind, controller, value.into());
    }

    /// Sorts everything and guarantees a tempo at tick zero.
    fn finish(mut self, header: MidiHeader) -> MidiSequence {
        self.notes.sort_by_key(|note| note.start_tick);
        self.controls.sort_by_key(|event| event.tick);
        self.tempos.sort_by_key(|event| event.tick);

        if self.tempos.first().map_or(true, |event| event.tick > 0) {
            self.tempos.insert(
                0,
                TempoEvent {
                    tick: 0,
                    tempo: DEFAULT_TEMPO,
                },
            );
        }

        MidiSequence {
            header,
            notes: self.notes,
            controls: self.controls,
            tempos: self.tempos,
            channels: self.channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use midly::{
        num::{u15, u24, u28, u4, u7},
        Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
    };

    use super::*;
    use crate::testutil::midi_test_utils::{midi_file, note_off, note_on, track, Event};

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut bytes = midi_file(480, &[track(&[])]);
        bytes[0] = b'X';
        assert!(matches!(
            parse_header(&bytes),
            Err(MidiError::BadMagic(found)) if &found == b"XThd"
        ));
        // Only the magic is needed to reject the file.
        assert!(matches!(
            parse_header(b"MTrk"),
            Err(MidiError::BadMagic(found)) if &found == b"MTrk"
        ));
    }

    #[test]
    fn test_header_rejects_bad_length_and_smpte() {
        let mut bytes = midi_file(480, &[]);
        bytes[7] = 7;
        assert!(matches!(
            parse_header(&bytes),
            Err(MidiError::BadHeaderLength(7))
        ));

        let bytes = midi_file(0xE728, &[]);
        assert!(matches!(
            parse_header(&bytes),
            Err(MidiError::SmpteDivision(0xE728))
        ));

        let bytes = midi_file(0, &[]);
        assert!(matches!(parse_header(&bytes), Err(MidiError::ZeroDivision)));

        assert!(matches!(
            parse_header(b"MThd\0\0"),
            Err(MidiError::TruncatedHeader)
        ));
    }

    #[test]
    fn test_header_fields() {
        let bytes = midi_file(96, &[track(&[]), track(&[])]);
        assert_eq!(
            parse_header(&bytes).unwrap(),
            MidiHeader {
                format: 1,
                track_count: 2,
                division: 96,
            }
        );
    }

    #[test]
    fn test_simple_note() {
        let bytes = midi_file(
            480,
            &[track(&[note_on(0, 0, 69, 100), note_off(480, 0, 69)])],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();

        assert_eq!(sequence.header.division, 480);
        assert_eq!(
            sequence.notes,
            vec![MidiNote {
                start_tick: 0,
                end_tick: 480,
                note: 69,
                velocity: 100,
                channel: 0,
                track: 0,
            }]
        );
        assert_eq!(
            sequence.tempos,
            vec![TempoEvent {
                tick: 0,
                tempo: DEFAULT_TEMPO
            }]
        );
        assert_eq!(sequence.max_end_tick(), 480);
    }

    #[test]
    fn test_zero_velocity_note_on_is_note_off() {
        let explicit = midi_file(96, &[track(&[note_on(0, 3, 60, 90), note_off(96, 3, 60)])]);
        let zero_velocity = midi_file(96, &[track(&[note_on(0, 3, 60, 90), note_on(96, 3, 60, 0)])]);

        assert_eq!(
            MidiSequence::parse(&explicit).unwrap().notes,
            MidiSequence::parse(&zero_velocity).unwrap().notes
        );
    }

    #[test]
    fn test_running_status_matches_explicit_status() {
        let explicit = midi_file(
            96,
            &[track(&[
                note_on(0, 0, 60, 90),
                note_on(0, 0, 64, 90),
                note_on(96, 0, 60, 0),
                note_on(0, 0, 64, 0),
            ])],
        );
        let running = midi_file(
            96,
            &[track(&[
                Event::Raw(0, vec![0x90, 60, 90]),
                Event::Raw(0, vec![64, 90]),
                Event::Raw(96, vec![60, 0]),
                Event::Raw(0, vec![64, 0]),
            ])],
        );

        let explicit = MidiSequence::parse(&explicit).unwrap();
        let running = MidiSequence::parse(&running).unwrap();
        assert_eq!(explicit.notes.len(), 2);
        assert_eq!(explicit.notes, running.notes);
    }

    #[test]
    fn test_running_status_over_controls() {
        let explicit = midi_file(
            96,
            &[track(&[
                Event::Raw(0, vec![0xB0, 7, 100]),
                Event::Raw(0, vec![0xB0, 10, 20]),
                Event::Raw(5, vec![0xB0, 7, 90]),
                Event::Raw(0, vec![0xE0, 0x00, 0x50]),
                Event::Raw(5, vec![0xE0, 0x10, 0x30]),
                Event::Raw(0, vec![0xD0, 40]),
                Event::Raw(5, vec![0xD0, 60]),
                Event::Tempo(0, 400_000),
                Event::Raw(0, vec![0xB1, 11, 80]),
                note_on(0, 0, 60, 90),
                note_off(10, 0, 60),
            ])],
        );
        let running = midi_file(
            96,
            &[track(&[
                Event::Raw(0, vec![0xB0, 7, 100]),
                Event::Raw(0, vec![10, 20]),
                Event::Raw(5, vec![7, 90]),
                Event::Raw(0, vec![0xE0, 0x00, 0x50]),
                Event::Raw(5, vec![0x10, 0x30]),
                Event::Raw(0, vec![0xD0, 40]),
                Event::Raw(5, vec![60]),
                Event::Tempo(0, 400_000),
                Event::Raw(0, vec![0xB1, 11, 80]),
                Event::Raw(0, vec![0x90, 60, 90]),
                Event::Raw(10, vec![60, 0]),
            ])],
        );

        let explicit = MidiSequence::parse(&explicit).unwrap();
        let running = MidiSequence::parse(&running).unwrap();

        let kinds: Vec<ControlKind> = explicit.controls.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ControlKind::Volume,
                ControlKind::Pan,
                ControlKind::Volume,
                ControlKind::PitchBend,
                ControlKind::PitchBend,
                ControlKind::ChannelPressure,
                ControlKind::ChannelPressure,
                ControlKind::Expression,
            ]
        );
        assert_eq!(explicit.controls, running.controls);
        assert_eq!(explicit.tempos, running.tempos);
        assert_eq!(explicit.notes, running.notes);
        assert_eq!(running.channels[0].volume, 90);
        assert_eq!(running.channels[0].pitch_bend, ((0x30 << 7) | 0x10) - 8192);
    }

    #[test]
    fn test_same_key_on_different_channels() {
        let bytes = midi_file(
            96,
            &[track(&[
                note_on(0, 0, 60, 90),
                note_on(10, 1, 60, 80),
                note_off(20, 0, 60),
                note_off(30, 1, 60),
            ])],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();

        let channel0 = sequence.notes.iter().find(|n| n.channel == 0).unwrap();
        let channel1 = sequence.notes.iter().find(|n| n.channel == 1).unwrap();
        assert_eq!((channel0.start_tick, channel0.end_tick), (0, 30));
        assert_eq!((channel1.start_tick, channel1.end_tick), (10, 60));
    }

    #[test]
    fn test_retrigger_closes_previous_note() {
        let bytes = midi_file(
            96,
            &[track(&[
                note_on(0, 0, 60, 90),
                note_on(48, 0, 60, 70),
                note_off(48, 0, 60),
            ])],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();

        assert_eq!(sequence.notes.len(), 2);
        assert_eq!((sequence.notes[0].start_tick, sequence.notes[0].end_tick), (0, 48));
        assert_eq!((sequence.notes[1].start_tick, sequence.notes[1].end_tick), (48, 96));
        assert_eq!(sequence.notes[1].velocity, 70);
    }

    #[test]
    fn test_end_of_track_closes_notes() {
        let bytes = midi_file(
            96,
            &[track(&[note_on(0, 0, 60, 90), Event::Raw(200, vec![0xFF, 0x2F, 0x00])])],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();
        assert_eq!(sequence.notes[0].end_tick, 200);
    }

    #[test]
    fn test_truncated_track_closes_notes() {
        let mut bytes = midi_file(
            96,
            &[track(&[note_on(0, 0, 60, 90), note_on(50, 0, 62, 90), note_off(50, 0, 60)])],
        );
        // Drop the end of track and the last Note-Off data byte.
        bytes.truncate(bytes.len() - 5);
        let sequence = MidiSequence::parse(&bytes).unwrap();

        // The cut event is lost, both notes end at the last complete one.
        assert_eq!(sequence.notes.len(), 2);
        assert!(sequence.notes.iter().all(|note| note.end_tick == 50));
    }

    #[test]
    fn test_missing_tracks_warn_only() {
        let mut bytes = midi_file(96, &[track(&[note_on(0, 0, 60, 90), note_off(10, 0, 60)])]);
        // Claim a second track that is not there.
        bytes[11] = 2;
        let sequence = MidiSequence::parse(&bytes).unwrap();
        assert_eq!(sequence.notes.len(), 1);
    }

    #[test]
    fn test_bad_chunk_type() {
        let mut bytes = midi_file(96, &[track(&[note_on(0, 0, 60, 90)])]);
        bytes[14..18].copy_from_slice(b"XXXX");
        assert!(matches!(
            MidiSequence::parse(&bytes),
            Err(MidiError::BadChunk { track: 0, .. })
        ));
    }

    #[test]
    fn test_no_notes() {
        let bytes = midi_file(96, &[track(&[Event::Raw(0, vec![0xB0, 7, 100])])]);
        assert!(matches!(MidiSequence::parse(&bytes), Err(MidiError::NoNotes)));
    }

    #[test]
    fn test_tempos_sorted_across_tracks() {
        let bytes = midi_file(
            96,
            &[
                track(&[Event::Tempo(0, 600_000), Event::Tempo(960, 400_000)]),
                track(&[Event::Tempo(480, 300_000), note_on(0, 0, 60, 90), note_off(10, 0, 60)]),
            ],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();
        let ticks: Vec<u32> = sequence.tempos.iter().map(|t| t.tick).collect();
        assert_eq!(ticks, vec![0, 480, 960]);
        assert_eq!(sequence.tempos[0].tempo, 600_000);
    }

    #[test]
    fn test_controls_and_channel_state() {
        let bytes = midi_file(
            96,
            &[track(&[
                Event::Raw(0, vec![0xC2, 33]),
                Event::Raw(0, vec![0xB2, 10, 20]),
                Event::Raw(5, vec![0xB2, 64, 100]),
                Event::Raw(5, vec![0xE2, 0x00, 0x60]),
                Event::Raw(0, vec![0xB2, 3, 1]),
                Event::Raw(0, vec![0xD2, 50]),
                note_on(0, 2, 40, 90),
                note_off(10, 2, 40),
            ])],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();

        let state = &sequence.channels[2];
        assert_eq!(state.program, 33);
        assert_eq!(state.pan, 20);
        assert!(state.sustain);
        assert_eq!(state.pitch_bend, (0x60 << 7) - 8192);

        let kinds: Vec<ControlKind> = sequence.controls.iter().map(|c| c.kind).collect();
        // CC3 is unhandled and dropped.
        assert_eq!(
            kinds,
            vec![
                ControlKind::ProgramChange,
                ControlKind::Pan,
                ControlKind::Sustain,
                ControlKind::PitchBend,
                ControlKind::ChannelPressure,
            ]
        );
        assert_eq!(sequence.controls[2].value, 127);
        assert_eq!(sequence.controls[3].value, (0x60 << 7) - 8192);
    }

    #[test]
    fn test_rpn_pitch_bend_range_and_bank() {
        let bytes = midi_file(
            96,
            &[track(&[
                Event::Raw(0, vec![0xB0, 101, 0]),
                Event::Raw(0, vec![0xB0, 100, 0]),
                Event::Raw(0, vec![0xB0, 6, 12]),
                Event::Raw(0, vec![0xB0, 38, 50]),
                Event::Raw(0, vec![0xB0, 0, 1]),
                Event::Raw(0, vec![0xB0, 32, 2]),
                // NRPN data entry does not touch the range.
                Event::Raw(0, vec![0xB1, 99, 0]),
                Event::Raw(0, vec![0xB1, 6, 24]),
                note_on(0, 0, 60, 90),
                note_off(10, 0, 60),
            ])],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();
        assert!((sequence.channels[0].pitch_bend_range - 12.5).abs() < 1e-6);
        assert_eq!(sequence.channels[0].bank, 130);
        assert_eq!(sequence.channels[1].pitch_bend_range, 2.0);
    }

    #[test]
    fn test_sysex_and_meta_are_skipped() {
        let bytes = midi_file(
            96,
            &[track(&[
                Event::Raw(0, vec![0xF0, 0x03, 0x7E, 0x7F, 0xF7]),
                Event::Raw(0, vec![0xFF, 0x03, 0x04, b'n', b'a', b'm', b'e']),
                note_on(0, 0, 60, 90),
                note_off(10, 0, 60),
            ])],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();
        assert_eq!(sequence.notes.len(), 1);
        assert!(sequence.controls.is_empty());
    }

    #[test]
    fn test_stray_data_byte_keeps_earlier_events() {
        let bytes = midi_file(
            96,
            &[track(&[
                note_on(0, 0, 60, 90),
                note_off(10, 0, 60),
                note_on(0, 0, 64, 90),
                Event::Raw(20, vec![0xF2, 0x40]),
                note_off(10, 0, 64),
            ])],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();

        assert_eq!((sequence.notes[0].start_tick, sequence.notes[0].end_tick), (0, 10));
        let held = sequence.notes.iter().find(|note| note.note == 64).unwrap();
        assert_eq!(held.start_tick, 10);
    }

    #[test]
    fn test_agrees_with_midly() {
        let header = Header::new(Format::Parallel, Timing::Metrical(u15::new(240)));
        let mut smf = Smf::new(header);

        let event = |delta: u32, kind| TrackEvent {
            delta: u28::new(delta),
            kind,
        };
        let midi = |channel: u8, message| TrackEventKind::Midi {
            channel: u4::new(channel),
            message,
        };

        smf.tracks.push(vec![
            event(0, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(400_000)))),
            event(240, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(800_000)))),
            event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ]);
        smf.tracks.push(vec![
            event(
                0,
                midi(
                    1,
                    MidiMessage::NoteOn {
                        key: u7::new(64),
                        vel: u7::new(100),
                    },
                ),
            ),
            event(
                120,
                midi(
                    1,
                    MidiMessage::Controller {
                        controller: u7::new(7),
                        value: u7::new(90),
                    },
                ),
            ),
            event(
                120,
                midi(
                    1,
                    MidiMessage::NoteOff {
                        key: u7::new(64),
                        vel: u7::new(0),
                    },
                ),
            ),
            event(
                0,
                midi(
                    9,
                    MidiMessage::NoteOn {
                        key: u7::new(36),
                        vel: u7::new(127),
                    },
                ),
            ),
            event(
                60,
                midi(
                    9,
                    MidiMessage::NoteOn {
                        key: u7::new(36),
                        vel: u7::new(0),
                    },
                ),
            ),
            event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ]);

        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        let sequence = MidiSequence::parse(&bytes).unwrap();

        assert_eq!(sequence.header.format, 1);
        assert_eq!(sequence.header.track_count, 2);
        assert_eq!(sequence.header.division, 240);
        assert_eq!(
            sequence.tempos,
            vec![
                TempoEvent {
                    tick: 0,
                    tempo: 400_000
                },
                TempoEvent {
                    tick: 240,
                    tempo: 800_000
                },
            ]
        );
        assert_eq!(sequence.notes.len(), 2);
        assert_eq!(
            (sequence.notes[0].channel, sequence.notes[0].start_tick, sequence.notes[0].end_tick),
            (1, 0, 240)
        );
        assert_eq!(
            (sequence.notes[1].channel, sequence.notes[1].start_tick, sequence.notes[1].end_tick),
            (9, 240, 300)
        );
        assert_eq!(sequence.notes[1].track, 1);
        assert_eq!(sequence.controls.len(), 1);
        assert_eq!(sequence.controls[0].tick, 120);
        assert_eq!(sequence.channels[1].volume, 90);
    }
}

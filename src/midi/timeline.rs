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
use super::file::{ControlEvent, MidiSequence};

/// One entry of the merged event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    TempoChange { tick: u32, tempo: u32 },
    Control(ControlEvent),
    NoteOff { tick: u32, channel: u8, note: u8 },
    NoteOn { tick: u32, channel: u8, note: u8, velocity: u8 },
}

impl TimelineEvent {
    pub fn tick(&self) -> u32 {
        match self {
            TimelineEvent::TempoChange { tick, .. }
            | TimelineEvent::NoteOff { tick, .. }
            | TimelineEvent::NoteOn { tick, .. } => *tick,
            TimelineEvent::Control(event) => event.tick,
        }
    }

    /// Order within a tick: tempo, then controls, then releases, then attacks.
    fn rank(&self) -> u8 {
        match self {
            TimelineEvent::TempoChange { .. } => 0,
            TimelineEvent::Control(_) => 1,
            TimelineEvent::NoteOff { .. } => 2,
            TimelineEvent::NoteOn { .. } => 3,
        }
    }
}

/// Merges notes, controls and tempo changes into one tick-ordered stream.
/// Zero-length notes are dropped.
pub fn build_timeline(sequence: &MidiSequence) -> Vec<TimelineEvent> {
    let mut events = Vec::with_capacity(
        sequence.tempos.len() + sequence.controls.len() + sequence.notes.len() * 2,
    );

    events.extend(sequence.tempos.iter().map(|tempo| TimelineEvent::TempoChange {
        tick: tempo.tick,
        tempo: tempo.tempo,
    }));
    events.extend(sequence.controls.iter().copied().map(TimelineEvent::Control));

    for note in sequence.notes.iter().filter(|note| note.end_tick > note.start_tick) {
        events.push(TimelineEvent::NoteOn {
            tick: note.start_tick,
            channel: note.channel,
            note: note.note,
            velocity: note.velocity,
        });
        events.push(TimelineEvent::NoteOff {
            tick: note.end_tick,
            channel: note.channel,
            note: note.note,
        });
    }

    events.sort_by_key(|event| (event.tick(), event.rank()));
    events
}

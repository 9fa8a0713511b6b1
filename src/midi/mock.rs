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
use super::soundfont::SoundfontSynth;

/// A call made against [`RecordingSynth`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetOutput(u32),
    SetPreset(u8, u8, bool),
    SetBankPreset(u8, u16, u8),
    NoteOn(u8, u8, f32),
    NoteOff(u8, u8),
    SetPitchWheel(u8, u16),
    SetVolume(u8, f32),
    SetPan(u8, f32),
    MidiControl(u8, u8, u8),
    Render(usize),
}

/// A mock synthesizer. Records every call and renders a constant level.
#[derive(Debug, Clone)]
pub struct RecordingSynth {
    pub calls: Vec<Call>,
    level: f32,
}

impl Default for RecordingSynth {
    fn default() -> Self {
        RecordingSynth {
            calls: Vec::new(),
            level: 0.25,
        }
    }
}

impl RecordingSynth {
    /// A synth that only ever renders silence.
    pub fn silent() -> Self {
        RecordingSynth {
            calls: Vec::new(),
            level: 0.0,
        }
    }

    /// Total frames rendered.
    pub fn frames(&self) -> usize {
        self.frames_before(self.calls.len())
    }

    /// Frames rendered by the calls before `index`.
    pub fn frames_before(&self, index: usize) -> usize {
        self.calls[..index]
            .iter()
            .map(|call| match call {
                Call::Render(frames) => *frames,
                _ => 0,
            })
            .sum()
    }
}

impl SoundfontSynth for RecordingSynth {
    fn set_output(&mut self, sample_rate: u32) {
        self.calls.push(Call::SetOutput(sample_rate));
    }

    fn set_preset(&mut self, channel: u8, preset: u8, drums: bool) {
        self.calls.push(Call::SetPreset(channel, preset, drums));
    }

    fn set_bank_preset(&mut self, channel: u8, bank: u16, preset: u8) {
        self.calls.push(Call::SetBankPreset(channel, bank, preset));
    }

    fn note_on(&mut self, channel: u8, note: u8, velocity: f32) {
        self.calls.push(Call::NoteOn(channel, note, velocity));
    }

    fn note_off(&mut self, channel: u8, note: u8) {
        self.calls.push(Call::NoteOff(channel, note));
    }

    fn set_pitch_wheel(&mut self, channel: u8, value: u16) {
        self.calls.push(Call::SetPitchWheel(channel, value));
    }

    fn set_volume(&mut self, channel: u8, volume: f32) {
        self.calls.push(Call::SetVolume(channel, volume));
    }

    fn set_pan(&mut self, channel: u8, pan: f32) {
        self.calls.push(Call::SetPan(channel, pan));
    }

    fn midi_control(&mut self, channel: u8, controller: u8, value: u8) {
        self.calls.push(Call::MidiControl(channel, controller, value));
    }

    fn render(&mut self, output: &mut [f32]) {
        output.fill(self.level);
        self.calls.push(Call::Render(output.len() / 2));
    }
}

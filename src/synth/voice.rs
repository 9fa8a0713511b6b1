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
//! Stateless per-sample helpers shared by the additive MIDI voice.

use std::f32::consts::{FRAC_PI_2, PI};

use super::tables::{fast_sin, InstrumentFamily};

/// Default vibrato LFO rate in Hz.
pub const VIBRATO_RATE: f32 = 5.5;

/// Maximum vibrato frequency deviation as a ratio (2%).
pub const MAX_VIBRATO_DEPTH: f32 = 0.02;

/// Default tremolo LFO rate in Hz.
pub const TREMOLO_RATE: f32 = 5.0;

/// Lowest cutoff reachable through CC#74.
const MIN_CUTOFF_HZ: f32 = 100.0;

/// Frequency in Hz of a MIDI note number (69 = A4 = 440Hz).
pub fn note_to_frequency(note: u8) -> f32 {
    440.0 * ((f32::from(note) - 69.0) / 12.0).exp2()
}

/// Frequency multiplier for a vibrato of `depth` (0-1) at `time` seconds.
pub fn vibrato_multiplier(time: f32, depth: f32) -> f32 {
    1.0 + MAX_VIBRATO_DEPTH * depth * fast_sin(VIBRATO_RATE * time)
}

/// Amplitude multiplier for a tremolo of `depth` (0-1), swinging between
/// `1 - depth` and 1.
pub fn tremolo_multiplier(time: f32, depth: f32) -> f32 {
    1.0 - depth * 0.5 * (1.0 - fast_sin(TREMOLO_RATE * time))
}

/// Frequency multiplier for a pitch wheel value in `-8192..=8191`.
pub fn pitch_bend_multiplier(bend: i16, range_semitones: f32) -> f32 {
    ((f32::from(bend) / 8192.0) * range_semitones / 12.0).exp2()
}

/// Logarithmic glide from `start` to `end` Hz at `progress` (0-1).
pub fn portamento_frequency(start: f32, end: f32, progress: f32) -> f32 {
    if start <= 0.0 || end <= 0.0 || progress <= 0.0 {
        return end;
    }
    start * ((end / start).log2() * progress.min(1.0)).exp2()
}

/// Glide duration in seconds for a CC#5 value, 0 to 2 seconds on a square curve.
pub fn portamento_time_to_seconds(value: i16) -> f32 {
    if value <= 0 {
        return 0.0;
    }
    let normalized = f32::from(value) / 127.0;
    2.0 * normalized * normalized
}

/// Filter coefficient for a CC#74 value, exponential between 100Hz and 45% of the rate.
pub fn filter_cutoff_to_coefficient(value: i16, sample_rate: f32) -> f32 {
    let max_frequency = sample_rate * 0.45;
    let normalized = f32::from(value) / 127.0;
    let frequency = MIN_CUTOFF_HZ * ((max_frequency / MIN_CUTOFF_HZ).log2() * normalized).exp2();

    (2.0 * (PI * frequency / sample_rate).sin()).min(1.0)
}

/// Resonance feedback (0 to 3.8) for a CC#71 value.
pub fn filter_resonance_to_feedback(value: i16) -> f32 {
    f32::from(value) / 127.0 * 3.8
}

/// Constant-power stereo gains for a CC#10 value.
pub fn pan_gains(pan: i16) -> (f32, f32) {
    let angle = f32::from(pan.clamp(0, 127)) / 127.0 * FRAC_PI_2;
    (angle.cos(), angle.sin())
}

/// Two-pole resonant low-pass memory for one voice.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterState {
    pub buf0: f32,
    pub buf1: f32,
}

impl FilterState {
    /// Filters one sample. A coefficient at or above 0.99 bypasses the filter.
    pub fn process(&mut self, sample: f32, coefficient: f32, resonance: f32) -> f32 {
        if coefficient >= 0.99 {
            return sample;
        }

        let feedback = resonance + resonance / (1.0 - coefficient * 0.5);
        self.buf0 += coefficient * (sample - self.buf0 + feedback * (self.buf0 - self.buf1));
        self.buf1 += coefficient * (self.buf0 - self.buf1);
        self.buf1
    }
}

/// Attack, decay and release times in seconds plus a sustain level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeShape {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeShape {
    /// The envelope for a family, with segments shortened to fit `duration` seconds.
    pub fn for_family(family: InstrumentFamily, duration: f32) -> Self {
        use InstrumentFamily::*;

        let (attack, decay, sustain, release) = match family {
            Piano | Guitar | Chromatic => (
                0.005,
                (duration * 0.3).min(0.1),
                0.4,
                (duration * 0.3).min(0.2),
            ),
            Organ | SynthLead => (0.005, 0.01, 0.9, (duration * 0.1).min(0.05)),
            Strings | SynthPad | Ensemble => (
                (duration * 0.2).min(0.1),
                (duration * 0.2).min(0.1),
                0.7,
                (duration * 0.4).min(0.3),
            ),
            Brass | Reed | Pipe => (
                (duration * 0.1).min(0.03),
                (duration * 0.15).min(0.05),
                0.8,
                (duration * 0.2).min(0.1),
            ),
            Bass => (
                0.01,
                (duration * 0.2).min(0.08),
                0.6,
                (duration * 0.25).min(0.15),
            ),
            _ => (
                (duration * 0.1).min(0.01),
                (duration * 0.2).min(0.05),
                0.7,
                (duration * 0.3).min(0.1),
            ),
        };

        EnvelopeShape {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// The short, sustain-less envelope used for drum hits.
    pub fn percussion(duration: f32) -> Self {
        EnvelopeShape {
            attack: 0.001,
            decay: (duration * 0.3).min(0.05),
            sustain: 0.0,
            release: (duration * 0.2).min(0.05),
        }
    }

    /// Envelope level at `index` within a note of `total` samples.
    pub fn level(&self, index: usize, total: usize, sample_rate: f32) -> f32 {
        let attack = (self.attack * sample_rate) as usize;
        let decay = (self.decay * sample_rate) as usize;
        let release = (self.release * sample_rate) as usize;
        let sustain_len = total.saturating_sub(attack + decay + release);

        if index < attack {
            return index as f32 / attack as f32;
        }
        if index < attack + decay {
            let progress = (index - attack) as f32 / decay as f32;
            return 1.0 - progress * (1.0 - self.sustain);
        }
        if index < attack + decay + sustain_len {
            return self.sustain;
        }
        if release == 0 {
            return 0.0;
        }

        let progress = (index - attack - decay - sustain_len) as f32 / release as f32;
        self.sustain * (1.0 - progress).max(0.0)
    }
}

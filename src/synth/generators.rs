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
use rand::Rng;

use super::{tables::fast_sin, Synthesizer};

/// Octave rows summed by the pink noise generator.
const PINK_ROWS: usize = 16;

/// Random walk step of the brown noise generator.
const BROWN_STEP: f32 = 0.02;

/// High-pass coefficient of the blue noise generator.
const BLUE_ALPHA: f32 = 0.98;

impl Synthesizer<'_> {
    /// Fills the region with one periodic waveform sampled by `shape(phase)`.
    fn oscillator(&mut self, frequency: f32, shape: impl Fn(f32) -> f32) {
        let increment = frequency / self.sample_rate();
        let mut phase = 0.0f32;

        for sample in self.region_mut() {
            *sample = shape(phase);
            phase += increment;
            phase -= phase.floor();
        }
    }

    pub fn sine_wave(&mut self, frequency: f32, amplitude: f32) {
        self.oscillator(frequency, |phase| amplitude * fast_sin(phase));
    }

    pub fn square_wave(&mut self, frequency: f32, amplitude: f32) {
        self.oscillator(frequency, |phase| {
            if phase < 0.5 {
                amplitude
            } else {
                -amplitude
            }
        });
    }

    pub fn triangle_wave(&mut self, frequency: f32, amplitude: f32) {
        self.oscillator(frequency, |phase| {
            let value = if phase < 0.5 {
                4.0 * phase - 1.0
            } else {
                3.0 - 4.0 * phase
            };
            amplitude * value
        });
    }

    pub fn sawtooth_wave(&mut self, frequency: f32, amplitude: f32) {
        self.oscillator(frequency, |phase| amplitude * (2.0 * phase - 1.0));
    }

    /// Uniform noise in `[-1, 1)`.
    pub fn white_noise(&mut self) {
        let mut rng = rand::thread_rng();
        for sample in self.region_mut() {
            *sample = rng.gen_range(-1.0..1.0);
        }
    }

    /// Voss-McCartney pink noise (-3dB per octave).
    pub fn pink_noise(&mut self) {
        let mut rng = rand::thread_rng();
        let mut rows = [0.0f32; PINK_ROWS];
        let mut running_sum = 0.0f32;

        for (index, sample) in self.region_mut().iter_mut().enumerate() {
            // Index zero has no set bits and never updates a row.
            let row = index.trailing_zeros() as usize;
            if row < PINK_ROWS {
                running_sum -= rows[row];
                rows[row] = rng.gen_range(-1.0..1.0);
                running_sum += rows[row];
            }

            let white: f32 = rng.gen_range(-1.0..1.0);
            *sample = (running_sum + white) / (PINK_ROWS as f32 + 1.0);
        }
    }

    /// Random walk noise (-6dB per octave).
    pub fn brown_noise(&mut self) {
        let mut rng = rand::thread_rng();
        let mut last = 0.0f32;

        for sample in self.region_mut() {
            last = (last + rng.gen_range(-1.0f32..1.0) * BROWN_STEP).clamp(-1.0, 1.0);
            *sample = last;
        }
    }

    /// High-passed white noise (+3dB per octave).
    pub fn blue_noise(&mut self) {
        let mut rng = rand::thread_rng();
        let mut last_input = 0.0f32;
        let mut last_output = 0.0f32;

        for sample in self.region_mut() {
            let input: f32 = rng.gen_range(-1.0..1.0);
            let output = BLUE_ALPHA * (last_output + input - last_input);
            last_input = input;
            last_output = output;
            *sample = output.clamp(-1.0, 1.0);
        }
    }

    /// A sine whose frequency moves linearly from `start` to `end` Hz across the region.
    pub fn pitch_sweep(&mut self, start: f32, end: f32, amplitude: f32) {
        let sample_rate = self.sample_rate();
        let region = self.region_mut();
        let length = region.len() as f32;
        let mut phase = 0.0f32;

        for (index, sample) in region.iter_mut().enumerate() {
            let progress = index as f32 / length;
            let frequency = start + progress * (end - start);
            phase += frequency / sample_rate;
            phase -= phase.floor();
            *sample = amplitude * fast_sin(phase);
        }
    }

    /// Noise shaped by an exponential decay lasting `decay` seconds, silent afterwards.
    pub fn noise_burst(&mut self, decay: f32, amplitude: f32, white: bool) {
        if white {
            self.white_noise();
        } else {
            self.pink_noise();
        }

        let decay_samples = (decay * self.sample_rate()) as usize;
        for (index, sample) in self.region_mut().iter_mut().enumerate() {
            let envelope = if index < decay_samples {
                let progress = index as f32 / decay_samples as f32;
                amplitude * (-5.0 * progress).exp()
            } else {
                0.0
            };
            *sample *= envelope;
        }
    }
}

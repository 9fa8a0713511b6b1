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
use std::f32::consts::PI;

use super::{
    ring::RingBuffer,
    tables::{fast_sin, fast_sin_radians},
    voice::EnvelopeShape,
    Synthesizer,
};

/// Comb filter lengths of the reverb, tuned for 44.1kHz.
const REVERB_COMBS: [f32; 4] = [1116.0, 1188.0, 1277.0, 1356.0];

/// All-pass lengths of the reverb, tuned for 44.1kHz.
const REVERB_ALLPASSES: [f32; 2] = [225.0, 556.0];

/// Phaser sweep bounds in Hz.
const PHASER_MIN_HZ: f32 = 200.0;
const PHASER_MAX_HZ: f32 = 4000.0;

/// Linear read from `samples` at a fractional position, or `None` past the last pair.
fn read_interpolated(samples: &[f32], position: f32) -> Option<f32> {
    let position = position.max(0.0);
    let index = position as usize;
    if index + 1 >= samples.len() {
        return None;
    }
    let frac = position - index as f32;
    Some(samples[index] + frac * (samples[index + 1] - samples[index]))
}

/// Time constant of a one-pole smoother reaching 63% after `seconds`.
fn time_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    (-1.0 / (seconds * sample_rate)).exp()
}

fn dry_wet(dry: f32, wet: f32, mix: f32) -> f32 {
    (dry * (1.0 - mix) + wet * mix).clamp(-1.0, 1.0)
}

/// Chamberlin state-variable filter, band-pass output.
#[derive(Default)]
struct StateVariable {
    low: f32,
    band: f32,
}

impl StateVariable {
    fn process(&mut self, input: f32, center: f32, sample_rate: f32, q: f32) -> f32 {
        let f = 2.0 * fast_sin_radians(PI * center / sample_rate);
        let high = input - self.low - self.band / q;
        self.band += f * high;
        self.low += f * self.band;
        self.band.clamp(-1.0, 1.0)
    }
}

impl Synthesizer<'_> {
    /// Runs `effect(local_index, sample)` over every sample of the region.
    fn for_each_sample(&mut self, mut effect: impl FnMut(usize, f32) -> f32) {
        for (index, sample) in self.region_mut().iter_mut().enumerate() {
            *sample = effect(index, *sample);
        }
    }

    pub fn apply_adsr(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        let shape = EnvelopeShape {
            attack,
            decay,
            sustain,
            release,
        };
        let sample_rate = self.sample_rate();
        let total = self.range().len();
        self.for_each_sample(|index, sample| sample * shape.level(index, total, sample_rate));
    }

    /// Frequency modulation through a modulated read position.
    pub fn apply_vibrato(&mut self, rate: f32, depth: f32) {
        let sample_rate = self.sample_rate();
        let original = self.region_mut().to_vec();

        self.for_each_sample(|index, sample| {
            let time = index as f32 / sample_rate;
            let position = index as f32 + depth * sample_rate * fast_sin(rate * time);
            read_interpolated(&original, position).unwrap_or(sample)
        });
    }

    pub fn apply_tremolo(&mut self, rate: f32, depth: f32) {
        let sample_rate = self.sample_rate();
        self.for_each_sample(|index, sample| {
            let time = index as f32 / sample_rate;
            sample * (1.0 - depth * 0.5 * (1.0 + fast_sin(rate * time)))
        });
    }

    /// Linear ramp from silence over the first `time` seconds of the region.
    pub fn apply_fade_in(&mut self, time: f32) {
        let fade = (time * self.sample_rate()) as usize;
        let region = self.region_mut();
        let length = fade.min(region.len());
        for (index, sample) in region[..length].iter_mut().enumerate() {
            *sample *= index as f32 / fade as f32;
        }
    }

    /// Linear ramp to silence over the last `time` seconds of the region.
    pub fn apply_fade_out(&mut self, time: f32) {
        let fade = (time * self.sample_rate()) as usize;
        let region = self.region_mut();
        let start = region.len().saturating_sub(fade);
        for (index, sample) in region[start..].iter_mut().enumerate() {
            *sample *= 1.0 - index as f32 / fade as f32;
        }
    }

    /// One-pole RC low-pass.
    pub fn apply_low_pass(&mut self, cutoff: f32) {
        let rc = 1.0 / (2.0 * PI * cutoff);
        let dt = 1.0 / self.sample_rate();
        let alpha = dt / (rc + dt);
        let mut previous = 0.0f32;

        self.for_each_sample(|_, sample| {
            previous += alpha * (sample - previous);
            previous
        });
    }

    /// One-pole RC high-pass.
    pub fn apply_high_pass(&mut self, cutoff: f32) {
        let rc = 1.0 / (2.0 * PI * cutoff);
        let dt = 1.0 / self.sample_rate();
        let alpha = rc / (rc + dt);
        let mut previous_input = 0.0f32;
        let mut previous_output = 0.0f32;

        self.for_each_sample(|_, sample| {
            previous_output = alpha * (previous_output + sample - previous_input);
            previous_input = sample;
            previous_output.clamp(-1.0, 1.0)
        });
    }

    pub fn apply_ring_modulation(&mut self, frequency: f32) {
        let sample_rate = self.sample_rate();
        self.for_each_sample(|index, sample| {
            sample * fast_sin(frequency * index as f32 / sample_rate)
        });
    }

    /// Quantizes to `bits` of resolution (1 to 16).
    pub fn apply_bit_crush(&mut self, bits: u32) {
        let levels = (1u32 << bits.clamp(1, 16)) as f32;
        self.for_each_sample(|_, sample| (sample * levels).round() / levels);
    }

    /// Sample and hold every `factor` samples (1 to 32).
    pub fn apply_sample_rate_reduce(&mut self, factor: u32) {
        let factor = factor.clamp(1, 32) as usize;
        if factor == 1 {
            return;
        }

        let mut held = 0.0f32;
        self.for_each_sample(|index, sample| {
            if index % factor == 0 {
                held = sample;
            }
            held
        });
    }

    /// Symmetric clipping, `tanh` when soft, with a dry/wet blend.
    pub fn apply_distortion(&mut self, gain: f32, mix: f32, hard_clip: bool) {
        let gain = gain.max(1.0);
        let mix = mix.clamp(0.0, 1.0);

        self.for_each_sample(|_, sample| {
            let driven = sample * gain;
            let wet = if hard_clip {
                driven.clamp(-1.0, 1.0)
            } else {
                driven.tanh()
            };
            dry_wet(sample, wet, mix)
        });
    }

    /// Asymmetric exponential soft clip followed by a tone low-pass.
    pub fn apply_overdrive(&mut self, drive: f32, tone: f32) {
        let drive = drive.clamp(1.0, 20.0);
        let tone_alpha = 0.1 + tone.clamp(0.0, 1.0) * 0.8;
        let mut last = 0.0f32;

        self.for_each_sample(|_, sample| {
            let driven = sample * drive;
            let clipped = if driven > 0.0 {
                1.0 - (-driven).exp()
            } else {
                -1.0 + driven.exp()
            };
            last += tone_alpha * (clipped - last);
            last.clamp(-1.0, 1.0)
        });
    }

    /// Hard exponential clip, optionally rectified for an octave-up effect.
    pub fn apply_fuzz(&mut self, intensity: f32, octave_up: bool) {
        let intensity = intensity.clamp(1.0, 20.0);

        self.for_each_sample(|_, sample| {
            let mut driven = sample * intensity;
            if octave_up {
                driven = driven.abs() * 2.0 - 1.0;
            }
            let clipped = if driven > 0.0 {
                (1.0 - (-driven * 3.0).exp()) * 0.95
            } else {
                -1.0 + (driven * 3.0).exp()
            };
            clipped.clamp(-1.0, 1.0)
        });
    }

    /// LFO-modulated delayed copy blended with the dry signal. `depth` is in ms.
    pub fn apply_chorus(&mut self, rate: f32, depth: f32, mix: f32) {
        let rate = rate.clamp(0.1, 5.0);
        let depth = depth.clamp(1.0, 30.0);
        let mix = mix.clamp(0.0, 1.0);
        let sample_rate = self.sample_rate();
        let depth_samples = depth * sample_rate / 1000.0;
        let original = self.region_mut().to_vec();

        self.for_each_sample(|index, sample| {
            let lfo = (1.0 + fast_sin(rate * index as f32 / sample_rate)) * 0.5;
            let position = index as f32 - lfo * depth_samples;
            let wet = if position >= 0.0 {
                read_interpolated(&original, position).unwrap_or(0.0)
            } else {
                0.0
            };
            dry_wet(sample, wet, mix)
        });
    }

    /// Short swept delay with feedback and a triangle LFO. `depth` is in ms.
    pub fn apply_flanger(&mut self, rate: f32, depth: f32, feedback: f32, mix: f32) {
        let rate = rate.clamp(0.1, 2.0);
        let depth = depth.clamp(1.0, 10.0);
        let feedback = feedback.clamp(0.0, 0.95);
        let mix = mix.clamp(0.0, 1.0);
        let sample_rate = self.sample_rate();
        let depth_samples = depth * sample_rate / 1000.0;
        let mut line = RingBuffer::new((depth_samples + 1.0) as usize);

        self.for_each_sample(|index, sample| {
            let phase = (rate * index as f32 / sample_rate).fract();
            let lfo = 2.0 * (2.0 * phase - 1.0).abs() - 1.0;
            let delay = (lfo * 0.5 + 0.5) * depth_samples;

            let delayed = line.tap_interpolated(delay);
            line.push(sample + delayed * feedback);
            dry_wet(sample, delayed, mix)
        });
    }

    /// Swept chain of first-order all-pass stages with feedback.
    pub fn apply_phaser(&mut self, rate: f32, depth: f32, stages: usize, feedback: f32, mix: f32) {
        let rate = rate.clamp(0.1, 3.0);
        let depth = depth.clamp(0.0, 1.0);
        let feedback = feedback.clamp(0.0, 0.95);
        let mix = mix.clamp(0.0, 1.0);
        let sample_rate = self.sample_rate();
        let mut state = vec![0.0f32; stages.clamp(2, 12)];
        let mut last = 0.0f32;

        self.for_each_sample(|index, sample| {
            let lfo = (1.0 + fast_sin(rate * index as f32 / sample_rate)) * 0.5;
            let sweep = PHASER_MIN_HZ + lfo * depth * (PHASER_MAX_HZ - PHASER_MIN_HZ);
            let tangent = (PI * sweep / sample_rate).tan();
            let coefficient = (1.0 - tangent) / (1.0 + tangent);

            let mut processed = sample + last * feedback;
            for stage in state.iter_mut() {
                let output = coefficient * processed + *stage;
                *stage = processed - coefficient * output;
                processed = output;
            }
            last = processed;
            dry_wet(sample, processed, mix)
        });
    }

    /// Feedback echo. `time` is in ms (10 to 2000).
    pub fn apply_delay(&mut self, time: f32, feedback: f32, mix: f32) {
        let time = time.clamp(10.0, 2000.0);
        let feedback = feedback.clamp(0.0, 0.95);
        let mix = mix.clamp(0.0, 1.0);
        let mut line = RingBuffer::new((time * self.sample_rate() / 1000.0) as usize);

        self.for_each_sample(|_, sample| {
            let delayed = line.front();
            line.push(sample + delayed * feedback);
            dry_wet(sample, delayed, mix)
        });
    }

    /// Schroeder reverb: four damped combs in parallel, two all-passes in series.
    pub fn apply_reverb(&mut self, room_size: f32, damping: f32, mix: f32) {
        let room_size = room_size.clamp(0.0, 1.0);
        let damping = damping.clamp(0.0, 1.0);
        let mix = mix.clamp(0.0, 1.0);

        let scale = self.sample_rate() / 44100.0;
        let room_scale = scale * (0.7 + 0.3 * room_size);
        let comb_feedback = 0.7 + 0.28 * room_size;
        let damp = damping * 0.4;

        let mut combs: Vec<(RingBuffer, f32)> = REVERB_COMBS
            .iter()
            .map(|length| (RingBuffer::new((length * room_scale) as usize), 0.0))
            .collect();
        let mut allpasses: Vec<RingBuffer> = REVERB_ALLPASSES
            .iter()
            .map(|length| RingBuffer::new((length * scale) as usize))
            .collect();

        self.for_each_sample(|_, sample| {
            let mut wet = 0.0f32;
            for (line, filtered) in combs.iter_mut() {
                let delayed = line.front();
                *filtered = delayed * (1.0 - damp) + *filtered * damp;
                line.push(sample + *filtered * comb_feedback);
                wet += delayed;
            }
            wet *= 0.25;

            for line in allpasses.iter_mut() {
                let delayed = line.front();
                let temp = wet + delayed * 0.5;
                line.push(wet);
                wet = delayed - temp * 0.5;
            }
            dry_wet(sample, wet, mix)
        });
    }

    /// Band-pass swept by a sine LFO between `min` and `max` Hz.
    pub fn apply_wah_wah(&mut self, rate: f32, depth: f32, min: f32, max: f32) {
        let rate = rate.clamp(0.5, 10.0);
        let depth = depth.clamp(0.0, 1.0);
        let min = min.clamp(100.0, 1000.0);
        let max = max.clamp(min + 100.0, 5000.0);
        let sample_rate = self.sample_rate();
        let mut filter = StateVariable::default();

        self.for_each_sample(|index, sample| {
            let lfo = (1.0 + fast_sin(rate * index as f32 / sample_rate)) * 0.5;
            let center = min + lfo * depth * (max - min);
            filter.process(sample, center, sample_rate, 5.0)
        });
    }

    /// Band-pass swept by the input's envelope.
    pub fn apply_auto_wah(
        &mut self,
        sensitivity: f32,
        min: f32,
        max: f32,
        attack: f32,
        release: f32,
    ) {
        let sensitivity = sensitivity.clamp(0.1, 10.0);
        let min = min.clamp(50.0, 1000.0);
        let max = max.clamp(min + 100.0, 5000.0);
        let sample_rate = self.sample_rate();
        let attack = time_coefficient(attack.clamp(0.0001, 1.0), sample_rate);
        let release = time_coefficient(release.clamp(0.001, 2.0), sample_rate);
        let mut envelope = 0.0f32;
        let mut filter = StateVariable::default();

        self.for_each_sample(|_, sample| {
            let level = sample.abs();
            let coefficient = if level > envelope { attack } else { release };
            envelope = coefficient * envelope + (1.0 - coefficient) * level;

            let center = min + (envelope * sensitivity).min(1.0) * (max - min);
            filter.process(sample, center, sample_rate, 4.0)
        });
    }

    /// Downward compressor. A makeup gain of 0dB selects automatic makeup.
    pub fn apply_compressor(
        &mut self,
        threshold: f32,
        ratio: f32,
        attack: f32,
        release: f32,
        makeup: f32,
    ) {
        let threshold = threshold.clamp(-60.0, 0.0);
        let ratio = ratio.clamp(1.0, 20.0);
        let sample_rate = self.sample_rate();
        let attack = time_coefficient(attack.clamp(0.0001, 1.0), sample_rate);
        let release = time_coefficient(release.clamp(0.001, 2.0), sample_rate);
        let mut makeup = makeup.clamp(0.0, 30.0);
        if makeup == 0.0 {
            makeup = -threshold * (1.0 - 1.0 / ratio) * 0.5;
        }

        let threshold_linear = 10f32.powf(threshold / 20.0);
        let makeup_linear = 10f32.powf(makeup / 20.0);
        let mut envelope = 0.0f32;

        self.for_each_sample(|_, sample| {
            let level = sample.abs();
            if level > envelope {
                envelope = attack * envelope + (1.0 - attack) * level;
            } else {
                envelope *= release;
            }

            let gain = if envelope > threshold_linear {
                let compressed = threshold_linear * (envelope / threshold_linear).powf(1.0 / ratio);
                compressed / envelope
            } else {
                1.0
            };
            (sample * gain * makeup_linear).clamp(-1.0, 1.0)
        });
    }

    /// Mutes the signal while its envelope stays under `threshold` dB.
    pub fn apply_noise_gate(&mut self, threshold: f32, attack: f32, hold: f32, release: f32) {
        let sample_rate = self.sample_rate();
        let threshold = 10f32.powf(threshold.clamp(-80.0, 0.0) / 20.0);
        let attack = time_coefficient(attack.clamp(0.0001, 0.1), sample_rate);
        let release = time_coefficient(release.clamp(0.001, 2.0), sample_rate);
        let hold = (hold.clamp(0.0, 1.0) * sample_rate) as usize;

        let mut envelope = 0.0f32;
        let mut gain = 0.0f32;
        let mut remaining = 0usize;

        self.for_each_sample(|_, sample| {
            envelope = 0.9 * envelope + 0.1 * sample.abs();
            if envelope > threshold {
                gain = attack * gain + (1.0 - attack);
                remaining = hold;
            } else if remaining > 0 {
                remaining -= 1;
            } else {
                gain *= release;
            }
            sample * gain
        });
    }

    /// Resampled read of the region by `2^(semitones/12)`, blended with the dry signal.
    pub fn apply_pitch_shift(&mut self, semitones: f32, mix: f32) {
        let semitones = semitones.clamp(-12.0, 12.0);
        if semitones.abs() < 0.01 {
            return;
        }

        let mix = mix.clamp(0.0, 1.0);
        let ratio = (semitones / 12.0).exp2();
        let original = self.region_mut().to_vec();

        self.for_each_sample(|index, sample| {
            let wet = read_interpolated(&original, index as f32 * ratio).unwrap_or(0.0);
            dry_wet(sample, wet, mix)
        });
    }
}

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
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::SfxError;
use crate::synth::Synthesizer;

fn hz_440() -> f32 {
    440.0
}

fn hz_880() -> f32 {
    880.0
}

fn half() -> f32 {
    0.5
}

fn one() -> f32 {
    1.0
}

fn tenth() -> f32 {
    0.1
}

fn hundredth() -> f32 {
    0.01
}

fn yes() -> bool {
    true
}

fn burst_amplitude() -> f32 {
    0.8
}

fn sustain_level() -> f32 {
    0.7
}

fn vibrato_rate() -> f32 {
    5.0
}

fn vibrato_depth() -> f32 {
    0.02
}

fn tremolo_rate() -> f32 {
    8.0
}

fn low_pass_cutoff() -> f32 {
    1000.0
}

fn high_pass_cutoff() -> f32 {
    500.0
}

fn wah_rate() -> f32 {
    2.0
}

fn wah_depth() -> f32 {
    0.8
}

fn wah_min() -> f32 {
    400.0
}

fn wah_max() -> f32 {
    2000.0
}

fn auto_wah_sensitivity() -> f32 {
    3.0
}

fn auto_wah_min() -> f32 {
    200.0
}

fn auto_wah_max() -> f32 {
    3000.0
}

fn distortion_gain() -> f32 {
    10.0
}

fn overdrive_drive() -> f32 {
    5.0
}

fn fuzz_intensity() -> f32 {
    10.0
}

fn crush_bits() -> u32 {
    8
}

fn reduce_factor() -> u32 {
    4
}

fn chorus_rate() -> f32 {
    1.5
}

fn chorus_depth() -> f32 {
    10.0
}

fn flanger_depth() -> f32 {
    5.0
}

fn flanger_feedback() -> f32 {
    0.7
}

fn phaser_stages() -> usize {
    4
}

fn delay_time() -> f32 {
    300.0
}

fn delay_feedback() -> f32 {
    0.4
}

fn reverb_mix() -> f32 {
    0.3
}

fn compressor_threshold() -> f32 {
    -20.0
}

fn compressor_ratio() -> f32 {
    4.0
}

fn gate_threshold() -> f32 {
    -40.0
}

fn gate_attack() -> f32 {
    0.001
}

fn gate_hold() -> f32 {
    0.05
}

/// One step of an SFX script, tagged by its `type` field.
///
/// Every parameter is optional in the JSON and falls back to the default named
/// in its `serde` attribute. Times are seconds except `delayTime`, which is
/// milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Instruction {
    WhiteNoise,
    PinkNoise,
    BrownNoise,
    BlueNoise,
    SineWave {
        #[serde(default = "hz_440")]
        frequency: f32,
        #[serde(default = "half")]
        amplitude: f32,
    },
    SquareWave {
        #[serde(default = "hz_440")]
        frequency: f32,
        #[serde(default = "half")]
        amplitude: f32,
    },
    TriangleWave {
        #[serde(default = "hz_440")]
        frequency: f32,
        #[serde(default = "half")]
        amplitude: f32,
    },
    SawtoothWave {
        #[serde(default = "hz_440")]
        frequency: f32,
        #[serde(default = "half")]
        amplitude: f32,
    },
    PitchSweep {
        #[serde(default = "hz_440")]
        start_frequency: f32,
        #[serde(default = "hz_880")]
        end_frequency: f32,
        #[serde(default = "half")]
        amplitude: f32,
    },
    NoiseBurst {
        #[serde(default = "tenth")]
        decay_time: f32,
        #[serde(default = "burst_amplitude")]
        amplitude: f32,
        #[serde(default = "yes")]
        white_noise: bool,
    },
    #[serde(rename = "applyADSR")]
    ApplyAdsr {
        #[serde(default = "hundredth")]
        attack: f32,
        #[serde(default = "tenth")]
        decay: f32,
        #[serde(default = "sustain_level")]
        sustain: f32,
        #[serde(default = "tenth")]
        release: f32,
    },
    ApplyVibrato {
        #[serde(default = "vibrato_rate")]
        rate: f32,
        #[serde(default = "vibrato_depth")]
        depth: f32,
    },
    ApplyTremolo {
        #[serde(default = "tremolo_rate")]
        rate: f32,
        #[serde(default = "half")]
        depth: f32,
    },
    ApplyFadeIn {
        #[serde(default = "tenth")]
        time: f32,
    },
    ApplyFadeOut {
        #[serde(default = "tenth")]
        time: f32,
    },
    ApplyLowPass {
        #[serde(default = "low_pass_cutoff")]
        cutoff: f32,
    },
    ApplyHighPass {
        #[serde(default = "high_pass_cutoff")]
        cutoff: f32,
    },
    ApplyWahWah {
        #[serde(default = "wah_rate")]
        rate: f32,
        #[serde(default = "wah_depth")]
        depth: f32,
        #[serde(default = "wah_min")]
        min_frequency: f32,
        #[serde(default = "wah_max")]
        max_frequency: f32,
    },
    ApplyAutoWah {
        #[serde(default = "auto_wah_sensitivity")]
        sensitivity: f32,
        #[serde(default = "auto_wah_min")]
        min_frequency: f32,
        #[serde(default = "auto_wah_max")]
        max_frequency: f32,
        #[serde(default = "hundredth")]
        attack: f32,
        #[serde(default = "tenth")]
        release: f32,
    },
    ApplyDistortion {
        #[serde(default = "distortion_gain")]
        gain: f32,
        #[serde(default = "one")]
        mix: f32,
        #[serde(default)]
        hard_clip: bool,
    },
    ApplyOverdrive {
        #[serde(default = "overdrive_drive")]
        drive: f32,
        #[serde(default = "half")]
        tone: f32,
    },
    ApplyFuzz {
        #[serde(default = "fuzz_intensity")]
        intensity: f32,
        #[serde(default)]
        octave_up: bool,
    },
    ApplyBitCrush {
        #[serde(default = "crush_bits")]
        bits: u32,
    },
    ApplySampleRateReduce {
        #[serde(default = "reduce_factor")]
        factor: u32,
    },
    ApplyRingModulation {
        #[serde(default = "hz_440")]
        frequency: f32,
    },
    ApplyChorus {
        #[serde(default = "chorus_rate")]
        rate: f32,
        #[serde(default = "chorus_depth")]
        depth: f32,
        #[serde(default = "half")]
        mix: f32,
    },
    ApplyFlanger {
        #[serde(default = "half")]
        rate: f32,
        #[serde(default = "flanger_depth")]
        depth: f32,
        #[serde(default = "flanger_feedback")]
        feedback: f32,
        #[serde(default = "half")]
        mix: f32,
    },
    ApplyPhaser {
        #[serde(default = "half")]
        rate: f32,
        #[serde(default = "sustain_level")]
        depth: f32,
        #[serde(default = "phaser_stages")]
        stages: usize,
        #[serde(default = "half")]
        feedback: f32,
        #[serde(default = "half")]
        mix: f32,
    },
    ApplyDelay {
        #[serde(default = "delay_time")]
        delay_time: f32,
        #[serde(default = "delay_feedback")]
        feedback: f32,
        #[serde(default = "half")]
        mix: f32,
    },
    ApplyReverb {
        #[serde(default = "half")]
        room_size: f32,
        #[serde(default = "half")]
        damping: f32,
        #[serde(default = "reverb_mix")]
        mix: f32,
    },
    ApplyCompressor {
        #[serde(default = "compressor_threshold")]
        threshold: f32,
        #[serde(default = "compressor_ratio")]
        ratio: f32,
        #[serde(default = "hundredth")]
        attack: f32,
        #[serde(default = "tenth")]
        release: f32,
        #[serde(default)]
        makeup_gain: f32,
    },
    ApplyNoiseGate {
        #[serde(default = "gate_threshold")]
        threshold: f32,
        #[serde(default = "gate_attack")]
        attack: f32,
        #[serde(default = "gate_hold")]
        hold: f32,
        #[serde(default = "tenth")]
        release: f32,
    },
    ApplyPitchShift {
        #[serde(default)]
        semitones: f32,
        #[serde(default = "one")]
        mix: f32,
    },
    Normalize,
    Reverse,
    #[serde(other)]
    Unknown,
}

impl Instruction {
    /// Decodes one instruction object.
    ///
    /// Keys the instruction does not use are reported and ignored. A missing or
    /// unrecognized `type` is an error.
    pub fn from_value(value: &Value) -> Result<Instruction, SfxError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(SfxError::MissingType)?;

        let instruction = Instruction::deserialize(value).map_err(|source| {
            SfxError::InvalidInstruction {
                kind: kind.to_string(),
                source,
            }
        })?;
        if instruction == Instruction::Unknown {
            return Err(SfxError::UnknownInstruction(kind.to_string()));
        }

        if let (Some(given), Ok(Value::Object(known))) =
            (value.as_object(), serde_json::to_value(&instruction))
        {
            for key in given.keys().filter(|key| !known.contains_key(*key)) {
                warn!(instruction = kind, field = %key, "Ignoring unknown field");
            }
        }

        Ok(instruction)
    }

    /// The `type` name as it appears in a script.
    pub fn name(&self) -> String {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        }
    }

    /// Runs the instruction over the synthesizer's current region.
    pub fn execute(&self, synth: &mut Synthesizer<'_>) {
        match *self {
            Instruction::WhiteNoise => synth.white_noise(),
            Instruction::PinkNoise => synth.pink_noise(),
            Instruction::BrownNoise => synth.brown_noise(),
            Instruction::BlueNoise => synth.blue_noise(),
            Instruction::SineWave {
                frequency,
                amplitude,
            } => synth.sine_wave(frequency, amplitude),
            Instruction::SquareWave {
                frequency,
                amplitude,
            } => synth.square_wave(frequency, amplitude),
            Instruction::TriangleWave {
                frequency,
                amplitude,
            } => synth.triangle_wave(frequency, amplitude),
            Instruction::SawtoothWave {
                frequency,
                amplitude,
            } => synth.sawtooth_wave(frequency, amplitude),
            Instruction::PitchSweep {
                start_frequency,
                end_frequency,
                amplitude,
            } => synth.pitch_sweep(start_frequency, end_frequency, amplitude),
            Instruction::NoiseBurst {
                decay_time,
                amplitude,
                white_noise,
            } => synth.noise_burst(decay_time, amplitude, white_noise),
            Instruction::ApplyAdsr {
                attack,
                decay,
                sustain,
                release,
            } => synth.apply_adsr(attack, decay, sustain, release),
            Instruction::ApplyVibrato { rate, depth } => synth.apply_vibrato(rate, depth),
            Instruction::ApplyTremolo { rate, depth } => synth.apply_tremolo(rate, depth),
            Instruction::ApplyFadeIn { time } => synth.apply_fade_in(time),
            Instruction::ApplyFadeOut { time } => synth.apply_fade_out(time),
            Instruction::ApplyLowPass { cutoff } => synth.apply_low_pass(cutoff),
            Instruction::ApplyHighPass { cutoff } => synth.apply_high_pass(cutoff),
            Instruction::ApplyWahWah {
                rate,
                depth,
                min_frequency,
                max_frequency,
            } => synth.apply_wah_wah(rate, depth, min_frequency, max_frequency),
            Instruction::ApplyAutoWah {
                sensitivity,
                min_frequency,
                max_frequency,
                attack,
                release,
            } => synth.apply_auto_wah(sensitivity, min_frequency, max_frequency, attack, release),
            Instruction::ApplyDistortion {
                gain,
                mix,
                hard_clip,
            } => synth.apply_distortion(gain, mix, hard_clip),
            Instruction::ApplyOverdrive { drive, tone } => synth.apply_overdrive(drive, tone),
            Instruction::ApplyFuzz {
                intensity,
                octave_up,
            } => synth.apply_fuzz(intensity, octave_up),
            Instruction::ApplyBitCrush { bits } => synth.apply_bit_crush(bits),
            Instruction::ApplySampleRateReduce { factor } => synth.apply_sample_rate_reduce(factor),
            Instruction::ApplyRingModulation { frequency } => {
                synth.apply_ring_modulation(frequency)
            }
            Instruction::ApplyChorus { rate, depth, mix } => synth.apply_chorus(rate, depth, mix),
            Instruction::ApplyFlanger {
                rate,
                depth,
                feedback,
                mix,
            } => synth.apply_flanger(rate, depth, feedback, mix),
            Instruction::ApplyPhaser {
                rate,
                depth,
                stages,
                feedback,
                mix,
            } => synth.apply_phaser(rate, depth, stages, feedback, mix),
            Instruction::ApplyDelay {
                delay_time,
                feedback,
                mix,
            } => synth.apply_delay(delay_time, feedback, mix),
            Instruction::ApplyReverb {
                room_size,
                damping,
                mix,
            } => synth.apply_reverb(room_size, damping, mix),
            Instruction::ApplyCompressor {
                threshold,
                ratio,
                attack,
                release,
                makeup_gain,
            } => synth.apply_compressor(threshold, ratio, attack, release, makeup_gain),
            Instruction::ApplyNoiseGate {
                threshold,
                attack,
                hold,
                release,
            } => synth.apply_noise_gate(threshold, attack, hold, release),
            Instruction::ApplyPitchShift { semitones, mix } => {
                synth.apply_pitch_shift(semitones, mix)
            }
            Instruction::Normalize => synth.normalize(),
            Instruction::Reverse => synth.reverse(),
            Instruction::Unknown => {}
        }
    }
}

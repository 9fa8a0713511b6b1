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
use std::sync::OnceLock;

/// Number of entries in the sine lookup table.
pub const SIN_TABLE_SIZE: usize = 4096;

static SIN_TABLE: OnceLock<[f32; SIN_TABLE_SIZE]> = OnceLock::new();

fn sin_table() -> &'static [f32; SIN_TABLE_SIZE] {
    SIN_TABLE.get_or_init(|| {
        let mut table = [0.0f32; SIN_TABLE_SIZE];
        for (i, entry) in table.iter_mut().enumerate() {
            let angle = (i as f64 / SIN_TABLE_SIZE as f64) * std::f64::consts::TAU;
            *entry = angle.sin() as f32;
        }
        table
    })
}

/// Table-driven sine where `phase` is measured in cycles (1.0 is one full turn).
pub fn fast_sin(phase: f32) -> f32 {
    let table = sin_table();
    let phase = phase - phase.floor();
    let position = phase * SIN_TABLE_SIZE as f32;
    let index0 = (position as usize) & (SIN_TABLE_SIZE - 1);
    let index1 = (index0 + 1) & (SIN_TABLE_SIZE - 1);
    let frac = position - position.floor();

    table[index0] + frac * (table[index1] - table[index0])
}

/// Table-driven sine of an angle in radians.
pub fn fast_sin_radians(radians: f32) -> f32 {
    fast_sin(radians / (2.0 * PI))
}

/// A partial of an additive voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Harmonic {
    pub multiplier: f32,
    pub amplitude: f32,
}

/// A partial whose amplitude is already divided by the table's total amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedHarmonic {
    pub multiplier: f32,
    pub amplitude: f32,
}

const fn h(multiplier: f32, amplitude: f32) -> Harmonic {
    Harmonic {
        multiplier,
        amplitude,
    }
}

const PIANO: &[Harmonic] = &[
    h(1.0, 1.00),
    h(2.0, 0.50),
    h(3.0, 0.33),
    h(4.0, 0.25),
    h(5.0, 0.15),
    h(6.0, 0.10),
    h(7.0, 0.07),
    h(8.0, 0.05),
];

const CHROMATIC: &[Harmonic] = &[
    h(1.0, 1.00),
    h(2.0, 0.60),
    h(3.0, 0.40),
    h(4.0, 0.80),
    h(5.0, 0.20),
    h(6.0, 0.30),
];

const ORGAN: &[Harmonic] = &[
    h(0.5, 0.80),
    h(1.0, 1.00),
    h(1.5, 0.70),
    h(2.0, 0.90),
    h(3.0, 0.60),
    h(4.0, 0.70),
    h(5.0, 0.40),
    h(6.0, 0.50),
    h(8.0, 0.30),
];

const GUITAR: &[Harmonic] = &[
    h(1.0, 1.00),
    h(2.0, 0.70),
    h(3.0, 0.45),
    h(4.0, 0.35),
    h(5.0, 0.25),
    h(6.0, 0.18),
    h(7.0, 0.12),
    h(8.0, 0.08),
    h(9.0, 0.05),
    h(10.0, 0.03),
];

const BASS: &[Harmonic] = &[
    h(1.0, 1.00),
    h(2.0, 0.55),
    h(3.0, 0.30),
    h(4.0, 0.15),
    h(5.0, 0.08),
    h(6.0, 0.04),
];

// Slightly inharmonic partials give bowed strings their shimmer.
const STRINGS: &[Harmonic] = &[
    h(1.000, 1.00),
    h(2.003, 0.50),
    h(2.997, 0.33),
    h(4.002, 0.25),
    h(4.998, 0.20),
    h(6.001, 0.17),
    h(6.999, 0.14),
    h(8.003, 0.12),
    h(8.997, 0.11),
    h(10.002, 0.10),
    h(10.998, 0.09),
    h(12.001, 0.08),
];

const BRASS: &[Harmonic] = &[
    h(1.0, 1.00),
    h(2.0, 0.85),
    h(3.0, 0.70),
    h(4.0, 0.55),
    h(5.0, 0.45),
    h(6.0, 0.35),
    h(7.0, 0.28),
    h(8.0, 0.22),
    h(9.0, 0.18),
    h(10.0, 0.15),
];

// Odd harmonics only, like a closed pipe.
const REED: &[Harmonic] = &[
    h(1.0, 1.00),
    h(3.0, 0.75),
    h(5.0, 0.50),
    h(7.0, 0.35),
    h(9.0, 0.25),
    h(11.0, 0.18),
    h(13.0, 0.12),
    h(15.0, 0.08),
];

const PIPE: &[Harmonic] = &[h(1.0, 1.00), h(2.0, 0.15), h(3.0, 0.08), h(4.0, 0.03)];

const SYNTH_LEAD: &[Harmonic] = &[
    h(1.0, 1.00),
    h(2.0, 0.50),
    h(3.0, 0.33),
    h(4.0, 0.25),
    h(5.0, 0.20),
    h(6.0, 0.17),
    h(7.0, 0.14),
    h(8.0, 0.12),
    h(9.0, 0.11),
    h(10.0, 0.10),
    h(11.0, 0.09),
    h(12.0, 0.08),
];

const SYNTH_PAD: &[Harmonic] = &[
    h(1.000, 1.00),
    h(1.005, 0.80),
    h(2.000, 0.40),
    h(2.007, 0.35),
    h(3.000, 0.20),
    h(4.000, 0.10),
];

const SYNTH_FX: &[Harmonic] = &[
    h(1.0, 1.00),
    h(1.414, 0.70),
    h(2.0, 0.50),
    h(2.828, 0.40),
    h(3.5, 0.30),
    h(5.0, 0.20),
];

const ETHNIC: &[Harmonic] = &[
    h(1.0, 1.00),
    h(2.0, 0.60),
    h(3.0, 0.45),
    h(4.0, 0.35),
    h(5.0, 0.50),
    h(6.0, 0.25),
    h(7.0, 0.40),
    h(8.0, 0.15),
];

/// General MIDI instrument families, eight programs each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentFamily {
    Piano,
    Chromatic,
    Organ,
    Guitar,
    Bass,
    Strings,
    Ensemble,
    Brass,
    Reed,
    Pipe,
    SynthLead,
    SynthPad,
    SynthFx,
    Ethnic,
    Percussive,
    SoundFx,
}

impl InstrumentFamily {
    const ALL: [InstrumentFamily; 16] = [
        InstrumentFamily::Piano,
        InstrumentFamily::Chromatic,
        InstrumentFamily::Organ,
        InstrumentFamily::Guitar,
        InstrumentFamily::Bass,
        InstrumentFamily::Strings,
        InstrumentFamily::Ensemble,
        InstrumentFamily::Brass,
        InstrumentFamily::Reed,
        InstrumentFamily::Pipe,
        InstrumentFamily::SynthLead,
        InstrumentFamily::SynthPad,
        InstrumentFamily::SynthFx,
        InstrumentFamily::Ethnic,
        InstrumentFamily::Percussive,
        InstrumentFamily::SoundFx,
    ];

    /// The family a GM program number (0-127) belongs to.
    pub fn from_program(program: u8) -> Self {
        Self::ALL[usize::from(program.min(127) / 8)]
    }

    /// The raw partial table. Percussive and sound effect families are pure sines.
    pub fn harmonics(self) -> &'static [Harmonic] {
        match self {
            InstrumentFamily::Piano => PIANO,
            InstrumentFamily::Chromatic => CHROMATIC,
            InstrumentFamily::Organ => ORGAN,
            InstrumentFamily::Guitar => GUITAR,
            InstrumentFamily::Bass => BASS,
            InstrumentFamily::Strings | InstrumentFamily::Ensemble => STRINGS,
            InstrumentFamily::Brass => BRASS,
            InstrumentFamily::Reed => REED,
            InstrumentFamily::Pipe => PIPE,
            InstrumentFamily::SynthLead => SYNTH_LEAD,
            InstrumentFamily::SynthPad => SYNTH_PAD,
            InstrumentFamily::SynthFx => SYNTH_FX,
            InstrumentFamily::Ethnic => ETHNIC,
            InstrumentFamily::Percussive | InstrumentFamily::SoundFx => &[],
        }
    }

    /// The partial table with amplitudes summing to one.
    pub fn normalized_harmonics(self) -> &'static [NormalizedHarmonic] {
        static NORMALIZED: OnceLock<Vec<Vec<NormalizedHarmonic>>> = OnceLock::new();
        let tables = NORMALIZED.get_or_init(|| {
            InstrumentFamily::ALL
                .iter()
                .map(|family| {
                    let harmonics = family.harmonics();
                    let total: f32 = harmonics.iter().map(|h| h.amplitude).sum();
                    harmonics
                        .iter()
                        .map(|h| NormalizedHarmonic {
                            multiplier: h.multiplier,
                            amplitude: h.amplitude / total,
                        })
                        .collect()
                })
                .collect()
        });
        &tables[self as usize]
    }

    /// One sample of this family's waveform at `phase` cycles, in `[-1, 1]`.
    pub fn waveform_sample(self, phase: f32) -> f32 {
        let harmonics = self.normalized_harmonics();
        if harmonics.is_empty() {
            return fast_sin(phase);
        }

        harmonics
            .iter()
            .map(|h| h.amplitude * fast_sin(phase * h.multiplier))
            .sum()
    }
}

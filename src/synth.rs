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
//! Region-scoped sample generation and effects.
//!
//! A [`Synthesizer`] borrows a mono float wave and writes into a sub-range of it
//! (the region). Generators overwrite the region, modifiers transform it in place.
//! Filter and delay state is local to a single call, so running an effect twice
//! over the same region applies it twice from a cold start.

use std::ops::Range;

use crate::wave::{Channels, Wave};

mod effects;
mod generators;
pub mod ring;
pub mod tables;
pub mod voice;

pub use ring::RingBuffer;
pub use tables::{fast_sin, fast_sin_radians, Harmonic, InstrumentFamily, NormalizedHarmonic};
pub use voice::{EnvelopeShape, FilterState};

/// Errors raised when binding a synthesizer to a wave.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("Synthesizer requires a mono wave, got {0}")]
    NotMono(Channels),
}

/// Per-sample generator and effect library operating on one mono wave.
pub struct Synthesizer<'a> {
    wave: &'a mut Wave<f32>,
    region_offset: usize,
    region_length: usize,
}

impl<'a> Synthesizer<'a> {
    /// Binds a synthesizer to a mono wave. The region starts as the whole wave.
    pub fn new(wave: &'a mut Wave<f32>) -> Result<Self, SynthError> {
        if wave.channels() != Channels::Mono {
            return Err(SynthError::NotMono(wave.channels()));
        }

        Ok(Synthesizer {
            wave,
            region_offset: 0,
            region_length: 0,
        })
    }

    /// Restricts subsequent operations to `length` samples starting at `offset`.
    /// A length of zero extends the region to the end of the wave.
    pub fn set_region(&mut self, offset: usize, length: usize) {
        self.region_offset = offset;
        self.region_length = length;
    }

    /// Makes the whole wave the working region again.
    pub fn reset_region(&mut self) {
        self.region_offset = 0;
        self.region_length = 0;
    }

    pub fn region_offset(&self) -> usize {
        self.region_offset
    }

    pub fn region_length(&self) -> usize {
        self.region_length
    }

    /// The wave's sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.wave.sample_rate().as_f32()
    }

    /// The effective sample range, clamped to the wave.
    fn range(&self) -> Range<usize> {
        let total = self.wave.frame_count();
        let start = self.region_offset.min(total);
        let end = if self.region_length == 0 {
            total
        } else {
            self.region_offset.saturating_add(self.region_length).min(total)
        };
        start..end.max(start)
    }

    /// The samples of the current region.
    fn region_mut(&mut self) -> &mut [f32] {
        let range = self.range();
        &mut self.wave.data_mut()[range]
    }

    /// Mixes another wave into the region, sample-aligned with the start of the wave.
    pub fn mix(&mut self, other: &Wave<f32>, level: f32) {
        let range = self.range();
        let this_level = 1.0 - level * 0.5;
        let other_level = level * 0.5;
        let other = other.data();

        for index in range {
            let Some(&incoming) = other.get(index) else {
                break;
            };
            let sample = &mut self.wave.data_mut()[index];
            *sample = (this_level * *sample + other_level * incoming).clamp(-1.0, 1.0);
        }
    }

    /// Plays the region backwards.
    pub fn reverse(&mut self) {
        self.region_mut().reverse();
    }

    /// Scales the region so its peak reaches full scale.
    pub fn normalize(&mut self) {
        let region = self.region_mut();
        let peak = region.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
        if peak < 0.0001 {
            return;
        }

        let scale = 1.0 / peak;
        region.iter_mut().for_each(|s| *s *= scale);
    }
}

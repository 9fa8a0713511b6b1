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
//! Whole-buffer transforms on a float working copy of a wave.
//!
//! Structural operations (trim, crop, pad, concat, split) cut and splice frames,
//! channel operations reshape the interleaving, and quality operations resample,
//! normalize or simulate a lower bit depth. Every fallible operation leaves the
//! buffer untouched when it fails.

use rand::Rng;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use crate::wave::{Channels, Sample, SampleRate, Wave};

mod error;

pub use error::ProcessorError;

/// Level reported for silent buffers, in dBFS.
pub const SILENCE_DB: f32 = -200.0;

/// Amplitudes below this are treated as silence.
const SILENCE_FLOOR: f32 = 1e-10;

/// Input block size for the sinc resampler.
const INPUT_BLOCK_SIZE: usize = 1024;

fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

fn linear_to_db(level: f32) -> f32 {
    if level < SILENCE_FLOOR {
        SILENCE_DB
    } else {
        20.0 * level.log10()
    }
}

/// A float wave under transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct Processor {
    wave: Wave<f32>,
}

impl Processor {
    pub fn new(wave: Wave<f32>) -> Processor {
        Processor { wave }
    }

    /// Copies any wave into a float working buffer.
    pub fn from_wave<S: Sample>(wave: &Wave<S>) -> Processor {
        Processor {
            wave: wave.convert(),
        }
    }

    /// Converts the working buffer to the requested sample type.
    pub fn to_wave<S: Sample>(&self) -> Wave<S> {
        self.wave.convert()
    }

    pub fn into_wave(self) -> Wave<f32> {
        self.wave
    }

    pub fn wave(&self) -> &Wave<f32> {
        &self.wave
    }

    pub fn channels(&self) -> Channels {
        self.wave.channels()
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.wave.sample_rate()
    }

    pub fn frame_count(&self) -> usize {
        self.wave.frame_count()
    }

    fn replace(
        &mut self,
        data: Vec<f32>,
        channels: Channels,
        sample_rate: SampleRate,
    ) -> Result<(), ProcessorError> {
        self.wave.replace(data, channels, sample_rate)?;
        Ok(())
    }

    /// Whether every channel of `frame` is at or below `threshold`.
    fn frame_is_silent(&self, frame: usize, threshold: f32) -> bool {
        let count = self.channels().count();
        self.wave.data()[frame * count..(frame + 1) * count]
            .iter()
            .all(|s| s.abs() <= threshold)
    }

    /// Averages all channels into one.
    pub fn mix_down(&mut self) -> Result<(), ProcessorError> {
        let count = self.channels().count();
        if count == 1 {
            return Ok(());
        }

        let mixed = self
            .wave
            .data()
            .chunks_exact(count)
            .map(|frame| frame.iter().sum::<f32>() / count as f32)
            .collect();
        self.replace(mixed, Channels::Mono, self.sample_rate())
    }

    /// Resamples to `target` with a windowed sinc interpolator. The output has
    /// `ceil(frames * ratio)` frames.
    pub fn resample(&mut self, target: SampleRate) -> Result<(), ProcessorError> {
        let source = self.sample_rate();
        if source == target {
            debug!(rate = %target, "Sample rate already matches, skipping resample");
            return Ok(());
        }

        let failed = |_e| ProcessorError::ResamplingFailed(source.hz(), target.hz());
        let ratio = f64::from(target.hz()) / f64::from(source.hz());
        let count = self.channels().count();
        let frames = self.frame_count();
        let expected = (frames as f64 * ratio).ceil() as usize;

        let sinc_params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            oversampling_factor: 256,
            interpolation: SincInterpolationType::Cubic,
            window: WindowFunction::BlackmanHarris2,
        };
        let mut resampler =
            SincFixedIn::<f32>::new(ratio, 1.0, sinc_params, INPUT_BLOCK_SIZE, count)
                .map_err(|_e| ProcessorError::ResamplingFailed(source.hz(), target.hz()))?;

        let planar: Vec<Vec<f32>> = (0..count)
            .map(|channel| {
                self.wave
                    .data()
                    .iter()
                    .skip(channel)
                    .step_by(count)
                    .copied()
                    .collect()
            })
            .collect();

        let delay = resampler.output_delay();
        let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); count];
        let mut scratch = resampler.output_buffer_allocate(true);
        let append = |output: &mut Vec<Vec<f32>>, scratch: &[Vec<f32>], produced: usize| {
            for (channel, samples) in output.iter_mut().zip(scratch) {
                channel.extend_from_slice(&samples[..produced]);
            }
        };

        let mut position = 0;
        loop {
            let needed = resampler.input_frames_next();
            if frames - position < needed {
                break;
            }
            let block: Vec<&[f32]> = planar
                .iter()
                .map(|channel| &channel[position..position + needed])
                .collect();
            let (used, produced) = resampler
                .process_into_buffer(&block, &mut scratch, None)
                .map_err(failed)?;
            position += used;
            append(&mut output, &scratch, produced);
        }

        if position < frames {
            let block: Vec<&[f32]> = planar.iter().map(|channel| &channel[position..]).collect();
            let (_, produced) = resampler
                .process_partial_into_buffer(Some(block.as_slice()), &mut scratch, None)
                .map_err(failed)?;
            append(&mut output, &scratch, produced);
        }

        // Flush the filter until the delayed tail has come out.
        while output[0].len() < expected + delay {
            let (_, produced) = resampler
                .process_partial_into_buffer(None::<&[Vec<f32>]>, &mut scratch, None)
                .map_err(failed)?;
            if produced == 0 {
                break;
            }
            append(&mut output, &scratch, produced);
        }

        let length = output[0].len().saturating_sub(delay).min(expected);
        let mut data = Vec::with_capacity(length * count);
        for frame in 0..length {
            for channel in &output {
                data.push(channel[delay + frame]);
            }
        }

        debug!(from = %source, to = %target, frames, resampled = length, "Resampled");
        self.replace(data, self.channels(), target)
    }

    /// Removes leading and trailing frames whose every channel is at or below
    /// `threshold_db`. A buffer that is silent throughout is left as is.
    pub fn trim(&mut self, threshold_db: f32) -> Result<(), ProcessorError> {
        let threshold = db_to_linear(threshold_db);
        let frames = self.frame_count();

        let Some(start) = (0..frames).find(|frame| !self.frame_is_silent(*frame, threshold)) else {
            return Ok(());
        };
        let end = (start..frames)
            .rev()
            .find(|frame| !self.frame_is_silent(*frame, threshold))
            .map_or(frames, |frame| frame + 1);

        if start == 0 && end == frames {
            return Ok(());
        }
        self.crop(start, end)
    }

    /// Keeps frames `start..end`. An `end` of zero or past the buffer means the end.
    pub fn crop(&mut self, start: usize, end: usize) -> Result<(), ProcessorError> {
        let frames = self.frame_count();
        let end = if end == 0 || end > frames { frames } else { end };
        if start >= end {
            return Err(ProcessorError::InvalidRange { start, end });
        }

        let count = self.channels().count();
        let data = self.wave.data()[start * count..end * count].to_vec();
        self.replace(data, self.channels(), self.sample_rate())
    }

    /// Adds silent frames before and after.
    pub fn pad(&mut self, before: usize, after: usize) -> Result<(), ProcessorError> {
        if before == 0 && after == 0 {
            return Ok(());
        }

        let count = self.channels().count();
        let mut data = vec![0.0; (before + self.frame_count() + after) * count];
        let start = before * count;
        data[start..start + self.wave.data().len()].copy_from_slice(self.wave.data());
        self.replace(data, self.channels(), self.sample_rate())
    }

    /// Appends another wave of the same layout and rate.
    pub fn concat(&mut self, other: &Wave<f32>) -> Result<(), ProcessorError> {
        if other.channels() != self.channels() || other.sample_rate() != self.sample_rate() {
            return Err(ProcessorError::FormatMismatch {
                expected_channels: self.channels(),
                expected_rate: self.sample_rate(),
                channels: other.channels(),
                rate: other.sample_rate(),
            });
        }

        let mut data = Vec::with_capacity(self.wave.data().len() + other.data().len());
        data.extend_from_slice(self.wave.data());
        data.extend_from_slice(other.data());
        self.replace(data, self.channels(), self.sample_rate())
    }

    /// Cuts the buffer at frame `position`, keeping the first part and
    /// returning the second. Both parts must be non-empty.
    pub fn split(&mut self, position: usize) -> Result<Processor, ProcessorError> {
        let frames = self.frame_count();
        if position == 0 || position >= frames {
            return Err(ProcessorError::SplitOutOfRange { position, frames });
        }

        let index = position * self.channels().count();
        let second = Wave::from_samples(
            self.wave.data()[index..].to_vec(),
            self.channels(),
            self.sample_rate(),
        )?;
        let first = self.wave.data()[..index].to_vec();
        self.replace(first, self.channels(), self.sample_rate())?;
        Ok(Processor::new(second))
    }

    /// Duplicates a mono buffer into both stereo channels.
    pub fn to_stereo(&mut self) -> Result<(), ProcessorError> {
        if self.channels() != Channels::Mono {
            return Err(ProcessorError::WrongChannels {
                expected: Channels::Mono,
                found: self.channels(),
            });
        }

        let data = self.wave.data().iter().flat_map(|s| [*s, *s]).collect();
        self.replace(data, Channels::Stereo, self.sample_rate())
    }

    /// Keeps only one channel, producing a mono buffer.
    pub fn extract_channel(&mut self, channel: usize) -> Result<(), ProcessorError> {
        let count = self.channels().count();
        if channel >= count {
            return Err(ProcessorError::ChannelOutOfRange {
                channel,
                channels: self.channels(),
            });
        }

        let data = self.wave.data().iter().skip(channel).step_by(count).copied().collect();
        self.replace(data, Channels::Mono, self.sample_rate())
    }

    /// Exchanges left and right.
    pub fn swap_channels(&mut self) -> Result<(), ProcessorError> {
        if self.channels() != Channels::Stereo {
            return Err(ProcessorError::WrongChannels {
                expected: Channels::Stereo,
                found: self.channels(),
            });
        }

        self.wave
            .data_mut()
            .chunks_exact_mut(2)
            .for_each(|frame| frame.swap(0, 1));
        Ok(())
    }

    /// Peak absolute sample in dBFS.
    pub fn peak_level(&self) -> f32 {
        let peak = self.wave.data().iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
        linear_to_db(peak)
    }

    /// RMS over every sample in dBFS.
    pub fn rms_level(&self) -> f32 {
        let data = self.wave.data();
        let sum: f32 = data.iter().map(|s| s * s).sum();
        linear_to_db((sum / data.len() as f32).sqrt())
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        self.wave.seconds()
    }

    /// Frame ranges `(start, end)` where every channel stays at or below
    /// `threshold_db` for at least `min_duration_ms`.
    pub fn detect_silence(&self, threshold_db: f32, min_duration_ms: f32) -> Vec<(usize, usize)> {
        let threshold = db_to_linear(threshold_db);
        let min_frames = (min_duration_ms * self.sample_rate().as_f32() / 1000.0) as usize;
        let frames = self.frame_count();

        let mut zones = Vec::new();
        let mut silence_start = None;
        for frame in 0..frames {
            let silent = self.frame_is_silent(frame, threshold);
            match (silent, silence_start) {
                (true, None) => silence_start = Some(frame),
                (false, Some(start)) => {
                    if frame - start >= min_frames {
                        zones.push((start, frame));
                    }
                    silence_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = silence_start {
            if frames - start >= min_frames {
                zones.push((start, frames));
            }
        }

        zones
    }

    /// Scales the buffer so its peak sits at `target_db`. Silence is left alone.
    pub fn normalize(&mut self, target_db: f32) {
        let peak = self.wave.data().iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
        if peak < SILENCE_FLOOR {
            return;
        }

        let gain = db_to_linear(target_db) / peak;
        self.wave.data_mut().iter_mut().for_each(|s| *s *= gain);
    }

    /// Quantizes to `bits` (8, 16, 24 or 32) while staying in float, with
    /// optional triangular dither of one step.
    pub fn convert_bit_depth(&mut self, bits: u32, dither: bool) -> Result<(), ProcessorError> {
        if !matches!(bits, 8 | 16 | 24 | 32) {
            return Err(ProcessorError::UnsupportedBitDepth(bits));
        }

        let levels = (1u64 << (bits - 1)) as f32;
        let step = 1.0 / levels;
        let mut rng = rand::thread_rng();

        for sample in self.wave.data_mut() {
            if dither {
                *sample += rng.gen_range(-step..step) + rng.gen_range(-step..step);
            }
            *sample = ((*sample * levels).round() / levels).clamp(-1.0, 1.0);
        }
        Ok(())
    }
}

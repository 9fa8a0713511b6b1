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
//! Interleaved PCM sample buffers.
//!
//! A [`Wave`] is the sink every renderer in this crate writes into. It carries no
//! behavior beyond storage, initialization and sample format conversion.

use std::{fmt, str::FromStr};

use serde::Deserialize;

mod sample;

pub use sample::Sample;

/// Errors raised while creating or reshaping a wave.
#[derive(Debug, thiserror::Error)]
pub enum WaveError {
    #[error("Cannot initialize a wave with zero samples")]
    Empty,

    #[error("Unsupported sample rate: {0}Hz")]
    UnsupportedSampleRate(u32),

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u32),

    #[error("Sample buffer of length {len} is not a multiple of {channels} channels")]
    Misaligned { len: usize, channels: usize },
}

/// The sample rates a wave can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u32")]
pub enum SampleRate {
    Pcm8000Hz,
    Pcm11025Hz,
    Pcm16000Hz,
    Pcm22050Hz,
    Pcm32000Hz,
    Pcm44100Hz,
    Pcm48000Hz,
    Pcm96000Hz,
}

impl SampleRate {
    /// The rate in Hz.
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Pcm8000Hz => 8000,
            SampleRate::Pcm11025Hz => 11025,
            SampleRate::Pcm16000Hz => 16000,
            SampleRate::Pcm22050Hz => 22050,
            SampleRate::Pcm32000Hz => 32000,
            SampleRate::Pcm44100Hz => 44100,
            SampleRate::Pcm48000Hz => 48000,
            SampleRate::Pcm96000Hz => 96000,
        }
    }

    /// The rate in Hz as a float, for per-sample math.
    pub fn as_f32(self) -> f32 {
        self.hz() as f32
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = WaveError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        match hz {
            8000 => Ok(SampleRate::Pcm8000Hz),
            11025 => Ok(SampleRate::Pcm11025Hz),
            16000 => Ok(SampleRate::Pcm16000Hz),
            22050 => Ok(SampleRate::Pcm22050Hz),
            32000 => Ok(SampleRate::Pcm32000Hz),
            44100 => Ok(SampleRate::Pcm44100Hz),
            48000 => Ok(SampleRate::Pcm48000Hz),
            96000 => Ok(SampleRate::Pcm96000Hz),
            _ => Err(WaveError::UnsupportedSampleRate(hz)),
        }
    }
}

impl FromStr for SampleRate {
    type Err = WaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hz = s
            .trim()
            .trim_end_matches("Hz")
            .parse::<u32>()
            .map_err(|_| WaveError::UnsupportedSampleRate(0))?;
        SampleRate::try_from(hz)
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.hz())
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        SampleRate::Pcm48000Hz
    }
}

/// Channel layouts a wave can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    /// Number of interleaved channels.
    pub fn count(self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}

impl TryFrom<u32> for Channels {
    type Error = WaveError;

    fn try_from(count: u32) -> Result<Self, Self::Error> {
        match count {
            1 => Ok(Channels::Mono),
            2 => Ok(Channels::Stereo),
            _ => Err(WaveError::UnsupportedChannels(count)),
        }
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channels::Mono => write!(f, "mono"),
            Channels::Stereo => write!(f, "stereo"),
        }
    }
}

/// A flat, interleaved buffer of samples tagged with its channel layout and rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave<S> {
    data: Vec<S>,
    channels: Channels,
    sample_rate: SampleRate,
}

impl<S: Sample> Wave<S> {
    /// Creates a silent wave holding `frames` samples per channel.
    pub fn new(
        frames: usize,
        channels: Channels,
        sample_rate: SampleRate,
    ) -> Result<Self, WaveError> {
        if frames == 0 {
            return Err(WaveError::Empty);
        }

        Ok(Wave {
            data: vec![S::default(); frames * channels.count()],
            channels,
            sample_rate,
        })
    }

    /// Wraps an existing interleaved buffer.
    pub fn from_samples(
        data: Vec<S>,
        channels: Channels,
        sample_rate: SampleRate,
    ) -> Result<Self, WaveError> {
        if data.is_empty() {
            return Err(WaveError::Empty);
        }
        if data.len() % channels.count() != 0 {
            return Err(WaveError::Misaligned {
                len: data.len(),
                channels: channels.count(),
            });
        }

        Ok(Wave {
            data,
            channels,
            sample_rate,
        })
    }

    /// Reallocates the wave in place. On failure the wave is left untouched.
    pub fn initialize(
        &mut self,
        frames: usize,
        channels: Channels,
        sample_rate: SampleRate,
    ) -> Result<(), WaveError> {
        *self = Wave::new(frames, channels, sample_rate)?;
        Ok(())
    }

    pub fn data(&self) -> &[S] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [S] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<S> {
        self.data
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Number of samples per channel.
    pub fn frame_count(&self) -> usize {
        self.data.len() / self.channels.count()
    }

    /// Duration of the wave in seconds.
    pub fn seconds(&self) -> f32 {
        self.frame_count() as f32 / self.sample_rate.as_f32()
    }

    /// Duration of the wave in milliseconds.
    pub fn milliseconds(&self) -> f32 {
        self.frame_count() as f32 * 1000.0 / self.sample_rate.as_f32()
    }

    /// Converts every sample to another sample type.
    pub fn convert<T: Sample>(&self) -> Wave<T> {
        Wave {
            data: self.data.iter().map(|s| s.convert::<T>()).collect(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Replaces the contents while keeping the invariants intact.
    pub(crate) fn replace(
        &mut self,
        data: Vec<S>,
        channels: Channels,
        sample_rate: SampleRate,
    ) -> Result<(), WaveError> {
        *self = Wave::from_samples(data, channels, sample_rate)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_frames() {
        assert!(matches!(
            Wave::<i16>::new(0, Channels::Stereo, SampleRate::Pcm48000Hz),
            Err(WaveError::Empty)
        ));
    }

    #[test]
    fn test_initialize_failure_keeps_wave() {
        let mut wave = Wave::<f32>::new(10, Channels::Mono, SampleRate::Pcm44100Hz).unwrap();
        wave.data_mut()[3] = 0.5;

        assert!(wave
            .initialize(0, Channels::Stereo, SampleRate::Pcm48000Hz)
            .is_err());
        assert_eq!(wave.frame_count(), 10);
        assert_eq!(wave.data()[3], 0.5);
        assert_eq!(wave.channels(), Channels::Mono);
    }

    #[test]
    fn test_frame_count_and_duration() {
        let wave = Wave::<i16>::new(24000, Channels::Stereo, SampleRate::Pcm48000Hz).unwrap();
        assert_eq!(wave.data().len(), 48000);
        assert_eq!(wave.frame_count(), 24000);
        assert!((wave.seconds() - 0.5).abs() < 1e-6);
        assert!((wave.milliseconds() - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_from_samples_misaligned() {
        let result = Wave::from_samples(vec![0.0f32; 3], Channels::Stereo, SampleRate::Pcm48000Hz);
        assert!(matches!(result, Err(WaveError::Misaligned { len: 3, channels: 2 })));
    }

    #[test]
    fn test_float_integer_round_trip() {
        let samples: Vec<f32> = (0..1000).map(|i| ((i as f32) * 0.0123).sin() * 0.9).collect();
        let wave = Wave::from_samples(samples.clone(), Channels::Mono, SampleRate::Pcm22050Hz).unwrap();

        let back = wave.convert::<i16>().convert::<f32>();
        let step = 1.0 / i16::MAX as f32;
        for (original, converted) in samples.iter().zip(back.data()) {
            assert!((original - converted).abs() <= step, "{original} vs {converted}");
        }
    }

    #[test]
    fn test_sample_rate_parsing() {
        assert_eq!(SampleRate::try_from(44100).unwrap(), SampleRate::Pcm44100Hz);
        assert_eq!("96000".parse::<SampleRate>().unwrap(), SampleRate::Pcm96000Hz);
        assert_eq!("22050Hz".parse::<SampleRate>().unwrap(), SampleRate::Pcm22050Hz);
        assert!(SampleRate::try_from(12345).is_err());
        assert_eq!(SampleRate::Pcm48000Hz.to_string(), "48000Hz");
    }

    #[test]
    fn test_channels_try_from() {
        assert_eq!(Channels::try_from(1).unwrap(), Channels::Mono);
        assert_eq!(Channels::try_from(2).unwrap(), Channels::Stereo);
        assert!(Channels::try_from(6).is_err());
    }
}

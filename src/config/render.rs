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
use std::{path::Path, time::Duration};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::wave::SampleRate;

const DEFAULT_SAMPLE_RATE: u32 = 48000;
const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(600);
const DEFAULT_CONTROL_INTERVAL: usize = 256;
const DEFAULT_TAIL_FRACTION: f32 = 0.5;
const DEFAULT_OUTPUT_PEAK: f32 = 0.95;
const DEFAULT_MODULATED_CHUNK: usize = 64;
const DEFAULT_RENDER_CHUNK: usize = 4096;

/// A YAML representation of the render settings. Every field is optional.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct RenderConfig {
    /// Output sample rate in Hz (default: 48000).
    sample_rate: Option<u32>,

    /// Longest render allowed, as a duration string such as "90s" (default: 10m).
    max_duration: Option<String>,

    /// Samples between control updates in the additive voice (default: 256).
    control_interval: Option<usize>,

    /// Silence appended after the last note, in quarter notes (default: 0.5).
    tail_fraction: Option<f32>,

    /// Peak level of SoundFont renders after normalization (default: 0.95).
    output_peak: Option<f32>,

    /// SoundFont chunk size while any channel is modulated (default: 64 frames).
    modulated_chunk: Option<usize>,

    /// SoundFont chunk size otherwise (default: 4096 frames).
    render_chunk: Option<usize>,

    /// Suppresses render summaries.
    quiet: Option<bool>,
}

impl RenderConfig {
    /// Parse render settings from a YAML file.
    pub fn deserialize(path: &Path) -> Result<RenderConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<RenderConfig>()?)
    }

    pub fn with_sample_rate(mut self, sample_rate: SampleRate) -> Self {
        self.sample_rate = Some(sample_rate.hz());
        self
    }

    pub fn with_max_duration(mut self, max_duration: &str) -> Self {
        self.max_duration = Some(max_duration.to_string());
        self
    }

    pub fn with_control_interval(mut self, control_interval: usize) -> Self {
        self.control_interval = Some(control_interval);
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = Some(quiet);
        self
    }

    /// Returns the output sample rate, rejecting rates a wave cannot carry.
    pub fn sample_rate(&self) -> Result<SampleRate, ConfigError> {
        Ok(SampleRate::try_from(
            self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
        )?)
    }

    /// Returns the render length limit.
    pub fn max_duration(&self) -> Result<Duration, ConfigError> {
        match &self.max_duration {
            Some(value) => Ok(DurationString::from_string(value.clone())
                .map_err(|e| ConfigError::InvalidDuration {
                    value: value.clone(),
                    reason: e.to_string(),
                })?
                .into()),
            None => Ok(DEFAULT_MAX_DURATION),
        }
    }

    pub fn control_interval(&self) -> usize {
        self.control_interval.unwrap_or(DEFAULT_CONTROL_INTERVAL).max(1)
    }

    pub fn tail_fraction(&self) -> f32 {
        self.tail_fraction.unwrap_or(DEFAULT_TAIL_FRACTION).max(0.0)
    }

    /// Returns the normalization target, kept within `(0, 1]`.
    pub fn output_peak(&self) -> f32 {
        match self.output_peak {
            Some(peak) if peak > 0.0 => peak.min(1.0),
            _ => DEFAULT_OUTPUT_PEAK,
        }
    }

    pub fn modulated_chunk(&self) -> usize {
        self.modulated_chunk.unwrap_or(DEFAULT_MODULATED_CHUNK).max(1)
    }

    pub fn render_chunk(&self) -> usize {
        self.render_chunk.unwrap_or(DEFAULT_RENDER_CHUNK).max(1)
    }

    pub fn quiet(&self) -> bool {
        self.quiet.unwrap_or(false)
    }
}

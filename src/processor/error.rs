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
use crate::wave::{Channels, SampleRate, WaveError};

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("Waves must share a channel layout and rate: {expected_channels} at {expected_rate}, got {channels} at {rate}")]
    FormatMismatch {
        expected_channels: Channels,
        expected_rate: SampleRate,
        channels: Channels,
        rate: SampleRate,
    },

    #[error("Expected a {expected} wave, got {found}")]
    WrongChannels { expected: Channels, found: Channels },

    #[error("Channel {channel} out of range for a {channels} wave")]
    ChannelOutOfRange { channel: usize, channels: Channels },

    #[error("Invalid frame range {start}..{end}")]
    InvalidRange { start: usize, end: usize },

    #[error("Split position {position} out of range for {frames} frames")]
    SplitOutOfRange { position: usize, frames: usize },

    #[error("Unsupported bit depth {0}, expected 8, 16, 24 or 32")]
    UnsupportedBitDepth(u32),

    #[error("Failed to resample from {0}Hz to {1}Hz")]
    ResamplingFailed(u32, u32),

    #[error(transparent)]
    Wave(#[from] WaveError),
}

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
use std::io;

use crate::{synth::SynthError, wave::WaveError};

/// Errors raised while loading or rendering an SFX script.
#[derive(Debug, thiserror::Error)]
pub enum SfxError {
    #[error("Unable to read SFX script: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed SFX script: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SFX script has no duration")]
    MissingDuration,

    #[error("SFX script has no tracks")]
    MissingTracks,

    #[error("SFX scripts support 1 or 2 channels, got {0}")]
    InvalidChannels(u32),

    #[error("SFX script declares {channels} channel(s) but has {tracks} track(s)")]
    TrackCountMismatch { channels: u32, tracks: usize },

    #[error("SFX instruction has no type")]
    MissingType,

    #[error("Unknown SFX instruction {0}")]
    UnknownInstruction(String),

    #[error("Invalid parameters for SFX instruction {kind}: {source}")]
    InvalidInstruction {
        kind: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error(transparent)]
    Wave(#[from] WaveError),
}

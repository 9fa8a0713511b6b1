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

use crate::{config::ConfigError, wave::WaveError};

/// Errors raised while reading or rendering a MIDI file.
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("Not a MIDI file: expected MThd, found {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("Unexpected MIDI header length {0}, expected 6")]
    BadHeaderLength(u32),

    #[error("SMPTE time division {0:#06x} is not supported")]
    SmpteDivision(u16),

    #[error("MIDI header is truncated")]
    TruncatedHeader,

    #[error("MIDI time division is zero")]
    ZeroDivision,

    #[error("Track {track}: expected MTrk chunk, found {found}")]
    BadChunk { track: u16, found: String },

    #[error("Malformed MIDI file: {0}")]
    Malformed(#[from] midly::Error),

    #[error("MIDI file contains no notes")]
    NoNotes,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Wave(#[from] WaveError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

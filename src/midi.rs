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
//! Standard MIDI File rendering.
//!
//! A file is decoded once into a [`MidiSequence`] and can then be rendered by the
//! built-in additive synthesizer or by any [`SoundfontSynth`]. Both paths always
//! produce stereo output at the configured sample rate.

use std::path::Path;

use crate::{
    config::RenderConfig,
    wave::{Sample, Wave},
};

pub mod additive;
pub mod control;
mod error;
pub mod file;
pub mod soundfont;
pub mod tempo;
pub mod timeline;

#[cfg(test)]
pub(crate) mod mock;

pub use control::{update_control_cache, ChannelControlCache, ChannelEventIndex};
pub use error::MidiError;
pub use file::{
    ChannelState, ControlEvent, ControlKind, MidiHeader, MidiNote, MidiSequence, TempoEvent,
};
pub use soundfont::SoundfontSynth;
pub use tempo::{samples_to_ticks, ticks_to_samples, TempoMap, TickClock};
pub use timeline::{build_timeline, TimelineEvent};

/// Renders MIDI data to waves with a fixed set of render settings.
#[derive(Debug, Clone, Default)]
pub struct MidiRenderer {
    config: RenderConfig,
}

impl MidiRenderer {
    pub fn new(config: RenderConfig) -> MidiRenderer {
        MidiRenderer { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Decodes and renders MIDI bytes with additive synthesis.
    pub fn render<S: Sample>(&self, bytes: &[u8]) -> Result<Wave<S>, MidiError> {
        let sequence = MidiSequence::parse(bytes)?;
        self.render_sequence(&sequence)
    }

    /// Reads and renders a MIDI file with additive synthesis.
    pub fn read_file<S: Sample>(&self, path: &Path) -> Result<Wave<S>, MidiError> {
        let sequence = MidiSequence::read(path)?;
        self.render_sequence(&sequence)
    }

    /// Renders an already decoded sequence with additive synthesis.
    pub fn render_sequence<S: Sample>(
        &self,
        sequence: &MidiSequence,
    ) -> Result<Wave<S>, MidiError> {
        Ok(additive::render(sequence, &self.config)?.convert())
    }

    /// Decodes MIDI bytes and renders them through a SoundFont synthesizer.
    pub fn render_with_soundfont<S: Sample, T: SoundfontSynth>(
        &self,
        bytes: &[u8],
        synth: &mut T,
    ) -> Result<Wave<S>, MidiError> {
        let sequence = MidiSequence::parse(bytes)?;
        Ok(soundfont::render(&sequence, synth, &self.config)?.convert())
    }
}

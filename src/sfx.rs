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
//! JSON driven procedural sound effects.
//!
//! A script describes one mono track per output channel. Each track is built by
//! running instruction lists through a [`Synthesizer`]: `preInstructions` over
//! the whole track, then each region's instructions over its time slice, then
//! `instructions` over the whole track again. `finalInstructions` run last on
//! every track before the tracks are interleaved.
//!
//! ```json
//! {
//!   "duration": 500,
//!   "channels": 1,
//!   "tracks": [{
//!     "preInstructions": [{ "type": "pitchSweep", "startFrequency": 880, "endFrequency": 220 }],
//!     "regions": [{ "offset": 400, "length": 0, "instructions": [{ "type": "applyFadeOut" }] }]
//!   }],
//!   "finalInstructions": [{ "type": "normalize" }]
//! }
//! ```

use std::{fs, path::Path};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, span, Level};

use crate::{
    synth::Synthesizer,
    wave::{Channels, SampleRate, Wave},
};

mod error;
mod instruction;

pub use error::SfxError;
pub use instruction::Instruction;

/// The raw document. Instructions stay untyped until [`SfxScript::parse`] checks them.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    duration: Option<u32>,
    channels: Option<u32>,
    tracks: Option<Vec<TrackDocument>>,
    #[serde(default)]
    final_instructions: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackDocument {
    #[serde(default)]
    pre_instructions: Vec<Value>,
    #[serde(default)]
    regions: Vec<RegionDocument>,
    #[serde(default)]
    instructions: Vec<Value>,
}

#[derive(Deserialize)]
struct RegionDocument {
    #[serde(default)]
    offset: u32,
    #[serde(default)]
    length: u32,
    #[serde(default)]
    instructions: Vec<Value>,
}

fn instructions(values: &[Value]) -> Result<Vec<Instruction>, SfxError> {
    values.iter().map(Instruction::from_value).collect()
}

/// A time slice of a track in milliseconds. A length of zero runs to the end.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub offset_ms: u32,
    pub length_ms: u32,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub pre_instructions: Vec<Instruction>,
    pub regions: Vec<Region>,
    pub instructions: Vec<Instruction>,
}

/// A validated SFX script.
#[derive(Debug, Clone, PartialEq)]
pub struct SfxScript {
    duration_ms: u32,
    channels: Channels,
    tracks: Vec<Track>,
    final_instructions: Vec<Instruction>,
}

impl SfxScript {
    /// Reads and validates a script file.
    pub fn read(path: &Path) -> Result<SfxScript, SfxError> {
        SfxScript::parse(&fs::read_to_string(path)?)
    }

    /// Parses and validates a script. Every instruction is decoded up front, so
    /// a script that parses will render.
    pub fn parse(json: &str) -> Result<SfxScript, SfxError> {
        let document: Document = serde_json::from_str(json)?;

        let duration_ms = document.duration.ok_or(SfxError::MissingDuration)?;
        let channels = match document.channels.unwrap_or(1) {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            other => return Err(SfxError::InvalidChannels(other)),
        };
        let track_documents = document.tracks.ok_or(SfxError::MissingTracks)?;
        if track_documents.len() != channels.count() {
            return Err(SfxError::TrackCountMismatch {
                channels: channels.count() as u32,
                tracks: track_documents.len(),
            });
        }

        let tracks = track_documents
            .iter()
            .map(|track| {
                let regions = track
                    .regions
                    .iter()
                    .map(|region| {
                        Ok(Region {
                            offset_ms: region.offset,
                            length_ms: region.length,
                            instructions: instructions(&region.instructions)?,
                        })
                    })
                    .collect::<Result<Vec<_>, SfxError>>()?;

                Ok(Track {
                    pre_instructions: instructions(&track.pre_instructions)?,
                    regions,
                    instructions: instructions(&track.instructions)?,
                })
            })
            .collect::<Result<Vec<_>, SfxError>>()?;

        Ok(SfxScript {
            duration_ms,
            channels,
            tracks,
            final_instructions: instructions(&document.final_instructions)?,
        })
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn final_instructions(&self) -> &[Instruction] {
        &self.final_instructions
    }

    /// Renders the script at the given rate.
    pub fn render(&self, sample_rate: SampleRate) -> Result<Wave<f32>, SfxError> {
        let span = span!(Level::INFO, "sfx render");
        let _enter = span.enter();

        let frames = ms_to_samples(self.duration_ms, sample_rate);
        let mut rendered = Vec::with_capacity(self.tracks.len());
        for (index, track) in self.tracks.iter().enumerate() {
            debug!(track = index, regions = track.regions.len(), "Rendering track");
            rendered.push(self.render_track(track, frames, sample_rate)?);
        }

        let wave = match self.channels {
            Channels::Mono => rendered.swap_remove(0),
            Channels::Stereo => {
                let data = rendered[0]
                    .data()
                    .iter()
                    .zip(rendered[1].data())
                    .flat_map(|(left, right)| [*left, *right])
                    .collect();
                Wave::from_samples(data, Channels::Stereo, sample_rate)?
            }
        };

        debug!(
            duration_ms = self.duration_ms,
            channels = %self.channels,
            sample_rate = %sample_rate,
            "Rendered SFX script"
        );
        Ok(wave)
    }

    fn render_track(
        &self,
        track: &Track,
        frames: usize,
        sample_rate: SampleRate,
    ) -> Result<Wave<f32>, SfxError> {
        let mut wave = Wave::new(frames, Channels::Mono, sample_rate)?;

        {
            let mut synth = Synthesizer::new(&mut wave)?;
            run(&track.pre_instructions, &mut synth);

            for region in &track.regions {
                let offset = ms_to_samples(region.offset_ms, sample_rate);
                let length = ms_to_samples(region.length_ms, sample_rate);
                synth.set_region(offset, length);
                run(&region.instructions, &mut synth);
            }

            if !track.instructions.is_empty() {
                synth.reset_region();
                run(&track.instructions, &mut synth);
            }
        }

        if !self.final_instructions.is_empty() {
            let mut synth = Synthesizer::new(&mut wave)?;
            run(&self.final_instructions, &mut synth);
        }

        Ok(wave)
    }
}

fn run(instructions: &[Instruction], synth: &mut Synthesizer<'_>) {
    for instruction in instructions {
        debug!(instruction = %instruction.name(), "Running instruction");
        instruction.execute(synth);
    }
}

fn ms_to_samples(ms: u32, sample_rate: SampleRate) -> usize {
    (u64::from(sample_rate.hz()) * u64::from(ms) / 1000) as usize
}

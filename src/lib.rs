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
//! Offline audio rendering.
//!
//! - [`midi`] decodes Standard MIDI Files and renders them with an additive
//!   synthesizer or any [`midi::SoundfontSynth`].
//! - [`sfx`] renders JSON procedural sound effect scripts.
//! - [`synth`] is the generator and effect toolkit both build on.
//! - [`processor`] edits, analyzes and converts rendered waves.

pub mod config;
pub mod midi;
pub mod processor;
pub mod sfx;
pub mod synth;
pub mod wave;

#[cfg(test)]
mod testutil;

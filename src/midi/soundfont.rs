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
//! Rendering through an external sample-based synthesizer.
//!
//! The synthesizer is driven from the merged timeline: audio is rendered up to
//! each event's sample position, then the event is forwarded. Channels with a
//! modulation wheel above zero get a vibrato LFO written to their pitch wheel
//! before every chunk, and chunks shrink while any channel is modulated so the
//! LFO stays smooth.

use tracing::{debug, info, warn};

use super::{
    control::{ChannelEventIndex, ChannelTracker},
    error::MidiError,
    file::{ControlKind, MidiSequence, PERCUSSION_CHANNEL},
    tempo::TempoMap,
    timeline::{build_timeline, TimelineEvent},
};
use crate::{
    config::RenderConfig,
    processor::Processor,
    synth::{fast_sin, voice::VIBRATO_RATE},
    wave::{Channels, Wave},
};

/// Center of the 14-bit pitch wheel.
const PITCH_WHEEL_CENTER: i32 = 8192;

/// Vibrato depth at full modulation, in semitones (a 2% frequency swing).
const MAX_VIBRATO_SEMITONES: f32 = 0.343;

/// A sample-based synthesizer loaded with a SoundFont. Output is interleaved
/// stereo float at the rate given to [`SoundfontSynth::set_output`].
pub trait SoundfontSynth {
    fn set_output(&mut self, sample_rate: u32);

    /// Selects a preset by number, from the drum bank when `drums` is set.
    fn set_preset(&mut self, channel: u8, preset: u8, drums: bool);

    fn set_bank_preset(&mut self, channel: u8, bank: u16, preset: u8);

    /// Starts a note. Velocity is normalized to `0.0..=1.0`.
    fn note_on(&mut self, channel: u8, note: u8, velocity: f32);

    fn note_off(&mut self, channel: u8, note: u8);

    /// Sets the 14-bit pitch wheel, 8192 being centered.
    fn set_pitch_wheel(&mut self, channel: u8, value: u16);

    fn set_volume(&mut self, channel: u8, volume: f32);

    /// Sets the pan position, 0.0 being hard left and 1.0 hard right.
    fn set_pan(&mut self, channel: u8, pan: f32);

    fn midi_control(&mut self, channel: u8, controller: u8, value: u8);

    /// Overwrites `output` with the next `output.len() / 2` stereo frames.
    fn render(&mut self, output: &mut [f32]);
}

/// Per-channel values the walk needs between events.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelDrive {
    modulation: i16,
    pitch_bend: i16,
    bank: u16,
    bend_range: f32,
}

struct Walk<'a, S: SoundfontSynth> {
    synth: &'a mut S,
    buffer: Vec<f32>,
    rendered: usize,
    sample_rate: f32,
    modulated_chunk: usize,
    render_chunk: usize,
    channels: [ChannelDrive; 16],
    chunks: usize,
}

impl<S: SoundfontSynth> Walk<'_, S> {
    fn frames(&self) -> usize {
        self.buffer.len() / 2
    }

    /// Renders up to `target` frames into the buffer.
    fn render_until(&mut self, target: usize) {
        let target = target.min(self.frames());
        while self.rendered < target {
            let modulated = self.channels.iter().any(|channel| channel.modulation > 0);
            let chunk = if modulated {
                self.apply_vibrato();
                self.modulated_chunk
            } else {
                self.render_chunk
            };

            let frames = chunk.min(target - self.rendered);
            let range = self.rendered * 2..(self.rendered + frames) * 2;
            self.synth.render(&mut self.buffer[range]);
            self.rendered += frames;
            self.chunks += 1;
        }
    }

    /// Writes the LFO value for the current position to every modulated
    /// channel's pitch wheel.
    fn apply_vibrato(&mut self) {
        let lfo = fast_sin(VIBRATO_RATE * self.rendered as f32 / self.sample_rate);
        for (channel, drive) in self.channels.iter().enumerate() {
            if drive.modulation <= 0 {
                continue;
            }
            let depth = f32::from(drive.modulation) / 127.0 * MAX_VIBRATO_SEMITONES
                / drive.bend_range
                * PITCH_WHEEL_CENTER as f32;
            let wheel = PITCH_WHEEL_CENTER + i32::from(drive.pitch_bend) + (lfo * depth) as i32;
            self.synth.set_pitch_wheel(channel as u8, wheel.clamp(0, 16383) as u16);
        }
    }

    fn set_pitch_wheel(&mut self, channel: u8) {
        let wheel = PITCH_WHEEL_CENTER + i32::from(self.channels[usize::from(channel)].pitch_bend);
        self.synth.set_pitch_wheel(channel, wheel.clamp(0, 16383) as u16);
    }

    fn apply(&mut self, event: &TimelineEvent) {
        match *event {
            TimelineEvent::TempoChange { tick, tempo } => {
                debug!(tick, tempo, "Tempo change");
            }
            TimelineEvent::NoteOn {
                channel,
                note,
                velocity,
                ..
            } => self.synth.note_on(channel, note, f32::from(velocity) / 127.0),
            TimelineEvent::NoteOff { channel, note, .. } => self.synth.note_off(channel, note),
            TimelineEvent::Control(control) => {
                let channel = control.channel & 0x0F;
                let value = control.value.clamp(0, 127) as u8;
                let drive = &mut self.channels[usize::from(channel)];

                match control.kind {
                    ControlKind::PitchBend => {
                        drive.pitch_bend = control.value;
                        self.set_pitch_wheel(channel);
                    }
                    ControlKind::Modulation => {
                        drive.modulation = control.value;
                        if control.value == 0 {
                            self.set_pitch_wheel(channel);
                        }
                    }
                    ControlKind::Volume => self.synth.set_volume(channel, f32::from(value) / 127.0),
                    ControlKind::Pan => self.synth.set_pan(channel, f32::from(value) / 127.0),
                    ControlKind::Expression => self.synth.midi_control(channel, 11, value),
                    ControlKind::Sustain => self.synth.midi_control(channel, 64, value),
                    ControlKind::ProgramChange => {
                        if channel == PERCUSSION_CHANNEL {
                            self.synth.set_preset(channel, value, true);
                        } else {
                            let bank = drive.bank;
                            self.synth.set_bank_preset(channel, bank, value);
                        }
                    }
                    ControlKind::RawMidiCc => {
                        match control.controller {
                            0 => drive.bank = (u16::from(value) << 7) | (drive.bank & 0x7F),
                            32 => drive.bank = (drive.bank & !0x7F) | u16::from(value),
                            _ => {}
                        }
                        self.synth.midi_control(channel, control.controller, value);
                    }
                    ControlKind::PortamentoTime
                    | ControlKind::PortamentoSwitch
                    | ControlKind::FilterCutoff
                    | ControlKind::FilterResonance
                    | ControlKind::Tremolo => {
                        self.synth.midi_control(channel, control.controller, value)
                    }
                    ControlKind::ChannelPressure | ControlKind::PolyKeyPressure => {}
                }
            }
        }
    }
}

/// Renders the sequence through `synth` to normalized stereo float samples.
pub fn render<S: SoundfontSynth>(
    sequence: &MidiSequence,
    synth: &mut S,
    config: &RenderConfig,
) -> Result<Wave<f32>, MidiError> {
    let sample_rate = config.sample_rate()?;
    let map: TempoMap = sequence.tempo_map(sample_rate.hz());
    let timeline = build_timeline(sequence);

    let tail = (f32::from(sequence.header.division) * config.tail_fraction()) as u32;
    let mut total = map.ticks_to_samples(sequence.max_end_tick().saturating_add(tail)) as usize;
    let max_duration = config.max_duration()?;
    let limit = (max_duration.as_secs_f64() * f64::from(sample_rate.hz())) as usize;
    if total > limit {
        warn!(
            samples = total,
            limit,
            max_duration = ?max_duration,
            "MIDI render exceeds the maximum duration, truncating"
        );
        total = limit;
    }

    synth.set_output(sample_rate.hz());
    let index = ChannelEventIndex::new(&sequence.controls);
    let mut channels = [ChannelDrive::default(); 16];
    for (channel, drive) in channels.iter_mut().enumerate() {
        let channel = channel as u8;
        drive.bend_range = sequence.channels[usize::from(channel)].pitch_bend_range.max(0.01);
        // Pan and volume as of tick zero, so notes there start at the right level.
        let mut tracker = ChannelTracker::new(&sequence.controls, &index, channel);
        let start = tracker.advance_to(0);
        synth.set_preset(channel, index.program_at(channel, 0), channel == PERCUSSION_CHANNEL);
        synth.set_pan(channel, f32::from(start.pan) / 127.0);
        synth.set_volume(channel, f32::from(start.volume) / 127.0);
    }

    let mut walk = Walk {
        synth,
        buffer: vec![0.0; total * 2],
        rendered: 0,
        sample_rate: sample_rate.as_f32(),
        modulated_chunk: config.modulated_chunk(),
        render_chunk: config.render_chunk(),
        channels,
        chunks: 0,
    };

    for event in &timeline {
        let position = map.ticks_to_samples(event.tick()) as usize;
        if position > total {
            break;
        }
        walk.render_until(position);
        walk.apply(event);
    }
    walk.render_until(total);

    let chunks = walk.chunks;
    let wave = Wave::from_samples(walk.buffer, Channels::Stereo, sample_rate)?;
    let mut processor = Processor::new(wave);
    processor.normalize(20.0 * config.output_peak().log10());
    let wave = processor.into_wave();

    if !config.quiet() {
        info!(
            events = timeline.len(),
            chunks,
            frames = wave.frame_count(),
            seconds = wave.seconds(),
            "Rendered MIDI with SoundFont"
        );
    }
    Ok(wave)
}

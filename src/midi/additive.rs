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
//! Additive synthesis of a decoded MIDI sequence.
//!
//! Every note is rendered independently into a shared stereo float buffer. A
//! voice sums the harmonic table of its instrument family, shapes it with the
//! family's envelope, and reacts to the channel's controllers, which are read
//! from the control cache once every control interval. Drums on channel 10 are
//! shaped white noise.

use rand::Rng;
use tracing::{debug, info, warn};

use super::{
    control::{ChannelEventIndex, ChannelTracker},
    error::MidiError,
    file::{ControlEvent, MidiNote, MidiSequence, PERCUSSION_CHANNEL},
    tempo::TempoMap,
};
use crate::{
    config::RenderConfig,
    processor::Processor,
    synth::{
        voice::{
            filter_cutoff_to_coefficient, filter_resonance_to_feedback, note_to_frequency,
            pan_gains, pitch_bend_multiplier, portamento_frequency, portamento_time_to_seconds,
            tremolo_multiplier, vibrato_multiplier,
        },
        EnvelopeShape, FilterState, InstrumentFamily,
    },
    wave::{Channels, Wave},
};

/// Peak velocity maps to a quarter of full scale so chords do not clip before
/// normalization.
const VELOCITY_SCALE: f32 = 0.25;

/// Controller-derived values, refreshed once per control interval.
#[derive(Debug, Clone, Copy, Default)]
struct VoiceControls {
    bend: f32,
    vibrato_depth: f32,
    tremolo_depth: f32,
    gain: f32,
    cutoff: f32,
    resonance: f32,
    left: f32,
    right: f32,
    portamento_samples: usize,
}

/// Renders the whole sequence to normalized stereo float samples.
pub fn render(sequence: &MidiSequence, config: &RenderConfig) -> Result<Wave<f32>, MidiError> {
    let sample_rate = config.sample_rate()?;
    let map = sequence.tempo_map(sample_rate.hz());

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

    let mut buffer = vec![0.0f32; total * 2];
    let index = ChannelEventIndex::new(&sequence.controls);
    let mut voice = Voice {
        controls: &sequence.controls,
        index: &index,
        map: &map,
        interval: config.control_interval(),
        total,
        bend_ranges: sequence.channels.map(|channel| channel.pitch_bend_range),
        last_frequency: [0.0; 16],
    };

    let mut rendered = 0usize;
    for note in &sequence.notes {
        if voice.render_note(note, &mut buffer) {
            rendered += 1;
        }
    }

    let wave = Wave::from_samples(buffer, Channels::Stereo, sample_rate)?;
    let mut processor = Processor::new(wave);
    processor.normalize(0.0);
    let wave = processor.into_wave();

    if !config.quiet() {
        info!(
            notes = rendered,
            skipped = sequence.notes.len() - rendered,
            frames = wave.frame_count(),
            seconds = wave.seconds(),
            "Rendered MIDI with additive synthesis"
        );
    }
    Ok(wave)
}

/// Shared state of the note loop.
struct Voice<'a> {
    controls: &'a [ControlEvent],
    index: &'a ChannelEventIndex,
    map: &'a TempoMap,
    interval: usize,
    total: usize,
    bend_ranges: [f32; 16],
    /// Frequency of the last note started on each channel, for glides.
    last_frequency: [f32; 16],
}

impl Voice<'_> {
    /// Mixes one note into the interleaved stereo buffer. Returns false when
    /// the note has no samples inside the render.
    fn render_note(&mut self, note: &MidiNote, buffer: &mut [f32]) -> bool {
        let start = self.map.ticks_to_samples(note.start_tick) as usize;
        let end = self.map.ticks_to_samples(note.end_tick) as usize;
        if end <= start || start >= self.total {
            return false;
        }

        let sample_rate = self.map.sample_rate() as f32;
        let note_samples = end.min(self.total) - start;
        let duration = note_samples as f32 / sample_rate;
        let channel = note.channel & 0x0F;
        let percussion = channel == PERCUSSION_CHANNEL;

        let base_frequency = note_to_frequency(note.note);
        let base_amplitude = f32::from(note.velocity) / 127.0 * VELOCITY_SCALE;
        let previous_frequency = self.last_frequency[usize::from(channel)];
        self.last_frequency[usize::from(channel)] = base_frequency;

        let program = self.index.program_at(channel, note.start_tick);
        let family = InstrumentFamily::from_program(program);
        let envelope = if percussion {
            EnvelopeShape::percussion(duration)
        } else {
            EnvelopeShape::for_family(family, duration)
        };

        debug!(
            channel,
            note = note.note,
            start,
            samples = note_samples,
            family = ?family,
            "Rendering note"
        );

        let mut tracker = ChannelTracker::new(self.controls, self.index, channel);
        let mut clock = self.map.clock();
        let mut filter = FilterState::default();
        let mut rng = rand::thread_rng();
        let mut phase = 0.0f32;
        let mut state = VoiceControls::default();
        let bend_range = self.bend_ranges[usize::from(channel)];

        for local in 0..note_samples {
            let global = start + local;

            if local % self.interval == 0 {
                let cache = tracker.advance_to(clock.tick_at(global as u64));
                let glide_seconds = portamento_time_to_seconds(cache.portamento_time);
                let glide = previous_frequency > 0.0
                    && cache.portamento_on
                    && glide_seconds > 0.0
                    && !percussion;
                let (left, right) = pan_gains(cache.pan);

                state = VoiceControls {
                    bend: pitch_bend_multiplier(cache.pitch_bend, bend_range),
                    vibrato_depth: f32::from(cache.modulation) / 127.0,
                    tremolo_depth: f32::from(cache.tremolo) / 127.0,
                    gain: f32::from(cache.effective_expression()) / 127.0
                        * f32::from(cache.volume)
                        / 127.0,
                    cutoff: filter_cutoff_to_coefficient(cache.filter_cutoff, sample_rate),
                    resonance: filter_resonance_to_feedback(cache.filter_resonance),
                    left,
                    right,
                    portamento_samples: if glide {
                        (glide_seconds * sample_rate) as usize
                    } else {
                        0
                    },
                };
            }

            let time = local as f32 / sample_rate;
            let glided = if state.portamento_samples > 0 {
                let progress = local as f32 / state.portamento_samples as f32;
                portamento_frequency(previous_frequency, base_frequency, progress)
            } else {
                base_frequency
            };
            let frequency = glided * state.bend * vibrato_multiplier(time, state.vibrato_depth);

            let amplitude = base_amplitude
                * state.gain
                * envelope.level(local, note_samples, sample_rate)
                * tremolo_multiplier(time, state.tremolo_depth);

            let sample = if percussion {
                amplitude * rng.gen_range(-1.0f32..1.0)
            } else {
                let raw = amplitude * family.waveform_sample(phase);
                phase += frequency / sample_rate;
                phase -= phase.floor();
                filter.process(raw, state.cutoff, state.resonance)
            };

            buffer[global * 2] += sample * state.left;
            buffer[global * 2 + 1] += sample * state.right;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        midi::tempo::ticks_to_samples,
        testutil::{
            audio_test_utils::{calculate_rms, peak, zero_crossings},
            midi_test_utils::{midi_file, note_off, note_on, track, Event},
        },
        wave::SampleRate,
    };

    fn config() -> RenderConfig {
        RenderConfig::default()
            .with_sample_rate(SampleRate::Pcm8000Hz)
            .with_quiet(true)
    }

    fn left(wave: &Wave<f32>) -> Vec<f32> {
        wave.data().iter().step_by(2).copied().collect()
    }

    /// Left channel of one note held for `ticks` on channel 0, with `setup`
    /// messages sent at tick zero after the program change.
    fn render_held(program: u8, note: u8, setup: &[&[u8]], ticks: u32) -> Vec<f32> {
        let mut events = vec![Event::Raw(0, vec![0xC0, program])];
        events.extend(setup.iter().map(|bytes| Event::Raw(0, bytes.to_vec())));
        events.push(note_on(0, 0, note, 100));
        events.push(note_off(ticks, 0, note));

        let sequence = MidiSequence::parse(&midi_file(480, &[track(&events)])).unwrap();
        left(&render(&sequence, &config()).unwrap())
    }

    /// RMS of the first difference over the RMS of the signal.
    fn brightness(samples: &[f32]) -> f32 {
        let diff: Vec<f32> = samples.windows(2).map(|pair| pair[1] - pair[0]).collect();
        calculate_rms(&diff) / calculate_rms(samples)
    }

    /// RMS of consecutive 200-sample windows, 11 cycles of A4 at 8kHz.
    fn window_levels(samples: &[f32]) -> Vec<f32> {
        samples.chunks_exact(200).map(calculate_rms).collect()
    }

    #[test]
    fn test_single_note_layout() {
        let bytes = midi_file(480, &[track(&[note_on(0, 0, 69, 100), note_off(480, 0, 69)])]);
        let sequence = MidiSequence::parse(&bytes).unwrap();
        let wave = render(&sequence, &config()).unwrap();

        assert_eq!(wave.channels(), Channels::Stereo);
        let expected = ticks_to_samples(480 + 240, &sequence.tempos, 480, 8000) as usize;
        assert_eq!(wave.frame_count(), expected);

        let note_samples = ticks_to_samples(480, &sequence.tempos, 480, 8000) as usize;
        let samples = left(&wave);
        assert!(calculate_rms(&samples[..note_samples]) > 0.05);
        assert!(samples[note_samples..].iter().all(|s| s.abs() < 1e-3));

        // Normalized to full scale.
        assert!((peak(wave.data()) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_pitch_of_sine_family() {
        // Program 120 (sound effects family) is a pure sine.
        let bytes = midi_file(
            480,
            &[track(&[
                Event::Raw(0, vec![0xC0, 120]),
                note_on(0, 0, 69, 100),
                note_off(1920, 0, 69),
            ])],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();
        let wave = render(&sequence, &config()).unwrap();

        // One second of steady tone in the middle: 880 crossings for 440Hz.
        let samples = left(&wave);
        let crossings = zero_crossings(&samples[4000..12000]);
        assert!((870..=890).contains(&crossings), "{crossings}");
    }

    #[test]
    fn test_pitch_bend_raises_pitch() {
        let plain = render_held(120, 69, &[], 1920);
        // Full upward deflection over the default two semitone range.
        let bent = render_held(120, 69, &[&[0xE0, 0x7F, 0x7F]], 1920);

        assert!((870..=890).contains(&zero_crossings(&plain[4000..12000])));
        // 440Hz * 2^(2/12) is about 494Hz.
        let crossings = zero_crossings(&bent[4000..12000]);
        assert!((975..=1000).contains(&crossings), "{crossings}");
    }

    #[test]
    fn test_pitch_bend_follows_rpn_range() {
        let octave = render_held(
            120,
            69,
            &[
                &[0xB0, 101, 0],
                &[0xB0, 100, 0],
                &[0xB0, 6, 12],
                &[0xE0, 0x7F, 0x7F],
            ],
            1920,
        );

        let crossings = zero_crossings(&octave[4000..12000]);
        assert!((1745..=1775).contains(&crossings), "{crossings}");
    }

    #[test]
    fn test_portamento_glides_between_notes() {
        let glide = |channel: u8, switch: u8| {
            let bytes = midi_file(
                480,
                &[track(&[
                    Event::Raw(0, vec![0xC0 | channel, 120]),
                    Event::Raw(0, vec![0xB0 | channel, 5, 64]),
                    Event::Raw(0, vec![0xB0 | channel, 65, switch]),
                    note_on(0, channel, 57, 100),
                    note_off(480, channel, 57),
                    note_on(0, channel, 69, 100),
                    note_off(1920, channel, 69),
                ])],
            );
            let sequence = MidiSequence::parse(&bytes).unwrap();
            left(&render(&sequence, &config()).unwrap())
        };

        // The second note starts at sample 4000. A steady 440Hz gives 220
        // crossings in a quarter second, the glide up from 220Hz far fewer.
        let off = zero_crossings(&glide(0, 0)[4000..6000]);
        let on = zero_crossings(&glide(0, 127)[4000..6000]);
        assert!((210..=230).contains(&off), "{off}");
        assert!(on < 180, "{on}");

        // Drums never glide and stay noise.
        let drums = glide(PERCUSSION_CHANNEL, 127);
        assert!(zero_crossings(&drums[4000..4400]) > 100);
    }

    #[test]
    fn test_modulation_wheel_adds_vibrato() {
        let plain = render_held(120, 69, &[], 1920);
        let vibrato = render_held(120, 69, &[&[0xB0, 1, 127]], 1920);

        // The average pitch is unchanged.
        let crossings = zero_crossings(&vibrato[4000..12000]);
        assert!((860..=900).contains(&crossings), "{crossings}");

        // The phase drifts by up to a quarter cycle against the steady tone.
        let drift = plain[4000..12000]
            .iter()
            .zip(&vibrato[4000..12000])
            .fold(0.0f32, |max, (a, b)| max.max((a - b).abs()));
        assert!(drift > 0.3, "{drift}");
    }

    #[test]
    fn test_tremolo_modulates_level() {
        let plain = window_levels(&render_held(120, 69, &[], 1920)[2000..14000]);
        let tremolo = window_levels(&render_held(120, 69, &[&[0xB0, 92, 127]], 1920)[2000..14000]);

        let range = |levels: &[f32]| {
            let max = levels.iter().fold(0.0f32, |m, l| m.max(*l));
            let min = levels.iter().fold(f32::MAX, |m, l| m.min(*l));
            min / max
        };
        assert!(range(&plain) > 0.9, "{}", range(&plain));
        assert!(range(&tremolo) < 0.5, "{}", range(&tremolo));
    }

    #[test]
    fn test_low_cutoff_darkens_tone() {
        // Program 80 (synth lead) has twelve partials. 110Hz keeps them all
        // below the Nyquist frequency.
        let open = render_held(80, 45, &[], 1920);
        let closed = render_held(80, 45, &[&[0xB0, 74, 0]], 1920);

        let open = brightness(&open[4000..12000]);
        let closed = brightness(&closed[4000..12000]);
        assert!(closed < open * 0.6, "{closed} {open}");
    }

    #[test]
    fn test_pan_hard_left() {
        let bytes = midi_file(
            480,
            &[track(&[
                Event::Raw(0, vec![0xB0, 10, 0]),
                note_on(0, 0, 60, 100),
                note_off(480, 0, 60),
            ])],
        );
        let sequence = MidiSequence::parse(&bytes).unwrap();
        let wave = render(&sequence, &config()).unwrap();

        let right: Vec<f32> = wave.data().iter().skip(1).step_by(2).copied().collect();
        assert!(calculate_rms(&left(&wave)) > 0.05);
        assert!(peak(&right) < 1e-4);
    }

    #[test]
    fn test_percussion_is_noise() {
        let bytes = midi_file(480, &[track(&[note_on(0, 9, 36, 127), note_off(480, 9, 36)])]);
        let sequence = MidiSequence::parse(&bytes).unwrap();
        let wave = render(&sequence, &config()).unwrap();

        let samples = left(&wave);
        // Noise crosses zero far more often than any pitched note would here.
        assert!(zero_crossings(&samples[..400]) > 100);
    }

    #[test]
    fn test_max_duration_truncates() {
        let bytes = midi_file(480, &[track(&[note_on(0, 0, 60, 100), note_off(9600, 0, 60)])]);
        let sequence = MidiSequence::parse(&bytes).unwrap();
        let wave = render(&sequence, &config().with_max_duration("1s")).unwrap();
        assert_eq!(wave.frame_count(), 8000);
    }

    #[test]
    fn test_notes_accumulate() {
        let single = midi_file(480, &[track(&[note_on(0, 0, 60, 100), note_off(480, 0, 60)])]);
        let late = midi_file(480, &[track(&[note_on(960, 0, 60, 100), note_off(480, 0, 60)])]);
        let both = midi_file(
            480,
            &[
                track(&[note_on(0, 0, 60, 100), note_off(480, 0, 60)]),
                track(&[note_on(960, 1, 72, 100), note_off(480, 1, 72)]),
            ],
        );

        let first = render(&MidiSequence::parse(&single).unwrap(), &config()).unwrap();
        let second = render(&MidiSequence::parse(&late).unwrap(), &config()).unwrap();
        let mixed = render(&MidiSequence::parse(&both).unwrap(), &config()).unwrap();

        assert!(first.frame_count() < second.frame_count());
        let samples = left(&mixed);
        let note = 4000;
        assert!(calculate_rms(&samples[..note]) > 0.01);
        assert!(calculate_rms(&samples[2 * note..3 * note]) > 0.01);
    }
}

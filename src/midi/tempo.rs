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
use super::file::TempoEvent;

/// Microseconds per quarter note assumed before the first tempo event (120 BPM).
pub const DEFAULT_TEMPO: u32 = 500_000;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Seconds covered by `ticks` at `tempo`.
fn span_seconds(ticks: u32, tempo: u32, division: u16) -> f64 {
    f64::from(ticks) * f64::from(tempo) / (MICROS_PER_SECOND * f64::from(division))
}

/// Converts a tick position to a sample position by walking the sorted tempo
/// events from the start. The result is truncated and never decreases as
/// `tick` grows.
pub fn ticks_to_samples(tick: u32, tempos: &[TempoEvent], division: u16, sample_rate: u32) -> u64 {
    let mut seconds = 0.0f64;
    let mut last_tick = 0u32;
    let mut tempo = DEFAULT_TEMPO;

    for event in tempos {
        if event.tick >= tick {
            break;
        }
        seconds += span_seconds(event.tick - last_tick, tempo, division);
        last_tick = event.tick;
        tempo = event.tempo;
    }
    seconds += span_seconds(tick - last_tick, tempo, division);

    (seconds * f64::from(sample_rate)) as u64
}

/// Converts a sample position back to the tick sounding at that moment.
pub fn samples_to_ticks(
    sample: u64,
    tempos: &[TempoEvent],
    division: u16,
    sample_rate: u32,
) -> u32 {
    TempoMap::new(tempos, division, sample_rate).samples_to_ticks(sample)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    tick: u32,
    tempo: u32,
    start_seconds: f64,
}

/// Sorted tempo segments with precomputed start times.
#[derive(Debug, Clone)]
pub struct TempoMap {
    segments: Vec<Segment>,
    division: u16,
    sample_rate: u32,
}

impl TempoMap {
    /// Builds the map from tempo events sorted by tick.
    pub fn new(tempos: &[TempoEvent], division: u16, sample_rate: u32) -> TempoMap {
        let mut segments = Vec::with_capacity(tempos.len() + 1);
        segments.push(Segment {
            tick: 0,
            tempo: DEFAULT_TEMPO,
            start_seconds: 0.0,
        });

        let mut seconds = 0.0f64;
        let mut last = segments[0];
        for event in tempos {
            seconds += span_seconds(event.tick - last.tick, last.tempo, division);
            last = Segment {
                tick: event.tick,
                tempo: event.tempo,
                start_seconds: seconds,
            };
            segments.push(last);
        }

        TempoMap {
            segments,
            division,
            sample_rate,
        }
    }

    pub fn division(&self) -> u16 {
        self.division
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Same result as the free [`ticks_to_samples`] walk, found by binary search.
    pub fn ticks_to_samples(&self, tick: u32) -> u64 {
        let index = self
            .segments
            .partition_point(|segment| segment.tick < tick)
            .saturating_sub(1);
        let segment = &self.segments[index];
        let seconds =
            segment.start_seconds + span_seconds(tick - segment.tick, segment.tempo, self.division);
        (seconds * f64::from(self.sample_rate)) as u64
    }

    pub fn samples_to_ticks(&self, sample: u64) -> u32 {
        let seconds = sample as f64 / f64::from(self.sample_rate);
        let index = self
            .segments
            .partition_point(|segment| segment.start_seconds <= seconds)
            .saturating_sub(1);
        self.tick_in_segment(index, seconds)
    }

    /// Seconds since the start of the song at `tick`.
    pub fn seconds_at(&self, tick: u32) -> f64 {
        self.ticks_to_samples(tick) as f64 / f64::from(self.sample_rate)
    }

    /// A cursor for monotonically increasing sample positions.
    pub fn clock(&self) -> TickClock<'_> {
        TickClock {
            map: self,
            segment: 0,
        }
    }

    fn tick_in_segment(&self, index: usize, seconds: f64) -> u32 {
        let segment = &self.segments[index];
        let elapsed = (seconds - segment.start_seconds).max(0.0);
        let ticks =
            elapsed * MICROS_PER_SECOND * f64::from(self.division) / f64::from(segment.tempo);
        segment.tick.saturating_add(ticks as u32)
    }
}

/// Converts sample positions to ticks, only moving forward through the
/// tempo segments.
#[derive(Debug, Clone)]
pub struct TickClock<'a> {
    map: &'a TempoMap,
    segment: usize,
}

impl TickClock<'_> {
    /// The tick at `sample`. Positions must not go backwards between calls.
    pub fn tick_at(&mut self, sample: u64) -> u32 {
        let seconds = sample as f64 / f64::from(self.map.sample_rate);
        let segments = &self.map.segments;
        while self.segment + 1 < segments.len()
            && segments[self.segment + 1].start_seconds <= seconds
        {
            self.segment += 1;
        }
        self.map.tick_in_segment(self.segment, seconds)
    }
}

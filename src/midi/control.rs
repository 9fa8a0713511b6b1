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
//! Running per-channel controller values.
//!
//! Renderers walk forward through time and fold control events into a
//! [`ChannelControlCache`] as they go. Each channel keeps a cursor into its own
//! slice of the event list, so the cost of catching up is proportional to the
//! number of events crossed.

use super::file::{ControlEvent, ControlKind};

/// Current controller values of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelControlCache {
    pub pitch_bend: i16,
    pub modulation: i16,
    pub expression: i16,
    pub pressure: i16,
    pub volume: i16,
    pub pan: i16,
    pub portamento_time: i16,
    pub portamento_on: bool,
    pub filter_cutoff: i16,
    pub filter_resonance: i16,
    pub tremolo: i16,
    pub sustain: bool,
}

impl Default for ChannelControlCache {
    fn default() -> Self {
        ChannelControlCache {
            pitch_bend: 0,
            modulation: 0,
            expression: 127,
            pressure: 0,
            volume: 100,
            pan: 64,
            portamento_time: 0,
            portamento_on: false,
            filter_cutoff: 127,
            filter_resonance: 0,
            tremolo: 0,
            sustain: false,
        }
    }
}

impl ChannelControlCache {
    /// Folds one event into the cache.
    pub fn apply(&mut self, event: &ControlEvent) {
        let value = event.value;
        match event.kind {
            ControlKind::PitchBend => self.pitch_bend = value,
            ControlKind::Modulation => self.modulation = value,
            ControlKind::Expression => self.expression = value,
            ControlKind::ChannelPressure => self.pressure = value,
            ControlKind::Volume => self.volume = value,
            ControlKind::Pan => self.pan = value,
            ControlKind::PortamentoTime => self.portamento_time = value,
            ControlKind::PortamentoSwitch => self.portamento_on = value != 0,
            ControlKind::FilterCutoff => self.filter_cutoff = value,
            ControlKind::FilterResonance => self.filter_resonance = value,
            ControlKind::Tremolo => self.tremolo = value,
            ControlKind::Sustain => self.sustain = value != 0,
            ControlKind::ProgramChange | ControlKind::PolyKeyPressure | ControlKind::RawMidiCc => {}
        }
    }

    /// Expression raised by channel pressure, halfway to full at maximum pressure.
    pub fn effective_expression(&self) -> i16 {
        let headroom = i32::from(127 - self.expression);
        let boost = headroom * i32::from(self.pressure) / 254;
        (i32::from(self.expression) + boost).clamp(0, 127) as i16
    }
}

/// Indices of each channel's events in a tick-sorted event list, plus the
/// program changes of every channel.
#[derive(Debug, Clone, Default)]
pub struct ChannelEventIndex {
    indices: [Vec<usize>; 16],
    programs: [Vec<(u32, u8)>; 16],
}

impl ChannelEventIndex {
    pub fn new(events: &[ControlEvent]) -> ChannelEventIndex {
        let mut index = ChannelEventIndex::default();
        for (position, event) in events.iter().enumerate() {
            let channel = usize::from(event.channel & 0x0F);
            index.indices[channel].push(position);
            if event.kind == ControlKind::ProgramChange {
                index.programs[channel].push((event.tick, event.value.clamp(0, 127) as u8));
            }
        }
        index
    }

    /// Positions of the channel's events, in tick order.
    pub fn channel(&self, channel: u8) -> &[usize] {
        &self.indices[usize::from(channel & 0x0F)]
    }

    /// The program selected on the channel at `tick`, zero before any change.
    pub fn program_at(&self, channel: u8, tick: u32) -> u8 {
        let programs = &self.programs[usize::from(channel & 0x0F)];
        let count = programs.partition_point(|(at, _)| *at <= tick);
        count.checked_sub(1).map_or(0, |last| programs[last].1)
    }
}

/// Applies every event of the channel up to and including `target_tick`,
/// starting at `cursor` (a position in `channel_index`). The cursor only
/// moves forward.
pub fn update_control_cache(
    events: &[ControlEvent],
    channel_index: &[usize],
    cache: &mut ChannelControlCache,
    cursor: &mut usize,
    target_tick: u32,
) {
    while let Some(&position) = channel_index.get(*cursor) {
        let event = &events[position];
        if event.tick > target_tick {
            break;
        }
        cache.apply(event);
        *cursor += 1;
    }
}

/// A cache bound to one channel's events.
#[derive(Debug, Clone)]
pub struct ChannelTracker<'a> {
    events: &'a [ControlEvent],
    indices: &'a [usize],
    cursor: usize,
    cache: ChannelControlCache,
}

impl<'a> ChannelTracker<'a> {
    pub fn new(events: &'a [ControlEvent], index: &'a ChannelEventIndex, channel: u8) -> Self {
        ChannelTracker {
            events,
            indices: index.channel(channel),
            cursor: 0,
            cache: ChannelControlCache::default(),
        }
    }

    /// Catches up to `tick` and returns the resulting state.
    pub fn advance_to(&mut self, tick: u32) -> &ChannelControlCache {
        update_control_cache(self.events, self.indices, &mut self.cache, &mut self.cursor, tick);
        &self.cache
    }

    pub fn cache(&self) -> &ChannelControlCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(tick: u32, channel: u8, kind: ControlKind, value: i16) -> ControlEvent {
        ControlEvent {
            tick,
            channel,
            kind,
            controller: 0,
            value,
        }
    }

    #[test]
    fn test_defaults() {
        let cache = ChannelControlCache::default();
        assert_eq!(cache.expression, 127);
        assert_eq!(cache.volume, 100);
        assert_eq!(cache.pan, 64);
        assert_eq!(cache.filter_cutoff, 127);
        assert_eq!(cache.effective_expression(), 127);
    }

    #[test]
    fn test_update_stops_at_target() {
        let events = vec![
            event(0, 0, ControlKind::Volume, 80),
            event(10, 1, ControlKind::Volume, 20),
            event(10, 0, ControlKind::PitchBend, -4000),
            event(20, 0, ControlKind::Volume, 60),
        ];
        let index = ChannelEventIndex::new(&events);
        assert_eq!(index.channel(0), &[0, 2, 3]);

        let mut cache = ChannelControlCache::default();
        let mut cursor = 0;
        update_control_cache(&events, index.channel(0), &mut cache, &mut cursor, 10);
        assert_eq!(cache.volume, 80);
        assert_eq!(cache.pitch_bend, -4000);
        assert_eq!(cursor, 2);

        // Going backwards changes nothing.
        update_control_cache(&events, index.channel(0), &mut cache, &mut cursor, 5);
        assert_eq!(cursor, 2);

        update_control_cache(&events, index.channel(0), &mut cache, &mut cursor, 100);
        assert_eq!(cache.volume, 60);
        assert_eq!(cursor, 3);
    }

    #[test]
    fn test_latches_and_no_ops() {
        let mut cache = ChannelControlCache::default();
        cache.apply(&event(0, 0, ControlKind::Sustain, 127));
        cache.apply(&event(0, 0, ControlKind::PortamentoSwitch, 1));
        cache.apply(&event(0, 0, ControlKind::ProgramChange, 40));
        cache.apply(&event(0, 0, ControlKind::RawMidiCc, 99));
        cache.apply(&event(0, 0, ControlKind::PolyKeyPressure, 99));
        assert!(cache.sustain);
        assert!(cache.portamento_on);

        let mut expected = ChannelControlCache::default();
        expected.sustain = true;
        expected.portamento_on = true;
        assert_eq!(cache, expected);

        cache.apply(&event(0, 0, ControlKind::Sustain, 0));
        assert!(!cache.sustain);
    }

    #[test]
    fn test_pressure_raises_expression() {
        let mut cache = ChannelControlCache::default();
        cache.apply(&event(0, 0, ControlKind::Expression, 63));
        assert_eq!(cache.effective_expression(), 63);

        cache.apply(&event(0, 0, ControlKind::ChannelPressure, 127));
        assert_eq!(cache.effective_expression(), 63 + 32);
    }

    #[test]
    fn test_program_at() {
        let events = vec![
            event(100, 2, ControlKind::ProgramChange, 40),
            event(200, 2, ControlKind::ProgramChange, 73),
        ];
        let index = ChannelEventIndex::new(&events);
        assert_eq!(index.program_at(2, 0), 0);
        assert_eq!(index.program_at(2, 100), 40);
        assert_eq!(index.program_at(2, 199), 40);
        assert_eq!(index.program_at(2, 5000), 73);
        assert_eq!(index.program_at(3, 5000), 0);
    }

    #[test]
    fn test_tracker() {
        let events = vec![
            event(0, 4, ControlKind::Pan, 0),
            event(50, 4, ControlKind::Pan, 127),
        ];
        let index = ChannelEventIndex::new(&events);
        let mut tracker = ChannelTracker::new(&events, &index, 4);
        assert_eq!(tracker.advance_to(10).pan, 0);
        assert_eq!(tracker.advance_to(50).pan, 127);
        assert_eq!(tracker.cache().pan, 127);
    }
}

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

/// Audio test utilities for generating test signals and validating results
pub mod audio_test_utils {
    use std::f32::consts::PI;

    /// Generate a multi-frequency signal (sum of sine waves)
    pub fn generate_multi_frequency_signal(
        frequencies: &[f32],
        amplitudes: &[f32],
        sample_rate: u32,
        duration_seconds: f32,
    ) -> Vec<f32> {
        assert_eq!(
            frequencies.len(),
            amplitudes.len(),
            "Frequencies and amplitudes must have same length"
        );

        let sample_count = (sample_rate as f32 * duration_seconds) as usize;
        (0..sample_count)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                frequencies
                    .iter()
                    .zip(amplitudes)
                    .map(|(freq, amp)| amp * (2.0 * PI * freq * t).sin())
                    .sum()
            })
            .collect()
    }

    /// Calculate RMS (Root Mean Square) of a signal
    pub fn calculate_rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }

        let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
        (sum_squares / samples.len() as f32).sqrt()
    }

    /// Largest absolute sample value
    pub fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// Number of sign changes, treating zero as positive
    pub fn zero_crossings(samples: &[f32]) -> usize {
        samples
            .windows(2)
            .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
            .count()
    }
}

/// Builders for Standard MIDI File bytes.
pub mod midi_test_utils {
    /// A track event preceded by its delta time in ticks.
    pub enum Event {
        /// Raw event bytes, written as-is. Useful for running status and meta events.
        Raw(u32, Vec<u8>),
        /// A set-tempo meta event in microseconds per quarter note.
        Tempo(u32, u32),
    }

    pub fn note_on(delta: u32, channel: u8, note: u8, velocity: u8) -> Event {
        Event::Raw(delta, vec![0x90 | channel, note, velocity])
    }

    pub fn note_off(delta: u32, channel: u8, note: u8) -> Event {
        Event::Raw(delta, vec![0x80 | channel, note, 0x40])
    }

    fn write_vlq(out: &mut Vec<u8>, value: u32) {
        let mut groups = vec![(value & 0x7F) as u8];
        let mut rest = value >> 7;
        while rest > 0 {
            groups.push((rest & 0x7F) as u8 | 0x80);
            rest >>= 7;
        }
        out.extend(groups.iter().rev());
    }

    /// An `MTrk` chunk holding the events followed by an end-of-track.
    pub fn track(events: &[Event]) -> Vec<u8> {
        let mut body = Vec::new();
        for event in events {
            match event {
                Event::Raw(delta, bytes) => {
                    write_vlq(&mut body, *delta);
                    body.extend_from_slice(bytes);
                }
                Event::Tempo(delta, tempo) => {
                    write_vlq(&mut body, *delta);
                    body.extend_from_slice(&[0xFF, 0x51, 0x03]);
                    body.extend_from_slice(&tempo.to_be_bytes()[1..]);
                }
            }
        }
        body.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

        let mut chunk = b"MTrk".to_vec();
        chunk.extend_from_slice(&(body.len() as u32).to_be_bytes());
        chunk.extend(body);
        chunk
    }

    /// A complete file: format 0 for a single track, format 1 otherwise.
    pub fn midi_file(division: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
        let format: u16 = if tracks.len() <= 1 { 0 } else { 1 };

        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&format.to_be_bytes());
        bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&division.to_be_bytes());
        for track in tracks {
            bytes.extend_from_slice(track);
        }
        bytes
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_vlq() {
            let mut out = Vec::new();
            write_vlq(&mut out, 0);
            write_vlq(&mut out, 0x7F);
            write_vlq(&mut out, 0x80);
            write_vlq(&mut out, 0x0FFF_FFFF);
            assert_eq!(out, vec![0x00, 0x7F, 0x81, 0x00, 0xFF, 0xFF, 0xFF, 0x7F]);
        }

        #[test]
        fn test_midi_file_layout() {
            let bytes = midi_file(480, &[track(&[Event::Tempo(0, 500_000)])]);
            assert_eq!(&bytes[..4], b"MThd");
            assert_eq!(&bytes[8..14], &[0, 0, 0, 1, 0x01, 0xE0]);
            assert_eq!(&bytes[14..18], b"MTrk");
            assert_eq!(&bytes[18..22], &[0, 0, 0, 11]);
            assert_eq!(&bytes[22..], &[0, 0xFF, 0x51, 3, 0x07, 0xA1, 0x20, 0, 0xFF, 0x2F, 0]);
        }
    }
}

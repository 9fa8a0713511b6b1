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

/// Fixed-capacity circular delay line.
///
/// The write cursor always points at the oldest sample, so [`RingBuffer::front`]
/// is the sample written `capacity` pushes ago.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    write: usize,
}

impl RingBuffer {
    /// Creates a silent delay line. Capacity is at least one sample.
    pub fn new(capacity: usize) -> Self {
        RingBuffer {
            buffer: vec![0.0; capacity.max(1)],
            write: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The oldest sample, which the next push overwrites.
    pub fn front(&self) -> f32 {
        self.buffer[self.write]
    }

    /// Overwrites the oldest sample and advances.
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write] = sample;
        self.write = (self.write + 1) % self.buffer.len();
    }

    /// The sample pushed `delay` pushes ago, with `delay` clamped to `1..=capacity`.
    pub fn tap(&self, delay: usize) -> f32 {
        let capacity = self.buffer.len();
        let delay = delay.clamp(1, capacity);
        self.buffer[(self.write + capacity - delay) % capacity]
    }

    /// Linear interpolation between the two taps around a fractional delay.
    pub fn tap_interpolated(&self, delay: f32) -> f32 {
        let delay = delay.clamp(1.0, self.buffer.len() as f32);
        let whole = delay.floor() as usize;
        let frac = delay - whole as f32;
        if frac == 0.0 {
            return self.tap(whole);
        }

        let near = self.tap(whole);
        let far = self.tap(whole + 1);
        near + frac * (far - near)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_is_oldest() {
        let mut ring = RingBuffer::new(3);
        assert_eq!(ring.front(), 0.0);
        ring.push(1.0);
        ring.push(2.0);
        ring.push(3.0);
        assert_eq!(ring.front(), 1.0);
        ring.push(4.0);
        assert_eq!(ring.front(), 2.0);
    }

    #[test]
    fn test_tap() {
        let mut ring = RingBuffer::new(4);
        for sample in [1.0, 2.0, 3.0, 4.0, 5.0] {
            ring.push(sample);
        }
        assert_eq!(ring.tap(1), 5.0);
        assert_eq!(ring.tap(2), 4.0);
        assert_eq!(ring.tap(4), 2.0);
        // Out of range delays clamp.
        assert_eq!(ring.tap(0), 5.0);
        assert_eq!(ring.tap(10), 2.0);
    }

    #[test]
    fn test_tap_interpolated() {
        let mut ring = RingBuffer::new(4);
        for sample in [0.0, 1.0, 2.0, 3.0] {
            ring.push(sample);
        }
        assert_eq!(ring.tap_interpolated(1.0), 3.0);
        assert!((ring.tap_interpolated(1.5) - 2.5).abs() < 1e-6);
        assert!((ring.tap_interpolated(2.25) - 1.75).abs() < 1e-6);
    }

    #[test]
    fn test_zero_capacity() {
        let mut ring = RingBuffer::new(0);
        assert_eq!(ring.capacity(), 1);
        ring.push(0.5);
        assert_eq!(ring.front(), 0.5);
        assert_eq!(ring.tap(1), 0.5);
    }
}

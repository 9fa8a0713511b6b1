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
use std::fmt::Debug;

/// A PCM sample type a [`super::Wave`] can hold.
///
/// Conversions follow one scaling rule: float full scale `[-1, 1]` maps to the
/// integer type's `MAX`. Integer to integer scales by the ratio of maxima. Casts
/// into integer types saturate.
pub trait Sample: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    /// Whether this is a floating point format.
    const FLOAT: bool;

    /// Bits per sample as written to a container.
    const BITS: u16;

    /// Full scale magnitude (1.0 for floats).
    fn full_scale() -> f64;

    /// The raw numeric value, unscaled.
    fn to_raw(self) -> f64;

    /// Builds a sample from a raw numeric value, saturating for integers.
    fn from_raw(value: f64) -> Self;

    /// Converts to another sample type using the scaling rule.
    fn convert<T: Sample>(self) -> T {
        let raw = self.to_raw();
        match (Self::FLOAT, T::FLOAT) {
            (true, true) => T::from_raw(raw),
            (true, false) => T::from_raw((raw.clamp(-1.0, 1.0) * T::full_scale()).round()),
            (false, true) => T::from_raw(raw / Self::full_scale()),
            (false, false) => T::from_raw((raw * T::full_scale() / Self::full_scale()).round()),
        }
    }

    /// Normalized float value of this sample.
    fn to_f32(self) -> f32 {
        self.convert::<f32>()
    }

    /// Builds a sample from a normalized float.
    fn from_f32(value: f32) -> Self {
        value.convert::<Self>()
    }
}

macro_rules! impl_int_sample {
    ($($ty:ty),*) => {
        $(
            impl Sample for $ty {
                const FLOAT: bool = false;
                const BITS: u16 = <$ty>::BITS as u16;

                fn full_scale() -> f64 {
                    <$ty>::MAX as f64
                }

                fn to_raw(self) -> f64 {
                    self as f64
                }

                fn from_raw(value: f64) -> Self {
                    // `as` saturates at the type bounds and maps NaN to zero.
                    value as $ty
                }
            }
        )*
    };
}

macro_rules! impl_float_sample {
    ($($ty:ty),*) => {
        $(
            impl Sample for $ty {
                const FLOAT: bool = true;
                const BITS: u16 = (std::mem::size_of::<$ty>() * 8) as u16;

                fn full_scale() -> f64 {
                    1.0
                }

                fn to_raw(self) -> f64 {
                    self as f64
                }

                fn from_raw(value: f64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_int_sample!(i8, i16, i32);
impl_float_sample!(f32, f64);

// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::error::{Error, Result};

/// Integer types which can be filled from a run of bits.
pub trait BitField: Copy {
    /// Width of the type, in bits.
    const BITS: u32;

    /// Converts the low [BITS](BitField::BITS) bits of `raw` into `Self`.
    /// Full-width values are reinterpreted, so `-1i32` round-trips through `0xFFFF_FFFF`.
    fn from_raw(raw: u64) -> Self;
}

macro_rules! impl_bit_field {
    ($($t:ty => $u:ty),* $(,)?) => {
        $(
            impl BitField for $t {
                const BITS: u32 = <$t>::BITS;

                #[inline]
                fn from_raw(raw: u64) -> Self {
                    raw as $u as $t
                }
            }
        )*
    };
}

impl_bit_field! {
    u8 => u8,
    u16 => u16,
    u32 => u32,
    u64 => u64,
    i8 => u8,
    i16 => u16,
    i32 => u32,
    i64 => u64,
}

/// BitReader reads bit-granular fields from an owned byte buffer.
///
/// Bits are consumed starting from the most significant bit of every byte,
/// and the first bit read becomes the most significant bit of the value.
#[derive(Debug, Clone, Default)]
pub struct BitReader {
    data: Vec<u8>,
    position: usize,
}

impl BitReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    /// Returns the number of bits consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of bits left in the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.position
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        self.ensure(1)?;
        Ok(self.take_bit())
    }

    /// Reads `bits` bits and zero-extends them into `T`.
    ///
    /// `bits` may be zero (which reads nothing and returns zero),
    /// but must not exceed the width of `T`.
    pub fn read_bits<T: BitField>(&mut self, bits: u32) -> Result<T> {
        if bits > T::BITS {
            return Err(Error::InvalidBitWidth { bits, max: T::BITS });
        }
        self.ensure(bits)?;

        let mut value: u64 = 0;
        let mut left = bits;

        // Leading bits up to the byte boundary
        while left > 0 && self.position % 8 != 0 {
            value = (value << 1) | self.take_bit() as u64;
            left -= 1;
        }

        // Whole bytes
        while left >= 8 {
            value = (value << 8) | self.data[self.position / 8] as u64;
            self.position += 8;
            left -= 8;
        }

        // Trailing bits
        while left > 0 {
            value = (value << 1) | self.take_bit() as u64;
            left -= 1;
        }

        Ok(T::from_raw(value))
    }

    /// Reads a 6-bit field holding the width of subsequent fields.
    pub fn read_width(&mut self) -> Result<u32> {
        self.read_bits(6)
    }

    #[inline]
    fn ensure(&self, bits: u32) -> Result<()> {
        if bits as usize > self.remaining() {
            Err(Error::EndOfStream {
                wanted: bits,
                position: self.position,
                available: self.data.len() * 8,
            })
        } else {
            Ok(())
        }
    }

    #[inline]
    fn take_bit(&mut self) -> bool {
        let byte = self.data[self.position / 8];
        let bit = (byte >> (7 - self.position % 8)) & 1;
        self.position += 1;
        bit != 0
    }
}

/// Maps a zig-zag encoded value back into a signed integer:
/// 0 → 0, 1 → -1, 2 → 1, 3 → -2, …
#[inline]
pub fn decode_zig_zag(value: u32) -> i32 {
    if value & 1 != 0 {
        -(((value as u64 + 1) >> 1) as i64) as i32
    } else {
        (value >> 1) as i32
    }
}

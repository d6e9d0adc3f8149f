// Bit-level field table used by every frame
//
// Wire order (all frames):
// - Bits are numbered LSB-first across the whole frame: bit `n` is bit
//   `n % 8` (0 = least significant) of byte `n / 8`.
// - A field occupies bits `offset .. offset + width`, its least significant
//   bit at `offset`. Fields wider than a byte are therefore little-endian.
// - Signed fields are two's complement at their own width.
// - Float fields are 32 bits wide and carry the IEEE 754 bit pattern.
// - Reserved bits are written as zero and ignored when decoding.

use super::FrameError;

/// One field of a frame layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl BitField {
    pub const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Self {
            name,
            offset,
            width,
        }
    }

    /// Padding bits
    pub const fn reserved(offset: usize, width: usize) -> Self {
        Self::new("reserved", offset, width)
    }

    /// First bit past the field
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    pub const fn max_unsigned(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Reject values wider than the field
    pub fn check(&self, value: u64) -> Result<u64, FrameError> {
        if value > self.max_unsigned() {
            return Err(FrameError::FieldOverflow {
                field: self.name,
                value,
                width: self.width,
            });
        }
        Ok(value)
    }

    /// Write the low `width` bits of `value`
    pub fn write(&self, buf: &mut [u8], value: u64) {
        for i in 0..self.width {
            let bit = self.offset + i;
            let mask = 1u8 << (bit % 8);
            if (value >> i) & 1 == 1 {
                buf[bit / 8] |= mask;
            } else {
                buf[bit / 8] &= !mask;
            }
        }
    }

    pub fn write_signed(&self, buf: &mut [u8], value: i64) {
        self.write(buf, (value as u64) & self.max_unsigned());
    }

    pub fn read(&self, buf: &[u8]) -> u64 {
        let mut value = 0u64;
        for i in 0..self.width {
            let bit = self.offset + i;
            if (buf[bit / 8] >> (bit % 8)) & 1 == 1 {
                value |= 1 << i;
            }
        }
        value
    }

    /// Read and sign-extend a two's complement field
    pub fn read_signed(&self, buf: &[u8]) -> i64 {
        let raw = self.read(buf);
        let shift = 64 - self.width as u32;
        ((raw << shift) as i64) >> shift
    }

    pub fn write_f32(&self, buf: &mut [u8], value: f32) {
        debug_assert_eq!(self.width, 32, "{} is not a float field", self.name);
        self.write(buf, value.to_bits().into());
    }

    pub fn read_f32(&self, buf: &[u8]) -> f32 {
        f32::from_bits(self.read(buf) as u32)
    }
}

#[cfg(test)]
pub(crate) fn assert_tiles(layout: &[BitField], frame_len: usize) {
    let mut fields = layout.to_vec();
    fields.sort_by_key(|f| f.offset);

    let mut next = 0;
    for field in &fields {
        assert!(field.width > 0, "{} has zero width", field.name);
        assert_eq!(
            field.offset, next,
            "{} starts at bit {}, expected {}",
            field.name, field.offset, next
        );
        next = field.end();
    }
    assert_eq!(next, frame_len * 8, "layout does not fill the frame");
}

//! Scratch buffer - the 16-byte exchange region between kernel and driver.
//!
//! Layout is fixed: two contiguous little-endian `f64` slots, the
//! independent variable (potential E) at offset 0 and the dependent
//! variable (current I) at offset 8. The kernel owns the buffer for
//! writing during a step; the driver owns it for reading immediately
//! after the step returns. `&mut` access makes the write-then-read
//! ordering a compile-time fact rather than a convention.

/// Byte offset of the independent-variable slot.
const SLOT_X: usize = 0;
/// Byte offset of the dependent-variable slot.
const SLOT_Y: usize = 8;
/// Total buffer size in bytes.
pub const BUFFER_LEN: usize = 16;

/// One immutable result tuple, decoded from the scratch buffer after a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    /// Potential (V).
    pub e: f64,
    /// Current (A).
    pub i: f64,
}

/// Fixed 16-byte exchange buffer, two little-endian `f64` slots.
#[derive(Debug, Clone)]
pub struct ScratchBuffer {
    bytes: [u8; BUFFER_LEN],
}

impl ScratchBuffer {
    /// A zeroed buffer. Both slots decode as 0.0.
    pub fn new() -> Self {
        Self {
            bytes: [0; BUFFER_LEN],
        }
    }

    /// Kernel write side: store the independent variable into slot 0.
    pub fn write_x(&mut self, value: f64) {
        self.bytes[SLOT_X..SLOT_X + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Kernel write side: store the dependent variable into slot 1.
    pub fn write_y(&mut self, value: f64) {
        self.bytes[SLOT_Y..SLOT_Y + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Driver read side: decode both slots into one immutable point.
    pub fn read_point(&self) -> DataPoint {
        DataPoint {
            e: self.read_slot(SLOT_X),
            i: self.read_slot(SLOT_Y),
        }
    }

    fn read_slot(&self, offset: usize) -> f64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.bytes[offset..offset + 8]);
        f64::from_le_bytes(raw)
    }

    /// Raw view of the full region, e.g. for wire-level assertions.
    pub fn as_bytes(&self) -> &[u8; BUFFER_LEN] {
        &self.bytes
    }
}

impl Default for ScratchBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_exact_bits() {
        let mut buf = ScratchBuffer::new();
        buf.write_x(-0.3);
        buf.write_y(1.25e-9);

        let point = buf.read_point();
        assert_eq!(point.e.to_bits(), (-0.3f64).to_bits());
        assert_eq!(point.i.to_bits(), (1.25e-9f64).to_bits());
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buf = ScratchBuffer::new();
        buf.write_x(1.0);
        buf.write_y(-2.0);

        assert_eq!(&buf.as_bytes()[0..8], &1.0f64.to_le_bytes());
        assert_eq!(&buf.as_bytes()[8..16], &(-2.0f64).to_le_bytes());
    }

    #[test]
    fn test_second_write_replaces_first() {
        let mut buf = ScratchBuffer::new();
        buf.write_x(1.0);
        buf.write_x(2.0);
        assert_eq!(buf.read_point().e, 2.0);
    }

    #[test]
    fn test_zeroed_buffer_decodes_to_zero() {
        let point = ScratchBuffer::new().read_point();
        assert_eq!(point, DataPoint { e: 0.0, i: 0.0 });
    }
}

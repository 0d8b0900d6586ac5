//! Growable little-endian code buffer.
//!
//! The cursor is always the end of the written bytes. Appends advance it,
//! [`CodeBuffer::rewind`] moves it back, and the `write_*_at` methods
//! overwrite already-emitted bytes without moving anything.

use alloc::vec::Vec;

/// Append-only byte buffer with in-place overwrite for backpatching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBuffer {
    bytes: Vec<u8>,
}

impl CodeBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Current cursor: the offset the next byte will be written at.
    #[inline]
    pub fn offset(&self) -> usize {
        self.bytes.len()
    }

    /// Number of emitted bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been emitted yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Make room for at least `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) {
        self.bytes.reserve(additional);
    }

    /// Append a 16-bit little-endian value.
    #[inline]
    pub fn emit16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a 32-bit little-endian value.
    #[inline]
    pub fn emit32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append raw bytes.
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Move the cursor back to `offset`, discarding everything after it.
    /// Offsets past the end are ignored.
    pub fn rewind(&mut self, offset: usize) {
        self.bytes.truncate(offset);
    }

    /// Pad with `fill` until the cursor is a multiple of `align`.
    ///
    /// `align` must be a power of two; zero and one are no-ops.
    pub fn align_to(&mut self, align: usize, fill: u8) {
        if align <= 1 {
            return;
        }
        let rem = self.bytes.len() % align;
        if rem != 0 {
            let pad = align - rem;
            self.bytes.resize(self.bytes.len() + pad, fill);
        }
    }

    /// Overwrite two bytes at `offset`, or `None` past the end.
    pub fn write_u16_at(&mut self, offset: usize, value: u16) -> Option<()> {
        let b = self.bytes.get_mut(offset..offset.checked_add(2)?)?;
        b.copy_from_slice(&value.to_le_bytes());
        Some(())
    }

    /// Overwrite four bytes at `offset`, or `None` past the end.
    pub fn write_u32_at(&mut self, offset: usize, value: u32) -> Option<()> {
        let b = self.bytes.get_mut(offset..offset.checked_add(4)?)?;
        b.copy_from_slice(&value.to_le_bytes());
        Some(())
    }

    /// Read two bytes at `offset`, or `None` past the end.
    pub fn read_u16_at(&self, offset: usize) -> Option<u16> {
        let b = self.bytes.get(offset..offset.checked_add(2)?)?;
        Some(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read four bytes at `offset`, or `None` past the end.
    pub fn read_u32_at(&self, offset: usize) -> Option<u32> {
        let b = self.bytes.get(offset..offset.checked_add(4)?)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Emitted bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the buffer and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for CodeBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_is_little_endian() {
        let mut buf = CodeBuffer::new();
        buf.emit32(0x0031_00B3);
        buf.emit16(0x4501);
        assert_eq!(buf.as_slice(), &[0xB3, 0x00, 0x31, 0x00, 0x01, 0x45]);
        assert_eq!(buf.offset(), 6);
    }

    #[test]
    fn overwrite_does_not_move_cursor() {
        let mut buf = CodeBuffer::new();
        buf.emit32(0);
        buf.emit32(0);
        assert_eq!(buf.write_u32_at(4, 0xDEAD_BEEF), Some(()));
        assert_eq!(buf.offset(), 8);
        assert_eq!(buf.read_u32_at(4), Some(0xDEAD_BEEF));
        assert_eq!(buf.read_u32_at(0), Some(0));
        assert_eq!(buf.write_u16_at(0, 0x1234), Some(()));
        assert_eq!(buf.read_u16_at(0), Some(0x1234));
    }

    #[test]
    fn write_past_end_is_none() {
        let mut buf = CodeBuffer::new();
        assert_eq!(buf.write_u32_at(0, 0x13), None);
        buf.emit16(0x4501);
        assert_eq!(buf.write_u32_at(0, 0x13), None);
        assert_eq!(buf.write_u16_at(1, 0), None);
        assert_eq!(buf.write_u16_at(usize::MAX, 0), None);
        assert_eq!(buf.as_slice(), &[0x01, 0x45]);
    }

    #[test]
    fn read_past_end_is_none() {
        let mut buf = CodeBuffer::new();
        buf.emit16(1);
        assert_eq!(buf.read_u32_at(0), None);
        assert_eq!(buf.read_u16_at(1), None);
        assert_eq!(buf.read_u16_at(usize::MAX), None);
    }

    #[test]
    fn rewind_truncates() {
        let mut buf = CodeBuffer::with_capacity(16);
        buf.emit32(1);
        buf.emit32(2);
        buf.rewind(4);
        assert_eq!(buf.offset(), 4);
        buf.rewind(100);
        assert_eq!(buf.offset(), 4);
    }

    #[test]
    fn align_pads_with_fill() {
        let mut buf = CodeBuffer::new();
        buf.emit16(0xFFFF);
        buf.align_to(8, 0);
        assert_eq!(buf.offset(), 8);
        assert_eq!(&buf.as_slice()[2..], &[0; 6]);
        buf.align_to(8, 0);
        assert_eq!(buf.offset(), 8);
        buf.align_to(1, 0);
        assert_eq!(buf.offset(), 8);
    }
}

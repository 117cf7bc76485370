//! Byte-addressable backing store with bounds-checked big-endian access.

use crate::error::VmError;

/// Fixed-size byte memory with big-endian 16-bit word access.
///
/// The size is fixed at construction and the buffer starts zero-filled.
/// Every accessor checks that all touched bytes lie inside `[0, len)` and
/// fails with [`VmError::OutOfBounds`] otherwise; no other validation is
/// performed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    /// Allocates a zero-filled buffer of `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size].into_boxed_slice(),
        }
    }

    /// Returns the size of the backing store in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when the backing store holds no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Validates that `width` bytes starting at `addr` are in bounds and
    /// returns the byte index of `addr`.
    fn checked_index(&self, addr: u16, width: usize) -> Result<usize, VmError> {
        let start = usize::from(addr);
        if start + width > self.bytes.len() {
            return Err(VmError::OutOfBounds {
                addr,
                len: self.bytes.len(),
            });
        }
        Ok(start)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::OutOfBounds`] when `addr` is outside the store.
    pub fn read_byte(&self, addr: u16) -> Result<u8, VmError> {
        let index = self.checked_index(addr, 1)?;
        Ok(self.bytes[index])
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::OutOfBounds`] when `addr` is outside the store.
    pub fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), VmError> {
        let index = self.checked_index(addr, 1)?;
        self.bytes[index] = value;
        Ok(())
    }

    /// Reads a big-endian 16-bit word from two consecutive bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::OutOfBounds`] unless both touched bytes are inside
    /// the store.
    pub fn read_word(&self, addr: u16) -> Result<u16, VmError> {
        let index = self.checked_index(addr, 2)?;
        Ok(u16::from_be_bytes([
            self.bytes[index],
            self.bytes[index + 1],
        ]))
    }

    /// Writes a big-endian 16-bit word to two consecutive bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::OutOfBounds`] unless both touched bytes are inside
    /// the store.
    pub fn write_word(&mut self, addr: u16, value: u16) -> Result<(), VmError> {
        let index = self.checked_index(addr, 2)?;
        let [hi, lo] = value.to_be_bytes();
        self.bytes[index] = hi;
        self.bytes[index + 1] = lo;
        Ok(())
    }

    /// Copies `image` into the store starting at `addr`.
    ///
    /// Used by hosts to poke bytecode into place before execution begins;
    /// there is no loader, header, or relocation.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::OutOfBounds`] when the image does not fit; the
    /// store is left unmodified in that case.
    pub fn load(&mut self, addr: u16, image: &[u8]) -> Result<(), VmError> {
        let index = self.checked_index(addr, image.len())?;
        self.bytes[index..index + image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Returns a read-only view of `count` consecutive bytes at `addr`.
    ///
    /// Display-only surface for host inspectors; never mutates.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::OutOfBounds`] when the range leaves the store.
    pub fn view(&self, addr: u16, count: usize) -> Result<&[u8], VmError> {
        let index = self.checked_index(addr, count)?;
        Ok(&self.bytes[index..index + count])
    }
}

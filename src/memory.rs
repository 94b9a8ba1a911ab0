//! Flat byte arena backing variables, arrays and strings.
//!
//! Addresses handed to programs are plain cells: `BASE + offset` into one
//! growable buffer. Blocks are contiguous, zero-initialised and live until
//! the arena is dropped, so address arithmetic across element types behaves
//! like it would over raw memory, minus the undefined behaviour: every access
//! is bounds-checked against the arena.

use crate::error::{ErrorKind, ForthError, Result};
use std::collections::HashMap;

/// First valid address; keeps 0 (and small integers) from ever being valid.
pub const BASE: i64 = 0x1000;

/// Upper bound on the total size of the arena.
pub const MAX_BYTES: usize = 1 << 30;

#[derive(Debug, Default)]
pub struct Memory {
    bytes: Vec<u8>,
    interned: HashMap<String, i64>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `size` zeroed bytes and return the address of the first one.
    pub fn allocate(&mut self, size: usize) -> Result<i64> {
        let address = self.reserve(size)?;
        self.bytes.resize(self.bytes.len() + size, 0);
        tracing::trace!(address, size, "allocated block");
        Ok(address)
    }

    pub fn allocate_bytes(&mut self, data: &[u8]) -> Result<i64> {
        let address = self.reserve(data.len())?;
        self.bytes.extend_from_slice(data);
        Ok(address)
    }

    /// Storage for a string literal body, shared by every evaluation of the
    /// same literal text.
    pub fn intern(&mut self, text: &str) -> Result<i64> {
        if let Some(&address) = self.interned.get(text) {
            return Ok(address);
        }
        let address = self.allocate_bytes(text.as_bytes())?;
        self.interned.insert(text.to_string(), address);
        Ok(address)
    }

    /// Make room for `size` more bytes without growing past `MAX_BYTES`;
    /// returns the address the new block will start at.
    fn reserve(&mut self, size: usize) -> Result<i64> {
        let used = self.bytes.len();
        match used.checked_add(size) {
            Some(total) if total <= MAX_BYTES => {}
            _ => return Err(allocation_failed(size, "the arena limit is 1 GiB")),
        }
        self.bytes
            .try_reserve(size)
            .map_err(|e| allocation_failed(size, &e.to_string()))?;
        Ok(BASE + used as i64)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn read(&self, address: i64, len: usize) -> Result<&[u8]> {
        let range = self.range(address, len)?;
        Ok(&self.bytes[range])
    }

    pub fn write(&mut self, address: i64, data: &[u8]) -> Result<()> {
        let range = self.range(address, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    pub fn read_cell(&self, address: i64) -> Result<i64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read(address, 8)?);
        Ok(i64::from_le_bytes(buf))
    }

    pub fn write_cell(&mut self, address: i64, value: i64) -> Result<()> {
        self.write(address, &value.to_le_bytes())
    }

    pub fn read_float(&self, address: i64) -> Result<f64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read(address, 8)?);
        Ok(f64::from_le_bytes(buf))
    }

    pub fn write_float(&mut self, address: i64, value: f64) -> Result<()> {
        self.write(address, &value.to_le_bytes())
    }

    pub fn read_char(&self, address: i64) -> Result<u8> {
        Ok(self.read(address, 1)?[0])
    }

    pub fn write_char(&mut self, address: i64, value: u8) -> Result<()> {
        self.write(address, &[value])
    }

    fn range(&self, address: i64, len: usize) -> Result<std::ops::Range<usize>> {
        let start = address
            .checked_sub(BASE)
            .filter(|offset| *offset >= 0)
            .map(|offset| offset as usize);

        match start {
            Some(start) if start.checked_add(len).is_some_and(|end| end <= self.bytes.len()) => {
                Ok(start..start + len)
            }
            _ => Err(ForthError::runtime(
                ErrorKind::InvalidAddress,
                format!("invalid memory access of {} byte(s) at address {}", len, address),
            )),
        }
    }
}

fn allocation_failed(size: usize, reason: &str) -> ForthError {
    ForthError::runtime(
        ErrorKind::AllocationFailed,
        format!("cannot allocate {} byte(s): {}", size, reason),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_contiguous_and_zeroed() {
        let mut memory = Memory::new();
        let first = memory.allocate(16).unwrap();
        let second = memory.allocate(3).unwrap();
        assert_eq!(first, BASE);
        assert_eq!(second, BASE + 16);
        assert_eq!(memory.read_cell(first + 8).unwrap(), 0);
        assert_eq!(memory.len(), 19);
    }

    #[test]
    fn typed_access_round_trips_and_reinterprets() {
        let mut memory = Memory::new();
        let address = memory.allocate(16).unwrap();
        memory.write_float(address + 8, 2.5).unwrap();
        assert_eq!(memory.read_float(address + 8).unwrap(), 2.5);
        assert_eq!(memory.read_cell(address + 8).unwrap(), 2.5f64.to_bits() as i64);
        memory.write_char(address, b'A').unwrap();
        assert_eq!(memory.read_cell(address).unwrap(), 65);
    }

    #[test]
    fn out_of_arena_access_is_rejected() {
        let mut memory = Memory::new();
        let address = memory.allocate(8).unwrap();
        assert_eq!(memory.read_cell(address + 1).unwrap_err().kind, ErrorKind::InvalidAddress);
        assert!(memory.read_char(0).is_err());
        assert!(memory.write_cell(-5, 1).is_err());
    }

    #[test]
    fn interned_strings_share_storage() {
        let mut memory = Memory::new();
        let a = memory.intern("hello").unwrap();
        let b = memory.intern("hello").unwrap();
        assert_eq!(a, b);
        assert_eq!(memory.read(a, 5).unwrap(), b"hello");
    }

    #[test]
    fn oversized_allocations_fail_without_growing() {
        let mut memory = Memory::new();
        memory.allocate(4).unwrap();
        let error = memory.allocate(usize::MAX).unwrap_err();
        assert_eq!(error.kind, ErrorKind::AllocationFailed);
        assert_eq!(memory.allocate(MAX_BYTES).unwrap_err().kind, ErrorKind::AllocationFailed);
        assert_eq!(memory.len(), 4);
    }
}

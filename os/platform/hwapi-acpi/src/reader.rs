//! Bounds-checked little-endian reader over firmware structures.

use crate::AcpiError;

/// Cursor that extracts little-endian fields from a byte slice.
///
/// Every read checks the remaining length first and fails with
/// [`AcpiError::Truncated`] instead of panicking.
#[derive(Debug, Clone)]
pub struct LeReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> LeReader<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Borrow the next `n` bytes and advance past them.
    ///
    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than `n` bytes remain.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], AcpiError> {
        let bytes = self
            .pos
            .checked_add(n)
            .and_then(|end| self.data.get(self.pos..end))
            .ok_or(AcpiError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            })?;
        self.pos += n;
        Ok(bytes)
    }

    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than `n` bytes remain.
    pub fn skip(&mut self, n: usize) -> Result<(), AcpiError> {
        self.take(n).map(|_| ())
    }

    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than `N` bytes remain.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], AcpiError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// # Errors
    /// [`AcpiError::Truncated`] at the end of input.
    pub fn u8(&mut self) -> Result<u8, AcpiError> {
        Ok(self.take(1)?[0])
    }

    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than 2 bytes remain.
    pub fn u16(&mut self) -> Result<u16, AcpiError> {
        self.array().map(u16::from_le_bytes)
    }

    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than 4 bytes remain.
    pub fn u32(&mut self) -> Result<u32, AcpiError> {
        self.array().map(u32::from_le_bytes)
    }

    /// # Errors
    /// [`AcpiError::Truncated`] if fewer than 8 bytes remain.
    pub fn u64(&mut self) -> Result<u64, AcpiError> {
        self.array().map(u64::from_le_bytes)
    }
}

//! Sensitive resources managed through the registry.
//!
//! Both types clear their memory when dropped. The registry never needs to
//! know about that; releasing its reference is enough.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::types::{RegistryError, Result};

/// Upper limit for a Unicode code point
pub const CODEPOINT_MAX: u32 = 0x10FFFF;

/// Initial capacity of a password buffer, in characters
const PASSWORD_INITIAL_CAPACITY: usize = 32;

// =============================================================================
// Secure Data
// =============================================================================

/// Byte buffer zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureData {
    bytes: Vec<u8>,
}

impl SecureData {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SecureData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureData")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Password Buffer
// =============================================================================

/// Mutable password typed character by character from the scripting side.
///
/// The buffer never reallocates in place: growing copies into a larger
/// buffer and wipes the old one, so no stale copy is left in freed memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PasswordBuffer {
    chars: Vec<char>,
}

impl PasswordBuffer {
    pub fn new() -> Self {
        Self {
            chars: Vec::with_capacity(PASSWORD_INITIAL_CAPACITY),
        }
    }

    /// Number of characters in the password.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Append a character given by its Unicode code point.
    pub fn add_character(&mut self, code_point: u32) -> Result<()> {
        let ch = to_char(code_point)?;
        self.reserve_one();
        self.chars.push(ch);
        Ok(())
    }

    /// Insert a character at `index`.
    pub fn insert_character(&mut self, code_point: u32, index: usize) -> Result<()> {
        let ch = to_char(code_point)?;
        if index > self.chars.len() {
            return Err(RegistryError::InvalidCommand(format!(
                "index {} out of range 0..={}",
                index,
                self.chars.len()
            )));
        }
        self.reserve_one();
        self.chars.insert(index, ch);
        Ok(())
    }

    /// Remove the character at `index`.
    pub fn remove_character_at(&mut self, index: usize) -> Result<()> {
        if index >= self.chars.len() {
            return Err(RegistryError::InvalidCommand(format!(
                "index {} out of range 0..{}",
                index,
                self.chars.len()
            )));
        }
        self.chars.remove(index);
        // Shifted tail leaves a copy of the last character behind.
        if let Some(spare) = self.chars.spare_capacity_mut().first_mut() {
            spare.write('\0');
        }
        Ok(())
    }

    /// Remove the last character, if any.
    pub fn remove_last_character(&mut self) {
        if let Some(mut ch) = self.chars.pop() {
            ch.zeroize();
        }
        if let Some(spare) = self.chars.spare_capacity_mut().first_mut() {
            spare.write('\0');
        }
    }

    /// Remove all characters.
    pub fn clear(&mut self) {
        self.chars.zeroize();
    }

    /// Constant time comparison with another password.
    pub fn is_equal(&self, other: &PasswordBuffer) -> bool {
        if self.chars.len() != other.chars.len() {
            return false;
        }
        self.chars
            .iter()
            .zip(other.chars.iter())
            .fold(0u32, |acc, (a, b)| acc | (*a as u32 ^ *b as u32))
            == 0
    }

    /// UTF-8 encoded copy of the password, wiped when dropped.
    pub fn to_utf8(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(self.chars.len() * 4));
        let mut buf = [0u8; 4];
        for ch in &self.chars {
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
        buf.zeroize();
        out
    }

    fn reserve_one(&mut self) {
        if self.chars.len() < self.chars.capacity() {
            return;
        }
        let mut grown = Vec::with_capacity((self.chars.capacity() * 2).max(PASSWORD_INITIAL_CAPACITY));
        grown.extend_from_slice(&self.chars);
        std::mem::swap(&mut self.chars, &mut grown);
        grown.zeroize();
    }
}

impl Default for PasswordBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PasswordBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordBuffer")
            .field("len", &self.chars.len())
            .finish_non_exhaustive()
    }
}

fn to_char(code_point: u32) -> Result<char> {
    if code_point > CODEPOINT_MAX {
        return Err(RegistryError::InvalidCommand(format!(
            "code point {:#x} above {:#x}",
            code_point, CODEPOINT_MAX
        )));
    }
    char::from_u32(code_point)
        .ok_or_else(|| RegistryError::InvalidCommand(format!("invalid code point {:#x}", code_point)))
}

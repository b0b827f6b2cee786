//! Bounded message buffers.
//!
//! A [Frame] is built by appending typed fields, or filled byte by
//! byte from the wire, and then read back in the same order. There is
//! no length prefix or schema on the wire; the reader has to know what
//! was written. To catch readers that get it wrong, every field keeps
//! the type it was appended with and reads are checked against it.

use super::MAX_MESSAGE_SIZE;

/// The type a field was appended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldType {
    U8,
    /// Little-endian.
    U16,
    /// `NUL`-terminated.
    Str,
    /// A byte pushed straight from the wire, with no known type.
    Raw,
}

impl FieldType {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::Str => "string",
            Self::Raw => "raw",
        }
    }
}

impl core::fmt::Display for FieldType {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// An error building or reading a [Frame].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Appending this field would run into the last buffer slot.
    Overflow { field: FieldType, at: usize },
    /// Reading this field would run past the written data.
    Underrun { field: FieldType, at: usize },
    /// The field at the read cursor was written as another type.
    TypeMismatch {
        expected: FieldType,
        found: FieldType,
        at: usize,
    },
    /// No `NUL` before the end of the written data.
    Unterminated { at: usize },
    /// The string read is not valid UTF-8.
    NotUtf8 { at: usize },
    /// Strings containing `NUL` can't be terminated.
    InteriorNul,
}

impl FrameError {
    /// Process exit code for this error, when it is fatal.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Overflow {
                field: FieldType::U16,
                ..
            } => 76,
            Self::Overflow { .. } => 75,
            _ => 77,
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::Overflow { field, at } => {
                write!(f, "frame overflow appending {} at byte {}", field, at)
            }
            Self::Underrun { field, at } => {
                write!(f, "frame underrun reading {} at byte {}", field, at)
            }
            Self::TypeMismatch {
                expected,
                found,
                at,
            } => write!(
                f,
                "read {} at byte {}, but {} was written there",
                expected, at, found
            ),
            Self::Unterminated { at } => write!(f, "string at byte {} has no terminator", at),
            Self::NotUtf8 { at } => write!(f, "string at byte {} is not utf-8", at),
            Self::InteriorNul => write!(f, "string contains a NUL byte"),
        }
    }
}

/// A message buffer with separate write and read cursors.
#[derive(Clone)]
pub struct Frame<const CAP: usize = MAX_MESSAGE_SIZE> {
    buffer: [u8; CAP],
    fields: [FieldType; CAP],
    field_count: usize,
    write_pos: usize,
    read_pos: usize,
    read_field: usize,
}

impl<const CAP: usize> Frame<CAP> {
    pub const fn new() -> Self {
        Self {
            buffer: [0; CAP],
            fields: [FieldType::Raw; CAP],
            field_count: 0,
            write_pos: 0,
            read_pos: 0,
            read_field: 0,
        }
    }

    /// Physical size of the buffer.
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Number of bytes written so far.
    pub const fn size(&self) -> usize {
        self.write_pos
    }

    pub const fn is_empty(&self) -> bool {
        self.write_pos == 0
    }

    /// Number of written bytes not yet read.
    pub const fn remaining(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// The written part of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.write_pos]
    }

    /// Type tags of the written fields, in order.
    pub fn fields(&self) -> &[FieldType] {
        &self.fields[..self.field_count]
    }

    /// Forget everything written and read. Old bytes stay in the
    /// buffer until they are overwritten, but are never visible.
    pub fn reset(&mut self) {
        self.write_pos = 0;
        self.field_count = 0;
        self.rewind();
    }

    /// Move the read cursor back to the start.
    pub fn rewind(&mut self) {
        self.read_pos = 0;
        self.read_field = 0;
    }

    // the last slot is reserved, so a field of width w fits only if
    // it ends strictly before CAP
    fn reserve(&self, field: FieldType, width: usize) -> Result<usize, FrameError> {
        let at = self.write_pos;
        if at + width > CAP.saturating_sub(1) {
            return Err(FrameError::Overflow { field, at });
        }
        Ok(at)
    }

    fn record(&mut self, field: FieldType, bytes: &[u8]) {
        self.buffer[self.write_pos..self.write_pos + bytes.len()].copy_from_slice(bytes);
        self.write_pos += bytes.len();
        self.fields[self.field_count] = field;
        self.field_count += 1;
    }

    pub fn append_u8(&mut self, val: u8) -> Result<(), FrameError> {
        self.reserve(FieldType::U8, 1)?;
        self.record(FieldType::U8, &[val]);
        Ok(())
    }

    pub fn append_u16(&mut self, val: u16) -> Result<(), FrameError> {
        self.reserve(FieldType::U16, 2)?;
        self.record(FieldType::U16, &val.to_le_bytes());
        Ok(())
    }

    /// Append a string and its `NUL` terminator. Nothing is written
    /// unless the whole string fits.
    pub fn append_str(&mut self, val: &str) -> Result<(), FrameError> {
        let bytes = val.as_bytes();
        if bytes.contains(&0) {
            return Err(FrameError::InteriorNul);
        }

        let at = self.reserve(FieldType::Str, bytes.len() + 1)?;
        self.buffer[at..at + bytes.len()].copy_from_slice(bytes);
        self.buffer[at + bytes.len()] = 0;
        self.write_pos += bytes.len() + 1;
        self.fields[self.field_count] = FieldType::Str;
        self.field_count += 1;
        Ok(())
    }

    /// Append one untyped byte, as received from the wire.
    pub fn push_raw(&mut self, val: u8) -> Result<(), FrameError> {
        self.reserve(FieldType::Raw, 1)?;
        self.record(FieldType::Raw, &[val]);
        Ok(())
    }

    // check that a field of `width` bytes of type `expected` starts at
    // the read cursor. Returns where it starts and how many type tags it
    // covers. Raw bytes satisfy any type, one tag per byte.
    fn check(&self, expected: FieldType, width: usize) -> Result<(usize, usize), FrameError> {
        let at = self.read_pos;
        if at + width > self.write_pos {
            return Err(FrameError::Underrun {
                field: expected,
                at,
            });
        }

        let found = self.fields[self.read_field];
        let consumed = if found == FieldType::Raw {
            let tags = &self.fields[self.read_field..self.read_field + width];
            if let Some(typed) = tags.iter().find(|t| **t != FieldType::Raw) {
                return Err(FrameError::TypeMismatch {
                    expected,
                    found: *typed,
                    at,
                });
            }
            width
        } else if found == expected {
            1
        } else {
            return Err(FrameError::TypeMismatch {
                expected,
                found,
                at,
            });
        };

        Ok((at, consumed))
    }

    fn take(&mut self, expected: FieldType, width: usize) -> Result<usize, FrameError> {
        let (at, consumed) = self.check(expected, width)?;
        self.read_pos += width;
        self.read_field += consumed;
        Ok(at)
    }

    pub fn read_u8(&mut self) -> Result<u8, FrameError> {
        let at = self.take(FieldType::U8, 1)?;
        Ok(self.buffer[at])
    }

    pub fn read_u16(&mut self) -> Result<u16, FrameError> {
        let at = self.take(FieldType::U16, 2)?;
        Ok(u16::from_le_bytes([self.buffer[at], self.buffer[at + 1]]))
    }

    /// Read a string up to (and past) its `NUL` terminator.
    pub fn read_str(&mut self) -> Result<&str, FrameError> {
        let at = self.read_pos;
        let len = self.buffer[at..self.write_pos]
            .iter()
            .position(|b| *b == 0)
            .ok_or(FrameError::Unterminated { at })?;

        // validate before moving the cursor, so a failed read can be retried
        let s = core::str::from_utf8(&self.buffer[at..at + len])
            .map_err(|_| FrameError::NotUtf8 { at })?;
        let (_, consumed) = self.check(FieldType::Str, len + 1)?;
        self.read_pos += len + 1;
        self.read_field += consumed;
        Ok(s)
    }
}

impl<const CAP: usize> Default for Frame<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAP: usize> PartialEq for Frame<CAP> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes() && self.fields() == other.fields()
    }
}

impl<const CAP: usize> Eq for Frame<CAP> {}

/// Raw access to any byte of the buffer, written or not.
impl<const CAP: usize> core::ops::Index<usize> for Frame<CAP> {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.buffer[index]
    }
}

impl<const CAP: usize> core::fmt::Debug for Frame<CAP> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Frame")
            .field("bytes", &self.as_bytes())
            .field("fields", &self.fields())
            .field("read_pos", &self.read_pos)
            .finish()
    }
}

impl<const CAP: usize> core::fmt::Display for Frame<CAP> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "message {} bytes: ", self.size())?;
        for (i, b) in self.as_bytes().iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", b)?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl<const CAP: usize> defmt::Format for Frame<CAP> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "message {} bytes: {}", self.size(), self.as_bytes());
    }
}

// src/core/string_view.rs

use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;

/// Failures of string view operations. None of them mutate the view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// The allocator could not provide `requested` code units.
    #[error("Could not allocate a buffer of {requested} code units.")]
    Allocation { requested: usize },
    /// A reallocation must grow past the current length.
    #[error("Requested capacity {requested} does not exceed the current length {len}.")]
    CapacityTooSmall { requested: usize, len: usize },
    /// The view is constant or its buffer is shared.
    #[error("The view does not exclusively own a writable buffer.")]
    NotWritable,
    /// A write does not fit in the remaining capacity.
    #[error("Writing {needed} code units does not fit in the {available} that remain.")]
    InsufficientCapacity { needed: usize, available: usize },
}

/// Where the characters of a view live.
#[derive(Clone, Default)]
enum Storage {
    #[default]
    Empty,
    /// Borrowed for the life of the program; never written to.
    Constant(&'static str),
    /// A reference-counted allocation. Cloning the view bumps the count.
    Owned(Arc<String>),
}

/// A character range with an explicit length and capacity, optionally owning
/// (a share of) the buffer it points into.
///
/// Lengths are counted in UTF-8 code units. A view is null-terminated when the
/// code unit right after its last character exists in the same buffer and is
/// zero; the tokenizer and assembler both produce views like that.
#[derive(Clone, Default)]
pub struct StringView {
    storage: Storage,
    start: usize,
    len: usize,
}

impl StringView {
    /// An empty, non-owning view.
    pub fn new() -> Self {
        Self::default()
    }

    /// A non-owning view over a literal.
    pub fn constant(text: &'static str) -> Self {
        Self {
            storage: Storage::Constant(text),
            start: 0,
            len: text.len(),
        }
    }

    /// Takes ownership of an existing string.
    pub fn from_string(text: String) -> Self {
        let len = text.len();
        Self {
            storage: Storage::Owned(Arc::new(text)),
            start: 0,
            len,
        }
    }

    /// A view over `len` code units of a shared buffer, starting at `start`.
    pub(crate) fn shared(buffer: &Arc<String>, start: usize, len: usize) -> Self {
        Self {
            storage: Storage::Owned(Arc::clone(buffer)),
            start,
            len,
        }
    }

    /// Replaces the contents with a fresh, empty, exclusively owned buffer able
    /// to hold at least `capacity` code units. On failure `self` is untouched.
    pub fn allocate(&mut self, capacity: usize) -> Result<(), ViewError> {
        let buffer = reserve(capacity)?;
        *self = Self {
            storage: Storage::Owned(Arc::new(buffer)),
            start: 0,
            len: 0,
        };
        Ok(())
    }

    /// Moves the view into a new buffer of at least `capacity` code units,
    /// copying the current characters if `preserve` is set.
    ///
    /// Fails, leaving `self` untouched, when `capacity` does not exceed the
    /// current length or the allocation fails.
    pub fn reallocate(&mut self, capacity: usize, preserve: bool) -> Result<(), ViewError> {
        if capacity <= self.len {
            return Err(ViewError::CapacityTooSmall {
                requested: capacity,
                len: self.len,
            });
        }
        let mut buffer = reserve(capacity)?;
        let len = if preserve {
            buffer.push_str(self.as_str());
            self.len
        } else {
            0
        };
        *self = Self {
            storage: Storage::Owned(Arc::new(buffer)),
            start: 0,
            len,
        };
        Ok(())
    }

    /// Releases this view's share of its buffer and resets it to empty.
    pub fn free_contents(&mut self) {
        *self = Self::default();
    }

    /// The characters in the view.
    pub fn as_str(&self) -> &str {
        let end = self.start + self.len;
        match &self.storage {
            Storage::Empty => "",
            Storage::Constant(text) => text.get(self.start..end).unwrap_or_default(),
            Storage::Owned(buffer) => buffer.get(self.start..end).unwrap_or_default(),
        }
    }

    /// Length in UTF-8 code units.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the view holds no characters.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of code units the view could hold without reallocating.
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Empty => 0,
            Storage::Constant(text) => text.len().saturating_sub(self.start),
            Storage::Owned(buffer) => buffer.capacity().saturating_sub(self.start),
        }
    }

    /// True when the buffer is owned and another view shares it.
    pub fn is_shared(&self) -> bool {
        matches!(&self.storage, Storage::Owned(buffer) if Arc::strong_count(buffer) > 1)
    }

    /// True when a zero code unit directly follows the view in its buffer.
    pub fn is_null_terminated(&self) -> bool {
        let bytes = match &self.storage {
            Storage::Empty => return false,
            Storage::Constant(text) => text.as_bytes(),
            Storage::Owned(buffer) => buffer.as_bytes(),
        };
        self.capacity() > self.len && bytes.get(self.start + self.len) == Some(&0)
    }

    /// A view over part of this one that shares its buffer.
    /// Returns `None` if the range is out of bounds or splits a character.
    pub fn slice(&self, range: Range<usize>) -> Option<Self> {
        self.as_str().get(range.clone())?;
        Some(Self {
            storage: self.storage.clone(),
            start: self.start + range.start,
            len: range.len(),
        })
    }

    /// Appends `text`, failing if it does not fit in the remaining capacity.
    pub fn push_str(&mut self, text: &str) -> Result<(), ViewError> {
        let available = self.capacity().saturating_sub(self.len);
        if text.len() > available {
            return Err(ViewError::InsufficientCapacity {
                needed: text.len(),
                available,
            });
        }
        self.writable_buffer()?.push_str(text);
        self.len += text.len();
        Ok(())
    }

    /// Appends one character, see [`StringView::push_str`].
    pub fn push(&mut self, c: char) -> Result<(), ViewError> {
        let mut utf8 = [0u8; 4];
        self.push_str(c.encode_utf8(&mut utf8))
    }

    /// Drops the characters but keeps the buffer.
    pub fn clear(&mut self) {
        self.len = 0;
        // Trims the buffer back to where this view starts.
        let _ = self.writable_buffer();
    }

    /// Writes a zero code unit after the last character, keeping the length.
    pub fn null_terminate(&mut self) -> Result<(), ViewError> {
        if self.is_null_terminated() {
            return Ok(());
        }
        if self.capacity() <= self.len {
            return Err(ViewError::InsufficientCapacity {
                needed: 1,
                available: 0,
            });
        }
        self.writable_buffer()?.push('\0');
        Ok(())
    }

    /// The owned buffer, trimmed to end where this view ends, if nobody else
    /// can observe a write to it.
    fn writable_buffer(&mut self) -> Result<&mut String, ViewError> {
        let end = self.start + self.len;
        match &mut self.storage {
            Storage::Owned(buffer) => {
                let buffer = Arc::get_mut(buffer).ok_or(ViewError::NotWritable)?;
                buffer.truncate(end);
                Ok(buffer)
            }
            _ => Err(ViewError::NotWritable),
        }
    }
}

/// An empty string with room for at least `capacity` code units.
fn reserve(capacity: usize) -> Result<String, ViewError> {
    let mut buffer = String::new();
    buffer
        .try_reserve_exact(capacity)
        .map_err(|_| ViewError::Allocation {
            requested: capacity,
        })?;
    Ok(buffer)
}

impl AsRef<str> for StringView {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StringView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for StringView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringView")
            .field("text", &self.as_str())
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl PartialEq for StringView {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for StringView {}

impl PartialEq<str> for StringView {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for StringView {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl From<String> for StringView {
    fn from(text: String) -> Self {
        Self::from_string(text)
    }
}

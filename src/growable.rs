use std::ops::Range;

use bytemuck::Pod;

use crate::error::BufferError;

pub const MIN_CAPACITY: usize = 4;
pub const DEFAULT_CAPACITY: usize = 64;

/// Contiguous, order-preserving store of plain-old-data records.
///
/// Capacity is explicit rather than left to `Vec`'s growth policy so it can be mirrored
/// one-to-one by a device buffer. Slots between `len` and `capacity` hold zeroed or stale
/// records and are never exposed.
#[derive(Clone)]
pub struct GrowableBuffer<T: Pod> {
    storage: Vec<T>,
    len: usize,
}

impl<T: Pod> Default for GrowableBuffer<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<T: Pod> GrowableBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { storage: vec![T::zeroed(); capacity.max(MIN_CAPACITY)], len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Resizes the backing store. Requests below [`MIN_CAPACITY`] are clamped up; shrinking
    /// below the current length truncates it.
    pub fn set_capacity(&mut self, capacity: usize) {
        let capacity = capacity.max(MIN_CAPACITY);
        if capacity == self.storage.len() {
            return;
        }
        self.len = self.len.min(capacity);
        self.storage.resize(capacity, T::zeroed());
        self.storage.shrink_to_fit();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// Writes `value` at `index`. Writing at or past the current length extends it to
    /// `index + 1`; skipped slots are zeroed.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), BufferError> {
        if index >= self.capacity() {
            return Err(BufferError::IndexOutOfRange { index, capacity: self.capacity() });
        }
        if index >= self.len {
            self.storage[self.len..index].fill(T::zeroed());
            self.len = index + 1;
        }
        self.storage[index] = value;
        Ok(())
    }

    pub fn push(&mut self, value: T) {
        self.reserve_for(1);
        self.storage[self.len] = value;
        self.len += 1;
    }

    pub fn insert(&mut self, index: usize, value: T) -> Result<(), BufferError> {
        if index > self.len {
            return Err(BufferError::InsertPastEnd { index, len: self.len });
        }
        self.reserve_for(1);
        self.storage.copy_within(index..self.len, index + 1);
        self.storage[index] = value;
        self.len += 1;
        Ok(())
    }

    pub fn extend_from_slice(&mut self, values: &[T]) {
        let start = self.len;
        self.reserve_for(values.len());
        self.storage[start..start + values.len()].copy_from_slice(values);
        self.len += values.len();
    }

    pub fn insert_slice(&mut self, index: usize, values: &[T]) -> Result<(), BufferError> {
        if index > self.len {
            return Err(BufferError::InsertPastEnd { index, len: self.len });
        }
        let count = values.len();
        if count == 0 {
            return Ok(());
        }
        self.reserve_for(count);
        self.storage.copy_within(index..self.len, index + count);
        self.storage[index..index + count].copy_from_slice(values);
        self.len += count;
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        let removed = self.get(index).copied()?;
        self.remove_range(index, 1);
        Some(removed)
    }

    /// Removes up to `count` records starting at `index` and returns how many were removed.
    /// Ranges running past the end are clipped.
    pub fn remove_range(&mut self, index: usize, count: usize) -> usize {
        if index >= self.len {
            return 0;
        }
        let removed = count.min(self.len - index);
        self.storage.copy_within(index + removed..self.len, index);
        self.len -= removed;
        removed
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.storage[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    /// Byte view of `range` (in elements), clipped to the current length.
    pub fn range_bytes(&self, range: Range<usize>) -> &[u8] {
        let end = range.end.min(self.len);
        let start = range.start.min(end);
        bytemuck::cast_slice(&self.storage[start..end])
    }

    fn reserve_for(&mut self, extra: usize) {
        let required = self.len + extra;
        let capacity = self.capacity();
        if required > capacity {
            self.set_capacity(required.max(capacity * 2));
        }
    }
}

impl<'a, T: Pod> IntoIterator for &'a GrowableBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

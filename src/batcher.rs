use std::ops::Range;

use anyhow::{Context, Result};

use crate::backend::{BufferHandle, BufferKind, MaterialHandle, MeshHandle, MeshInfo, RenderBackend, RenderState};
use crate::error::BufferError;
use crate::growable::GrowableBuffer;
use crate::records::{DrawIndexedIndirectArgs, InstanceRecord};

/// Element count of the indirect argument buffer.
pub const ARGS_LEN: usize = 5;

/// Union of element ranges touched since the last upload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyRange {
    start: usize,
    end: usize,
}

impl DirtyRange {
    pub const EMPTY: Self = Self { start: 0, end: 0 };

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn range(&self) -> Option<Range<usize>> {
        (!self.is_empty()).then_some(self.start..self.end)
    }

    pub fn mark(&mut self, range: Range<usize>) {
        if range.start >= range.end {
            return;
        }
        if self.is_empty() {
            self.start = range.start;
            self.end = range.end;
        } else {
            self.start = self.start.min(range.start);
            self.end = self.end.max(range.end);
        }
    }

    pub fn take(&mut self) -> Option<Range<usize>> {
        let range = self.range();
        *self = Self::EMPTY;
        range
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatcherStats {
    pub draws: u64,
    pub uploads: u64,
    pub bytes_uploaded: u64,
    pub args_updates: u64,
    pub reallocations: u64,
}

/// CPU-side instance list mirrored into a device buffer and drawn with one indirect call.
///
/// Every mutation widens a dirty range; [`InstanceBatcher::draw`] uploads only that span.
pub struct InstanceBatcher<T: InstanceRecord> {
    records: GrowableBuffer<T>,
    dirty: DirtyRange,
    args: DrawIndexedIndirectArgs,
    args_buffer: BufferHandle,
    instance_buffer: BufferHandle,
    device_capacity: usize,
    material: MaterialHandle,
    mesh: MeshHandle,
    slot: String,
    pub state: RenderState,
    stats: BatcherStats,
}

impl<T: InstanceRecord> InstanceBatcher<T> {
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        material: MaterialHandle,
        mesh: &MeshInfo,
        submesh: usize,
        state: RenderState,
        initial_capacity: usize,
    ) -> Result<Self> {
        let sub = mesh.submesh(submesh);
        let args = DrawIndexedIndirectArgs {
            index_count: sub.index_count,
            instance_count: 0,
            first_index: sub.index_start,
            base_vertex: sub.base_vertex,
            first_instance: 0,
        };
        let args_buffer = backend
            .create_buffer(BufferKind::IndirectArgs, ARGS_LEN, std::mem::size_of::<u32>())
            .context("creating indirect args buffer")?;
        let records = GrowableBuffer::with_capacity(initial_capacity);
        let slot = T::property_slot();
        let instance_buffer = backend
            .write_buffer(args_buffer, 0, bytemuck::bytes_of(&args))
            .context("seeding indirect args")
            .and_then(|()| Self::bind_instance_buffer(backend, material, &slot, records.capacity()));
        let instance_buffer = match instance_buffer {
            Ok(buffer) => buffer,
            Err(err) => {
                backend.release_buffer(args_buffer);
                return Err(err);
            }
        };

        Ok(Self {
            device_capacity: records.capacity(),
            records,
            dirty: DirtyRange::EMPTY,
            args,
            args_buffer,
            instance_buffer,
            material,
            mesh: mesh.handle,
            slot,
            state,
            stats: BatcherStats::default(),
        })
    }

    /// Creates a structured buffer and binds it to `slot`; nothing stays allocated on failure.
    fn bind_instance_buffer<B: RenderBackend + ?Sized>(
        backend: &mut B,
        material: MaterialHandle,
        slot: &str,
        capacity: usize,
    ) -> Result<BufferHandle> {
        let buffer = backend
            .create_buffer(BufferKind::Structured, capacity, std::mem::size_of::<T>())
            .with_context(|| format!("creating instance buffer for {slot}"))?;
        if let Err(err) = backend.bind_buffer(material, slot, buffer) {
            backend.release_buffer(buffer);
            return Err(err.context(format!("binding instance buffer to {slot}")));
        }
        Ok(buffer)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    /// Resizes the CPU store; the device copy follows on the next draw.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.records.set_capacity(capacity);
    }

    pub fn records(&self) -> &[T] {
        self.records.as_slice()
    }

    pub fn dirty_range(&self) -> Option<Range<usize>> {
        self.dirty.range()
    }

    pub fn args(&self) -> DrawIndexedIndirectArgs {
        self.args
    }

    pub fn args_buffer(&self) -> BufferHandle {
        self.args_buffer
    }

    pub fn instance_buffer(&self) -> BufferHandle {
        self.instance_buffer
    }

    pub fn device_capacity(&self) -> usize {
        self.device_capacity
    }

    pub fn property_slot(&self) -> &str {
        &self.slot
    }

    pub fn stats(&self) -> BatcherStats {
        self.stats
    }

    pub fn push(&mut self, record: T) {
        let index = self.records.len();
        self.records.push(record);
        self.dirty.mark(index..self.records.len());
    }

    pub fn set(&mut self, index: usize, record: T) -> Result<(), BufferError> {
        let old_len = self.records.len();
        self.records.set(index, record)?;
        // Zeroed gap slots between the old length and `index` must reach the device too.
        self.dirty.mark(old_len.min(index)..index + 1);
        Ok(())
    }

    pub fn insert(&mut self, index: usize, record: T) -> Result<(), BufferError> {
        self.records.insert(index, record)?;
        self.dirty.mark(index..self.records.len());
        Ok(())
    }

    pub fn extend_from_slice(&mut self, records: &[T]) {
        let index = self.records.len();
        self.records.extend_from_slice(records);
        self.dirty.mark(index..self.records.len());
    }

    pub fn insert_slice(&mut self, index: usize, records: &[T]) -> Result<(), BufferError> {
        self.records.insert_slice(index, records)?;
        self.dirty.mark(index..self.records.len());
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        let removed = self.records.remove_at(index)?;
        self.dirty.mark(index..self.records.len());
        Some(removed)
    }

    pub fn remove_range(&mut self, index: usize, count: usize) -> usize {
        let removed = self.records.remove_range(index, count);
        if removed > 0 {
            self.dirty.mark(index..self.records.len());
        }
        removed
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.dirty = DirtyRange::EMPTY;
    }

    /// Synchronizes the device copy and issues the indirect draw. Returns `false` when there
    /// was nothing to draw.
    pub fn draw<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<bool> {
        let len = self.records.len();
        if len == 0 {
            return Ok(false);
        }

        if self.args.instance_count as usize != len {
            self.args.instance_count = len as u32;
            backend
                .write_buffer(self.args_buffer, 0, bytemuck::bytes_of(&self.args))
                .with_context(|| format!("updating indirect args for {}", self.slot))?;
            self.stats.args_updates += 1;
        }

        let capacity = self.records.capacity();
        if self.device_capacity != capacity {
            backend.release_buffer(self.instance_buffer);
            self.instance_buffer = Self::bind_instance_buffer(backend, self.material, &self.slot, capacity)
                .with_context(|| format!("reallocating instance buffer for {}", self.slot))?;
            log::trace!("{}: device buffer {} -> {} records", self.slot, self.device_capacity, capacity);
            self.device_capacity = capacity;
            self.dirty = DirtyRange::EMPTY;
            self.dirty.mark(0..len);
            self.stats.reallocations += 1;
        }

        if let Some(range) = self.dirty.take() {
            let stride = std::mem::size_of::<T>();
            let bytes = self.records.range_bytes(range.clone());
            if !bytes.is_empty() {
                let buffer = self.instance_buffer;
                backend
                    .write_buffer(buffer, (range.start * stride) as u64, bytes)
                    .with_context(|| format!("uploading records {range:?} for {}", self.slot))?;
                log::trace!("{}: uploaded records {range:?} ({} bytes)", self.slot, bytes.len());
                self.stats.uploads += 1;
                self.stats.bytes_uploaded += bytes.len() as u64;
            }
        }

        backend.draw_indexed_indirect(&self.state, self.material, self.mesh, self.args_buffer)?;
        self.stats.draws += 1;
        Ok(true)
    }

    /// Frees both device buffers.
    pub fn release<B: RenderBackend + ?Sized>(self, backend: &mut B) {
        backend.release_buffer(self.args_buffer);
        backend.release_buffer(self.instance_buffer);
    }
}

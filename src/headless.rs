use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};

use crate::backend::{BufferHandle, BufferKind, MaterialHandle, MeshHandle, RenderBackend, RenderState};
use crate::records::DrawIndexedIndirectArgs;

#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    Create { buffer: BufferHandle, kind: BufferKind, capacity: usize, stride: usize },
    Write { buffer: BufferHandle, byte_offset: u64, len: usize },
    Bind { material: MaterialHandle, slot: String, buffer: BufferHandle },
    Draw { layer: u32, material: MaterialHandle, mesh: MeshHandle, args: DrawIndexedIndirectArgs },
    Release { buffer: BufferHandle },
}

struct HeadlessBuffer {
    kind: BufferKind,
    stride: usize,
    bytes: Vec<u8>,
}

/// CPU-only backend that mirrors buffer contents and records every call.
///
/// Used for tests and for running the batching pass without a device.
#[derive(Default)]
pub struct HeadlessBackend {
    buffers: HashMap<BufferHandle, HeadlessBuffer>,
    bindings: HashMap<(MaterialHandle, String), BufferHandle>,
    calls: Vec<BackendCall>,
    next_id: u32,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffer_bytes(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.bytes.as_slice())
    }

    /// Capacity of `buffer` in elements.
    pub fn buffer_capacity(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffers.get(&buffer).map(|b| b.bytes.len() / b.stride.max(1))
    }

    pub fn buffer_kind(&self, buffer: BufferHandle) -> Option<BufferKind> {
        self.buffers.get(&buffer).map(|b| b.kind)
    }

    pub fn bound_buffer(&self, material: MaterialHandle, slot: &str) -> Option<BufferHandle> {
        self.bindings.get(&(material, slot.to_string())).copied()
    }

    /// Reads element `index` of a structured buffer back as `T`.
    pub fn read_element<T: bytemuck::Pod>(&self, buffer: BufferHandle, index: usize) -> Option<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.buffer_bytes(buffer)?;
        let start = index * size;
        bytes.get(start..start + size).map(bytemuck::pod_read_unaligned)
    }

    pub fn writes_to(&self, buffer: BufferHandle) -> Vec<(u64, usize)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Write { buffer: b, byte_offset, len } if *b == buffer => Some((*byte_offset, *len)),
                _ => None,
            })
            .collect()
    }

    pub fn draws(&self) -> Vec<DrawIndexedIndirectArgs> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Draw { args, .. } => Some(*args),
                _ => None,
            })
            .collect()
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_buffer(&mut self, kind: BufferKind, capacity: usize, stride: usize) -> Result<BufferHandle> {
        if stride == 0 {
            bail!("cannot create a {kind:?} buffer with zero stride");
        }
        let buffer = BufferHandle(self.next_id);
        self.next_id += 1;
        self.buffers.insert(buffer, HeadlessBuffer { kind, stride, bytes: vec![0; capacity * stride] });
        self.calls.push(BackendCall::Create { buffer, kind, capacity, stride });
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, byte_offset: u64, bytes: &[u8]) -> Result<()> {
        let target = self.buffers.get_mut(&buffer).ok_or_else(|| anyhow!("write to unknown buffer {buffer:?}"))?;
        let start = byte_offset as usize;
        let end = start + bytes.len();
        if end > target.bytes.len() {
            bail!("write of {} bytes at {} overflows buffer {:?} ({} bytes)", bytes.len(), start, buffer, target.bytes.len());
        }
        target.bytes[start..end].copy_from_slice(bytes);
        self.calls.push(BackendCall::Write { buffer, byte_offset, len: bytes.len() });
        Ok(())
    }

    fn bind_buffer(&mut self, material: MaterialHandle, slot: &str, buffer: BufferHandle) -> Result<()> {
        if !self.buffers.contains_key(&buffer) {
            bail!("cannot bind unknown buffer {buffer:?} to '{slot}'");
        }
        self.bindings.insert((material, slot.to_string()), buffer);
        self.calls.push(BackendCall::Bind { material, slot: slot.to_string(), buffer });
        Ok(())
    }

    fn draw_indexed_indirect(
        &mut self,
        state: &RenderState,
        material: MaterialHandle,
        mesh: MeshHandle,
        args: BufferHandle,
    ) -> Result<()> {
        let bytes = self.buffer_bytes(args).ok_or_else(|| anyhow!("draw with unknown args buffer {args:?}"))?;
        let size = std::mem::size_of::<DrawIndexedIndirectArgs>();
        if bytes.len() < size {
            bail!("args buffer {args:?} holds {} bytes, expected at least {size}", bytes.len());
        }
        let args_value: DrawIndexedIndirectArgs = bytemuck::pod_read_unaligned(&bytes[..size]);
        self.calls.push(BackendCall::Draw { layer: state.layer, material, mesh, args: args_value });
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        self.bindings.retain(|_, bound| *bound != buffer);
        self.calls.push(BackendCall::Release { buffer });
    }
}

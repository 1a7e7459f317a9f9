//! `wgpu` implementation of [`RenderBackend`].
//!
//! Buffers live on the device; draws are queued during the batching pass and replayed into
//! a render pass with [`WgpuBackend::encode_pass`].

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};

use crate::backend::{BufferHandle, BufferKind, MaterialHandle, MeshHandle, RenderBackend, RenderState};

/// Pipeline plus the storage-buffer bindings it expects, keyed by property slot.
pub struct WgpuMaterial {
    pub pipeline: wgpu::RenderPipeline,
    pub layout: wgpu::BindGroupLayout,
    pub group: u32,
    pub slots: HashMap<String, u32>,
}

pub struct WgpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_format: wgpu::IndexFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    Color,
    Shadow,
}

struct QueuedDraw {
    state: RenderState,
    material: MaterialHandle,
    mesh: MeshHandle,
    args: BufferHandle,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: HashMap<BufferHandle, wgpu::Buffer>,
    next_buffer: u32,
    materials: Vec<WgpuMaterial>,
    meshes: Vec<WgpuMesh>,
    bindings: HashMap<(MaterialHandle, u32), BufferHandle>,
    bind_groups: HashMap<MaterialHandle, wgpu::BindGroup>,
    queued: Vec<QueuedDraw>,
}

impl WgpuBackend {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
            buffers: HashMap::new(),
            next_buffer: 0,
            materials: Vec::new(),
            meshes: Vec::new(),
            bindings: HashMap::new(),
            bind_groups: HashMap::new(),
            queued: Vec::new(),
        }
    }

    pub fn register_material(&mut self, material: WgpuMaterial) -> MaterialHandle {
        self.materials.push(material);
        MaterialHandle(self.materials.len() as u32 - 1)
    }

    pub fn register_mesh(&mut self, mesh: WgpuMesh) -> MeshHandle {
        self.meshes.push(mesh);
        MeshHandle(self.meshes.len() as u32 - 1)
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(&handle)
    }

    pub fn queued_draws(&self) -> usize {
        self.queued.len()
    }

    /// Replays the draws queued this frame that belong to `kind`, ordered by layer.
    pub fn encode_pass(&self, pass: &mut wgpu::RenderPass<'_>, kind: PassKind) -> Result<()> {
        let mut draws: Vec<&QueuedDraw> = self
            .queued
            .iter()
            .filter(|draw| match kind {
                PassKind::Color => draw.state.shadow_mode.draws_color(),
                PassKind::Shadow => draw.state.shadow_mode.casts_shadows(),
            })
            .collect();
        draws.sort_by_key(|draw| draw.state.layer);

        for draw in draws {
            let material = self.material(draw.material)?;
            let bind_group = self
                .bind_groups
                .get(&draw.material)
                .with_context(|| format!("material {:?} has unbound slots", draw.material))?;
            let mesh = self.meshes.get(draw.mesh.0 as usize).context("Billboard mesh missing")?;
            let args = self.buffers.get(&draw.args).context("Indirect args buffer missing")?;
            pass.set_pipeline(&material.pipeline);
            pass.set_bind_group(material.group, bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), mesh.index_format);
            pass.draw_indexed_indirect(args, 0);
        }
        Ok(())
    }

    /// Drops this frame's queued draws.
    pub fn finish_frame(&mut self) {
        self.queued.clear();
    }

    fn material(&self, handle: MaterialHandle) -> Result<&WgpuMaterial> {
        self.materials.get(handle.0 as usize).ok_or_else(|| anyhow!("unknown material {handle:?}"))
    }

    fn rebuild_bind_group(&mut self, handle: MaterialHandle) -> Result<()> {
        let material = self.materials.get(handle.0 as usize).ok_or_else(|| anyhow!("unknown material {handle:?}"))?;
        let mut entries = Vec::with_capacity(material.slots.len());
        for &binding in material.slots.values() {
            let Some(buffer) = self.bindings.get(&(handle, binding)).and_then(|b| self.buffers.get(b)) else {
                self.bind_groups.remove(&handle);
                return Ok(());
            };
            entries.push(wgpu::BindGroupEntry { binding, resource: buffer.as_entire_binding() });
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Billboard Instance Bind Group"),
            layout: &material.layout,
            entries: &entries,
        });
        self.bind_groups.insert(handle, bind_group);
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    fn create_buffer(&mut self, kind: BufferKind, capacity: usize, stride: usize) -> Result<BufferHandle> {
        let size = (capacity * stride) as u64;
        if size == 0 || size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            bail!("invalid {kind:?} buffer size {size} ({capacity} x {stride})");
        }
        let (label, usage) = match kind {
            BufferKind::IndirectArgs => {
                ("Billboard Indirect Args", wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST)
            }
            BufferKind::Structured => {
                ("Billboard Instance Buffer", wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST)
            }
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });
        let handle = BufferHandle(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(handle, buffer);
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, byte_offset: u64, bytes: &[u8]) -> Result<()> {
        let target = self.buffers.get(&buffer).with_context(|| format!("write to unknown buffer {buffer:?}"))?;
        if byte_offset + bytes.len() as u64 > target.size() {
            bail!("write of {} bytes at {byte_offset} overflows buffer {buffer:?}", bytes.len());
        }
        self.queue.write_buffer(target, byte_offset, bytes);
        Ok(())
    }

    fn bind_buffer(&mut self, material: MaterialHandle, slot: &str, buffer: BufferHandle) -> Result<()> {
        let binding = *self
            .material(material)?
            .slots
            .get(slot)
            .with_context(|| format!("material {material:?} has no slot '{slot}'"))?;
        self.bindings.insert((material, binding), buffer);
        self.rebuild_bind_group(material)
    }

    fn draw_indexed_indirect(
        &mut self,
        state: &RenderState,
        material: MaterialHandle,
        mesh: MeshHandle,
        args: BufferHandle,
    ) -> Result<()> {
        self.material(material)?;
        if !self.buffers.contains_key(&args) {
            bail!("draw with unknown args buffer {args:?}");
        }
        self.queued.push(QueuedDraw { state: *state, material, mesh, args });
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(&buffer) {
            buffer.destroy();
        }
        self.bindings.retain(|_, bound| *bound != buffer);
    }
}

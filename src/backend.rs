//! Seam between the batchers and whatever executes the draws.
//!
//! Batchers never own device objects directly; they hold opaque handles issued by a
//! [`RenderBackend`] and call back into it to resize, upload, bind and draw.

use anyhow::Result;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    /// Indirect draw arguments.
    IndirectArgs,
    /// Structured per-instance records read by the shader.
    Structured,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowMode {
    #[default]
    Off,
    ShadowsOnly,
    On,
}

impl ShadowMode {
    pub fn casts_shadows(self) -> bool {
        !matches!(self, ShadowMode::Off)
    }

    pub fn draws_color(self) -> bool {
        !matches!(self, ShadowMode::ShadowsOnly)
    }
}

/// Per-category draw parameters.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct RenderState {
    #[serde(default)]
    pub layer: u32,
    #[serde(default)]
    pub shadow_mode: ShadowMode,
    #[serde(default)]
    pub receive_shadows: bool,
    #[serde(default = "RenderState::default_bounds_extent")]
    pub bounds_extent: f32,
}

impl RenderState {
    const fn default_bounds_extent() -> f32 {
        1024.0
    }

    pub fn with_shadow_mode(mut self, shadow_mode: ShadowMode) -> Self {
        self.shadow_mode = shadow_mode;
        self
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            layer: 0,
            shadow_mode: ShadowMode::On,
            receive_shadows: true,
            bounds_extent: Self::default_bounds_extent(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubMesh {
    pub index_count: u32,
    pub index_start: u32,
    pub base_vertex: i32,
}

/// Mesh reference plus the index ranges needed to fill indirect arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshInfo {
    pub handle: MeshHandle,
    pub submeshes: Vec<SubMesh>,
}

impl MeshInfo {
    pub fn single(handle: MeshHandle, index_count: u32) -> Self {
        Self { handle, submeshes: vec![SubMesh { index_count, index_start: 0, base_vertex: 0 }] }
    }

    pub fn submesh(&self, index: usize) -> SubMesh {
        self.submeshes.get(index).copied().unwrap_or_default()
    }
}

pub trait RenderBackend {
    fn create_buffer(&mut self, kind: BufferKind, capacity: usize, stride: usize) -> Result<BufferHandle>;

    /// Copies `bytes` into `buffer` starting at `byte_offset`.
    fn write_buffer(&mut self, buffer: BufferHandle, byte_offset: u64, bytes: &[u8]) -> Result<()>;

    fn bind_buffer(&mut self, material: MaterialHandle, slot: &str, buffer: BufferHandle) -> Result<()>;

    fn draw_indexed_indirect(
        &mut self,
        state: &RenderState,
        material: MaterialHandle,
        mesh: MeshHandle,
        args: BufferHandle,
    ) -> Result<()>;

    fn release_buffer(&mut self, buffer: BufferHandle);
}

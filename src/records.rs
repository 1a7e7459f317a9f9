use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

use crate::atlas::AtlasRect;

/// A fixed-layout record that can be streamed into a device buffer.
pub trait InstanceRecord: Pod {
    /// Material property name the device buffer is bound to, e.g. `_CreatureInstance`.
    fn property_slot() -> String {
        let name = std::any::type_name::<Self>();
        let short = name.rsplit("::").next().unwrap_or(name);
        format!("_{short}")
    }
}

macro_rules! sprite_record {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
        pub struct $name {
            pub position: [f32; 3],
            pub rotation: [f32; 4],
            pub scale: [f32; 3],
            pub tiling: [f32; 2],
            pub offset: [f32; 2],
            pub color: [f32; 3],
            pub emission: f32,
            pub alpha: f32,
        }

        impl $name {
            /// Load-time attributes for one atlas frame: identity pose, white tint, opaque.
            pub fn from_atlas_rect(rect: &AtlasRect, pixels_per_unit: f32) -> Self {
                let ppu = pixels_per_unit.max(f32::EPSILON);
                Self {
                    position: [0.0; 3],
                    rotation: Quat::IDENTITY.to_array(),
                    scale: [rect.size[0] / ppu, rect.size[1] / ppu, 1.0 / ppu],
                    tiling: rect.tiling,
                    offset: rect.offset,
                    color: [1.0; 3],
                    emission: 0.0,
                    alpha: 1.0,
                }
            }

            pub fn placed(mut self, position: Vec3, rotation: Quat, alpha: f32) -> Self {
                self.position = position.to_array();
                self.rotation = rotation.to_array();
                self.alpha = alpha;
                self
            }

            /// Mirrors the sampled region horizontally by negating the U tiling.
            pub fn flip_x(&mut self) {
                self.offset[0] += self.tiling[0];
                self.tiling[0] = -self.tiling[0];
            }
        }

        impl InstanceRecord for $name {}
    };
}

sprite_record!(
    /// Per-instance attributes of a directional creature billboard.
    CreatureInstance
);

sprite_record!(
    /// Per-instance attributes of a particle billboard.
    ParticleInstance
);

/// Invisible proxy that only casts a shadow under a creature.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShadowProxyInstance {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl ShadowProxyInstance {
    pub fn new(position: Vec3, scale: Vec3) -> Self {
        Self { position: position.to_array(), rotation: Quat::IDENTITY.to_array(), scale: scale.to_array() }
    }
}

impl InstanceRecord for ShadowProxyInstance {}

/// Arguments consumed by `draw_indexed_indirect`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

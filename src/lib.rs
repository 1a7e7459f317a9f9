pub mod atlas;
pub mod backend;
pub mod batcher;
pub mod config;
pub mod direction;
pub mod driver;
pub mod error;
pub mod frame_index;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod growable;
pub mod headless;
pub mod records;

pub use atlas::{AnimationType, AtlasMap, AtlasRect, CreatureType, ParticleType};
pub use backend::{
    BufferHandle, BufferKind, MaterialHandle, MeshHandle, MeshInfo, RenderBackend, RenderState, ShadowMode, SubMesh,
};
pub use batcher::{BatcherStats, DirtyRange, InstanceBatcher};
pub use config::BillboardConfig;
pub use direction::{resolve_direction, yaw_degrees, Direction};
pub use driver::{BillboardDriver, BillboardResources, CreatureView, FrameStats, ParticleView};
pub use error::BufferError;
pub use frame_index::{select_frame, CompositeKey, FrameIndex};
pub use growable::GrowableBuffer;
pub use headless::HeadlessBackend;
pub use records::{CreatureInstance, DrawIndexedIndirectArgs, InstanceRecord, ParticleInstance, ShadowProxyInstance};

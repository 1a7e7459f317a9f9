//! Per-frame batching pass: resolves each live instance to an atlas frame and streams the
//! resulting records into the creature, particle and shadow batchers.

use anyhow::{Context, Result};
use glam::{Quat, Vec3};

use crate::atlas::{AnimationType, AtlasMap, CreatureType, ParticleType};
use crate::backend::{MaterialHandle, MeshInfo, RenderBackend};
use crate::batcher::InstanceBatcher;
use crate::config::BillboardConfig;
use crate::direction::{resolve_direction, yaw_degrees, Direction};
use crate::frame_index::{
    build_creature_index, build_particle_index, CompositeKey, CreatureFrameIndex, FrameIndex, ParticleFrameIndex,
    CREATURE_DEPTH, PARTICLE_DEPTH,
};
use crate::records::{CreatureInstance, ParticleInstance, ShadowProxyInstance};

/// Snapshot of one creature as produced by the simulation.
#[derive(Clone, Copy, Debug)]
pub struct CreatureView {
    pub creature_type: CreatureType,
    pub animation: AnimationType,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Seconds since the instance's animation clock started.
    pub time_offset: f32,
    /// Fade-in/out opacity in `[0, 1]`.
    pub opacity: f32,
}

impl Default for CreatureView {
    fn default() -> Self {
        Self {
            creature_type: CreatureType::None,
            animation: AnimationType::Idle,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            time_offset: 0.0,
            opacity: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ParticleView {
    pub particle_type: ParticleType,
    pub position: Vec3,
    pub time_offset: f32,
    pub opacity: f32,
}

impl Default for ParticleView {
    fn default() -> Self {
        Self { particle_type: ParticleType::None, position: Vec3::ZERO, time_offset: 0.0, opacity: 1.0 }
    }
}

/// Device-side objects owned by the rendering layer.
#[derive(Clone, Debug)]
pub struct BillboardResources {
    pub creature_material: MaterialHandle,
    pub particle_material: MaterialHandle,
    pub shadow_material: MaterialHandle,
    pub quad_mesh: MeshInfo,
    pub sphere_mesh: MeshInfo,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CreatureResolution {
    pub direction: Direction,
    pub frame: usize,
    pub record: CreatureInstance,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub creatures: u32,
    pub particles: u32,
    pub shadow_proxies: u32,
    pub flipped: u32,
    pub draw_calls: u32,
}

impl FrameStats {
    pub fn merge(self, other: FrameStats) -> FrameStats {
        FrameStats {
            creatures: self.creatures + other.creatures,
            particles: self.particles + other.particles,
            shadow_proxies: self.shadow_proxies + other.shadow_proxies,
            flipped: self.flipped + other.flipped,
            draw_calls: self.draw_calls + other.draw_calls,
        }
    }
}

struct Batchers {
    creature: InstanceBatcher<CreatureInstance>,
    particle: InstanceBatcher<ParticleInstance>,
    shadow: InstanceBatcher<ShadowProxyInstance>,
}

pub struct BillboardDriver {
    config: BillboardConfig,
    creatures: CreatureFrameIndex,
    particles: ParticleFrameIndex,
    batchers: Option<Batchers>,
}

impl BillboardDriver {
    pub fn new(config: BillboardConfig) -> Self {
        Self {
            config: config.sanitized(),
            creatures: FrameIndex::new(CREATURE_DEPTH),
            particles: FrameIndex::new(PARTICLE_DEPTH),
            batchers: None,
        }
    }

    pub fn config(&self) -> &BillboardConfig {
        &self.config
    }

    pub fn creature_index(&self) -> &CreatureFrameIndex {
        &self.creatures
    }

    pub fn particle_index(&self) -> &ParticleFrameIndex {
        &self.particles
    }

    /// Rebuilds both frame indices from scratch.
    pub fn load_atlases(&mut self, creature_atlas: &AtlasMap, particle_atlas: &AtlasMap) {
        let ppu = self.config.pixels_per_unit;
        self.creatures = build_creature_index(creature_atlas, ppu);
        self.particles = build_particle_index(particle_atlas, ppu);
    }

    pub fn is_enabled(&self) -> bool {
        self.batchers.is_some()
    }

    /// Creates the device buffers for all three batchers.
    pub fn enable<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        resources: &BillboardResources,
    ) -> Result<()> {
        self.disable(backend);
        let capacity = self.config.initial_capacity;
        let creature: InstanceBatcher<CreatureInstance> = InstanceBatcher::new(
            backend,
            resources.creature_material,
            &resources.quad_mesh,
            0,
            self.config.creature,
            capacity,
        )
        .context("creating creature batcher")?;
        let particle: InstanceBatcher<ParticleInstance> = match InstanceBatcher::new(
            backend,
            resources.particle_material,
            &resources.quad_mesh,
            0,
            self.config.particle,
            capacity,
        ) {
            Ok(batcher) => batcher,
            Err(err) => {
                creature.release(backend);
                return Err(err.context("creating particle batcher"));
            }
        };
        let shadow: InstanceBatcher<ShadowProxyInstance> = match InstanceBatcher::new(
            backend,
            resources.shadow_material,
            &resources.sphere_mesh,
            0,
            self.config.shadow,
            capacity,
        ) {
            Ok(batcher) => batcher,
            Err(err) => {
                creature.release(backend);
                particle.release(backend);
                return Err(err.context("creating shadow batcher"));
            }
        };
        self.batchers = Some(Batchers { creature, particle, shadow });
        log::debug!("billboard batchers enabled (capacity {capacity})");
        Ok(())
    }

    /// Releases every device buffer. Safe to call when already disabled.
    pub fn disable<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(batchers) = self.batchers.take() {
            batchers.creature.release(backend);
            batchers.particle.release(backend);
            batchers.shadow.release(backend);
            log::debug!("billboard batchers released");
        }
    }

    pub fn creature_batcher(&self) -> Option<&InstanceBatcher<CreatureInstance>> {
        self.batchers.as_ref().map(|b| &b.creature)
    }

    pub fn particle_batcher(&self) -> Option<&InstanceBatcher<ParticleInstance>> {
        self.batchers.as_ref().map(|b| &b.particle)
    }

    pub fn shadow_batcher(&self) -> Option<&InstanceBatcher<ShadowProxyInstance>> {
        self.batchers.as_ref().map(|b| &b.shadow)
    }

    pub fn resolve_creature(&self, creature: &CreatureView, camera_rotation: Quat) -> CreatureResolution {
        resolve_creature(&self.creatures, creature, camera_rotation, yaw_degrees(camera_rotation))
    }

    pub fn resolve_particle(&self, particle: &ParticleView, camera_rotation: Quat) -> ParticleInstance {
        resolve_particle(&self.particles, particle, camera_rotation)
    }

    pub fn draw_creatures<'a, B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        camera_rotation: Quat,
        creatures: impl IntoIterator<Item = &'a CreatureView>,
    ) -> Result<FrameStats> {
        let mut stats = FrameStats::default();
        let Some(batchers) = self.batchers.as_mut() else {
            return Ok(stats);
        };
        let camera_yaw = yaw_degrees(camera_rotation);
        for creature in creatures {
            let resolved = resolve_creature(&self.creatures, creature, camera_rotation, camera_yaw);
            batchers.creature.push(resolved.record);
            batchers.shadow.push(ShadowProxyInstance::new(creature.position, creature.scale));
            stats.creatures += 1;
            stats.shadow_proxies += 1;
            stats.flipped += u32::from(resolved.direction.flip_x);
        }

        // Clear before propagating so a failed frame does not leak records into the next.
        let creature_drawn = batchers.creature.draw(backend);
        let shadow_drawn = batchers.shadow.draw(backend);
        batchers.creature.clear();
        batchers.shadow.clear();
        stats.draw_calls += u32::from(creature_drawn.context("drawing creatures")?);
        stats.draw_calls += u32::from(shadow_drawn.context("drawing creature shadows")?);
        Ok(stats)
    }

    pub fn draw_particles<'a, B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        camera_rotation: Quat,
        particles: impl IntoIterator<Item = &'a ParticleView>,
    ) -> Result<FrameStats> {
        let mut stats = FrameStats::default();
        let Some(batchers) = self.batchers.as_mut() else {
            return Ok(stats);
        };
        for particle in particles {
            batchers.particle.push(resolve_particle(&self.particles, particle, camera_rotation));
            stats.particles += 1;
        }
        let drawn = batchers.particle.draw(backend);
        batchers.particle.clear();
        stats.draw_calls += u32::from(drawn.context("drawing particles")?);
        Ok(stats)
    }

    /// Full per-frame pass: creatures (with shadow proxies) first, then particles.
    pub fn draw_frame<'a, 'b, B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        camera_rotation: Quat,
        creatures: impl IntoIterator<Item = &'a CreatureView>,
        particles: impl IntoIterator<Item = &'b ParticleView>,
    ) -> Result<FrameStats> {
        let creature_stats = self.draw_creatures(backend, camera_rotation, creatures)?;
        let particle_stats = self.draw_particles(backend, camera_rotation, particles)?;
        let stats = creature_stats.merge(particle_stats);
        log::trace!(
            "billboard frame: {} creatures, {} particles, {} draws",
            stats.creatures,
            stats.particles,
            stats.draw_calls
        );
        Ok(stats)
    }
}

fn resolve_creature(
    index: &CreatureFrameIndex,
    creature: &CreatureView,
    camera_rotation: Quat,
    camera_yaw: f32,
) -> CreatureResolution {
    let kind = creature.creature_type.ordinal();
    let animation = creature.animation.ordinal();
    let relative_yaw = yaw_degrees(creature.rotation) - camera_yaw;
    let direction = resolve_direction(relative_yaw, index.count(&[kind, animation]));

    let group = CompositeKey::from_fields(&[kind, animation, i32::from(direction.bucket)]);
    let frame = index.select(group, creature.time_offset);
    let mut record = index
        .frame_at(group.with_lane(CREATURE_DEPTH - 1, frame as i32))
        .placed(creature.position, camera_rotation, creature.opacity);
    if direction.flip_x {
        record.flip_x();
    }
    CreatureResolution { direction, frame, record }
}

fn resolve_particle(index: &ParticleFrameIndex, particle: &ParticleView, camera_rotation: Quat) -> ParticleInstance {
    let group = CompositeKey::from_fields(&[particle.particle_type.ordinal()]);
    let frame = index.select(group, particle.time_offset);
    index
        .frame_at(group.with_lane(PARTICLE_DEPTH - 1, frame as i32))
        .placed(particle.position, camera_rotation, particle.opacity)
}

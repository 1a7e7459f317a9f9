use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::backend::{RenderState, ShadowMode};
use crate::growable::{DEFAULT_CAPACITY, MIN_CAPACITY};

#[derive(Debug, Clone, Deserialize)]
pub struct BillboardConfig {
    #[serde(default = "BillboardConfig::default_pixels_per_unit")]
    pub pixels_per_unit: f32,
    #[serde(default = "BillboardConfig::default_sprite_state")]
    pub creature: RenderState,
    #[serde(default = "BillboardConfig::default_sprite_state")]
    pub particle: RenderState,
    #[serde(default = "BillboardConfig::default_shadow_state")]
    pub shadow: RenderState,
    #[serde(default = "BillboardConfig::default_initial_capacity")]
    pub initial_capacity: usize,
}

impl Default for BillboardConfig {
    fn default() -> Self {
        Self {
            pixels_per_unit: Self::default_pixels_per_unit(),
            creature: Self::default_sprite_state(),
            particle: Self::default_sprite_state(),
            shadow: Self::default_shadow_state(),
            initial_capacity: Self::default_initial_capacity(),
        }
    }
}

impl BillboardConfig {
    const fn default_pixels_per_unit() -> f32 {
        16.0
    }

    const fn default_initial_capacity() -> usize {
        DEFAULT_CAPACITY
    }

    fn default_sprite_state() -> RenderState {
        RenderState { receive_shadows: false, ..RenderState::default() }.with_shadow_mode(ShadowMode::Off)
    }

    fn default_shadow_state() -> RenderState {
        RenderState { receive_shadows: false, ..RenderState::default() }.with_shadow_mode(ShadowMode::ShadowsOnly)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("Billboard config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    /// Clamps values the batching pass cannot work with.
    pub fn sanitized(mut self) -> Self {
        if !(self.pixels_per_unit.is_finite() && self.pixels_per_unit > 0.0) {
            log::warn!("pixels_per_unit {} is invalid; using default", self.pixels_per_unit);
            self.pixels_per_unit = Self::default_pixels_per_unit();
        }
        self.initial_capacity = self.initial_capacity.max(MIN_CAPACITY);
        self
    }
}

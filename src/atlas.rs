use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Region of the shared sprite sheet: pixel size plus UV tiling/offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct AtlasRect {
    pub size: [f32; 2],
    pub tiling: [f32; 2],
    #[serde(default)]
    pub offset: [f32; 2],
}

/// Key → rectangle table as supplied by the asset pipeline.
///
/// Keys encode `Type_Animation_Direction_Frame_Duration` for creature sheets and
/// `Type_Frame_Duration` for particle sheets.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AtlasMap {
    #[serde(default)]
    entries: HashMap<String, AtlasRect>,
}

impl AtlasMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, AtlasRect)>) -> Self {
        Self { entries: entries.into_iter().map(|(key, rect)| (key.into(), rect)).collect() }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read atlas map {}", path.display()))?;
        let map = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse atlas map {}", path.display()))?;
        Ok(map)
    }

    pub fn insert(&mut self, key: impl Into<String>, rect: AtlasRect) -> Option<AtlasRect> {
        self.entries.insert(key.into(), rect)
    }

    pub fn get(&self, key: &str) -> Option<&AtlasRect> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AtlasRect)> {
        self.entries.iter().map(|(key, rect)| (key.as_str(), rect))
    }
}

macro_rules! atlas_enum {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn ordinal(self) -> i32 {
                self as i32
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|value| value.name() == name)
            }
        }
    };
}

atlas_enum!(CreatureType { None, Player });
atlas_enum!(AnimationType { Idle, Moving, Attacking, Dead });
atlas_enum!(ParticleType { None });

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreatureKey {
    pub creature: CreatureType,
    pub animation: AnimationType,
    pub direction: u8,
    pub frame: u8,
    pub duration: u32,
}

impl CreatureKey {
    pub fn parse(key: &str) -> Option<Self> {
        let fields: Vec<&str> = key.split('_').collect();
        let [creature, animation, direction, frame, duration] = fields.as_slice() else {
            return None;
        };
        Some(Self {
            creature: CreatureType::from_name(creature)?,
            animation: AnimationType::from_name(animation)?,
            direction: direction.parse().ok()?,
            frame: frame.parse().ok()?,
            duration: duration.parse().ok()?,
        })
    }

    pub fn fields(&self) -> [i32; 4] {
        [self.creature.ordinal(), self.animation.ordinal(), self.direction as i32, self.frame as i32]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticleKey {
    pub particle: ParticleType,
    pub frame: u8,
    pub duration: u32,
}

impl ParticleKey {
    pub fn parse(key: &str) -> Option<Self> {
        let fields: Vec<&str> = key.split('_').collect();
        let [particle, frame, duration] = fields.as_slice() else {
            return None;
        };
        Some(Self {
            particle: ParticleType::from_name(particle)?,
            frame: frame.parse().ok()?,
            duration: duration.parse().ok()?,
        })
    }

    pub fn fields(&self) -> [i32; 2] {
        [self.particle.ordinal(), self.frame as i32]
    }
}

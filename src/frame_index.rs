//! Composite-key frame index built from an atlas table.
//!
//! Every atlas record is addressed by a [`CompositeKey`] that packs up to four ordinal
//! fields into byte lanes, coarsest field in the high byte. Interior keys count their
//! distinct children; leaf keys hold a running total of frame durations so a time value
//! can be mapped to a frame by binary search.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::atlas::{AtlasMap, CreatureKey, ParticleKey};
use crate::records::{CreatureInstance, ParticleInstance};

pub const MAX_DEPTH: usize = 4;
pub const CREATURE_DEPTH: usize = 4;
pub const PARTICLE_DEPTH: usize = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey(u32);

impl CompositeKey {
    pub const ROOT: Self = Self(0);

    const fn shift(lane: usize) -> u32 {
        24 - 8 * lane as u32
    }

    /// Packs `fields` into lanes 0.. in order. Each field is stored as `field + 1`, so `-1`
    /// leaves a lane as wildcard.
    pub fn from_fields(fields: &[i32]) -> Self {
        fields.iter().take(MAX_DEPTH).enumerate().fold(Self::ROOT, |key, (lane, &field)| key.with_lane(lane, field))
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn with_lane(self, lane: usize, field: i32) -> Self {
        debug_assert!(lane < MAX_DEPTH);
        let shift = Self::shift(lane);
        let packed = ((field.wrapping_add(1)) & 0xff) as u32;
        Self((self.0 & !(0xff << shift)) | (packed << shift))
    }

    /// Field stored in `lane`, or `None` for a wildcard lane.
    pub fn lane(self, lane: usize) -> Option<i32> {
        let packed = (self.0 >> Self::shift(lane)) & 0xff;
        (packed != 0).then(|| packed as i32 - 1)
    }

    /// Key restricted to its first `lanes` lanes.
    pub fn prefix(self, lanes: usize) -> Self {
        match lanes {
            0 => Self::ROOT,
            l if l >= MAX_DEPTH => self,
            l => Self(self.0 & !(u32::MAX >> (8 * l))),
        }
    }
}

/// One parsed atlas record ready for indexing.
#[derive(Clone, Copy, Debug)]
pub struct FrameRecord<T> {
    pub key: CompositeKey,
    pub duration: u32,
    pub data: T,
}

/// Size map plus data map for one atlas.
#[derive(Clone, Debug)]
pub struct FrameIndex<T> {
    depth: usize,
    sizes: HashMap<CompositeKey, u32>,
    frames: HashMap<CompositeKey, T>,
}

pub type CreatureFrameIndex = FrameIndex<CreatureInstance>;
pub type ParticleFrameIndex = FrameIndex<ParticleInstance>;

impl<T: Copy + Default> FrameIndex<T> {
    pub fn new(depth: usize) -> Self {
        Self { depth: depth.clamp(1, MAX_DEPTH), sizes: HashMap::new(), frames: HashMap::new() }
    }

    /// Builds the index from leaf records. The last lane of each key is the frame index.
    /// Records are processed in key order, so the result does not depend on input order.
    pub fn build(depth: usize, records: impl IntoIterator<Item = FrameRecord<T>>) -> Self {
        let mut index = Self::new(depth);
        let depth = index.depth;
        let mut leaves: BTreeMap<CompositeKey, FrameRecord<T>> = BTreeMap::new();
        for record in records {
            let key = record.key.prefix(depth);
            match leaves.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(FrameRecord { key, ..record });
                }
                Entry::Occupied(_) => {
                    log::warn!("duplicate atlas frame {:#010x}; keeping the first entry", key.raw());
                }
            }
        }

        let frame_lane = depth - 1;
        let mut previous: Option<(CompositeKey, u32)> = None;
        for (key, record) in leaves {
            // A new child bumps its parent; ascend only while the parent was new as well.
            for lanes in (0..depth).rev() {
                let level = key.prefix(lanes);
                let existed = index.sizes.contains_key(&level);
                *index.sizes.entry(level).or_insert(0) += 1;
                if existed {
                    break;
                }
            }

            let group = key.prefix(frame_lane);
            let mut cumulative = record.duration;
            if let Some((prev_key, prev_total)) = previous {
                if prev_key.prefix(frame_lane) == group {
                    let expected = prev_key.lane(frame_lane).unwrap_or(-1) + 1;
                    if key.lane(frame_lane) != Some(expected) {
                        log::warn!("atlas group {:#010x} skips frame {expected}", group.raw());
                    }
                    cumulative = cumulative.saturating_add(prev_total);
                }
            }
            index.sizes.insert(key, cumulative);
            index.frames.insert(key, record.data);
            previous = Some((key, cumulative));
        }
        index
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of indexed frames across all groups.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn count_at(&self, key: CompositeKey) -> u32 {
        self.sizes.get(&key).copied().unwrap_or(0)
    }

    /// Size-map value for a field prefix; `0` when the key was never populated.
    pub fn count(&self, fields: &[i32]) -> u32 {
        self.count_at(CompositeKey::from_fields(fields))
    }

    pub fn frame_at(&self, key: CompositeKey) -> T {
        self.frames.get(&key).copied().unwrap_or_default()
    }

    /// Render attributes for a leaf; a zeroed record when the frame is missing.
    pub fn frame(&self, fields: &[i32]) -> T {
        self.frame_at(CompositeKey::from_fields(fields))
    }

    pub fn frame_count(&self, group: CompositeKey) -> usize {
        self.count_at(group.prefix(self.depth - 1)) as usize
    }

    /// Cumulative duration up to and including frame `frame` of `group`.
    pub fn cumulative(&self, group: CompositeKey, frame: usize) -> u32 {
        let lane = self.depth - 1;
        self.count_at(group.prefix(lane).with_lane(lane, frame as i32))
    }

    pub fn total_duration(&self, group: CompositeKey) -> u32 {
        match self.frame_count(group) {
            0 => 0,
            frames => self.cumulative(group, frames - 1),
        }
    }

    /// Frame of `group` showing at `time_offset` seconds. Empty or zero-length groups
    /// resolve to frame 0.
    pub fn select(&self, group: CompositeKey, time_offset: f32) -> usize {
        let frames = self.frame_count(group);
        let total = self.total_duration(group);
        if frames == 0 || total == 0 {
            return 0;
        }
        let value = frame_value(time_offset, total);
        locate(frames, value, |frame| self.cumulative(group, frame))
    }

    /// Cumulative counts of `group` in frame order.
    pub fn cumulative_counts(&self, group: CompositeKey) -> Vec<u32> {
        (0..self.frame_count(group)).map(|frame| self.cumulative(group, frame)).collect()
    }
}

/// Maps a time offset in seconds onto `[0, total)` in milliseconds.
pub fn frame_value(time_offset: f32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let millis = (f64::from(time_offset) * 1000.0) as i64;
    millis.rem_euclid(i64::from(total)) as u32
}

/// Index `i` with `cumulative[i - 1] <= value < cumulative[i]`, treating `cumulative[-1]` as 0.
/// Values past the last count clamp to the last frame; an empty slice yields 0.
pub fn select_frame(cumulative: &[u32], value: u32) -> usize {
    locate(cumulative.len(), value, |frame| cumulative[frame])
}

fn locate(count: usize, value: u32, cumulative_at: impl Fn(usize) -> u32) -> usize {
    if count == 0 {
        return 0;
    }
    let (mut lo, mut hi) = (0, count);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if cumulative_at(mid) <= value {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo.min(count - 1)
}

pub fn build_creature_index(atlas: &AtlasMap, pixels_per_unit: f32) -> CreatureFrameIndex {
    let mut skipped = 0usize;
    let records: Vec<_> = atlas
        .iter()
        .filter_map(|(name, rect)| {
            let Some(key) = CreatureKey::parse(name).filter(|key| key.frame < u8::MAX && key.direction < u8::MAX)
            else {
                log::debug!("skipping creature atlas key '{name}'");
                skipped += 1;
                return None;
            };
            Some(FrameRecord {
                key: CompositeKey::from_fields(&key.fields()),
                duration: key.duration,
                data: CreatureInstance::from_atlas_rect(rect, pixels_per_unit),
            })
        })
        .collect();
    let index = FrameIndex::build(CREATURE_DEPTH, records);
    log::debug!("creature frame index: {} frames, {} keys skipped", index.len(), skipped);
    index
}

pub fn build_particle_index(atlas: &AtlasMap, pixels_per_unit: f32) -> ParticleFrameIndex {
    let mut skipped = 0usize;
    let records: Vec<_> = atlas
        .iter()
        .filter_map(|(name, rect)| {
            let Some(key) = ParticleKey::parse(name).filter(|key| key.frame < u8::MAX) else {
                log::debug!("skipping particle atlas key '{name}'");
                skipped += 1;
                return None;
            };
            Some(FrameRecord {
                key: CompositeKey::from_fields(&key.fields()),
                duration: key.duration,
                data: ParticleInstance::from_atlas_rect(rect, pixels_per_unit),
            })
        })
        .collect();
    let index = FrameIndex::build(PARTICLE_DEPTH, records);
    log::debug!("particle frame index: {} frames, {} keys skipped", index.len(), skipped);
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_keys_nest_by_prefix() {
        let leaf = CompositeKey::from_fields(&[1, 2, 3, 4]);
        assert_eq!(leaf.raw(), 0x0203_0405);
        assert_eq!(leaf.prefix(3), CompositeKey::from_fields(&[1, 2, 3]));
        assert_eq!(leaf.prefix(1).raw(), 0x0200_0000);
        assert_eq!(leaf.lane(2), Some(3));
        assert_eq!(leaf.prefix(2).lane(2), None);
    }

    #[test]
    fn locate_handles_boundaries() {
        assert_eq!(select_frame(&[2, 5, 9], 2), 1);
        assert_eq!(select_frame(&[2, 5, 9], 5), 2);
        assert_eq!(select_frame(&[2, 5, 9], 42), 2);
        assert_eq!(select_frame(&[], 3), 0);
    }

    #[test]
    fn frame_value_guards_zero_total() {
        assert_eq!(frame_value(12.5, 0), 0);
        assert_eq!(frame_value(1.0, 9), 1);
        assert_eq!(frame_value(-0.001, 9), 8);
    }
}

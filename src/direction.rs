use glam::Quat;

/// Steps in the discrete compass used for direction bucketing.
pub const COMPASS_STEPS: i32 = 256;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Direction {
    pub bucket: u8,
    pub flip_x: bool,
}

/// Wedge layout for a given symmetry count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Wedges {
    count: i32,
    bias: i32,
    mirrored: bool,
}

impl Wedges {
    fn for_symmetry(symmetry: u32) -> Option<Self> {
        let (count, mirrored) = match symmetry {
            2 => (2, false),
            3 => (4, true),
            4 => (4, false),
            5..=7 => (8, true),
            8 => (8, false),
            9..=15 => (16, true),
            16 => (16, false),
            _ => return None,
        };
        let width = COMPASS_STEPS / count;
        // Two-way sets split front/back without centring.
        let bias = if count == 2 { 0 } else { width / 2 };
        Some(Self { count, bias, mirrored })
    }
}

/// Yaw in degrees of `rotation` around the vertical axis.
pub fn yaw_degrees(rotation: Quat) -> f32 {
    let y = 2.0 * (rotation.y * rotation.w + rotation.x * rotation.z);
    let x = 1.0 - 2.0 * (rotation.y * rotation.y + rotation.z * rotation.z);
    y.atan2(x).to_degrees()
}

/// Wedge index on the compass before mirroring.
fn raw_wedge(relative_yaw: f32, wedges: Wedges) -> i32 {
    let step = relative_yaw.rem_euclid(360.0) / 360.0 * COMPASS_STEPS as f32;
    let step = (step as i32).clamp(0, COMPASS_STEPS - 1);
    ((step + wedges.bias) / (COMPASS_STEPS / wedges.count)) % wedges.count
}

/// Picks the sprite direction for a camera-relative yaw (degrees).
///
/// Mirrored symmetry counts (3, 5-7, 9-15) only author the front half of the compass;
/// wedges past the midpoint reuse the opposite sprite with `flip_x` set. Symmetry 1 and
/// unsupported counts always resolve to bucket 0.
pub fn resolve_direction(relative_yaw: f32, symmetry: u32) -> Direction {
    let Some(wedges) = Wedges::for_symmetry(symmetry) else {
        return Direction::default();
    };
    let raw = raw_wedge(relative_yaw, wedges);
    let midpoint = wedges.count / 2;
    if wedges.mirrored && raw > midpoint {
        Direction { bucket: (wedges.count - raw) as u8, flip_x: true }
    } else {
        Direction { bucket: raw as u8, flip_x: false }
    }
}

use glam::Quat;
use kestrel_billboards::direction::{resolve_direction, yaw_degrees, Direction, COMPASS_STEPS};

/// Yaws sitting in the middle of each compass step, so wrapping never lands on a boundary.
fn step_centres() -> impl Iterator<Item = f32> {
    (0..COMPASS_STEPS).map(|step| (step as f32 + 0.5) * 360.0 / COMPASS_STEPS as f32)
}

fn dir(bucket: u8, flip_x: bool) -> Direction {
    Direction { bucket, flip_x }
}

#[test]
fn resolution_is_periodic_in_yaw() {
    for symmetry in 0..=17 {
        for yaw in step_centres() {
            let base = resolve_direction(yaw, symmetry);
            assert_eq!(resolve_direction(yaw + 360.0, symmetry), base, "symmetry {symmetry} yaw {yaw}");
            assert_eq!(resolve_direction(yaw - 360.0, symmetry), base, "symmetry {symmetry} yaw {yaw}");
        }
    }
}

#[test]
fn buckets_stay_within_authored_directions() {
    for symmetry in 1..=16 {
        for yaw in step_centres() {
            let direction = resolve_direction(yaw, symmetry);
            assert!(u32::from(direction.bucket) < symmetry, "symmetry {symmetry} yaw {yaw} -> {direction:?}");
        }
    }
}

#[test]
fn single_and_unsupported_sets_never_flip() {
    for symmetry in [0, 1, 17, 32] {
        for yaw in step_centres() {
            assert_eq!(resolve_direction(yaw, symmetry), Direction::default());
        }
    }
}

#[test]
fn full_sets_never_flip() {
    for symmetry in [2, 4, 8, 16] {
        for yaw in step_centres() {
            assert!(!resolve_direction(yaw, symmetry).flip_x, "symmetry {symmetry} yaw {yaw}");
        }
    }
}

#[test]
fn two_way_splits_front_and_back() {
    assert_eq!(resolve_direction(90.0, 2), dir(0, false));
    assert_eq!(resolve_direction(200.0, 2), dir(1, false));
}

#[test]
fn eight_way_centres_wedges_on_axes() {
    assert_eq!(resolve_direction(0.0, 8), dir(0, false));
    assert_eq!(resolve_direction(-10.0, 8), dir(0, false));
    assert_eq!(resolve_direction(45.0, 8), dir(1, false));
    assert_eq!(resolve_direction(180.0, 8), dir(4, false));
    assert_eq!(resolve_direction(315.0, 8), dir(7, false));
}

#[test]
fn three_way_mirrors_the_left_side() {
    assert_eq!(resolve_direction(0.0, 3), dir(0, false));
    assert_eq!(resolve_direction(90.0, 3), dir(1, false));
    assert_eq!(resolve_direction(180.0, 3), dir(2, false));
    assert_eq!(resolve_direction(270.0, 3), dir(1, true));
}

#[test]
fn five_way_mirrors_back_half() {
    assert_eq!(resolve_direction(135.0, 5), dir(3, false));
    assert_eq!(resolve_direction(180.0, 5), dir(4, false));
    assert_eq!(resolve_direction(225.0, 5), dir(3, true));
    assert_eq!(resolve_direction(315.0, 5), dir(1, true));
}

#[test]
fn sixteen_way_wraps_last_wedge_to_front() {
    assert_eq!(resolve_direction(355.0, 16), dir(0, false));
    assert_eq!(resolve_direction(22.5, 16), dir(1, false));
}

#[test]
fn yaw_ignores_pitch_free_rotations() {
    let turned = Quat::from_rotation_y(-std::f32::consts::FRAC_PI_4);
    assert!((yaw_degrees(turned) + 45.0).abs() < 1e-3);
    assert!(yaw_degrees(Quat::IDENTITY).abs() < 1e-6);
}

#[test]
fn mirrored_sets_flip_exactly_past_midpoint() {
    let mirrored = [3].into_iter().chain(5..=7).chain(9..=15);
    for symmetry in mirrored {
        let wedges = match symmetry {
            3 => 4,
            5..=7 => 8,
            _ => 16,
        };
        let width = COMPASS_STEPS / wedges;
        for (step, yaw) in step_centres().enumerate() {
            let raw = ((step as i32 + width / 2) / width) % wedges;
            let expected = if raw > wedges / 2 { dir((wedges - raw) as u8, true) } else { dir(raw as u8, false) };
            assert_eq!(resolve_direction(yaw, symmetry), expected, "symmetry {symmetry} step {step}");
        }
    }
}

use kestrel_billboards::atlas::{AnimationType, AtlasMap, AtlasRect, CreatureType, ParticleType};
use kestrel_billboards::frame_index::{
    build_creature_index, build_particle_index, frame_value, select_frame, CompositeKey, FrameIndex, FrameRecord,
};

fn rect(u: f32) -> AtlasRect {
    AtlasRect { size: [16.0, 32.0], tiling: [0.125, 0.25], offset: [u, 0.0] }
}

fn player(animation: AnimationType) -> [i32; 2] {
    [CreatureType::Player.ordinal(), animation.ordinal()]
}

#[test]
fn single_frame_atlas_indexes_every_level() {
    let atlas = AtlasMap::from_entries([("Player_Idle_0_0_1", rect(0.0))]);
    let index = build_creature_index(&atlas, 16.0);

    assert_eq!(index.count(&[]), 1);
    assert_eq!(index.count(&[1]), 1);
    assert_eq!(index.count(&[1, 0]), 1);
    assert_eq!(index.count(&[1, 0, 0]), 1);
    assert_eq!(index.count(&[1, 0, 0, 0]), 1);

    let frame = index.frame(&[1, 0, 0, 0]);
    assert_eq!(frame.scale, [1.0, 2.0, 1.0 / 16.0]);
    assert_eq!(frame.tiling, [0.125, 0.25]);
    assert_eq!(frame.alpha, 1.0);
}

#[test]
fn interior_levels_count_distinct_children() {
    let atlas = AtlasMap::from_entries([
        ("Player_Moving_0_0_100", rect(0.0)),
        ("Player_Moving_0_1_100", rect(0.1)),
        ("Player_Moving_1_0_100", rect(0.2)),
        ("Player_Moving_2_0_100", rect(0.3)),
        ("Player_Idle_0_0_50", rect(0.4)),
        ("None_Idle_0_0_50", rect(0.5)),
    ]);
    let index = build_creature_index(&atlas, 16.0);

    assert_eq!(index.count(&[]), 2);
    assert_eq!(index.count(&[CreatureType::Player.ordinal()]), 2);
    assert_eq!(index.count(&player(AnimationType::Moving)), 3);
    assert_eq!(index.count(&player(AnimationType::Idle)), 1);
    let moving_dir0 = CompositeKey::from_fields(&[1, 1, 0]);
    assert_eq!(index.frame_count(moving_dir0), 2);
    assert_eq!(index.count(&player(AnimationType::Attacking)), 0);
}

#[test]
fn cumulative_durations_are_monotonic() {
    let atlas = AtlasMap::from_entries([
        ("Player_Attacking_0_0_2", rect(0.0)),
        ("Player_Attacking_0_1_3", rect(0.1)),
        ("Player_Attacking_0_2_4", rect(0.2)),
    ]);
    let index = build_creature_index(&atlas, 16.0);
    let group = CompositeKey::from_fields(&[1, 2, 0]);

    let counts = index.cumulative_counts(group);
    assert_eq!(counts, vec![2, 5, 9]);
    assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(index.total_duration(group), 9);
}

#[test]
fn build_ignores_record_order_and_duplicates() {
    let records = |order: &[usize]| -> Vec<FrameRecord<u32>> {
        let all = [
            FrameRecord { key: CompositeKey::from_fields(&[0, 0]), duration: 5, data: 10 },
            FrameRecord { key: CompositeKey::from_fields(&[0, 1]), duration: 7, data: 11 },
            FrameRecord { key: CompositeKey::from_fields(&[0, 2]), duration: 1, data: 12 },
        ];
        order.iter().map(|&i| all[i]).collect()
    };
    let sorted = FrameIndex::build(2, records(&[0, 1, 2]));
    let mut shuffled = records(&[2, 0, 1]);
    shuffled.push(FrameRecord { key: CompositeKey::from_fields(&[0, 1]), duration: 99, data: 99 });
    let shuffled = FrameIndex::build(2, shuffled);

    let group = CompositeKey::from_fields(&[0]);
    assert_eq!(sorted.cumulative_counts(group), vec![5, 12, 13]);
    assert_eq!(shuffled.cumulative_counts(group), vec![5, 12, 13]);
    assert_eq!(shuffled.frame(&[0, 1]), 11);
    assert_eq!(shuffled.len(), 3);
}

#[test]
fn malformed_atlas_keys_are_skipped() {
    let atlas = AtlasMap::from_entries([
        ("Player_Idle_0_0_10", rect(0.0)),
        ("Player_Idle_0_x_10", rect(0.1)),
        ("Dragon_Idle_0_0_10", rect(0.2)),
        ("Player_Idle_0_0", rect(0.3)),
    ]);
    let index = build_creature_index(&atlas, 16.0);
    assert_eq!(index.len(), 1);
}

#[test]
fn particle_groups_use_two_lanes() {
    let atlas = AtlasMap::from_entries([
        ("None_0_40", rect(0.0)),
        ("None_1_40", rect(0.1)),
        ("None_2_20", rect(0.2)),
    ]);
    let index = build_particle_index(&atlas, 16.0);
    let group = CompositeKey::from_fields(&[ParticleType::None.ordinal()]);

    assert_eq!(index.depth(), 2);
    assert_eq!(index.count(&[]), 1);
    assert_eq!(index.frame_count(group), 3);
    assert_eq!(index.cumulative_counts(group), vec![40, 80, 100]);
    assert_eq!(index.select(group, 0.085), 2);
    assert_eq!(index.frame(&[0, 1]).offset, [0.1, 0.0]);
}

#[test]
fn missing_frames_read_as_zeroed_records() {
    let index = build_creature_index(&AtlasMap::new(), 16.0);
    assert!(index.is_empty());
    assert_eq!(index.frame(&[1, 0, 0, 0]), Default::default());
    assert_eq!(index.select(CompositeKey::from_fields(&[1, 0, 0]), 3.0), 0);
}

#[test]
fn frame_selection_uses_half_open_intervals() {
    let cumulative = [2, 5, 9];
    let expected = [0, 0, 1, 1, 1, 2, 2, 2, 2];
    for (value, frame) in expected.iter().enumerate() {
        assert_eq!(select_frame(&cumulative, value as u32), *frame, "value {value}");
    }
    assert_eq!(select_frame(&cumulative, frame_value(1.0, 9)), 0);
}

#[test]
fn frame_selection_wraps_time() {
    let atlas = AtlasMap::from_entries([
        ("Player_Moving_0_0_2", rect(0.0)),
        ("Player_Moving_0_1_3", rect(0.1)),
        ("Player_Moving_0_2_4", rect(0.2)),
    ]);
    let index = build_creature_index(&atlas, 16.0);
    let group = CompositeKey::from_fields(&[1, 1, 0]);

    assert_eq!(frame_value(0.0105, 9), 1);
    assert_eq!(index.select(group, 0.0045), 1);
    assert_eq!(index.select(group, 0.0095), 0);
    assert_eq!(index.select(group, 0.0135), 1);
    assert_eq!(index.select(group, -0.0015), 2);
}

#[test]
fn zero_duration_group_resolves_to_first_frame() {
    let atlas = AtlasMap::from_entries([("Player_Dead_0_0_0", rect(0.0)), ("Player_Dead_0_1_0", rect(0.1))]);
    let index = build_creature_index(&atlas, 16.0);
    assert_eq!(index.select(CompositeKey::from_fields(&[1, 3, 0]), 5.0), 0);
}

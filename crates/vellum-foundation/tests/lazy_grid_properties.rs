use vellum_core::collections::map::HashSet;
use vellum_foundation::lazy::{
    GridConfig, GridGap, ItemKey, KeyedItems, LayoutEngine, MeasureOutcome, SizeCache,
};
use vellum_testing::GridRobot;

/// Deterministic, uneven item sizes.
fn size_of(key: &ItemKey) -> f32 {
    let n = key.as_num().unwrap_or(0);
    40.0 + ((n * 37) % 90) as f32 + 0.3
}

fn robot(columns: i32, count: usize) -> GridRobot {
    let mut robot = GridRobot::new(GridConfig {
        columns,
        gap: GridGap::Uniform(6.0),
        estimated_item_size: 80.0,
        ..Default::default()
    });
    robot.submit(&KeyedItems::sequential(count));
    robot.set_viewport(0.0, 600.0, 480.0);
    robot
}

fn assert_bindings_exclusive(robot: &GridRobot) {
    let mut keys = HashSet::default();
    for container in robot.containers() {
        let Some(item) = container.item() else {
            assert!(!container.is_rendering());
            continue;
        };
        assert!(keys.insert(item.key.clone()), "{} bound twice", item.key);
        assert_eq!(robot.grid().slot_for(&item.key), Some(container.slot()));
    }
    assert_eq!(keys.len(), robot.grid().stats().slots_in_use);
}

#[test]
fn every_item_gets_one_non_overlapping_placement() {
    for columns in 1..=5usize {
        for count in [0usize, 1, 7, 64, 129] {
            let keys: Vec<ItemKey> = (0..count as u64).map(ItemKey::Num).collect();
            let mut sizes = SizeCache::new();
            for key in keys.iter().step_by(3) {
                sizes.record(key, size_of(key));
            }
            let mut engine = LayoutEngine::new(columns, 6.0);
            engine.set_items(keys, vec![80.0; count]);
            engine.relayout(&sizes);

            assert_eq!(engine.placements().len(), count);
            for column in 0..columns {
                let mut previous_end = f32::MIN;
                for (index, placement) in engine.placements().iter().enumerate() {
                    assert_eq!(placement.column, index % columns);
                    if placement.column != column {
                        continue;
                    }
                    assert!(
                        placement.offset >= previous_end,
                        "overlap at {index} with {columns} columns"
                    );
                    previous_end = placement.end();
                }
                assert!(previous_end <= engine.content_extent());
            }
        }
    }
}

#[test]
fn bindings_stay_exclusive_while_scrolling() {
    let mut robot = robot(3, 500);
    robot.settle(|key, _| size_of(key));
    assert_bindings_exclusive(&robot);

    for delta in [350.0, 900.0, -120.0, 2400.0, -3000.0, 75.5, 10_000.0, -400.0] {
        robot.scroll_by(delta);
        assert_bindings_exclusive(&robot);
        robot.frame(|key, _| size_of(key));
        assert_bindings_exclusive(&robot);
    }
}

#[test]
fn settled_grid_pass_is_silent() {
    let mut robot = robot(2, 80);
    robot.settle(|key, _| size_of(key));

    let placements: Vec<_> = (0..80)
        .map(|index| robot.grid().placement_of(index).unwrap())
        .collect();
    let delivered = robot.grid().store().delivered_notifications();

    robot.grid_mut().refresh();
    robot.grid_mut().refresh();

    assert_eq!(robot.grid().store().delivered_notifications(), delivered);
    for (index, placement) in placements.iter().enumerate() {
        assert_eq!(robot.grid().placement_of(index).as_ref(), Some(placement));
    }
}

#[test]
fn remeasuring_settled_grid_applies_nothing() {
    let mut robot = robot(4, 200);
    robot.settle(|key, _| size_of(key));
    let passes = robot.grid().passes();

    let report = robot.frame(|key, _| size_of(key));

    assert_eq!(report.applied, 0);
    assert!(report.unchanged > 0);
    assert_eq!(robot.grid().passes(), passes);
}

#[test]
fn measurement_for_recycled_binding_is_discarded() {
    let mut robot = robot(1, 300);
    let key = ItemKey::Num(0);
    let ticket = robot.grid().ticket_for(&key).unwrap();

    robot.scroll_by(8000.0);
    assert_eq!(robot.grid().slot_for(&key), None);

    let outcome = robot.grid_mut().report_size(ticket, 321.0);
    assert_eq!(outcome, MeasureOutcome::Stale);
    assert_eq!(robot.grid().cached_size(&key), None);
}

#[test]
fn zero_measurement_never_reaches_the_cache() {
    let mut robot = robot(2, 20);
    let report = robot.frame(|_, _| 0.0);

    assert_eq!(report.applied, 0);
    assert!(report.zero_ignored > 0);
    assert_eq!(robot.grid().cached_size(&ItemKey::Num(0)), None);
    assert_eq!(robot.grid().placement_of(0).unwrap().size, 80.0);
}

#[test]
fn pool_only_grows_with_demand() {
    let mut robot = robot(2, 400);
    robot.set_viewport(0.0, 1200.0, 480.0);
    let grown = robot.grid().pool_size();

    robot.set_viewport(0.0, 300.0, 480.0);
    assert_eq!(robot.grid().pool_size(), grown);

    let idle = robot
        .containers()
        .iter()
        .filter(|container| !container.is_rendering())
        .count();
    assert_eq!(idle, robot.grid().stats().slots_in_pool);
    assert!(idle > 0);
}

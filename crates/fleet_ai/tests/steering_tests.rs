//! Steering and intercept properties.

use std::f32::consts::{FRAC_PI_2, PI};

use fleet_ai::prelude::*;
use fleet_ai::steering::{net_thrust_direction, thrust_alignment, ALIGN_TOLERANCE};
use fleet_test_utils::fixtures::enemy_at;
use fleet_test_utils::proptest::prelude::*;

#[test]
fn test_stationary_target_is_aimed_directly() {
    let aim = lead_target(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::ZERO, 50.0);
    assert_eq!(aim, Vec2::new(100.0, 0.0));
}

#[test]
fn test_unreachable_target_falls_back_to_position() {
    // Target crosses faster than the projectile flies: no real intercept.
    let aim = lead_target(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(0.0, 500.0), 50.0);
    assert_eq!(aim, Vec2::new(100.0, 0.0));
}

#[test]
fn test_crossing_target_is_led() {
    let aim = lead_target(Vec2::ZERO, Vec2::new(1_000.0, 0.0), Vec2::new(0.0, 100.0), 400.0);
    assert!(aim.y > 0.0);
    // The shot and the target arrive together.
    let time = aim.length() / 400.0;
    let target_then = Vec2::new(1_000.0, 100.0 * time);
    assert!(aim.distance(target_then) < 1.0);
}

#[test]
fn test_rear_engine_thrust_axis() {
    for (rotation, expected) in [
        (0.0, Vec2::new(0.0, -1.0)),
        (FRAC_PI_2, Vec2::new(1.0, 0.0)),
        (PI, Vec2::new(0.0, 1.0)),
    ] {
        let ship = enemy_at(1, 0.0, 0.0).with_rotation(rotation);
        assert!(net_thrust_direction(&ship).distance(expected) < 1e-4);
    }
}

#[test]
fn test_approach_waits_for_alignment() {
    // Thrust points along +x; target straight behind.
    let ship = enemy_at(1, 0.0, 0.0).with_rotation(FRAC_PI_2);
    let intent = approach_target(&ship, Vec2::new(-1_000.0, 0.0), Vec2::ZERO);
    assert!(!intent.thrust_forward);
    assert!(intent.rotate_left || intent.rotate_right);

    let intent = approach_target(&ship, Vec2::new(1_000.0, 0.0), Vec2::ZERO);
    assert!(intent.thrust_forward);
    assert!(!intent.rotate_left && !intent.rotate_right);
}

#[test]
fn test_approach_brakes_when_arriving_fast() {
    let ship = enemy_at(1, 0.0, 0.0).with_rotation(FRAC_PI_2);
    let intent = approach_target(&ship, Vec2::new(50.0, 0.0), Vec2::new(200.0, 0.0));
    assert!(intent.brake);
    assert!(!intent.thrust_forward);
}

#[test]
fn test_face_target_never_thrusts() {
    let ship = enemy_at(1, 0.0, 0.0);
    let intent = face_target(&ship, Vec2::new(300.0, 300.0));
    assert!(!intent.thrust_forward);
    assert!(!intent.brake);
}

#[test]
fn test_orbit_climbs_out_when_too_close() {
    // Thrust axis already points away from the centre.
    let ship = enemy_at(1, 0.0, 0.0).with_rotation(FRAC_PI_2);
    let intent = orbit_target(&ship, Vec2::ZERO, Vec2::new(-100.0, 0.0), 300.0);
    assert!(intent.thrust_forward);
    assert!(!intent.brake);
}

proptest! {
    #[test]
    fn test_lead_target_always_finite(
        sx in -20_000.0f32..20_000.0,
        sy in -20_000.0f32..20_000.0,
        tx in -20_000.0f32..20_000.0,
        ty in -20_000.0f32..20_000.0,
        vx in -1_000.0f32..1_000.0,
        vy in -1_000.0f32..1_000.0,
        speed in 0.0f32..2_000.0,
    ) {
        let aim = lead_target(Vec2::new(sx, sy), Vec2::new(tx, ty), Vec2::new(vx, vy), speed);
        prop_assert!(aim.is_finite());
    }

    #[test]
    fn test_stationary_targets_never_led(
        tx in -5_000.0f32..5_000.0,
        ty in -5_000.0f32..5_000.0,
        speed in 1.0f32..2_000.0,
    ) {
        let target = Vec2::new(tx, ty);
        let aim = lead_target(Vec2::ZERO, target, Vec2::ZERO, speed);
        prop_assert!(aim.distance(target) < 1e-2);
    }

    #[test]
    fn test_steering_never_turns_both_ways(
        rotation in -PI..PI,
        tx in -5_000.0f32..5_000.0,
        ty in -5_000.0f32..5_000.0,
        vx in -300.0f32..300.0,
        vy in -300.0f32..300.0,
    ) {
        let ship = enemy_at(1, 0.0, 0.0).with_rotation(rotation);
        let target = Vec2::new(tx, ty);
        let velocity = Vec2::new(vx, vy);
        for intent in [
            approach_target(&ship, target, velocity),
            face_target(&ship, target),
            orbit_target(&ship, velocity, target, 300.0),
        ] {
            prop_assert!(!(intent.rotate_left && intent.rotate_right));
            prop_assert!(!(intent.thrust_forward && intent.brake));
        }
    }

    #[test]
    fn test_thrust_only_when_aligned(
        rotation in -PI..PI,
        tx in 200.0f32..5_000.0,
        ty in -5_000.0f32..5_000.0,
    ) {
        let ship = enemy_at(1, 0.0, 0.0).with_rotation(rotation);
        let target = Vec2::new(tx, ty);
        let intent = approach_target(&ship, target, Vec2::ZERO);
        if intent.thrust_forward {
            prop_assert!(thrust_alignment(&ship, target) <= ALIGN_TOLERANCE);
        }
    }
}

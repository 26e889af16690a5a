//! Steering helpers.
//!
//! Pure functions from ship geometry to a [`MovementIntent`] or an aim
//! point. Safe to call any number of times per frame.
//!
//! Ships turn toward their *net thrust direction*, not their hull rotation:
//! a hull whose engines are mounted sideways still has to point its engines'
//! push at the destination before thrusting.

use crate::intent::MovementIntent;
use crate::math::{angle_diff, predict_position, Vec2};
use crate::ships::ShipRecord;

/// Thrust only fires when the thrust axis is within this of the bearing.
pub const ALIGN_TOLERANCE: f32 = 0.15;

/// Rotation corrections stop inside this band.
pub const ROTATE_TOLERANCE: f32 = 0.05;

/// Approach brakes inside this distance.
pub const BRAKE_RADIUS: f32 = 100.0;

/// Approach only brakes while closing faster than this.
pub const BRAKE_CLOSING_SPEED: f32 = 10.0;

/// Orbit pushes outward once this far inside the ring.
pub const ORBIT_INNER_MARGIN: f32 = 40.0;

/// Orbit pushes along the tangent once this far outside the ring.
pub const ORBIT_OUTER_MARGIN: f32 = 20.0;

/// Outward drift at or above this speed counts as already escaping.
pub const ORBIT_ESCAPE_SPEED: f32 = 30.0;

/// Quadratic coefficients below this are treated as degenerate.
const LEAD_EPSILON: f32 = 1e-5;

/// World-space unit vector the ship accelerates along when thrusting.
///
/// Sums every engine's local push weighted by its power and rotates the sum
/// by the hull rotation. Zero when the ship has no engines.
#[must_use]
pub fn net_thrust_direction(ship: &ShipRecord) -> Vec2 {
    let rotation = ship.transform.rotation;
    let sum = ship.engines.iter().fold(Vec2::ZERO, |acc, engine| {
        acc + engine
            .local_thrust_direction()
            .rotate(rotation)
            .scale(engine.power())
    });
    sum.normalize()
}

/// Angle between the thrust axis and the bearing to `target`, in `[0, π]`.
#[must_use]
pub fn thrust_alignment(ship: &ShipRecord, target: Vec2) -> f32 {
    let desired = (target - ship.position()).normalize();
    let cos = net_thrust_direction(ship).dot(desired).clamp(-1.0, 1.0);
    cos.acos()
}

/// Whether the thrust axis points at `target` within `tolerance`.
#[must_use]
pub fn is_thrust_facing(ship: &ShipRecord, target: Vec2, tolerance: f32) -> bool {
    thrust_alignment(ship, target) <= tolerance
}

/// Rotation flags that turn the thrust axis toward `desired_dir`.
fn rotation_toward(ship: &ShipRecord, desired_dir: Vec2) -> (bool, bool) {
    let current = net_thrust_direction(ship).angle();
    let delta = angle_diff(current, desired_dir.angle());
    (delta < -ROTATE_TOLERANCE, delta > ROTATE_TOLERANCE)
}

/// Rotate toward `target` without thrusting.
#[must_use]
pub fn face_target(ship: &ShipRecord, target: Vec2) -> MovementIntent {
    let desired = (target - ship.position()).normalize();
    let (rotate_left, rotate_right) = rotation_toward(ship, desired);

    MovementIntent {
        rotate_left,
        rotate_right,
        ..MovementIntent::INERT
    }
}

/// Fly to `target`.
///
/// Thrusts while aligned; inside [`BRAKE_RADIUS`] it stops thrusting and
/// brakes if still closing. Rotation correction is always emitted.
#[must_use]
pub fn approach_target(ship: &ShipRecord, target: Vec2, velocity: Vec2) -> MovementIntent {
    let to_target = target - ship.position();
    let dist = to_target.length();
    let desired = to_target.normalize();

    let closing_speed = velocity.dot(desired);

    let mut thrust_forward = false;
    let mut brake = false;

    if dist < BRAKE_RADIUS {
        brake = closing_speed > BRAKE_CLOSING_SPEED;
    } else if is_thrust_facing(ship, target, ALIGN_TOLERANCE) {
        thrust_forward = true;
    }

    let (rotate_left, rotate_right) = rotation_toward(ship, desired);

    MovementIntent {
        thrust_forward,
        brake,
        rotate_left,
        rotate_right,
        ..MovementIntent::INERT
    }
}

/// Hold a ring of `radius` around `center`.
#[must_use]
pub fn orbit_target(ship: &ShipRecord, velocity: Vec2, center: Vec2, radius: f32) -> MovementIntent {
    let to_center = center - ship.position();
    let dist = to_center.length();
    let radius_error = dist - radius;

    let inward = to_center.normalize();
    let outward = -inward;
    let tangent = inward.perp();

    let outward_speed = velocity.dot(outward);

    // Too deep inside the ring: turn the engines outward and climb out.
    if radius_error < -ORBIT_INNER_MARGIN && outward_speed < ORBIT_ESCAPE_SPEED {
        let (rotate_left, rotate_right) = rotation_toward(ship, outward);
        let aligned = net_thrust_direction(ship).dot(outward) >= ALIGN_TOLERANCE.cos();
        return MovementIntent {
            thrust_forward: aligned,
            brake: false,
            rotate_left,
            rotate_right,
            ..MovementIntent::INERT
        };
    }

    let (rotate_left, rotate_right) = rotation_toward(ship, tangent);
    let alignment = velocity.normalize().dot(tangent);

    let mut thrust_forward = false;
    let mut brake = false;

    if radius_error > ORBIT_OUTER_MARGIN {
        thrust_forward = true;
    } else if alignment > 0.7 && radius_error <= 0.0 {
        brake = true;
    } else if alignment < 0.5 {
        thrust_forward = true;
    }

    MovementIntent {
        thrust_forward,
        brake,
        rotate_left,
        rotate_right,
        ..MovementIntent::INERT
    }
}

/// Aim point for a projectile at `projectile_speed` to hit a moving target.
///
/// Solves `|target + v·t - shooter| = s·t` for the larger root. Falls back
/// to the target's current position when no real, finite solution exists.
#[must_use]
pub fn lead_target(shooter: Vec2, target: Vec2, target_velocity: Vec2, projectile_speed: f32) -> Vec2 {
    let to_target = target - shooter;
    let a = target_velocity.dot(target_velocity) - projectile_speed * projectile_speed;
    let b = 2.0 * to_target.dot(target_velocity);
    let c = to_target.dot(to_target);

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 || a.abs() < LEAD_EPSILON || !discriminant.is_finite() {
        return target;
    }

    let sqrt_disc = discriminant.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    let time = t1.max(t2).max(0.0);

    let predicted = predict_position(target, target_velocity, time);
    if predicted.is_finite() {
        predicted
    } else {
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ships::{EngineBlock, Faction};
    use std::f32::consts::PI;

    /// Ship whose single rear engine pushes along +x.
    fn ship_facing_east(position: Vec2) -> ShipRecord {
        ShipRecord::new(1, Faction::Enemy, position).with_rotation(PI / 2.0)
    }

    #[test]
    fn test_net_thrust_direction_follows_rotation() {
        let dir = net_thrust_direction(&ship_facing_east(Vec2::ZERO));
        assert!((dir.x - 1.0).abs() < 1e-5);
        assert!(dir.y.abs() < 1e-5);
    }

    #[test]
    fn test_net_thrust_weights_by_power() {
        let ship = ShipRecord::new(1, Faction::Enemy, Vec2::ZERO).with_engines(vec![
            EngineBlock {
                rotation_deg: 0.0,
                thrust_power: Some(10.0),
            },
            EngineBlock {
                rotation_deg: 180.0,
                thrust_power: Some(2.0),
            },
        ]);
        let dir = net_thrust_direction(&ship);
        assert!(dir.y < -0.99, "stronger engine should dominate, got {dir:?}");
    }

    #[test]
    fn test_no_engines_gives_zero_thrust() {
        let ship = ShipRecord::new(1, Faction::Enemy, Vec2::ZERO).with_engines(Vec::new());
        assert_eq!(net_thrust_direction(&ship), Vec2::ZERO);
    }

    #[test]
    fn test_face_target_rotates_only() {
        let ship = ship_facing_east(Vec2::ZERO);
        let intent = face_target(&ship, Vec2::new(0.0, 500.0));
        assert!(!intent.thrust_forward);
        assert!(!intent.brake);
        assert!(intent.rotate_right);
        assert!(!intent.rotate_left);
    }

    #[test]
    fn test_face_target_inside_tolerance_is_still() {
        let ship = ship_facing_east(Vec2::ZERO);
        let intent = face_target(&ship, Vec2::new(1000.0, 10.0));
        assert_eq!(intent, MovementIntent::INERT);
    }

    #[test]
    fn test_approach_thrusts_when_aligned() {
        let ship = ship_facing_east(Vec2::ZERO);
        let intent = approach_target(&ship, Vec2::new(1000.0, 0.0), Vec2::ZERO);
        assert!(intent.thrust_forward);
        assert!(!intent.brake);
    }

    #[test]
    fn test_approach_waits_for_alignment() {
        let ship = ship_facing_east(Vec2::ZERO);
        let intent = approach_target(&ship, Vec2::new(0.0, -1000.0), Vec2::ZERO);
        assert!(!intent.thrust_forward);
        assert!(intent.rotate_left);
    }

    #[test]
    fn test_approach_brakes_when_close_and_closing() {
        let ship = ship_facing_east(Vec2::ZERO);
        let closing = approach_target(&ship, Vec2::new(50.0, 0.0), Vec2::new(40.0, 0.0));
        assert!(closing.brake);
        assert!(!closing.thrust_forward);

        let drifting = approach_target(&ship, Vec2::new(50.0, 0.0), Vec2::new(5.0, 0.0));
        assert!(!drifting.brake);
        assert!(!drifting.thrust_forward);
    }

    #[test]
    fn test_orbit_escapes_when_too_deep() {
        // Center is to the west, ship is 100 inside a 300 ring; outward is +x.
        let ship = ship_facing_east(Vec2::ZERO);
        let intent = orbit_target(&ship, Vec2::ZERO, Vec2::new(-200.0, 0.0), 300.0);
        assert!(intent.thrust_forward);
        assert!(!intent.brake);
    }

    #[test]
    fn test_orbit_no_escape_when_already_drifting_out() {
        let ship = ship_facing_east(Vec2::ZERO);
        let intent = orbit_target(&ship, Vec2::new(50.0, 0.0), Vec2::new(-200.0, 0.0), 300.0);
        // Falls through to tangent handling instead of the outward push.
        assert!(intent.rotate_left || intent.rotate_right);
    }

    #[test]
    fn test_orbit_pushes_when_outside_ring() {
        let ship = ship_facing_east(Vec2::ZERO);
        let intent = orbit_target(&ship, Vec2::ZERO, Vec2::new(-1000.0, 0.0), 300.0);
        assert!(intent.thrust_forward);
    }

    #[test]
    fn test_orbit_brakes_when_aligned_and_inside() {
        let ship = ship_facing_east(Vec2::ZERO);
        let center = Vec2::new(-290.0, 0.0);
        // Tangent for inward (-1, 0) is (0, -1).
        let intent = orbit_target(&ship, Vec2::new(0.0, -80.0), center, 300.0);
        assert!(intent.brake);
        assert!(!intent.thrust_forward);
    }

    #[test]
    fn test_lead_target_stationary_is_direct_aim() {
        let aim = lead_target(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::ZERO, 50.0);
        assert!((aim.x - 100.0).abs() < 1e-3);
        assert!(aim.y.abs() < 1e-3);
    }

    #[test]
    fn test_lead_target_negative_discriminant_falls_back() {
        // Crossing target faster than the projectile: no intercept.
        let target = Vec2::new(100.0, 0.0);
        let aim = lead_target(Vec2::ZERO, target, Vec2::new(0.0, 100.0), 50.0);
        assert_eq!(aim, target);
        assert!(aim.is_finite());
    }

    #[test]
    fn test_lead_target_degenerate_quadratic_falls_back() {
        let target = Vec2::new(100.0, 0.0);
        let aim = lead_target(Vec2::ZERO, target, Vec2::new(50.0, 0.0), 50.0);
        assert_eq!(aim, target);
    }

    #[test]
    fn test_lead_target_leads_crossing_target() {
        let aim = lead_target(Vec2::ZERO, Vec2::new(400.0, 0.0), Vec2::new(0.0, 100.0), 400.0);
        assert!(aim.y > 0.0, "aim should lead along target velocity");
        let time = aim.length() / 400.0;
        let expected = Vec2::new(400.0, 100.0 * time);
        assert!(aim.distance(expected) < 1.0);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn lead_target_is_always_finite(
                sx in -5000.0f32..5000.0, sy in -5000.0f32..5000.0,
                tx in -5000.0f32..5000.0, ty in -5000.0f32..5000.0,
                vx in -800.0f32..800.0, vy in -800.0f32..800.0,
                speed in 1.0f32..1000.0,
            ) {
                let aim = lead_target(Vec2::new(sx, sy), Vec2::new(tx, ty), Vec2::new(vx, vy), speed);
                prop_assert!(aim.is_finite());
            }

            #[test]
            fn face_target_never_thrusts(
                px in -5000.0f32..5000.0, py in -5000.0f32..5000.0,
                rot in -6.3f32..6.3,
            ) {
                let ship = ShipRecord::new(1, Faction::Enemy, Vec2::ZERO).with_rotation(rot);
                let intent = face_target(&ship, Vec2::new(px, py));
                prop_assert!(!intent.thrust_forward && !intent.brake);
                prop_assert!(!(intent.rotate_left && intent.rotate_right));
            }
        }
    }
}

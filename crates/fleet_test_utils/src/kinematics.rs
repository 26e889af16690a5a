//! Minimal kinematic model standing in for the external movement system.
//!
//! Controllers' drivers write intents into a shared [`IntentBuffer`]; after
//! the orchestrator tick the buffer is drained and every ship is integrated
//! with [`integrate`]. The model is deliberately crude (constant turn rate,
//! constant acceleration, linear braking) but fully deterministic.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use fleet_ai::controller::{MovementDriver, UtilityDriver, WeaponDriver};
use fleet_ai::error::Result;
use fleet_ai::intent::{MovementIntent, ShipIntent, UtilityIntent, WeaponIntent};
use fleet_ai::ships::{ShipId, ShipRecord, Transform, DEFAULT_THRUST_POWER};
use fleet_ai::steering::net_thrust_direction;

/// Tuning for [`integrate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicParams {
    /// Radians per second while a rotate flag is set.
    pub turn_rate: f32,
    /// Acceleration per unit of engine power, in units/s².
    pub acceleration_per_power: f32,
    /// Deceleration while braking, in units/s².
    pub brake_deceleration: f32,
    /// Hard speed cap.
    pub max_speed: f32,
    /// Hulls closer than this count as colliding.
    pub contact_radius: f32,
}

impl Default for KinematicParams {
    fn default() -> Self {
        Self {
            turn_rate: 3.0,
            acceleration_per_power: 40.0 / DEFAULT_THRUST_POWER,
            brake_deceleration: 150.0,
            max_speed: 450.0,
            contact_radius: 60.0,
        }
    }
}

/// Advance one ship's transform by `dt` under `intent`.
#[must_use]
pub fn integrate(
    ship: &ShipRecord,
    intent: &MovementIntent,
    dt: f32,
    params: &KinematicParams,
) -> Transform {
    let mut transform = ship.transform;

    if intent.rotate_left {
        transform.rotation -= params.turn_rate * dt;
    }
    if intent.rotate_right {
        transform.rotation += params.turn_rate * dt;
    }

    if intent.thrust_forward {
        let rotated = ShipRecord {
            transform,
            ..ship.clone()
        };
        let power: f32 = ship.engines.iter().map(|e| e.power()).sum();
        let accel = params.acceleration_per_power * power;
        transform.velocity = transform.velocity + net_thrust_direction(&rotated).scale(accel * dt);
    }

    if intent.brake {
        let speed = transform.velocity.length();
        let slowed = (speed - params.brake_deceleration * dt).max(0.0);
        transform.velocity = transform.velocity.normalize().scale(slowed);
    }

    let speed = transform.velocity.length();
    if speed > params.max_speed {
        transform.velocity = transform.velocity.normalize().scale(params.max_speed);
    }

    transform.position = transform.position + transform.velocity.scale(dt);
    transform
}

// ============================================================================
// Buffered drivers
// ============================================================================

/// Intents written by drivers this tick, keyed by ship.
pub type IntentBuffer = Rc<RefCell<BTreeMap<ShipId, ShipIntent>>>;

/// Create an empty buffer.
#[must_use]
pub fn intent_buffer() -> IntentBuffer {
    Rc::new(RefCell::new(BTreeMap::new()))
}

/// Movement driver writing into an [`IntentBuffer`].
pub struct BufferedMovement {
    buffer: IntentBuffer,
    pending: MovementIntent,
}

impl MovementDriver for BufferedMovement {
    fn set_intent(&mut self, intent: MovementIntent) {
        self.pending = intent;
    }

    fn update(&mut self, _dt: f32, ship: &ShipRecord, _transform: Transform) -> Result<()> {
        self.buffer.borrow_mut().entry(ship.id).or_default().movement = self.pending;
        Ok(())
    }
}

/// Weapon driver writing into an [`IntentBuffer`].
pub struct BufferedWeapons {
    buffer: IntentBuffer,
    pending: WeaponIntent,
}

impl WeaponDriver for BufferedWeapons {
    fn set_intent(&mut self, intent: WeaponIntent) {
        self.pending = intent;
    }

    fn update(&mut self, _dt: f32, ship: &ShipRecord, _transform: Transform) -> Result<()> {
        self.buffer.borrow_mut().entry(ship.id).or_default().weapons = self.pending;
        Ok(())
    }
}

/// Utility driver writing into an [`IntentBuffer`].
pub struct BufferedUtility {
    buffer: IntentBuffer,
    pending: UtilityIntent,
}

impl UtilityDriver for BufferedUtility {
    fn set_intent(&mut self, intent: UtilityIntent) {
        self.pending = intent;
    }

    fn update(&mut self, _dt: f32, ship: &ShipRecord, _transform: Transform) -> Result<()> {
        self.buffer.borrow_mut().entry(ship.id).or_default().utility = self.pending;
        Ok(())
    }
}

/// The three drivers for one controller, sharing `buffer`.
#[must_use]
pub fn buffered_drivers(
    buffer: &IntentBuffer,
) -> (
    Box<dyn MovementDriver>,
    Box<dyn WeaponDriver>,
    Box<dyn UtilityDriver>,
) {
    (
        Box::new(BufferedMovement {
            buffer: Rc::clone(buffer),
            pending: MovementIntent::default(),
        }),
        Box::new(BufferedWeapons {
            buffer: Rc::clone(buffer),
            pending: WeaponIntent::default(),
        }),
        Box::new(BufferedUtility {
            buffer: Rc::clone(buffer),
            pending: UtilityIntent::default(),
        }),
    )
}

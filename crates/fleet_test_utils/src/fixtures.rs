//! Test fixtures and helpers.
//!
//! Ship builders, controllers wired to recording drivers, and a driver that
//! always fails, for consistent testing.

use std::cell::RefCell;
use std::rc::Rc;

use fleet_ai::controller::{AgentController, MovementDriver, UtilityDriver, WeaponDriver};
use fleet_ai::error::{AiError, Result};
use fleet_ai::intent::{MovementIntent, ShipIntent, UtilityIntent, WeaponIntent};
use fleet_ai::math::Vec2;
use fleet_ai::profile::BehaviorProfile;
use fleet_ai::ships::{Faction, ShipId, ShipRecord, ShipTable, Transform};

/// Id used for the player ship in fixtures.
pub const PLAYER_ID: ShipId = 1000;

/// Enemy ship at rest.
#[must_use]
pub fn enemy_at(id: ShipId, x: f32, y: f32) -> ShipRecord {
    ShipRecord::new(id, Faction::Enemy, Vec2::new(x, y))
}

/// Player-faction ship at rest.
#[must_use]
pub fn player_ship_at(id: ShipId, x: f32, y: f32) -> ShipRecord {
    ShipRecord::new(id, Faction::Player, Vec2::new(x, y))
}

/// Ship table with a player ship at `(x, y)` under [`PLAYER_ID`].
#[must_use]
pub fn table_with_player(x: f32, y: f32) -> ShipTable {
    let mut ships = ShipTable::new();
    ships.insert_player(player_ship_at(PLAYER_ID, x, y));
    ships
}

/// Ship whose hull has lost every block.
#[must_use]
pub fn hollow_ship(id: ShipId, x: f32, y: f32) -> ShipRecord {
    let mut ship = enemy_at(id, x, y);
    ship.block_count = 0;
    ship
}

// ============================================================================
// Recording drivers
// ============================================================================

/// Shared log of every intent a controller sent to its drivers.
pub type IntentLog = Rc<RefCell<Vec<ShipIntent>>>;

/// Records movement intents; the weapon and utility recorders fill in the
/// rest of the same entry.
struct RecordingMovement {
    log: IntentLog,
    pending: MovementIntent,
}

impl MovementDriver for RecordingMovement {
    fn set_intent(&mut self, intent: MovementIntent) {
        self.pending = intent;
    }

    fn update(&mut self, _dt: f32, _ship: &ShipRecord, _transform: Transform) -> Result<()> {
        self.log.borrow_mut().push(ShipIntent {
            movement: self.pending,
            ..ShipIntent::default()
        });
        Ok(())
    }
}

struct RecordingWeapons {
    log: IntentLog,
    pending: WeaponIntent,
}

impl WeaponDriver for RecordingWeapons {
    fn set_intent(&mut self, intent: WeaponIntent) {
        self.pending = intent;
    }

    fn update(&mut self, _dt: f32, _ship: &ShipRecord, _transform: Transform) -> Result<()> {
        if let Some(last) = self.log.borrow_mut().last_mut() {
            last.weapons = self.pending;
        }
        Ok(())
    }
}

struct RecordingUtility {
    log: IntentLog,
    pending: UtilityIntent,
}

impl UtilityDriver for RecordingUtility {
    fn set_intent(&mut self, intent: UtilityIntent) {
        self.pending = intent;
    }

    fn update(&mut self, _dt: f32, _ship: &ShipRecord, _transform: Transform) -> Result<()> {
        if let Some(last) = self.log.borrow_mut().last_mut() {
            last.utility = self.pending;
        }
        Ok(())
    }
}

/// Controller whose drivers append every frame's intent to the returned log.
#[must_use]
pub fn recording_controller(ship: ShipId, profile: BehaviorProfile) -> (AgentController, IntentLog) {
    let log: IntentLog = Rc::new(RefCell::new(Vec::new()));
    let controller = AgentController::new(
        ship,
        profile,
        Box::new(RecordingMovement {
            log: Rc::clone(&log),
            pending: MovementIntent::default(),
        }),
        Box::new(RecordingWeapons {
            log: Rc::clone(&log),
            pending: WeaponIntent::default(),
        }),
        Box::new(RecordingUtility {
            log: Rc::clone(&log),
            pending: UtilityIntent::default(),
        }),
    );
    (controller, log)
}

/// Controller with recording drivers, log discarded.
#[must_use]
pub fn quiet_controller(ship: ShipId, profile: BehaviorProfile) -> AgentController {
    recording_controller(ship, profile).0
}

// ============================================================================
// Failing driver
// ============================================================================

/// Movement driver that fails every update.
#[derive(Debug, Default)]
pub struct FailingMovement {
    /// Number of updates attempted.
    pub attempts: Rc<RefCell<u32>>,
}

impl MovementDriver for FailingMovement {
    fn set_intent(&mut self, _intent: MovementIntent) {}

    fn update(&mut self, _dt: f32, ship: &ShipRecord, _transform: Transform) -> Result<()> {
        *self.attempts.borrow_mut() += 1;
        Err(AiError::driver("movement", ship.id, "thrusters jammed"))
    }
}

/// Controller whose movement driver always fails.
#[must_use]
pub fn failing_controller(ship: ShipId, profile: BehaviorProfile) -> (AgentController, Rc<RefCell<u32>>) {
    let attempts = Rc::new(RefCell::new(0));
    let log: IntentLog = Rc::new(RefCell::new(Vec::new()));
    let controller = AgentController::new(
        ship,
        profile,
        Box::new(FailingMovement {
            attempts: Rc::clone(&attempts),
        }),
        Box::new(RecordingWeapons {
            log: Rc::clone(&log),
            pending: WeaponIntent::default(),
        }),
        Box::new(RecordingUtility {
            log,
            pending: UtilityIntent::default(),
        }),
    );
    (controller, attempts)
}

//! Scenario runner: builds a sandbox from a [`Scenario`], applies scripted
//! events and collects a report.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use fleet_ai::orchestrator::{ControllerError, TickReport};
use fleet_ai::ships::{ShipDirectory, ShipId};
use fleet_test_utils::determinism::DeterminismResult;
use fleet_test_utils::sandbox::{Sandbox, ShipSnapshot};

use crate::scenario::{Scenario, ScenarioError, ScriptedEvent};

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Ticks simulated.
    pub ticks: u64,
    /// Seconds per tick.
    pub dt: f32,
    /// RNG seed used.
    pub seed: u64,
    /// State hash after the last tick.
    pub final_hash: u64,
    /// Controller updates across all ticks.
    pub updates: u64,
    /// Controller updates skipped by culling.
    pub skipped: u64,
    /// Controllers pruned, in removal order.
    pub removed: Vec<ShipId>,
    /// Driver failures.
    pub errors: Vec<ControllerError>,
    /// Final state of every ship.
    pub ships: Vec<ShipSnapshot>,
}

/// Drives one scenario tick by tick.
#[derive(Debug)]
pub struct ScenarioRunner {
    name: String,
    seed: u64,
    sandbox: Sandbox,
    events: Vec<ScriptedEvent>,
    player: Option<ShipId>,
    view_radius: Option<f32>,
    updates: u64,
    skipped: u64,
    removed: Vec<ShipId>,
    errors: Vec<ControllerError>,
}

impl ScenarioRunner {
    /// Build the world described by `scenario`.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;

        let mut sandbox = Sandbox::with_params(scenario.config.clone(), scenario.kinematics);
        let members = scenario.formation_members();
        let mut player = None;

        for setup in &scenario.ships {
            if members.contains(&setup.id) {
                continue;
            }
            let record = setup.record();
            if setup.player {
                player = Some(setup.id);
                sandbox.spawn_player(record);
            } else if let Some(name) = &setup.profile {
                sandbox.spawn(record, scenario.profile(name)?, setup.hunter);
            } else {
                sandbox.spawn_inert(record);
            }
        }

        for formation in &scenario.formations {
            let resolve = |id: ShipId| -> Result<_, ScenarioError> {
                let setup = scenario
                    .ship(id)
                    .ok_or_else(|| ScenarioError::Invalid(format!("unknown ship {id}")))?;
                let name = setup.profile.as_deref().unwrap_or("fighter");
                Ok((setup.record(), scenario.profile(name)?, setup.hunter))
            };

            let (leader, leader_profile, leader_hunter) = resolve(formation.leader)?;
            let mut followers = Vec::with_capacity(formation.followers.len());
            let mut hunters = Vec::with_capacity(formation.followers.len() + 1);
            hunters.push(leader_hunter);
            for &id in &formation.followers {
                let (ship, profile, hunter) = resolve(id)?;
                followers.push((ship, profile));
                hunters.push(hunter);
            }

            let ids = sandbox.spawn_formation_with(
                &formation.id,
                formation.shape,
                formation.spacing,
                (leader, leader_profile),
                followers,
            );
            for (id, hunter) in ids.into_iter().zip(hunters) {
                if let Some(controller) = sandbox.orchestrator.controller_mut(id) {
                    controller.set_hunter(hunter);
                }
            }
        }

        let mut events = scenario.events.clone();
        events.sort_by_key(ScriptedEvent::tick);

        tracing::info!(
            scenario = %scenario.name,
            ships = sandbox.ships.len(),
            controllers = sandbox.orchestrator.controller_count(),
            formations = scenario.formations.len(),
            "Scenario loaded"
        );

        Ok(Self {
            name: scenario.name.clone(),
            seed: scenario.config.seed,
            sandbox,
            events,
            player,
            view_radius: scenario.view_radius,
            updates: 0,
            skipped: 0,
            removed: Vec::new(),
            errors: Vec::new(),
        })
    }

    /// The underlying world.
    #[must_use]
    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    fn apply_due_events(&mut self) {
        let now = self.sandbox.tick();
        let due = self.events.iter().take_while(|e| e.tick() <= now).count();
        for event in self.events.drain(..due) {
            match event {
                ScriptedEvent::Destroy { ship, .. } => self.sandbox.destroy(ship),
                ScriptedEvent::Despawn { ship, .. } => {
                    tracing::debug!(ship, tick = now, "Ship despawned");
                    self.sandbox.despawn(ship);
                }
            }
        }
    }

    fn on_screen(&self) -> Option<HashSet<ShipId>> {
        let radius = self.view_radius?;
        let Some(player) = self.player.and_then(|id| self.sandbox.ships.ship(id)) else {
            return Some(HashSet::new());
        };
        Some(
            self.sandbox
                .ships
                .ships_in_radius(player.position(), radius)
                .into_iter()
                .map(|s| s.id)
                .collect(),
        )
    }

    /// Apply due events and advance one tick.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        self.apply_due_events();
        let active = self.on_screen();
        let report = self.sandbox.step(dt, active.as_ref());

        self.updates += report.updated as u64;
        self.skipped += report.skipped as u64;
        self.removed.extend(report.removed.iter().copied());
        self.errors.extend(report.errors.iter().cloned());
        report
    }

    /// Run `ticks` ticks and report the final state.
    pub fn run(mut self, ticks: u64, dt: f32) -> RunReport {
        for _ in 0..ticks {
            self.tick(dt);
        }

        tracing::info!(
            scenario = %self.name,
            ticks,
            updates = self.updates,
            removed = self.removed.len(),
            errors = self.errors.len(),
            "Scenario finished"
        );

        RunReport {
            scenario: self.name,
            ticks,
            dt,
            seed: self.seed,
            final_hash: self.sandbox.state_hash(),
            updates: self.updates,
            skipped: self.skipped,
            removed: self.removed,
            errors: self.errors,
            ships: self.sandbox.snapshot(),
        }
    }
}

/// Run `scenario` `runs` times and compare final hashes.
pub fn verify_scenario(
    scenario: &Scenario,
    runs: usize,
    ticks: u64,
    dt: f32,
) -> Result<DeterminismResult, ScenarioError> {
    let mut hashes = Vec::with_capacity(runs);
    for run in 0..runs {
        let report = ScenarioRunner::new(scenario)?.run(ticks, dt);
        tracing::debug!(run, hash = report.final_hash, "Verification run finished");
        hashes.push(report.final_hash);
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    Ok(DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    })
}

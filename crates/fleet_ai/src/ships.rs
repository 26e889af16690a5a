//! Ship boundary types consumed by the agent core.
//!
//! Ships themselves (block composition, damage, physics) live outside this
//! crate. The core only sees a read-only [`ShipRecord`] per ship, looked up
//! by id through a [`ShipDirectory`] every tick. Controllers never hold a
//! ship by reference, so a destroyed ship is simply a failed lookup.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Unique identifier for ships.
pub type ShipId = u64;

/// Default thrust power for engine blocks that don't declare one.
pub const DEFAULT_THRUST_POWER: f32 = 5.0;

/// Side a ship fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Faction {
    /// The human player and their allies.
    Player,
    /// Hostile AI.
    #[default]
    Enemy,
    /// Nobody's target, targets nobody.
    Neutral,
}

impl Faction {
    /// Whether a ship of this faction should engage a ship of `other`.
    #[must_use]
    pub fn is_hostile_to(self, other: Faction) -> bool {
        self != other && self != Faction::Neutral && other != Faction::Neutral
    }
}

/// Kinematic state of a ship.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// World position.
    pub position: Vec2,
    /// World velocity (units per second).
    pub velocity: Vec2,
    /// Hull rotation in radians.
    pub rotation: f32,
}

impl Transform {
    /// Transform at rest.
    #[must_use]
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
        }
    }
}

/// An engine block on the hull.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineBlock {
    /// Block rotation on the hull grid, in degrees.
    pub rotation_deg: f32,
    /// Thrust power, [`DEFAULT_THRUST_POWER`] when absent.
    pub thrust_power: Option<f32>,
}

impl EngineBlock {
    /// Rear-mounted engine pushing the hull toward local -y.
    pub const REAR: Self = Self {
        rotation_deg: 0.0,
        thrust_power: None,
    };

    /// Local-space direction this engine pushes the hull.
    ///
    /// Engines push opposite the way they face.
    #[must_use]
    pub fn local_thrust_direction(&self) -> Vec2 {
        let facing = self.rotation_deg.to_radians();
        Vec2::new(facing.sin(), -facing.cos())
    }

    /// Thrust power, defaulted.
    #[must_use]
    pub fn power(&self) -> f32 {
        self.thrust_power.unwrap_or(DEFAULT_THRUST_POWER)
    }
}

/// Modifiers that change how a ship is treated by AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShipAffixes {
    /// Ship cannot be damaged; never picked as a target.
    pub invulnerable: bool,
}

/// Read-only view of one ship for a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipRecord {
    /// Ship id.
    pub id: ShipId,
    /// Owning faction.
    pub faction: Faction,
    /// Current transform.
    pub transform: Transform,
    /// Set once the ship has been destroyed but not yet despawned.
    pub destroyed: bool,
    /// Total number of hull blocks. Zero means the hull is structurally
    /// invalid and its controller must be dropped.
    pub block_count: usize,
    /// Engine blocks, used for net thrust direction.
    pub engines: Vec<EngineBlock>,
    /// Behavior-affecting affixes.
    pub affixes: ShipAffixes,
    /// Touching another hull this frame.
    pub colliding: bool,
}

impl ShipRecord {
    /// A one-engine ship at rest.
    #[must_use]
    pub fn new(id: ShipId, faction: Faction, position: Vec2) -> Self {
        Self {
            id,
            faction,
            transform: Transform::at(position),
            destroyed: false,
            block_count: 2,
            engines: vec![EngineBlock::REAR],
            affixes: ShipAffixes::default(),
            colliding: false,
        }
    }

    /// Set velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.transform.velocity = velocity;
        self
    }

    /// Set rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.transform.rotation = rotation;
        self
    }

    /// Replace engine blocks.
    #[must_use]
    pub fn with_engines(mut self, engines: Vec<EngineBlock>) -> Self {
        self.engines = engines;
        self
    }

    /// Mark invulnerable.
    #[must_use]
    pub fn invulnerable(mut self) -> Self {
        self.affixes.invulnerable = true;
        self
    }

    /// Current position shortcut.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    /// Whether the hull still has the structure a controller needs.
    #[must_use]
    pub fn is_structurally_valid(&self) -> bool {
        self.block_count > 0
    }

    /// Whether this ship can be picked as a target by `attacker`.
    #[must_use]
    pub fn is_valid_target_for(&self, attacker: &ShipRecord) -> bool {
        self.id != attacker.id
            && !self.destroyed
            && !self.affixes.invulnerable
            && attacker.faction.is_hostile_to(self.faction)
    }
}

/// Lookup surface the agent core uses to see the world.
pub trait ShipDirectory {
    /// Ship by id, `None` once it has been despawned.
    fn ship(&self, id: ShipId) -> Option<&ShipRecord>;

    /// The player's ship, if one exists.
    fn player_ship(&self) -> Option<&ShipRecord>;

    /// Every ship within `radius` of `center`, in ascending id order.
    fn ships_in_radius(&self, center: Vec2, radius: f32) -> Vec<&ShipRecord>;
}

/// Nearest hostile to `origin` within `range`, ties broken by lower id.
///
/// Neutral ships never pick targets.
pub fn find_nearest_hostile<'a, D>(
    origin: &ShipRecord,
    ships: &'a D,
    range: f32,
) -> Option<&'a ShipRecord>
where
    D: ShipDirectory + ?Sized,
{
    if origin.faction == Faction::Neutral {
        return None;
    }

    let origin_pos = origin.position();
    let range_sq = range * range;
    let mut best: Option<(&ShipRecord, f32)> = None;

    for candidate in ships.ships_in_radius(origin_pos, range) {
        if !candidate.is_valid_target_for(origin) {
            continue;
        }
        let dist_sq = origin_pos.distance_squared(candidate.position());
        if dist_sq > range_sq {
            continue;
        }
        match best {
            None => best = Some((candidate, dist_sq)),
            Some((_, best_dist)) if dist_sq < best_dist => best = Some((candidate, dist_sq)),
            _ => {}
        }
    }

    best.map(|(ship, _)| ship)
}

// ============================================================================
// Spatial grid
// ============================================================================

/// Default grid cell size; ships are large.
pub const DEFAULT_CELL_SIZE: f32 = 1000.0;

/// Uniform grid bucketing ship ids by position.
#[derive(Debug, Clone)]
pub struct ShipGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<ShipId>>,
    ship_cells: HashMap<ShipId, (i32, i32)>,
}

impl ShipGrid {
    /// Create an empty grid.
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            ship_cells: HashMap::new(),
        }
    }

    fn cell_of(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    /// Insert or move a ship.
    pub fn upsert(&mut self, id: ShipId, position: Vec2) {
        let cell = self.cell_of(position);
        if self.ship_cells.get(&id) == Some(&cell) {
            return;
        }
        self.remove(id);
        self.cells.entry(cell).or_default().push(id);
        self.ship_cells.insert(id, cell);
    }

    /// Remove a ship if tracked.
    pub fn remove(&mut self, id: ShipId) {
        let Some(cell) = self.ship_cells.remove(&id) else {
            return;
        };
        if let Some(bucket) = self.cells.get_mut(&cell) {
            bucket.retain(|&other| other != id);
            if bucket.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    /// Ids in every cell overlapping the circle's bounding box, unsorted.
    ///
    /// Walks whichever is smaller: the cells under the box or the occupied
    /// cells.
    #[must_use]
    pub fn candidates(&self, center: Vec2, radius: f32) -> Vec<ShipId> {
        let (min_x, min_y) = self.cell_of(Vec2::new(center.x - radius, center.y - radius));
        let (max_x, max_y) = self.cell_of(Vec2::new(center.x + radius, center.y + radius));

        let span = (u64::from(max_x.abs_diff(min_x)) + 1)
            .saturating_mul(u64::from(max_y.abs_diff(min_y)) + 1);
        if span > self.cells.len() as u64 {
            return self
                .cells
                .iter()
                .filter(|((cx, cy), _)| {
                    (min_x..=max_x).contains(cx) && (min_y..=max_y).contains(cy)
                })
                .flat_map(|(_, bucket)| bucket.iter().copied())
                .collect();
        }

        let mut out = Vec::new();
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                if let Some(bucket) = self.cells.get(&(cx, cy)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
        out
    }

    /// Number of tracked ships.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ship_cells.len()
    }

    /// Whether the grid is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ship_cells.is_empty()
    }
}

impl Default for ShipGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

/// In-memory [`ShipDirectory`] backed by a spatial grid.
#[derive(Debug, Clone, Default)]
pub struct ShipTable {
    ships: BTreeMap<ShipId, ShipRecord>,
    grid: ShipGrid,
    player: Option<ShipId>,
}

impl ShipTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a ship.
    pub fn insert(&mut self, ship: ShipRecord) {
        self.grid.upsert(ship.id, ship.position());
        self.ships.insert(ship.id, ship);
    }

    /// Insert a ship and mark it as the player.
    pub fn insert_player(&mut self, ship: ShipRecord) {
        self.player = Some(ship.id);
        self.insert(ship);
    }

    /// Remove a ship entirely.
    pub fn remove(&mut self, id: ShipId) -> Option<ShipRecord> {
        self.grid.remove(id);
        if self.player == Some(id) {
            self.player = None;
        }
        self.ships.remove(&id)
    }

    /// Mutable access to a ship's flags. Move ships with
    /// [`ShipTable::set_transform`] so the grid stays current.
    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut ShipRecord> {
        self.ships.get_mut(&id)
    }

    /// Replace a ship's transform and refresh its grid cell.
    pub fn set_transform(&mut self, id: ShipId, transform: Transform) {
        if let Some(ship) = self.ships.get_mut(&id) {
            ship.transform = transform;
            self.grid.upsert(id, transform.position);
        }
    }

    /// Iterate ships in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &ShipRecord> {
        self.ships.values()
    }

    /// Number of ships.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ships.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }
}

impl ShipDirectory for ShipTable {
    fn ship(&self, id: ShipId) -> Option<&ShipRecord> {
        self.ships.get(&id)
    }

    fn player_ship(&self) -> Option<&ShipRecord> {
        self.player.and_then(|id| self.ships.get(&id))
    }

    fn ships_in_radius(&self, center: Vec2, radius: f32) -> Vec<&ShipRecord> {
        let radius_sq = radius * radius;
        let mut ids = self.grid.candidates(center, radius);
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.ships.get(&id))
            .filter(|ship| ship.position().distance_squared(center) <= radius_sq)
            .collect()
    }
}

//! Formation registry and prefab layouts.
//!
//! The registry is pure storage: an external spawner registers a formation
//! when a group spawns and removes it when the group disbands. Followers
//! read it every frame to find their slot; nothing here runs per tick.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::ships::ShipId;

/// Formation identifier.
pub type FormationId = String;

/// A follower and its slot relative to the leader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationMember {
    /// Follower ship.
    pub ship_id: ShipId,
    /// Local-space offset from the leader, rotated by the leader's heading.
    pub offset: Vec2,
}

/// A leader and its followers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    /// Formation id.
    pub formation_id: FormationId,
    /// Leader ship.
    pub leader_id: ShipId,
    /// Followers and their slots.
    pub members: Vec<FormationMember>,
}

impl Formation {
    /// Whether `ship` is the leader or one of the followers.
    #[must_use]
    pub fn includes(&self, ship: ShipId) -> bool {
        self.leader_id == ship || self.members.iter().any(|m| m.ship_id == ship)
    }
}

/// Lookup table from formation id to formation, with a ship index.
#[derive(Debug, Clone, Default)]
pub struct FormationRegistry {
    formations: BTreeMap<FormationId, Formation>,
    /// Formations naming each ship, in registration order.
    by_ship: HashMap<ShipId, Vec<FormationId>>,
}

impl FormationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a formation.
    pub fn register_formation(&mut self, formation: Formation) {
        tracing::debug!(
            formation = %formation.formation_id,
            leader = formation.leader_id,
            members = formation.members.len(),
            "Registering formation"
        );

        self.remove_formation(&formation.formation_id);

        let ships = std::iter::once(formation.leader_id)
            .chain(formation.members.iter().map(|m| m.ship_id));
        for ship in ships {
            let ids = self.by_ship.entry(ship).or_default();
            if !ids.contains(&formation.formation_id) {
                ids.push(formation.formation_id.clone());
            }
        }
        self.formations
            .insert(formation.formation_id.clone(), formation);
    }

    /// Remove a formation, returning it if it existed.
    pub fn remove_formation(&mut self, formation_id: &str) -> Option<Formation> {
        let removed = self.formations.remove(formation_id)?;
        self.by_ship.retain(|_, ids| {
            ids.retain(|id| id != formation_id);
            !ids.is_empty()
        });
        tracing::debug!(formation = %formation_id, "Removed formation");
        Some(removed)
    }

    /// Drop every formation.
    pub fn clear(&mut self) {
        self.formations.clear();
        self.by_ship.clear();
    }

    /// Formation by id.
    #[must_use]
    pub fn get_formation(&self, formation_id: &str) -> Option<&Formation> {
        self.formations.get(formation_id)
    }

    /// Every formation naming `ship`, oldest registration first.
    fn formations_for(&self, ship: ShipId) -> impl Iterator<Item = &Formation> {
        self.by_ship
            .get(&ship)
            .into_iter()
            .flatten()
            .filter_map(|id| self.formations.get(id))
    }

    /// Formation containing `ship` as leader or follower.
    ///
    /// A ship listed in several formations resolves to the earliest one still
    /// registered.
    #[must_use]
    pub fn formation_by_ship_id(&self, ship: ShipId) -> Option<&Formation> {
        self.formations_for(ship).next()
    }

    /// Leader of whatever formation `ship` belongs to (itself, for leaders).
    #[must_use]
    pub fn leader_id_for_ship(&self, ship: ShipId) -> Option<ShipId> {
        self.formation_by_ship_id(ship).map(|f| f.leader_id)
    }

    /// Slot offset for a follower. Leaders have no offset.
    #[must_use]
    pub fn offset_for_ship(&self, ship: ShipId) -> Option<Vec2> {
        self.formations_for(ship).find_map(|f| {
            f.members
                .iter()
                .find(|m| m.ship_id == ship)
                .map(|m| m.offset)
        })
    }

    /// Number of registered formations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.formations.len()
    }

    /// Whether no formations are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formations.is_empty()
    }
}

// ============================================================================
// Prefab layouts
// ============================================================================

/// Named formation shapes.
///
/// Local space has the leader at the origin with `-y` ahead of it; followers
/// mostly trail at positive `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormationShape {
    /// Two wingmen in an equilateral triangle.
    SmallWedge,
    /// Four wingmen in two ranks.
    MediumWedge,
    /// Six wingmen in three ranks.
    LargeWedge,
    /// Six ships abreast.
    Line,
    /// Four corners around the leader.
    Box,
    /// Four points of a diamond.
    Diamond,
    /// Swept wings behind a point leader.
    ArrowHead,
    /// Escorts fore and aft in a column.
    Convoy,
    /// Four diagonals.
    X,
    /// Two triangles meeting at the leader.
    HourGlass,
    /// Two rows of three behind the leader.
    Phalanx,
    /// Centre column with staggered flanks.
    WingedColumn,
}

impl FormationShape {
    /// Unit-spaced slots for this shape.
    #[must_use]
    pub fn unit_layout(self) -> &'static [(f32, f32)] {
        match self {
            FormationShape::SmallWedge => &[(-0.866, 0.5), (0.866, 0.5)],
            FormationShape::MediumWedge => &[(-0.866, 0.5), (0.866, 0.5), (-1.732, 1.5), (1.732, 1.5)],
            FormationShape::LargeWedge => &[
                (-0.866, 0.5),
                (0.866, 0.5),
                (-1.732, 1.5),
                (1.732, 1.5),
                (-2.598, 2.5),
                (2.598, 2.5),
            ],
            FormationShape::Line => &[(-3.0, 0.0), (-2.0, 0.0), (-1.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)],
            FormationShape::Box | FormationShape::X => &[(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)],
            FormationShape::Diamond => &[(0.0, -1.0), (-1.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
            FormationShape::ArrowHead => &[(-2.0, 1.0), (-1.0, 0.5), (1.0, 0.5), (2.0, 1.0)],
            FormationShape::Convoy => &[(0.0, -2.0), (0.0, -1.0), (0.0, 1.0), (0.0, 2.0)],
            FormationShape::HourGlass => &[
                (-1.0, -1.0),
                (1.0, -1.0),
                (0.0, -2.0),
                (-1.0, 1.0),
                (1.0, 1.0),
                (0.0, 2.0),
            ],
            FormationShape::Phalanx => &[(-1.0, 1.0), (0.0, 1.0), (1.0, 1.0), (-1.0, 2.0), (0.0, 2.0), (1.0, 2.0)],
            FormationShape::WingedColumn => &[
                (0.0, 1.0),
                (0.0, 2.0),
                (-1.0, 0.5),
                (1.0, 0.5),
                (-1.0, 1.5),
                (1.0, 1.5),
            ],
        }
    }

    /// Number of follower slots.
    #[must_use]
    pub fn capacity(self) -> usize {
        self.unit_layout().len()
    }

    /// Slots scaled by `spacing` world units.
    #[must_use]
    pub fn offsets(self, spacing: f32) -> Vec<Vec2> {
        self.unit_layout()
            .iter()
            .map(|&(x, y)| Vec2::new(x * spacing, y * spacing))
            .collect()
    }

    /// Build a formation record, pairing followers with slots in order.
    ///
    /// Followers beyond the shape's capacity are left out of the record.
    #[must_use]
    pub fn build(
        self,
        formation_id: impl Into<FormationId>,
        leader_id: ShipId,
        followers: &[ShipId],
        spacing: f32,
    ) -> Formation {
        let members = followers
            .iter()
            .zip(self.offsets(spacing))
            .map(|(&ship_id, offset)| FormationMember { ship_id, offset })
            .collect();

        Formation {
            formation_id: formation_id.into(),
            leader_id,
            members,
        }
    }
}

//! Collision Queries
//!
//! Deterministic tile collision for actors and hooks. Everything outside the
//! map is solid.

use crate::core::fixed::{fixed_div, fixed_floor_int, fixed_round, from_int, Fixed, FIXED_ONE};
use crate::core::vec2::FixedVec2;
use crate::game::map::{Rotation, SwitchKind, Tile, TileKind, TileMap, TILE_SIZE};
use crate::game::switch::SwitchState;
use crate::game::teams::TEAM_SUPER;

/// Bitmask of blocked movement directions.
pub type MoveRestrictions = u8;

pub const CANT_MOVE_LEFT: MoveRestrictions = 1 << 0;
pub const CANT_MOVE_RIGHT: MoveRestrictions = 1 << 1;
pub const CANT_MOVE_UP: MoveRestrictions = 1 << 2;
pub const CANT_MOVE_DOWN: MoveRestrictions = 1 << 3;

/// Tiles beyond the map edge before an actor counts as lost.
const CLIP_MARGIN_TILES: i32 = 200;

/// Door visibility for restriction queries: the switch table and the team.
pub type DoorView<'a> = Option<(&'a SwitchState, u8)>;

/// Result of a line query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineHit {
    /// Kind of the solid tile hit, `None` when the line is free.
    pub kind: Option<TileKind>,
    /// First blocked sample, or the end point.
    pub at: FixedVec2,
    /// Last free sample before the hit, or the end point.
    pub before: FixedVec2,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Probe {
    Here,
    Right,
    Down,
    Left,
    Up,
}

const PROBES: [(Probe, i32, i32); 5] = [
    (Probe::Here, 0, 0),
    (Probe::Right, 1, 0),
    (Probe::Down, 0, 1),
    (Probe::Left, -1, 0),
    (Probe::Up, 0, -1),
];

/// Zero the velocity components that point into a blocked direction.
#[inline]
pub fn clamp_vel(restrictions: MoveRestrictions, mut vel: FixedVec2) -> FixedVec2 {
    if vel.x > 0 && restrictions & CANT_MOVE_RIGHT != 0 {
        vel.x = 0;
    }
    if vel.x < 0 && restrictions & CANT_MOVE_LEFT != 0 {
        vel.x = 0;
    }
    if vel.y > 0 && restrictions & CANT_MOVE_DOWN != 0 {
        vel.y = 0;
    }
    if vel.y < 0 && restrictions & CANT_MOVE_UP != 0 {
        vel.y = 0;
    }
    vel
}

fn stopper_restrictions(kind: TileKind, rotation: Rotation) -> MoveRestrictions {
    match (kind, rotation) {
        (TileKind::Stop, Rotation::R0) => CANT_MOVE_DOWN,
        (TileKind::Stop, Rotation::R90) => CANT_MOVE_LEFT,
        (TileKind::Stop, Rotation::R180) => CANT_MOVE_UP,
        (TileKind::Stop, Rotation::R270) => CANT_MOVE_RIGHT,
        (TileKind::StopS, Rotation::R0 | Rotation::R180) => CANT_MOVE_DOWN | CANT_MOVE_UP,
        (TileKind::StopS, Rotation::R90 | Rotation::R270) => CANT_MOVE_LEFT | CANT_MOVE_RIGHT,
        (TileKind::StopA, _) => CANT_MOVE_LEFT | CANT_MOVE_RIGHT | CANT_MOVE_UP | CANT_MOVE_DOWN,
        _ => 0,
    }
}

/// Stoppers block moving onto them; one-way stoppers also block from inside.
fn probe_restrictions(probe: Probe, kind: TileKind, rotation: Rotation) -> MoveRestrictions {
    let raw = stopper_restrictions(kind, rotation);
    let mask = match probe {
        Probe::Here if kind == TileKind::Stop => return raw,
        Probe::Here => 0,
        Probe::Right => CANT_MOVE_RIGHT,
        Probe::Down => CANT_MOVE_DOWN,
        Probe::Left => CANT_MOVE_LEFT,
        Probe::Up => CANT_MOVE_UP,
    };
    raw & mask
}

impl TileMap {
    /// Tile of the game layer at whole-unit coordinates. Outside is solid.
    #[inline]
    fn game_tile_at(&self, x: i32, y: i32) -> Tile {
        match self.cell(x, y) {
            Some(index) => self.game_tile(index),
            None => Tile::new(TileKind::Solid),
        }
    }

    /// Solid at whole-unit coordinates.
    #[inline]
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        self.game_tile_at(x, y).kind.is_solid()
    }

    /// Solid at a position, rounded to whole units.
    #[inline]
    pub fn check_point(&self, pos: FixedVec2) -> bool {
        self.is_solid(fixed_round(pos.x) >> 16, fixed_round(pos.y) >> 16)
    }

    /// Game layer kind at a position.
    pub fn collision_at(&self, pos: FixedVec2) -> TileKind {
        self.game_tile_at(fixed_round(pos.x) >> 16, fixed_round(pos.y) >> 16).kind
    }

    /// Front layer kind at a position (air outside the map).
    pub fn front_collision_at(&self, pos: FixedVec2) -> TileKind {
        match self.cell(fixed_round(pos.x) >> 16, fixed_round(pos.y) >> 16) {
            Some(index) => self.front_tile(index).kind,
            None => TileKind::Air,
        }
    }

    /// Whether a square box of edge `size` centred at `pos` touches a solid tile.
    pub fn test_box(&self, pos: FixedVec2, size: Fixed) -> bool {
        let half = size / 2;
        self.check_point(FixedVec2::new(pos.x - half, pos.y - half))
            || self.check_point(FixedVec2::new(pos.x + half, pos.y - half))
            || self.check_point(FixedVec2::new(pos.x - half, pos.y + half))
            || self.check_point(FixedVec2::new(pos.x + half, pos.y + half))
    }

    /// Swept box movement in `floor(|vel|) + 1` sub-steps.
    ///
    /// A blocked axis loses its velocity component. Returns the new position
    /// and velocity.
    pub fn move_box(&self, mut pos: FixedVec2, mut vel: FixedVec2, size: Fixed) -> (FixedVec2, FixedVec2) {
        let distance = vel.length();
        if distance == 0 {
            return (pos, vel);
        }
        let steps = fixed_floor_int(distance) + 1;

        for _ in 0..steps {
            let mut next = pos + vel.div_int(steps);
            if self.test_box(next, size) {
                let mut hits = 0;
                if self.test_box(FixedVec2::new(pos.x, next.y), size) {
                    next.y = pos.y;
                    vel.y = 0;
                    hits += 1;
                }
                if self.test_box(FixedVec2::new(next.x, pos.y), size) {
                    next.x = pos.x;
                    vel.x = 0;
                    hits += 1;
                }
                // Corner: neither axis alone collides
                if hits == 0 {
                    next = pos;
                    vel = FixedVec2::ZERO;
                }
            }
            pos = next;
        }
        (pos, vel)
    }

    /// First solid sample along a line.
    pub fn intersect_line(&self, from: FixedVec2, to: FixedVec2) -> LineHit {
        let distance = from.distance(to);
        let end = fixed_floor_int(distance.saturating_add(FIXED_ONE));
        let mut last = from;

        for i in 0..=end {
            let t = if end == 0 { 0 } else { fixed_div(from_int(i), from_int(end)) };
            let sample = from.lerp(to, t);
            if self.check_point(sample) {
                return LineHit { kind: Some(self.collision_at(sample)), at: sample, before: last };
            }
            last = sample;
        }
        LineHit { kind: None, at: to, before: to }
    }

    /// Movement restrictions around a position.
    ///
    /// Probes the centre and four points `distance` away. Doors only count
    /// when their switch is active for the viewing team; the super team
    /// never sees doors. `center` overrides the cell used for the centre probe.
    pub fn move_restrictions(
        &self,
        pos: FixedVec2,
        distance: Fixed,
        doors: DoorView<'_>,
        center: Option<usize>,
    ) -> MoveRestrictions {
        let mut restrictions = 0;
        for (probe, dx, dy) in PROBES {
            let probe_pos = FixedVec2::new(pos.x + dx * distance, pos.y + dy * distance);
            let index = match (probe, center) {
                (Probe::Here, Some(index)) => index,
                _ => self.clamped_index(probe_pos),
            };
            for tile in [self.game_tile(index), self.front_tile(index)] {
                restrictions |= probe_restrictions(probe, tile.kind, tile.rotation);
            }
            if let (Some((switches, team)), Some(sw)) = (doors, self.switch_tile(index)) {
                if let SwitchKind::Door(kind, rotation) = sw.kind {
                    if team != TEAM_SUPER && switches.is_active(sw.number, team) {
                        restrictions |= probe_restrictions(probe, kind, rotation);
                    }
                }
            }
        }
        restrictions
    }

    /// Cell index of a position if something interesting lives there.
    pub fn map_index(&self, pos: FixedVec2) -> Option<usize> {
        let index = self.clamped_index(pos);
        self.tile_exists(index).then_some(index)
    }

    /// Interesting cells crossed between two positions, in path order,
    /// without consecutive duplicates.
    pub fn map_indices(&self, prev: FixedVec2, pos: FixedVec2) -> Vec<usize> {
        let distance = prev.distance(pos);
        if distance == 0 {
            return self.map_index(pos).into_iter().collect();
        }

        let end = fixed_floor_int(distance.saturating_add(FIXED_ONE));
        let mut indices = Vec::new();
        let mut last = None;
        for i in 0..end {
            let t = fixed_div(from_int(i), distance);
            let index = self.clamped_index(prev.lerp(pos, t));
            if self.tile_exists(index) && last != Some(index) {
                indices.push(index);
                last = Some(index);
            }
        }
        indices
    }

    /// Whether a position is far outside the map.
    pub fn is_clipped(&self, pos: FixedVec2) -> bool {
        let tx = (fixed_round(pos.x) >> 16) / TILE_SIZE;
        let ty = (fixed_round(pos.y) >> 16) / TILE_SIZE;
        tx < -CLIP_MARGIN_TILES
            || tx > self.width() as i32 + CLIP_MARGIN_TILES
            || ty < -CLIP_MARGIN_TILES
            || ty > self.height() as i32 + CLIP_MARGIN_TILES
    }
}

// =============================================================================
// TESTS
// =============================================================================

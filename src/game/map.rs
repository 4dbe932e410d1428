//! Tile Map
//!
//! Static tile layers of a race map. Every layer is a dense `Vec` indexed by
//! `y * width + x`. The map is read-only during a tick; switch state lives in
//! [`SwitchState`](crate::game::switch::SwitchState).
//!
//! Maps are built through [`TileMapBuilder`] or parsed from a compact ASCII
//! form used by tests and the demo binary:
//!
//! ```text
//! #  solid          x  unhookable     D  death
//! F  freeze         U  unfreeze       f  deep freeze   u  deep unfreeze
//! S  start          E  finish         0-9  checkpoints
//! W  walljump       R  refill jumps   J/j  jetpack on/off
//! H/h  endless hook on/off            O/o  solo on/off
//! v ^ < >  one-way stoppers           =  two-way stopper   A  all-way stopper
//! @  spawn point    .  air
//! ```

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;

/// Tile edge length in world units.
pub const TILE_SIZE: i32 = 32;

// =============================================================================
// TILE TYPES
// =============================================================================

/// Rotation of a directional tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

/// Tile kind of the game and front layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Air,
    Solid,
    /// Solid, but hooks bounce off.
    NoHook,
    Death,
    Freeze,
    Unfreeze,
    DeepFreeze,
    DeepUnfreeze,
    Start,
    Finish,
    /// Race checkpoint 0..=24.
    Checkpoint(u8),
    UnlockTeam,
    SoloEnable,
    SoloDisable,
    EndlessHookEnable,
    EndlessHookDisable,
    HitEnable,
    HitDisable,
    /// "No player collision" on.
    NpcDisable,
    NpcEnable,
    /// "No player hook" on.
    NphDisable,
    NphEnable,
    UnlimitedJumpsEnable,
    UnlimitedJumpsDisable,
    Walljump,
    JetpackEnable,
    JetpackDisable,
    RefillJumps,
    TeleGunEnable,
    TeleGunDisable,
    TeleGrenadeEnable,
    TeleGrenadeDisable,
    TeleLaserEnable,
    TeleLaserDisable,
    /// One-way stopper.
    Stop,
    /// Two-way stopper.
    StopS,
    /// All-way stopper.
    StopA,
}

impl TileKind {
    /// Blocks movement.
    #[inline]
    pub fn is_solid(self) -> bool {
        matches!(self, TileKind::Solid | TileKind::NoHook)
    }

    /// Carries a rule the rule engine reacts to.
    #[inline]
    pub fn is_special(self) -> bool {
        !matches!(self, TileKind::Air | TileKind::Solid | TileKind::NoHook)
    }
}

/// A tile of the game or front layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub rotation: Rotation,
}

impl Tile {
    pub const AIR: Tile = Tile { kind: TileKind::Air, rotation: Rotation::R0 };

    pub const fn new(kind: TileKind) -> Self {
        Self { kind, rotation: Rotation::R0 }
    }

    pub const fn rotated(kind: TileKind, rotation: Rotation) -> Self {
        Self { kind, rotation }
    }
}

/// Teleporter tile kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeleKind {
    In,
    EvilIn,
    Out,
    /// Records the tele checkpoint number.
    Checkpoint,
    CheckOut,
    CheckIn,
    CheckEvilIn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeleTile {
    pub kind: TeleKind,
    pub number: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedupTile {
    /// Acceleration per tick; 255 sets the velocity directly.
    pub force: u8,
    /// Target speed times five; 0 = unbounded.
    pub max_speed: u8,
    /// Direction in whole degrees, 0 = right, 90 = down.
    pub angle: i16,
}

/// Switch layer tile kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchKind {
    Open,
    TimedOpen,
    TimedClose,
    Close,
    /// Freeze for `delay` seconds while the switch is active.
    Freeze,
    DeepFreeze,
    DeepUnfreeze,
    /// Allow hitting with the weapon whose slot index is `delay`.
    HitEnable,
    HitDisable,
    /// Set the jump budget to `delay` (255 = ground jump only).
    Jump,
    /// Add `delay` minutes and `number` seconds to the run time.
    AddTime,
    /// Subtract `delay` minutes and `number` seconds from the run time.
    SubtractTime,
    /// Stopper that only exists while switch `number` is active.
    Door(TileKind, Rotation),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchTile {
    pub kind: SwitchKind,
    pub number: u8,
    pub delay: u8,
}

// =============================================================================
// TILE MAP
// =============================================================================

/// Errors raised while building a map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    /// Map has no cells.
    #[error("map is empty")]
    Empty,

    /// Rows of the ASCII form differ in length.
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged { row: usize, found: usize, expected: usize },

    /// Unknown ASCII character.
    #[error("unknown tile '{ch}' at ({x}, {y})")]
    UnknownTile { ch: char, x: usize, y: usize },

    /// Map exceeds the fixed-point coordinate range.
    #[error("map {width}x{height} exceeds 1000 tiles per axis")]
    TooLarge { width: usize, height: usize },
}

/// Static tile world.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileMap {
    pub name: String,
    width: usize,
    height: usize,
    game: Vec<Tile>,
    front: Vec<Tile>,
    tele: Vec<Option<TeleTile>>,
    speedup: Vec<Option<SpeedupTile>>,
    switch: Vec<Option<SwitchTile>>,
    tune: Vec<u8>,
    spawns: Vec<FixedVec2>,
    tele_outs: BTreeMap<u8, Vec<FixedVec2>>,
    tele_check_outs: BTreeMap<u8, Vec<FixedVec2>>,
    switch_count: u16,
}

/// Centre of a tile in world units.
#[inline]
pub fn tile_center(x: usize, y: usize) -> FixedVec2 {
    FixedVec2::from_ints(
        x as i32 * TILE_SIZE + TILE_SIZE / 2,
        y as i32 * TILE_SIZE + TILE_SIZE / 2,
    )
}

impl TileMap {
    /// Parse the ASCII form.
    pub fn from_ascii(name: &str, text: &str) -> Result<TileMap, MapError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);

        let mut builder = TileMapBuilder::new(name, width, height)?;
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(MapError::Ragged { row: y, found, expected: width });
            }
            for (x, ch) in row.chars().enumerate() {
                if ch == '@' {
                    builder.spawn(x, y);
                    continue;
                }
                let tile = ascii_tile(ch).ok_or(MapError::UnknownTile { ch, x, y })?;
                builder.game(x, y, tile);
            }
        }
        Ok(builder.build())
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Spawn points in map order.
    pub fn spawns(&self) -> &[FixedVec2] {
        &self.spawns
    }

    /// Number of switch numbers in use.
    pub fn switch_count(&self) -> u16 {
        self.switch_count
    }

    /// Destinations of teleporter `number`.
    pub fn tele_outs(&self, number: u8) -> &[FixedVec2] {
        self.tele_outs.get(&number).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Destinations of checkpoint teleporter `number`.
    pub fn tele_check_outs(&self, number: u8) -> &[FixedVec2] {
        self.tele_check_outs.get(&number).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell coordinates of a position, `None` outside the map.
    #[inline]
    pub fn cell(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (tx, ty) = (x as usize / TILE_SIZE as usize, y as usize / TILE_SIZE as usize);
        if tx >= self.width || ty >= self.height {
            return None;
        }
        Some(ty * self.width + tx)
    }

    /// Cell index of a position clamped into the map.
    #[inline]
    pub fn clamped_index(&self, pos: FixedVec2) -> usize {
        let tx = ((pos.x >> 16) / TILE_SIZE).clamp(0, self.width as i32 - 1) as usize;
        let ty = ((pos.y >> 16) / TILE_SIZE).clamp(0, self.height as i32 - 1) as usize;
        ty * self.width + tx
    }

    /// Game layer tile at a cell index.
    #[inline]
    pub fn game_tile(&self, index: usize) -> Tile {
        self.game.get(index).copied().unwrap_or_default()
    }

    /// Front layer tile at a cell index.
    #[inline]
    pub fn front_tile(&self, index: usize) -> Tile {
        self.front.get(index).copied().unwrap_or_default()
    }

    #[inline]
    pub fn tele(&self, index: usize) -> Option<TeleTile> {
        self.tele.get(index).copied().flatten()
    }

    #[inline]
    pub fn speedup(&self, index: usize) -> Option<SpeedupTile> {
        self.speedup.get(index).copied().flatten()
    }

    #[inline]
    pub fn switch_tile(&self, index: usize) -> Option<SwitchTile> {
        self.switch.get(index).copied().flatten()
    }

    /// Tune zone of a cell (0 = global).
    #[inline]
    pub fn tune_zone(&self, index: usize) -> u8 {
        self.tune.get(index).copied().unwrap_or(0)
    }

    /// Whether any layer has something the rule engine reacts to.
    pub fn tile_exists(&self, index: usize) -> bool {
        if index >= self.game.len() {
            return false;
        }
        self.game_tile(index).kind.is_special()
            || self.front_tile(index).kind.is_special()
            || self.tele(index).is_some()
            || self.speedup(index).is_some()
            || self.switch_tile(index).is_some()
            || self.tune_zone(index) != 0
    }
}

fn ascii_tile(ch: char) -> Option<Tile> {
    use TileKind::*;
    let tile = match ch {
        '.' | ' ' => Tile::AIR,
        '#' => Tile::new(Solid),
        'x' => Tile::new(NoHook),
        'D' => Tile::new(Death),
        'F' => Tile::new(Freeze),
        'U' => Tile::new(Unfreeze),
        'f' => Tile::new(DeepFreeze),
        'u' => Tile::new(DeepUnfreeze),
        'S' => Tile::new(Start),
        'E' => Tile::new(Finish),
        'W' => Tile::new(Walljump),
        'R' => Tile::new(RefillJumps),
        'J' => Tile::new(JetpackEnable),
        'j' => Tile::new(JetpackDisable),
        'H' => Tile::new(EndlessHookEnable),
        'h' => Tile::new(EndlessHookDisable),
        'O' => Tile::new(SoloEnable),
        'o' => Tile::new(SoloDisable),
        'v' => Tile::rotated(Stop, Rotation::R0),
        '<' => Tile::rotated(Stop, Rotation::R90),
        '^' => Tile::rotated(Stop, Rotation::R180),
        '>' => Tile::rotated(Stop, Rotation::R270),
        '=' => Tile::rotated(StopS, Rotation::R0),
        'A' => Tile::new(StopA),
        '0'..='9' => Tile::new(Checkpoint(ch as u8 - b'0')),
        _ => return None,
    };
    Some(tile)
}

// =============================================================================
// BUILDER
// =============================================================================

/// Incremental map construction.
pub struct TileMapBuilder {
    map: TileMap,
}

impl TileMapBuilder {
    /// Empty (all air) map.
    pub fn new(name: &str, width: usize, height: usize) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::Empty);
        }
        if width > 1000 || height > 1000 {
            return Err(MapError::TooLarge { width, height });
        }
        let cells = width * height;
        Ok(Self {
            map: TileMap {
                name: name.to_string(),
                width,
                height,
                game: vec![Tile::AIR; cells],
                front: vec![Tile::AIR; cells],
                tele: vec![None; cells],
                speedup: vec![None; cells],
                switch: vec![None; cells],
                tune: vec![0; cells],
                spawns: Vec::new(),
                tele_outs: BTreeMap::new(),
                tele_check_outs: BTreeMap::new(),
                switch_count: 0,
            },
        })
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.map.width && y < self.map.height).then(|| y * self.map.width + x)
    }

    /// Set a game layer tile. Out-of-range cells are ignored.
    pub fn game(&mut self, x: usize, y: usize, tile: Tile) -> &mut Self {
        if let Some(i) = self.index(x, y) {
            self.map.game[i] = tile;
        }
        self
    }

    /// Set a front layer tile.
    pub fn front(&mut self, x: usize, y: usize, tile: Tile) -> &mut Self {
        if let Some(i) = self.index(x, y) {
            self.map.front[i] = tile;
        }
        self
    }

    /// Fill a rectangle of the game layer.
    pub fn fill(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, tile: Tile) -> &mut Self {
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.game(x, y, tile);
            }
        }
        self
    }

    pub fn tele(&mut self, x: usize, y: usize, kind: TeleKind, number: u8) -> &mut Self {
        if let Some(i) = self.index(x, y) {
            self.map.tele[i] = Some(TeleTile { kind, number });
        }
        self
    }

    pub fn speedup(&mut self, x: usize, y: usize, force: u8, max_speed: u8, angle: i16) -> &mut Self {
        if let Some(i) = self.index(x, y) {
            self.map.speedup[i] = Some(SpeedupTile { force, max_speed, angle });
        }
        self
    }

    pub fn switch(&mut self, x: usize, y: usize, kind: SwitchKind, number: u8, delay: u8) -> &mut Self {
        if let Some(i) = self.index(x, y) {
            self.map.switch[i] = Some(SwitchTile { kind, number, delay });
        }
        self
    }

    pub fn tune(&mut self, x: usize, y: usize, zone: u8) -> &mut Self {
        if let Some(i) = self.index(x, y) {
            self.map.tune[i] = zone;
        }
        self
    }

    /// Register a spawn point at a tile centre.
    pub fn spawn(&mut self, x: usize, y: usize) -> &mut Self {
        if self.index(x, y).is_some() {
            self.map.spawns.push(tile_center(x, y));
        }
        self
    }

    /// Derive teleporter destinations and the switch count, then finish.
    pub fn build(mut self) -> TileMap {
        let map = &mut self.map;
        map.tele_outs.clear();
        map.tele_check_outs.clear();
        let mut max_number = 0u16;

        for y in 0..map.height {
            for x in 0..map.width {
                let i = y * map.width + x;
                if let Some(tele) = map.tele[i] {
                    match tele.kind {
                        TeleKind::Out => map.tele_outs.entry(tele.number).or_default().push(tile_center(x, y)),
                        TeleKind::CheckOut => {
                            map.tele_check_outs.entry(tele.number).or_default().push(tile_center(x, y))
                        }
                        _ => {}
                    }
                }
                if let Some(sw) = map.switch[i] {
                    let counted = !matches!(sw.kind, SwitchKind::AddTime | SwitchKind::SubtractTime | SwitchKind::Jump);
                    if counted {
                        max_number = max_number.max(sw.number as u16 + 1);
                    }
                }
            }
        }
        map.switch_count = max_number;
        self.map
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ascii() {
        let map = TileMap::from_ascii("t", "\
#####
#@.F#
#####
").expect("valid map");
        assert_eq!((map.width(), map.height()), (5, 3));
        assert_eq!(map.spawns(), &[tile_center(1, 1)]);
        assert_eq!(map.game_tile(8).kind, TileKind::Freeze);
        assert!(map.game_tile(0).kind.is_solid());
        assert!(map.tile_exists(8));
        assert!(!map.tile_exists(7));
    }

    #[test]
    fn test_ascii_errors() {
        assert_eq!(TileMap::from_ascii("t", "").unwrap_err(), MapError::Empty);
        assert!(matches!(TileMap::from_ascii("t", "##\n#"), Err(MapError::Ragged { .. })));
        assert!(matches!(TileMap::from_ascii("t", "#?"), Err(MapError::UnknownTile { ch: '?', .. })));
    }

    #[test]
    fn test_tele_outs_derived() {
        let mut builder = TileMapBuilder::new("t", 8, 4).expect("size");
        builder
            .tele(1, 1, TeleKind::In, 3)
            .tele(5, 1, TeleKind::Out, 3)
            .tele(6, 2, TeleKind::Out, 3)
            .tele(2, 2, TeleKind::CheckOut, 1)
            .switch(3, 3, SwitchKind::Close, 7, 0);
        let map = builder.build();

        assert_eq!(map.tele_outs(3), &[tile_center(5, 1), tile_center(6, 2)]);
        assert_eq!(map.tele_check_outs(1), &[tile_center(2, 2)]);
        assert!(map.tele_outs(9).is_empty());
        assert_eq!(map.switch_count(), 8);
    }

    #[test]
    fn test_cell_lookup() {
        let map = TileMapBuilder::new("t", 4, 4).expect("size").build();
        assert_eq!(map.cell(40, 70), Some(9));
        assert_eq!(map.cell(-1, 0), None);
        assert_eq!(map.cell(128, 0), None);
        assert_eq!(map.clamped_index(FixedVec2::from_ints(-500, 9000)), 12);
    }
}

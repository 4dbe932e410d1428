//! Weapons and Inventory

use serde::{Serialize, Deserialize};

/// Number of weapon slots.
pub const NUM_WEAPONS: usize = 6;

/// Finite ammo refills up to this amount.
pub const MAX_AMMO: i32 = 10;

/// Ammo regeneration interval per weapon in milliseconds (0 = none).
pub const AMMO_REGEN_MS: [i32; NUM_WEAPONS] = [0, 500, 0, 0, 0, 0];

/// Ninja lasts this long after pickup.
pub const NINJA_DURATION_MS: i32 = 15000;

/// Ninja dash length in ticks.
pub const NINJA_MOVETIME_TICKS: i32 = 10;

/// Dash speed in units per tick.
pub const NINJA_VELOCITY: i32 = 50;

/// Maximum actors a single dash can affect.
pub const NINJA_MAX_HITS: usize = 10;

/// Weapon slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Weapon {
    Hammer = 0,
    #[default]
    Gun = 1,
    Shotgun = 2,
    Grenade = 3,
    Laser = 4,
    /// Continuous dash ability, exclusive while active.
    Ninja = 5,
}

impl Weapon {
    /// All weapons in slot order.
    pub const ALL: [Weapon; NUM_WEAPONS] = [
        Weapon::Hammer,
        Weapon::Gun,
        Weapon::Shotgun,
        Weapon::Grenade,
        Weapon::Laser,
        Weapon::Ninja,
    ];

    /// Slot index.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Weapon from a slot index, `None` when out of range.
    pub fn from_index(index: usize) -> Option<Weapon> {
        Self::ALL.get(index).copied()
    }

    /// Weapons that keep firing while the button is held.
    pub fn is_full_auto(self) -> bool {
        matches!(self, Weapon::Shotgun | Weapon::Grenade | Weapon::Laser)
    }
}

/// Inventory entry of one weapon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponSlot {
    /// Weapon is owned.
    pub got: bool,
    /// Ammo left, -1 for unlimited.
    pub ammo: i32,
    /// Tick the current regen period started, -1 when idle.
    pub regen_start: i64,
}

impl WeaponSlot {
    /// Owned with unlimited ammo.
    pub const fn unlimited() -> Self {
        Self { got: true, ammo: -1, regen_start: -1 }
    }

    /// Not owned.
    pub const fn empty() -> Self {
        Self { got: false, ammo: 0, regen_start: -1 }
    }
}

/// Per-weapon inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    slots: [WeaponSlot; NUM_WEAPONS],
}

impl Default for Inventory {
    fn default() -> Self {
        Self::spawn()
    }
}

impl Inventory {
    /// Spawn loadout: hammer and gun with unlimited ammo.
    pub fn spawn() -> Self {
        let mut slots = [WeaponSlot::empty(); NUM_WEAPONS];
        slots[Weapon::Hammer.index()] = WeaponSlot::unlimited();
        slots[Weapon::Gun.index()] = WeaponSlot::unlimited();
        Self { slots }
    }

    /// Entry of a weapon.
    #[inline]
    pub fn slot(&self, weapon: Weapon) -> &WeaponSlot {
        &self.slots[weapon.index()]
    }

    /// Mutable entry of a weapon.
    #[inline]
    pub fn slot_mut(&mut self, weapon: Weapon) -> &mut WeaponSlot {
        &mut self.slots[weapon.index()]
    }

    /// Whether the weapon is owned.
    #[inline]
    pub fn has(&self, weapon: Weapon) -> bool {
        self.slot(weapon).got
    }

    /// Give a weapon with the given ammo.
    pub fn give(&mut self, weapon: Weapon, ammo: i32) {
        let slot = self.slot_mut(weapon);
        slot.got = true;
        slot.ammo = ammo;
    }

    /// Drop a weapon.
    pub fn remove(&mut self, weapon: Weapon) {
        *self.slot_mut(weapon) = WeaponSlot::empty();
    }

    /// Drop everything but hammer and gun.
    pub fn strip_pickups(&mut self) {
        for weapon in [Weapon::Shotgun, Weapon::Grenade, Weapon::Laser] {
            self.remove(weapon);
        }
    }

    /// Iterate owned weapons in slot order.
    pub fn owned(&self) -> impl Iterator<Item = Weapon> + '_ {
        Weapon::ALL.into_iter().filter(|w| self.has(*w))
    }
}

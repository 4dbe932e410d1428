//! Team Membership
//!
//! Team ids are plain integers: 0 is the flock (everyone not in a team),
//! 1..64 are user teams and 64 is the super team, which interacts with
//! everyone and is exempt from doors and switches.

use serde::{Serialize, Deserialize};

use crate::game::config::TeamPolicy;
use crate::game::movement::{ActorId, MAX_ACTORS};
use crate::game::world::WorldError;

/// Team of actors that are not in any team.
pub const TEAM_FLOCK: u8 = 0;

/// Invulnerable team.
pub const TEAM_SUPER: u8 = MAX_ACTORS as u8;

const NUM_TEAMS: usize = TEAM_SUPER as usize + 1;

/// Team table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Teams {
    policy: TeamPolicy,
    team_of: Vec<u8>,
    solo: Vec<bool>,
    locked: Vec<bool>,
    present: u64,
}

impl Teams {
    /// Everyone in the flock.
    pub fn new(policy: TeamPolicy) -> Self {
        Self {
            policy,
            team_of: vec![TEAM_FLOCK; MAX_ACTORS],
            solo: vec![false; MAX_ACTORS],
            locked: vec![false; NUM_TEAMS],
            present: 0,
        }
    }

    /// Active policy.
    #[inline]
    pub fn policy(&self) -> TeamPolicy {
        self.policy
    }

    /// Team of an actor.
    #[inline]
    pub fn team(&self, id: ActorId) -> u8 {
        self.team_of.get(id.index()).copied().unwrap_or(TEAM_FLOCK)
    }

    /// Move an actor to a team.
    pub fn set_team(&mut self, id: ActorId, team: u8) -> Result<(), WorldError> {
        if team > TEAM_SUPER {
            return Err(WorldError::InvalidTeam(team));
        }
        if self.policy == TeamPolicy::Off && team != TEAM_FLOCK && team != TEAM_SUPER {
            return Err(WorldError::InvalidTeam(team));
        }
        let slot = self
            .team_of
            .get_mut(id.index())
            .ok_or(WorldError::InvalidSlot(id.0))?;
        *slot = team;
        Ok(())
    }

    /// Mark a slot as occupied or free.
    pub fn set_present(&mut self, id: ActorId, present: bool) {
        if id.index() >= MAX_ACTORS {
            return;
        }
        if present {
            self.present |= id.bit();
        } else {
            self.present &= !id.bit();
            self.solo[id.index()] = false;
        }
    }

    /// Whether the team is locked.
    pub fn is_locked(&self, team: u8) -> bool {
        self.locked.get(team as usize).copied().unwrap_or(false)
    }

    /// Lock or unlock a team.
    pub fn set_locked(&mut self, team: u8, locked: bool) {
        if let Some(slot) = self.locked.get_mut(team as usize) {
            *slot = locked;
        }
    }

    /// Whether the actor races in isolation.
    pub fn is_solo(&self, id: ActorId) -> bool {
        self.solo.get(id.index()).copied().unwrap_or(false)
    }

    /// Set the solo flag.
    pub fn set_solo(&mut self, id: ActorId, solo: bool) {
        if let Some(slot) = self.solo.get_mut(id.index()) {
            *slot = solo;
        }
    }

    /// Pairwise collision eligibility.
    ///
    /// The super team and the actor itself always pass, solo actors never,
    /// everyone else only within the same team.
    pub fn can_collide(&self, a: ActorId, b: ActorId) -> bool {
        let (ta, tb) = (self.team(a), self.team(b));
        if ta == TEAM_SUPER || tb == TEAM_SUPER || a == b {
            return true;
        }
        if self.is_solo(a) || self.is_solo(b) {
            return false;
        }
        ta == tb
    }

    /// Whether `a` may keep holding `b` with its hook.
    pub fn can_keep_hook(&self, a: ActorId, b: ActorId) -> bool {
        let (ta, tb) = (self.team(a), self.team(b));
        ta == TEAM_SUPER || tb == TEAM_SUPER || a == b || ta == tb
    }

    /// Both actors share a team id.
    #[inline]
    pub fn same_team(&self, a: ActorId, b: ActorId) -> bool {
        self.team(a) == self.team(b)
    }

    /// Present members of a team in slot order.
    pub fn members(&self, team: u8) -> impl Iterator<Item = ActorId> + '_ {
        (0..MAX_ACTORS as u8)
            .map(ActorId)
            .filter(move |id| self.present & id.bit() != 0 && self.team(*id) == team)
    }

    /// Number of present members.
    pub fn count(&self, team: u8) -> usize {
        self.members(team).count()
    }

    /// Actors that share time adjustments and rescue with `id`, itself excluded.
    pub fn unit_mates(&self, id: ActorId) -> Vec<ActorId> {
        let team = self.team(id);
        if !self.policy.treats_as_unit(team) || (self.policy == TeamPolicy::ForcedSolo && team == TEAM_FLOCK) {
            return Vec::new();
        }
        self.members(team).filter(|m| *m != id).collect()
    }

    /// Bitmask of actors who see events of `team`; everyone for the super team.
    pub fn team_mask(&self, team: u8, except: Option<ActorId>) -> u64 {
        let mut mask = if team == TEAM_SUPER {
            self.present
        } else {
            self.members(team).fold(0u64, |acc, id| acc | id.bit())
        };
        if let Some(id) = except {
            mask &= !id.bit();
        }
        mask
    }

    /// Bitmask of every present actor.
    #[inline]
    pub fn everyone(&self) -> u64 {
        self.present
    }
}

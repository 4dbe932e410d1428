//! Dead Reckoning
//!
//! The server keeps, per actor, the core it last broadcast and advances a
//! copy of it every tick with no input and no other actors, exactly the way
//! a client extrapolates. When that prediction no longer matches the real
//! core at network precision, or the actor was teleported, or the ceiling
//! passed, the real core becomes the new reference.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::game::movement::{ActorCore, ActorId, CoreWorld};
use crate::game::tuning::TuningParams;

/// Why a resync happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResyncReason {
    /// First broadcast after spawn.
    Initial,
    /// A state change prediction cannot follow.
    Reset,
    /// Ceiling reached.
    Ceiling,
    /// Prediction drifted.
    Diverged,
}

/// Reference core and its extrapolation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReckoningState {
    /// Tick of the last resync, 0 before the first.
    pub tick: i64,
    /// Core sent to clients at `tick`.
    pub send_core: ActorCore,
    /// `send_core` advanced to the current tick.
    pub predicted: ActorCore,
}

impl ReckoningState {
    /// No reference yet.
    pub fn new(id: ActorId) -> Self {
        let blank = ActorCore::new(id, FixedVec2::ZERO);
        Self { tick: 0, send_core: blank.clone(), predicted: blank }
    }

    /// Advance the prediction one tick and resync if needed.
    ///
    /// `core` must already be quantized for this tick. The reset flag on
    /// `core` is consumed.
    pub fn update(
        &mut self,
        core: &mut ActorCore,
        now: i64,
        ceiling: i64,
        tuning: &TuningParams,
        world: &CoreWorld<'_>,
    ) -> Option<ResyncReason> {
        self.predicted.advance(None, tuning, world);

        let reason = if self.tick == 0 {
            Some(ResyncReason::Initial)
        } else if core.take_reset() {
            Some(ResyncReason::Reset)
        } else if now - self.tick >= ceiling {
            Some(ResyncReason::Ceiling)
        } else if self.predicted.net() != core.net() {
            Some(ResyncReason::Diverged)
        } else {
            None
        };

        if reason.is_some() {
            core.reset = false;
            self.tick = now;
            self.send_core = core.clone();
            self.predicted = core.clone();
        }
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::PlayerInput;
    use crate::game::map::TileMap;

    fn room() -> TileMap {
        TileMap::from_ascii(
            "room",
            "####################\n\
             #..................#\n\
             #..................#\n\
             #..................#\n\
             #..................#\n\
             ####################\n",
        )
        .expect("valid map")
    }

    fn settled(map: &TileMap, tuning: &TuningParams) -> ActorCore {
        let mut core = ActorCore::new(ActorId(0), FixedVec2::from_ints(100, 145));
        let world = CoreWorld::alone(map, None);
        for _ in 0..5 {
            core.advance(None, tuning, &world);
        }
        core
    }

    #[test]
    fn test_first_update_resyncs() {
        let map = room();
        let tuning = TuningParams::default();
        let world = CoreWorld::alone(&map, None);
        let mut core = settled(&map, &tuning);
        let mut reckoning = ReckoningState::new(ActorId(0));

        assert_eq!(reckoning.update(&mut core, 1, 150, &tuning, &world), Some(ResyncReason::Initial));
        assert_eq!(reckoning.tick, 1);
        assert_eq!(reckoning.send_core, core);
    }

    #[test]
    fn test_idle_actor_resyncs_at_ceiling() {
        let map = room();
        let tuning = TuningParams::default();
        let world = CoreWorld::alone(&map, None);
        let mut core = settled(&map, &tuning);
        let mut reckoning = ReckoningState::new(ActorId(0));
        reckoning.update(&mut core, 1, 150, &tuning, &world);

        let mut resyncs = Vec::new();
        for now in 2..=400 {
            core.advance(None, &tuning, &world);
            if reckoning.update(&mut core, now, 150, &tuning, &world).is_some() {
                resyncs.push(now);
            }
        }
        assert_eq!(resyncs, vec![151, 301]);
    }

    #[test]
    fn test_input_divergence_resyncs() {
        let map = room();
        let tuning = TuningParams::default();
        let world = CoreWorld::alone(&map, None);
        let mut core = settled(&map, &tuning);
        let mut reckoning = ReckoningState::new(ActorId(0));
        reckoning.update(&mut core, 1, 150, &tuning, &world);

        core.advance(Some(&PlayerInput::walking(1)), &tuning, &world);
        assert_eq!(reckoning.update(&mut core, 2, 150, &tuning, &world), Some(ResyncReason::Diverged));
    }

    #[test]
    fn test_reset_flag_forces_resync() {
        let map = room();
        let tuning = TuningParams::default();
        let world = CoreWorld::alone(&map, None);
        let mut core = settled(&map, &tuning);
        let mut reckoning = ReckoningState::new(ActorId(0));
        reckoning.update(&mut core, 1, 150, &tuning, &world);

        core.advance(None, &tuning, &world);
        core.reset = true;
        assert_eq!(reckoning.update(&mut core, 2, 150, &tuning, &world), Some(ResyncReason::Reset));
        assert!(!core.reset);
    }

    #[test]
    fn test_gap_never_exceeds_ceiling() {
        let map = room();
        let tuning = TuningParams::default();
        let world = CoreWorld::alone(&map, None);
        let mut core = settled(&map, &tuning);
        let mut reckoning = ReckoningState::new(ActorId(0));
        let mut last = 0;
        for now in 1..=1000 {
            let input = PlayerInput::walking(if (now / 37) % 2 == 0 { 1 } else { -1 });
            core.advance(Some(&input), &tuning, &world);
            if reckoning.update(&mut core, now, 150, &tuning, &world).is_some() {
                assert!(now - last <= 150);
                last = now;
            }
        }
        assert!(1000 - last <= 150);
    }
}

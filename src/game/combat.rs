//! Combat resolution - validates hit claims, applies damage, kills and respawns

use std::time::Duration;

use uuid::Uuid;

use super::error::GameError;
use super::player::{PlayerDirectory, Pose};
use super::weapons::WeaponStats;
use crate::ws::protocol::WeaponKind;

/// Outcome of an accepted shot, in the order it must be announced
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEffect {
    Hit {
        target: Uuid,
        health: u32,
        attacker: Uuid,
    },
    Kill {
        victim: Uuid,
        killer: Uuid,
        killer_kills: u32,
    },
    /// Revive `player` at `at` once `delay` has passed
    Respawn {
        player: Uuid,
        at: Pose,
        delay: Duration,
    },
}

/// Applies client hit claims to a room's players
#[derive(Debug, Clone, Copy)]
pub struct CombatResolver {
    pub respawn_delay: Duration,
}

impl CombatResolver {
    pub fn new(respawn_delay: Duration) -> Self {
        Self { respawn_delay }
    }

    /// Validate and apply one hit claim.
    ///
    /// `respawn_point` is only called when the shot kills. A rejected claim
    /// leaves every player untouched.
    pub fn apply_shot(
        &self,
        players: &mut PlayerDirectory,
        attacker_id: Uuid,
        target_id: Uuid,
        weapon: WeaponKind,
        now_ms: u64,
        respawn_point: impl FnOnce() -> Pose,
    ) -> Result<Vec<CombatEffect>, GameError> {
        let attacker = players.get(&attacker_id).ok_or(GameError::NotFound("attacker"))?;
        let target = players.get(&target_id).ok_or(GameError::NotFound("target"))?;

        if attacker_id == target_id {
            return Err(GameError::State("Cannot shoot yourself."));
        }
        if target.is_dead {
            return Err(GameError::State("Target is already dead."));
        }
        if attacker.is_dead {
            return Err(GameError::State("Dead players cannot shoot."));
        }

        let stats = WeaponStats::for_kind(weapon);
        if let Some(last) = attacker.last_fire_at {
            if now_ms.saturating_sub(last) < stats.fire_rate_ms {
                return Err(GameError::RateLimit);
            }
        }

        if let Some(attacker) = players.get_mut(&attacker_id) {
            attacker.last_fire_at = Some(now_ms);
        }

        let health = match players.get_mut(&target_id) {
            Some(target) => {
                target.health = target.health.saturating_sub(stats.damage);
                target.health
            }
            None => return Err(GameError::NotFound("target")),
        };

        let mut effects = vec![CombatEffect::Hit {
            target: target_id,
            health,
            attacker: attacker_id,
        }];

        if health == 0 {
            let killer_kills = match players.get_mut(&attacker_id) {
                Some(attacker) => {
                    attacker.kills += 1;
                    attacker.kills
                }
                None => 0,
            };
            let at = respawn_point();
            if let Some(victim) = players.get_mut(&target_id) {
                victim.is_dead = true;
                victim.pending_respawn = Some(at);
            }
            effects.push(CombatEffect::Kill {
                victim: target_id,
                killer: attacker_id,
                killer_kills,
            });
            effects.push(CombatEffect::Respawn {
                player: target_id,
                at,
                delay: self.respawn_delay,
            });
        }

        Ok(effects)
    }

    /// Finish a pending respawn. `None` if the player left or was already revived.
    pub fn complete_respawn(&self, players: &mut PlayerDirectory, id: Uuid) -> Option<Pose> {
        let player = players.get_mut(&id)?;
        if !player.is_dead {
            return None;
        }
        let at = player.pending_respawn?;
        player.revive(at);
        Some(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::{Player, MAX_HEALTH};
    use proptest::prelude::*;

    fn setup() -> (PlayerDirectory, Uuid, Uuid) {
        let mut players = PlayerDirectory::new();
        let alice = Player::new(Uuid::new_v4(), "Alice".into(), 0, Pose::default());
        let bob = Player::new(Uuid::new_v4(), "Bob".into(), 1, Pose::default());
        let (a, b) = (alice.id, bob.id);
        players.insert(alice);
        players.insert(bob);
        (players, a, b)
    }

    fn spawn() -> Pose {
        Pose::at(130.0, 5.0, 0.0)
    }

    #[test]
    fn ak47_kills_in_five_hits() {
        let combat = CombatResolver::new(Duration::from_secs(3));
        let (mut players, alice, bob) = setup();

        let mut healths = Vec::new();
        let mut last = Vec::new();
        for shot in 0..5u64 {
            last = combat
                .apply_shot(&mut players, alice, bob, WeaponKind::Ak47, 1_000 + shot * 150, spawn)
                .unwrap();
            match &last[0] {
                CombatEffect::Hit { health, .. } => healths.push(*health),
                other => panic!("unexpected {other:?}"),
            }
        }

        assert_eq!(healths, vec![80, 60, 40, 20, 0]);
        assert_eq!(last.len(), 3);
        assert!(matches!(
            last[1],
            CombatEffect::Kill { killer_kills: 1, .. }
        ));
        assert!(matches!(last[2], CombatEffect::Respawn { at, .. } if at == spawn()));

        let bob_state = players.get(&bob).unwrap();
        assert!(bob_state.is_dead);
        assert_eq!(players.get(&alice).unwrap().kills, 1);
    }

    #[test]
    fn fire_rate_is_enforced() {
        let combat = CombatResolver::new(Duration::from_secs(3));
        let (mut players, alice, bob) = setup();

        combat
            .apply_shot(&mut players, alice, bob, WeaponKind::Ak47, 1_000, spawn)
            .unwrap();
        assert_eq!(
            combat.apply_shot(&mut players, alice, bob, WeaponKind::Ak47, 1_100, spawn),
            Err(GameError::RateLimit)
        );
        assert_eq!(players.get(&bob).unwrap().health, 80);

        // exactly one interval later is fine
        assert!(combat
            .apply_shot(&mut players, alice, bob, WeaponKind::Ak47, 1_150, spawn)
            .is_ok());
    }

    #[test]
    fn rejected_claims_change_nothing() {
        let combat = CombatResolver::new(Duration::from_secs(3));
        let (mut players, alice, bob) = setup();
        let ghost = Uuid::new_v4();

        assert_eq!(
            combat.apply_shot(&mut players, ghost, bob, WeaponKind::Pistol, 0, spawn),
            Err(GameError::NotFound("attacker"))
        );
        assert_eq!(
            combat.apply_shot(&mut players, alice, ghost, WeaponKind::Pistol, 0, spawn),
            Err(GameError::NotFound("target"))
        );
        assert!(matches!(
            combat.apply_shot(&mut players, alice, alice, WeaponKind::Pistol, 0, spawn),
            Err(GameError::State(_))
        ));

        players.get_mut(&bob).unwrap().is_dead = true;
        assert!(matches!(
            combat.apply_shot(&mut players, alice, bob, WeaponKind::Pistol, 0, spawn),
            Err(GameError::State(_))
        ));
        assert!(matches!(
            combat.apply_shot(&mut players, bob, alice, WeaponKind::Pistol, 0, spawn),
            Err(GameError::State(_))
        ));

        let a = players.get(&alice).unwrap();
        assert_eq!(a.health, MAX_HEALTH);
        assert_eq!(a.last_fire_at, None);
    }

    #[test]
    fn respawn_restores_health_at_pending_point() {
        let combat = CombatResolver::new(Duration::from_secs(3));
        let (mut players, alice, bob) = setup();

        combat
            .apply_shot(&mut players, alice, bob, WeaponKind::Sniper, 0, spawn)
            .unwrap();
        let at = combat.complete_respawn(&mut players, bob).unwrap();
        assert_eq!(at, spawn());

        let b = players.get(&bob).unwrap();
        assert!(!b.is_dead);
        assert_eq!(b.health, MAX_HEALTH);
        assert_eq!(b.pose, spawn());

        // second timer for the same death does nothing
        assert!(combat.complete_respawn(&mut players, bob).is_none());
    }

    proptest! {
        #[test]
        fn health_never_underflows(weapons in prop::collection::vec(0usize..4, 1..40)) {
            let kinds = [WeaponKind::Pistol, WeaponKind::Ak47, WeaponKind::Sniper, WeaponKind::Slingshot];
            let combat = CombatResolver::new(Duration::from_secs(3));
            let (mut players, alice, bob) = setup();

            let mut now = 0u64;
            let mut expected = MAX_HEALTH;
            let mut kills = 0;
            for idx in weapons {
                let weapon = kinds[idx];
                now += 2_000;
                let result = combat.apply_shot(&mut players, alice, bob, weapon, now, spawn);
                if expected == 0 {
                    prop_assert!(result.is_err());
                    continue;
                }
                let effects = result.unwrap();
                expected = expected.saturating_sub(WeaponStats::for_kind(weapon).damage);
                prop_assert_eq!(players.get(&bob).unwrap().health, expected);
                if expected == 0 {
                    kills += 1;
                    prop_assert_eq!(effects.len(), 3);
                }
            }
            prop_assert!(kills <= 1);
            prop_assert_eq!(players.get(&alice).unwrap().kills, kills);
        }
    }
}

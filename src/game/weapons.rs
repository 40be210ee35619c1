//! Static weapon table

use crate::ws::protocol::WeaponKind;

/// Weapon stats, looked up by kind and never mutated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponStats {
    /// Damage per hit
    pub damage: u32,
    /// Minimum milliseconds between two shots
    pub fire_rate_ms: u64,
    /// Maximum effective range (client-side hit detection)
    pub range: u32,
    /// Magazine size, `None` for unlimited
    pub max_ammo: Option<u32>,
}

impl WeaponStats {
    pub fn for_kind(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::Pistol => Self {
                damage: 10,
                fire_rate_ms: 400,
                range: 100,
                max_ammo: Some(30),
            },
            WeaponKind::Ak47 => Self {
                damage: 20,
                fire_rate_ms: 150,
                range: 80,
                max_ammo: Some(20),
            },
            WeaponKind::Sniper => Self {
                damage: 100,
                fire_rate_ms: 1500,
                range: 300,
                max_ammo: Some(5),
            },
            WeaponKind::Slingshot => Self {
                damage: 5,
                fire_rate_ms: 800,
                range: 60,
                max_ammo: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniper_is_a_one_shot_kill() {
        assert_eq!(WeaponStats::for_kind(WeaponKind::Sniper).damage, 100);
    }

    #[test]
    fn default_weapon_has_unlimited_ammo() {
        assert_eq!(WeaponStats::for_kind(WeaponKind::default()).max_ammo, None);
    }
}

// player.rs — Persistent player profile: inventory, secrets, weapons

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use trx_common::units::*;

// ============================================================
// Inventory item types
// ============================================================

pub const PISTOLS_ITEM: u16 = 84;
pub const SHOTGUN_ITEM: u16 = 85;
pub const MAGNUMS_ITEM: u16 = 86;
pub const UZIS_ITEM: u16 = 87;
pub const SMALL_MEDIPACK_ITEM: u16 = 93;
pub const LARGE_MEDIPACK_ITEM: u16 = 94;
pub const PUZZLE_1_ITEM: u16 = 110;
pub const KEY_1_ITEM: u16 = 129;

/// Health restored by a small medipack.
pub const SMALL_MEDIPACK_HEALTH: Health = Health(500);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponType {
    #[default]
    None,
    Pistols,
    Magnums,
    Uzis,
    Shotgun,
}

impl WeaponType {
    pub fn item_type(self) -> Option<u16> {
        match self {
            WeaponType::None => None,
            WeaponType::Pistols => Some(PISTOLS_ITEM),
            WeaponType::Magnums => Some(MAGNUMS_ITEM),
            WeaponType::Uzis => Some(UZIS_ITEM),
            WeaponType::Shotgun => Some(SHOTGUN_ITEM),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub secrets: u32,
    /// Item type to count.
    pub inventory: BTreeMap<u16, u32>,
    pub selected_weapon: WeaponType,
    pub requested_weapon: WeaponType,
    /// Health carried between levels.
    pub lara_profile_health: Health,
}

impl Default for Player {
    fn default() -> Self {
        let mut inventory = BTreeMap::new();
        inventory.insert(PISTOLS_ITEM, 1);
        Self {
            secrets: 0,
            inventory,
            selected_weapon: WeaponType::Pistols,
            requested_weapon: WeaponType::Pistols,
            lara_profile_health: LARA_HEALTH,
        }
    }
}

impl Player {
    pub fn count(&self, item: u16) -> u32 {
        self.inventory.get(&item).copied().unwrap_or(0)
    }

    pub fn add_item(&mut self, item: u16, n: u32) {
        *self.inventory.entry(item).or_insert(0) += n;
        log::debug!("picked up item {} ({} total)", item, self.count(item));
    }

    /// Removes one item; returns false if none was carried.
    pub fn take_item(&mut self, item: u16) -> bool {
        match self.inventory.get_mut(&item) {
            Some(n) if *n > 0 => {
                *n -= 1;
                if *n == 0 {
                    self.inventory.remove(&item);
                }
                true
            }
            _ => false,
        }
    }

    /// Uses a medipack on `health`. Nothing happens at full health or
    /// when dead.
    pub fn use_medipack(&mut self, item: u16, health: &mut Health) -> bool {
        if *health <= Health(0) || *health >= LARA_HEALTH {
            return false;
        }
        if !self.take_item(item) {
            return false;
        }
        *health = if item == LARGE_MEDIPACK_ITEM {
            LARA_HEALTH
        } else {
            (*health + SMALL_MEDIPACK_HEALTH).min(LARA_HEALTH)
        };
        true
    }

    /// Records a weapon request if the weapon is carried.
    pub fn request_weapon(&mut self, weapon: WeaponType) -> bool {
        match weapon.item_type() {
            Some(item) if self.count(item) > 0 => {
                self.requested_weapon = weapon;
                true
            }
            _ => false,
        }
    }
}

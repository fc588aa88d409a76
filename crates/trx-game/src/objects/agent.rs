// agent.rs — Ground-bound enemies: rats, wolves and mutants
//
// Agents stay invisible until a trigger activates them. Then they turn
// toward the avatar at a fixed rate, walk over steppable floor only and
// bite when close enough.

use serde::{Deserialize, Serialize};
use trx_common::collision::{CollisionInfo, CollisionPolicies};
use trx_common::units::*;

use super::{floor_at, hurt_lara, lara_touches, push_lara, ObjectKind};
use crate::object_state::TriggerState;
use crate::world::World;

/// Physics frames between two bites.
const BITE_COOLDOWN: u8 = 15;
/// Bites only connect within this height difference.
const BITE_HEIGHT: Length = Length(512);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Rat,
    Wolf,
    Mutant,
}

struct AgentParams {
    health: Health,
    speed: Speed,
    turn: Angle,
    bite: Health,
    range: Length,
}

impl AgentKind {
    fn params(self) -> AgentParams {
        match self {
            AgentKind::Rat => AgentParams {
                health: Health(5),
                speed: Speed(24),
                turn: Angle::deg(6),
                bite: Health(20),
                range: Length(300),
            },
            AgentKind::Wolf => AgentParams {
                health: Health(6),
                speed: Speed(48),
                turn: Angle::deg(5),
                bite: Health(50),
                range: Length(400),
            },
            AgentKind::Mutant => AgentParams {
                health: Health(50),
                speed: Speed(32),
                turn: Angle::deg(3),
                bite: Health(100),
                range: Length(500),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub kind: AgentKind,
    pub bite_cooldown: u8,
}

impl AgentState {
    pub fn new(kind: AgentKind) -> Self {
        Self { kind, bite_cooldown: 0 }
    }
}

fn agent_of(w: &World, id: u16) -> Option<AgentState> {
    match w.objects.get(id).map(|o| &o.kind) {
        Some(ObjectKind::Agent(a)) => Some(a.clone()),
        _ => None,
    }
}

pub fn activate(w: &mut World, id: u16) {
    let Some(agent) = agent_of(w, id) else {
        return;
    };
    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    obj.state.health = agent.kind.params().health;
    obj.state.trigger_state = TriggerState::Active;
    obj.state.is_active = true;
    if let Some(sk) = obj.skeleton.as_mut() {
        sk.visible = true;
    }
    log::debug!("agent {} ({:?}) woke up", id, agent.kind);
}

fn die(w: &mut World, id: u16) {
    if let Some(obj) = w.objects.get_mut(id) {
        log::debug!("agent {} died", id);
        obj.state.trigger_state = TriggerState::Deactivated;
        obj.state.is_active = false;
        obj.collidable = false;
    }
}

fn set_cooldown(w: &mut World, id: u16, cooldown: u8) {
    if let Some(ObjectKind::Agent(a)) = w.objects.get_mut(id).map(|o| &mut o.kind) {
        a.bite_cooldown = cooldown;
    }
}

pub fn update(w: &mut World, id: u16) {
    let Some(agent) = agent_of(w, id) else {
        return;
    };
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    if obj.state.health <= Health(0) {
        die(w, id);
        return;
    }
    if !w.is_physics_frame() {
        return;
    }

    let params = agent.kind.params();
    let pos = obj.position();
    let lara = w.lara.position();
    let yaw = obj.state.rotation.y;
    let location = obj.state.location;

    let wanted = angle_from_atan(lara.x - pos.x, lara.z - pos.z);
    let turn = (wanted - yaw).clamp(-params.turn, params.turn);
    let yaw = yaw + turn;

    let close = pos.distance_xz(&lara) <= params.range.get() as f32;
    let mut next = location;
    if !close && !w.lara.is_dead() {
        let step = location.moved(pitch(params.speed.per_frame(), yaw));
        let floor = floor_at(w, &step);
        if floor != INVALID_HEIGHT && (floor - pos.y).abs() <= STEPPABLE_HEIGHT {
            next = step;
            next.position.y = floor;
        }
    }

    if let Some(obj) = w.objects.get_mut(id) {
        obj.state.rotation.y = yaw;
        obj.state.location = next;
        obj.state.location.update_room(&w.rooms);
        obj.state.floor = next.position.y;
        if let Some(sk) = obj.skeleton.as_mut() {
            sk.advance_frame(&mut obj.state, &w.animations);
        }
    }

    if agent.bite_cooldown > 0 {
        set_cooldown(w, id, agent.bite_cooldown - 1);
        return;
    }
    if close && !w.lara.is_dead() && (lara.y - pos.y).abs() <= BITE_HEIGHT {
        log::debug!("agent {} bites for {}", id, params.bite.get());
        hurt_lara(w, params.bite);
        set_cooldown(w, id, BITE_COOLDOWN);
    }
}

pub fn collide(w: &mut World, id: u16, coll: &mut CollisionInfo) {
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    if obj.state.trigger_state != TriggerState::Active
        || !coll.policies.contains(CollisionPolicies::ENABLE_BADDIE_PUSH)
        || !lara_touches(w, id, coll.collision_radius)
    {
        return;
    }
    let bbox = obj.bounding_box(&w.animations);
    push_lara(w, id, &bbox, coll);
}

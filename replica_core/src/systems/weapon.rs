use crate::domain::entity::NetworkedEntity;
use crate::domain::errors::RejectReason;
use crate::domain::tuning::WeaponTuning;
use std::time::Duration;

/// Weapon state as seen through the replicated `ammo` and `reloading` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponState {
    Ready,
    Empty,
    Reloading,
}

impl WeaponState {
    pub fn of(entity: &NetworkedEntity) -> Option<Self> {
        let ammo = entity.ammo()?;
        Some(if entity.is_reloading() {
            WeaponState::Reloading
        } else if ammo == 0 {
            WeaponState::Empty
        } else {
            WeaponState::Ready
        })
    }
}

/// Owner-local trigger bookkeeping (never replicated).
#[derive(Debug, Clone, Copy, Default)]
pub struct Trigger {
    pub last_fire: Option<Duration>,
    pub held: bool,
}

impl Trigger {
    pub fn interval_elapsed(&self, now: Duration, interval: Duration) -> bool {
        match self.last_fire {
            Some(last) => now >= last + interval,
            None => true,
        }
    }
}

/// Local preconditions for a shot. Returns the weapon tuning to fire with.
pub fn check_fire<'a>(
    entity: &'a NetworkedEntity,
    trigger: &Trigger,
    now: Duration,
    shooting_allowed: bool,
) -> Result<&'a WeaponTuning, RejectReason> {
    if !entity.is_alive() {
        return Err(RejectReason::NotAlive);
    }
    if !shooting_allowed {
        return Err(RejectReason::ShootingDisabled);
    }
    if !entity.input_enabled() {
        return Err(RejectReason::InputDisabled);
    }
    if entity.is_stunned() {
        return Err(RejectReason::Stunned);
    }
    let weapon = entity.tuning().weapon.as_ref().ok_or(RejectReason::NoWeapon)?;
    match WeaponState::of(entity) {
        Some(WeaponState::Reloading) => return Err(RejectReason::Reloading),
        Some(WeaponState::Empty) => return Err(RejectReason::NoAmmo),
        Some(WeaponState::Ready) => {}
        None => return Err(RejectReason::NoWeapon),
    }
    if !trigger.interval_elapsed(now, weapon.fire_interval()) {
        return Err(RejectReason::FireCooldown);
    }
    Ok(weapon)
}

/// Local preconditions for starting a reload. Returns the reload duration.
pub fn check_reload(entity: &NetworkedEntity) -> Result<Duration, RejectReason> {
    if !entity.is_alive() {
        return Err(RejectReason::NotAlive);
    }
    if !entity.input_enabled() {
        return Err(RejectReason::InputDisabled);
    }
    let weapon = entity.tuning().weapon.as_ref().ok_or(RejectReason::NoWeapon)?;
    match WeaponState::of(entity) {
        Some(WeaponState::Reloading) => Err(RejectReason::Reloading),
        Some(_) if entity.ammo() == Some(weapon.magazine) => Err(RejectReason::MagazineFull),
        Some(_) => Ok(weapon.reload_duration()),
        None => Err(RejectReason::NoWeapon),
    }
}

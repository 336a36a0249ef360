use crate::domain::entity::Slot;
use crate::domain::errors::RejectReason;
use crate::domain::tuning::{SkillEffect, SlotTuning};
use std::time::Duration;

/// Timings handed back when a cast starts; the caller schedules them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastStart {
    pub cast: Duration,
    pub cooldown: Duration,
}

/// Owner-local state machine for one skill or item slot.
///
/// `start_cast` → (`execute` | `cancel`), with the cooldown running independently from
/// activation until `finish` or `reset`. The slot is ready when it is neither casting nor
/// cooling down and still has charges.
#[derive(Debug, Clone)]
pub struct SkillSlot {
    pub slot: Slot,
    tuning: SlotTuning,
    casting: bool,
    cooling: bool,
    charges: Option<u32>,
}

impl SkillSlot {
    pub fn new(slot: Slot, tuning: SlotTuning) -> Self {
        let charges = tuning.charges;
        Self {
            slot,
            tuning,
            casting: false,
            cooling: false,
            charges,
        }
    }

    pub fn name(&self) -> &str {
        &self.tuning.name
    }

    pub fn is_casting(&self) -> bool {
        self.casting
    }

    pub fn is_cooling(&self) -> bool {
        self.cooling
    }

    pub fn charges(&self) -> Option<u32> {
        self.charges
    }

    pub fn is_ready(&self) -> bool {
        !self.casting && !self.cooling && self.charges != Some(0)
    }

    pub fn start_cast(&mut self) -> Result<CastStart, RejectReason> {
        if self.casting {
            return Err(RejectReason::Casting);
        }
        if self.cooling {
            return Err(RejectReason::OnCooldown);
        }
        if let Some(charges) = self.charges.as_mut() {
            if *charges == 0 {
                return Err(RejectReason::NoCharges);
            }
            *charges -= 1;
        }

        let cooldown = self.tuning.cooldown_duration();
        self.casting = true;
        self.cooling = !cooldown.is_zero();
        Ok(CastStart {
            cast: self.tuning.cast_duration(),
            cooldown,
        })
    }

    /// Cast completed: returns the effect to apply, or `None` if no cast was running.
    pub fn execute(&mut self) -> Option<SkillEffect> {
        if !self.casting {
            return None;
        }
        self.casting = false;
        Some(self.tuning.effect)
    }

    /// Cooldown expired. Returns true when the slot became ready.
    pub fn finish(&mut self) -> bool {
        self.cooling = false;
        self.is_ready()
    }

    /// Interrupts a running cast. The charge and cooldown stay spent.
    pub fn cancel(&mut self) -> bool {
        std::mem::replace(&mut self.casting, false)
    }

    /// Clears the cooldown immediately. Returns true when this changed anything.
    pub fn reset(&mut self) -> bool {
        std::mem::replace(&mut self.cooling, false)
    }
}

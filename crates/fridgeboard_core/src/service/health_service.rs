//! Water and medication trackers.
//!
//! # Responsibility
//! - Count water glasses against the daily goal.
//! - Track which medications were taken today.
//!
//! # Invariants
//! - `water_count` stays within `0..=max_water`.
//! - `water:goal:achieved` fires only on the change that reaches the goal
//!   from below; calls at the goal change nothing and emit nothing.
//! - Medication names are trimmed and validated before they become keys.

use crate::events::DashboardEvent;
use crate::model::health::{validate_medication_name, MedicationNameError};
use crate::model::state::{MedicationStatus, StateValue};
use crate::service::ServiceContext;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from health tracker operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthServiceError {
    /// Glass index outside the configured goal.
    GlassOutOfRange { index: u32, max: u32 },
    /// Medication name failed validation.
    InvalidMedication(MedicationNameError),
}

impl Display for HealthServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GlassOutOfRange { index, max } => {
                write!(f, "glass index {index} is outside 0..{max}")
            }
            Self::InvalidMedication(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HealthServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidMedication(err) => Some(err),
            Self::GlassOutOfRange { .. } => None,
        }
    }
}

impl From<MedicationNameError> for HealthServiceError {
    fn from(value: MedicationNameError) -> Self {
        Self::InvalidMedication(value)
    }
}

/// Water progress after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterProgress {
    pub count: u32,
    pub max: u32,
}

impl WaterProgress {
    pub fn goal_reached(&self) -> bool {
        self.count >= self.max
    }
}

/// Health tracker facade over the shared store.
pub struct HealthService {
    ctx: ServiceContext,
}

impl HealthService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn water(&self) -> WaterProgress {
        WaterProgress {
            count: self.ctx.store.water_count(),
            max: self.ctx.config.max_water,
        }
    }

    /// Adds one glass, up to the goal.
    pub fn add_water(&self) -> WaterProgress {
        let current = self.water();
        if current.goal_reached() {
            return current;
        }
        self.set_water(current.count + 1)
    }

    /// Removes one glass, down to zero.
    pub fn remove_water(&self) -> WaterProgress {
        let current = self.water();
        if current.count == 0 {
            return current;
        }
        self.set_water(current.count - 1)
    }

    /// Applies a click on glass `index` (0-based) of the glass row.
    ///
    /// Clicking a filled glass empties it and every glass after it; clicking
    /// an empty glass fills every glass up to and including it.
    pub fn click_glass(&self, index: u32) -> Result<WaterProgress, HealthServiceError> {
        let current = self.water();
        if index >= current.max {
            return Err(HealthServiceError::GlassOutOfRange {
                index,
                max: current.max,
            });
        }
        let target = if index < current.count { index } else { index + 1 };
        Ok(self.set_water(target))
    }

    /// Sets the water count back to zero and emits `water:reset`.
    pub fn reset_water(&self) -> WaterProgress {
        self.ctx.store.set(StateValue::WaterCount(0), false);
        self.ctx.bus.emit(&DashboardEvent::WaterReset);
        self.water()
    }

    pub fn medication(&self) -> MedicationStatus {
        self.ctx.store.medication()
    }

    /// Marks `name` as taken and emits `medication:taken`.
    pub fn mark_medication_taken(&self, name: &str) -> Result<(), HealthServiceError> {
        self.set_medication(name, |_| true).map(|_| ())
    }

    /// Flips `name` (unknown names start as not taken); returns the new flag.
    pub fn toggle_medication(&self, name: &str) -> Result<bool, HealthServiceError> {
        self.set_medication(name, |taken| !taken)
    }

    /// Clears every taken flag, keeping the medication list.
    pub fn reset_medication(&self) {
        let reset: MedicationStatus = self
            .medication()
            .into_keys()
            .map(|name| (name, false))
            .collect();
        self.ctx.store.set(StateValue::Medication(reset), false);
        self.ctx.bus.emit(&DashboardEvent::MedicationReset);
    }

    /// Start-of-day reset for both trackers, as one store update.
    pub fn reset_daily(&self) {
        let reset: MedicationStatus = self
            .medication()
            .into_keys()
            .map(|name| (name, false))
            .collect();
        self.ctx.store.update(
            [StateValue::WaterCount(0), StateValue::Medication(reset)],
            false,
        );
        info!("event=daily_reset module=service status=ok");
        self.ctx.bus.emit(&DashboardEvent::WaterReset);
        self.ctx.bus.emit(&DashboardEvent::MedicationReset);
    }

    fn set_water(&self, count: u32) -> WaterProgress {
        let max = self.ctx.config.max_water;
        let count = count.min(max);
        let previous = self.ctx.store.water_count();
        if count == previous {
            return self.water();
        }

        self.ctx.store.set(StateValue::WaterCount(count), false);
        let event = if count > previous {
            DashboardEvent::WaterAdded { count, max }
        } else {
            DashboardEvent::WaterRemoved { count, max }
        };
        self.ctx.bus.emit(&event);
        if count == max && previous < max {
            info!("event=water_goal module=service status=ok count={count}");
            self.ctx
                .bus
                .emit(&DashboardEvent::WaterGoalAchieved { count });
        }
        WaterProgress { count, max }
    }

    fn set_medication(
        &self,
        name: &str,
        next: impl FnOnce(bool) -> bool,
    ) -> Result<bool, HealthServiceError> {
        let name = validate_medication_name(name, self.ctx.config.max_medication_name_len)?;
        let mut status = self.medication();
        let taken = next(status.get(&name).copied().unwrap_or(false));
        if status.get(&name) == Some(&taken) {
            return Ok(taken);
        }
        status.insert(name.clone(), taken);

        self.ctx.store.set(StateValue::Medication(status), false);
        self.ctx
            .bus
            .emit(&DashboardEvent::MedicationTaken { name, taken });
        Ok(taken)
    }
}

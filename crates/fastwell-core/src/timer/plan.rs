use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The two halves of a fasting cycle. Each phase has its own target
/// duration taken from the active [`FastingPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Fasting,
    Eating,
}

impl Phase {
    /// The phase entered after this one completes.
    pub fn opposite(self) -> Self {
        match self {
            Phase::Fasting => Phase::Eating,
            Phase::Eating => Phase::Fasting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Fasting => "fasting",
            Phase::Eating => "eating",
        }
    }
}

/// A named pair of fasting/eating hour targets, e.g. "16:8".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastingPlan {
    pub fasting_hours: u64,
    pub eating_hours: u64,
    pub label: String,
}

impl FastingPlan {
    /// Build a custom plan. Fasting hours must be nonzero.
    pub fn new(fasting_hours: u64, eating_hours: u64) -> Result<Self, ValidationError> {
        if fasting_hours == 0 {
            return Err(ValidationError::InvalidValue {
                field: "fasting_hours".into(),
                message: "plan must fast for at least one hour".into(),
            });
        }
        Ok(Self {
            fasting_hours,
            eating_hours,
            label: format!("{fasting_hours}:{eating_hours}"),
        })
    }

    /// The classic 16 hours fasting / 8 hours eating plan.
    pub fn sixteen_eight() -> Self {
        Self {
            fasting_hours: 16,
            eating_hours: 8,
            label: "16:8".into(),
        }
    }

    pub fn eighteen_six() -> Self {
        Self {
            fasting_hours: 18,
            eating_hours: 6,
            label: "18:6".into(),
        }
    }

    pub fn twenty_four() -> Self {
        Self {
            fasting_hours: 20,
            eating_hours: 4,
            label: "20:4".into(),
        }
    }

    /// One meal a day.
    pub fn omad() -> Self {
        Self {
            fasting_hours: 23,
            eating_hours: 1,
            label: "23:1".into(),
        }
    }

    /// Look up a preset by label ("16:8", "18:6", "20:4", "23:1"),
    /// falling back to parsing "F:E" as a custom plan.
    pub fn parse(label: &str) -> Result<Self, ValidationError> {
        match label {
            "16:8" => return Ok(Self::sixteen_eight()),
            "18:6" => return Ok(Self::eighteen_six()),
            "20:4" => return Ok(Self::twenty_four()),
            "23:1" => return Ok(Self::omad()),
            _ => {}
        }
        let invalid = || ValidationError::InvalidValue {
            field: "plan".into(),
            message: format!("cannot parse '{label}' as a fasting plan (expected F:E hours)"),
        };
        let (f, e) = label.split_once(':').ok_or_else(invalid)?;
        let fasting = f.trim().parse::<u64>().map_err(|_| invalid())?;
        let eating = e.trim().parse::<u64>().map_err(|_| invalid())?;
        Self::new(fasting, eating)
    }

    /// Hour target for the given phase.
    pub fn phase_hours(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Fasting => self.fasting_hours,
            Phase::Eating => self.eating_hours,
        }
    }

    /// Target duration for the given phase in whole seconds.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn phase_target_secs(&self, phase: Phase) -> u64 {
        self.phase_hours(phase).saturating_mul(3600)
    }
}

impl Default for FastingPlan {
    fn default() -> Self {
        Self::sixteen_eight()
    }
}

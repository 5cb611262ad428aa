pub mod clock;
mod engine;
mod plan;

pub use engine::{FastingEngine, FastingSession, SessionState};
pub use plan::{FastingPlan, Phase};

//! The `update` operation
//!
//! - [`plan`]: decide which build and Enablement Package a run applies
//! - [`sequencer`]: install packages in order through the state machine
//! - [`retention`]: delete installed packages on request
//! - [`engine`]: tie the components together for one run

pub mod engine;
pub mod plan;
pub mod retention;
pub mod sequencer;

pub use engine::{RunSummary, UpdateEngine, UpdateOutcome};
pub use plan::{EnablementOffer, InstallPlan, TargetDecision, build_plan, decide_target, enablement_offer};
pub use retention::{RetentionManager, RetentionResult};
pub use sequencer::{EnablementResult, EnablementSource, InstallSequencer, InstallState, SequenceOutcome};

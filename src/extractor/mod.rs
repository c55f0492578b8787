pub mod executor;
pub mod planner;

pub use executor::{ExtractionOutcome, Extractor};
pub use planner::{plan, ExtractionTarget, Plan, PlanWarning, SubtitleFormat, TargetKind};

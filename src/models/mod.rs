pub mod case;
pub mod feedback;
pub mod stats;

pub use case::{discover_cases, WorksheetCase, SUPPORTED_EXTENSIONS};
pub use feedback::{CaseMeta, CaseOutcome, FeedbackResult, Mistake};
pub use stats::SummaryStats;

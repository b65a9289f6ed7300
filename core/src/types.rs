//! Shared primitive types used across the entire pipeline.

/// Hours since the start of the dataset. One step = one hour.
pub type Step = i64;

/// Calendar bucket keys derived from a step.
pub type Day = i64;
pub type Week = i64;

/// Stable identifier of a sender or recipient account.
pub type AccountId = String;

/// The canonical session identifier.
pub type SessionId = uuid::Uuid;

/// Added to every denominator that can be zero or near zero.
pub const DEFAULT_EPSILON: f64 = 1e-6;

pub const HOURS_PER_DAY: Step = 24;
pub const DAYS_PER_WEEK: Day = 7;

/// Default absolute z-score above which a transaction is flagged.
pub const DEFAULT_FLAG_THRESHOLD: f64 = 3.0;

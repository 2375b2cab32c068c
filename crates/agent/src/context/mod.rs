//! Sensor context: what the assistant knows when it answers.
//!
//! | Source | Policy | Kept |
//! |--------|--------|------|
//! | Devices | best effort | all |
//! | Readings (latest) | required | 1 per device filter, else 5 |
//! | Readings (historical) | required | up to 50 inside the window |
//! | Events | best effort | 10 most recent |

pub mod assembler;
pub mod format;
pub mod time_range;

pub use assembler::{Briefing, ContextAssembler, ContextRequest, ContextSummary};
pub use format::{format_events, format_reading, time_ago};
pub use time_range::TimeRange;

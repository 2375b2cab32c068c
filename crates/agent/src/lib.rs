//! The farm assistant.
//!
//! Turns stored sensor data into a text briefing for the LLM and answers
//! `queryAgent` calls:
//!
//! 1. **Assemble** the briefing for the requested device and time range
//! 2. **Ask** the configured provider with the briefing as system prompt
//! 3. **Degrade** to a fixed message or the raw latest readings on failure

pub mod assistant;
pub mod context;

pub use assistant::{AssistantQuery, AssistantReply, AssistantRequest, AssistantSettings, DEFAULT_PROMPT};
pub use context::{Briefing, ContextAssembler, ContextRequest, ContextSummary, TimeRange};

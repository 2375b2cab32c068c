//! LLM provider implementations for the myPlant backend.
//!
//! All providers implement the `myplant_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

//! Mock infrastructure for testing external services
//!
//! Provides wiremock-based stand-ins for the upstream vendor APIs
//! (OpenAI-compatible chat completions and Anthropic messages).


pub use upstream::*;

//! Integration tests for LLM Relay
//!
//! These tests drive the real router end to end, with either a scripted
//! completion provider or the HTTP provider pointed at wiremock servers.

mod chat_buffered;
mod health;
mod http_provider;

//! Anthropic (Claude) provider implementation
//!
//! This module provides Claude-based weekly planning.

pub mod client;
pub mod planning;
pub mod types;

pub use client::AnthropicClient;
pub use planning::AnthropicPlanningProvider;

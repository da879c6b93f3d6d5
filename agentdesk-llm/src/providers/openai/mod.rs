//! OpenAI provider implementation

pub mod client;
pub mod planning;
pub mod types;

pub use client::OpenAIClient;
pub use planning::OpenAIPlanningProvider;

//! agentdesk console: dashboard orchestration for the weekly activity planner.

pub mod actions;
pub mod aggregator;
pub mod api_client;
pub mod config;
pub mod context_builder;
pub mod error;
pub mod kpi;
pub mod nav;
pub mod notifications;
pub mod session;
pub mod telemetry;

pub use actions::{ActionEvent, ActionTracker, SubmitStatus};
pub use aggregator::Aggregator;
pub use api_client::{EnvCredentialStore, RestClient};
pub use config::{ConfigError, ConsoleConfig};
pub use context_builder::{build_context, check_mandatory};
pub use error::{ConsoleError, ConsoleResult};
pub use nav::{select_day, PlanNavigator};
pub use session::{DashboardSession, PlanState, PlanStatus, RefreshReport, SessionSettings};

//! agentdesk entry point: one dashboard refresh, printed as JSON.

use agentdesk_console::api_client::{EnvCredentialStore, RestClient};
use agentdesk_console::config::{day_from_args, ConsoleConfig};
use agentdesk_console::error::ConsoleResult;
use agentdesk_console::session::{DashboardSession, PlanState, SessionSettings};
use agentdesk_console::telemetry;
use agentdesk_core::DeskError;
use agentdesk_llm::providers::build_provider;
use agentdesk_llm::PlanGenerator;
use std::sync::Arc;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let report = run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run() -> ConsoleResult<serde_json::Value> {
    let config = ConsoleConfig::load()?;
    telemetry::init(&config.log)?;
    let day = day_from_args()?;

    let backend = Arc::new(RestClient::new(&config)?);
    let credentials = Arc::new(EnvCredentialStore::from_config(&config));
    let provider = build_provider(config.provider_settings()?);
    let planner = PlanGenerator::new(provider, config.planner_settings());
    let settings = SessionSettings::from_config(&config);
    let session = DashboardSession::new(backend, credentials, planner, settings);

    let today = chrono::Local::now().date_naive();
    let report = session.refresh(today).await.map_err(DeskError::from)?;

    let (weekly_goal, selected_day) = match session.plan_state().await {
        PlanState::Ready(plan) => (Some(plan.weekly_goal.clone()), session.select_day(day).await),
        _ => (None, None),
    };
    let usage = session.planner().usage();

    tracing::info!(
        generation = report.generation,
        plan = report.plan_status.label(),
        "Refresh complete"
    );

    Ok(serde_json::json!({
        "generation": report.generation,
        "warning": report.warning,
        "plan": {
            "status": report.plan_status.label(),
            "message": report.plan_status.message(),
            "weeklyGoal": weekly_goal,
        },
        "selectedDay": selected_day,
        "kpis": session.kpis(today).await,
        "usage": {
            "calls": usage.calls(),
            "promptTokens": usage.prompt_tokens(),
            "completionTokens": usage.completion_tokens(),
        },
    }))
}

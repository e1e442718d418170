//! Non-interactive CLI commands

use maum_foundation::{
    ChatRequest, ChatTurn, CompanionContext, EngineConfig, GenerationOptions, Priority, Result,
};
use maum_orchestrator::Orchestrator;

/// Run a single chat message through the engine
pub async fn run_chat(
    message: &str,
    name: &str,
    provider: Option<String>,
    priority: Priority,
) -> Result<()> {
    let config = EngineConfig::load().unwrap_or_default();
    let orchestrator = Orchestrator::from_config(&config)?;

    let context = CompanionContext::new("cli-companion", name);
    let request = ChatRequest::new(vec![ChatTurn::user(message)], context).with_options(
        GenerationOptions {
            provider,
            ..GenerationOptions::default()
        },
    );

    let response = orchestrator.submit(request, priority).await?;

    println!("{}", response.content);
    println!();
    println!(
        "[provider: {} | emotion: {:?} | confidence: {:.2} | {}ms{}]",
        response.provider,
        response.emotion,
        response.confidence,
        response.latency_ms,
        if response.cached { " | cached" } else { "" }
    );
    println!(
        "[tokens: {} in / {} out | cost: ${:.5} | retries: {}]",
        response.usage.input_tokens,
        response.usage.output_tokens,
        response.meta.cost_usd,
        response.meta.retry_count
    );

    orchestrator.shutdown();
    Ok(())
}

/// Check every registered provider's health
pub async fn run_health() -> Result<()> {
    let config = EngineConfig::load().unwrap_or_default();
    let orchestrator = Orchestrator::from_config(&config)?;

    println!("Provider health:");
    for (name, healthy) in orchestrator.health_status().await {
        let mark = if healthy { "✓" } else { "✗" };
        println!("  {} {}", mark, name);
    }

    orchestrator.shutdown();
    Ok(())
}

/// Print usage statistics and per-provider metrics
pub async fn run_stats() -> Result<()> {
    let config = EngineConfig::load().unwrap_or_default();
    let orchestrator = Orchestrator::from_config(&config)?;

    let usage = orchestrator.usage_stats();
    let metrics = orchestrator.metrics();

    println!("{}", serde_json::to_string_pretty(&usage)?);
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    orchestrator.shutdown();
    Ok(())
}

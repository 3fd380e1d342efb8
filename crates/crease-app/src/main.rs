// Crease entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Initialize tracing (log to file, stdout carries the report)
// 3. Load config
// 4. Load the matchup document into the store handle
// 5. Build the LLM client from config
// 6. Apply filters and print the report
// 7. Stream the requested insight, if any

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use crease_app::cli::{render_report, Cli};
use crease_app::handle::StoreHandle;
use crease_app::insight::{InsightDispatcher, InsightUpdate};
use crease_app::session::QuerySession;
use crease_core::config;
use crease_llm::client::{LlmClient, TextGenerator};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse the command line
    let cli = Cli::parse();

    // 2. Initialize tracing
    init_tracing()?;
    info!("Crease starting up");

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} teams, model {}",
        config.teams.names.len(),
        config.llm.model
    );

    // 4. Load the matchup document
    let data_path = cli
        .data
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.data.path));
    let handle = StoreHandle::open(&data_path, config.teams.registry())
        .with_context(|| format!("failed to load matchup data from {}", data_path.display()))?;
    let snapshot = handle.snapshot();
    info!(
        "Loaded {} blocks, {} teams, seasons {:?}",
        snapshot.store.blocks().len(),
        snapshot.store.list_teams().len(),
        snapshot.store.list_years()
    );
    let handle = Arc::new(handle);

    // 5. Build the LLM client
    let llm_client = LlmClient::from_config(&config);
    match &llm_client {
        LlmClient::Active(client) => info!("LLM client initialized (model {})", client.model()),
        LlmClient::Disabled => info!("LLM client disabled (no API key)"),
    }

    // 6. Apply filters and print the report
    let mut session = QuerySession::from_config(Arc::clone(&handle), &config);
    cli.apply_filters(&mut session);
    print!("{}", render_report(&session, &cli));

    // 7. Stream the requested insight
    let Some(kind) = cli.analysis_kind()? else {
        return Ok(());
    };
    let request = session.insight_request(&kind);
    let generator: Arc<dyn TextGenerator> = Arc::new(llm_client);
    let (mut dispatcher, mut rx) = InsightDispatcher::from_config(generator, &config);

    println!("\n== {} ==", kind.title());
    dispatcher.dispatch(&request);
    let mut shown = String::new();
    let text = dispatcher
        .drive(&mut rx, |update| {
            if let InsightUpdate::Token(token) = update {
                shown.push_str(token);
                print!("{token}");
                let _ = std::io::stdout().flush();
            }
        })
        .await;
    // Completion may append a note to what was streamed; failures replace it.
    match text.strip_prefix(shown.as_str()) {
        Some(rest) => println!("{rest}"),
        None => println!("\n{text}"),
    }

    info!("Crease finished");
    Ok(())
}

/// Initialize tracing to log to a file, keeping stdout for the report.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("crease.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crease=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

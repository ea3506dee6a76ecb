use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memory_interview::{
    create_router, AppState, CollaboratorFactory, Config, InputMode, QuestionCatalog,
    ServiceFactory, TurnController, TurnState,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "memory-interview", version, about = "Voice interview turn engine")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/memory-interview")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control API
    Serve,
    /// Run one interview from the console and print the report
    Run {
        /// Comma-separated question ids, in the order to ask them
        #[arg(long, value_delimiter = ',', default_value = "q1,q2,q3,q4")]
        questions: Vec<String>,

        /// Type answers on stdin instead of speaking
        #[arg(long)]
        text: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Memory Interview v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Run { questions, text } => run_console(cfg, questions, text).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let factory = ServiceFactory::connect(&cfg).await?;
    let state = AppState::new(
        QuestionCatalog::from_config(&cfg.catalog),
        cfg.turn_config(),
        Arc::new(factory),
        cfg.service.name.clone(),
    );

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")
}

async fn run_console(cfg: Config, question_ids: Vec<String>, text: bool) -> Result<()> {
    let catalog = QuestionCatalog::from_config(&cfg.catalog);
    let questions = catalog.select(&question_ids)?;

    let factory = ServiceFactory::connect(&cfg).await?;
    let collaborators = factory.build().await?;
    let (handle, task) = TurnController::spawn(cfg.turn_config(), collaborators);

    let input = if text { InputMode::Text } else { InputMode::Voice };
    let session_id = handle.begin(questions, input).await?;
    info!("Interview {} started", session_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut snapshots = handle.subscribe();

    let report = loop {
        let snapshot = snapshots.borrow_and_update().clone();
        if let Some(report) = snapshot.report {
            break report;
        }

        let awaiting_text = matches!(
            snapshot.state,
            TurnState::Recording | TurnState::PermissionDenied
        ) && (text || snapshot.state == TurnState::PermissionDenied);

        if awaiting_text {
            if let Some(question) = &snapshot.current_question {
                println!("\n{}", question.prompt_text);
            }
            match lines.next_line().await? {
                Some(line) => {
                    handle.submit_text(line).await?;
                }
                None => {
                    warn!("stdin closed before the interview finished");
                    handle.shutdown().await?;
                    anyhow::bail!("Interview abandoned before the last answer");
                }
            }
            continue;
        }

        if snapshots.changed().await.is_err() {
            anyhow::bail!("Interview controller stopped unexpectedly");
        }
    };

    println!("\n{}", report.render());

    handle.shutdown().await?;
    task.await??;
    Ok(())
}

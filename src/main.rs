use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa::{
    api,
    config::Config,
    logging::{self, Console},
    pipeline::{AnswerQuestionRequest, IndexDocumentRequest, PipelineService},
};
use serde::Serialize;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;

/// Ports tried in order when `SERVER_PORT` is unset.
const FALLBACK_PORTS: RangeInclusive<u16> = 4100..=4199;

#[derive(Parser)]
#[command(
    name = "docqa",
    version,
    about = "Index documents and answer questions over them with cited sources"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Index a single text file.
    Index {
        #[arg(long)]
        file: PathBuf,
    },
    /// Answer a question from indexed content.
    Ask { question: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve);
    dotenvy::dotenv().ok();
    logging::init_tracing(match command {
        Command::Serve => Console::Stdout,
        Command::Index { .. } | Command::Ask { .. } => Console::Stderr,
    });
    let config = Config::from_env().context("failed to load configuration")?;

    let service = PipelineService::from_config(&config)
        .await
        .context("failed to initialize pipeline")?;

    match command {
        Command::Serve => serve(&config, service).await,
        Command::Index { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let outcome = service.index_document(IndexDocumentRequest::new(text)?).await?;
            print_json(&outcome)
        }
        Command::Ask { question } => {
            let outcome = service
                .answer_question(AnswerQuestionRequest::new(question)?)
                .await?;
            print_json(&outcome)
        }
    }
}

async fn serve(config: &Config, service: PipelineService) -> Result<()> {
    let app = api::create_router(Arc::new(service), api::ApiSettings::from_config(config));
    let listener = bind_listener(config.server_port).await?;
    let address = listener.local_addr().context("listener has no local address")?;
    tracing::info!(
        mode = config.runtime_mode.as_str(),
        %address,
        "docqa listening on http://{address}"
    );
    axum::serve(listener, app).await.context("server terminated")?;
    Ok(())
}

fn print_json<T: Serialize>(outcome: &T) -> Result<()> {
    let mut value = serde_json::to_value(outcome)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("success".into(), true.into());
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Bind the configured port, or the first free port in [`FALLBACK_PORTS`].
///
/// An explicit `SERVER_PORT` that is taken is an error; only the fallback range is scanned.
async fn bind_listener(server_port: Option<u16>) -> Result<TcpListener> {
    let candidates = match server_port {
        Some(port) => port..=port,
        None => FALLBACK_PORTS,
    };

    for port in candidates.clone() {
        let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        match TcpListener::bind(address).await {
            Ok(listener) => return Ok(listener),
            Err(err) if server_port.is_none() && err.kind() == ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port busy, trying the next one");
            }
            Err(err) => return Err(err).with_context(|| format!("failed to bind {address}")),
        }
    }

    anyhow::bail!(
        "no free port in {}-{}; set SERVER_PORT",
        candidates.start(),
        candidates.end()
    )
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dottie_ai::{DiagnosticAugmenter, LLMProviderFactory};
use dottie_api::{AppState, Server};
use dottie_core::{GraphStore, Settings};
use dottie_diagnosis::DiagnosticPipeline;
use dottie_graph::{SeedDocument, SurrealDbStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dottie", version, about = "Menstrual-cycle symptom triage service")]
struct Cli {
    /// Directory holding default.toml and <DOTTIE_ENV>.toml
    #[arg(long, env = "DOTTIE_CONFIG_DIR", default_value = "config", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long, env = "DOTTIE_HOST")]
        host: Option<String>,

        #[arg(short, long, env = "DOTTIE_PORT")]
        port: Option<u16>,
    },
    /// Load reference data from a JSON document into the graph store
    Seed {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dottie_api=info,dottie_diagnosis=info,dottie_graph=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config_dir).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            serve(settings).await
        }
        Commands::Seed { file } => seed(settings, file).await,
    }
}

async fn connect_store(settings: &Settings) -> Result<Arc<dyn GraphStore>> {
    let store = SurrealDbStore::connect(&settings.graph)
        .await
        .with_context(|| format!("Failed to connect to graph store at {}", settings.graph.connection))?;
    Ok(Arc::new(store))
}

async fn serve(settings: Settings) -> Result<()> {
    let store = connect_store(&settings).await?;

    let augmenter = LLMProviderFactory::create_from_config(&settings.llm)
        .context("Failed to create LLM provider")?
        .map(|provider| DiagnosticAugmenter::from_config(provider, &settings.llm));

    let pipeline = DiagnosticPipeline::new(store, augmenter, &settings.pipeline);
    info!(
        augmentation = pipeline.augmentation_enabled(),
        request_timeout_secs = settings.pipeline.request_timeout_secs,
        "Diagnostic pipeline ready"
    );

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;
    Server::new(addr, AppState::new(pipeline)).run().await?;
    Ok(())
}

async fn seed(settings: Settings, file: PathBuf) -> Result<()> {
    let document = SeedDocument::from_file(&file)
        .with_context(|| format!("Failed to read seed document {}", file.display()))?;
    let store = connect_store(&settings).await?;
    dottie_graph::schema::ensure(store.as_ref()).await?;
    let report = document.apply(store.as_ref()).await?;
    info!(
        normal_ranges = report.normal_ranges,
        conditions = report.conditions,
        symptoms = report.symptoms,
        causes = report.causes,
        educational_content = report.educational_content,
        relationships = report.relationships,
        "Seeding complete"
    );
    Ok(())
}

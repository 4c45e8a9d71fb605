mod display;
mod embed;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clauseai_ai::{OllamaClient, OnnxEmbedder, TextEmbedder};
use clauseai_api::{AppContext, AppState, router};
use clauseai_core::config::{
    DEFAULT_CLAUSES_PATH, DEFAULT_EMBED_MODEL_DIR, DEFAULT_INDEX_PATH, DEFAULT_LLM_BASE_URL,
    DEFAULT_LLM_MODEL, DEFAULT_RUBRIC_PATH, DEFAULT_SCHEMA_PATH,
};
use clauseai_core::{AnalyzeRequest, Settings};
use clauseai_store::{ClauseStore, cuad, write_corpus};
use tracing::info;

#[derive(Parser)]
#[command(name = "clauseai")]
#[command(about = "Retrieval-grounded risk analysis for contract clauses", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (`/health`, `/api/analyze`)
    Serve(ServeArgs),

    /// Analyze one clause without starting the server
    Analyze(AnalyzeArgs),

    /// Print the corpus clauses nearest to a query
    Search(SearchArgs),

    /// Build the clause corpus from a CUAD v1 JSON file
    #[command(name = "build-corpus")]
    BuildCorpus(BuildCorpusArgs),

    /// Embed the clause corpus and write the vector index
    #[command(name = "build-index")]
    BuildIndex(BuildIndexArgs),
}

#[derive(Args)]
struct DataArgs {
    /// Clause corpus (JSONL)
    #[arg(long, env = "DATA_JSONL_PATH", default_value = DEFAULT_CLAUSES_PATH)]
    clauses: PathBuf,

    /// Vector index artifact
    #[arg(long, env = "DATA_INDEX_PATH", default_value = DEFAULT_INDEX_PATH)]
    index: PathBuf,
}

#[derive(Args)]
struct EmbedArgs {
    /// Directory with model.onnx and tokenizer.json
    #[arg(long, env = "EMBED_MODEL_DIR", default_value = DEFAULT_EMBED_MODEL_DIR)]
    model_dir: PathBuf,
}

#[derive(Args)]
struct ServiceArgs {
    #[command(flatten)]
    data: DataArgs,

    #[command(flatten)]
    embed: EmbedArgs,

    /// Base URL of the Ollama-compatible generation backend
    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    llm_base_url: String,

    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    llm_model: String,

    /// Risk rubric (read verbatim into every prompt)
    #[arg(long, env = "RUBRIC_PATH", default_value = DEFAULT_RUBRIC_PATH)]
    rubric: PathBuf,

    /// Response schema document (read verbatim into every prompt)
    #[arg(long, env = "SCHEMA_PATH", default_value = DEFAULT_SCHEMA_PATH)]
    schema: PathBuf,

    /// Evidence clauses retrieved per request
    #[arg(long, env = "TOP_K", default_value_t = 6)]
    top_k: usize,

    /// Generation request timeout
    #[arg(long, env = "REQUEST_TIMEOUT_S", default_value_t = 600)]
    timeout_secs: u64,
}

impl ServiceArgs {
    fn settings(&self) -> Settings {
        Settings {
            llm_base_url: self.llm_base_url.clone(),
            llm_model: self.llm_model.clone(),
            clauses_path: self.data.clauses.clone(),
            index_path: self.data.index.clone(),
            rubric_path: self.rubric.clone(),
            schema_path: self.schema.clone(),
            top_k: self.top_k,
            request_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    service: ServiceArgs,

    /// Listen address
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    service: ServiceArgs,

    /// Clause text to analyze
    #[arg(long)]
    text: String,

    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Args)]
struct SearchArgs {
    #[command(flatten)]
    data: DataArgs,

    #[command(flatten)]
    embed: EmbedArgs,

    /// Query text
    #[arg(long)]
    query: String,

    /// Number of clauses to show
    #[arg(short, long, env = "TOP_K", default_value_t = 6)]
    k: usize,
}

#[derive(Args)]
struct BuildCorpusArgs {
    /// CUAD v1 JSON (SQuAD layout)
    #[arg(long)]
    cuad: PathBuf,

    /// Output corpus (JSONL)
    #[arg(long, env = "DATA_JSONL_PATH", default_value = DEFAULT_CLAUSES_PATH)]
    out: PathBuf,
}

#[derive(Args)]
struct BuildIndexArgs {
    #[command(flatten)]
    data: DataArgs,

    #[command(flatten)]
    embed: EmbedArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Analyze(args) => analyze(args).await,
        Commands::Search(args) => search(args),
        Commands::BuildCorpus(args) => build_corpus(args),
        Commands::BuildIndex(args) => build_index(args),
    }
}

fn load_embedder(args: &EmbedArgs) -> anyhow::Result<Arc<OnnxEmbedder>> {
    let embedder = OnnxEmbedder::load(&args.model_dir)
        .with_context(|| format!("loading embedding model from {}", args.model_dir.display()))?;
    Ok(Arc::new(embedder))
}

/// Build the full application context; any failure here aborts the process.
fn load_context(args: &ServiceArgs) -> anyhow::Result<Arc<AppContext>> {
    let settings = args.settings();
    let embedder = load_embedder(&args.embed)?;
    let generator = OllamaClient::new(
        &settings.llm_base_url,
        settings.llm_model.clone(),
        settings.request_timeout,
    )?;
    let ctx = AppContext::load(settings, embedder, Arc::new(generator))
        .context("startup failed")?;
    Ok(Arc::new(ctx))
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    info!("clauseai v{}", env!("CARGO_PKG_VERSION"));
    let ctx = load_context(&args.service)?;

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(addr = %args.bind, index_count = ctx.index_count(), "listening");

    axum::serve(listener, router(AppState::ready(ctx))).await?;
    Ok(())
}

async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let ctx = load_context(&args.service)?;
    let resp = clauseai_api::analyze(
        ctx,
        AnalyzeRequest {
            clause_text: args.text,
        },
    )
    .await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resp)?),
        OutputFormat::Text => display::print_verdict(&resp),
    }
    Ok(())
}

fn search(args: SearchArgs) -> anyhow::Result<()> {
    let store = ClauseStore::open(&args.data.clauses, &args.data.index)?;
    let embedder = load_embedder(&args.embed)?;

    let query = embedder.encode(&args.query)?;
    let hits = store.search_scored(&query, args.k)?;
    if hits.is_empty() {
        eprintln!("No clauses found.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        display::print_evidence_card(i + 1, hit);
    }
    eprintln!("{} of {} clauses", hits.len(), store.len());
    Ok(())
}

fn build_corpus(args: BuildCorpusArgs) -> anyhow::Result<()> {
    let dataset = cuad::read_cuad(&args.cuad)
        .with_context(|| format!("reading {}", args.cuad.display()))?;
    let (records, stats) = cuad::build_clauses(&dataset);

    eprintln!(
        "  {} spans: {} low quality, {} duplicates, {} off-topic",
        stats.spans, stats.low_quality, stats.duplicates, stats.keyword_rejected
    );
    write_corpus(&args.out, &records)?;
    eprintln!(
        "Wrote {} cleaned clauses from CUAD to {}",
        stats.kept,
        args.out.display()
    );
    Ok(())
}

fn build_index(args: BuildIndexArgs) -> anyhow::Result<()> {
    let embedder = load_embedder(&args.embed)?;
    let stats = embed::build_index(embedder.as_ref(), &args.data.clauses, &args.data.index)?;
    eprintln!(
        "Built index with {} clauses ({} dims) in {:.1}s",
        stats.rows, stats.dim, stats.elapsed_secs
    );
    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use reciperank_common::{
    load_corpus, load_queries, logger, AppConfig, DatasetConfig, EmbeddingBackend,
};
use reciperank_embed::{provider_from_config, OllamaClient};
use reciperank_eval::{load_labels, render_definitions, MetricsEvaluator, ReportDocument};
use reciperank_vector::{save_results, RetrievalConfig, RetrievalEngine};
use std::path::{Path, PathBuf};

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "reciperank")]
#[command(about = "Reciperank - embedding-based recipe retrieval and evaluation", long_about = None)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Ollama,
    Hash,
}

impl From<BackendArg> for EmbeddingBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Ollama => EmbeddingBackend::Ollama,
            BackendArg::Hash => EmbeddingBackend::Hash,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve top-K recipes for every query from each dataset
    Retrieve {
        /// Queries file
        #[arg(long)]
        queries: Option<PathBuf>,

        /// Dataset as NAME=PATH; repeat to index several corpora
        #[arg(long = "dataset", value_parser = parse_dataset)]
        datasets: Vec<DatasetConfig>,

        /// Results per query
        #[arg(long)]
        top_k: Option<usize>,

        /// Directory for <dataset>_results.json files
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Embedding backend
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,

        /// Embedding model name
        #[arg(long)]
        model: Option<String>,
    },

    /// Compute ranked-retrieval metrics from relevance judgments
    Evaluate {
        /// Judgment file
        labels: PathBuf,

        /// Expected labels per query
        #[arg(long)]
        top_k: Option<usize>,

        /// Also write the report as JSON
        #[arg(long)]
        json_out: Option<PathBuf>,

        /// Print metric definitions before the report
        #[arg(long)]
        explain: bool,
    },
}

fn parse_dataset(value: &str) -> std::result::Result<DatasetConfig, String> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok(DatasetConfig::new(name, path))
        }
        _ => Err(format!("expected NAME=PATH, got '{}'", value)),
    }
}

/// Fail fast when the Ollama server is unreachable
async fn check_backend(config: &AppConfig) -> Result<()> {
    if config.embedding_backend != EmbeddingBackend::Ollama {
        return Ok(());
    }

    let client = OllamaClient::from_config(config)?;
    if !client.test_connection().await? {
        anyhow::bail!("Ollama at {} is not responding", config.ollama_base_url);
    }
    tracing::info!("Ollama reachable at {}", config.ollama_base_url);
    Ok(())
}

async fn retrieve(config: &AppConfig) -> Result<()> {
    let queries = load_queries(&config.queries_path)
        .with_context(|| format!("Failed to load queries from {}", config.queries_path.display()))?;
    check_backend(config).await?;
    let provider = provider_from_config(config)?;

    for dataset in &config.datasets {
        let corpus = load_corpus(&dataset.path)
            .with_context(|| format!("Failed to load dataset {}", dataset.name))?;

        let engine = RetrievalEngine::build(
            &dataset.name,
            corpus,
            provider.clone(),
            RetrievalConfig::from_app_config(config),
        )
        .await?;

        let results = engine.run(&queries).await?;
        let path = config.results_path(&dataset.name);
        save_results(&path, &results).await?;
        println!(
            "{}: {} queries -> {}",
            dataset.name,
            results.len(),
            path.display()
        );
    }

    Ok(())
}

fn evaluate(config: &AppConfig, labels: &Path, json_out: Option<&Path>, explain: bool) -> Result<()> {
    if explain {
        println!("{}", render_definitions());
    }

    let queries = load_labels(labels)?;
    let report = MetricsEvaluator::from_app_config(config)?.evaluate(&queries)?;
    print!("{}", report.render_table());

    if let Some(path) = json_out {
        ReportDocument::new(labels.display().to_string(), &report).write_json(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Retrieve {
            queries,
            datasets,
            top_k,
            output_dir,
            backend,
            model,
        } => {
            // Override with CLI arguments
            if let Some(path) = queries {
                config.queries_path = path;
            }
            if !datasets.is_empty() {
                config.datasets = datasets;
            }
            if let Some(k) = top_k {
                config.set_top_k(k);
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(backend) = backend {
                config.embedding_backend = backend.into();
            }
            if let Some(model) = model {
                config.embedding_model = model;
            }
            config.validate()?;
            config.ensure_directories()?;

            logger::setup_logging(&config.log_dir, &config.log_level)?;
            tracing::info!("Reciperank retrieval starting...");
            tracing::info!("Configuration loaded:");
            tracing::info!("  Backend: {:?} ({})", config.embedding_backend, config.embedding_model);
            tracing::info!("  Datasets: {}", config.datasets.len());
            tracing::info!("  Top-K: {}", config.top_k);

            retrieve(&config).await?;
        }
        Commands::Evaluate {
            labels,
            top_k,
            json_out,
            explain,
        } => {
            if let Some(k) = top_k {
                config.set_top_k(k);
            }
            config.validate()?;

            logger::setup_console_logging(&config.log_level)?;
            evaluate(&config, &labels, json_out.as_deref(), explain)?;
        }
    }

    Ok(())
}

//! LexSearch CLI - penal-code lookup, semantic search and the HTTP service
//!
//! # Commands
//!
//! ```bash
//! # Build (or rebuild) the persisted index for a corpus
//! lexsearch build-index --corpus data/bns_sections.json
//!
//! # Exact lookup by a section number mentioned in the query
//! lexsearch lookup --corpus data/bns_sections.json "what does section 303 say"
//!
//! # Semantic search
//! lexsearch search --corpus data/bns_sections.json -k 3 "punishment for stealing"
//!
//! # Templated explanation of one section
//! lexsearch explain --corpus data/bns_sections.json 103
//!
//! # Run the HTTP API
//! lexsearch serve --corpus data/bns_sections.json --ipc-corpus data/ipc_sections.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lexsearch_lib::{
    exact,
    explain::explain,
    search::{SemanticEngine, DEFAULT_TOP_K},
};

mod engine;
mod logging;
mod server;

use engine::IndexArgs;

#[derive(Parser)]
#[command(name = "lexsearch")]
#[command(about = "Question answering over Indian penal-code sections")]
#[command(version)]
struct Cli {
    /// Also write logs to a daily-rolling file in this directory
    #[arg(long, global = true, env = "LEXSEARCH_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed the corpus and persist its index
    BuildIndex {
        #[command(flatten)]
        index: IndexArgs,
    },

    /// Find a section by the number mentioned in a query
    Lookup {
        /// Corpus JSON file
        #[arg(long, env = "LEXSEARCH_CORPUS")]
        corpus: PathBuf,

        /// Free-text query, e.g. "section 303"
        query: String,
    },

    /// Rank sections by meaning
    Search {
        #[command(flatten)]
        index: IndexArgs,

        /// Query to search for
        query: String,

        /// Number of results to return
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        k: usize,
    },

    /// Explain one section in plain language
    Explain {
        /// Corpus JSON file
        #[arg(long, env = "LEXSEARCH_CORPUS")]
        corpus: PathBuf,

        /// Section number
        section: String,
    },

    /// Serve the HTTP API
    Serve(server::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_dir.as_deref());

    match cli.command {
        Commands::BuildIndex { index } => {
            let embedder = engine::make_embedder(index.embedder, index.hash_dimension)?;
            let corpus = engine::load_corpus(&index.corpus)?;
            let path = index.index_path();

            let engine = SemanticEngine::build(corpus, embedder, index.search_options())?;
            engine
                .store()
                .save(&path)
                .with_context(|| format!("failed to write index {}", path.display()))?;
            println!("Indexed {} sections into {}", engine.len(), path.display());
        }

        Commands::Lookup { corpus, query } => {
            let corpus = engine::load_corpus(&corpus)?;
            match exact::search(&query, &corpus) {
                Some(section) => {
                    println!("Section {} - {}\n", section.id, section.title);
                    println!("{}", section.text);
                }
                None => println!("Section not found"),
            }
        }

        Commands::Search { index, query, k } => {
            let embedder = engine::make_embedder(index.embedder, index.hash_dimension)?;
            let engine =
                engine::open_engine(&index.corpus, &index.index_path(), embedder, index.search_options())?;

            println!("Searching: '{query}' (k={k})");
            let hits = engine.search(&query, k)?;
            if hits.is_empty() {
                println!("\nNo matching sections");
            }
            for hit in &hits {
                println!("\n#{} Section {} - {} (distance: {:.4})", hit.rank, hit.section.id, hit.section.title, hit.distance);
                println!("{}", hit.section.preview(200));
            }
        }

        Commands::Explain { corpus, section } => {
            let corpus = engine::load_corpus(&corpus)?;
            match corpus.get(section.trim()) {
                Some(section) => println!("{}", explain(section)),
                None => println!("Section not found"),
            }
        }

        Commands::Serve(args) => server::serve(args).await?,
    }

    Ok(())
}

//! LexSearch - retrieval core for penal-code question answering
//!
//! # Architecture
//!
//! ```text
//! sections.json -> Corpus ----------------------------+
//!                    |                                |
//!                    +-> Embedder -> FlatIndex        |
//!                                       |             |
//! Query -> exact::search ---------------|-------------+-> Section
//!       -> Embedder -> SemanticEngine <-+             |
//!                          |                          |
//!                       SearchHits -> explain / Composer -> Answer
//! ```
//!
//! # Example
//!
//! ```ignore
//! use lexsearch_lib::{corpus::Corpus, embed, explain::explain, search::SemanticEngine};
//!
//! let corpus = Arc::new(Corpus::load("data/bns_sections.json")?);
//!
//! // Lookup by number
//! let theft = lexsearch_lib::exact::search("what does section 303 say", &corpus);
//!
//! // Search by meaning
//! let embedder = embed::shared(embed::MiniLmEmbedder::new()?);
//! let engine = SemanticEngine::open(corpus, embedder, "data/bns_sections.index", Default::default())?;
//! for hit in engine.search("punishment for stealing", 3)? {
//!     println!("{}", explain(&hit.section));
//! }
//! ```

pub mod compose;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod exact;
pub mod explain;
pub mod search;
pub mod session;
pub mod store;

pub use error::{Error, Result};

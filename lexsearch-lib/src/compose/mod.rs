//! Answer composition
//!
//! Turns search hits into a user-facing answer. With a generative backend the
//! hits' raw text becomes the context of a prompt and the completion is
//! returned with a citation list; without one (or when it fails) the answer is
//! assembled from [`explain`](crate::explain::explain) output instead.
//!
//! Citations follow the hit order and use section ids and titles exactly as
//! stored.
//!
//! # Usage
//!
//! ```ignore
//! use lexsearch_lib::compose::{Composer, OllamaClient};
//!
//! let llm = OllamaClient::new(OLLAMA_URL, "deepseek-r1:1.5b", Duration::from_secs(60))?;
//! let composer = Composer::with_llm(Arc::new(llm));
//!
//! let hits = engine.search(&query, 3)?;
//! let answer = composer.answer(&query, &hits).await;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::explain::explain;
use crate::search::SearchHit;
use crate::Result;

/// Reply used when retrieval produced nothing to answer from.
pub const NO_MATCH_ANSWER: &str = "No relevant legal section found.";

/// Reply used when retrieval itself could not run.
pub const UNAVAILABLE_ANSWER: &str = "Answer unavailable right now, please try again later.";

/// A generative model that completes a single prompt.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Backend name for logs (e.g. "ollama")
    fn name(&self) -> &str;

    /// Complete `prompt` and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// A cited section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub section: String,
    pub title: String,
}

impl std::fmt::Display for Citation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Section {} — {}", self.section, self.title)
    }
}

/// How an answer was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// Written by the generative backend from retrieved context
    Generated,
    /// Assembled from templated section explanations
    Extractive,
    /// Nothing was retrieved
    NoMatch,
    /// Retrieval failed upstream; no answer could be formed
    Unavailable,
}

/// A composed answer
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
    pub mode: AnswerMode,
    /// An upstream call failed, so the answer fell back
    pub degraded: bool,
}

impl Answer {
    /// Placeholder answer for when retrieval failed before composition.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            text: UNAVAILABLE_ANSWER.to_string(),
            citations: Vec::new(),
            mode: AnswerMode::Unavailable,
            degraded: true,
        }
    }
}

/// Builds answers from search hits, optionally through an LLM.
#[derive(Clone, Default)]
pub struct Composer {
    llm: Option<Arc<dyn LlmClient>>,
}

impl Composer {
    /// Composer that never calls a generative backend.
    #[must_use]
    pub fn extractive() -> Self {
        Self { llm: None }
    }

    /// Composer that asks `llm` first and falls back to extractive answers.
    #[must_use]
    pub fn with_llm(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm: Some(llm) }
    }

    #[must_use]
    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Compose an answer to `query` from `hits`.
    ///
    /// Never fails: backend errors are logged and produce an extractive answer
    /// flagged `degraded`.
    pub async fn answer(&self, query: &str, hits: &[SearchHit]) -> Answer {
        if hits.is_empty() {
            return Answer {
                text: NO_MATCH_ANSWER.to_string(),
                citations: Vec::new(),
                mode: AnswerMode::NoMatch,
                degraded: false,
            };
        }

        let citations = citations(hits);

        let Some(llm) = &self.llm else {
            return Answer {
                text: extractive_answer(query, hits),
                citations,
                mode: AnswerMode::Extractive,
                degraded: false,
            };
        };

        let prompt = build_prompt(query, &build_context(hits));
        match llm.complete(&prompt).await {
            Ok(completion) => Answer {
                text: with_citations(completion.trim(), &citations),
                citations,
                mode: AnswerMode::Generated,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(backend = llm.name(), error = %e, "generation failed, answering extractively");
                Answer {
                    text: extractive_answer(query, hits),
                    citations,
                    mode: AnswerMode::Extractive,
                    degraded: true,
                }
            }
        }
    }
}

/// Citation list in hit order.
pub fn citations(hits: &[SearchHit]) -> Vec<Citation> {
    hits.iter()
        .map(|hit| Citation {
            section: hit.section.id.clone(),
            title: hit.section.title.clone(),
        })
        .collect()
}

/// Raw section texts joined into one context block.
pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            format!(
                "SECTION {} — {}\n{}",
                hit.section.id, hit.section.title, hit.section.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Prompt sent to the generative backend.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are LexSearch, an AI legal assistant for Indian law students.

Answer the question ONLY using the legal sections below.

Rules:
- Explain in simple law-student style
- Mention punishment if present
- Give multiple sections if relevant
- End with citations

USER QUESTION:
{query}

LEGAL CONTEXT:
{context}

Now write the best helpful answer:
"
    )
}

/// Answer built only from templated explanations.
pub fn extractive_answer(query: &str, hits: &[SearchHit]) -> String {
    let mut parts = vec![format!("## Answer: {query}\n")];
    for hit in hits {
        parts.push(format!(
            "### Section {} — {}\n{}\n",
            hit.section.id,
            hit.section.title,
            explain(&hit.section)
        ));
    }
    parts.join("\n")
}

fn with_citations(body: &str, citations: &[Citation]) -> String {
    let mut text = format!("{body}\n\n---\n### Citations\n");
    for citation in citations {
        text.push_str(&format!("- {citation}\n"));
    }
    text
}

mod ollama;

pub use ollama::*;

//! Session-scoped query pipeline: retrieval plus tree-style answer
//! synthesis over one document's index.
//!
//! Terminal states per query: answered, degraded, or failed. Only two
//! failures escape this module, an empty document id (`InvalidInput`) and
//! a missing index (`NotFound`). Everything that goes wrong during
//! retrieval or generation is converted into an answer string so the
//! conversation never breaks.

use std::sync::Arc;

use tracing::warn;

use crate::config::{ModelsConfig, RetrievalConfig};
use crate::error::{ChatError, Result};
use crate::index::IndexStore;
use crate::llm::{LanguageModel, ModelHandle};
use crate::models::RetrievedChunk;
use crate::router::ModelRouter;

/// Returned verbatim when generation produces an empty or whitespace-only
/// answer.
pub const NO_RELEVANT_INFO: &str = "I couldn't find relevant information to answer your question. Could you please rephrase or ask something else?";

/// Returned verbatim when the generation call exceeds its deadline.
pub const RESPONSE_TIMEOUT: &str = "I apologize, but the response took too long to generate. This might happen with very complex questions. Could you try asking a simpler question or breaking it down into parts?";

pub struct QueryPipeline {
    index: Arc<IndexStore>,
    router: ModelRouter,
    llm: Arc<dyn LanguageModel>,
    top_k: usize,
    max_context_chars: usize,
}

impl QueryPipeline {
    pub fn new(
        index: Arc<IndexStore>,
        router: ModelRouter,
        llm: Arc<dyn LanguageModel>,
        retrieval: &RetrievalConfig,
        models: &ModelsConfig,
    ) -> Self {
        Self {
            index,
            router,
            llm,
            top_k: retrieval.top_k,
            max_context_chars: models.max_context_chars,
        }
    }

    /// Answer one question against one document's index.
    pub async fn answer(&self, document_id: &str, question: &str) -> Result<String> {
        if document_id.trim().is_empty() {
            return Err(ChatError::InvalidInput("no document id provided".to_string()));
        }

        // Missing index is user-facing: the file must be processed first.
        self.index.get(document_id).await?;

        let model = self.router.select_generation_model(question).clone();

        match self.retrieve_and_generate(document_id, question, &model).await {
            Ok(answer) if answer.trim().is_empty() => Ok(NO_RELEVANT_INFO.to_string()),
            Ok(answer) => Ok(answer),
            Err(ChatError::Timeout) => Ok(RESPONSE_TIMEOUT.to_string()),
            Err(e) => Ok(format!(
                "An error occurred while processing your question: {e}"
            )),
        }
    }

    async fn retrieve_and_generate(
        &self,
        document_id: &str,
        question: &str,
        model: &ModelHandle,
    ) -> Result<String> {
        let vectors = self
            .llm
            .embed(self.router.embedding_model(), &[question.to_string()])
            .await?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Internal("empty embedding response".to_string()))?;

        let retrieved = self
            .index
            .search(document_id, &query_vector, self.top_k)
            .await?;

        self.tree_summarize(question, &retrieved, model).await
    }

    /// Hierarchical reduction over the retrieved chunks: pack chunks into
    /// groups bounded by the context budget, answer the question over each
    /// group, then combine intermediate answers until one remains. No
    /// single generation call receives more than the budget.
    async fn tree_summarize(
        &self,
        question: &str,
        retrieved: &[RetrievedChunk],
        model: &ModelHandle,
    ) -> Result<String> {
        let mut texts: Vec<String> = retrieved.iter().map(|c| c.text.clone()).collect();
        if texts.is_empty() {
            // Degraded one level up: nothing to ground an answer in.
            return Ok(String::new());
        }

        loop {
            let groups = pack_under_budget(&texts, self.max_context_chars);

            let mut answers = Vec::with_capacity(groups.len());
            for group in &groups {
                let prompt = synthesis_prompt(question, group);
                answers.push(self.llm.generate(model, &prompt).await?);
            }

            if answers.len() == 1 {
                return Ok(answers.pop().unwrap_or_default());
            }

            // Generated answers did not shrink below the budget; force
            // progress so the reduction terminates.
            if answers.len() >= texts.len() {
                answers = answers
                    .chunks(2)
                    .map(|pair| {
                        let joined = pair.join("\n\n");
                        let chars = joined.chars().count();
                        if chars > self.max_context_chars {
                            warn!(
                                chars,
                                budget = self.max_context_chars,
                                "truncating intermediate answers to fit the context budget"
                            );
                        }
                        truncate_chars(&joined, self.max_context_chars)
                    })
                    .collect();
            }

            texts = answers;
        }
    }
}

/// Greedily pack texts into groups whose joined length stays within
/// `budget` characters. A single oversized text is truncated rather than
/// split, so every group fits the budget.
fn pack_under_budget(texts: &[String], budget: usize) -> Vec<String> {
    let mut groups = Vec::new();
    let mut current = String::new();

    for text in texts {
        let text = truncate_chars(text, budget);
        let would_be = if current.is_empty() {
            text.chars().count()
        } else {
            current.chars().count() + 2 + text.chars().count()
        };

        if would_be > budget && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&text);
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

fn synthesis_prompt(question: &str, context: &str) -> String {
    format!(
        "Context information from the document is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, \
         answer the query.\n\
         Query: {question}\n\
         Answer: "
    )
}

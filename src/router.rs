//! Keyword-based model routing.
//!
//! Questions that mention code-related terms go to the code-specialized
//! model (low temperature, deterministic output); everything else goes to
//! the general chat model (higher temperature, conversational variance).
//! This is a heuristic, not a classifier: "my function at the party" still
//! routes to the code model.

use crate::config::ModelsConfig;
use crate::llm::ModelHandle;

const CODE_TERMS: [&str; 5] = ["code", "function", "class", "programming", "syntax"];

/// Holds the two generation models and the embedding model name, built once
/// at startup. Routing is stateless and recomputed per query.
#[derive(Debug, Clone)]
pub struct ModelRouter {
    chat_model: ModelHandle,
    code_model: ModelHandle,
    embedding_model: String,
}

impl ModelRouter {
    pub fn new(config: &ModelsConfig) -> Self {
        Self {
            chat_model: ModelHandle {
                name: config.chat_model.clone(),
                temperature: config.chat_temperature,
            },
            code_model: ModelHandle {
                name: config.code_model.clone(),
                temperature: config.code_temperature,
            },
            embedding_model: config.embedding_model.clone(),
        }
    }

    /// Pick the generation model for a question by case-insensitive keyword
    /// containment.
    pub fn select_generation_model(&self, question: &str) -> &ModelHandle {
        let lowered = question.to_lowercase();
        if CODE_TERMS.iter().any(|term| lowered.contains(term)) {
            &self.code_model
        } else {
            &self.chat_model
        }
    }

    /// The single embedding model used for both indexing and query
    /// embedding.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ModelRouter {
        ModelRouter::new(&ModelsConfig::default())
    }

    #[test]
    fn test_code_question_routes_to_code_model() {
        let r = router();
        assert_eq!(r.select_generation_model("explain this function").name, "codellama");
        assert_eq!(r.select_generation_model("what is the syntax here").name, "codellama");
    }

    #[test]
    fn test_general_question_routes_to_chat_model() {
        let r = router();
        assert_eq!(r.select_generation_model("how are you").name, "mistral");
        assert_eq!(r.select_generation_model("summarize the document").name, "mistral");
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let r = router();
        assert_eq!(r.select_generation_model("CODE review").name, "codellama");
        assert_eq!(r.select_generation_model("Programming question").name, "codellama");
    }

    #[test]
    fn test_temperatures_fixed_per_model() {
        let r = router();
        assert_eq!(r.select_generation_model("how are you").temperature, 0.7);
        assert_eq!(r.select_generation_model("explain this class").temperature, 0.2);
    }
}

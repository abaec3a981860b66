//! EdgeLink RAG - Answer orchestration
//!
//! Embeds the question, retrieves the nearest documents, assembles a
//! citation-friendly prompt and asks the generation client for an answer.

use edgelink_core::{
    Answer, Citation, EdgeLinkError, LlmClient, RagConfig, Result, RetrievedDocument,
};
use edgelink_vector::DocumentStore;
use std::sync::Arc;
use std::time::Instant;

pub mod llm;

pub use llm::{create_llm_client, AnthropicClient, OllamaClient, OpenAiClient};

/// Instructions placed ahead of the retrieved context
pub const PROMPT_INSTRUCTIONS: &str = "You are an AI assistant that answers questions using the provided context. \
Only rely on the context when possible and include short citations in the format [source]. \
If the context is insufficient, state that you do not know.";

/// Resolve a requested `top_k` (possibly absent or non-positive) into `1..=max`
pub fn normalize_top_k(requested: Option<i64>, default: usize, max: usize) -> usize {
    let max = max.max(1);
    match requested {
        None => default.clamp(1, max),
        Some(k) if k < 1 => 1,
        Some(k) => usize::try_from(k).unwrap_or(usize::MAX).min(max),
    }
}

// ============================================================================
// Prompt Builder
// ============================================================================

/// Prompt assembly for retrieved context
pub struct PromptBuilder;

impl PromptBuilder {
    /// Number each document as `[i] Source: <source>` followed by its text
    pub fn build_context(results: &[RetrievedDocument], no_match: &str) -> String {
        if results.is_empty() {
            return no_match.to_string();
        }

        results
            .iter()
            .enumerate()
            .map(|(i, doc)| format!("[{}] Source: {}\n{}", i + 1, doc.source(), doc.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Inserted values are copied verbatim, never scanned for placeholders
    pub fn build_prompt(context: &str, question: &str) -> String {
        format!("{PROMPT_INSTRUCTIONS}\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:")
    }
}

// ============================================================================
// Answer Orchestrator
// ============================================================================

/// Retrieval-augmented answer generation over a [`DocumentStore`]
pub struct AnswerOrchestrator {
    store: Arc<DocumentStore>,
    llm_client: Arc<dyn LlmClient>,
    config: RagConfig,
}

impl AnswerOrchestrator {
    pub fn new(store: Arc<DocumentStore>, llm_client: Arc<dyn LlmClient>, config: RagConfig) -> Self {
        Self {
            store,
            llm_client,
            config,
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn llm_client(&self) -> &Arc<dyn LlmClient> {
        &self.llm_client
    }

    /// Answer returned in place of a generated one when a provider fails
    pub fn fallback(&self) -> Answer {
        Answer {
            answer: self.config.fallback_answer.clone(),
            citations: Vec::new(),
        }
    }

    /// Answer `question` from the `top_k` nearest documents
    pub async fn generate_answer(&self, question: &str, top_k: usize) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(EdgeLinkError::InvalidInput(
                "Query text cannot be empty.".to_string(),
            ));
        }

        let start_time = Instant::now();
        let top_k = top_k.clamp(1, self.config.max_top_k.max(1));
        tracing::info!(top_k, provider = self.llm_client.provider(), "Answer generation started");

        // 1. Retrieve
        let embedding = self.store.embedder().embed(question).await?;
        let results = self.store.query(&embedding, top_k).await?;
        tracing::debug!("Retrieved {} documents", results.len());

        // 2. Build prompt
        let context = PromptBuilder::build_context(&results, &self.config.no_match_context);
        let prompt = PromptBuilder::build_prompt(&context, question);
        let citations: Vec<Citation> = results.iter().map(RetrievedDocument::to_citation).collect();

        // 3. Generate
        tracing::debug!("Calling LLM with prompt length: {} chars", prompt.len());
        let answer = self.llm_client.generate(&prompt).await?;

        tracing::info!(
            citations = citations.len(),
            answer_length = answer.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Answer generated"
        );

        Ok(Answer {
            answer: answer.trim().to_string(),
            citations,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edgelink_core::{Metadata, SOURCE_KEY};
    use edgelink_vector::{HashingEmbedding, LocalStore};
    use proptest::prelude::*;
    use std::sync::Mutex;

    /// Records every prompt and replies with a fixed answer or error
    struct ScriptedLlm {
        reply: std::result::Result<String, fn() -> EdgeLinkError>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn answering(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: fn() -> EdgeLinkError) -> Self {
            Self {
                reply: Err(err),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }

        fn provider(&self) -> &str {
            "scripted"
        }
    }

    fn store() -> Arc<DocumentStore> {
        Arc::new(DocumentStore::new(
            Arc::new(LocalStore::in_memory("test")),
            Arc::new(HashingEmbedding::new(384)),
        ))
    }

    fn orchestrator(store: Arc<DocumentStore>, llm: Arc<ScriptedLlm>) -> AnswerOrchestrator {
        AnswerOrchestrator::new(store, llm, RagConfig::default())
    }

    fn source(name: &str) -> Option<Metadata> {
        Some(Metadata::from([(SOURCE_KEY.to_string(), name.to_string())]))
    }

    #[test]
    fn test_normalize_top_k() {
        assert_eq!(normalize_top_k(None, 4, 20), 4);
        assert_eq!(normalize_top_k(Some(0), 4, 20), 1);
        assert_eq!(normalize_top_k(Some(-5), 4, 20), 1);
        assert_eq!(normalize_top_k(Some(7), 4, 20), 7);
        assert_eq!(normalize_top_k(Some(500), 4, 20), 20);
        assert_eq!(normalize_top_k(None, 0, 20), 1);
    }

    #[test]
    fn test_prompt_template() {
        let prompt = PromptBuilder::build_prompt("CTX", "What?");
        assert!(prompt.starts_with(
            "You are an AI assistant that answers questions using the provided context."
        ));
        assert!(prompt.contains("include short citations in the format [source]."));
        assert!(prompt.contains("\n\nContext:\nCTX\n\nQuestion: What?\n\nAnswer:"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_prompt_keeps_brace_text_verbatim() {
        let docs = vec![RetrievedDocument {
            id: "a".to_string(),
            text: "Template docs use {question} as a placeholder.".to_string(),
            metadata: Metadata::from([(SOURCE_KEY.to_string(), "{context}".to_string())]),
            distance: 0.0,
        }];

        let context = PromptBuilder::build_context(&docs, "none");
        let prompt = PromptBuilder::build_prompt(&context, "Why {context}?");
        assert!(prompt.contains(
            "Context:\n[1] Source: {context}\nTemplate docs use {question} as a placeholder.\n\n"
        ));
        assert!(prompt.contains("Question: Why {context}?\n\nAnswer:"));
        assert!(!prompt.contains("use Why"));
    }

    #[test]
    fn test_context_blocks() {
        let docs = vec![
            RetrievedDocument {
                id: "a".to_string(),
                text: "first text".to_string(),
                metadata: Metadata::from([(SOURCE_KEY.to_string(), "notes.md".to_string())]),
                distance: 0.1,
            },
            RetrievedDocument {
                id: "b".to_string(),
                text: "second text".to_string(),
                metadata: Metadata::new(),
                distance: 0.2,
            },
        ];

        let context = PromptBuilder::build_context(&docs, "none");
        assert_eq!(
            context,
            "[1] Source: notes.md\nfirst text\n\n[2] Source: b\nsecond text"
        );
        assert_eq!(PromptBuilder::build_context(&[], "none"), "none");
    }

    #[tokio::test]
    async fn test_answer_cites_retrieved_documents() {
        let store = store();
        store
            .add("EdgeLink secures the gateway with Actix.", source("notes.md"))
            .await
            .unwrap();
        store
            .add("Quarterly revenue figures for a bakery chain.", None)
            .await
            .unwrap();

        let llm = Arc::new(ScriptedLlm::answering("  It uses Actix [notes.md].\n"));
        let orchestrator = orchestrator(store, llm.clone());

        let answer = orchestrator
            .generate_answer("How does EdgeLink secure the gateway?", 1)
            .await
            .unwrap();

        assert_eq!(answer.answer, "It uses Actix [notes.md].");
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].source, "notes.md");
        assert_eq!(answer.citations[0].text, "EdgeLink secures the gateway with Actix.");

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("[1] Source: notes.md\nEdgeLink secures the gateway with Actix."));
        assert!(prompts[0].contains("Question: How does EdgeLink secure the gateway?"));
    }

    #[tokio::test]
    async fn test_empty_store_uses_placeholder() {
        let llm = Arc::new(ScriptedLlm::answering("I do not know."));
        let orchestrator = orchestrator(store(), llm.clone());

        let answer = orchestrator.generate_answer("anything?", 4).await.unwrap();
        assert!(answer.citations.is_empty());
        assert_eq!(answer.answer, "I do not know.");
        assert!(llm.prompts()[0].contains("Context:\nNo documents matched the query.\n\n"));
    }

    #[tokio::test]
    async fn test_zero_top_k_retrieves_one() {
        let store = store();
        store.add("alpha document", None).await.unwrap();
        store.add("beta document", None).await.unwrap();

        let llm = Arc::new(ScriptedLlm::answering("ok"));
        let answer = orchestrator(store, llm)
            .generate_answer("alpha", 0)
            .await
            .unwrap();
        assert_eq!(answer.citations.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_errors_propagate() {
        let store = store();
        store.add("some document", None).await.unwrap();

        let llm = Arc::new(ScriptedLlm::failing(|| {
            EdgeLinkError::ServiceMisconfigured("ANTHROPIC_API_KEY environment variable is not set".to_string())
        }));
        let err = orchestrator(store.clone(), llm)
            .generate_answer("question", 4)
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeLinkError::ServiceMisconfigured(_)));

        let llm = Arc::new(ScriptedLlm::failing(|| {
            EdgeLinkError::Upstream("overloaded".to_string())
        }));
        let err = orchestrator(store, llm)
            .generate_answer("question", 4)
            .await
            .unwrap_err();
        assert!(err.is_runtime_failure());
    }

    #[test]
    fn test_fallback_answer() {
        let llm = Arc::new(ScriptedLlm::answering("unused"));
        let fallback = orchestrator(store(), llm).fallback();
        assert!(fallback.answer.starts_with("I'm sorry"));
        assert!(fallback.citations.is_empty());
    }

    proptest! {
        #[test]
        fn prop_blank_question_rejected(question in "[ \t\n]{0,8}", top_k in 0usize..50) {
            let llm = Arc::new(ScriptedLlm::answering("unused"));
            let orchestrator = orchestrator(store(), llm.clone());

            let result = tokio_test::block_on(orchestrator.generate_answer(&question, top_k));
            prop_assert!(matches!(result, Err(EdgeLinkError::InvalidInput(_))));
            prop_assert!(llm.prompts().is_empty());
        }

        #[test]
        fn prop_normalized_top_k_in_range(requested in proptest::option::of(any::<i64>())) {
            let k = normalize_top_k(requested, 4, 20);
            prop_assert!((1..=20).contains(&k));
        }
    }
}

//! Message routing.
//!
//! The single decision point of the chat flow: a banking message goes to the
//! retrieval pipeline when it is ready, everything else is forwarded to the
//! external conversational engine. Each message is classified independently;
//! a conversation can switch engines from one turn to the next.

use std::sync::Arc;

use crate::classify::QueryClassifier;
use crate::core::errors::ApiError;
use crate::engine::{combine_parts, GeneralEngine};
use crate::history::HistoryStore;
use crate::rag::service::HISTORY_WINDOW;
use crate::rag::{RagService, FALLBACK_RESPONSE};
use crate::translate::{Lang, Translator};

/// A chat message as received by a handler, already validated.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub user_id: String,
    pub conversation_id: String,
    pub text: String,
    pub language: String,
}

/// The routed, persisted reply returned to the handler.
#[derive(Debug, Clone)]
pub struct RoutedReply {
    pub text: String,
    pub source: &'static str,
    pub language: String,
}

pub struct ChatRouter {
    rag: Arc<RagService>,
    classifier: Arc<dyn QueryClassifier>,
    engine: Arc<dyn GeneralEngine>,
    history: HistoryStore,
    translator: Option<Translator>,
}

impl ChatRouter {
    pub fn new(
        rag: Arc<RagService>,
        classifier: Arc<dyn QueryClassifier>,
        engine: Arc<dyn GeneralEngine>,
        history: HistoryStore,
        translator: Option<Translator>,
    ) -> Self {
        Self {
            rag,
            classifier,
            engine,
            history,
            translator,
        }
    }

    /// Smart routing: domain queries take the retrieval path when the index
    /// is ready, everything else goes to the engine.
    pub async fn handle(&self, msg: &InboundMessage) -> Result<RoutedReply, ApiError> {
        if self.classifier.is_domain_query(&msg.text) && self.rag.is_ready().await {
            tracing::info!("Routing to retrieval pipeline (banking query detected)");
            self.handle_rag(msg).await
        } else {
            tracing::info!("Routing to conversational engine (general conversation)");
            self.handle_engine(msg).await
        }
    }

    /// Retrieval path. Pipeline failures degrade to the fixed apology with
    /// source `"error"`; the caller still gets a well-formed reply.
    pub async fn handle_rag(&self, msg: &InboundMessage) -> Result<RoutedReply, ApiError> {
        let history = match self
            .history
            .recent_turns(&msg.conversation_id, HISTORY_WINDOW)
            .await
        {
            Ok(turns) => turns,
            Err(err) => {
                tracing::warn!("Could not load conversation history: {}", err);
                Vec::new()
            }
        };

        let user_context = format!("User ID: {}", msg.user_id);
        let (text, source) = match self
            .rag
            .generate_response(&msg.text, &user_context, &history)
            .await
        {
            Ok(text) if !text.is_empty() => (text, "rag"),
            Ok(_) => {
                tracing::warn!("Model returned an empty completion");
                (FALLBACK_RESPONSE.to_string(), "error")
            }
            Err(err) => {
                tracing::warn!("Retrieval pipeline failed: {}", err);
                (FALLBACK_RESPONSE.to_string(), "error")
            }
        };

        // The model answers in English; localize for non-English users when
        // a translator is configured.
        let text = match &self.translator {
            Some(translator) => {
                translator
                    .translate(&text, Lang::En, Lang::from_code(&msg.language))
                    .await
            }
            None => text,
        };

        self.persist(msg, &text, source).await?;
        Ok(RoutedReply {
            text,
            source,
            language: msg.language.clone(),
        })
    }

    /// External-engine path. Transport failures surface as errors here, as
    /// the engine is the only system that can answer general chat.
    pub async fn handle_engine(&self, msg: &InboundMessage) -> Result<RoutedReply, ApiError> {
        let parts = self
            .engine
            .send(&msg.user_id, &msg.text, &msg.language)
            .await?;
        let text = combine_parts(&parts);

        self.persist(msg, &text, "engine").await?;
        Ok(RoutedReply {
            text,
            source: "engine",
            language: msg.language.clone(),
        })
    }

    async fn persist(&self, msg: &InboundMessage, text: &str, source: &str) -> Result<(), ApiError> {
        self.history
            .save_turn(
                &msg.user_id,
                &msg.conversation_id,
                &msg.text,
                text,
                &msg.language,
                None,
                source,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::KeywordClassifier;
    use crate::core::errors::RagError;
    use crate::embedding::HashingEmbedder;
    use crate::engine::EnginePart;
    use crate::llm::GenerativeModel;
    use async_trait::async_trait;

    struct StubEngine;

    #[async_trait]
    impl GeneralEngine for StubEngine {
        async fn send(
            &self,
            _sender: &str,
            _message: &str,
            _language: &str,
        ) -> Result<Vec<EnginePart>, ApiError> {
            Ok(vec![EnginePart {
                text: Some("Hi there!".to_string()),
            }])
        }
    }

    struct CannedModel;

    #[async_trait]
    impl GenerativeModel for CannedModel {
        async fn generate(&self, _model_id: &str, _prompt: &str) -> Result<String, RagError> {
            Ok("You can check your balance in the mobile app.".to_string())
        }
    }

    struct BrokenModel;

    #[async_trait]
    impl GenerativeModel for BrokenModel {
        async fn generate(&self, _model_id: &str, _prompt: &str) -> Result<String, RagError> {
            Err(RagError::Generation("connection refused".to_string()))
        }
    }

    async fn router_with(
        model: Arc<dyn GenerativeModel>,
        ready: bool,
        dir: &std::path::Path,
    ) -> ChatRouter {
        let rag = Arc::new(RagService::new(
            Arc::new(HashingEmbedder::default()),
            model,
            "test-model".to_string(),
            dir.join("index"),
        ));
        if ready {
            rag.ingest_text(
                "Your savings account balance can be checked via the mobile app.",
                "handbook",
            )
            .await;
            rag.rebuild().await.unwrap();
        }

        let history = HistoryStore::new(&dir.join("history.db")).await.unwrap();
        ChatRouter::new(
            rag,
            Arc::new(KeywordClassifier::new()),
            Arc::new(StubEngine),
            history,
            None,
        )
    }

    fn msg(text: &str) -> InboundMessage {
        InboundMessage {
            user_id: "u1".to_string(),
            conversation_id: "c1".to_string(),
            text: text.to_string(),
            language: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn banking_message_takes_the_rag_path() {
        let tmp = tempfile::tempdir().unwrap();
        let router = router_with(Arc::new(CannedModel), true, tmp.path()).await;

        let reply = router.handle(&msg("transfer money to my friend")).await.unwrap();
        assert_eq!(reply.source, "rag");
        assert!(!reply.text.is_empty());
    }

    #[tokio::test]
    async fn general_message_goes_to_the_engine() {
        let tmp = tempfile::tempdir().unwrap();
        let router = router_with(Arc::new(CannedModel), true, tmp.path()).await;

        let reply = router.handle(&msg("hello, how are you")).await.unwrap();
        assert_eq!(reply.source, "engine");
        assert_eq!(reply.text, "Hi there!");
    }

    #[tokio::test]
    async fn banking_message_without_index_falls_back_to_the_engine() {
        let tmp = tempfile::tempdir().unwrap();
        let router = router_with(Arc::new(CannedModel), false, tmp.path()).await;

        let reply = router.handle(&msg("what is my account balance")).await.unwrap();
        assert_eq!(reply.source, "engine");
    }

    #[tokio::test]
    async fn pipeline_failure_degrades_to_the_apology() {
        let tmp = tempfile::tempdir().unwrap();
        let router = router_with(Arc::new(BrokenModel), true, tmp.path()).await;

        let reply = router.handle(&msg("what is my account balance")).await.unwrap();
        assert_eq!(reply.source, "error");
        assert_eq!(reply.text, FALLBACK_RESPONSE);
    }

    #[tokio::test]
    async fn every_turn_is_persisted_with_its_source() {
        let tmp = tempfile::tempdir().unwrap();
        let router = router_with(Arc::new(CannedModel), true, tmp.path()).await;

        router.handle(&msg("hello, how are you")).await.unwrap();
        router.handle(&msg("check my balance please")).await.unwrap();

        let history = router.history.get_history("c1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].source, "engine");
        assert_eq!(history[1].source, "rag");
        assert_eq!(history[1].user_message, "check my balance please");
    }
}

use std::sync::Arc;
use std::time::Duration;

use crate::classify::KeywordClassifier;
use crate::core::config::{AppPaths, Settings};
use crate::embedding::{Embedder, HashingEmbedder, OllamaEmbedder};
use crate::engine::EngineClient;
use crate::history::HistoryStore;
use crate::llm::OllamaProvider;
use crate::rag::RagService;
use crate::routing::ChatRouter;
use crate::translate::{HttpTranslationBackend, Translator};

pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub history: HistoryStore,
    pub rag: Arc<RagService>,
    pub router: ChatRouter,
}

impl AppState {
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::load(&paths.config_path)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        let history = HistoryStore::new(&paths.db_path).await?;

        let embedder: Arc<dyn Embedder> = match &settings.embedding_url {
            Some(url) => Arc::new(OllamaEmbedder::new(
                url.clone(),
                settings
                    .embedding_model
                    .clone()
                    .unwrap_or_else(|| settings.model_id.clone()),
                client.clone(),
            )),
            None => Arc::new(HashingEmbedder::default()),
        };

        let model = Arc::new(OllamaProvider::new(
            settings.model_url.clone(),
            client.clone(),
        ));

        let rag = Arc::new(RagService::new(
            embedder,
            model,
            settings.model_id.clone(),
            paths.snapshot_dir.clone(),
        ));
        match rag.initialize(&paths.docs_dir).await {
            Ok(true) => tracing::info!("Retrieval pipeline ready"),
            Ok(false) => tracing::warn!("Retrieval pipeline disabled; no documents indexed"),
            Err(err) => tracing::error!("Retrieval pipeline failed to initialize: {}", err),
        }

        let engine = Arc::new(EngineClient::new(
            settings.engine_url.clone(),
            client.clone(),
        ));

        let translator = settings.translation_url.as_ref().map(|url| {
            Translator::new(Arc::new(HttpTranslationBackend::new(
                url.clone(),
                client.clone(),
            )))
        });

        let router = ChatRouter::new(
            rag.clone(),
            Arc::new(KeywordClassifier::new()),
            engine,
            history.clone(),
            translator,
        );

        Ok(Arc::new(AppState {
            paths,
            settings,
            history,
            rag,
            router,
        }))
    }
}

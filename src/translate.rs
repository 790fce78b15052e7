//! Pivot translation between supported languages.
//!
//! The translation model pairs English with each Indic language, so a
//! translation between two non-English languages runs two legs through
//! English. Failures never break a chat reply; the original text is returned
//! unchanged and the cause is logged.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::ApiError;

/// Languages the chatbot serves. Unknown codes normalize to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    En,
    Hi,
    Mr,
    Gu,
}

impl Lang {
    pub fn from_code(code: &str) -> Lang {
        match code {
            "hi" => Lang::Hi,
            "mr" => Lang::Mr,
            "gu" => Lang::Gu,
            _ => Lang::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Hi => "hi",
            Lang::Mr => "mr",
            Lang::Gu => "gu",
        }
    }

    /// Script-qualified tag used by the translation model.
    pub fn tag(&self) -> &'static str {
        match self {
            Lang::En => "eng_Latn",
            Lang::Hi => "hin_Deva",
            Lang::Mr => "mar_Deva",
            Lang::Gu => "guj_Gujr",
        }
    }
}

/// How a (source, target) pair is served by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Same,
    FromEnglish,
    ToEnglish,
    Pivot,
}

pub fn direction(src: Lang, tgt: Lang) -> Direction {
    if src == tgt {
        Direction::Same
    } else if src == Lang::En {
        Direction::FromEnglish
    } else if tgt == Lang::En {
        Direction::ToEnglish
    } else {
        Direction::Pivot
    }
}

/// One direct model leg between two language tags.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(&self, text: &str, src_tag: &str, tgt_tag: &str)
        -> Result<String, ApiError>;
}

/// Remote translation service.
pub struct HttpTranslationBackend {
    base_url: String,
    client: Client,
}

impl HttpTranslationBackend {
    pub fn new(base_url: String, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl TranslationBackend for HttpTranslationBackend {
    async fn translate(
        &self,
        text: &str,
        src_tag: &str,
        tgt_tag: &str,
    ) -> Result<String, ApiError> {
        let url = format!("{}/translate", self.base_url);
        let body = json!({
            "text": text,
            "src_lang": src_tag,
            "tgt_lang": tgt_tag,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            return Err(ApiError::Internal(format!(
                "translation service returned {}",
                res.status()
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        payload["translation"]
            .as_str()
            .map(|t| t.to_string())
            .ok_or_else(|| ApiError::Internal("missing translation field".to_string()))
    }
}

/// Orchestrates direct and pivot legs over a backend.
#[derive(Clone)]
pub struct Translator {
    backend: Arc<dyn TranslationBackend>,
}

impl Translator {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    /// Best-effort translation: any backend failure returns the input text.
    pub async fn translate(&self, text: &str, src: Lang, tgt: Lang) -> String {
        match self.try_translate(text, src, tgt).await {
            Ok(translated) => translated,
            Err(err) => {
                tracing::warn!(
                    "Translation {}->{} failed, returning original text: {}",
                    src.code(),
                    tgt.code(),
                    err
                );
                text.to_string()
            }
        }
    }

    async fn try_translate(&self, text: &str, src: Lang, tgt: Lang) -> Result<String, ApiError> {
        match direction(src, tgt) {
            Direction::Same => Ok(text.to_string()),
            Direction::FromEnglish | Direction::ToEnglish => {
                self.backend.translate(text, src.tag(), tgt.tag()).await
            }
            Direction::Pivot => {
                let english = self.backend.translate(text, src.tag(), Lang::En.tag()).await?;
                self.backend.translate(&english, Lang::En.tag(), tgt.tag()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingBackend {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TranslationBackend for RecordingBackend {
        async fn translate(
            &self,
            text: &str,
            src_tag: &str,
            tgt_tag: &str,
        ) -> Result<String, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push((src_tag.to_string(), tgt_tag.to_string()));
            Ok(format!("[{}] {}", tgt_tag, text))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl TranslationBackend for FailingBackend {
        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, ApiError> {
            Err(ApiError::ServiceUnavailable)
        }
    }

    #[test]
    fn direction_resolution() {
        assert_eq!(direction(Lang::En, Lang::En), Direction::Same);
        assert_eq!(direction(Lang::En, Lang::Hi), Direction::FromEnglish);
        assert_eq!(direction(Lang::Gu, Lang::En), Direction::ToEnglish);
        assert_eq!(direction(Lang::Mr, Lang::Gu), Direction::Pivot);
    }

    #[test]
    fn unknown_codes_default_to_english() {
        assert_eq!(Lang::from_code("fr"), Lang::En);
        assert_eq!(Lang::from_code("hi"), Lang::Hi);
    }

    #[tokio::test]
    async fn pivot_runs_two_legs_through_english() {
        let backend = Arc::new(RecordingBackend::new());
        let translator = Translator::new(backend.clone());

        let out = translator.translate("text", Lang::Mr, Lang::Gu).await;
        assert_eq!(out, "[guj_Gujr] [eng_Latn] text");

        let calls = backend.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("mar_Deva".to_string(), "eng_Latn".to_string()),
                ("eng_Latn".to_string(), "guj_Gujr".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn same_language_short_circuits() {
        let backend = Arc::new(RecordingBackend::new());
        let translator = Translator::new(backend.clone());

        let out = translator.translate("hello", Lang::En, Lang::En).await;
        assert_eq!(out, "hello");
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_returns_original_text() {
        let translator = Translator::new(Arc::new(FailingBackend));
        let out = translator.translate("नमस्ते", Lang::Hi, Lang::En).await;
        assert_eq!(out, "नमस्ते");
    }
}

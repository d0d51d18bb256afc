//! HTTP client for the remote practice collector.

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::RemoteError;
use crate::remote::{
    AnalyticsSink, MistakeApi, MistakeReport, PracticeAnalytics, SessionSaveApi,
    SessionSavePayload,
};

/// Connection settings for the remote collector.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RemoteConfig {
    /// Read configuration from `PRACTICE_API_KEY` and
    /// `PRACTICE_API_BASE_URL`. Returns `None` without a key; the client is
    /// then disabled and every call reports [`RemoteError::Disabled`].
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("PRACTICE_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("PRACTICE_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.vocabpractice.app/v1".into());
        Some(Self { base_url, api_key })
    }
}

/// Reqwest-backed implementation of all three collector endpoints.
#[derive(Clone)]
pub struct HttpPracticeClient {
    client: Client,
    config: Option<RemoteConfig>,
}

impl HttpPracticeClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(RemoteConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<RemoteConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn post<T>(&self, path: &str, payload: &T) -> Result<(), RemoteError>
    where
        T: Serialize + Sync,
    {
        let config = self.config.as_ref().ok_or(RemoteError::Disabled)?;
        let url = format!("{}/{path}", config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionSaveApi for HttpPracticeClient {
    async fn save_session(&self, payload: &SessionSavePayload) -> Result<(), RemoteError> {
        self.post("practice/sessions", payload).await
    }
}

#[async_trait]
impl MistakeApi for HttpPracticeClient {
    async fn record_mistake(&self, report: &MistakeReport) -> Result<(), RemoteError> {
        self.post("practice/mistakes", report).await
    }
}

#[async_trait]
impl AnalyticsSink for HttpPracticeClient {
    async fn record(&self, event: &PracticeAnalytics) -> Result<(), RemoteError> {
        self.post("practice/events", event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::model::{Mistake, QuestionCategory, WordlistId};

    #[tokio::test]
    async fn disabled_client_reports_disabled() {
        let client = HttpPracticeClient::new(None);
        assert!(!client.enabled());

        let mistake = Mistake {
            wordlist_id: WordlistId::new("wl-1"),
            word: "Hund".to_string(),
            translation: "dog".to_string(),
            question_type: QuestionCategory::Matching,
        };
        let report = MistakeReport::new("token".to_string(), &mistake);
        let err = client.record_mistake(&report).await.unwrap_err();
        assert!(matches!(err, RemoteError::Disabled));
    }

    #[test]
    fn reports_serialize_camel_case() {
        let mistake = Mistake {
            wordlist_id: WordlistId::new("wl-1"),
            word: "Hund".to_string(),
            translation: "dog".to_string(),
            question_type: QuestionCategory::MultipleChoice,
        };
        let report = MistakeReport::new("token".to_string(), &mistake);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"wordlistId\":\"wl-1\""));
        assert!(json.contains("\"questionType\":\"multipleChoice\""));
    }
}

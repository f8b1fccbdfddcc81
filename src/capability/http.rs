//! HTTP adapters for the speech, translation and synthesis capabilities.
//!
//! Talks to a JSON gateway that fronts the actual providers:
//!
//! - `POST {base}/transcription-jobs` → job snapshot
//! - `GET  {base}/transcription-jobs/{name}` → job snapshot
//! - `POST {base}/translate` → `{"translatedText": ...}`
//! - `POST {base}/synthesize` → raw audio bytes

use crate::capability::speech_to_text::{JobHandle, JobRequest, SpeechToText};
use crate::capability::synthesize::Synthesizer;
use crate::capability::translate::Translator;
use crate::config::ServicesSection;
use crate::error::{DubflowError, Result};
use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

const STT: &str = "speech-to-text";
const TRANSLATE: &str = "translate";
const TTS: &str = "text-to-speech";

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    text: &'a str,
    source_language_code: &'a str,
    target_language_code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    output_format: &'a str,
}

impl HttpGateway {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build a gateway from the `[services]` config section.
    pub fn from_config(services: &ServicesSection) -> Result<Self> {
        let base_url = services
            .base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| DubflowError::ConfigInvalidValue {
                key: "services.base_url".to_string(),
                message: "required to reach the speech services".to_string(),
            })?;
        Ok(Self::new(base_url, services.api_key.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(
        &self,
        service: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| DubflowError::service(service, format!("request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(DubflowError::service(
                service,
                format!("status {status}: {body}"),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl SpeechToText for HttpGateway {
    async fn start_job(&self, request: &JobRequest) -> Result<JobHandle> {
        let url = format!("{}/transcription-jobs", self.base_url);
        tracing::debug!(
            job = %request.job_name,
            uri = %request.media_uri,
            "submitting transcription job"
        );

        let response = self.send(STT, self.client.post(&url).json(request)).await?;
        response
            .json::<JobHandle>()
            .await
            .map_err(|e| DubflowError::service(STT, format!("body: {e}")))
    }

    async fn job_status(&self, job_name: &str) -> Result<JobHandle> {
        let url = format!(
            "{}/transcription-jobs/{}",
            self.base_url,
            utf8_percent_encode(job_name, NON_ALPHANUMERIC)
        );
        let response = self.send(STT, self.client.get(&url)).await?;
        response
            .json::<JobHandle>()
            .await
            .map_err(|e| DubflowError::service(STT, format!("body: {e}")))
    }
}

#[async_trait]
impl Translator for HttpGateway {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        let url = format!("{}/translate", self.base_url);
        let body = TranslateRequest {
            text,
            source_language_code: source_language,
            target_language_code: target_language,
        };

        let response = self.send(TRANSLATE, self.client.post(&url).json(&body)).await?;
        let parsed = response
            .json::<TranslateResponse>()
            .await
            .map_err(|e| DubflowError::service(TRANSLATE, format!("body: {e}")))?;

        tracing::debug!(chars = parsed.translated_text.len(), "translation received");
        Ok(parsed.translated_text)
    }
}

#[async_trait]
impl Synthesizer for HttpGateway {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        output_format: &str,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/synthesize", self.base_url);
        let body = SynthesizeRequest {
            text,
            voice_id,
            output_format,
        };

        let response = self.send(TTS, self.client.post(&url).json(&body)).await?;
        let audio = response
            .bytes()
            .await
            .map_err(|e| DubflowError::service(TTS, format!("body: {e}")))?;

        tracing::debug!(bytes = audio.len(), voice = voice_id, "speech synthesized");
        Ok(audio.to_vec())
    }
}

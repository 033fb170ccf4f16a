//! Google Gemini REST client: text generation and speech synthesis.
//!
//! Both capabilities share one `generateContent` endpoint; speech requests
//! set the response modality to `AUDIO` and name a prebuilt voice. The key
//! is sent in the `x-goog-api-key` header so it never appears in a URL or a
//! log line.
//!
//! Audio comes back as base64 inline data tagged
//! `audio/L16;codec=pcm;rate=24000`: raw 16-bit little-endian mono samples
//! with no container.

use super::{
    GenerateResponse, GenerationOptions, GenerativeModel, InlineAudio, Part, SpeechResponse,
    SpeechSynthesizer,
};
use crate::config::PipelineConfig;
use crate::error::ClientError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "gemini";

/// Public endpoint root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini client for interpretation, image text recognition and speech.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    speech_model: String,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::Request {
                service: SERVICE.to_string(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            speech_model: crate::config::DEFAULT_SPEECH_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            timeout_secs,
        })
    }

    /// Build from a pipeline config, reading the key from `config.api_key_env`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ClientError> {
        let api_key = config.api_key().ok_or_else(|| ClientError::NotConfigured {
            service: SERVICE.to_string(),
            hint: format!(
                "{} is not set. Get an API key from https://ai.google.dev/",
                config.api_key_env
            ),
        })?;
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| crate::config::DEFAULT_GEMINI_MODEL.to_string());

        Ok(Self::new(api_key, model, config.api_timeout_secs)?
            .with_speech_model(config.speech_model.clone()))
    }

    pub fn with_speech_model(mut self, model: impl Into<String>) -> Self {
        self.speech_model = model.into();
        self
    }

    /// Point the client at a different endpoint root (proxy, test server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post(&self, model: &str, body: &GeminiRequest) -> Result<GeminiResponse, ClientError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!("Gemini: POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(SERVICE, status, retry_after, body));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ClientError::MalformedResponse {
                service: SERVICE.to_string(),
                detail: e.to_string(),
            })?;

        if let Some(error) = parsed.error {
            return Err(ClientError::Api {
                service: SERVICE.to_string(),
                status: error.code.unwrap_or(200),
                message: error.message,
            });
        }

        Ok(parsed)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn generate(
        &self,
        parts: &[Part],
        options: &GenerationOptions,
    ) -> Result<GenerateResponse, ClientError> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: parts.iter().map(GeminiPart::from_part).collect(),
            }],
            generation_config: GeminiGenerationConfig {
                temperature: Some(options.temperature),
                max_output_tokens: Some(options.max_tokens),
                ..Default::default()
            },
        };

        let response = self.post(&self.model, &body).await?;
        let usage = response.usage_metadata.as_ref();
        Ok(GenerateResponse {
            input_tokens: usage.and_then(|u| u.prompt_token_count),
            output_tokens: usage.and_then(|u| u.candidates_token_count),
            text: response_text(&response),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<SpeechResponse, ClientError> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart::Text {
                    text: text.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                }),
                ..Default::default()
            },
        };

        let response = self.post(&self.speech_model, &body).await?;
        Ok(SpeechResponse {
            audio: response_audio(&response)?,
        })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

impl GeminiPart {
    fn from_part(part: &Part) -> Self {
        match part {
            Part::Text { text } => GeminiPart::Text { text: text.clone() },
            Part::Image { mime_type, data } | Part::Audio { mime_type, data } => {
                GeminiPart::InlineData {
                    inline_data: GeminiInlineData {
                        mime_type: mime_type.clone(),
                        data: STANDARD.encode(data),
                    },
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(rename = "speechConfig", skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
struct SpeechConfig {
    #[serde(rename = "voiceConfig")]
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
struct VoiceConfig {
    #[serde(rename = "prebuiltVoiceConfig")]
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
struct PrebuiltVoiceConfig {
    #[serde(rename = "voiceName")]
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<GeminiResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseInlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: String,
}

fn first_candidate_parts(response: &GeminiResponse) -> &[GeminiResponsePart] {
    response
        .candidates
        .as_deref()
        .and_then(|c| c.first())
        .and_then(|c| c.content.as_ref())
        .map(|c| c.parts.as_slice())
        .unwrap_or(&[])
}

/// Concatenate the text parts of the first candidate; `None` if there are none.
fn response_text(response: &GeminiResponse) -> Option<String> {
    let texts: Vec<&str> = first_candidate_parts(response)
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

/// Decode the first inline audio part of the first candidate.
fn response_audio(response: &GeminiResponse) -> Result<Option<InlineAudio>, ClientError> {
    let Some(inline) = first_candidate_parts(response)
        .iter()
        .find_map(|p| p.inline_data.as_ref())
    else {
        return Ok(None);
    };

    let data = STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| ClientError::MalformedResponse {
            service: SERVICE.to_string(),
            detail: format!("inline audio is not valid base64: {e}"),
        })?;

    Ok(Some(InlineAudio {
        mime_type: inline.mime_type.clone(),
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GeminiResponse {
        serde_json::from_str(json).expect("valid response json")
    }

    #[test]
    fn text_parts_are_concatenated() {
        let r = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}],
                "usageMetadata":{"promptTokenCount":12,"candidatesTokenCount":3}}"#,
        );
        assert_eq!(response_text(&r).as_deref(), Some("Hello world"));
        assert_eq!(r.usage_metadata.unwrap().prompt_token_count, Some(12));
    }

    #[test]
    fn missing_text_is_none() {
        assert_eq!(response_text(&parse(r#"{"candidates":[]}"#)), None);
        assert_eq!(response_text(&parse(r#"{"candidates":[{"content":{"parts":[]}}]}"#)), None);
        // Safety-blocked candidates come back without content.
        assert_eq!(response_text(&parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)), None);
        assert_eq!(response_text(&parse("{}")), None);
    }

    #[test]
    fn inline_audio_is_decoded() {
        let r = parse(
            r#"{"candidates":[{"content":{"parts":[
                {"inlineData":{"mimeType":"audio/L16;codec=pcm;rate=24000","data":"AAEC"}}]}}]}"#,
        );
        let audio = response_audio(&r).unwrap().unwrap();
        assert_eq!(audio.mime_type, "audio/L16;codec=pcm;rate=24000");
        assert_eq!(audio.data, vec![0, 1, 2]);
    }

    #[test]
    fn bad_base64_audio_is_malformed() {
        let r = parse(
            r#"{"candidates":[{"content":{"parts":[
                {"inlineData":{"mimeType":"audio/L16","data":"***"}}]}}]}"#,
        );
        assert!(matches!(
            response_audio(&r),
            Err(ClientError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn image_part_is_base64_inline_data() {
        let wire = GeminiPart::from_part(&Part::png(vec![0xff, 0x00]));
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["inline_data"]["data"], "/wA=");
    }

    #[test]
    fn speech_request_shape() {
        let body = GeminiGenerationConfig {
            response_modalities: Some(vec!["AUDIO".into()]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: "Kore".into(),
                    },
                },
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["responseModalities"][0], "AUDIO");
        assert_eq!(
            json["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn from_config_without_key_is_not_configured() {
        let config = PipelineConfig::builder()
            .api_key_env("LEXPLAIN_TEST_KEY_THAT_IS_NEVER_SET")
            .build()
            .unwrap();
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(ClientError::NotConfigured { .. })
        ));
    }
}

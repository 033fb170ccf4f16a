//! MyMemory translation client.
//!
//! A single GET per chunk:
//! `https://api.mymemory.translated.net/get?q=<text>&langpair=en|hi`.
//! Supplying a contact address (`de=`) raises the anonymous daily quota.
//!
//! MyMemory reports some failures with HTTP 200: `responseStatus` carries
//! the real status (as a number or a string, depending on the path taken),
//! and quota exhaustion replaces the translation with a
//! `MYMEMORY WARNING: ...` sentence. Both are mapped to errors here so the
//! translator falls back instead of showing the warning to the reader.

use super::TranslationService;
use crate::config::Language;
use crate::error::ClientError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "mymemory";

/// Public endpoint.
pub const MYMEMORY_URL: &str = "https://api.mymemory.translated.net/get";

/// HTTP client for the MyMemory translation memory.
pub struct MyMemoryTranslator {
    http: reqwest::Client,
    url: String,
    email: Option<String>,
    timeout_secs: u64,
}

impl MyMemoryTranslator {
    pub fn new(timeout_secs: u64, email: Option<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::Request {
                service: SERVICE.to_string(),
                detail: e.to_string(),
            })?;
        Ok(Self {
            http,
            url: MYMEMORY_URL.to_string(),
            email: email.filter(|e| !e.trim().is_empty()),
            timeout_secs,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl TranslationService for MyMemoryTranslator {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ClientError> {
        let langpair = format!("{}|{}", source.code(), target.code());
        let mut query: Vec<(&str, &str)> = vec![("q", text), ("langpair", &langpair)];
        if let Some(ref email) = self.email {
            query.push(("de", email));
        }

        debug!("MyMemory: {} chars {}", text.len(), langpair);

        let response = self
            .http
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, self.timeout_secs, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, self.timeout_secs, e))?;

        if !status.is_success() {
            return Err(ClientError::from_status(SERVICE, status, None, body));
        }

        parse_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: Option<ResponseData>,
    #[serde(rename = "responseStatus")]
    response_status: Option<serde_json::Value>,
    #[serde(rename = "responseDetails")]
    response_details: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

/// Interpret a MyMemory JSON body.
pub(crate) fn parse_response(body: &str) -> Result<String, ClientError> {
    let parsed: MyMemoryResponse =
        serde_json::from_str(body).map_err(|e| ClientError::MalformedResponse {
            service: SERVICE.to_string(),
            detail: e.to_string(),
        })?;

    let status = parsed
        .response_status
        .as_ref()
        .and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(200);

    if status != 200 {
        let message = parsed
            .response_details
            .as_ref()
            .and_then(|v| v.as_str())
            .unwrap_or("translation rejected")
            .to_string();
        return Err(match status {
            429 => ClientError::RateLimited {
                service: SERVICE.to_string(),
                retry_after_secs: None,
            },
            code => ClientError::Api {
                service: SERVICE.to_string(),
                status: u16::try_from(code).unwrap_or(u16::MAX),
                message,
            },
        });
    }

    let text = parsed
        .response_data
        .and_then(|d| d.translated_text)
        .ok_or_else(|| ClientError::MalformedResponse {
            service: SERVICE.to_string(),
            detail: "missing responseData.translatedText".to_string(),
        })?;

    if text.trim_start().starts_with("MYMEMORY WARNING") {
        return Err(ClientError::RateLimited {
            service: SERVICE.to_string(),
            retry_after_secs: None,
        });
    }

    Ok(unescape_entities(&text))
}

/// Undo the handful of HTML entities MyMemory leaves in translations.
fn unescape_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

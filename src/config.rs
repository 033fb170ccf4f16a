//! Configuration types for the interpretation pipeline.
//!
//! Every knob lives in [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`] and passed by reference into each stage
//! constructor. Nothing is read from process-wide state after construction;
//! credentials are looked up from the environment variable named in the
//! config, never from a literal.

use crate::client::{GenerativeModel, SpeechSynthesizer, TranslationService};
use crate::error::LexplainError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default Gemini model for interpretation and image text recognition.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default model when a named edgequake-llm provider is used.
pub const DEFAULT_PROVIDER_MODEL: &str = "gpt-4.1-nano";

/// Default Gemini speech model.
pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Default prebuilt voice.
pub const DEFAULT_VOICE: &str = "Kore";

/// Frame rate of the PCM the speech service returns, in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Environment variable holding the Gemini API key.
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for one interpretation pipeline.
///
/// # Example
/// ```rust
/// use edgequake_lexplain::{Language, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .target_language(Language::Hindi)
///     .vocalize(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Model identifier. If None, uses [`DEFAULT_GEMINI_MODEL`] for Gemini
    /// and [`DEFAULT_PROVIDER_MODEL`] for a named provider.
    pub model: Option<String>,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    /// When set, interpretation goes through that provider instead of Gemini.
    pub provider_name: Option<String>,

    /// Pre-constructed interpretation client. Takes precedence over everything else.
    pub model_client: Option<Arc<dyn GenerativeModel>>,

    /// Pre-constructed translation client. Default: MyMemory.
    pub translator: Option<Arc<dyn TranslationService>>,

    /// Pre-constructed speech client. Default: Gemini when a key is present.
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,

    /// Name of the environment variable holding the Gemini API key.
    pub api_key_env: String,

    /// Sampling temperature for interpretation. Default: 0.2.
    ///
    /// Low values keep the explanation close to the document's wording.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_tokens: usize,

    /// Language the interpretation is produced in. Default: English.
    pub source_language: Language,

    /// Language the caller wants to read. Default: English (no translation).
    pub target_language: Language,

    /// Largest piece of text, in UTF-8 bytes, sent to the translator in one
    /// request. Default: 500, MyMemory's query limit.
    pub translation_chunk_bytes: usize,

    /// Contact e-mail passed to MyMemory for the higher daily quota.
    pub translator_email: Option<String>,

    /// Run the vocalizer after translation. Default: false.
    pub vocalize: bool,

    /// Speech model identifier. Default: [`DEFAULT_SPEECH_MODEL`].
    pub speech_model: String,

    /// Prebuilt voice name. Default: [`DEFAULT_VOICE`].
    pub voice: String,

    /// PCM frame rate requested from the speech service and written to the
    /// WAV header. Default: 24 000 Hz.
    pub sample_rate: u32,

    /// Longest edge, in pixels, of an image sent for text recognition. Default: 2000.
    pub max_image_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-call timeout for every collaborator HTTP client, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Receives per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            model_client: None,
            translator: None,
            speech: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            source_language: Language::English,
            target_language: Language::English,
            translation_chunk_bytes: 500,
            translator_email: None,
            vocalize: false,
            speech_model: DEFAULT_SPEECH_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_image_pixels: 2000,
            password: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("model_client", &self.model_client.as_ref().map(|_| "<dyn GenerativeModel>"))
            .field("translator", &self.translator.as_ref().map(|_| "<dyn TranslationService>"))
            .field("speech", &self.speech.as_ref().map(|_| "<dyn SpeechSynthesizer>"))
            .field("api_key_env", &self.api_key_env)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("source_language", &self.source_language)
            .field("target_language", &self.target_language)
            .field("vocalize", &self.vocalize)
            .field("voice", &self.voice)
            .field("sample_rate", &self.sample_rate)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read the Gemini API key from the configured environment variable.
    ///
    /// Empty values count as absent.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model_client(mut self, client: Arc<dyn GenerativeModel>) -> Self {
        self.config.model_client = Some(client);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn TranslationService>) -> Self {
        self.config.translator = Some(translator);
        self
    }

    pub fn speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.config.speech = Some(speech);
        self
    }

    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.config.api_key_env = var.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn source_language(mut self, lang: Language) -> Self {
        self.config.source_language = lang;
        self
    }

    pub fn target_language(mut self, lang: Language) -> Self {
        self.config.target_language = lang;
        self
    }

    pub fn translation_chunk_bytes(mut self, n: usize) -> Self {
        self.config.translation_chunk_bytes = n;
        self
    }

    pub fn translator_email(mut self, email: impl Into<String>) -> Self {
        self.config.translator_email = Some(email.into());
        self
    }

    pub fn vocalize(mut self, v: bool) -> Self {
        self.config.vocalize = v;
        self
    }

    pub fn speech_model(mut self, model: impl Into<String>) -> Self {
        self.config.speech_model = model.into();
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.config.voice = voice.into();
        self
    }

    pub fn sample_rate(mut self, hz: u32) -> Self {
        self.config.sample_rate = hz;
        self
    }

    pub fn max_image_pixels(mut self, px: u32) -> Self {
        self.config.max_image_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, LexplainError> {
        let c = &self.config;
        if c.translation_chunk_bytes < 50 {
            return Err(LexplainError::InvalidConfig(format!(
                "Translation chunk size must be ≥ 50 bytes, got {}",
                c.translation_chunk_bytes
            )));
        }
        if !(8_000..=48_000).contains(&c.sample_rate) {
            return Err(LexplainError::InvalidConfig(format!(
                "Sample rate must be 8000–48000 Hz, got {}",
                c.sample_rate
            )));
        }
        if c.voice.trim().is_empty() {
            return Err(LexplainError::InvalidConfig("Voice name must not be empty".into()));
        }
        if c.api_key_env.trim().is_empty() {
            return Err(LexplainError::InvalidConfig(
                "API key variable name must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(LexplainError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Languages ────────────────────────────────────────────────────────────

/// Languages a reader can pick for the explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Kannada,
    Malayalam,
    Tamil,
    Telugu,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::Hindi,
        Language::Kannada,
        Language::Malayalam,
        Language::Tamil,
        Language::Telugu,
    ];

    /// ISO 639-1 code, as sent to translation services.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Kannada => "kn",
            Language::Malayalam => "ml",
            Language::Tamil => "ta",
            Language::Telugu => "te",
        }
    }

    /// English display name.
    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Kannada => "Kannada",
            Language::Malayalam => "Malayalam",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = LexplainError;

    /// Accepts a display name or an ISO code, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(wanted) || l.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                LexplainError::InvalidConfig(format!(
                    "Unsupported language '{}'. Choose one of: {}",
                    s,
                    Language::ALL.map(|l| l.name()).join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.target_language, Language::English);
        assert_eq!(c.sample_rate, 24_000);
        assert_eq!(c.voice, "Kore");
        assert_eq!(c.api_key_env, "GEMINI_API_KEY");
        assert!(!c.vocalize);
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = PipelineConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_tiny_chunks() {
        let err = PipelineConfig::builder()
            .translation_chunk_bytes(10)
            .build()
            .unwrap_err();
        assert!(matches!(err, LexplainError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_odd_sample_rate() {
        assert!(PipelineConfig::builder().sample_rate(1).build().is_err());
        assert!(PipelineConfig::builder().sample_rate(16_000).build().is_ok());
    }

    #[test]
    fn debug_redacts_password() {
        let c = PipelineConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn language_parses_names_and_codes() {
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert_eq!("tamil".parse::<Language>().unwrap(), Language::Tamil);
        assert_eq!("KN".parse::<Language>().unwrap(), Language::Kannada);
        assert!("Klingon".parse::<Language>().is_err());
    }

    #[test]
    fn language_codes_are_unique() {
        let mut codes: Vec<_> = Language::ALL.iter().map(|l| l.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Language::ALL.len());
    }
}

//! Vocalization: final text → self-contained WAV file.
//!
//! The speech service returns bare 16-bit little-endian PCM with no
//! container, described only by its MIME type
//! (`audio/L16;codec=pcm;rate=24000`). Browsers and media players need a
//! RIFF/WAVE header, so the samples are framed with `hound`: one channel,
//! two bytes per sample, the configured frame rate, and a data chunk whose
//! length equals the PCM byte count.
//!
//! Every malformed response fails immediately; nothing is resampled or
//! guessed.

use crate::client::SpeechSynthesizer;
use crate::config::PipelineConfig;
use crate::error::AudioGenerationError;
use crate::output::AudioArtifact;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info};

/// Produces an [`AudioArtifact`] from text.
pub struct Vocalizer {
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    voice: String,
    sample_rate: u32,
}

impl Vocalizer {
    /// `speech` is `None` when no speech service is configured; every call
    /// then fails with [`AudioGenerationError::NotConfigured`].
    pub fn new(speech: Option<Arc<dyn SpeechSynthesizer>>, config: &PipelineConfig) -> Self {
        Self {
            speech,
            voice: config.voice.clone(),
            sample_rate: config.sample_rate,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.speech.is_some()
    }

    pub async fn vocalize(&self, text: &str) -> Result<AudioArtifact, AudioGenerationError> {
        let speech = self
            .speech
            .as_ref()
            .ok_or_else(|| AudioGenerationError::NotConfigured {
                hint: "set GEMINI_API_KEY or supply a speech client".to_string(),
            })?;

        if text.trim().is_empty() {
            return Err(AudioGenerationError::EmptyText);
        }

        debug!("{}: synthesizing {} chars with voice {}", speech.name(), text.len(), self.voice);
        let response = speech.synthesize(text, &self.voice).await?;
        let audio = response.audio.ok_or(AudioGenerationError::NoAudioPayload)?;

        check_pcm_mime(&audio.mime_type, self.sample_rate)?;
        let artifact = frame_wav(&audio.data, self.sample_rate)?;

        info!(
            "Audio: {} samples, {:.1}s at {} Hz",
            artifact.sample_count,
            artifact.duration().as_secs_f64(),
            artifact.sample_rate
        );
        Ok(artifact)
    }
}

/// Accept `audio/L16` or `audio/pcm`; a `rate=` parameter must match `expected_rate`.
pub fn check_pcm_mime(mime_type: &str, expected_rate: u32) -> Result<(), AudioGenerationError> {
    let unexpected = || AudioGenerationError::UnexpectedEncoding {
        mime_type: mime_type.to_string(),
        expected_rate,
    };

    let mut parts = mime_type.split(';').map(str::trim);
    let essence = parts.next().unwrap_or("").to_ascii_lowercase();
    if essence != "audio/l16" && essence != "audio/pcm" {
        return Err(unexpected());
    }

    for param in parts {
        if let Some((key, value)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("rate") {
                let rate: u32 = value.trim().parse().map_err(|_| unexpected())?;
                if rate != expected_rate {
                    return Err(unexpected());
                }
            }
        }
    }
    Ok(())
}

/// Wrap 16-bit little-endian mono PCM in a WAV container.
pub fn frame_wav(pcm: &[u8], sample_rate: u32) -> Result<AudioArtifact, AudioGenerationError> {
    if pcm.is_empty() {
        return Err(AudioGenerationError::NoAudioPayload);
    }
    if pcm.len() % 2 != 0 {
        return Err(AudioGenerationError::OddSampleBuffer { len: pcm.len() });
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let framing = |e: hound::Error| AudioGenerationError::Framing {
        detail: e.to_string(),
    };

    let mut wav = Vec::with_capacity(pcm.len() + 44);
    let mut writer = hound::WavWriter::new(Cursor::new(&mut wav), spec).map_err(framing)?;
    for sample in pcm.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
            .map_err(framing)?;
    }
    writer.finalize().map_err(framing)?;

    Ok(AudioArtifact {
        wav,
        sample_rate,
        channels: 1,
        sample_count: pcm.len() / 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk the RIFF chunks and return (fmt body, data body).
    fn chunks(wav: &[u8]) -> (Vec<u8>, Vec<u8>) {
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        let riff_len = u32::from_le_bytes(wav[4..8].try_into().unwrap()) as usize;
        assert_eq!(riff_len + 8, wav.len());

        let (mut fmt, mut data) = (None, None);
        let mut pos = 12;
        while pos + 8 <= wav.len() {
            let id = &wav[pos..pos + 4];
            let len = u32::from_le_bytes(wav[pos + 4..pos + 8].try_into().unwrap()) as usize;
            let body = wav[pos + 8..pos + 8 + len].to_vec();
            match id {
                b"fmt " => fmt = Some(body),
                b"data" => data = Some(body),
                _ => {}
            }
            pos += 8 + len + (len % 2);
        }
        (fmt.expect("fmt chunk"), data.expect("data chunk"))
    }

    #[test]
    fn header_matches_pcm_buffer() {
        let pcm: Vec<u8> = (0..480u16).flat_map(|s| s.to_le_bytes()).collect();
        let artifact = frame_wav(&pcm, 24_000).unwrap();
        let (fmt, data) = chunks(&artifact.wav);

        let channels = u16::from_le_bytes([fmt[2], fmt[3]]);
        let rate = u32::from_le_bytes(fmt[4..8].try_into().unwrap());
        let block_align = u16::from_le_bytes([fmt[12], fmt[13]]);
        let bits = u16::from_le_bytes([fmt[14], fmt[15]]);
        assert_eq!(channels, 1);
        assert_eq!(rate, 24_000);
        assert_eq!(block_align, 2);
        assert_eq!(bits, 16);
        assert_eq!(data, pcm);

        assert_eq!(artifact.sample_count, 480);
        assert_eq!(artifact.duration().as_millis(), 20);
    }

    #[test]
    fn hound_reads_back_the_samples() {
        let samples = [0i16, 1, -1, i16::MAX, i16::MIN];
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let artifact = frame_wav(&pcm, 16_000).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(artifact.wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);
        let back: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(back, samples);
    }

    #[test]
    fn odd_buffer_is_rejected() {
        assert_eq!(
            frame_wav(&[0, 1, 2], 24_000).unwrap_err(),
            AudioGenerationError::OddSampleBuffer { len: 3 }
        );
    }

    #[test]
    fn empty_buffer_is_no_payload() {
        assert_eq!(
            frame_wav(&[], 24_000).unwrap_err(),
            AudioGenerationError::NoAudioPayload
        );
    }

    #[test]
    fn pcm_mime_types() {
        assert!(check_pcm_mime("audio/L16;codec=pcm;rate=24000", 24_000).is_ok());
        assert!(check_pcm_mime("audio/pcm", 24_000).is_ok());
        assert!(check_pcm_mime("audio/l16; rate=24000", 24_000).is_ok());
        assert!(check_pcm_mime("audio/L16;codec=pcm;rate=16000", 24_000).is_err());
        assert!(check_pcm_mime("audio/mpeg", 24_000).is_err());
        assert!(check_pcm_mime("audio/L16;rate=fast", 24_000).is_err());
    }

    #[tokio::test]
    async fn unconfigured_vocalizer_fails() {
        let v = Vocalizer::new(None, &PipelineConfig::default());
        assert!(!v.is_configured());
        assert!(matches!(
            v.vocalize("hello").await,
            Err(AudioGenerationError::NotConfigured { .. })
        ));
    }
}

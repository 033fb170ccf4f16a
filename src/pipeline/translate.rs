//! Translation: fail-soft rewrite of the interpretation into the reader's language.
//!
//! Translation never fails a request. Any collaborator error, a blank
//! translated chunk, or a quota warning is logged at `warn` and the original
//! text is returned as [`Translation::Fallback`]. There is no partial
//! result: if one chunk fails, the whole output is the original.
//!
//! ## Chunking
//!
//! Free translation tiers cap the query length in bytes (MyMemory: 500).
//! Text is split at paragraph breaks first, then at whitespace inside an
//! oversized paragraph, and only cut mid-word when a single word exceeds the
//! limit. The separators between chunks are kept verbatim and re-inserted,
//! so the translated text keeps the original layout. Chunks never start or
//! end with whitespace and are never blank.

use crate::client::TranslationService;
use crate::config::{Language, PipelineConfig};
use crate::error::ClientError;
use crate::output::Translation;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fail-soft wrapper around a [`TranslationService`].
pub struct Translator {
    service: Arc<dyn TranslationService>,
    chunk_bytes: usize,
}

impl Translator {
    pub fn new(service: Arc<dyn TranslationService>, config: &PipelineConfig) -> Self {
        Self {
            service,
            chunk_bytes: config.translation_chunk_bytes,
        }
    }

    pub async fn translate(&self, text: &str, source: Language, target: Language) -> Translation {
        if source == target || text.trim().is_empty() {
            debug!("Translation skipped ({} → {})", source, target);
            return Translation::Unchanged {
                text: text.to_string(),
            };
        }

        match self.translate_chunks(text, source, target).await {
            Ok(translated) => {
                info!("Translated {} chars {} → {}", text.len(), source, target);
                Translation::Translated {
                    text: translated,
                    target,
                }
            }
            Err(e) => {
                warn!("Translation to {} failed, keeping original text: {}", target, e);
                Translation::Fallback {
                    text: text.to_string(),
                    suppressed: e,
                }
            }
        }
    }

    async fn translate_chunks(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ClientError> {
        let segments = split_segments(text, self.chunk_bytes);
        let chunk_count = segments.iter().filter(|s| matches!(s, Segment::Text(_))).count();
        debug!("Translating in {} chunk(s)", chunk_count);

        let mut out = String::with_capacity(text.len() * 2);
        for segment in &segments {
            match segment {
                Segment::Separator(sep) => out.push_str(sep),
                Segment::Text(chunk) => {
                    let translated = self.service.translate(chunk, source, target).await?;
                    if translated.trim().is_empty() {
                        return Err(ClientError::MalformedResponse {
                            service: self.service.name().to_string(),
                            detail: "blank translation".to_string(),
                        });
                    }
                    out.push_str(&translated);
                }
            }
        }
        Ok(out)
    }
}

// ── Chunking ─────────────────────────────────────────────────────────────

/// A piece of the input: either text to translate or a separator kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Separator(String),
}

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n\s*").unwrap());

/// Split `text` into translatable chunks of at most `max_bytes` UTF-8 bytes,
/// interleaved with the separators that stood between them.
///
/// Concatenating every segment reproduces `text` exactly. `Text` segments
/// are never blank and carry no leading or trailing whitespace. A chunk only
/// exceeds `max_bytes` when it is a single character wider than the limit.
pub fn split_segments(text: &str, max_bytes: usize) -> Vec<Segment> {
    let max_bytes = max_bytes.max(1);
    let mut segments = Vec::new();

    let body = text.trim();
    let lead = &text[..text.len() - text.trim_start().len()];
    let tail = &text[lead.len() + body.len()..];
    if !lead.is_empty() {
        segments.push(Segment::Separator(lead.to_string()));
    }

    // Each atom is (separator before it, trimmed text).
    let mut atoms: Vec<(&str, &str)> = Vec::new();
    let mut sep_before = "";
    let mut start = 0;
    let breaks = RE_PARAGRAPH_BREAK
        .find_iter(body)
        .map(|m| (m.start(), m.end()))
        .chain(std::iter::once((body.len(), body.len())));
    for (brk_start, brk_end) in breaks {
        let paragraph = body[start..brk_start].trim_end();
        for (piece, after) in split_long(paragraph, max_bytes) {
            atoms.push((sep_before, piece));
            sep_before = after;
        }
        // Trailing whitespace of the paragraph joins the break after it.
        sep_before = &body[start + paragraph.len()..brk_end];
        start = brk_end;
    }

    let mut current = String::new();
    for (i, (sep, atom)) in atoms.into_iter().enumerate() {
        if i == 0 {
            current.push_str(atom);
        } else if current.len() + sep.len() + atom.len() <= max_bytes {
            current.push_str(sep);
            current.push_str(atom);
        } else {
            segments.push(Segment::Text(std::mem::take(&mut current)));
            segments.push(Segment::Separator(sep.to_string()));
            current.push_str(atom);
        }
    }

    if !current.is_empty() {
        segments.push(Segment::Text(current));
    }
    if !tail.is_empty() {
        segments.push(Segment::Separator(tail.to_string()));
    }
    segments
}

/// Split one trimmed paragraph into pieces of at most `max_bytes`, each
/// paired with the whitespace that follows it (empty after the last piece
/// and after a hard cut).
///
/// Cuts at the last whitespace within the limit; hard-cuts on a character
/// boundary when a word is longer than the limit.
fn split_long(paragraph: &str, max_bytes: usize) -> Vec<(&str, &str)> {
    let mut pieces = Vec::new();
    let mut rest = paragraph;

    while rest.len() > max_bytes {
        // Largest char boundary within the limit, but at least one character.
        let mut limit = max_bytes;
        while !rest.is_char_boundary(limit) {
            limit -= 1;
        }
        if limit == 0 {
            limit = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        if limit >= rest.len() {
            break;
        }

        // Last whitespace starting at or before the limit, past the first char.
        let cut = rest
            .char_indices()
            .take_while(|&(i, _)| i <= limit)
            .filter(|&(i, c)| i > 0 && c.is_whitespace())
            .last()
            .map(|(i, _)| i);

        match cut {
            Some(at) => {
                let head = rest[..at].trim_end();
                let after = &rest[head.len()..];
                let next = after.trim_start();
                pieces.push((head, &after[..after.len() - next.len()]));
                rest = next;
            }
            None => {
                pieces.push((&rest[..limit], ""));
                rest = &rest[limit..];
            }
        }
    }

    if !rest.is_empty() {
        pieces.push((rest, ""));
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rejoin(segments: &[Segment]) -> String {
        segments
            .iter()
            .map(|s| match s {
                Segment::Text(t) | Segment::Separator(t) => t.as_str(),
            })
            .collect()
    }

    fn texts(segments: &[Segment]) -> Vec<&str> {
        segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some(t.as_str()),
                Segment::Separator(_) => None,
            })
            .collect()
    }

    fn assert_well_formed(text: &str, max: usize) {
        let segs = split_segments(text, max);
        assert_eq!(rejoin(&segs), text, "rejoin mismatch for {text:?} (max {max})");
        for t in texts(&segs) {
            assert!(!t.trim().is_empty(), "blank chunk {t:?} in {text:?} (max {max})");
            assert_eq!(t, t.trim(), "chunk {t:?} carries edge whitespace");
            assert!(
                t.len() <= max || t.chars().count() == 1,
                "chunk {t:?} over {max} bytes"
            );
        }
    }

    #[test]
    fn short_text_is_one_chunk() {
        let segs = split_segments("Rent is due monthly.", 500);
        assert_eq!(segs, vec![Segment::Text("Rent is due monthly.".into())]);
    }

    #[test]
    fn paragraphs_are_packed_up_to_limit() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        let segs = split_segments(text, 10);
        assert_eq!(texts(&segs), vec!["aaaa\n\nbbbb", "cccc"]);
        assert_eq!(rejoin(&segs), text);
    }

    #[test]
    fn long_paragraph_splits_at_whitespace() {
        let text = "one two three four five";
        let segs = split_segments(text, 9);
        for t in texts(&segs) {
            assert!(t.len() <= 9, "chunk too long: {t:?}");
        }
        assert_eq!(rejoin(&segs), text);
    }

    #[test]
    fn long_word_is_hard_cut() {
        let text = "abcdefghij";
        let segs = split_segments(text, 4);
        assert_eq!(texts(&segs), vec!["abcd", "efgh", "ij"]);
        assert_eq!(rejoin(&segs), text);
    }

    #[test]
    fn limit_counts_utf8_bytes() {
        // Each Devanagari letter is three bytes.
        let text = "किरायेदार हर महीने किराया देगा";
        let segs = split_segments(text, 24);
        for t in texts(&segs) {
            assert!(t.len() <= 24, "chunk over 24 bytes: {t:?}");
        }
        assert_eq!(rejoin(&segs), text);
        assert!(texts(&segs).len() > 1);
    }

    #[test]
    fn character_wider_than_limit_is_kept_whole() {
        assert_well_formed("कख", 2);
        assert_eq!(texts(&split_segments("कख", 2)), vec!["क", "ख"]);
    }

    #[test]
    fn surrounding_whitespace_is_preserved() {
        let text = "\n  Obligations\n\n- Pay rent\n";
        assert_eq!(rejoin(&split_segments(text, 12)), text);
    }

    #[test]
    fn trailing_spaces_before_paragraph_break_keep_the_break() {
        let segs = split_segments("aaaa   \n\nb", 5);
        assert_eq!(
            segs,
            vec![
                Segment::Text("aaaa".into()),
                Segment::Separator("   \n\n".into()),
                Segment::Text("b".into()),
            ]
        );
    }

    #[test]
    fn oversized_paragraph_with_trailing_spaces_keeps_the_break() {
        let paragraph = "x".repeat(500);
        let text = format!("{paragraph}   \n\nNext clause.");
        let segs = split_segments(&text, 500);
        assert_eq!(rejoin(&segs), text);
        assert!(segs.contains(&Segment::Separator("   \n\n".into())));
        assert_eq!(texts(&segs), vec![paragraph.as_str(), "Next clause."]);
    }

    #[test]
    fn hard_cut_before_spaces_leaves_no_blank_chunk() {
        assert_well_formed("abcde   fg", 5);
        assert_well_formed("abcde \t \n\n  f", 3);
    }

    #[test]
    fn every_chunk_respects_limit_on_mixed_input() {
        let text = "Short.\n\nA considerably longer paragraph that must be broken up.\n\nEnd.";
        assert_well_formed(text, 20);
    }

    #[test]
    fn generated_inputs_rejoin_without_blank_chunks() {
        const ALPHABET: [&str; 8] = ["a", "bb", " ", "  ", "\n", "\t", "é", "क"];
        // Small linear congruential generator: deterministic inputs, no extra deps.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 33) as usize
        };

        for _ in 0..20_000 {
            let len = next() % 24;
            let text: String = (0..len).map(|_| ALPHABET[next() % ALPHABET.len()]).collect();
            let max = 3 + next() % 10;
            assert_well_formed(&text, max);
        }
    }

    // ── Translator ───────────────────────────────────────────────────────

    /// Answers with a fixed reply for call `k` (1-based) and echoes otherwise.
    struct ScriptedService {
        calls: AtomicUsize,
        on_call: usize,
        reply: Result<String, ClientError>,
    }

    impl ScriptedService {
        fn new(on_call: usize, reply: Result<String, ClientError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                on_call,
                reply,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranslationService for ScriptedService {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn translate(
            &self,
            text: &str,
            _source: Language,
            _target: Language,
        ) -> Result<String, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.on_call {
                return self.reply.clone();
            }
            Ok(format!("<{text}>"))
        }
    }

    fn translator(service: Arc<ScriptedService>) -> Translator {
        let config = PipelineConfig::builder()
            .translation_chunk_bytes(50)
            .build()
            .unwrap();
        Translator::new(service, &config)
    }

    const THREE_PARAGRAPHS: &str = "The tenant pays rent on the fifth of each month.\n\n\
        A late fee applies after seven days.\n\n\
        Either party may end the lease on notice.";

    #[tokio::test]
    async fn every_chunk_is_translated_and_rejoined() {
        let service = ScriptedService::new(0, Ok(String::new()));
        let result = translator(service.clone())
            .translate(THREE_PARAGRAPHS, Language::English, Language::Hindi)
            .await;
        assert_eq!(service.calls(), 3);
        assert_eq!(
            result.text(),
            "<The tenant pays rent on the fifth of each month.>\n\n\
             <A late fee applies after seven days.>\n\n\
             <Either party may end the lease on notice.>"
        );
    }

    #[tokio::test]
    async fn failure_on_a_later_chunk_discards_earlier_ones() {
        let err = ClientError::Timeout {
            service: "scripted".into(),
            secs: 60,
        };
        let service = ScriptedService::new(2, Err(err.clone()));
        let result = translator(service.clone())
            .translate(THREE_PARAGRAPHS, Language::English, Language::Tamil)
            .await;
        assert_eq!(service.calls(), 2);
        assert_eq!(
            result,
            Translation::Fallback {
                text: THREE_PARAGRAPHS.to_string(),
                suppressed: err,
            }
        );
    }

    #[tokio::test]
    async fn blank_chunk_reply_falls_back() {
        let service = ScriptedService::new(2, Ok("  ".into()));
        let result = translator(service.clone())
            .translate(THREE_PARAGRAPHS, Language::English, Language::Telugu)
            .await;
        assert_eq!(service.calls(), 2);
        assert_eq!(result.text(), THREE_PARAGRAPHS);
        assert!(matches!(
            result,
            Translation::Fallback {
                suppressed: ClientError::MalformedResponse { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn quota_warning_reply_falls_back() {
        // The MyMemory client turns its quota warning into RateLimited.
        let body = r#"{"responseData":{"translatedText":"MYMEMORY WARNING: YOU USED ALL AVAILABLE FREE TRANSLATIONS FOR TODAY."},"responseStatus":200}"#;
        let err = crate::client::mymemory::parse_response(body).unwrap_err();
        assert!(matches!(err, ClientError::RateLimited { .. }), "{err:?}");

        let service = ScriptedService::new(1, Err(err));
        let result = translator(service.clone())
            .translate(THREE_PARAGRAPHS, Language::English, Language::Kannada)
            .await;
        assert_eq!(service.calls(), 1);
        assert!(result.is_fallback());
        assert_eq!(result.text(), THREE_PARAGRAPHS);
    }

    #[tokio::test]
    async fn same_language_never_calls_service() {
        let service = ScriptedService::new(0, Ok(String::new()));
        let result = translator(service.clone())
            .translate(THREE_PARAGRAPHS, Language::Hindi, Language::Hindi)
            .await;
        assert_eq!(service.calls(), 0);
        assert!(matches!(result, Translation::Unchanged { .. }));
    }
}

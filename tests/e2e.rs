//! End-to-end integration tests for edgequake-lexplain.
//!
//! These tests make live calls to the interpretation, translation and speech
//! services. They are gated behind the `E2E_ENABLED` environment variable so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 GEMINI_API_KEY=... cargo test --test e2e -- --nocapture
//!
//! PDF cases additionally need a document at `LEXPLAIN_E2E_PDF`.

use edgequake_lexplain::{
    explain, explain_to_file, AudioOutcome, Language, PipelineConfig, PipelineOutcome, Session,
    Translation, UploadedArtifact,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set and a model key is available.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if std::env::var("GEMINI_API_KEY").map_or(true, |k| k.trim().is_empty()) {
            println!("SKIP: GEMINI_API_KEY is not set");
            return;
        }
    }};
}

const LEASE: &str = "RESIDENTIAL LEASE AGREEMENT\n\n\
1. The Tenant shall pay a monthly rent of Rs. 15,000 on or before the 5th day of each month.\n\n\
2. A late fee of Rs. 500 shall be charged for every week the rent remains unpaid.\n\n\
3. Either party may terminate this agreement by giving sixty (60) days' written notice.\n\n\
4. The Landlord may enter the premises for inspection after giving 24 hours' notice.";

fn write_lease(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("lease.txt");
    std::fs::write(&path, LEASE).unwrap();
    path
}

/// Checks that hold for every explanation regardless of wording.
fn assert_explanation_quality(text: &str, context: &str) {
    assert!(!text.trim().is_empty(), "[{context}] Explanation is empty");

    let first_line = text.lines().next().unwrap_or("");
    assert!(
        !first_line.starts_with("```"),
        "[{context}] Output must not start with a code fence, got: {first_line:?}"
    );

    assert!(
        !text.contains("\n\n\n"),
        "[{context}] Output has more than one consecutive blank line"
    );

    let invisible = ['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'];
    for ch in invisible {
        assert!(
            !text.contains(ch),
            "[{context}] Output contains invisible char U+{:04X}",
            ch as u32
        );
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_text_lease_english() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_lease(&dir);

    let config = PipelineConfig::default();
    let outcome = explain(path.to_string_lossy(), None, &config)
        .await
        .expect("explain failed");
    let output = outcome.output().expect("lease has readable text");

    assert_explanation_quality(output.final_text(), "lease/en");
    assert!(matches!(output.translation, Translation::Unchanged { .. }));
    let lower = output.final_text().to_lowercase();
    assert!(lower.contains("rent"), "explanation should mention rent");
    println!("{}", output.final_text());
}

#[tokio::test]
async fn e2e_question_is_answered_from_document() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_lease(&dir);

    let outcome = explain(
        path.to_string_lossy(),
        Some("How much notice is needed to end the lease?"),
        &PipelineConfig::default(),
    )
    .await
    .expect("explain failed");
    let output = outcome.output().unwrap();

    assert_explanation_quality(output.final_text(), "lease/question");
    assert!(
        output.final_text().contains("60") || output.final_text().to_lowercase().contains("sixty"),
        "answer should cite the notice period"
    );
}

#[tokio::test]
async fn e2e_translate_to_hindi() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("lease.hi.txt");

    let config = PipelineConfig::builder()
        .target_language(Language::Hindi)
        .build()
        .unwrap();
    let outcome = explain_to_file(
        write_lease(&dir).to_string_lossy(),
        &out_path,
        None,
        &config,
    )
    .await
    .expect("explain_to_file failed");
    let output = outcome.output().unwrap();

    // The free translation tier can be exhausted; fallback is a valid result.
    match &output.translation {
        Translation::Translated { text, .. } => {
            assert!(
                text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)),
                "Hindi output should contain Devanagari"
            );
        }
        Translation::Fallback { suppressed, .. } => {
            println!("translation unavailable: {suppressed}");
        }
        Translation::Unchanged { .. } => panic!("Hindi target must not be unchanged"),
    }

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written.trim_end(), output.final_text().trim_end());
    assert!(written.ends_with('\n'));
}

#[tokio::test]
async fn e2e_session_vocalizes_last_result() {
    e2e_skip_unless_ready!();

    let mut session = Session::from_config(&PipelineConfig::default()).unwrap();
    let artifact = UploadedArtifact::new(LEASE.as_bytes().to_vec(), edgequake_lexplain::MediaKind::PlainText);
    let outcome = session.submit(&artifact, None).await.expect("submit failed");
    assert!(matches!(outcome, PipelineOutcome::Interpreted(_)));

    let audio = session.vocalize_last().await.expect("vocalize failed");
    assert_eq!(&audio.bytes()[0..4], b"RIFF");
    assert_eq!(audio.channels, 1);
    assert!(audio.duration().as_secs_f64() > 1.0);
    assert!(matches!(session.last().unwrap().audio, AudioOutcome::Generated(_)));

    let dir = tempfile::tempdir().unwrap();
    let wav_path = dir.path().join("lease.wav");
    edgequake_lexplain::write_audio(&audio, &wav_path).await.unwrap();
    let reader = hound::WavReader::open(&wav_path).unwrap();
    assert_eq!(reader.spec().sample_rate, 24_000);
}

#[tokio::test]
async fn e2e_pdf_document() {
    e2e_skip_unless_ready!();
    let Some(pdf) = std::env::var_os("LEXPLAIN_E2E_PDF").map(PathBuf::from) else {
        println!("SKIP: set LEXPLAIN_E2E_PDF to a PDF path");
        return;
    };
    if !pdf.exists() {
        println!("SKIP: test file not found: {}", pdf.display());
        return;
    }

    let outcome = explain(pdf.to_string_lossy(), None, &PipelineConfig::default())
        .await
        .expect("explain failed");
    match outcome {
        PipelineOutcome::Interpreted(output) => {
            assert_explanation_quality(output.final_text(), "pdf");
            assert!(output.extracted.page_count.unwrap_or(0) >= 1);
        }
        PipelineOutcome::NoReadableText { kind } => {
            println!("{} has no text layer ({kind})", pdf.display());
        }
    }
}

//! Input resolution: turn a user-supplied path or URL into an [`UploadedArtifact`].
//!
//! The media kind is taken from the file extension (or the response
//! `Content-Type` for URLs) and falls back to sniffing the leading bytes,
//! so `lexplain scan` and `lexplain https://host/download?id=7` both work.

use crate::artifact::{MediaKind, UploadedArtifact};
use crate::error::LexplainError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory artifact.
///
/// If the input is a URL, download it. If the input is a local file,
/// read it after checking it exists and is readable.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<UploadedArtifact, LexplainError> {
    if input.trim().is_empty() {
        return Err(LexplainError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input)).await
    }
}

async fn resolve_local(path: &Path) -> Result<UploadedArtifact, LexplainError> {
    if !path.exists() {
        return Err(LexplainError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => LexplainError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => LexplainError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let artifact = UploadedArtifact::from_file_name(bytes, name)?;
    debug!(
        "Resolved local {} ({} bytes): {}",
        artifact.kind(),
        artifact.len(),
        path.display()
    );
    Ok(artifact)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedArtifact, LexplainError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LexplainError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let download_error = |e: reqwest::Error| {
        if e.is_timeout() {
            LexplainError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            LexplainError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(download_error)?;

    if !response.status().is_success() {
        return Err(LexplainError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let filename = extract_filename(url);

    let bytes = response.bytes().await.map_err(download_error)?.to_vec();
    info!("Downloaded {} bytes", bytes.len());

    let kind = content_type
        .as_deref()
        .and_then(MediaKind::from_mime)
        .or_else(|| filename.as_deref().and_then(MediaKind::from_file_name))
        .or_else(|| MediaKind::sniff(&bytes));

    let artifact = match kind {
        Some(kind) => UploadedArtifact::new(bytes, kind),
        None => UploadedArtifact::sniff(bytes)?,
    };
    Ok(match filename {
        Some(name) => artifact.with_name(name),
        None => artifact,
    })
}

/// Last path segment of a URL, when it looks like a file name.
fn extract_filename(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty() && last.contains('.')).then(|| last.to_string())
}

/// Path to write the text result to when the caller only named a directory.
pub fn default_output_path(input: &str, extension: &str) -> PathBuf {
    let stem = if is_url(input) {
        extract_filename(input)
            .and_then(|n| n.rsplit_once('.').map(|(s, _)| s.to_string()))
            .unwrap_or_else(|| "document".to_string())
    } else {
        Path::new(input)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string())
    };
    PathBuf::from(format!("{stem}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url() {
        assert_eq!(
            extract_filename("https://host/files/lease.pdf?x=1").as_deref(),
            Some("lease.pdf")
        );
        assert_eq!(extract_filename("https://host/download"), None);
    }

    #[test]
    fn output_path_uses_input_stem() {
        assert_eq!(default_output_path("/tmp/lease.pdf", "txt"), PathBuf::from("lease.txt"));
        assert_eq!(
            default_output_path("https://host/a/notice.png", "wav"),
            PathBuf::from("notice.wav")
        );
        assert_eq!(default_output_path("https://host/", "txt"), PathBuf::from("document.txt"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/no/such/lease.pdf", 5).await.unwrap_err();
        assert!(matches!(err, LexplainError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_input("  ", 5).await.unwrap_err();
        assert!(matches!(err, LexplainError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn local_text_file_is_plain_text() {
        let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        f.write_all(b"Clause 1. The tenant pays rent.").unwrap();
        let artifact = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(artifact.kind(), MediaKind::PlainText);
        assert!(artifact.name().unwrap().ends_with(".txt"));
    }

    #[tokio::test]
    async fn extensionless_pdf_is_sniffed() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.4\n").unwrap();
        let artifact = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(artifact.kind(), MediaKind::Pdf);
    }
}

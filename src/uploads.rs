//! Health-document file storage.
//!
//! Uploaded PDFs are staged through a temp file in the uploads directory
//! and persisted under `<millis>-<sanitized original name>`, so a failed
//! write never leaves a partial document behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

/// Upload size cap: 10 MB.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Errors from document storage.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to store document: {0}")]
    Io(String),
}

/// Whether the upload looks like a PDF, by declared content type or by
/// file extension.
pub fn is_pdf(filename: &str, content_type: Option<&str>) -> bool {
    if content_type == Some("application/pdf") {
        return true;
    }
    mime_guess::from_path(filename)
        .first()
        .map(|mime| mime == mime_guess::mime::APPLICATION_PDF)
        .unwrap_or(false)
}

/// Write the document to the uploads directory. Returns the stored
/// filename (relative to the uploads directory).
pub fn store_document(
    uploads_dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> Result<String, UploadError> {
    std::fs::create_dir_all(uploads_dir).map_err(|e| UploadError::Io(e.to_string()))?;

    let stored_name = format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        sanitize_filename(original_name)
    );

    let mut staged = tempfile::NamedTempFile::new_in(uploads_dir)
        .map_err(|e| UploadError::Io(e.to_string()))?;
    staged
        .write_all(bytes)
        .map_err(|e| UploadError::Io(e.to_string()))?;
    staged
        .persist(uploads_dir.join(&stored_name))
        .map_err(|e| UploadError::Io(e.to_string()))?;

    Ok(stored_name)
}

/// Remove a stored document. Missing files are not an error; the DB
/// entry is the source of truth and the file may already be gone.
pub fn remove_document(uploads_dir: &Path, stored_name: &str) {
    let path = document_path(uploads_dir, stored_name);
    if let Err(e) = std::fs::remove_file(&path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), "Failed to remove document: {e}");
        }
    }
}

/// Absolute path of a stored document.
pub fn document_path(uploads_dir: &Path, stored_name: &str) -> PathBuf {
    uploads_dir.join(stored_name)
}

/// Strip path components and replace anything outside a conservative
/// character set, so the stored name is safe to serve back verbatim.
fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned
    }
}

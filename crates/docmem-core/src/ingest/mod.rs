//! Document ingestion.
//!
//! Turns an uploaded file into raw text plus a human-readable log of the
//! steps taken. This layer never fails outright: parser errors are folded
//! into the log and reported as empty text, which the pipeline treats as
//! an ingestion failure.

pub mod docx;
pub mod pdf;

use crate::models::config::IngestConfig;

/// Supported document formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Picks the parser from the lowercased file extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name.rsplit('.').next().map(str::to_lowercase).as_deref() {
            Some("pdf") => Some(Self::Pdf),
            Some("docx") => Some(Self::Docx),
            _ => None,
        }
    }
}

/// Extracts raw text from `bytes`, dispatching on the extension of
/// `file_name`. Returns the text together with the ingestion log.
pub fn ingest(file_name: &str, bytes: &[u8], config: &IngestConfig) -> (String, Vec<String>) {
    let mut log = vec![format!("Starting ingestion for '{file_name}'.")];

    match DocumentKind::from_file_name(file_name) {
        Some(DocumentKind::Pdf) => match pdf::extract_text(bytes) {
            Ok((text, pdf_log)) => {
                log.extend(pdf_log);
                if text.chars().count() < config.min_text_length {
                    log.push(
                        "Extracted text length is below threshold. The document is likely scanned."
                            .to_string(),
                    );
                }
                (text, log)
            }
            Err(e) => {
                log.push(format!("Failed to process PDF '{file_name}'. Error: {e}"));
                (String::new(), log)
            }
        },
        Some(DocumentKind::Docx) => match docx::extract_text(bytes) {
            Ok((text, docx_log)) => {
                log.extend(docx_log);
                (text, log)
            }
            Err(e) => {
                log.push(format!("Failed to process DOCX '{file_name}'. Error: {e}"));
                (String::new(), log)
            }
        },
        None => {
            log.push(format!(
                "Unsupported file type: '{file_name}'. This parser supports PDF and DOCX."
            ));
            (String::new(), log)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_from_file_name() {
        assert_eq!(DocumentKind::from_file_name("invoice.pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_file_name("INVOICE.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_file_name("contract.docx"), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_file_name("notes.txt"), None);
        assert_eq!(DocumentKind::from_file_name("archive.tar.gz"), None);
        assert_eq!(DocumentKind::from_file_name("README"), None);
    }

    #[test]
    fn test_unsupported_extension_fails_soft() {
        let (text, log) = ingest("notes.txt", b"hello", &IngestConfig::default());
        assert_eq!(text, "");
        assert_eq!(log[0], "Starting ingestion for 'notes.txt'.");
        assert!(log.iter().any(|l| l.contains("Unsupported file type")));
    }

    #[test]
    fn test_pdf_garbage_bytes_fail_soft() {
        let (text, log) = ingest("invoice.pdf", b"definitely not a pdf", &IngestConfig::default());
        assert_eq!(text, "");
        assert!(log.iter().any(|l| l.starts_with("Failed to process PDF 'invoice.pdf'.")));
    }

    #[test]
    fn test_docx_garbage_bytes_fail_soft() {
        let (text, log) = ingest("contract.docx", b"not a zip", &IngestConfig::default());
        assert_eq!(text, "");
        assert!(log.iter().any(|l| l.starts_with("Failed to process DOCX 'contract.docx'.")));
    }
}

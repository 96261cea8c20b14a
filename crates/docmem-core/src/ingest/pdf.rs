//! PDF text extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::debug;

use crate::error::IngestError;

/// Extracts the full text of a PDF.
///
/// `lopdf` handles structure checks and empty-password decryption, the
/// actual text comes from `pdf_extract` over the (possibly re-saved)
/// raw bytes.
pub(crate) fn extract_text(bytes: &[u8]) -> Result<(String, Vec<String>), IngestError> {
    let mut log = vec!["Attempting direct text extraction from PDF.".to_string()];

    let mut doc = Document::load_mem(bytes).map_err(|e| IngestError::PdfParse(e.to_string()))?;

    // Try the empty user password before giving up on encrypted files.
    let raw_data = if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(IngestError::Encrypted);
        }
        debug!("decrypted PDF with empty password");
        let mut decrypted = Vec::new();
        doc.save_to(&mut decrypted)
            .map_err(|e| IngestError::PdfParse(format!("failed to save decrypted PDF: {e}")))?;
        decrypted
    } else {
        bytes.to_vec()
    };

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(IngestError::NoPages);
    }
    log.push(format!("PDF has {page_count} pages."));

    let text = pdf_extract::extract_text_from_mem(&raw_data)
        .map_err(|e| IngestError::PdfText(e.to_string()))?;
    log.push("Direct text extraction successful.".to_string());

    Ok((text, log))
}

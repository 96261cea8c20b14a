//! Error types for the docmem-core library.

use thiserror::Error;

/// Main error type for the docmem library.
#[derive(Error, Debug)]
pub enum DocmemError {
    /// Document ingestion error.
    #[error("ingestion error: {0}")]
    Ingest(#[from] IngestError),

    /// Rule store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Oracle error from the AI layer.
    #[error("oracle error: {0}")]
    Oracle(#[from] docmem_oracle::OracleError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to document ingestion.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    PdfParse(String),

    /// Failed to extract text from a PDF.
    #[error("failed to extract text: {0}")]
    PdfText(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// The DOCX container could not be opened.
    #[error("not a DOCX archive: {0}")]
    DocxArchive(String),

    /// The DOCX document XML is malformed.
    #[error("malformed DOCX document: {0}")]
    DocxXml(String),
}

/// Errors related to the learned-rule store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored rule could not be encoded or decoded.
    #[error("rule serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error opening or creating the database.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the docmem library.
pub type Result<T> = std::result::Result<T, DocmemError>;

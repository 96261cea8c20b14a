//! Data models for documents, extracted fields, and configuration.

pub mod config;
pub mod document;

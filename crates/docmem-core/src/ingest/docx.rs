//! DOCX text extraction.
//!
//! A DOCX file is a zip archive; the document body lives in
//! `word/document.xml`. Text runs (`w:t`) are collected per paragraph
//! (`w:p`) and the paragraphs joined with newlines, blank ones included.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::error::IngestError;

pub(crate) fn extract_text(bytes: &[u8]) -> Result<(String, Vec<String>), IngestError> {
    let mut log = vec!["Attempting text extraction from DOCX.".to_string()];

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| IngestError::DocxArchive(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| IngestError::DocxArchive(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| IngestError::DocxArchive(e.to_string()))?;

    let paragraphs = collect_paragraphs(&xml)?;
    log.push(format!(
        "DOCX extraction successful. Found {} paragraphs.",
        paragraphs.len()
    ));

    Ok((paragraphs.join("\n"), log))
}

fn collect_paragraphs(xml: &str) -> Result<Vec<String>, IngestError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_text = true;
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                b"w:t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"w:p" {
                    paragraphs.push(String::new());
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let chunk = t
                    .decode()
                    .map_err(|e| IngestError::DocxXml(e.to_string()))?;
                current.push_str(&chunk);
            }
            Ok(Event::GeneralRef(e)) if in_text => {
                if let Some(ch) = resolve_entity(&e) {
                    current.push(ch);
                } else {
                    debug!(
                        entity = %String::from_utf8_lossy(&e),
                        "skipping unresolvable entity reference"
                    );
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(IngestError::DocxXml(e.to_string())),
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Resolves the predefined XML entities and numeric character references.
fn resolve_entity(name: &[u8]) -> Option<char> {
    match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"apos" => Some('\''),
        b"quot" => Some('"'),
        _ => {
            let name = std::str::from_utf8(name).ok()?;
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

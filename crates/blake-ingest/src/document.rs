//! Plain-text extraction from uploaded documents.
//!
//! Supported formats are UTF-8 text and markdown, DOCX (paragraphs of
//! `word/document.xml`) and PDF (text of every page, in page order).

use std::io::{Cursor, Read as _};

use quick_xml::{Reader, events::Event};
use serde::Serialize;

use crate::{Error, Result};

const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
  Text,
  Markdown,
  Docx,
  Pdf,
}

impl DocumentKind {
  /// Work out the format from the file extension, falling back to the
  /// declared content type.
  pub fn detect(filename: &str, content_type: Option<&str>) -> Result<Self> {
    let ext = filename
      .rsplit_once('.')
      .map(|(_, ext)| ext.to_ascii_lowercase());

    let by_ext = match ext.as_deref() {
      Some("txt") => Some(Self::Text),
      Some("md" | "markdown") => Some(Self::Markdown),
      Some("docx") => Some(Self::Docx),
      Some("pdf") => Some(Self::Pdf),
      _ => None,
    };
    if let Some(kind) = by_ext {
      return Ok(kind);
    }

    let mime = content_type
      .and_then(|ct| ct.split(';').next())
      .map(|ct| ct.trim().to_ascii_lowercase());
    match mime.as_deref() {
      Some("text/plain") => Ok(Self::Text),
      Some("text/markdown") => Ok(Self::Markdown),
      Some(
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
      ) => Ok(Self::Docx),
      Some("application/pdf") => Ok(Self::Pdf),
      _ => Err(Error::UnsupportedDocument(
        mime.unwrap_or_else(|| filename.to_owned()),
      )),
    }
  }
}

/// Text pulled out of an uploaded document.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
  pub filename:   String,
  pub kind:       DocumentKind,
  pub text:       String,
  pub characters: usize,
}

/// Extract the text of a document. Fails when the format is unknown or the
/// document holds no text at all.
pub fn parse_document(
  filename: &str,
  content_type: Option<&str>,
  bytes: &[u8],
) -> Result<ParsedDocument> {
  let kind = DocumentKind::detect(filename, content_type)?;
  let raw = match kind {
    DocumentKind::Text | DocumentKind::Markdown => String::from_utf8(bytes.to_vec())?,
    DocumentKind::Docx => docx_text(bytes)?,
    DocumentKind::Pdf => pdf_text(bytes)?,
  };

  let text = raw.trim().to_owned();
  if text.is_empty() {
    return Err(Error::EmptyDocument);
  }
  tracing::debug!(filename, ?kind, chars = text.chars().count(), "document parsed");

  Ok(ParsedDocument {
    filename: filename.to_owned(),
    kind,
    characters: text.chars().count(),
    text,
  })
}

// ─── DOCX ────────────────────────────────────────────────────────────────────

fn docx_text(bytes: &[u8]) -> Result<String> {
  let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
  let mut xml = String::new();
  archive.by_name(DOCX_BODY)?.read_to_string(&mut xml)?;
  paragraphs_from_xml(&xml)
}

/// Walk `word/document.xml`: text runs (`w:t`) are concatenated, every
/// paragraph ends a line, tabs and breaks are kept.
fn paragraphs_from_xml(xml: &str) -> Result<String> {
  let mut reader = Reader::from_str(xml);
  let mut text = String::new();
  let mut in_run_text = false;

  loop {
    match reader.read_event()? {
      Event::Start(e) if e.local_name().as_ref() == b"t" => in_run_text = true,
      Event::End(e) => match e.local_name().as_ref() {
        b"t" => in_run_text = false,
        b"p" => text.push('\n'),
        _ => {}
      },
      Event::Empty(e) => match e.local_name().as_ref() {
        b"tab" => text.push('\t'),
        b"br" | b"p" => text.push('\n'),
        _ => {}
      },
      Event::Text(t) if in_run_text => {
        let unescaped = t.unescape().map_err(|e| Error::Docx(e.to_string()))?;
        text.push_str(&unescaped);
      }
      Event::Eof => break,
      _ => {}
    }
  }
  Ok(text)
}

// ─── PDF ─────────────────────────────────────────────────────────────────────

fn pdf_text(bytes: &[u8]) -> Result<String> {
  let doc = lopdf::Document::load_mem(bytes)?;
  let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
  if pages.is_empty() {
    return Ok(String::new());
  }
  Ok(doc.extract_text(&pages)?)
}

//! Document readers: turn an uploaded file into normalized text documents.
//!
//! Dispatch is by file extension over a fixed, priority-ordered set of
//! readers: PDF, then DOC/DOCX, then a plain-text fallback that accepts any
//! extension. Because the fallback accepts everything,
//! [`ChatError::UnsupportedFormat`] is latent; it is kept so the dispatch
//! stays a closed, checkable set rather than open-ended virtual dispatch.

use std::io::Read;
use std::path::Path;

use crate::error::{ChatError, Result};
use crate::models::Document;

/// Maximum decompressed bytes read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// The closed set of file readers, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reader {
    Pdf,
    Docx,
    PlainText,
}

const READERS: [Reader; 3] = [Reader::Pdf, Reader::Docx, Reader::PlainText];

impl Reader {
    fn can_handle(&self, extension: &str) -> bool {
        match self {
            Reader::Pdf => extension == "pdf",
            Reader::Docx => extension == "doc" || extension == "docx",
            // Anything falls through to plain text, including no extension.
            Reader::PlainText => true,
        }
    }

    fn read(&self, bytes: &[u8]) -> Result<Vec<Document>> {
        match self {
            Reader::Pdf => {
                let text = pdf_extract::extract_text_from_mem(bytes)
                    .map_err(|e| ChatError::Internal(format!("PDF extraction failed: {e}")))?;
                Ok(text_documents(&text))
            }
            Reader::Docx => {
                let text = extract_docx(bytes)?;
                Ok(text_documents(&text))
            }
            Reader::PlainText => {
                let text = String::from_utf8_lossy(bytes);
                Ok(vec![Document::new(text.into_owned())])
            }
        }
    }
}

/// Read a file into an ordered sequence of [`Document`]s.
///
/// Fails with [`ChatError::NotFound`] when the path does not exist.
/// PDF/DOCX extraction yielding only whitespace produces an empty vector;
/// the caller decides whether that is [`ChatError::EmptyDocument`].
pub fn read_file(path: &Path) -> Result<Vec<Document>> {
    if !path.exists() {
        return Err(ChatError::NotFound(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let bytes = std::fs::read(path)?;

    for reader in READERS {
        if reader.can_handle(&extension) {
            return reader.read(&bytes);
        }
    }

    // Unreachable while the plain-text fallback accepts any extension.
    Err(ChatError::UnsupportedFormat(format!(".{extension}")))
}

fn text_documents(text: &str) -> Vec<Document> {
    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![Document::new(text.to_string())]
    }
}

/// Pull the `w:t` text runs out of `word/document.xml`.
fn extract_docx(bytes: &[u8]) -> Result<String> {
    let ooxml = |e: String| ChatError::Internal(format!("DOCX extraction failed: {e}"));

    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ooxml(e.to_string()))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ooxml(e.to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ooxml(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ooxml("word/document.xml exceeds size limit".to_string()));
        }
    }

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(doc_xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                        out.push(' ');
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_not_found() {
        let err = read_file(Path::new("/nonexistent/notes.txt")).unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
    }

    #[test]
    fn txt_file_reads_as_single_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        fs::write(&path, "The sky is blue.").unwrap();

        let docs = read_file(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "The sky is blue.");
    }

    #[test]
    fn unknown_extension_falls_back_to_plain_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.weird");
        fs::write(&path, "still readable").unwrap();

        let docs = read_file(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "still readable");
    }

    #[test]
    fn invalid_pdf_is_internal_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        fs::write(&path, b"not a pdf").unwrap();

        let err = read_file(&path).unwrap_err();
        assert!(matches!(err, ChatError::Internal(_)));
    }

    #[test]
    fn invalid_docx_is_internal_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.docx");
        fs::write(&path, b"not a zip").unwrap();

        let err = read_file(&path).unwrap_err();
        assert!(matches!(err, ChatError::Internal(_)));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.PDF");
        fs::write(&path, b"not a pdf").unwrap();

        // Dispatches to the PDF reader (and fails there), not the fallback.
        let err = read_file(&path).unwrap_err();
        assert!(matches!(err, ChatError::Internal(_)));
    }
}

//! DOCX text extraction
//!
//! Reads `word/document.xml` from the archive and keeps the text runs
//! (`w:t`), one line per paragraph (`w:p`).

use crate::errors::IngestionError;
use std::io::{Cursor, Read};

/// Extract plain text from DOCX bytes
pub fn extract_text_from_docx(bytes: &[u8]) -> Result<String, IngestionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        IngestionError::DocxParse {
            message: format!("Invalid DOCX archive: {}", e),
        }
    })?;

    let mut document_xml = archive
        .by_name("word/document.xml")
        .map_err(|_| IngestionError::DocxParse {
            message: "No word/document.xml in archive".to_string(),
        })?;

    let mut xml = String::new();
    document_xml
        .read_to_string(&mut xml)
        .map_err(|e| IngestionError::DocxParse {
            message: format!("Failed to read word/document.xml: {}", e),
        })?;

    Ok(extract_plaintext_from_xml(&xml))
}

/// Pull text runs out of WordprocessingML
fn extract_plaintext_from_xml(xml: &str) -> String {
    let mut result = String::new();
    let mut in_text = false;
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        if in_text {
            result.push_str(&decode_entities(&rest[..open]));
        }

        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");

        match (name, tag.starts_with('/')) {
            ("w:t", false) if !self_closing => in_text = true,
            ("w:t", true) => in_text = false,
            ("w:p", true) => result.push('\n'),
            ("w:tab", false) => result.push('\t'),
            ("w:br", false) | ("w:cr", false) => result.push('\n'),
            _ => {}
        }
    }

    result
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_docx(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_and_runs() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Remote work</w:t></w:r><w:r><w:t xml:space="preserve"> policy</w:t></w:r></w:p>
            <w:p><w:r><w:t>Fridays &amp; Mondays</w:t></w:r></w:p>
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
        </w:body></w:document>"#;

        let text = extract_text_from_docx(&build_docx(xml)).unwrap();
        assert_eq!(text, "Remote work policy\nFridays & Mondays\nCell\n");
    }

    #[test]
    fn test_missing_document_xml() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("other.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_text_from_docx(&bytes).unwrap_err();
        assert!(matches!(err, IngestionError::DocxParse { .. }));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(extract_text_from_docx(b"plain text").is_err());
    }
}

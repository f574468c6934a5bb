//! PDF text extraction module
//!
//! Extracts text content from PDF bytes using lopdf content-stream decoding.

use crate::errors::IngestionError;
use lopdf::content::Content;
use lopdf::{Document, Object};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// TJ kerning adjustments below this (in thousandths of an em) read as a word gap
const TJ_SPACE_THRESHOLD: f32 = -250.0;

/// Extract text content from an in-memory PDF, one page per line block
pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String, IngestionError> {
    let doc = Document::load_mem(bytes).map_err(|e| IngestionError::PdfParse {
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut text = String::new();
    for (page_num, page_id) in pages {
        let encodings = font_encodings(&doc, page_id);
        let content = match doc.get_page_content(page_id) {
            Ok(content) => content,
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to read page content, skipping");
                continue;
            }
        };

        match Content::decode(&content) {
            Ok(content) => {
                text.push_str(&extract_text_from_operations(&content, &encodings));
                text.push('\n');
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to decode page content, skipping");
            }
        }
    }

    let cleaned = clean_text(&text);

    debug!(
        original_len = text.len(),
        cleaned_len = cleaned.len(),
        "Text extraction complete"
    );

    Ok(cleaned)
}

/// Named simple-font encodings declared by the fonts a page uses
fn font_encodings(doc: &Document, page_id: lopdf::ObjectId) -> BTreeMap<Vec<u8>, String> {
    doc.get_page_fonts(page_id)
        .into_iter()
        .filter_map(|(name, font)| {
            let encoding = font.get(b"Encoding").and_then(Object::as_name_str).ok()?;
            Some((name, encoding.to_string()))
        })
        .collect()
}

/// Walk the text-showing operators of one content stream
fn extract_text_from_operations(content: &Content, encodings: &BTreeMap<Vec<u8>, String>) -> String {
    let mut text = String::new();
    let mut encoding: Option<&str> = None;

    for op in &content.operations {
        match op.operator.as_str() {
            // Select font; its encoding applies to following strings
            "Tf" => {
                encoding = op
                    .operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| encodings.get(name))
                    .map(String::as_str);
            }
            // Show a string
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    text.push_str(&decode_string(encoding, bytes));
                }
            }
            // Move to next line, then show a string
            "'" | "\"" => {
                text.push('\n');
                if let Some(Object::String(bytes, _)) = op.operands.last() {
                    text.push_str(&decode_string(encoding, bytes));
                }
            }
            // Show strings with individual glyph positioning
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&decode_string(encoding, bytes)),
                            Object::Integer(n) if (*n as f32) < TJ_SPACE_THRESHOLD => text.push(' '),
                            Object::Real(n) if (*n as f32) < TJ_SPACE_THRESHOLD => text.push(' '),
                            _ => {}
                        }
                    }
                }
            }
            // Line and block breaks
            "ET" | "T*" | "Td" | "TD" => {
                if !text.ends_with('\n') && !text.is_empty() {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }

    text
}

/// Decode a shown string through the current font's named encoding when it has one
fn decode_string(encoding: Option<&str>, bytes: &[u8]) -> String {
    match encoding {
        Some(
            name @ ("WinAnsiEncoding" | "MacRomanEncoding" | "StandardEncoding" | "MacExpertEncoding"),
        ) if !has_utf16_bom(bytes) => Document::decode_text(Some(name), bytes),
        _ => decode_pdf_bytes(bytes),
    }
}

fn has_utf16_bom(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF
}

/// Decode a PDF string: UTF-16BE with BOM, else WinAnsi (Latin-1 plus the 0x80-0x9F punctuation block)
fn decode_pdf_bytes(bytes: &[u8]) -> String {
    if has_utf16_bom(bytes) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    bytes
        .iter()
        .filter_map(|&b| win_ansi_char(b))
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Map one WinAnsiEncoding byte; the five unassigned codes yield `None`
fn win_ansi_char(byte: u8) -> Option<char> {
    let c = match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        0x81 | 0x8D | 0x8F | 0x90 | 0x9D => return None,
        other => other as char,
    };
    Some(c)
}

/// Collapse runs of spaces within lines and drop blank-line runs
fn clean_text(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in text.replace('\u{FEFF}', "").lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && lines.last().map(|l| l.is_empty()).unwrap_or(true) {
            continue;
        }
        lines.push(line);
    }

    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Stream, StringFormat};

    fn build_pdf(pages: &[&[&str]]) -> Vec<u8> {
        let pages: Vec<Vec<Vec<u8>>> = pages
            .iter()
            .map(|lines| lines.iter().map(|line| line.as_bytes().to_vec()).collect())
            .collect();
        build_pdf_with_font(&pages, None)
    }

    fn build_pdf_with_font(pages: &[Vec<Vec<u8>>], encoding: Option<&str>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        };
        if let Some(encoding) = encoding {
            font.set("Encoding", Object::Name(encoding.as_bytes().to_vec()));
        }
        let font_id = doc.add_object(Object::Dictionary(font));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in pages {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
            ];
            for line in lines.iter() {
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(line.clone(), StringFormat::Hexadecimal)],
                ));
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_extracts_pages_and_lines() {
        let pdf = build_pdf(&[&["Welcome to Acme", "Vacation policy"], &["Page two text"]]);
        let text = extract_text_from_pdf(&pdf).unwrap();

        assert!(text.contains("Welcome to Acme\nVacation policy"));
        assert!(text.contains("Page two text"));
        assert!(text.find("Vacation").unwrap() < text.find("Page two").unwrap());
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = extract_text_from_pdf(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, IngestionError::PdfParse { .. }));
    }

    #[test]
    fn test_clean_text() {
        let input = "Hello   World\n\n\n\nTest  line \n";
        assert_eq!(clean_text(input), "Hello World\n\nTest line");
    }

    #[test]
    fn test_decode_utf16() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_pdf_bytes(&bytes), "Hi");
        assert_eq!(decode_pdf_bytes(b"plain"), "plain");
    }

    #[test]
    fn test_decode_win_ansi_punctuation() {
        assert_eq!(
            decode_pdf_bytes(b"don\x92t \x93quoted\x94 \x95 item \x96 range"),
            "don\u{2019}t \u{201C}quoted\u{201D} \u{2022} item \u{2013} range"
        );
        assert_eq!(decode_pdf_bytes(b"\x80 5 \x97 caf\xe9"), "\u{20AC} 5 \u{2014} caf\u{e9}");
        assert_eq!(decode_pdf_bytes(b"a\x81b\x9Dc"), "abc");
    }

    #[test]
    fn test_extracts_text_through_font_encoding() {
        let line = b"It\x92s the team\x92s \x93handbook\x94".to_vec();
        let pdf = build_pdf_with_font(&[vec![line]], Some("WinAnsiEncoding"));
        let text = extract_text_from_pdf(&pdf).unwrap();

        assert_eq!(text, "It\u{2019}s the team\u{2019}s \u{201C}handbook\u{201D}");
    }

    #[test]
    fn test_font_encodings_only_lists_named_encodings() {
        let mut doc = Document::with_version("1.5");
        let named = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "MacRomanEncoding",
        });
        let bare = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => named, "F2" => bare },
            },
        });

        let encodings = font_encodings(&doc, page_id);
        assert_eq!(encodings.len(), 1);
        assert_eq!(encodings.get(b"F1".as_slice()).map(String::as_str), Some("MacRomanEncoding"));
    }
}

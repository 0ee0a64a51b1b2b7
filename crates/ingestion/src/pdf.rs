//! PDF text extraction module
//!
//! Extracts text content from in-memory PDF uploads using lopdf.

use crate::errors::IngestionError;
use tracing::{debug, warn};

/// Extract the text of every page, in page order
pub fn extract_text_from_pdf(filename: &str, bytes: &[u8]) -> Result<String, IngestionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| IngestionError::PdfParse {
        filename: filename.to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(filename, page_count = pages.len(), "Extracting text from PDF");

    let mut text = String::new();
    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => {
                warn!(filename, page = page_num, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    let cleaned = clean_text(&text);
    debug!(
        filename,
        raw_len = text.len(),
        cleaned_len = cleaned.len(),
        "PDF text extraction complete"
    );

    Ok(cleaned)
}

/// Drop byte-order marks and trailing whitespace, keep line structure
fn clean_text(text: &str) -> String {
    text.replace('\u{FEFF}', "")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    fn hello_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello research")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_extracts_page_text() {
        let text = extract_text_from_pdf("hello.pdf", &hello_pdf()).unwrap();
        assert!(text.contains("Hello research"));
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let err = extract_text_from_pdf("fake.pdf", b"not a pdf at all").unwrap_err();
        assert!(matches!(err, IngestionError::PdfParse { ref filename, .. } if filename == "fake.pdf"));
    }

    #[test]
    fn test_clean_text() {
        let cleaned = clean_text("\u{FEFF}Title   \nBody line  \n");
        assert_eq!(cleaned, "Title\nBody line");
    }
}

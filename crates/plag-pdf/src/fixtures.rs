//! Synthesized text PDFs for tests
//!
//! Each page is US Letter with its lines set in 12pt Helvetica at x = 72,
//! starting 72pt below the top edge and 18pt apart.

use crate::error::PdfError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

pub const FIXTURE_FONT_SIZE: f64 = 12.0;
pub const FIXTURE_LEFT: f64 = 72.0;
pub const FIXTURE_FIRST_BASELINE: f64 = 720.0;
pub const FIXTURE_LEADING: f64 = 18.0;

/// Build a document with one page per entry of `pages`, each a list of lines
pub fn text_document(pages: &[&[&str]]) -> Result<Document, PdfError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let baseline = FIXTURE_FIRST_BASELINE - FIXTURE_LEADING * i as f64;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec!["F1".into(), Object::Real(FIXTURE_FONT_SIZE as f32)],
            ));
            operations.push(Operation::new(
                "Td",
                vec![
                    Object::Real(FIXTURE_LEFT as f32),
                    Object::Real(baseline as f32),
                ],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }

        let bytes = Content { operations }
            .encode()
            .map_err(|e| PdfError::OperationError(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

/// Serialized bytes of [`text_document`]
pub fn text_pdf(pages: &[&[&str]]) -> Result<Vec<u8>, PdfError> {
    let mut doc = text_document(pages)?;
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Write [`text_document`] to `path`
pub fn write_text_pdf(path: &Path, pages: &[&[&str]]) -> Result<(), PdfError> {
    let bytes = text_pdf(pages)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

//! Translucent highlight overlays
//!
//! Highlights are composited without touching the page's own content: the
//! original streams are wrapped in `q … Q` and a new stream is appended that
//! fills one rectangle per highlighted word, using a dedicated ExtGState for
//! the fill opacity.

use crate::coords::{word_box_to_pdf, PdfRect, WordBox};
use crate::error::PdfError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

/// Resource name prefix for the overlay's graphics state
const GSTATE_PREFIX: &str = "PlagHl";
/// Bound on the Parent chain walked while resolving inherited resources
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Fill colour and opacity of highlight rectangles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightStyle {
    /// RGB components in `0.0..=1.0`
    pub fill: [f32; 3],
    pub opacity: f32,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            fill: [1.0, 0.95, 0.4],
            opacity: 0.35,
        }
    }
}

/// Word boxes to highlight on one page, in extraction coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageHighlights {
    /// 1-indexed page number
    pub page_number: u32,
    /// MediaBox the boxes were measured against, `[x, y, width, height]`
    pub media_box: [f64; 4],
    pub boxes: Vec<WordBox>,
}

impl PageHighlights {
    /// Boxes converted to PDF user space
    pub fn rects(&self) -> Vec<PdfRect> {
        self.boxes
            .iter()
            .map(|b| word_box_to_pdf(b, self.media_box))
            .collect()
    }
}

/// Render `source` to `output` with highlights drawn on top.
///
/// The output is staged in a temp file beside `output` and moved into place
/// once complete; parent directories are created as needed.
#[instrument(skip_all, fields(source = %source.display(), output = %output.display()))]
pub fn render_highlights(
    source: &Path,
    output: &Path,
    highlights: &[PageHighlights],
    style: &HighlightStyle,
) -> Result<PathBuf, PdfError> {
    let mut doc = Document::load(source).map_err(|e| PdfError::ParseError(e.to_string()))?;
    let drawn = apply_highlights(&mut doc, highlights, style)?;

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut staged = NamedTempFile::new_in(&parent)?;
    doc.save_to(&mut staged)?;
    staged.as_file().sync_all()?;
    staged.persist(output).map_err(|e| PdfError::Io(e.error))?;

    debug!(rects = drawn, "wrote annotated PDF");
    Ok(output.to_path_buf())
}

/// Add highlight overlays to an in-memory document.
///
/// Returns the number of rectangles drawn. Pages the document does not have
/// are skipped with a warning.
pub fn apply_highlights(
    doc: &mut Document,
    highlights: &[PageHighlights],
    style: &HighlightStyle,
) -> Result<usize, PdfError> {
    let pages = doc.get_pages();
    let mut drawn = 0;

    for page in highlights {
        if page.boxes.is_empty() {
            continue;
        }
        let Some(&page_id) = pages.get(&page.page_number) else {
            warn!(page = page.page_number, "highlight targets a missing page");
            continue;
        };

        let mut resources = resolve_resources(doc, page_id)?;
        let gs_name = install_gstate(doc, &mut resources, style.opacity)?;

        let prefix_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let overlay = overlay_content(&gs_name, &page.rects(), style)?;
        let overlay_id = doc.add_object(Stream::new(dictionary! {}, overlay));

        let mut contents = vec![Object::Reference(prefix_id)];
        contents.extend(existing_contents(doc, page_id)?);
        contents.push(Object::Reference(overlay_id));

        let page_obj = doc
            .get_object_mut(page_id)
            .map_err(|e| PdfError::OperationError(e.to_string()))?;
        if let Object::Dictionary(ref mut page_dict) = page_obj {
            page_dict.set("Contents", Object::Array(contents));
            page_dict.set("Resources", Object::Dictionary(resources));
        }

        drawn += page.boxes.len();
    }

    Ok(drawn)
}

/// The page's content streams as a flat list of objects
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, PdfError> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| PdfError::OperationError(e.to_string()))?;

    Ok(match page_dict.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    })
}

/// Owned copy of the page's effective resources, following the Parent chain
fn resolve_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, PdfError> {
    let mut current = page_id;

    for _ in 0..MAX_INHERITANCE_DEPTH {
        let node = doc
            .get_dictionary(current)
            .map_err(|e| PdfError::OperationError(e.to_string()))?;

        match node.get(b"Resources") {
            Ok(Object::Dictionary(resources)) => return Ok(resources.clone()),
            Ok(Object::Reference(id)) => {
                let resources = doc
                    .get_dictionary(*id)
                    .map_err(|e| PdfError::OperationError(e.to_string()))?;
                return Ok(resources.clone());
            }
            _ => {}
        }

        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => current = parent,
            Err(_) => break,
        }
    }

    Ok(Dictionary::new())
}

/// Register the overlay's ExtGState under a name not already in use
fn install_gstate(
    doc: &Document,
    resources: &mut Dictionary,
    opacity: f32,
) -> Result<String, PdfError> {
    let mut states = match resources.get(b"ExtGState") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => doc
            .get_dictionary(*id)
            .map_err(|e| PdfError::OperationError(e.to_string()))?
            .clone(),
        _ => Dictionary::new(),
    };

    let mut name = GSTATE_PREFIX.to_string();
    let mut suffix = 0;
    while states.has(name.as_bytes()) {
        suffix += 1;
        name = format!("{}{}", GSTATE_PREFIX, suffix);
    }

    let opacity = opacity.clamp(0.0, 1.0);
    states.set(
        name.as_bytes().to_vec(),
        Object::Dictionary(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(opacity),
            "CA" => Object::Real(opacity),
        }),
    );
    resources.set("ExtGState", Object::Dictionary(states));
    Ok(name)
}

/// Content stream closing the wrapped original and filling the rectangles
fn overlay_content(
    gs_name: &str,
    rects: &[PdfRect],
    style: &HighlightStyle,
) -> Result<Vec<u8>, PdfError> {
    let [r, g, b] = style.fill;
    let mut operations = vec![
        Operation::new("Q", vec![]),
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(gs_name.as_bytes().to_vec())]),
        Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ),
    ];

    for rect in rects {
        operations.push(Operation::new(
            "re",
            vec![
                Object::Real(rect.x as f32),
                Object::Real(rect.y as f32),
                Object::Real(rect.width as f32),
                Object::Real(rect.height as f32),
            ],
        ));
    }
    operations.push(Operation::new("f", vec![]));
    operations.push(Operation::new("Q", vec![]));

    Content { operations }
        .encode()
        .map_err(|e| PdfError::OperationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::TextExtractor;
    use crate::fixtures::{text_document, write_text_pdf};
    use pretty_assertions::assert_eq;

    const LETTER: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

    fn one_box(page_number: u32) -> PageHighlights {
        PageHighlights {
            page_number,
            media_box: LETTER,
            boxes: vec![WordBox {
                x0: 72.0,
                x1: 120.0,
                top: 62.0,
                bottom: 75.0,
            }],
        }
    }

    fn stream_bytes(doc: &Document, obj: &Object) -> Vec<u8> {
        let id = obj.as_reference().unwrap();
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone())
    }

    fn page_dict(doc: &Document, page_number: u32) -> &Dictionary {
        let page_id = doc.get_pages()[&page_number];
        doc.get_dictionary(page_id).unwrap()
    }

    #[test]
    fn test_default_style() {
        let style = HighlightStyle::default();
        assert_eq!(style.fill, [1.0, 0.95, 0.4]);
        assert_eq!(style.opacity, 0.35);
    }

    #[test]
    fn test_original_content_is_wrapped() {
        let mut doc = text_document(&[&["hello world"]]).unwrap();
        let drawn = apply_highlights(&mut doc, &[one_box(1)], &HighlightStyle::default()).unwrap();
        assert_eq!(drawn, 1);

        let page = page_dict(&doc, 1);
        let contents = page.get(b"Contents").unwrap().as_array().unwrap();
        assert_eq!(contents.len(), 3);

        assert_eq!(stream_bytes(&doc, &contents[0]), b"q\n".to_vec());
        let original = String::from_utf8_lossy(&stream_bytes(&doc, &contents[1])).to_string();
        assert!(original.contains("Tj"));

        let overlay = String::from_utf8_lossy(&stream_bytes(&doc, &contents[2])).to_string();
        assert!(overlay.starts_with("Q"));
        assert!(overlay.contains("/PlagHl gs"));
        assert!(overlay.contains("re"));
        assert!(overlay.trim_end().ends_with("Q"));
    }

    #[test]
    fn test_gstate_carries_opacity() {
        let mut doc = text_document(&[&["hello world"]]).unwrap();
        let style = HighlightStyle {
            fill: [0.0, 1.0, 0.0],
            opacity: 0.5,
        };
        apply_highlights(&mut doc, &[one_box(1)], &style).unwrap();

        let resources = page_dict(&doc, 1).get(b"Resources").unwrap().as_dict().unwrap();
        // Fonts survive alongside the new graphics state
        assert!(resources.has(b"Font"));
        let states = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
        let gs = states.get(b"PlagHl").unwrap().as_dict().unwrap();
        assert_eq!(gs.get(b"ca").unwrap().as_float().unwrap(), 0.5);
        assert_eq!(gs.get(b"CA").unwrap().as_float().unwrap(), 0.5);
    }

    #[test]
    fn test_gstate_name_avoids_collisions() {
        let mut doc = text_document(&[&["hello world"]]).unwrap();
        apply_highlights(&mut doc, &[one_box(1)], &HighlightStyle::default()).unwrap();
        apply_highlights(&mut doc, &[one_box(1)], &HighlightStyle::default()).unwrap();

        let resources = page_dict(&doc, 1).get(b"Resources").unwrap().as_dict().unwrap();
        let states = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
        assert!(states.has(b"PlagHl"));
        assert!(states.has(b"PlagHl1"));
    }

    #[test]
    fn test_inherited_resources_are_resolved() {
        let mut doc = text_document(&[&["hello world"]]).unwrap();
        let page_id = doc.get_pages()[&1];

        // Move the page's resources onto the Pages node
        let (resources, parent_id) = {
            let page = doc.get_dictionary(page_id).unwrap();
            (
                page.get(b"Resources").unwrap().clone(),
                page.get(b"Parent").unwrap().as_reference().unwrap(),
            )
        };
        if let Ok(Object::Dictionary(ref mut page)) = doc.get_object_mut(page_id) {
            page.remove(b"Resources");
        }
        if let Ok(Object::Dictionary(ref mut pages)) = doc.get_object_mut(parent_id) {
            pages.set("Resources", resources);
        }

        apply_highlights(&mut doc, &[one_box(1)], &HighlightStyle::default()).unwrap();

        let page_resources = page_dict(&doc, 1).get(b"Resources").unwrap().as_dict().unwrap();
        assert!(page_resources.has(b"Font"));
        assert!(page_resources.has(b"ExtGState"));
    }

    #[test]
    fn test_only_highlighted_pages_change() {
        let mut doc = text_document(&[&["first"], &["second"]]).unwrap();
        apply_highlights(&mut doc, &[one_box(2)], &HighlightStyle::default()).unwrap();

        assert!(page_dict(&doc, 1).get(b"Contents").unwrap().as_reference().is_ok());
        assert_eq!(
            page_dict(&doc, 2).get(b"Contents").unwrap().as_array().unwrap().len(),
            3
        );
    }

    #[test]
    fn test_missing_page_is_skipped() {
        let mut doc = text_document(&[&["only page"]]).unwrap();
        let drawn = apply_highlights(&mut doc, &[one_box(7)], &HighlightStyle::default()).unwrap();
        assert_eq!(drawn, 0);
    }

    #[test]
    fn test_render_keeps_text_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.pdf");
        write_text_pdf(&source, &[&["hello world again"], &["second page"]]).unwrap();

        let output = dir.path().join("nested").join("out").join("annotated.pdf");
        let written =
            render_highlights(&source, &output, &[one_box(1)], &HighlightStyle::default())
                .unwrap();
        assert_eq!(written, output);
        assert!(output.exists());

        let before = TextExtractor::extract_text(&source).unwrap();
        let after = TextExtractor::extract_text(&output).unwrap();
        assert_eq!(before, after);

        let doc = Document::load(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 2);

        // Only the final artifact remains in the output directory
        let entries = std::fs::read_dir(output.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_render_without_highlights_copies_document() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.pdf");
        write_text_pdf(&source, &[&["plain"]]).unwrap();

        let output = dir.path().join("copy.pdf");
        render_highlights(&source, &output, &[], &HighlightStyle::default()).unwrap();
        assert_eq!(
            TextExtractor::extract_text(&output).unwrap(),
            TextExtractor::extract_text(&source).unwrap()
        );
    }

    #[test]
    fn test_render_rejects_unparseable_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.pdf");
        std::fs::write(&source, b"not a pdf").unwrap();

        let result = render_highlights(
            &source,
            &dir.path().join("out.pdf"),
            &[one_box(1)],
            &HighlightStyle::default(),
        );
        assert!(matches!(result, Err(PdfError::ParseError(_))));
        assert!(!dir.path().join("out.pdf").exists());
    }
}

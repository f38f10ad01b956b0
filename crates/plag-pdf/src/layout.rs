//! Word layout collection
//!
//! pdf-extract drives an [`OutputDev`] glyph by glyph. [`LayoutCollector`]
//! groups those glyphs into words with bounding boxes so matched text can
//! later be highlighted at its position on the page.

use crate::coords::{pdf_to_word_box, WordBox};
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use serde::{Deserialize, Serialize};

/// Horizontal gap, as a fraction of the font size, that starts a new word
const WORD_GAP_RATIO: f64 = 0.25;
/// Baseline shift, as a fraction of the font size, that starts a new line
const LINE_SHIFT_RATIO: f64 = 0.5;
/// Glyph extent above the baseline, as a fraction of the font size
const ASCENT_RATIO: f64 = 0.8;
/// Glyph extent below the baseline, as a fraction of the font size
const DESCENT_RATIO: f64 = 0.2;

/// A single word and where it sits on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub bbox: WordBox,
    /// Zero-based line index within the page
    pub line: usize,
}

/// All words of one page, in content-stream order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageWords {
    /// 1-indexed page number
    pub page_number: u32,
    /// MediaBox as `[x, y, width, height]`
    pub media_box: [f64; 4],
    pub words: Vec<Word>,
}

impl PageWords {
    pub fn new(page_number: u32, media_box: [f64; 4]) -> Self {
        Self {
            page_number,
            media_box,
            words: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.media_box[2]
    }

    pub fn height(&self) -> f64 {
        self.media_box[3]
    }

    /// Page text: words space-joined per line, lines joined with `\n`
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut current_line = None;
        for word in &self.words {
            match current_line {
                None => {}
                Some(line) if line == word.line => out.push(' '),
                Some(_) => out.push('\n'),
            }
            out.push_str(&word.text);
            current_line = Some(word.line);
        }
        out
    }
}

#[derive(Debug)]
struct PendingWord {
    text: String,
    x0: f64,
    x1: f64,
    baseline: f64,
    size: f64,
}

/// [`OutputDev`] that records words and their boxes for every page
#[derive(Debug, Default)]
pub(crate) struct LayoutCollector {
    pages: Vec<PageWords>,
    current: Option<PageWords>,
    pending: Option<PendingWord>,
    line: usize,
    last_baseline: Option<f64>,
    line_ended: bool,
}

impl LayoutCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_pages(mut self) -> Vec<PageWords> {
        // A producer that never closed its last page still yields its words
        self.finish_page();
        self.pages
    }

    fn push_glyph(&mut self, x: f64, baseline: f64, advance: f64, size: f64, glyph: &str) {
        if glyph.trim().is_empty() {
            self.flush_word();
            return;
        }

        if let Some(pending) = &self.pending {
            let shift = (baseline - pending.baseline).abs();
            let gap = x - pending.x1;
            let reference = pending.size.max(size);
            if shift > LINE_SHIFT_RATIO * reference
                || gap > WORD_GAP_RATIO * reference
                || gap < -reference
            {
                self.flush_word();
            }
        }

        match &mut self.pending {
            Some(pending) => {
                pending.text.push_str(glyph);
                pending.x1 = pending.x1.max(x + advance);
                pending.size = pending.size.max(size);
            }
            None => {
                if let Some(last) = self.last_baseline {
                    if self.line_ended || (baseline - last).abs() > LINE_SHIFT_RATIO * size {
                        self.line += 1;
                    }
                }
                self.line_ended = false;
                self.last_baseline = Some(baseline);
                self.pending = Some(PendingWord {
                    text: glyph.to_string(),
                    x0: x,
                    x1: x + advance,
                    baseline,
                    size,
                });
            }
        }
    }

    fn flush_word(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let Some(page) = self.current.as_mut() else {
            return;
        };

        let bbox = pdf_to_word_box(
            pending.x0,
            pending.x1,
            pending.baseline - DESCENT_RATIO * pending.size,
            pending.baseline + ASCENT_RATIO * pending.size,
            page.media_box,
        );
        page.words.push(Word {
            text: pending.text,
            bbox,
            line: self.line,
        });
    }

    fn finish_page(&mut self) {
        self.flush_word();
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
    }
}

impl OutputDev for LayoutCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.finish_page();
        self.line = 0;
        self.last_baseline = None;
        self.line_ended = false;
        self.current = Some(PageWords::new(
            page_num,
            [
                media_box.llx,
                media_box.lly,
                media_box.urx - media_box.llx,
                media_box.ury - media_box.lly,
            ],
        ));
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.finish_page();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        let scale_x = (trm.m11 * trm.m11 + trm.m12 * trm.m12).sqrt();
        let scale_y = (trm.m21 * trm.m21 + trm.m22 * trm.m22).sqrt();
        let mut size = font_size * scale_y;
        if !(size.is_finite() && size > 0.0) {
            size = 1.0;
        }
        let advance = width * font_size * scale_x;

        self.push_glyph(trm.m31, trm.m32, advance.max(0.0), size, char);
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        self.flush_word();
        if self.last_baseline.is_some() {
            self.line_ended = true;
        }
        Ok(())
    }
}

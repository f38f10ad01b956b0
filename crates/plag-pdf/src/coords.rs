//! Coordinate transformation between extraction space and PDF user space
//!
//! Word boxes come out of extraction in a top-origin system: `top` and
//! `bottom` are distances measured downward from the top edge of the page's
//! MediaBox. PDF drawing operators use the page's bottom-left origin, so
//! every highlight rectangle has to be flipped before it is drawn.

use serde::{Deserialize, Serialize};

/// A word bounding box in top-origin extraction space (points)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl WordBox {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// A rectangle in PDF user space (bottom-left origin, points)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert a top-origin word box into a PDF rectangle on a page with the
/// given MediaBox (`[x, y, width, height]`).
pub fn word_box_to_pdf(bbox: &WordBox, media_box: [f64; 4]) -> PdfRect {
    let [mb_x, mb_y, _mb_width, mb_height] = media_box;

    // Flip Y axis: the box's bottom edge is `bottom` points below the page top
    PdfRect {
        x: mb_x + bbox.x0,
        y: mb_y + (mb_height - bbox.bottom),
        width: bbox.width(),
        height: bbox.height(),
    }
}

/// Convert a span given in PDF user space (`x0..x1`, `y_low..y_high`) into a
/// top-origin word box.
pub fn pdf_to_word_box(x0: f64, x1: f64, y_low: f64, y_high: f64, media_box: [f64; 4]) -> WordBox {
    let [mb_x, mb_y, _mb_width, mb_height] = media_box;
    let page_top = mb_y + mb_height;

    WordBox {
        x0: x0 - mb_x,
        x1: x1 - mb_x,
        top: page_top - y_high,
        bottom: page_top - y_low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

    #[test]
    fn test_word_near_top_maps_near_page_top() {
        let bbox = WordBox {
            x0: 72.0,
            x1: 120.0,
            top: 60.0,
            bottom: 72.0,
        };
        let rect = word_box_to_pdf(&bbox, LETTER);
        assert_eq!(rect.x, 72.0);
        assert_eq!(rect.y, 720.0);
        assert_eq!(rect.width, 48.0);
        assert_eq!(rect.height, 12.0);
    }

    #[test]
    fn test_corners() {
        // Top-left corner of the page
        let top_left = WordBox {
            x0: 0.0,
            x1: 10.0,
            top: 0.0,
            bottom: 10.0,
        };
        let rect = word_box_to_pdf(&top_left, LETTER);
        assert!((rect.y + rect.height - 792.0).abs() < 0.001);

        // Bottom-left corner of the page
        let bottom_left = WordBox {
            x0: 0.0,
            x1: 10.0,
            top: 782.0,
            bottom: 792.0,
        };
        let rect = word_box_to_pdf(&bottom_left, LETTER);
        assert!(rect.y.abs() < 0.001);
    }

    #[test]
    fn test_offset_media_box() {
        // Some producers use a MediaBox that does not start at the origin
        let media_box = [10.0, 20.0, 600.0, 800.0];
        let bbox = pdf_to_word_box(50.0, 80.0, 700.0, 712.0, media_box);
        assert_eq!(bbox.x0, 40.0);
        assert_eq!(bbox.top, 108.0);
        assert_eq!(bbox.bottom, 120.0);

        let rect = word_box_to_pdf(&bbox, media_box);
        assert!((rect.x - 50.0).abs() < 0.001);
        assert!((rect.y - 700.0).abs() < 0.001);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: extraction space -> PDF space -> extraction space is lossless
        #[test]
        fn round_trip_preserves_box(
            x0 in 0.0f64..500.0,
            w in 0.1f64..100.0,
            y_low in 0.0f64..700.0,
            h in 0.1f64..50.0,
            mb_x in -50.0f64..50.0,
            mb_y in -50.0f64..50.0,
        ) {
            let media_box = [mb_x, mb_y, 612.0, 792.0];
            let bbox = pdf_to_word_box(x0, x0 + w, y_low, y_low + h, media_box);
            let rect = word_box_to_pdf(&bbox, media_box);
            prop_assert!((rect.x - x0).abs() < 1e-6);
            prop_assert!((rect.y - y_low).abs() < 1e-6);
            prop_assert!((rect.width - w).abs() < 1e-6);
            prop_assert!((rect.height - h).abs() < 1e-6);
        }

        /// Property: boxes keep a non-negative height in both spaces
        #[test]
        fn height_is_preserved(top in 0.0f64..780.0, h in 0.0f64..12.0) {
            let bbox = WordBox { x0: 0.0, x1: 1.0, top, bottom: top + h };
            let rect = word_box_to_pdf(&bbox, [0.0, 0.0, 612.0, 792.0]);
            prop_assert!((rect.height - h).abs() < 1e-9);
        }
    }
}

//! Highlight annotations for pattern matches

use crate::error::{Error, Result};
use crate::matcher::Pattern;
use pdfium_render::prelude::*;

/// Stroke color of every highlight annotation (yellow)
pub const HIGHLIGHT_COLOR: PdfColor = PdfColor::new(255, 255, 0, 255);

/// Substrings to search for on a page, in scan order.
///
/// Empty matches are dropped since they have no visual extent.
pub fn plan_page<'t>(text: &'t str, pattern: &Pattern) -> Vec<&'t str> {
    pattern
        .match_texts(text)
        .into_iter()
        .filter(|needle| !needle.is_empty())
        .collect()
}

/// Highlight every occurrence of every match on every page of `document`.
///
/// Each annotation's contents carry a per-document sequence number starting
/// at 1. Returns the number of annotations created.
pub(crate) fn annotate_document(document: &PdfDocument, pattern: &Pattern) -> Result<usize> {
    let pages = document.pages();
    let mut tag: usize = 1;

    for index in 0..pages.len() {
        let mut page = pages.get(index).map_err(|e| Error::Pdfium {
            reason: format!("Failed to get page {}: {}", index + 1, e),
        })?;

        // Collect positions first: the text layer borrows the page immutably
        let occurrences = locate_occurrences(&page, pattern)?;

        for segments in occurrences {
            add_highlight(&mut page, &segments, tag).map_err(|e| Error::Pdfium {
                reason: format!("Failed to annotate page {}: {}", index + 1, e),
            })?;
            tag += 1;
        }
    }

    Ok(tag - 1)
}

/// Bounding boxes of every on-page occurrence of the page's matches.
/// One inner vec per occurrence, one rect per text segment (line) of it.
fn locate_occurrences(page: &PdfPage, pattern: &Pattern) -> Result<Vec<Vec<PdfRect>>> {
    let text_layer = page.text().map_err(|e| Error::Pdfium {
        reason: format!("Failed to load text layer: {}", e),
    })?;
    let text = text_layer.all();
    let options = PdfSearchOptions::new().match_case(false);

    let mut occurrences = Vec::new();

    for needle in plan_page(&text, pattern) {
        let search = text_layer
            .search(needle, &options)
            .map_err(|e| Error::Pdfium {
                reason: format!("Text search failed: {}", e),
            })?;

        for segments in search.iter(PdfSearchDirection::SearchForward) {
            let rects: Vec<PdfRect> = segments.iter().map(|segment| segment.bounds()).collect();
            if !rects.is_empty() {
                occurrences.push(rects);
            }
        }
    }

    Ok(occurrences)
}

fn add_highlight(
    page: &mut PdfPage,
    segments: &[PdfRect],
    tag: usize,
) -> std::result::Result<(), PdfiumError> {
    let mut annotation = page.annotations_mut().create_highlight_annotation()?;

    for rect in segments {
        annotation
            .attachment_points_mut()
            .create_attachment_point_at_end(PdfQuadPoints::from_rect(rect))?;
    }

    annotation.set_bounds(union(segments))?;
    annotation.set_stroke_color(HIGHLIGHT_COLOR)?;
    annotation.set_contents(&tag.to_string())?;

    Ok(())
}

/// Smallest rect enclosing all `rects` (which must be non-empty)
fn union(rects: &[PdfRect]) -> PdfRect {
    let first = rects[0];
    let (mut bottom, mut left, mut top, mut right) = (
        first.bottom().value,
        first.left().value,
        first.top().value,
        first.right().value,
    );

    for rect in &rects[1..] {
        bottom = bottom.min(rect.bottom().value);
        left = left.min(rect.left().value);
        top = top.max(rect.top().value);
        right = right.max(rect.right().value);
    }

    PdfRect::new_from_values(bottom, left, top, right)
}

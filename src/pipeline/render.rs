//! Solutions PDF: lay out a title plus one paragraph per solution and
//! serialise it with lopdf.
//!
//! LaTeX is not typeset. Each solution is wrapped in literal `$$ … $$`
//! delimiters and set as plain Helvetica text, the same way a flowing
//! paragraph would be: whitespace (newlines included) collapses to single
//! spaces and lines wrap greedily at word boundaries.
//!
//! Layout is US-Letter with 72 pt margins. Text width is estimated from an
//! average Helvetica advance; the estimate errs wide so lines stay inside the
//! margin.

use crate::error::SolverError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
/// Average Helvetica advance as a fraction of the font size.
const AVG_CHAR_WIDTH: f32 = 0.55;
const LEADING: f32 = 1.2;
const PARAGRAPH_SPACING: f32 = 6.0;

/// Visual role of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// Helvetica-Bold 18 pt.
    Title,
    /// Helvetica 10 pt.
    Body,
}

impl BlockStyle {
    fn font_key(self) -> &'static str {
        match self {
            BlockStyle::Title => "F2",
            BlockStyle::Body => "F1",
        }
    }

    fn font_size(self) -> f32 {
        match self {
            BlockStyle::Title => 18.0,
            BlockStyle::Body => 10.0,
        }
    }
}

/// One paragraph of the output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub style: BlockStyle,
    pub text: String,
}

/// Title block followed by one `$$ … $$` body block per solution, in order.
pub fn layout_blocks(title: &str, solutions: &[String]) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(solutions.len() + 1);
    blocks.push(Block {
        style: BlockStyle::Title,
        text: title.to_string(),
    });
    blocks.extend(solutions.iter().map(|s| Block {
        style: BlockStyle::Body,
        text: format!("$$ {s} $$"),
    }));
    blocks
}

/// Render the solutions PDF for a download request.
///
/// An empty list is an input error, never an empty document.
pub async fn render_solutions_pdf(
    title: &str,
    solutions: Vec<String>,
) -> Result<Vec<u8>, SolverError> {
    if solutions.is_empty() {
        return Err(SolverError::NoSolutions);
    }
    let blocks = layout_blocks(title, &solutions);
    let bytes = tokio::task::spawn_blocking(move || render_pdf(&blocks))
        .await
        .map_err(|e| SolverError::Internal(format!("Render task panicked: {e}")))??;
    info!(
        "Rendered {} solutions into {} byte PDF",
        solutions.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// A single text line at a fixed position.
#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    style: BlockStyle,
    y: f32,
    text: String,
}

/// Flow blocks onto pages. Always yields at least one page.
fn paginate(blocks: &[Block]) -> Vec<Vec<PlacedLine>> {
    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut y = PAGE_HEIGHT - MARGIN;

    for block in blocks {
        let size = block.style.font_size();
        let line_height = size * LEADING;
        let max_chars = ((PAGE_WIDTH - 2.0 * MARGIN) / (size * AVG_CHAR_WIDTH)) as usize;

        for line in wrap(&block.text, max_chars) {
            if y - line_height < MARGIN {
                pages.push(Vec::new());
                y = PAGE_HEIGHT - MARGIN;
            }
            y -= line_height;
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    style: block.style,
                    y,
                    text: line,
                });
            }
        }
        y -= PARAGRAPH_SPACING;
    }

    pages
}

/// Greedy word wrap; words longer than a line are split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Encode text for a WinAnsi Type1 font; unrepresentable chars become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Serialise blocks into a PDF document.
pub fn render_pdf(blocks: &[Block]) -> Result<Vec<u8>, SolverError> {
    let render_err = |e: lopdf::Error| SolverError::PdfRenderFailed(e.to_string());

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let body_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let title_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => body_font,
            "F2" => title_font,
        },
    });

    let pages = paginate(blocks);
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in &pages {
        let content = Content {
            operations: page_operations(lines),
        };
        let encoded = content.encode().map_err(render_err)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let media_box: Vec<Object> = vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()];
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => media_box,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| SolverError::PdfRenderFailed(e.to_string()))?;
    debug!("PDF: {} blocks on {} pages", blocks.len(), pages.len());
    Ok(buf)
}

/// One BT/ET text object per line.
fn page_operations(lines: &[PlacedLine]) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(lines.len() * 4);
    for line in lines {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![line.style.font_key().into(), line.style.font_size().into()],
        ));
        ops.push(Operation::new("Td", vec![MARGIN.into(), line.y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(&line.text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solutions(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("x_{i} = {i}")).collect()
    }

    #[test]
    fn test_layout_counts_and_order() {
        let blocks = layout_blocks("Solutions:", &solutions(3));
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].style, BlockStyle::Title);
        assert_eq!(blocks[0].text, "Solutions:");
        for (i, block) in blocks[1..].iter().enumerate() {
            assert_eq!(block.style, BlockStyle::Body);
            assert_eq!(block.text, format!("$$ x_{} = {} $$", i + 1, i + 1));
        }
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("a bb ccc", 4), vec!["a bb", "ccc"]);
        assert_eq!(wrap("  many\n\nspaces  ", 80), vec!["many spaces"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert!(wrap("", 10).is_empty());
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("F = ma"), b"F = ma".to_vec());
        assert_eq!(win_ansi("\u{3b1}\u{e9}"), vec![b'?', 0xE9]);
    }

    #[test]
    fn test_paginate_breaks_pages() {
        let long: Vec<String> = (0..120).map(|i| format!("line {i}")).collect();
        let pages = paginate(&layout_blocks("Solutions:", &long));
        assert!(pages.len() > 1, "expected multiple pages");
        for page in &pages {
            for line in page {
                assert!(line.y >= MARGIN);
                assert!(line.y <= PAGE_HEIGHT - MARGIN);
            }
        }
    }

    #[test]
    fn test_render_round_trip_order() {
        let sols = vec![
            "v = d / t".to_string(),
            "F = m a".to_string(),
            "E = m c^2".to_string(),
        ];
        let bytes = render_pdf(&layout_blocks("Solutions:", &sols)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        assert_eq!(pages.len(), 1);
        let text = doc.extract_text(&pages).unwrap();

        let title = text.find("Solutions:").expect("title present");
        let mut last = title;
        for s in &sols {
            let pos = text
                .find(&format!("$$ {s} $$"))
                .unwrap_or_else(|| panic!("missing {s:?} in {text:?}"));
            assert!(pos > last, "out of order: {text:?}");
            last = pos;
        }
        assert_eq!(text.matches("$$ ").count(), sols.len());
    }

    #[test]
    fn test_backslashes_survive() {
        let sols = vec!["\\frac{a}{b} (x)".to_string()];
        let bytes = render_pdf(&layout_blocks("Solutions:", &sols)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("\\frac{a}{b} (x)"), "got: {text:?}");
    }

    #[tokio::test]
    async fn empty_solutions_are_rejected() {
        let err = render_solutions_pdf("Solutions:", Vec::new()).await.unwrap_err();
        assert!(matches!(err, SolverError::NoSolutions));
    }
}

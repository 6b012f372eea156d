use crate::error::ReadAlongError;
use crate::extraction::{Extraction, PageGlyphs, PdfExtractor};
use crate::geometry::Rect;
use crate::model::PositionedGlyph;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// PDF extraction backend using pdftotext (from poppler-utils).
///
/// The logical text comes from a plain `pdftotext` run, word geometry from
/// `pdftotext -bbox`. pdftotext reports words rather than glyphs, so each
/// word is spread evenly over its characters and followed by a blank glyph;
/// the word box builder then reconstructs the original word rectangles.
pub struct PdftotextExtractor {
    program: String,
}

impl PdftotextExtractor {
    pub fn new() -> Self {
        Self::with_program("pdftotext")
    }

    /// Use a pdftotext binary at a non-default name or path.
    pub fn with_program(program: impl Into<String>) -> Self {
        PdftotextExtractor {
            program: program.into(),
        }
    }

    /// Whether the configured binary can be started. pdftotext prints its
    /// version banner to stderr and may exit non-zero for `-v`.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }

    /// Fail early with [`ReadAlongError::PdftotextNotFound`] when the
    /// binary is missing, before any PDF is read.
    pub fn ensure_available(&self) -> Result<(), ReadAlongError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(ReadAlongError::PdftotextNotFound)
        }
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor for PdftotextExtractor {
    fn extract(&self, pdf_bytes: &[u8]) -> Result<Extraction, ReadAlongError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| ReadAlongError::Extraction(e.to_string()))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| ReadAlongError::Extraction(e.to_string()))?;
        let tmp_path = tmpfile.path().to_path_buf();

        let full_text = run_pdftotext(&self.program, &["-enc", "UTF-8"], &tmp_path)?;
        let xhtml = run_pdftotext(&self.program, &["-enc", "UTF-8", "-bbox"], &tmp_path)?;
        let pages = parse_bbox_xhtml(&xhtml)?;
        debug!(
            pages = pages.len(),
            text_bytes = full_text.len(),
            "pdftotext extraction done"
        );

        Ok(Extraction {
            full_text,
            page_count: pages.len(),
            pages,
        })
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

fn run_pdftotext(program: &str, args: &[&str], pdf_path: &Path) -> Result<String, ReadAlongError> {
    let output = Command::new(program)
        .args(args)
        .arg(pdf_path)
        .arg("-") // output to stdout
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ReadAlongError::PdftotextNotFound
            } else {
                ReadAlongError::Extraction(format!("pdftotext {} failed: {}", args.join(" "), e))
            }
        })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(ReadAlongError::PdftotextFailed { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Debug, Default)]
struct WordTag {
    rect: Option<Rect>,
    text: String,
}

/// Parse `pdftotext -bbox` XHTML into per-page glyph runs.
fn parse_bbox_xhtml(xhtml: &str) -> Result<Vec<PageGlyphs>, ReadAlongError> {
    let mut reader = Reader::from_str(xhtml);
    reader.config_mut().trim_text(true);

    let mut pages: Vec<PageGlyphs> = Vec::new();
    let mut word: Option<WordTag> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ReadAlongError::Extraction(format!("bad pdftotext -bbox output: {e}")))?;

        match event {
            Event::Start(tag) => match tag.local_name().as_ref() {
                b"page" => pages.push(PageGlyphs {
                    page: pages.len(),
                    glyphs: Vec::new(),
                }),
                b"word" => {
                    word = Some(WordTag {
                        rect: parse_word_rect(&tag)?,
                        text: String::new(),
                    });
                }
                _ => {}
            },
            Event::Text(text) => {
                if let Some(w) = word.as_mut() {
                    let decoded = text.unescape().map_err(|e| {
                        ReadAlongError::Extraction(format!("bad word text in -bbox output: {e}"))
                    })?;
                    w.text.push_str(&decoded);
                }
            }
            Event::End(tag) if tag.local_name().as_ref() == b"word" => {
                if let (Some(w), Some(page)) = (word.take(), pages.last_mut()) {
                    push_word_glyphs(page, &w);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(pages)
}

fn parse_word_rect(tag: &BytesStart<'_>) -> Result<Option<Rect>, ReadAlongError> {
    let (mut x_min, mut y_min, mut x_max, mut y_max) = (None, None, None, None);

    for attr in tag.attributes() {
        let attr = attr.map_err(|e| ReadAlongError::Extraction(format!("bad word attribute: {e}")))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ReadAlongError::Extraction(format!("bad word attribute: {e}")))?;
        let parsed = value.trim().parse::<f32>().ok();
        match attr.key.as_ref() {
            b"xMin" => x_min = parsed,
            b"yMin" => y_min = parsed,
            b"xMax" => x_max = parsed,
            b"yMax" => y_max = parsed,
            _ => {}
        }
    }

    Ok(match (x_min, y_min, x_max, y_max) {
        (Some(l), Some(t), Some(r), Some(b)) => Some(Rect::new(l, t, r, b)),
        _ => None,
    })
}

fn push_word_glyphs(page: &mut PageGlyphs, word: &WordTag) {
    let Some(rect) = word.rect else {
        return;
    };
    let chars: Vec<char> = word.text.trim().chars().collect();
    if chars.is_empty() {
        return;
    }

    let step = rect.width() / chars.len() as f32;
    for (i, &c) in chars.iter().enumerate() {
        let left = rect.left + step * i as f32;
        let right = if i + 1 == chars.len() {
            rect.right
        } else {
            left + step
        };
        page.glyphs.push(PositionedGlyph::new(
            page.page,
            c,
            Rect::new(left, rect.top, right, rect.bottom),
        ));
    }
    page.glyphs.push(PositionedGlyph::new(
        page.page,
        ' ',
        Rect::new(rect.right, rect.top, rect.right, rect.bottom),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::Extraction;

    const SAMPLE: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title></title>
<meta name="Producer" content="LibreOffice"/>
</head>
<body>
<doc>
  <page width="612.000000" height="792.000000">
    <word xMin="72.000000" yMin="70.000000" xMax="100.000000" yMax="82.000000">Hello</word>
    <word xMin="104.000000" yMin="70.000000" xMax="140.000000" yMax="82.000000">world.</word>
  </page>
  <page width="612.000000" height="792.000000">
    <word xMin="72.000000" yMin="90.000000" xMax="110.000000" yMax="102.000000">Fish&amp;chips</word>
  </page>
</doc>
</body>
</html>
"#;

    #[test]
    fn test_missing_binary_is_reported_up_front() {
        let extractor = PdftotextExtractor::with_program("pdftotext-not-installed-here");
        assert!(!extractor.is_available());
        assert!(matches!(
            extractor.ensure_available(),
            Err(ReadAlongError::PdftotextNotFound)
        ));
        assert!(matches!(
            extractor.extract(b"%PDF-1.4"),
            Err(ReadAlongError::PdftotextNotFound)
        ));
    }

    #[test]
    fn test_parse_bbox_pages_and_words() {
        let pages = parse_bbox_xhtml(SAMPLE).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page, 0);
        // "Hello" + blank + "world." + blank
        assert_eq!(pages[0].glyphs.len(), 13);
        assert!(pages[1].glyphs.iter().all(|g| g.page == 1));
    }

    #[test]
    fn test_glyphs_rebuild_word_rects() {
        let pages = parse_bbox_xhtml(SAMPLE).unwrap();
        let extraction = Extraction {
            full_text: String::new(),
            page_count: pages.len(),
            pages,
        };
        let words = extraction.word_boxes();
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "world.", "Fish&chips"]);
        assert_eq!(words[0].rect, Rect::new(72.0, 70.0, 100.0, 82.0));
        assert_eq!(words[1].rect, Rect::new(104.0, 70.0, 140.0, 82.0));
        assert_eq!(words[2].page, 1);
    }

    #[test]
    fn test_word_without_bbox_is_skipped() {
        let xml = r#"<doc><page><word xMin="1" yMin="2">Broken</word><word xMin="1" yMin="2" xMax="9" yMax="8">ok</word></page></doc>"#;
        let pages = parse_bbox_xhtml(xml).unwrap();
        assert_eq!(pages[0].glyphs.len(), 3);
    }

    #[test]
    fn test_empty_document() {
        let pages = parse_bbox_xhtml("<doc><page></page></doc>").unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].glyphs.is_empty());
    }
}

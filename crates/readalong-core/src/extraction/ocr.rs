use crate::error::ReadAlongError;
use crate::geometry::Rect;
use crate::model::WordBox;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

pub const DEFAULT_OCR_DPI: u32 = 150;

/// A rasterized page as PNG bytes.
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub page: usize,
    pub dpi: u32,
    pub png: Vec<u8>,
}

impl PageRaster {
    /// Factor converting raster pixels to page points.
    pub fn points_per_pixel(&self) -> f32 {
        72.0 / self.dpi.max(1) as f32
    }
}

/// A recognized word with its rectangle in raster pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrFragment {
    pub text: String,
    pub rect: Rect,
}

pub trait PageRenderer: Send + Sync {
    fn render(&self, page: usize) -> Result<PageRaster, ReadAlongError>;
}

pub trait OcrEngine: Send + Sync {
    fn recognize(&self, page: usize, raster: &PageRaster) -> Result<Vec<OcrFragment>, ReadAlongError>;

    fn backend_name(&self) -> &str;
}

/// Renderer and recognizer pair used when extraction finds no glyphs.
pub struct OcrFallback {
    pub renderer: Box<dyn PageRenderer>,
    pub engine: Box<dyn OcrEngine>,
}

impl OcrFallback {
    pub fn new(renderer: Box<dyn PageRenderer>, engine: Box<dyn OcrEngine>) -> Self {
        OcrFallback { renderer, engine }
    }

    /// Recognize every page, in page order, into word boxes in page points.
    pub fn word_boxes(&self, page_count: usize) -> Result<Vec<WordBox>, ReadAlongError> {
        let mut out = Vec::new();
        for page in 0..page_count {
            let raster = self.renderer.render(page)?;
            let scale = raster.points_per_pixel();
            let fragments = self.engine.recognize(page, &raster)?;
            debug!(page, words = fragments.len(), "OCR page recognized");

            out.extend(
                fragments
                    .into_iter()
                    .filter(|f| !f.text.trim().is_empty())
                    .map(|f| WordBox {
                        page,
                        text: f.text.trim().to_string(),
                        rect: f.rect.scaled(scale),
                    }),
            );
        }
        info!(
            engine = self.engine.backend_name(),
            pages = page_count,
            words = out.len(),
            "OCR fallback finished"
        );
        Ok(out)
    }
}

/// Logical text reconstructed from OCR words: spaces within a page,
/// newlines between pages.
pub fn ocr_text(words: &[WordBox]) -> String {
    let mut text = String::new();
    let mut current_page = None;
    for w in words {
        match current_page {
            Some(p) if p == w.page => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        text.push_str(&w.text);
        current_page = Some(w.page);
    }
    text
}

/// Page rasterizer using pdftoppm (from poppler-utils).
pub struct PdftoppmRenderer {
    pdf: tempfile::NamedTempFile,
    dpi: u32,
}

impl PdftoppmRenderer {
    pub fn new(pdf_bytes: &[u8], dpi: u32) -> Result<Self, ReadAlongError> {
        let mut pdf = tempfile::NamedTempFile::new()?;
        pdf.write_all(pdf_bytes)?;
        Ok(PdftoppmRenderer { pdf, dpi })
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn render(&self, page: usize) -> Result<PageRaster, ReadAlongError> {
        let out_dir = tempfile::tempdir()?;
        let prefix = out_dir.path().join("page");
        let page_number = (page + 1).to_string();

        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-singlefile")
            .args(["-r", &self.dpi.to_string()])
            .args(["-f", &page_number, "-l", &page_number])
            .arg(self.pdf.path())
            .arg(&prefix)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ReadAlongError::OcrToolNotFound("pdftoppm".into())
                } else {
                    ReadAlongError::Render {
                        page,
                        reason: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(ReadAlongError::Render {
                page,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let png = std::fs::read(prefix.with_extension("png")).map_err(|e| ReadAlongError::Render {
            page,
            reason: e.to_string(),
        })?;

        Ok(PageRaster {
            page,
            dpi: self.dpi,
            png,
        })
    }
}

/// OCR backend running the tesseract CLI with TSV output.
pub struct TesseractOcr {
    language: String,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        TesseractOcr {
            language: language.into(),
        }
    }

    fn run(&self, page: usize, image: &Path) -> Result<String, ReadAlongError> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.language])
            .arg("tsv")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ReadAlongError::OcrToolNotFound("tesseract".into())
                } else {
                    ReadAlongError::Ocr {
                        page,
                        reason: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(ReadAlongError::Ocr {
                page,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, page: usize, raster: &PageRaster) -> Result<Vec<OcrFragment>, ReadAlongError> {
        let mut image = tempfile::Builder::new().suffix(".png").tempfile()?;
        image.write_all(&raster.png)?;
        let tsv = self.run(page, image.path())?;
        Ok(parse_tesseract_tsv(&tsv))
    }

    fn backend_name(&self) -> &str {
        "tesseract"
    }
}

/// Word-level rows (level 5) with a non-negative confidence.
fn parse_tesseract_tsv(tsv: &str) -> Vec<OcrFragment> {
    let mut out = Vec::new();

    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }

        let conf: f32 = cols[10].trim().parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }

        let nums: Option<Vec<f32>> = cols[6..10].iter().map(|c| c.trim().parse().ok()).collect();
        if let Some([left, top, width, height]) = nums.as_deref() {
            out.push(OcrFragment {
                text: text.to_string(),
                rect: Rect::new(*left, *top, left + width, top + height),
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t1275\t1650\t-1\t
4\t1\t1\t1\t1\t0\t150\t200\t400\t40\t-1\t
5\t1\t1\t1\t1\t1\t150\t200\t120\t40\t96.3\tScanned
5\t1\t1\t1\t1\t2\t290\t200\t80\t40\t91\ttext.
5\t1\t1\t1\t1\t3\t380\t200\t10\t40\t-1\t
";

    #[test]
    fn test_parse_tesseract_tsv() {
        let frags = parse_tesseract_tsv(TSV);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].text, "Scanned");
        assert_eq!(frags[0].rect, Rect::new(150.0, 200.0, 270.0, 240.0));
        assert_eq!(frags[1].text, "text.");
    }

    struct FakeRenderer {
        rendered: Mutex<Vec<usize>>,
    }

    impl PageRenderer for FakeRenderer {
        fn render(&self, page: usize) -> Result<PageRaster, ReadAlongError> {
            self.rendered.lock().unwrap().push(page);
            Ok(PageRaster {
                page,
                dpi: 144,
                png: Vec::new(),
            })
        }
    }

    struct FakeOcr;

    impl OcrEngine for FakeOcr {
        fn recognize(&self, page: usize, _raster: &PageRaster) -> Result<Vec<OcrFragment>, ReadAlongError> {
            if page == 1 {
                return Ok(vec![OcrFragment {
                    text: "  ".into(),
                    rect: Rect::new(0.0, 0.0, 1.0, 1.0),
                }]);
            }
            Ok(vec![
                OcrFragment {
                    text: format!("page{page}"),
                    rect: Rect::new(200.0, 100.0, 400.0, 140.0),
                },
                OcrFragment {
                    text: "end.".into(),
                    rect: Rect::new(420.0, 100.0, 500.0, 140.0),
                },
            ])
        }

        fn backend_name(&self) -> &str {
            "fake"
        }
    }

    #[test]
    fn test_fallback_scales_to_points_and_keeps_page_order() {
        let renderer = FakeRenderer {
            rendered: Mutex::new(Vec::new()),
        };
        let fallback = OcrFallback::new(Box::new(renderer), Box::new(FakeOcr));
        let words = fallback.word_boxes(3).unwrap();

        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["page0", "end.", "page2", "end."]);
        // 144 dpi: half a point per pixel.
        assert_eq!(words[0].rect, Rect::new(100.0, 50.0, 200.0, 70.0));
        assert_eq!(words[2].page, 2);
        assert_eq!(ocr_text(&words), "page0 end.\npage2 end.");
    }

    #[test]
    fn test_ocr_text_empty() {
        assert_eq!(ocr_text(&[]), "");
    }
}

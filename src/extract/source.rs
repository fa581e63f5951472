//! Page sources for identifier extraction
//!
//! A [`PageSource`] is an ordered sequence of pages that can each yield a
//! text layer and be rasterized. [`PdfPages`] implements it with MuPDF.
//!
//! MuPDF's `fz_context` is not thread-safe, so every operation opens a fresh
//! document from the owned bytes and drops it before returning. Nothing
//! MuPDF-owned outlives a single call.

use std::io::Cursor;
use std::path::Path;

use mupdf::{Colorspace, Document, Matrix};

use super::ExtractError;

/// PDF user-space units per inch
const POINTS_PER_INCH: f32 = 72.0;

/// An ordered, page-oriented document
pub trait PageSource: Send + Sync + 'static {
    /// Text layer of each page, in page order. Pages without text yield "".
    fn page_texts(&self) -> Result<Vec<String>, ExtractError>;

    /// Each page rendered at `dpi` and encoded as PNG, in page order
    fn rasterize_pages(&self, dpi: u32) -> Result<Vec<Vec<u8>>, ExtractError>;
}

/// A PDF held in memory
pub struct PdfPages {
    data: Vec<u8>,
}

impl PdfPages {
    /// Wrap PDF bytes, validating that MuPDF can open them
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ExtractError> {
        let pages = Self { data };
        let doc = pages.open_document()?;
        let count = doc.page_count()?;
        tracing::debug!(pages = count, "Opened PDF for identifier extraction");
        Ok(pages)
    }

    /// Read a PDF from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(data)
    }

    fn open_document(&self) -> Result<Document, ExtractError> {
        Document::from_bytes(&self.data, "application/pdf").map_err(Into::into)
    }

    /// Encode an RGB(A) pixmap as PNG
    fn encode_pixmap(pixmap: &mupdf::Pixmap) -> Result<Vec<u8>, ExtractError> {
        let width = pixmap.width() as u32;
        let height = pixmap.height() as u32;
        let samples = pixmap.samples();
        let n = pixmap.n() as usize; // components per pixel

        let mut rgb_buffer = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height as usize {
            for x in 0..width as usize {
                let offset = (y * width as usize + x) * n;
                let r = samples.get(offset).copied().unwrap_or(255);
                let g = samples.get(offset + 1).copied().unwrap_or(r);
                let b = samples.get(offset + 2).copied().unwrap_or(r);
                rgb_buffer.extend_from_slice(&[r, g, b]);
            }
        }

        let img = image::RgbImage::from_raw(width, height, rgb_buffer)
            .ok_or_else(|| ExtractError::Image("Failed to create image buffer".to_string()))?;

        let mut output = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
            .map_err(|e| ExtractError::Image(e.to_string()))?;

        Ok(output)
    }
}

impl PageSource for PdfPages {
    fn page_texts(&self) -> Result<Vec<String>, ExtractError> {
        let doc = self.open_document()?;
        let count = doc.page_count()?;

        let mut texts = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            let page = doc.load_page(index)?;
            texts.push(page.to_text()?);
        }
        Ok(texts)
    }

    fn rasterize_pages(&self, dpi: u32) -> Result<Vec<Vec<u8>>, ExtractError> {
        let doc = self.open_document()?;
        let count = doc.page_count()?;

        let zoom = dpi as f32 / POINTS_PER_INCH;
        let matrix = Matrix::new_scale(zoom, zoom);
        let colorspace = Colorspace::device_rgb();

        let mut images = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            let page = doc.load_page(index)?;
            let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;
            images.push(Self::encode_pixmap(&pixmap)?);
        }
        Ok(images)
    }
}

/// In-memory pages for tests: fixed text layers and opaque page images
#[cfg(test)]
pub struct StaticPages {
    pub texts: Vec<String>,
    pub fail_rasterize: bool,
}

#[cfg(test)]
impl StaticPages {
    pub fn new(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|t| t.to_string()).collect(),
            fail_rasterize: false,
        }
    }
}

#[cfg(test)]
impl PageSource for StaticPages {
    fn page_texts(&self) -> Result<Vec<String>, ExtractError> {
        Ok(self.texts.clone())
    }

    fn rasterize_pages(&self, dpi: u32) -> Result<Vec<Vec<u8>>, ExtractError> {
        if self.fail_rasterize {
            return Err(ExtractError::Render("rasterizer unavailable".to_string()));
        }
        Ok(self
            .texts
            .iter()
            .enumerate()
            .map(|(i, _)| format!("page-{}@{}", i, dpi).into_bytes())
            .collect())
    }
}

/// A one-page PDF whose text layer holds `text`, set in Helvetica
#[cfg(test)]
pub fn single_page_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 20 50 Td ({}) Tj ET", text);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 240 100] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", index + 1, body).as_bytes());
    }

    let xref = pdf.len();
    pdf.extend_from_slice(
        format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes(),
    );
    for offset in offsets {
        pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    pdf
}

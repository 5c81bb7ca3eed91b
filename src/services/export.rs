//! Summary export.
//!
//! Lays the summary document out into fixed-width lines, paginates it onto
//! A4 pages of fixed height and writes a multi-page PDF. If layout or the PDF
//! write fails the plain summary text is written instead.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::types::article::Article;
use crate::types::errors::ExportError;

/// A4 width in millimetres.
pub const PAGE_WIDTH_MM: f64 = 210.0;
/// Page height in millimetres used for pagination.
pub const PAGE_HEIGHT_MM: f64 = 295.0;

const POINTS_PER_MM: f64 = 72.0 / 25.4;
const MARGIN_PT: f64 = 48.0;
const FONT_SIZE_PT: f64 = 10.0;
const LINE_HEIGHT_PT: f64 = 14.0;

/// Output format actually written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Text,
}

/// Result of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub pages: usize,
}

/// File-name stem: ASCII alphanumerics lower-cased, everything else `_`.
pub fn slugify(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Greedy word wrap. Words longer than `width` are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let len = line.chars().count();
            if len > 0 && len + 1 + word.len() > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.extend(word);
        }
        lines.push(line);
    }
    lines
}

/// Number of text lines that fit on one page.
pub fn lines_per_page() -> usize {
    let usable = PAGE_HEIGHT_MM * POINTS_PER_MM - 2.0 * MARGIN_PT;
    (usable / LINE_HEIGHT_PT).floor() as usize
}

/// Splits laid-out lines into pages. Always yields at least one page.
pub fn paginate(lines: &[String], per_page: usize) -> Vec<Vec<String>> {
    if lines.is_empty() || per_page == 0 {
        return vec![Vec::new()];
    }
    lines.chunks(per_page).map(|chunk| chunk.to_vec()).collect()
}

/// Lays the summary document out into lines of at most `width` characters.
pub fn layout_document(article: &Article, summary: &str, width: usize) -> Result<Vec<String>, ExportError> {
    if width < 20 {
        return Err(ExportError::Layout(format!("line width {} is too narrow", width)));
    }
    let mut lines = vec!["RESEARCH ARTICLE SUMMARY".to_string(), "=".repeat(width.min(40)), String::new()];
    lines.extend(wrap(&article.title, width));
    lines.push(String::new());
    lines.push("Abstract".to_string());
    lines.extend(wrap(
        article.abstract_text.as_deref().unwrap_or("No abstract available"),
        width,
    ));
    lines.push(String::new());
    lines.push("Publication Details".to_string());
    let citations = article
        .citations
        .as_deref()
        .map(|c| format!("Cited by {}", c))
        .unwrap_or_else(|| "Not available".to_string());
    for detail in [
        format!("Source: {}", article.source.as_deref().unwrap_or("Unknown source")),
        format!("Year: {}", article.year.as_deref().unwrap_or("Not specified")),
        format!("Citations: {}", citations),
    ] {
        lines.extend(wrap(&detail, width));
    }
    lines.push(String::new());
    lines.push("Summary".to_string());
    lines.extend(wrap(summary, width));
    Ok(lines)
}

/// Encodes a line for a PDF literal string in WinAnsi, escaping delimiters.
fn pdf_literal(line: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len() + 2);
    out.push(b'(');
    for ch in line.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(ch as u8);
            }
            '•' => out.push(0x95),
            '\u{2013}' => out.push(0x96),
            '\u{2014}' => out.push(0x97),
            c if (c as u32) < 0x20 => out.push(b' '),
            c if (c as u32) < 0x7f => out.push(c as u8),
            c if (0xa0..=0xff).contains(&(c as u32)) => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out.push(b')');
    out
}

fn page_stream(lines: &[String], page_height_pt: f64) -> Vec<u8> {
    let mut stream = Vec::new();
    let top = page_height_pt - MARGIN_PT - FONT_SIZE_PT;
    stream.extend_from_slice(
        format!("BT\n/F1 {} Tf\n{} TL\n{} {} Td\n", FONT_SIZE_PT, LINE_HEIGHT_PT, MARGIN_PT, top).as_bytes(),
    );
    for line in lines {
        stream.extend_from_slice(&pdf_literal(line));
        stream.extend_from_slice(b" Tj T*\n");
    }
    stream.extend_from_slice(b"ET\n");
    stream
}

/// Writes paginated lines as a PDF document.
pub fn render_pdf(pages: &[Vec<String>]) -> Vec<u8> {
    let width_pt = PAGE_WIDTH_MM * POINTS_PER_MM;
    let height_pt = PAGE_HEIGHT_MM * POINTS_PER_MM;

    // Objects: 1 catalog, 2 page tree, 3 font, then (page, content) pairs.
    let mut objects: Vec<Vec<u8>> = Vec::new();
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
    objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()).into_bytes());
    objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec());

    for (i, page) in pages.iter().enumerate() {
        let content_id = 5 + 2 * i;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                width_pt, height_pt, content_id
            )
            .into_bytes(),
        );
        let stream = page_stream(page, height_pt);
        let mut content = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        content.extend_from_slice(&stream);
        content.extend_from_slice(b"endstream");
        objects.push(content);
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }
    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in &offsets {
        let _ = writeln!(xref, "{:010} 00000 n ", offset);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    );
    out.extend_from_slice(xref.as_bytes());
    out
}

/// Writes summary documents to a directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    line_width: usize,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>, line_width: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            line_width,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_pdf(&self, article: &Article, summary: &str, path: &Path) -> Result<usize, ExportError> {
        let lines = layout_document(article, summary, self.line_width)?;
        let pages = paginate(&lines, lines_per_page());
        fs::create_dir_all(&self.output_dir)?;
        fs::write(path, render_pdf(&pages))?;
        Ok(pages.len())
    }

    /// Exports the summary as a PDF, falling back to a text file.
    pub fn export(&self, article: &Article, summary: &str) -> Result<ExportedFile, ExportError> {
        let stem = format!("{}_summary", slugify(&article.title));
        let pdf_path = self.output_dir.join(format!("{}.pdf", stem));

        match self.write_pdf(article, summary, &pdf_path) {
            Ok(pages) => {
                info!(path = %pdf_path.display(), pages, "exported summary as PDF");
                Ok(ExportedFile {
                    path: pdf_path,
                    format: ExportFormat::Pdf,
                    pages,
                })
            }
            Err(e) => {
                warn!(error = %e, "PDF export failed, writing plain text instead");
                let txt_path = self.output_dir.join(format!("{}.txt", stem));
                fs::create_dir_all(&self.output_dir)?;
                fs::write(&txt_path, summary)?;
                Ok(ExportedFile {
                    path: txt_path,
                    format: ExportFormat::Text,
                    pages: 1,
                })
            }
        }
    }
}

//! Tabular reports as minimal PDF 1.4 documents: built-in Helvetica fonts,
//! one content stream per page and a classic cross-reference table.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use super::csv::display_value;
use super::schema::FieldDef;
use super::SchemeError;
use crate::config::CONFIG;
use crate::database::DynamicRepository;

const PAGE_WIDTH: f32 = 792.0;
const PAGE_HEIGHT: f32 = 612.0;
const MARGIN: f32 = 36.0;
const FONT_SIZE: f32 = 8.0;
const LEADING: f32 = 12.0;
/// Space used by the title, subtitle and header row
const HEADER_SPACE: f32 = 72.0;

#[derive(Debug, Clone)]
pub struct PdfTable {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Escape a string for a PDF literal; characters outside Latin-1 printable ASCII become '?'
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn fit(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

impl PdfTable {
    /// Rows that fit on one page below the header block
    pub fn rows_per_page(&self) -> usize {
        let fits = ((PAGE_HEIGHT - 2.0 * MARGIN - HEADER_SPACE) / LEADING) as usize;
        CONFIG.scheme.pdf_rows_per_page.clamp(1, fits.max(1))
    }

    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.rows_per_page()).max(1)
    }

    fn page_content(&self, page: usize, rows: &[Vec<String>]) -> String {
        let columns = self.header.len().max(1);
        let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f32;
        // Helvetica averages about half an em per character
        let max_chars = ((column_width / (FONT_SIZE * 0.5)) as usize).max(4);

        let mut content = String::new();
        let mut y = PAGE_HEIGHT - MARGIN - 14.0;
        let text = |content: &mut String, font: &str, size: f32, x: f32, y: f32, s: &str| {
            let _ = writeln!(
                content,
                "BT /{} {} Tf {:.2} {:.2} Td ({}) Tj ET",
                font,
                size,
                x,
                y,
                escape_text(s)
            );
        };

        text(&mut content, "F2", 14.0, MARGIN, y, &self.title);
        y -= 18.0;
        let subtitle = format!(
            "Generated {}  -  Page {} of {}",
            self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            page + 1,
            self.page_count()
        );
        text(&mut content, "F1", FONT_SIZE, MARGIN, y, &subtitle);
        y -= LEADING * 2.0;

        for (i, cell) in self.header.iter().enumerate() {
            text(&mut content, "F2", FONT_SIZE, MARGIN + column_width * i as f32, y, &fit(cell, max_chars));
        }
        let _ = writeln!(
            content,
            "{:.2} {:.2} m {:.2} {:.2} l S",
            MARGIN,
            y - 3.0,
            PAGE_WIDTH - MARGIN,
            y - 3.0
        );
        y -= LEADING;

        for row in rows {
            for (i, cell) in row.iter().enumerate().take(columns) {
                text(&mut content, "F1", FONT_SIZE, MARGIN + column_width * i as f32, y, &fit(cell, max_chars));
            }
            y -= LEADING;
        }
        content
    }

    pub fn render(&self) -> Vec<u8> {
        let per_page = self.rows_per_page();
        let pages: Vec<&[Vec<String>]> = if self.rows.is_empty() {
            vec![&self.rows[..]]
        } else {
            self.rows.chunks(per_page).collect()
        };

        // 1 catalog, 2 page tree, 3 and 4 fonts, then a page and its content per page
        let page_ids: Vec<usize> = (0..pages.len()).map(|i| 5 + i * 2).collect();
        let mut objects: Vec<String> = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                page_ids.iter().map(|id| format!("{} 0 R", id)).collect::<Vec<_>>().join(" "),
                pages.len()
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>".to_string(),
        ];
        for (i, rows) in pages.iter().enumerate() {
            let content = self.page_content(i, rows);
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                page_ids[i] + 1
            ));
            objects.push(format!("<< /Length {} >>\nstream\n{}endstream", content.len(), content));
        }

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            let _ = write!(out, "{} 0 obj\n{}\nendobj\n", i + 1, body);
        }

        let xref_at = out.len();
        let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = write!(out, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        );
        out.into_bytes()
    }
}

pub async fn generate(repo: &DynamicRepository<'_>) -> Result<Vec<u8>, SchemeError> {
    let schema = repo.schema();
    let rows = repo.select_filter(&repo.filter()).await?;
    let fields: Vec<&FieldDef> = schema.report_fields().collect();

    let table = PdfTable {
        title: format!("{} report", schema.name),
        generated_at: Utc::now(),
        header: fields.iter().map(|f| f.label.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| fields.iter().map(|f| display_value(row.get(f.name))).collect())
            .collect(),
    };
    Ok(table.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize) -> PdfTable {
        PdfTable {
            title: "item report".to_string(),
            generated_at: Utc::now(),
            header: vec!["Name".to_string(), "Serial".to_string()],
            rows: (0..rows).map(|i| vec![format!("Item {}", i), format!("S-{}", i)]).collect(),
        }
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_text("café"), "caf?");
    }

    #[test]
    fn test_fit_truncates() {
        assert_eq!(fit("short", 10), "short");
        assert_eq!(fit("a very long cell value", 10), "a very ...");
    }

    #[test]
    fn test_render_structure() {
        let pdf = String::from_utf8(table(3).render()).unwrap();
        assert!(pdf.starts_with("%PDF-1.4\n"));
        assert!(pdf.ends_with("%%EOF\n"));
        assert!(pdf.contains("/Count 1"));
        assert!(pdf.contains("(Item 2) Tj"));
        assert!(pdf.contains("(item report) Tj"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let pdf = String::from_utf8(table(2).render()).unwrap();
        let xref_at: usize = pdf
            .lines()
            .rev()
            .nth(1)
            .and_then(|l| l.parse().ok())
            .unwrap();
        assert!(pdf[xref_at..].starts_with("xref\n"));

        let entries: Vec<usize> = pdf[xref_at..]
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        assert_eq!(entries.len(), 6);
        for (i, offset) in entries.iter().enumerate() {
            assert!(pdf[*offset..].starts_with(&format!("{} 0 obj", i + 1)));
        }
    }

    #[test]
    fn test_paginates_rows() {
        let t = table(100);
        let per_page = t.rows_per_page();
        let pdf = String::from_utf8(t.render()).unwrap();
        let expected = 100usize.div_ceil(per_page);
        assert!(pdf.contains(&format!("/Count {}", expected)));
        assert!(pdf.contains(&format!("Page {} of {}", expected, expected)));
    }

    #[test]
    fn test_empty_report_has_one_page() {
        let pdf = String::from_utf8(table(0).render()).unwrap();
        assert!(pdf.contains("/Count 1"));
    }
}

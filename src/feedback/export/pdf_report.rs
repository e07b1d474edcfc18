use std::{fs::File, path::PathBuf};

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};

use crate::feedback::{
    Feedback,
    export::{DATE_FORMAT, ExportError},
    form_schema::{FormSchema, KnownField, KnownSection},
};

const A4_SHORT: f32 = 210.0;
const A4_LONG: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE: f32 = 6.0;

/// Renders feedback as PDF documents.
///
/// Text is set in the font at `font_path` when one is configured, which
/// should cover the secondary locale's script. When it cannot be loaded the
/// builtin Helvetica is used instead and such text may come out garbled.
#[derive(Debug, Clone, Default)]
pub struct PdfExporter {
    font_path: Option<PathBuf>,
}

impl PdfExporter {
    pub fn new(font_path: Option<PathBuf>) -> Self {
        Self { font_path }
    }

    fn font(&self, doc: &PdfDocumentReference) -> Result<IndirectFontRef, ExportError> {
        if let Some(path) = &self.font_path {
            let loaded = File::open(path)
                .map_err(|e| e.to_string())
                .and_then(|file| doc.add_external_font(file).map_err(|e| e.to_string()));
            match loaded {
                Ok(font) => return Ok(font),
                Err(e) => tracing::warn!(
                    "could not load PDF font {}: {e}; falling back to Helvetica",
                    path.display()
                ),
            }
        }
        doc.add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(e.to_string()))
    }

    /// A one-record report: identity, a table of ratings (default sections,
    /// then custom sections by key) and the suggestions.
    pub fn single(
        &self,
        record: &Feedback,
        schema: &FormSchema,
    ) -> Result<Vec<u8>, ExportError> {
        let (doc, page, layer) = PdfDocument::new(
            "Feedback report",
            Mm(A4_SHORT),
            Mm(A4_LONG),
            "Layer 1",
        );
        let font = self.font(&doc)?;
        let mut out = PageWriter {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            font,
            width: A4_SHORT,
            height: A4_LONG,
            y: A4_LONG - MARGIN,
            page: 0,
        };

        out.text(MARGIN, "Feedback report", 18.0);
        out.advance(LINE * 2.0);
        out.text(
            MARGIN,
            &format!("Submitted: {}", record.created_at.format(DATE_FORMAT)),
            10.0,
        );
        out.advance(LINE);

        let custom = record.custom_data().unwrap_or_default();
        for field in KnownField::ALL {
            let label = schema
                .field(field.key())
                .map(|f| f.label.as_str())
                .unwrap_or(field.default_label());
            out.text(
                MARGIN,
                &format!("{label}: {}", record.field(field).unwrap_or("-")),
                10.0,
            );
            out.advance(LINE);
        }
        let mut field_keys: Vec<&String> = custom.fields.keys().collect();
        field_keys.sort();
        for key in field_keys {
            let value = &custom.fields[key];
            out.text(
                MARGIN,
                &format!("{}: {}", schema.field_label(key), or_dash(value)),
                10.0,
            );
            out.advance(LINE);
        }

        out.advance(LINE);
        out.text(MARGIN, "Category", 11.0);
        out.text(MARGIN + 70.0, "Rating", 11.0);
        out.text(MARGIN + 95.0, "Comment", 11.0);
        out.advance(LINE);

        for section in KnownSection::ALL {
            let label = schema
                .section(section.key())
                .map(|s| s.label.as_str())
                .unwrap_or(section.default_label());
            out.rating_row(
                label,
                record.rating(section).map(|r| format!("{r}/5")),
                record.comments(section),
            );
        }
        let mut section_keys: Vec<&String> = custom.sections.keys().collect();
        section_keys.sort();
        for key in section_keys {
            let answer = &custom.sections[key];
            out.rating_row(
                schema.section_label(key),
                answer.rating.map(|r| format!("{r}/5")),
                answer.comments.as_deref(),
            );
        }

        if let Some(suggestions) = &record.suggestions {
            out.advance(LINE);
            out.text(MARGIN, "Suggestions", 11.0);
            out.advance(LINE);
            out.paragraph(MARGIN, suggestions, 95);
        }

        drop(out);
        doc.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))
    }

    /// A landscape summary table with one line per record. Custom answers
    /// are left out.
    pub fn bulk(
        &self,
        records: &[Feedback],
        schema: &FormSchema,
    ) -> Result<Vec<u8>, ExportError> {
        let (doc, page, layer) = PdfDocument::new(
            "Feedback summary",
            Mm(A4_LONG),
            Mm(A4_SHORT),
            "Layer 1",
        );
        let font = self.font(&doc)?;
        let mut out = PageWriter {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            font,
            width: A4_LONG,
            height: A4_SHORT,
            y: A4_SHORT - MARGIN,
            page: 0,
        };

        out.text(
            MARGIN,
            &format!("Feedback summary ({} responses)", records.len()),
            16.0,
        );
        out.advance(LINE * 2.0);

        let columns = bulk_columns();
        bulk_header(&mut out, schema);
        let mut page = out.page;

        for record in records {
            if out.page != page {
                bulk_header(&mut out, schema);
                page = out.page;
            }
            out.text(
                columns[0],
                &truncate(record.name.as_deref().unwrap_or("-"), 30),
                9.0,
            );
            out.text(columns[1], record.phone.as_deref().unwrap_or("-"), 9.0);
            for (i, section) in KnownSection::ALL.into_iter().enumerate() {
                let rating = record
                    .rating(section)
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "-".to_string());
                out.text(columns[2 + i], &rating, 9.0);
            }
            out.text(
                columns[7],
                &record.created_at.format(DATE_FORMAT).to_string(),
                9.0,
            );
            out.advance(LINE);
        }

        drop(out);
        doc.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))
    }
}

fn bulk_header(out: &mut PageWriter<'_>, schema: &FormSchema) {
    let columns = bulk_columns();
    out.text(columns[0], "Name", 9.0);
    out.text(columns[1], "Phone", 9.0);
    for (i, section) in KnownSection::ALL.into_iter().enumerate() {
        let label = schema
            .section(section.key())
            .map(|s| s.label.as_str())
            .unwrap_or(section.default_label());
        out.text(columns[2 + i], &truncate(label, 18), 9.0);
    }
    out.text(columns[7], "Submitted", 9.0);
    out.advance(LINE);
}

fn bulk_columns() -> [f32; 8] {
    [
        MARGIN,
        MARGIN + 60.0,
        MARGIN + 95.0,
        MARGIN + 120.0,
        MARGIN + 145.0,
        MARGIN + 170.0,
        MARGIN + 195.0,
        MARGIN + 225.0,
    ]
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

/// Greedy word wrap by character count.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let needed = line.chars().count() + word.chars().count() + 1;
            if !line.is_empty() && needed > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

/// Writes lines top to bottom, starting a new page when the bottom margin is
/// reached.
struct PageWriter<'d> {
    doc: &'d PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    width: f32,
    height: f32,
    y: f32,
    page: usize,
}

impl PageWriter<'_> {
    fn text(&self, x: f32, text: &str, size: f32) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), &self.font);
    }

    fn advance(&mut self, by: f32) {
        self.y -= by;
        if self.needs_page() {
            self.new_page();
        }
    }

    fn needs_page(&self) -> bool {
        self.y < MARGIN
    }

    fn new_page(&mut self) {
        let (page, layer) =
            self.doc.add_page(Mm(self.width), Mm(self.height), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = self.height - MARGIN;
        self.page += 1;
    }

    fn paragraph(&mut self, x: f32, text: &str, width: usize) {
        for line in wrap(text, width) {
            self.text(x, &line, 10.0);
            self.advance(LINE);
        }
    }

    fn rating_row(&mut self, label: &str, rating: Option<String>, comments: Option<&str>) {
        self.text(MARGIN, &truncate(label, 40), 10.0);
        self.text(MARGIN + 70.0, rating.as_deref().unwrap_or("-"), 10.0);
        match comments {
            Some(comments) => self.paragraph(MARGIN + 95.0, comments, 50),
            None => self.advance(LINE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{
        CustomData, CustomSectionAnswer,
        test_support::{record, with_custom},
    };

    fn is_pdf(bytes: &[u8]) -> bool {
        bytes.starts_with(b"%PDF")
    }

    #[test]
    fn single_report_renders() {
        let mut custom = CustomData::default();
        custom.sections.insert(
            "custom_1".into(),
            CustomSectionAnswer {
                rating: Some(3),
                comments: Some("ok".into()),
            },
        );
        custom.fields.insert("field_1".into(), "Kandy".into());
        let mut r = with_custom(record("1", 5), custom);
        r.name = Some("Ama".into());
        r.suggestions = Some("More tea breaks ".repeat(40));

        let bytes = PdfExporter::default()
            .single(&r, &FormSchema::default())
            .unwrap();
        assert!(is_pdf(&bytes));
    }

    #[test]
    fn bulk_report_paginates() {
        let records: Vec<_> = (0..120)
            .map(|i| record(&i.to_string(), i % 5 + 1))
            .collect();
        let bytes = PdfExporter::default()
            .bulk(&records, &FormSchema::default())
            .unwrap();
        assert!(is_pdf(&bytes));
    }

    #[test]
    fn missing_font_falls_back() {
        let exporter =
            PdfExporter::new(Some(PathBuf::from("/nonexistent/NotoSansSinhala.ttf")));
        let bytes = exporter.bulk(&[], &FormSchema::default()).unwrap();
        assert!(is_pdf(&bytes));
    }

    #[test]
    fn wrapping_and_truncation() {
        assert_eq!(wrap("aa bb cc", 5), ["aa bb", "cc"]);
        assert_eq!(wrap("one\ntwo", 80), ["one", "two"]);
        assert_eq!(truncate("Sessions & Speakers", 10), "Session...");
        assert_eq!(truncate("Venue", 10), "Venue");
    }
}

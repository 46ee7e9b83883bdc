//! Human-readable PDF rendition of a metadata record
//!
//! A4 pages set in the standard Helvetica faces, so no font is embedded.
//! Text is encoded as WinAnsi; characters outside it print as `?`.

use geometa_core::models::{ArtifactKind, MetadataRecord};
use geometa_core::profile::format_number;
use geometa_core::{MetadataError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: f64 = 56.0;

/// Characters per body line at 10pt
const WRAP_COLUMNS: usize = 92;

const PRODUCER: &str = concat!("geometa ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
}

impl Face {
    fn resource(&self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    face: Face,
    size: f64,
    text: String,
    /// Extra space above the line
    gap: f64,
}

impl Line {
    fn leading(&self) -> f64 {
        self.size * 1.4 + self.gap
    }
}

/// Render the record as a PDF document
pub fn write_record(record: &MetadataRecord) -> Result<Vec<u8>> {
    let lines = layout(record);
    let pages = paginate(&lines);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Face::Regular.resource() => regular_id,
            Face::Bold.resource() => bold_id,
        },
    });

    let mut kids: Vec<ObjectId> = Vec::with_capacity(pages.len());
    for page in &pages {
        let content = Content { operations: page_operations(page) };
        let encoded = content.encode().map_err(pdf_error)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        kids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        }));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<Object>>(),
            "Count" => Object::Integer(page_count),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(win_ansi(&record.identification.title), StringFormat::Literal),
        "Author" => Object::String(win_ansi(&record.contact.organisation_name), StringFormat::Literal),
        "Producer" => Object::string_literal(PRODUCER),
        "CreationDate" => Object::string_literal(
            record.date_stamp.format("D:%Y%m%d%H%M%SZ").to_string(),
        ),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(pdf_error)?;
    Ok(bytes)
}

fn pdf_error(err: impl std::fmt::Display) -> MetadataError {
    MetadataError::export(ArtifactKind::Pdf, err)
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn page_operations(lines: &[Line]) -> Vec<Operation> {
    let mut ops = vec![Operation::new("BT", vec![])];
    let mut y = PAGE_HEIGHT as f64 - MARGIN;

    for line in lines {
        y -= line.leading();
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(line.face.resource().as_bytes().to_vec()), Object::Real(line.size as f32)],
        ));
        // Absolute positioning through the text matrix
        ops.push(Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(MARGIN as f32),
                Object::Real(y as f32),
            ],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(&line.text), StringFormat::Literal)],
        ));
    }

    ops.push(Operation::new("ET", vec![]));
    ops
}

fn paginate(lines: &[Line]) -> Vec<Vec<Line>> {
    let usable = PAGE_HEIGHT as f64 - 2.0 * MARGIN;
    let mut pages: Vec<Vec<Line>> = vec![Vec::new()];
    let mut used = 0.0;

    for line in lines {
        let mut line = line.clone();
        if used + line.leading() > usable {
            pages.push(Vec::new());
            used = 0.0;
            line.gap = 0.0;
        }
        used += line.leading();
        if let Some(page) = pages.last_mut() {
            page.push(line);
        }
    }

    pages
}

/// Builds the line list section by section
#[derive(Default)]
struct Layout {
    lines: Vec<Line>,
}

impl Layout {
    fn title(&mut self, text: &str) {
        for (i, part) in wrap(text, 56).into_iter().enumerate() {
            self.lines.push(Line { face: Face::Bold, size: 16.0, text: part, gap: if i == 0 { 0.0 } else { 2.0 } });
        }
    }

    fn heading(&mut self, text: &str) {
        self.lines.push(Line { face: Face::Bold, size: 12.0, text: text.to_string(), gap: 10.0 });
    }

    fn paragraph(&mut self, text: &str) {
        for part in wrap(text, WRAP_COLUMNS) {
            self.lines.push(Line { face: Face::Regular, size: 10.0, text: part, gap: 0.0 });
        }
    }

    fn field(&mut self, label: &str, value: &str) {
        self.paragraph(&format!("{}: {}", label, value));
    }

    fn opt_field(&mut self, label: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.field(label, value);
        }
    }
}

fn layout(record: &MetadataRecord) -> Vec<Line> {
    let id = &record.identification;
    let grid = &record.grid;
    let mut l = Layout::default();

    l.title(&id.title);

    l.heading("Identification");
    l.paragraph(&id.abstract_text);
    l.opt_field("Purpose", id.purpose.as_deref());
    l.field("File identifier", &record.file_identifier.to_string());
    if let Some(date) = id.citation_date {
        l.field("Revision date", &date.format("%Y-%m-%d").to_string());
    }
    if !id.topic_categories.is_empty() {
        l.field("Topic categories", &id.topic_categories.join(", "));
    }
    if let Some(graphic) = &id.browse_graphic {
        l.field("Browse graphic", &graphic.file_name);
    }

    if !id.keywords.is_empty() {
        l.heading("Keywords");
        for group in &id.keywords {
            let keywords = group.keywords.join(", ");
            match &group.thesaurus {
                Some(thesaurus) => l.field(&thesaurus.title, &keywords),
                None => l.field(group.keyword_type.code(), &keywords),
            }
        }
    }

    l.heading("Spatial reference and extent");
    l.field("Reference system", &record.reference_system.identifier());
    l.paragraph(&id.extent.description);
    if let Some(bbox) = &id.extent.geographic {
        l.field(
            "Geographic bounding box",
            &format!(
                "W {} E {} S {} N {}",
                format_number(bbox.west),
                format_number(bbox.east),
                format_number(bbox.south),
                format_number(bbox.north)
            ),
        );
    }
    if let Some(range) = &id.extent.vertical {
        l.field(
            "Elevation range",
            &format!("{} to {}", format_number(range.min), format_number(range.max)),
        );
    }

    l.heading("Grid");
    l.field("Columns x rows", &format!("{} x {}", grid.columns, grid.rows));
    l.field(
        "Cell size",
        &format!("{} x {} {}", format_number(grid.cell_size_x), format_number(grid.cell_size_y), grid.unit),
    );
    l.field("Cell geometry", grid.cell_geometry.code());
    l.field(
        "Bands",
        &format!("{} ({})", record.content.band_count, record.content.sample_format),
    );
    if let Some(range) = &record.content.value_range {
        l.field(
            "Value range",
            &format!("{} to {}", format_number(range.min), format_number(range.max)),
        );
    }
    l.field(
        "Format",
        &format!(
            "{} ({} MB)",
            record.distribution.format_name,
            format_number(record.distribution.transfer_size_mb)
        ),
    );

    let contact = &id.point_of_contact;
    l.heading("Contact");
    l.field("Organisation", &contact.organisation_name);
    l.opt_field("Name", contact.individual_name.as_deref());
    l.opt_field("Position", contact.position_name.as_deref());
    l.opt_field("Email", contact.email.as_deref());
    l.opt_field("Phone", contact.phone.as_deref());
    let address: Vec<&str> = [&contact.address, &contact.postal_code, &contact.city, &contact.country]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .collect();
    if !address.is_empty() {
        l.field("Address", &address.join(", "));
    }
    l.opt_field("Website", contact.website.as_deref());

    if id.use_limitation.is_some() || id.access_constraints.is_some() {
        l.heading("Constraints");
        l.opt_field("Use limitation", id.use_limitation.as_deref());
        l.opt_field("Access constraints", id.access_constraints.as_deref());
    }

    l.heading("Lineage");
    l.paragraph(&record.lineage);

    l.heading("Metadata");
    l.field(
        "Standard",
        &format!("{} {}", record.metadata_standard_name, record.metadata_standard_version),
    );
    l.field("Language", &record.language);
    l.field("Date stamp", &record.date_stamp.format("%Y-%m-%d %H:%M:%S UTC").to_string());

    l.lines
}

/// Greedy word wrap; words longer than a line are split
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > columns {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..columns).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }

            let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
            if needed > columns && !current.is_empty() {
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
    }

    lines
}

/// Encode text for a WinAnsiEncoding font
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_columns() {
        let text = "Interpolated from classified ground points and resampled to a regular grid.";
        let lines = wrap(text, 20);

        assert!(lines.iter().all(|l| l.chars().count() <= 20));
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_splits_long_words_and_keeps_paragraphs() {
        let lines = wrap("abcdefghij\nxy", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "xy"]);
        assert!(wrap("", 10).is_empty());
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("Cartografía"), b"Cartograf\xeda".to_vec());
        assert_eq!(win_ansi("5 € – ok"), b"5 \x80 \x96 ok".to_vec());
        assert_eq!(win_ansi("測量"), b"??".to_vec());
    }

    #[test]
    fn test_paginate_breaks_pages() {
        let line = Line { face: Face::Regular, size: 10.0, text: "x".to_string(), gap: 0.0 };
        let lines = vec![line; 200];
        let pages = paginate(&lines);

        assert!(pages.len() > 1);
        assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), 200);
        let usable = PAGE_HEIGHT as f64 - 2.0 * MARGIN;
        for page in &pages {
            assert!(page.iter().map(Line::leading).sum::<f64>() <= usable);
        }
    }
}

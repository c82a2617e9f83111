//! Builders for the workbooks and PDFs used by the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A cell value written into a generated worksheet
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// One worksheet: its name and `(reference, value)` pairs such as `("C4", Cell::Text("x"))`
pub struct Sheet<'a> {
    pub name: &'a str,
    pub cells: Vec<(&'a str, Cell<'a>)>,
    pub hidden: bool,
}

impl<'a> Sheet<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            cells: Vec::new(),
            hidden: false,
        }
    }

    /// Marks the sheet `state="hidden"` in the workbook
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn text(mut self, reference: &'a str, value: &'a str) -> Self {
        self.cells.push((reference, Cell::Text(value)));
        self
    }

    pub fn number(mut self, reference: &'a str, value: f64) -> Self {
        self.cells.push((reference, Cell::Number(value)));
        self
    }
}

fn row_of(reference: &str) -> u32 {
    reference
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .unwrap_or(1)
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn sheet_xml(sheet: &Sheet<'_>) -> String {
    let mut rows: Vec<(u32, Vec<String>)> = Vec::new();
    for (reference, value) in &sheet.cells {
        let cell = match value {
            Cell::Text(text) => format!(
                r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                reference,
                escape_xml(text)
            ),
            Cell::Number(n) => format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n),
        };
        let row = row_of(reference);
        match rows.iter_mut().find(|(r, _)| *r == row) {
            Some((_, cells)) => cells.push(cell),
            None => rows.push((row, vec![cell])),
        }
    }
    rows.sort_by_key(|(r, _)| *r);

    let body: String = rows
        .into_iter()
        .map(|(r, cells)| format!(r#"<row r="{}">{}</row>"#, r, cells.concat()))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
        body
    )
}

/// Builds a minimal `.xlsx` workbook in memory
pub fn build_xlsx(sheets: &[Sheet<'_>]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let overrides: String = (1..=sheets.len())
        .map(|i| {
            format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            )
        })
        .collect();
    zip.start_file("[Content_Types].xml", options)?;
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{}</Types>"#,
        overrides
    )?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
    )?;

    let sheet_entries: String = sheets
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
                escape_xml(s.name),
                i + 1,
                if s.hidden { r#" state="hidden""# } else { "" },
                i + 1
            )
        })
        .collect();
    zip.start_file("xl/workbook.xml", options)?;
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{}</sheets></workbook>"#,
        sheet_entries
    )?;

    let relationships: String = (1..=sheets.len())
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i, i
            )
        })
        .collect();
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        relationships
    )?;

    for (i, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(sheet_xml(sheet).as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Builds a PDF with one page per entry of `pages`; each line of a page's
/// text becomes its own text object
pub fn build_pdf<S: AsRef<str>>(pages: &[S]) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let mut operations = Vec::new();
        for (i, line) in text.as_ref().lines().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new(
                "Td",
                vec![72.into(), (720 - 16 * i as i64).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

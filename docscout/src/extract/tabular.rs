use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, SheetVisible, Sheets};
use std::io::Cursor;
use tracing::{debug, trace, warn};

use super::{FragmentLocation, TextFragment};
use crate::errors::ScanResult;

/// Walks a workbook cell by cell: sheets in workbook order, then rows, then
/// columns. Only the sheet being walked is held in memory. Hidden and very
/// hidden sheets are never read.
pub struct TabularExtractor {
    workbook: Sheets<Cursor<Vec<u8>>>,
    sheet_names: Vec<String>,
    next_sheet: usize,
    current: Option<SheetCursor>,
    warnings: Vec<String>,
}

struct SheetCursor {
    name: String,
    range: Range<Data>,
    origin: (u32, u32),
    width: usize,
    cells: usize,
    position: usize,
}

impl SheetCursor {
    fn new(name: String, range: Range<Data>) -> Self {
        let (height, width) = range.get_size();
        let origin = range.start().unwrap_or((0, 0));
        Self {
            name,
            range,
            origin,
            width,
            cells: height * width,
            position: 0,
        }
    }

    fn next_fragment(&mut self) -> Option<TextFragment> {
        while self.position < self.cells {
            let index = self.position;
            self.position += 1;

            let (row, column) = (index / self.width, index % self.width);
            let Some(cell) = self.range.get((row, column)) else {
                continue;
            };
            if matches!(cell, Data::Empty) {
                continue;
            }
            let text = cell.to_string();
            if text.trim().is_empty() {
                continue;
            }

            return Some(TextFragment {
                text,
                location: FragmentLocation::Cell {
                    sheet: self.name.clone(),
                    row: self.origin.0 + row as u32,
                    column: self.origin.1 + column as u32,
                },
            });
        }
        None
    }
}

impl TabularExtractor {
    /// Opens an `xlsx`, `xlsm`, `xlsb`, `xls` or `ods` workbook, sniffing the
    /// format from the bytes
    pub fn open(bytes: Vec<u8>) -> ScanResult<Self> {
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let mut sheet_names = Vec::new();
        for sheet in workbook.sheets_metadata() {
            if matches!(sheet.visible, SheetVisible::Visible) {
                sheet_names.push(sheet.name.clone());
            } else {
                debug!("Skipping {:?} sheet '{}'", sheet.visible, sheet.name);
            }
        }
        trace!("Opened workbook with {} visible sheets", sheet_names.len());

        Ok(Self {
            workbook,
            sheet_names,
            next_sheet: 0,
            current: None,
            warnings: Vec::new(),
        })
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Loads the next readable sheet, skipping ones that fail to decode
    fn advance_sheet(&mut self) -> bool {
        while self.next_sheet < self.sheet_names.len() {
            let name = self.sheet_names[self.next_sheet].clone();
            self.next_sheet += 1;

            match self.workbook.worksheet_range(&name) {
                Ok(range) => {
                    trace!("Loaded sheet '{}' ({:?})", name, range.get_size());
                    self.current = Some(SheetCursor::new(name, range));
                    return true;
                }
                Err(e) => {
                    warn!("Skipping unreadable sheet '{}': {}", name, e);
                    self.warnings
                        .push(format!("Sheet '{}' could not be read: {}", name, e));
                }
            }
        }
        false
    }
}

impl Iterator for TabularExtractor {
    type Item = ScanResult<TextFragment>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cursor) = self.current.as_mut() {
                if let Some(fragment) = cursor.next_fragment() {
                    return Some(Ok(fragment));
                }
                self.current = None;
            }
            if !self.advance_sheet() {
                return None;
            }
        }
    }
}

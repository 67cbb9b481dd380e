use super::EntityKind;
use crate::error::CatalogResult;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// One spreadsheet row as text cells keyed by lower-cased header.
///
/// A column that is absent and a cell that is blank read the same: `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// 1-based line in the sheet; the header is line 1.
    pub line: u64,
    cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new(line: u64) -> Self {
        Self {
            line,
            cells: HashMap::new(),
        }
    }

    pub fn with(mut self, column: &str, value: &str) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: &str) {
        self.cells
            .insert(column.trim().to_ascii_lowercase(), value.to_string());
    }

    /// Trimmed, non-empty cell text.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    headers: Vec<String>,
    rows: Vec<RawRow>,
}

impl Sheet {
    /// Build a sheet from literal cells. Row `i` gets line `i + 2`.
    pub fn from_cells(name: &str, headers: &[&str], cells: Vec<Vec<&str>>) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
        let rows = cells
            .into_iter()
            .enumerate()
            .map(|(i, values)| {
                let mut row = RawRow::new(i as u64 + 2);
                for (header, value) in headers.iter().zip(values.iter()) {
                    row.set(header, value);
                }
                row
            })
            .collect();
        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    /// Parse one CSV stream. The first record is the header.
    pub fn from_reader<R: Read>(name: &str, reader: R) -> CatalogResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_ascii_lowercase())
            .collect();

        let mut rows = Vec::new();
        for (i, result) in csv_reader.records().enumerate() {
            let record = result?;
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(i as u64 + 2);
            let mut row = RawRow::new(line);
            for (header, value) in headers.iter().zip(record.iter()) {
                row.set(header, value);
            }
            rows.push(row);
        }

        Ok(Self {
            name: name.to_string(),
            headers,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A set of named sheets. Sheet names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.insert(sheet);
        self
    }

    /// Add a sheet, replacing any sheet with the same name.
    pub fn insert(&mut self, sheet: Sheet) {
        self.sheets
            .retain(|s| !s.name.eq_ignore_ascii_case(&sheet.name));
        self.sheets.push(sheet);
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Load `<sheet>.csv` for every known sheet present in `dir`.
    /// Unknown files are ignored; absent sheets are simply not loaded.
    pub fn from_csv_dir(dir: impl AsRef<Path>) -> CatalogResult<Self> {
        let dir = dir.as_ref();
        let mut workbook = Self::new();
        for kind in EntityKind::IMPORT_ORDER {
            let path = dir.join(format!("{}.csv", kind.sheet_name()));
            if !path.is_file() {
                log::debug!("import: no {} sheet in {}", kind, dir.display());
                continue;
            }
            let file = std::fs::File::open(&path)?;
            let sheet = Sheet::from_reader(kind.sheet_name(), file)?;
            log::debug!("import: loaded {} rows from {}", sheet.len(), path.display());
            workbook.insert(sheet);
        }
        Ok(workbook)
    }
}

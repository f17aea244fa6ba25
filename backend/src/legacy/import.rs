//! Bulk import of people from CSV or XLSX uploads.
//!
//! Rows are read into `header → value` maps, headers are matched against
//! per-field alias lists, and every row is inserted in its own transaction.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use sea_orm::DatabaseConnection;
use thiserror::Error;

use super::people::{insert_statement, PersonForm};
use super::schema::PeopleTable;
use super::{error_text, execute_in_transaction};
use crate::flash::Flash;
use crate::utils::text::normalize_key;

/// Error samples carried in the summary.
pub const MAX_ERROR_SAMPLES: usize = 5;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Accepted (normalized) header spellings per person field.
const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::Fio, &["fio", "фио", "full_name", "name", "имя", "client", "клиент"]),
    (Field::Gender, &["gender", "пол", "sex"]),
    (Field::Address, &["address", "адрес"]),
    (Field::Age, &["age", "возраст"]),
    (Field::BirthDate, &["birth_date", "дата_рождения", "birthday", "dob"]),
    (Field::Phone, &["phone", "телефон", "номер_телефона", "phone_number", "mobile"]),
    (Field::Email, &["email", "e-mail", "почта", "mail"]),
    (Field::Notes, &["notes", "примечания", "comment", "комментарий"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Fio,
    Gender,
    Address,
    Age,
    BirthDate,
    Phone,
    Email,
    Notes,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("не удалось прочитать CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("не удалось прочитать XLSX: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("в книге нет листов")]
    NoWorksheet,

    #[error("слишком много строк: допускается не более {0}")]
    TooManyRows(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Xlsx,
}

impl ImportFormat {
    /// Chosen by file extension, case-insensitively.
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".csv") {
            Some(ImportFormat::Csv)
        } else if lower.ends_with(".xlsx") {
            Some(ImportFormat::Xlsx)
        } else {
            None
        }
    }
}

pub type RawRow = HashMap<String, String>;

/// A data row with the line it came from (1-based; the header is line 1
/// unless the sheet starts lower).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub line: usize,
    pub values: RawRow,
}

/// Read data rows. More than `max_rows` rows fails before anything is
/// written.
pub fn read_rows(format: ImportFormat, bytes: &[u8], max_rows: usize) -> Result<Vec<SourceRow>, ImportError> {
    match format {
        ImportFormat::Csv => read_csv(bytes, max_rows),
        ImportFormat::Xlsx => read_xlsx(bytes, max_rows),
    }
}

fn read_csv(bytes: &[u8], max_rows: usize) -> Result<Vec<SourceRow>, ImportError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|v| v.is_empty()) {
            continue;
        }
        if rows.len() == max_rows {
            return Err(ImportError::TooManyRows(max_rows));
        }
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(rows.len() + 2);
        let values = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(SourceRow { line, values });
    }
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // phone numbers and ages come in as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.date().format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

fn read_xlsx(bytes: &[u8], max_rows: usize) -> Result<Vec<SourceRow>, ImportError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::NoWorksheet)??;

    let header_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let mut lines = range.rows();
    let headers: Vec<String> = match lines.next() {
        Some(header) => header.iter().map(cell_text).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for (offset, cells) in lines.enumerate() {
        let cells: Vec<String> = cells.iter().map(cell_text).collect();
        if cells.iter().all(|v| v.is_empty()) {
            continue;
        }
        if rows.len() == max_rows {
            return Err(ImportError::TooManyRows(max_rows));
        }
        let values = headers
            .iter()
            .zip(cells)
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.clone(), v))
            .collect();
        rows.push(SourceRow {
            line: header_line + 1 + offset,
            values,
        });
    }
    Ok(rows)
}

pub fn field_for(header: &str) -> Option<Field> {
    let key = normalize_key(header);
    FIELD_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key.as_str()))
        .map(|(field, _)| *field)
}

/// Map a raw row onto the person form. Unknown headers are ignored; for a
/// field given twice the first non-empty value wins.
pub fn map_row(raw: &RawRow) -> PersonForm {
    let mut fields: HashMap<Field, String> = HashMap::new();
    // deterministic order regardless of HashMap iteration
    let mut entries: Vec<(&String, &String)> = raw.iter().collect();
    entries.sort();
    for (header, value) in entries {
        let Some(field) = field_for(header) else {
            continue;
        };
        if value.trim().is_empty() {
            continue;
        }
        fields.entry(field).or_insert_with(|| value.trim().to_string());
    }

    let mut take = |f: Field| fields.remove(&f);
    PersonForm {
        fio: take(Field::Fio),
        gender: take(Field::Gender),
        address: take(Field::Address),
        age: take(Field::Age),
        birth_date: take(Field::BirthDate),
        phone: take(Field::Phone),
        email: take(Field::Email),
        notes: take(Field::Notes),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub failed: usize,
    /// First few failure messages
    pub errors: Vec<String>,
}

impl ImportSummary {
    fn record_failure(&mut self, line: usize, message: impl std::fmt::Display) {
        self.failed += 1;
        if self.errors.len() < MAX_ERROR_SAMPLES {
            self.errors.push(format!("строка {}: {}", line, message));
        }
    }

    pub fn to_flash(&self) -> Flash {
        let mut message = format!(
            "Импорт завершён: добавлено {}, ошибок {}",
            self.inserted, self.failed
        );
        if !self.errors.is_empty() {
            message.push_str(". ");
            message.push_str(&self.errors.join("; "));
        }
        if self.failed == 0 {
            Flash::success(message)
        } else {
            Flash::warning(message)
        }
    }
}

/// Insert every row independently. Never stops early.
pub async fn import_rows(db: &DatabaseConnection, table: &PeopleTable, rows: Vec<SourceRow>) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for SourceRow { line, values } in &rows {
        let line = *line;
        let input = match map_row(values).validate() {
            Ok(input) => input,
            Err(reason) => {
                summary.record_failure(line, reason);
                continue;
            }
        };
        match execute_in_transaction(db, insert_statement(table, &input)).await {
            Ok(_) => summary.inserted += 1,
            Err(e) => {
                let reason = error_text(&e);
                log::warn!("Import row {} rolled back: {}", line, reason);
                summary.record_failure(line, reason);
            }
        }
    }
    log::info!(
        "Import into {} finished: {} inserted, {} failed",
        table.name,
        summary.inserted,
        summary.failed
    );
    summary
}

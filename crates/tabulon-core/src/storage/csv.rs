//! CSV import/export.
//!
//! Export writes display (or raw) values row-major with optional column
//! label headers; fields are quoted and escaped as needed, and values that
//! would be interpreted as formulas by spreadsheet applications are
//! prefixed to defuse them. Import coerces fields through
//! [`Value::from_input`], creating rows and columns as needed.

use std::io::Write;
use std::path::Path;

use tabulon_engine::{Access, Value};

use crate::error::{Result, TableError};
use crate::table::Table;

/// Export behavior knobs.
#[derive(Clone, Copy, Debug)]
pub struct CsvOptions {
    /// Write column labels as the first line.
    pub headers: bool,
    /// Apply precision/units/display formatting; raw values otherwise.
    pub formatted: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            headers: true,
            formatted: false,
        }
    }
}

/// Render a table as CSV text.
pub fn export_csv(table: &Table, options: CsvOptions) -> String {
    let mut out = String::new();
    let cols: Vec<u64> = table.iter_columns().map(|c| c.ident()).collect();
    let rows: Vec<u64> = table.iter_rows().map(|r| r.ident()).collect();

    if options.headers {
        let fields: Vec<String> = table
            .iter_columns()
            .map(|c| escape_csv_field(c.label().unwrap_or_default()))
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    for row in &rows {
        let mut fields = Vec::with_capacity(cols.len());
        for col in &cols {
            let rendered = if options.formatted {
                table.formatted_cell_value(*row, *col)
            } else {
                table.cell_value(*row, *col).map(Value::to_string)
            };
            fields.push(escape_csv_field(&rendered.unwrap_or_default()));
        }
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Write a table to a CSV file.
pub fn write_csv(path: &Path, table: &Table, options: CsvOptions) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(export_csv(table, options).as_bytes())?;
    Ok(())
}

/// Import CSV text into a table, creating rows and columns as needed.
/// With `headers`, the first line sets column labels. Returns the number
/// of cells written.
pub fn import_csv(table: &mut Table, content: &str, headers: bool) -> Result<usize> {
    let mut lines = content.lines();
    let mut count = 0;

    if headers {
        let Some(header) = lines.next() else {
            return Err(TableError::EmptyCsv);
        };
        for (pos, label) in parse_csv_line(header).into_iter().enumerate() {
            let col = match table.get_column(Access::ByIndex(pos + 1))? {
                Some(col) => col,
                None => table.add_column(Access::ByIndex(pos + 1))?,
            };
            if !label.is_empty() {
                table.set_column_label(col, Some(&label))?;
            }
        }
    }

    for (row_pos, line) in lines.enumerate() {
        let fields = parse_csv_line(line);
        if fields.iter().all(String::is_empty) {
            continue;
        }
        let row = match table.get_row(Access::ByIndex(row_pos + 1))? {
            Some(row) => row,
            None => table.add_row(Access::ByIndex(row_pos + 1))?,
        };
        for (col_pos, field) in fields.into_iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            let col = match table.get_column(Access::ByIndex(col_pos + 1))? {
                Some(col) => col,
                None => table.add_column(Access::ByIndex(col_pos + 1))?,
            };
            table.set_cell_value(row, col, Value::from_input(&field))?;
            count += 1;
        }
    }

    if count == 0 {
        return Err(TableError::EmptyCsv);
    }
    Ok(count)
}

/// Read a CSV file into a table.
pub fn read_csv(path: &Path, table: &mut Table, headers: bool) -> Result<usize> {
    let content = std::fs::read_to_string(path)?;
    import_csv(table, &content, headers)
}

/// Parse a single CSV line, handling quoted fields and escaped quotes.
pub(crate) fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => {
                    in_quotes = true;
                    field_was_quoted = true;
                }
                ',' => {
                    push_field(&mut fields, &mut current, field_was_quoted);
                    field_was_quoted = false;
                }
                _ => current.push(c),
            }
        }
    }
    push_field(&mut fields, &mut current, field_was_quoted);
    fields
}

fn push_field(fields: &mut Vec<String>, current: &mut String, was_quoted: bool) {
    if was_quoted {
        fields.push(std::mem::take(current));
    } else {
        fields.push(current.trim().to_string());
        current.clear();
    }
}

/// Escape a field for CSV output.
fn escape_csv_field(field: &str) -> String {
    // Guard against CSV formula injection in spreadsheet apps.
    let first_non_space = field.trim_start_matches([' ', '\t']).chars().next();
    let safe_field = if matches!(first_non_space, Some('=' | '+' | '-' | '@')) {
        format!("'{}", field)
    } else {
        field.to_string()
    };

    if safe_field.contains(',')
        || safe_field.contains('"')
        || safe_field.contains('\n')
        || safe_field.contains('\r')
    {
        format!("\"{}\"", safe_field.replace('"', "\"\""))
    } else {
        safe_field
    }
}

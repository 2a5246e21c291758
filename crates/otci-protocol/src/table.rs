//! Pipe-delimited table decoder.
//!
//! ```text
//! | ID | RLOC16 | Next Hop | Path Cost | LQ In | LQ Out | Age | Extended MAC     |
//! +----+--------+----------+-----------+-------+--------+-----+------------------+
//! | 21 | 0x5400 |       21 |         0 |     3 |      3 |   5 | d28d7f875888fccb |
//! ```
//!
//! Columns are looked up by header name, never by position, so the same
//! decoder works when firmware revisions add or reorder columns.

use std::str::FromStr;

use crate::error::{OtciError, OtciResult};
use crate::scalar::parse_field;

/// Split a `| a | b |` row into trimmed cells, dropping the outer empty fields.
pub fn split_table_row(row: &str) -> Option<Vec<String>> {
    let row = row.trim();
    if row.len() < 2 || !row.starts_with('|') || !row.ends_with('|') {
        return None;
    }
    let inner = &row[1..row.len() - 1];
    Some(inner.split('|').map(|cell| cell.trim().to_string()).collect())
}

/// A decoded table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Decode a table from command output.
    ///
    /// The first line is the header, the second the `+---+` divider, the
    /// rest data rows. Blank rows are skipped; every other row must have as
    /// many cells as there are headers.
    pub fn parse<S: AsRef<str>>(output: &[S]) -> OtciResult<Table> {
        if output.len() < 2 {
            return Err(OtciError::unexpected(output, "table needs a header and a divider"));
        }

        let headers = split_table_row(output[0].as_ref())
            .ok_or_else(|| OtciError::unexpected(output, "malformed table header"))?;
        for (i, h) in headers.iter().enumerate() {
            if headers[..i].contains(h) {
                return Err(OtciError::unexpected(output, format!("duplicate column `{h}`")));
            }
        }

        let divider = output[1].as_ref().trim();
        if !divider.starts_with('+') || !divider.chars().all(|c| c == '+' || c == '-') {
            return Err(OtciError::unexpected(output, "missing table divider"));
        }

        let mut rows = Vec::new();
        for line in &output[2..] {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }

            let cells = split_table_row(line).ok_or_else(|| OtciError::unexpected(output, "malformed table row"))?;
            if cells.len() != headers.len() {
                return Err(OtciError::unexpected(
                    output,
                    format!("row has {} cells, header has {}", cells.len(), headers.len()),
                ));
            }
            rows.push(cells);
        }

        Ok(Table { headers, rows })
    }

    /// Column names in header order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Whether the header contains `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over the data rows.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row { table: self, cells })
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }
}

/// A borrowed data row with by-name cell access.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    cells: &'a [String],
}

impl<'a> Row<'a> {
    /// Get a required cell.
    pub fn get(&self, column: &str) -> OtciResult<&'a str> {
        self.get_opt(column).ok_or_else(|| {
            OtciError::unexpected(self.table.headers(), format!("missing required column `{column}`"))
        })
    }

    /// Get a cell whose column may be absent on some firmware revisions.
    pub fn get_opt(&self, column: &str) -> Option<&'a str> {
        self.table.column_index(column).map(|i| self.cells[i].as_str())
    }

    /// Parse a required cell as an integer in the given base.
    pub fn int<T: TryFrom<i64>>(&self, column: &str, radix: u32) -> OtciResult<T> {
        parse_field(self.get(column)?, radix)
    }

    /// Parse an optional cell as an integer in the given base.
    pub fn int_opt<T: TryFrom<i64>>(&self, column: &str, radix: u32) -> OtciResult<Option<T>> {
        self.get_opt(column).map(|v| parse_field(v, radix)).transpose()
    }

    /// Parse a required `0`/`1` cell as a flag.
    pub fn flag(&self, column: &str) -> OtciResult<bool> {
        Ok(self.int::<i64>(column, 10)? != 0)
    }

    /// Parse a required cell with `FromStr`.
    pub fn parse<T: FromStr>(&self, column: &str) -> OtciResult<T> {
        let value = self.get(column)?;
        value
            .parse()
            .map_err(|_| OtciError::unexpected(&[value], format!("invalid value in column `{column}`")))
    }

    /// Cells in header order.
    pub fn cells(&self) -> &'a [String] {
        self.cells
    }
}

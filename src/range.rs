use pest::Parser;
use pest_derive::Parser;
use std::fmt;

use crate::error::{Result, SyncError};

#[derive(Parser)]
#[grammar = "a1.pest"]
pub struct A1Parser;

/// One corner of an A1 range. Either part may be open (`A` or `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    /// 1-based column index
    pub column: Option<u32>,
    pub row: Option<u32>,
}

/// A range in A1 notation, e.g. `Sheet1!A2:C` or `'My List'!C7`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    pub sheet: Option<String>,
    pub start: CellRef,
    pub end: Option<CellRef>,
}

impl CellRef {
    pub fn new(column: u32, row: u32) -> Self {
        Self {
            column: Some(column),
            row: Some(row),
        }
    }

    pub fn column(column: u32) -> Self {
        Self {
            column: Some(column),
            row: None,
        }
    }
}

impl SheetRange {
    /// A single cell
    pub fn cell(sheet: &str, column: u32, row: u32) -> Self {
        Self {
            sheet: Some(sheet.to_string()),
            start: CellRef::new(column, row),
            end: None,
        }
    }

    /// Columns `first..=last` of a single row
    pub fn row(sheet: &str, first: u32, last: u32, row: u32) -> Self {
        Self {
            sheet: Some(sheet.to_string()),
            start: CellRef::new(first, row),
            end: Some(CellRef::new(last, row)),
        }
    }

    /// Columns `first..=last` from `from_row` down to the last used row.
    /// Without `from_row` the whole columns are addressed.
    pub fn columns(sheet: &str, first: u32, last: u32, from_row: Option<u32>) -> Self {
        Self {
            sheet: Some(sheet.to_string()),
            start: CellRef {
                column: Some(first),
                row: from_row,
            },
            end: Some(CellRef::column(last)),
        }
    }

    pub fn first_row(&self) -> Option<u32> {
        self.start.row
    }
}

/// Parse an A1 range string
pub fn parse_range(input: &str) -> Result<SheetRange> {
    let invalid = |reason: String| SyncError::Range {
        range: input.to_string(),
        reason,
    };

    let mut pairs = A1Parser::parse(Rule::range, input).map_err(|e| invalid(e.to_string()))?;
    let range = pairs
        .next()
        .ok_or_else(|| invalid("empty input".to_string()))?;

    let mut sheet = None;
    let mut cells = Vec::new();

    for pair in range.into_inner() {
        match pair.as_rule() {
            Rule::sheet => sheet = Some(parse_sheet(pair)),
            Rule::area => {
                for cell in pair.into_inner() {
                    cells.push(parse_cell(cell).map_err(|e| invalid(e.to_string()))?);
                }
            }
            Rule::EOI => {}
            _ => {}
        }
    }

    let mut cells = cells.into_iter();
    let start = cells
        .next()
        .ok_or_else(|| invalid("missing cell reference".to_string()))?;

    Ok(SheetRange {
        sheet,
        start,
        end: cells.next(),
    })
}

fn parse_sheet(pair: pest::iterators::Pair<Rule>) -> String {
    let Some(inner) = pair.into_inner().next() else {
        return String::new();
    };

    match inner.as_rule() {
        Rule::quoted_sheet => inner
            .into_inner()
            .next()
            .map(|name| name.as_str().replace("''", "'"))
            .unwrap_or_default(),
        _ => inner.as_str().to_string(),
    }
}

fn parse_cell(pair: pest::iterators::Pair<Rule>) -> std::result::Result<CellRef, String> {
    let mut cell = CellRef {
        column: None,
        row: None,
    };

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::column => cell.column = Some(letters_to_column(part.as_str())?),
            Rule::row => {
                let row = part
                    .as_str()
                    .parse::<u32>()
                    .map_err(|e| format!("invalid row {}: {}", part.as_str(), e))?;
                cell.row = Some(row);
            }
            _ => {}
        }
    }

    Ok(cell)
}

/// `A` -> 1, `Z` -> 26, `AA` -> 27
pub fn letters_to_column(letters: &str) -> std::result::Result<u32, String> {
    letters.chars().try_fold(0u32, |acc, c| {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return Err(format!("invalid column letter {:?}", c));
        }
        acc.checked_mul(26)
            .and_then(|n| n.checked_add(c as u32 - 'A' as u32 + 1))
            .ok_or_else(|| format!("column {} out of range", letters))
    })
}

/// 1 -> `A`, 27 -> `AA`
pub fn column_to_letters(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn needs_quotes(sheet: &str) -> bool {
    !sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(column) = self.column {
            write!(f, "{}", column_to_letters(column))?;
        }
        if let Some(row) = self.row {
            write!(f, "{}", row)?;
        }
        Ok(())
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            if needs_quotes(sheet) {
                write!(f, "'{}'!", sheet.replace('\'', "''"))?;
            } else {
                write!(f, "{}!", sheet)?;
            }
        }
        write!(f, "{}", self.start)?;
        if let Some(end) = &self.end {
            write!(f, ":{}", end)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_range() {
        let range = parse_range("Sheet1!A2:C").unwrap();

        assert_eq!(range.sheet.as_deref(), Some("Sheet1"));
        assert_eq!(range.start, CellRef::new(1, 2));
        assert_eq!(range.end, Some(CellRef::column(3)));
    }

    #[test]
    fn test_parse_quoted_sheet() {
        let range = parse_range("'Bob''s list'!C7").unwrap();

        assert_eq!(range.sheet.as_deref(), Some("Bob's list"));
        assert_eq!(range.start, CellRef::new(3, 7));
        assert_eq!(range.end, None);
    }

    #[test]
    fn test_parse_without_sheet() {
        let range = parse_range("A:C").unwrap();

        assert_eq!(range.sheet, None);
        assert_eq!(range.start, CellRef::column(1));
        assert_eq!(range.end, Some(CellRef::column(3)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_range("Sheet1!").is_err());
        assert!(parse_range("Sheet1!A0").is_err());
        assert!(parse_range("").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(SheetRange::row("Sheet1", 1, 3, 1).to_string(), "Sheet1!A1:C1");
        assert_eq!(SheetRange::columns("Sheet1", 1, 3, Some(2)).to_string(), "Sheet1!A2:C");
        assert_eq!(SheetRange::columns("Sheet1", 1, 3, None).to_string(), "Sheet1!A:C");
        assert_eq!(SheetRange::cell("To do", 3, 9).to_string(), "'To do'!C9");
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_to_letters(1), "A");
        assert_eq!(column_to_letters(26), "Z");
        assert_eq!(column_to_letters(28), "AB");
        assert_eq!(letters_to_column("ab"), Ok(28));
    }
}

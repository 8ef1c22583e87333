//! Positional access to spreadsheet cells.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::extract::ImportError;

/// What a single cell holds, reduced to the three shapes extraction cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Absent,
}

impl Cell {
    /// Cell contents as text. Integral numbers lose their `.0` so that IDs
    /// typed as numbers read back the way they were entered.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Absent => String::new(),
            Cell::Text(text) => text.clone(),
            Cell::Number(value) => {
                if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                    format!("{}", *value as i64)
                } else {
                    format!("{value}")
                }
            }
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Absent,
            Data::String(text) => Cell::Text(text.clone()),
            Data::Int(value) => Cell::Number(*value as f64),
            Data::Float(value) => Cell::Number(*value),
            Data::Bool(value) => Cell::Text(value.to_string()),
            Data::DateTime(stamp) => Cell::Number(stamp.as_f64()),
            Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::Text(text.clone()),
        }
    }
}

/// Random access to a rectangular sheet by zero-based (row, column).
pub trait Grid {
    fn cell(&self, row: u32, col: u32) -> Cell;

    /// Trimmed text of a cell; absent cells read as an empty string.
    fn text(&self, row: u32, col: u32) -> String {
        self.cell(row, col).to_text().trim().to_string()
    }
}

impl Grid for Range<Data> {
    fn cell(&self, row: u32, col: u32) -> Cell {
        self.get_value((row, col)).map(Cell::from).unwrap_or(Cell::Absent)
    }
}

/// The active sheet of a workbook: its name and cells.
pub struct Sheet {
    pub name: String,
    pub cells: Range<Data>,
}

/// Opens a workbook and returns its first worksheet.
pub fn open_first_sheet(path: &Path) -> Result<Sheet, ImportError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let name = first_sheet_name(path, &workbook.sheet_names())?;

    let cells = workbook
        .worksheet_range(&name)
        .map_err(|source| ImportError::Sheet {
            sheet: name.clone(),
            source,
        })?;

    Ok(Sheet { name, cells })
}

fn first_sheet_name(path: &Path, names: &[String]) -> Result<String, ImportError> {
    names
        .first()
        .cloned()
        .ok_or_else(|| ImportError::NoSheet(path.to_path_buf()))
}

/// Zero-based column index of a spreadsheet column letter (`A` = 0, `AA` = 26).
pub const fn column_index(letters: &str) -> u32 {
    let bytes = letters.as_bytes();
    let mut index = 0u32;
    let mut i = 0;
    while i < bytes.len() {
        index = index * 26 + (bytes[i] - b'A' + 1) as u32;
        i += 1;
    }
    index - 1
}

/// Inverse of [`column_index`].
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_round_trip() {
        assert_eq!(column_index("A"), 0);
        assert_eq!(column_index("L"), 11);
        assert_eq!(column_index("T"), 19);
        assert_eq!(column_index("Z"), 25);
        assert_eq!(column_index("AA"), 26);
        assert_eq!(column_index("BF"), 57);
        assert_eq!(column_letters(57), "BF");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
    }

    #[test]
    fn numbers_read_without_trailing_zero() {
        assert_eq!(Cell::Number(20231234.0).to_text(), "20231234");
        assert_eq!(Cell::Number(3.5).to_text(), "3.5");
    }

    #[test]
    fn range_cells_map_to_cell_shapes() {
        let mut range: Range<Data> = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), Data::String(" Math ".to_string()));
        range.set_value((1, 1), Data::Float(12.0));
        range.set_value((2, 2), Data::Bool(true));

        assert_eq!(range.text(0, 0), "Math");
        assert_eq!(range.cell(1, 1), Cell::Number(12.0));
        assert_eq!(range.text(2, 2), "true");
        assert_eq!(range.cell(0, 1), Cell::Absent);
        assert_eq!(range.cell(40, 40), Cell::Absent);
    }

    #[test]
    fn error_cells_read_as_absent() {
        let mut range: Range<Data> = Range::new((0, 0), (0, 1));
        range.set_value((0, 0), Data::Error(calamine::CellErrorType::Div0));
        range.set_value((0, 1), Data::Error(calamine::CellErrorType::NA));

        assert_eq!(range.cell(0, 0), Cell::Absent);
        assert_eq!(range.text(0, 1), "");
    }

    #[test]
    fn workbook_without_sheets_is_a_no_sheet_error() {
        let path = Path::new("empty.xlsx");
        let err = first_sheet_name(path, &[]).unwrap_err();
        assert!(matches!(err, ImportError::NoSheet(ref p) if p == path));

        let names = vec!["Sheet1".to_string(), "Sheet2".to_string()];
        assert_eq!(first_sheet_name(path, &names).unwrap(), "Sheet1");
    }
}

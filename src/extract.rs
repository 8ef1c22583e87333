use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use thiserror::Error;

use crate::dates;
use crate::grades;
use crate::grid::{self, Grid};
use crate::layout::{CellKind, Field, SheetLayout, REGISTRATION, TRANSCRIPT};
use crate::models::{RegistrationRecord, StudentRecord};

/// Consecutive blank key cells that mark the end of a sheet.
pub const EMPTY_ROW_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not open workbook {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("workbook {0} has no worksheets")]
    NoSheet(PathBuf),
    #[error("could not read worksheet '{sheet}'")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },
    #[error("worksheet '{sheet}' has no {layout} rows")]
    NoDataRows { sheet: String, layout: &'static str },
}

/// One data row, before it is turned into a typed record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    /// Zero-based grid row.
    pub row: u32,
    pub fields: BTreeMap<Field, String>,
    /// (subject name, raw cell text) for every non-blank subject cell.
    pub subject_cells: Vec<(String, String)>,
}

impl SheetRow {
    pub fn field(&self, field: Field) -> String {
        self.fields.get(&field).cloned().unwrap_or_default()
    }

    fn number(&self, field: Field) -> i32 {
        parse_leading_int(&self.field(field))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedSheet {
    pub subjects: Vec<String>,
    pub rows: Vec<SheetRow>,
}

/// Subject names from the header row, in column order. Blank headers are
/// dropped rather than kept as placeholders.
pub fn scan_subjects(grid: &impl Grid, layout: &SheetLayout) -> Vec<String> {
    let header_row = layout.header_row_index();
    layout
        .subject_columns()
        .map(|col| grid.text(header_row, col))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Walks the data rows of a sheet laid out as `layout`.
///
/// Subject cells are paired with header names by their offset from the first
/// subject column, not by name.
pub fn extract_rows(grid: &impl Grid, layout: &SheetLayout) -> ExtractedSheet {
    let subjects = scan_subjects(grid, layout);
    let mut rows = Vec::new();
    let mut row = layout.data_start_index();
    let mut empty_rows = 0;

    while empty_rows < EMPTY_ROW_LIMIT {
        if grid.text(row, layout.key_column).is_empty() {
            empty_rows += 1;
            row += 1;
            continue;
        }
        empty_rows = 0;

        let fields = layout
            .fields
            .iter()
            .map(|column| {
                let value = match column.kind {
                    CellKind::Text => grid.text(row, column.column),
                    CellKind::Date => dates::normalize(&grid.cell(row, column.column)),
                };
                (column.field, value)
            })
            .collect();

        let mut subject_cells = Vec::new();
        for col in layout.subject_columns() {
            let offset = (col - layout.first_subject_column) as usize;
            let Some(subject) = subjects.get(offset) else {
                break;
            };
            let raw = grid.text(row, col);
            if !raw.is_empty() {
                subject_cells.push((subject.clone(), raw));
            }
        }

        rows.push(SheetRow {
            row,
            fields,
            subject_cells,
        });
        row += 1;
    }

    let header = format!(
        "{first}{row}:{last}{row}",
        first = grid::column_letters(layout.first_subject_column),
        last = grid::column_letters(layout.last_subject_column),
        row = layout.header_row
    );
    tracing::debug!(
        layout = layout.name,
        header = %header,
        subjects = subjects.len(),
        rows = rows.len(),
        "sheet scanned"
    );

    ExtractedSheet { subjects, rows }
}

pub fn student_from_row(row: &SheetRow, imported_at: DateTime<Utc>) -> StudentRecord {
    let mut grades = IndexMap::new();
    for (subject, raw) in &row.subject_cells {
        match grades::subject_grade(subject, raw) {
            // a repeated header name keeps its first column
            Some(grade) => {
                grades.entry(subject.clone()).or_insert(grade);
            }
            None => tracing::debug!(
                row = row.row + 1,
                subject = %subject,
                cell = %raw,
                "grade cell without a grade code"
            ),
        }
    }

    StudentRecord {
        program: row.field(Field::Program),
        course: row.field(Field::Course),
        class_name: row.field(Field::ClassName),
        last_name: row.field(Field::LastName),
        first_name: row.field(Field::FirstName),
        gender: row.field(Field::Gender),
        date_of_birth: row.field(Field::DateOfBirth),
        troy_id: row.field(Field::TroyId),
        vnu_id: row.field(Field::VnuId),
        grades,
        imported_at,
    }
}

pub fn registration_from_row(
    row: &SheetRow,
    markers: &[&str],
    imported_at: DateTime<Utc>,
) -> RegistrationRecord {
    let registered_subjects = row
        .subject_cells
        .iter()
        .filter(|(_, raw)| markers.iter().any(|marker| raw.contains(marker)))
        .map(|(subject, _)| subject.clone())
        .collect();

    RegistrationRecord {
        course: row.field(Field::Course),
        class_name: row.field(Field::ClassName),
        last_name: row.field(Field::LastName),
        first_name: row.field(Field::FirstName),
        student_id: row.field(Field::StudentId),
        partner_id: row.field(Field::PartnerId),
        date_of_birth: row.field(Field::DateOfBirth),
        email: row.field(Field::Email),
        vnu_email: row.field(Field::VnuEmail),
        phone: row.field(Field::Phone),
        tuition_fee: row.field(Field::TuitionFee),
        max_credits: row.number(Field::MaxCredits),
        registered_credits: row.number(Field::RegisteredCredits),
        total_subjects: row.number(Field::TotalSubjects),
        approval_status: row.field(Field::ApprovalStatus),
        approval_details: row.field(Field::ApprovalDetails),
        registered_subjects,
        imported_at,
    }
}

pub fn extract_students(
    grid: &impl Grid,
    layout: &SheetLayout,
    imported_at: DateTime<Utc>,
) -> Vec<StudentRecord> {
    let sheet = extract_rows(grid, layout);
    let students: Vec<StudentRecord> = sheet
        .rows
        .iter()
        .map(|row| student_from_row(row, imported_at))
        .collect();

    let graded: usize = students.iter().map(|s| s.grades.len()).sum();
    let retakes: usize = students.iter().map(|s| s.retake_subjects().count()).sum();
    tracing::info!(
        subjects = sheet.subjects.len(),
        students = students.len(),
        graded,
        retakes,
        "transcript extracted"
    );

    students
}

pub fn extract_registrations(
    grid: &impl Grid,
    layout: &SheetLayout,
    imported_at: DateTime<Utc>,
) -> Vec<RegistrationRecord> {
    let sheet = extract_rows(grid, layout);
    let registrations: Vec<RegistrationRecord> = sheet
        .rows
        .iter()
        .map(|row| registration_from_row(row, layout.enrollment_markers, imported_at))
        .collect();

    tracing::info!(
        subjects = sheet.subjects.len(),
        registrations = registrations.len(),
        "registrations extracted"
    );

    registrations
}

/// Students on the sheet named `sheet`; a sheet without a single data row is
/// an error.
pub fn transcript_from_grid(
    grid: &impl Grid,
    sheet: &str,
    layout: &SheetLayout,
    imported_at: DateTime<Utc>,
) -> Result<Vec<StudentRecord>, ImportError> {
    let students = extract_students(grid, layout, imported_at);
    if students.is_empty() {
        return Err(ImportError::NoDataRows {
            sheet: sheet.to_string(),
            layout: layout.name,
        });
    }
    Ok(students)
}

pub fn registrations_from_grid(
    grid: &impl Grid,
    sheet: &str,
    layout: &SheetLayout,
    imported_at: DateTime<Utc>,
) -> Result<Vec<RegistrationRecord>, ImportError> {
    let registrations = extract_registrations(grid, layout, imported_at);
    if registrations.is_empty() {
        return Err(ImportError::NoDataRows {
            sheet: sheet.to_string(),
            layout: layout.name,
        });
    }
    Ok(registrations)
}

/// Reads the transcript export at `path`.
pub fn load_transcript(path: &Path, imported_at: DateTime<Utc>) -> Result<Vec<StudentRecord>, ImportError> {
    let sheet = grid::open_first_sheet(path)?;
    transcript_from_grid(&sheet.cells, &sheet.name, &TRANSCRIPT, imported_at)
}

/// Reads the course-registration export at `path`.
pub fn load_registrations(
    path: &Path,
    imported_at: DateTime<Utc>,
) -> Result<Vec<RegistrationRecord>, ImportError> {
    let sheet = grid::open_first_sheet(path)?;
    registrations_from_grid(&sheet.cells, &sheet.name, &REGISTRATION, imported_at)
}

/// Leading integer of a cell (`"18 credits"` reads as 18); anything else is 0.
/// Digit runs past the `i32` range saturate.
pub fn parse_leading_int(text: &str) -> i32 {
    let text = text.trim();
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => (-1i64, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return 0;
    }
    match digits.parse::<i64>() {
        Ok(value) => {
            let value = sign * value;
            i32::try_from(value).unwrap_or_else(|_| saturated(text, sign))
        }
        // longer than any i64
        Err(_) => saturated(text, sign),
    }
}

fn saturated(text: &str, sign: i64) -> i32 {
    tracing::debug!(cell = %text, "integer cell out of range, saturating");
    if sign < 0 {
        i32::MIN
    } else {
        i32::MAX
    }
}

//! Where things live on the two supported spreadsheet exports.
//!
//! Rows are written as they appear in the spreadsheet (1-based) and columns
//! as letters; [`SheetLayout`] turns them into zero-based grid coordinates.

use crate::grid::column_index;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Program,
    Course,
    ClassName,
    LastName,
    FirstName,
    Gender,
    DateOfBirth,
    TroyId,
    VnuId,
    StudentId,
    PartnerId,
    Email,
    VnuEmail,
    Phone,
    TuitionFee,
    MaxCredits,
    RegisteredCredits,
    TotalSubjects,
    ApprovalStatus,
    ApprovalDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Text,
    Date,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldColumn {
    pub field: Field,
    pub column: u32,
    pub kind: CellKind,
}

const fn text(field: Field, letters: &str) -> FieldColumn {
    FieldColumn {
        field,
        column: column_index(letters),
        kind: CellKind::Text,
    }
}

const fn date(field: Field, letters: &str) -> FieldColumn {
    FieldColumn {
        field,
        column: column_index(letters),
        kind: CellKind::Date,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SheetLayout {
    pub name: &'static str,
    pub header_row: u32,
    pub first_subject_column: u32,
    pub last_subject_column: u32,
    pub data_start_row: u32,
    /// A row whose key cell is blank counts towards the end-of-data run.
    pub key_column: u32,
    pub fields: &'static [FieldColumn],
    /// A subject cell containing any of these counts as an approved
    /// enrolment. Empty when subject cells hold grade histories instead.
    pub enrollment_markers: &'static [&'static str],
}

impl SheetLayout {
    /// Zero-based grid row of the subject header.
    pub fn header_row_index(&self) -> u32 {
        self.header_row - 1
    }

    /// Zero-based grid row of the first data row.
    pub fn data_start_index(&self) -> u32 {
        self.data_start_row - 1
    }

    pub fn subject_columns(&self) -> std::ops::RangeInclusive<u32> {
        self.first_subject_column..=self.last_subject_column
    }
}

pub const APPROVED_ENROLLMENT_MARKERS: &[&str] = &["Đ.ký | Đã duyệt", "Đ.ký mới (Add) | Đã duyệt"];

pub const TRANSCRIPT: SheetLayout = SheetLayout {
    name: "transcript",
    header_row: 7,
    first_subject_column: column_index("L"),
    last_subject_column: column_index("BF"),
    data_start_row: 9,
    key_column: column_index("J"),
    fields: &[
        text(Field::Program, "C"),
        text(Field::Course, "D"),
        text(Field::ClassName, "E"),
        text(Field::LastName, "F"),
        text(Field::FirstName, "G"),
        text(Field::Gender, "H"),
        date(Field::DateOfBirth, "I"),
        text(Field::TroyId, "J"),
        text(Field::VnuId, "K"),
    ],
    enrollment_markers: &[],
};

pub const REGISTRATION: SheetLayout = SheetLayout {
    name: "registration",
    header_row: 2,
    first_subject_column: column_index("T"),
    last_subject_column: column_index("BF"),
    data_start_row: 4,
    key_column: column_index("H"),
    fields: &[
        text(Field::Course, "D"),
        text(Field::ClassName, "E"),
        text(Field::LastName, "F"),
        text(Field::FirstName, "G"),
        text(Field::StudentId, "H"),
        text(Field::PartnerId, "I"),
        date(Field::DateOfBirth, "J"),
        text(Field::Email, "K"),
        text(Field::VnuEmail, "L"),
        text(Field::Phone, "M"),
        text(Field::TuitionFee, "N"),
        text(Field::MaxCredits, "O"),
        text(Field::RegisteredCredits, "P"),
        text(Field::TotalSubjects, "Q"),
        text(Field::ApprovalStatus, "R"),
        text(Field::ApprovalDetails, "S"),
    ],
    enrollment_markers: APPROVED_ENROLLMENT_MARKERS,
};

use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{ConsolidatedRecord, StudentRecord, SubjectGrade, SubjectStatus};
use crate::stats;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportValue {
    Text(String),
    Number(i64),
}

impl ReportValue {
    pub fn render(&self) -> String {
        match self {
            ReportValue::Text(text) => text.clone(),
            ReportValue::Number(value) => value.to_string(),
        }
    }
}

impl From<String> for ReportValue {
    fn from(value: String) -> Self {
        ReportValue::Text(value)
    }
}

impl From<&str> for ReportValue {
    fn from(value: &str) -> Self {
        ReportValue::Text(value.to_string())
    }
}

impl From<usize> for ReportValue {
    fn from(value: usize) -> Self {
        ReportValue::Number(value as i64)
    }
}

impl From<i32> for ReportValue {
    fn from(value: i32) -> Self {
        ReportValue::Number(value.into())
    }
}

/// A titled table of rows, each row holding one value per column.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSheet {
    pub title: String,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<ReportValue>>,
}

impl ReportSheet {
    fn new(title: &str, columns: &[&'static str]) -> Self {
        Self {
            title: title.to_string(),
            columns: columns.to_vec(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<ReportValue>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Value in `column` of row `index`, if both exist.
    #[cfg(test)]
    fn value(&self, index: usize, column: &str) -> Option<&ReportValue> {
        let position = self.columns.iter().position(|name| *name == column)?;
        self.rows.get(index)?.get(position)
    }
}

fn numbered_subjects<'a>(subjects: impl Iterator<Item = &'a SubjectGrade>) -> (String, String) {
    let mut names = Vec::new();
    let mut details = Vec::new();
    for (index, grade) in subjects.enumerate() {
        names.push(format!("{}. {}", index + 1, grade.subject_name()));
        details.push(format!(
            "{}. {}: {} ({} attempts)",
            index + 1,
            grade.subject_name(),
            grade.history(),
            grade.attempts().len()
        ));
    }
    (names.join("\n"), details.join("\n"))
}

/// Students with at least one subject whose latest grade needs a retake.
pub fn retake_students_sheet(students: &[StudentRecord]) -> ReportSheet {
    let mut sheet = ReportSheet::new(
        "Retake students",
        &[
            "No.",
            "Troy ID",
            "VNU ID",
            "Full name",
            "Class",
            "Course",
            "Retake count",
            "Retake subjects",
            "Grade details",
        ],
    );

    for student in students {
        let retakes: Vec<&SubjectGrade> = student.retake_subjects().collect();
        if retakes.is_empty() {
            continue;
        }
        let (subjects, details) = numbered_subjects(retakes.iter().copied());
        let number = sheet.rows.len() + 1;
        sheet.push(vec![
            number.into(),
            student.troy_id.as_str().into(),
            student.vnu_id.as_str().into(),
            student.full_name().into(),
            student.class_name.as_str().into(),
            student.course.as_str().into(),
            retakes.len().into(),
            subjects.into(),
            details.into(),
        ]);
    }

    sheet
}

pub fn all_students_sheet(students: &[StudentRecord]) -> ReportSheet {
    let mut sheet = ReportSheet::new(
        "All students",
        &[
            "No.",
            "Troy ID",
            "VNU ID",
            "Full name",
            "Gender",
            "Date of birth",
            "Class",
            "Course",
            "Program",
            "Subjects",
            "Passed",
            "Retake",
        ],
    );

    for (index, student) in students.iter().enumerate() {
        let retakes = student.retake_subjects().count();
        sheet.push(vec![
            (index + 1).into(),
            student.troy_id.as_str().into(),
            student.vnu_id.as_str().into(),
            student.full_name().into(),
            student.gender.as_str().into(),
            student.date_of_birth.as_str().into(),
            student.class_name.as_str().into(),
            student.course.as_str().into(),
            student.program.as_str().into(),
            student.grades.len().into(),
            (student.grades.len() - retakes).into(),
            retakes.into(),
        ]);
    }

    sheet
}

/// Registrations with registered, graded subjects that need a retake.
pub fn consolidated_retake_sheet(records: &[ConsolidatedRecord]) -> ReportSheet {
    let mut sheet = ReportSheet::new(
        "Registered retakes",
        &[
            "No.",
            "Student ID",
            "Troy ID",
            "VNU ID",
            "Full name",
            "Class",
            "Course",
            "Retake count",
            "Retake subjects",
            "Grade details",
        ],
    );

    for record in records {
        let retakes: Vec<&SubjectGrade> = record.registered_retakes().map(|(_, grade)| grade).collect();
        if retakes.is_empty() {
            continue;
        }
        let (subjects, details) = numbered_subjects(retakes.iter().copied());
        let number = sheet.rows.len() + 1;
        sheet.push(vec![
            number.into(),
            record.student_id.as_str().into(),
            record.troy_id.clone().unwrap_or_default().into(),
            record.vnu_id.clone().unwrap_or_default().into(),
            record.full_name.as_str().into(),
            record.class_name.as_str().into(),
            record.course.as_str().into(),
            retakes.len().into(),
            subjects.into(),
            details.into(),
        ]);
    }

    sheet
}

pub fn consolidated_all_sheet(records: &[ConsolidatedRecord]) -> ReportSheet {
    let mut sheet = ReportSheet::new(
        "Registrations and grades",
        &[
            "No.",
            "Student ID",
            "Troy ID",
            "VNU ID",
            "Full name",
            "Class",
            "Course",
            "Date of birth",
            "Email",
            "Declared subjects",
            "Registered credits",
            "Graded",
            "Passed",
            "Retake",
            "No grade",
        ],
    );

    for (index, record) in records.iter().enumerate() {
        let graded = record.count_status(SubjectStatus::RegisteredWithGrade);
        let retakes = record.registered_retakes().count();
        sheet.push(vec![
            (index + 1).into(),
            record.student_id.as_str().into(),
            record.troy_id.clone().unwrap_or_default().into(),
            record.vnu_id.clone().unwrap_or_default().into(),
            record.full_name.as_str().into(),
            record.class_name.as_str().into(),
            record.course.as_str().into(),
            record.date_of_birth.as_str().into(),
            record.email.as_str().into(),
            record.total_subjects.into(),
            record.registered_credits.into(),
            graded.into(),
            (graded - retakes).into(),
            retakes.into(),
            record.count_status(SubjectStatus::RegisteredNoGrade).into(),
        ]);
    }

    sheet
}

fn status_label(status: SubjectStatus, grade: Option<&SubjectGrade>) -> &'static str {
    let retake = grade.is_some_and(SubjectGrade::needs_retake);
    match status {
        SubjectStatus::RegisteredWithGrade if retake => "Needs retake",
        SubjectStatus::RegisteredWithGrade => "Passed",
        SubjectStatus::RegisteredNoGrade => "No grade yet",
        SubjectStatus::NotRegisteredWithGrade if retake => "Graded, not registered - needs retake",
        SubjectStatus::NotRegisteredWithGrade => "Graded, not registered - passed",
        SubjectStatus::NotRegistered => "Not registered, no grade",
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// One row per registration and subject.
pub fn consolidated_detailed_sheet(records: &[ConsolidatedRecord]) -> ReportSheet {
    let mut sheet = ReportSheet::new(
        "Subject details",
        &[
            "No.",
            "Student ID",
            "Full name",
            "Class",
            "Subject",
            "Registered",
            "Graded",
            "Grades",
            "Status",
            "Attempts",
        ],
    );

    for record in records {
        for (subject, entry) in &record.subject_statuses {
            let grade = entry.grade.as_ref();
            let number = sheet.rows.len() + 1;
            sheet.push(vec![
                number.into(),
                record.student_id.as_str().into(),
                record.full_name.as_str().into(),
                record.class_name.as_str().into(),
                subject.as_str().into(),
                yes_no(entry.is_registered).into(),
                yes_no(grade.is_some()).into(),
                grade.map(SubjectGrade::history).unwrap_or_else(|| "-".to_string()).into(),
                status_label(entry.status, grade).into(),
                grade
                    .map(|g| ReportValue::from(g.attempts().len()))
                    .unwrap_or_else(|| "-".into()),
            ]);
        }
    }

    sheet
}

pub fn build_report(
    generated_on: NaiveDate,
    students: &[StudentRecord],
    records: &[ConsolidatedRecord],
) -> String {
    let transcript = stats::transcript_stats(students);
    let consolidated = stats::consolidated_stats(records);
    let ranking = stats::rank_registered_retakes(records);

    let mut output = String::new();

    let _ = writeln!(output, "# Registration and Grade Report");
    let _ = writeln!(output, "Generated on {}", generated_on.format("%d/%m/%Y"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Transcript");
    let _ = writeln!(
        output,
        "- {} students, {} graded subjects ({:.1} per student)",
        transcript.students, transcript.graded_subjects, transcript.avg_subjects_per_student
    );
    let _ = writeln!(
        output,
        "- {} students with {} subjects needing a retake",
        transcript.students_with_retake, transcript.retake_subjects
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Registrations");
    let _ = writeln!(
        output,
        "- {} registrations, {} matched to a transcript row",
        consolidated.registrations, consolidated.matched
    );
    let _ = writeln!(
        output,
        "- {} registered subjects graded, {} awaiting a grade, {} needing a retake",
        consolidated.registered_with_grade,
        consolidated.registered_no_grade,
        consolidated.registered_retakes
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Registered Retakes");

    if ranking.is_empty() {
        let _ = writeln!(output, "No registered subject needs a retake.");
    } else {
        for entry in ranking.iter().take(10) {
            let subjects: Vec<String> = entry
                .record
                .registered_retakes()
                .map(|(name, grade)| format!("{name} ({})", grade.history()))
                .collect();
            let _ = writeln!(
                output,
                "- {} ({}, {}): {}",
                entry.record.full_name,
                entry.record.student_id,
                entry.record.class_name,
                subjects.join(", ")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Awaiting Grades");

    let awaiting: Vec<&ConsolidatedRecord> = records
        .iter()
        .filter(|record| record.count_status(SubjectStatus::RegisteredNoGrade) > 0)
        .collect();
    if awaiting.is_empty() {
        let _ = writeln!(output, "Every registered subject has a grade.");
    } else {
        for record in awaiting.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}): {} of {} registered subjects without a grade",
                record.full_name,
                record.student_id,
                record.count_status(SubjectStatus::RegisteredNoGrade),
                record.registered_subjects.len()
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::consolidate;
    use crate::grades::subject_grade;
    use crate::matching::tests::{registration, student};
    use pretty_assertions::assert_eq;

    fn fixture() -> (Vec<StudentRecord>, Vec<ConsolidatedRecord>) {
        let mut graded = student("T1", "V1");
        graded
            .grades
            .insert("Math".into(), subject_grade("Math", "FDC").unwrap());
        graded
            .grades
            .insert("Physics".into(), subject_grade("Physics", "B+F").unwrap());
        graded
            .grades
            .insert("History".into(), subject_grade("History", "A").unwrap());
        let clean = student("T2", "V2");

        let mut reg = registration("T1", "");
        reg.registered_subjects = vec!["Physics".into(), "Art".into()];
        let students = vec![graded, clean];
        let records = consolidate(&students, &[reg]);
        (students, records)
    }

    #[test]
    fn retake_sheet_lists_only_students_with_retakes() {
        let (students, _) = fixture();
        let sheet = retake_students_sheet(&students);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.value(0, "Troy ID"), Some(&ReportValue::Text("T1".into())));
        assert_eq!(sheet.value(0, "Retake count"), Some(&ReportValue::Number(1)));
        assert_eq!(
            sheet.value(0, "Grade details"),
            Some(&ReportValue::Text("1. Physics: B+ → F (2 attempts)".into()))
        );
    }

    #[test]
    fn all_students_sheet_counts_passed_and_retake() {
        let (students, _) = fixture();
        let sheet = all_students_sheet(&students);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.value(0, "Passed"), Some(&ReportValue::Number(2)));
        assert_eq!(sheet.value(0, "Retake"), Some(&ReportValue::Number(1)));
        assert_eq!(sheet.value(1, "Subjects"), Some(&ReportValue::Number(0)));
    }

    #[test]
    fn consolidated_sheets() {
        let (_, records) = fixture();

        let retake = consolidated_retake_sheet(&records);
        assert_eq!(retake.rows.len(), 1);
        assert_eq!(
            retake.value(0, "Retake subjects"),
            Some(&ReportValue::Text("1. Physics".into()))
        );

        let all = consolidated_all_sheet(&records);
        assert_eq!(all.value(0, "Graded"), Some(&ReportValue::Number(1)));
        assert_eq!(all.value(0, "Passed"), Some(&ReportValue::Number(0)));
        assert_eq!(all.value(0, "No grade"), Some(&ReportValue::Number(1)));
    }

    #[test]
    fn detailed_sheet_has_one_row_per_subject() {
        let (_, records) = fixture();
        let sheet = consolidated_detailed_sheet(&records);
        let subjects: Vec<_> = (0..sheet.rows.len())
            .map(|i| sheet.value(i, "Subject").unwrap().render())
            .collect();
        assert_eq!(subjects, vec!["Physics", "Art", "Math", "History"]);
        let statuses: Vec<_> = (0..sheet.rows.len())
            .map(|i| sheet.value(i, "Status").unwrap().render())
            .collect();
        assert_eq!(
            statuses,
            vec![
                "Needs retake",
                "No grade yet",
                "Graded, not registered - passed",
                "Graded, not registered - passed",
            ]
        );
        assert_eq!(sheet.value(1, "Attempts"), Some(&ReportValue::Text("-".into())));
        assert_eq!(sheet.value(2, "Grades"), Some(&ReportValue::Text("F → D → C".into())));
    }

    #[test]
    fn markdown_report_mentions_retakes() {
        let (students, records) = fixture();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let report = build_report(date, &students, &records);
        assert!(report.starts_with("# Registration and Grade Report\nGenerated on 01/03/2026"));
        assert!(report.contains("- Pham T1 (T1, BBA20A): Physics (B+ → F)"));
        assert!(report.contains("1 of 2 registered subjects without a grade"));
    }
}

use indexmap::IndexMap;

use crate::matching::match_student;
use crate::models::{
    ConsolidatedRecord, RegistrationRecord, StudentRecord, SubjectStatus, SubjectStatusEntry,
};

/// Joins every registration with its transcript row, one output per
/// registration in the same order.
pub fn consolidate(
    students: &[StudentRecord],
    registrations: &[RegistrationRecord],
) -> Vec<ConsolidatedRecord> {
    let records: Vec<ConsolidatedRecord> = registrations
        .iter()
        .map(|registration| consolidate_one(registration, match_student(registration, students)))
        .collect();

    tracing::debug!(
        registrations = records.len(),
        matched = records.iter().filter(|r| r.is_matched()).count(),
        "consolidated"
    );

    records
}

pub fn consolidate_one(
    registration: &RegistrationRecord,
    student: Option<&StudentRecord>,
) -> ConsolidatedRecord {
    // registered subjects first, then graded-only subjects, each in source order
    let graded_names = student.into_iter().flat_map(|s| s.grades.keys());
    let mut subject_statuses = IndexMap::new();

    for subject in registration.registered_subjects.iter().chain(graded_names) {
        if subject_statuses.contains_key(subject) {
            continue;
        }
        let is_registered = registration.is_registered_for(subject);
        let grade = student.and_then(|s| s.grades.get(subject)).cloned();
        let status = SubjectStatus::classify(is_registered, grade.is_some());
        subject_statuses.insert(
            subject.clone(),
            SubjectStatusEntry {
                is_registered,
                grade,
                status,
            },
        );
    }

    ConsolidatedRecord {
        student_id: registration.student_id.clone(),
        partner_id: registration.partner_id.clone(),
        troy_id: student.map(|s| s.troy_id.clone()),
        vnu_id: student.map(|s| s.vnu_id.clone()),
        full_name: registration.full_name(),
        class_name: registration.class_name.clone(),
        course: registration.course.clone(),
        date_of_birth: registration.date_of_birth.clone(),
        email: registration.email.clone(),
        registered_subjects: registration.registered_subjects.clone(),
        max_credits: registration.max_credits,
        registered_credits: registration.registered_credits,
        total_subjects: registration.total_subjects,
        approval_status: registration.approval_status.clone(),
        approval_details: registration.approval_details.clone(),
        subject_statuses,
    }
}

use crate::models::{RegistrationRecord, StudentRecord};

/// Either transcript ID equals either registration ID. Exact, case-sensitive.
pub fn identity_matches(student: &StudentRecord, registration: &RegistrationRecord) -> bool {
    student.troy_id == registration.student_id
        || student.troy_id == registration.partner_id
        || student.vnu_id == registration.student_id
        || student.vnu_id == registration.partner_id
}

/// The first student in `students` that [`identity_matches`] the registration.
///
/// Further matches are only reported; the first one is always the one used.
pub fn match_student<'a>(
    registration: &RegistrationRecord,
    students: &'a [StudentRecord],
) -> Option<&'a StudentRecord> {
    let mut matches = students
        .iter()
        .filter(|student| identity_matches(student, registration));
    let first = matches.next()?;

    let extra = matches.count();
    if extra > 0 {
        tracing::warn!(
            student_id = %registration.student_id,
            partner_id = %registration.partner_id,
            chosen_troy_id = %first.troy_id,
            extra,
            "registration matches several transcript rows, using the first"
        );
    }

    Some(first)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use indexmap::IndexMap;

    pub(crate) fn student(troy_id: &str, vnu_id: &str) -> StudentRecord {
        StudentRecord {
            program: String::new(),
            course: "K20".to_string(),
            class_name: "BBA20A".to_string(),
            last_name: "Pham".to_string(),
            first_name: troy_id.to_string(),
            gender: String::new(),
            date_of_birth: String::new(),
            troy_id: troy_id.to_string(),
            vnu_id: vnu_id.to_string(),
            grades: IndexMap::new(),
            imported_at: Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0).unwrap(),
        }
    }

    pub(crate) fn registration(student_id: &str, partner_id: &str) -> RegistrationRecord {
        RegistrationRecord {
            course: "K20".to_string(),
            class_name: "BBA20A".to_string(),
            last_name: "Pham".to_string(),
            first_name: student_id.to_string(),
            student_id: student_id.to_string(),
            partner_id: partner_id.to_string(),
            date_of_birth: String::new(),
            email: format!("{student_id}@example.com"),
            vnu_email: String::new(),
            phone: String::new(),
            tuition_fee: String::new(),
            max_credits: 24,
            registered_credits: 0,
            total_subjects: 0,
            approval_status: String::new(),
            approval_details: String::new(),
            registered_subjects: Vec::new(),
            imported_at: Utc.with_ymd_and_hms(2026, 1, 16, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn any_of_the_four_id_pairs_match() {
        let reg = registration("S1", "P1");
        assert!(identity_matches(&student("S1", "x"), &reg));
        assert!(identity_matches(&student("P1", "x"), &reg));
        assert!(identity_matches(&student("x", "S1"), &reg));
        assert!(identity_matches(&student("x", "P1"), &reg));
        assert!(!identity_matches(&student("x", "y"), &reg));
    }

    #[test]
    fn comparison_is_exact() {
        let reg = registration("s1", " P1");
        assert!(!identity_matches(&student("S1", "P1"), &reg));
    }

    #[test]
    fn first_match_wins() {
        let students = vec![student("x", "y"), student("T1", "S1"), student("S1", "z")];
        let reg = registration("S1", "P1");
        let matched = match_student(&reg, &students).unwrap();
        assert_eq!(matched.troy_id, "T1");
    }

    #[test]
    fn no_match_is_none() {
        let students = vec![student("T1", "V1")];
        assert!(match_student(&registration("S1", "P1"), &students).is_none());
        assert!(match_student(&registration("S1", "P1"), &[]).is_none());
    }
}

use crate::models::{ConsolidatedRecord, StudentRecord, SubjectStatus};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptStats {
    pub students: usize,
    pub graded_subjects: usize,
    pub avg_subjects_per_student: f64,
    pub students_with_retake: usize,
    pub retake_subjects: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidatedStats {
    pub registrations: usize,
    pub matched: usize,
    pub registered_with_grade: usize,
    pub registered_no_grade: usize,
    pub registered_retakes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetakeRanking<'a> {
    pub record: &'a ConsolidatedRecord,
    pub retake_count: usize,
}

pub fn transcript_stats(students: &[StudentRecord]) -> TranscriptStats {
    let graded_subjects: usize = students.iter().map(|s| s.grades.len()).sum();
    let retake_counts: Vec<usize> = students
        .iter()
        .map(|s| s.retake_subjects().count())
        .collect();

    TranscriptStats {
        students: students.len(),
        graded_subjects,
        avg_subjects_per_student: if students.is_empty() {
            0.0
        } else {
            graded_subjects as f64 / students.len() as f64
        },
        students_with_retake: retake_counts.iter().filter(|count| **count > 0).count(),
        retake_subjects: retake_counts.iter().sum(),
    }
}

pub fn consolidated_stats(records: &[ConsolidatedRecord]) -> ConsolidatedStats {
    let mut stats = ConsolidatedStats {
        registrations: records.len(),
        ..ConsolidatedStats::default()
    };

    for record in records {
        if record.is_matched() {
            stats.matched += 1;
        }
        stats.registered_with_grade += record.count_status(SubjectStatus::RegisteredWithGrade);
        stats.registered_no_grade += record.count_status(SubjectStatus::RegisteredNoGrade);
        stats.registered_retakes += record.registered_retakes().count();
    }

    stats
}

/// Records with at least one registered retake, most retakes first. Ties
/// keep registration order.
pub fn rank_registered_retakes(records: &[ConsolidatedRecord]) -> Vec<RetakeRanking<'_>> {
    let mut ranking: Vec<RetakeRanking<'_>> = records
        .iter()
        .map(|record| RetakeRanking {
            record,
            retake_count: record.registered_retakes().count(),
        })
        .filter(|entry| entry.retake_count > 0)
        .collect();

    ranking.sort_by(|a, b| b.retake_count.cmp(&a.retake_count));
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::consolidate;
    use crate::grades::subject_grade;
    use crate::matching::tests::{registration, student};

    fn fixture() -> Vec<ConsolidatedRecord> {
        let mut first = student("T1", "V1");
        for (subject, raw) in [("Math", "F"), ("Physics", "A"), ("History", "D")] {
            first
                .grades
                .insert(subject.to_string(), subject_grade(subject, raw).unwrap());
        }
        let mut second = student("T2", "V2");
        second
            .grades
            .insert("Math".to_string(), subject_grade("Math", "D+").unwrap());

        let mut reg_a = registration("T1", "");
        reg_a.registered_subjects = vec!["Math".into(), "Physics".into(), "Art".into()];
        let mut reg_b = registration("T2", "");
        reg_b.registered_subjects = vec!["Math".into(), "Physics".into()];
        let mut reg_c = registration("ghost", "");
        reg_c.registered_subjects = vec!["Math".into()];

        consolidate(&[first, second], &[reg_a, reg_b, reg_c])
    }

    #[test]
    fn transcript_totals() {
        let mut a = student("T1", "V1");
        a.grades.insert("Math".into(), subject_grade("Math", "F").unwrap());
        a.grades.insert("Art".into(), subject_grade("Art", "A").unwrap());
        let b = student("T2", "V2");

        let stats = transcript_stats(&[a, b]);
        assert_eq!(stats.students, 2);
        assert_eq!(stats.graded_subjects, 2);
        assert!((stats.avg_subjects_per_student - 1.0).abs() < f64::EPSILON);
        assert_eq!(stats.students_with_retake, 1);
        assert_eq!(stats.retake_subjects, 1);
        assert_eq!(transcript_stats(&[]), TranscriptStats::default());
    }

    #[test]
    fn consolidated_totals() {
        let stats = consolidated_stats(&fixture());
        assert_eq!(
            stats,
            ConsolidatedStats {
                registrations: 3,
                matched: 2,
                // T1: Math, Physics; T2: Math
                registered_with_grade: 3,
                // T1: Art; T2: Physics; ghost: Math
                registered_no_grade: 3,
                registered_retakes: 2,
            }
        );
    }

    #[test]
    fn ranking_skips_clean_records() {
        let records = fixture();
        let ranking = rank_registered_retakes(&records);
        let ids: Vec<_> = ranking.iter().map(|r| r.record.student_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2"]);
        assert!(ranking.iter().all(|r| r.retake_count == 1));
    }
}

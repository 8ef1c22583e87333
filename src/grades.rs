use crate::models::{GradeCode, SubjectGrade};

/// Reads grade codes out of a transcript cell, left to right.
///
/// Anything that is not a grade code is stepped over one character at a
/// time, so separators and stray punctuation never stop the scan.
pub fn tokenize(raw: &str) -> Vec<GradeCode> {
    let text = raw.trim();
    let mut grades = Vec::new();
    let mut rest = text;

    while let Some(first) = rest.chars().next() {
        let matched = GradeCode::MATCH_ORDER
            .iter()
            .copied()
            .find(|code| rest.starts_with(code.as_str()));

        match matched {
            Some(code) => {
                grades.push(code);
                rest = &rest[code.as_str().len()..];
            }
            None => rest = &rest[first.len_utf8()..],
        }
    }

    grades
}

/// Tokenizes a cell into a [`SubjectGrade`]; a cell without any grade code
/// yields nothing at all.
pub fn subject_grade(subject_name: &str, raw: &str) -> Option<SubjectGrade> {
    SubjectGrade::new(subject_name, tokenize(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use GradeCode::*;

    #[test]
    fn repeated_letters_are_separate_attempts() {
        assert_eq!(tokenize("AA"), vec![A, A]);
    }

    #[test]
    fn plus_grades_are_not_split() {
        assert_eq!(tokenize("C+D"), vec![CPlus, D]);
        assert_eq!(tokenize("A+"), vec![APlus]);
        assert_eq!(tokenize("D+F B+"), vec![DPlus, F, BPlus]);
    }

    #[test]
    fn blank_cells_yield_nothing() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
        assert!(subject_grade("Math", "   ").is_none());
    }

    #[test]
    fn garbage_is_skipped_without_aborting() {
        assert_eq!(tokenize("F, (retake) A"), vec![F, A]);
        assert_eq!(tokenize("đ+ B"), vec![B]);
        assert!(tokenize("xyz-+").is_empty());
        assert!(subject_grade("Math", "n/a").is_none());
    }

    #[test]
    fn lowercase_letters_are_not_grades() {
        assert!(tokenize("a b c").is_empty());
    }

    #[test]
    fn subject_grade_keeps_history_order() {
        let grade = subject_grade("Calculus", " FD+C ").unwrap();
        assert_eq!(grade.subject_name(), "Calculus");
        assert_eq!(grade.attempts(), &[F, DPlus, C]);
        assert_eq!(grade.latest_grade(), C);
        assert!(!grade.needs_retake());
    }
}

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One of the nine letter grades recorded on a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeCode {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "D+")]
    DPlus,
    D,
    F,
}

impl GradeCode {
    /// Suffixed codes come before the bare letter they start with.
    pub const MATCH_ORDER: [GradeCode; 9] = [
        GradeCode::APlus,
        GradeCode::BPlus,
        GradeCode::CPlus,
        GradeCode::DPlus,
        GradeCode::A,
        GradeCode::B,
        GradeCode::C,
        GradeCode::D,
        GradeCode::F,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GradeCode::APlus => "A+",
            GradeCode::A => "A",
            GradeCode::BPlus => "B+",
            GradeCode::B => "B",
            GradeCode::CPlus => "C+",
            GradeCode::C => "C",
            GradeCode::DPlus => "D+",
            GradeCode::D => "D",
            GradeCode::F => "F",
        }
    }

    pub fn is_failing(self) -> bool {
        matches!(self, GradeCode::DPlus | GradeCode::D | GradeCode::F)
    }
}

/// Every recorded attempt at one subject, earliest first.
///
/// Only constructible through [`SubjectGrade::new`], which refuses an empty
/// attempt list, so `latest_grade` always has something to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubjectGradeRepr")]
pub struct SubjectGrade {
    subject_name: String,
    attempts: Vec<GradeCode>,
}

#[derive(Deserialize)]
struct SubjectGradeRepr {
    subject_name: String,
    attempts: Vec<GradeCode>,
}

impl TryFrom<SubjectGradeRepr> for SubjectGrade {
    type Error = String;

    fn try_from(repr: SubjectGradeRepr) -> Result<Self, Self::Error> {
        SubjectGrade::new(repr.subject_name.clone(), repr.attempts)
            .ok_or_else(|| format!("subject {} has no recorded attempts", repr.subject_name))
    }
}

impl SubjectGrade {
    pub fn new(subject_name: impl Into<String>, attempts: Vec<GradeCode>) -> Option<Self> {
        if attempts.is_empty() {
            return None;
        }
        Some(Self {
            subject_name: subject_name.into(),
            attempts,
        })
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn attempts(&self) -> &[GradeCode] {
        &self.attempts
    }

    pub fn latest_grade(&self) -> GradeCode {
        // attempts is non-empty by construction
        self.attempts[self.attempts.len() - 1]
    }

    pub fn needs_retake(&self) -> bool {
        self.latest_grade().is_failing()
    }

    /// Attempt history joined with arrows, e.g. `F → D → C`.
    pub fn history(&self) -> String {
        self.attempts
            .iter()
            .map(|grade| grade.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub program: String,
    pub course: String,
    pub class_name: String,
    pub last_name: String,
    pub first_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub troy_id: String,
    pub vnu_id: String,
    /// Keyed by subject name, in header order.
    pub grades: IndexMap<String, SubjectGrade>,
    pub imported_at: DateTime<Utc>,
}

impl StudentRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    pub fn retake_subjects(&self) -> impl Iterator<Item = &SubjectGrade> {
        self.grades.values().filter(|grade| grade.needs_retake())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub course: String,
    pub class_name: String,
    pub last_name: String,
    pub first_name: String,
    pub student_id: String,
    pub partner_id: String,
    pub date_of_birth: String,
    pub email: String,
    pub vnu_email: String,
    pub phone: String,
    pub tuition_fee: String,
    pub max_credits: i32,
    pub registered_credits: i32,
    pub total_subjects: i32,
    pub approval_status: String,
    pub approval_details: String,
    pub registered_subjects: Vec<String>,
    pub imported_at: DateTime<Utc>,
}

impl RegistrationRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    pub fn is_registered_for(&self, subject: &str) -> bool {
        self.registered_subjects.iter().any(|name| name == subject)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectStatus {
    RegisteredWithGrade,
    RegisteredNoGrade,
    NotRegisteredWithGrade,
    NotRegistered,
}

impl SubjectStatus {
    pub fn classify(is_registered: bool, has_grade: bool) -> Self {
        match (is_registered, has_grade) {
            (true, true) => SubjectStatus::RegisteredWithGrade,
            (true, false) => SubjectStatus::RegisteredNoGrade,
            (false, true) => SubjectStatus::NotRegisteredWithGrade,
            (false, false) => SubjectStatus::NotRegistered,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStatusEntry {
    pub is_registered: bool,
    pub grade: Option<SubjectGrade>,
    pub status: SubjectStatus,
}

impl SubjectStatusEntry {
    /// Registered, graded, and the latest grade is failing.
    pub fn is_registered_retake(&self) -> bool {
        self.status == SubjectStatus::RegisteredWithGrade
            && self.grade.as_ref().is_some_and(SubjectGrade::needs_retake)
    }
}

/// One registration joined against its matched transcript row, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedRecord {
    pub student_id: String,
    pub partner_id: String,
    pub troy_id: Option<String>,
    pub vnu_id: Option<String>,
    pub full_name: String,
    pub class_name: String,
    pub course: String,
    pub date_of_birth: String,
    pub email: String,
    pub registered_subjects: Vec<String>,
    pub max_credits: i32,
    pub registered_credits: i32,
    pub total_subjects: i32,
    pub approval_status: String,
    pub approval_details: String,
    pub subject_statuses: IndexMap<String, SubjectStatusEntry>,
}

impl ConsolidatedRecord {
    pub fn is_matched(&self) -> bool {
        self.troy_id.is_some() || self.vnu_id.is_some()
    }

    pub fn count_status(&self, status: SubjectStatus) -> usize {
        self.subject_statuses
            .values()
            .filter(|entry| entry.status == status)
            .count()
    }

    pub fn registered_retakes(&self) -> impl Iterator<Item = (&String, &SubjectGrade)> {
        self.subject_statuses.iter().filter_map(|(name, entry)| {
            if entry.is_registered_retake() {
                entry.grade.as_ref().map(|grade| (name, grade))
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_attempts_produce_no_subject_grade() {
        assert!(SubjectGrade::new("Math", Vec::new()).is_none());
    }

    #[test]
    fn only_latest_attempt_decides_retake() {
        let recovered = SubjectGrade::new("Math", vec![GradeCode::F, GradeCode::A]).unwrap();
        assert_eq!(recovered.latest_grade(), GradeCode::A);
        assert!(!recovered.needs_retake());

        let relapsed = SubjectGrade::new("Math", vec![GradeCode::A, GradeCode::DPlus]).unwrap();
        assert!(relapsed.needs_retake());
    }

    #[test]
    fn classification_covers_all_four_states() {
        assert_eq!(SubjectStatus::classify(true, true), SubjectStatus::RegisteredWithGrade);
        assert_eq!(SubjectStatus::classify(true, false), SubjectStatus::RegisteredNoGrade);
        assert_eq!(
            SubjectStatus::classify(false, true),
            SubjectStatus::NotRegisteredWithGrade
        );
        assert_eq!(SubjectStatus::classify(false, false), SubjectStatus::NotRegistered);
    }

    #[test]
    fn subject_grade_json_keeps_grade_spelling() {
        let grade = SubjectGrade::new("Physics", vec![GradeCode::CPlus, GradeCode::BPlus]).unwrap();
        let json = serde_json::to_string(&grade).unwrap();
        assert_eq!(json, r#"{"subject_name":"Physics","attempts":["C+","B+"]}"#);

        let back: SubjectGrade = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grade);
        assert!(serde_json::from_str::<SubjectGrade>(r#"{"subject_name":"X","attempts":[]}"#).is_err());
    }

    #[test]
    fn history_uses_arrows() {
        let grade = SubjectGrade::new("Math", vec![GradeCode::F, GradeCode::D, GradeCode::C]).unwrap();
        assert_eq!(grade.history(), "F → D → C");
    }
}

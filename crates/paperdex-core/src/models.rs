//! The paper data model: enumerations, records, and boundary validation.
//!
//! The textual enum spellings double as the canonical database and path
//! representations, so `Display` and the parsing functions must stay in
//! sync with the migrations and with [`crate::paths`].

use chrono::{DateTime, Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::paths::PaperLocation;

/// Earliest plausible paper year accepted at the boundary.
pub const MIN_PAPER_YEAR: i32 = 1900;

/// Course codes are two letters followed by five digits (e.g. `CS10001`).
static COURSE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{2}[0-9]{5}$").expect("course code regex is valid"));

/// Represents a semester.
///
/// Parsing is total: the two known spellings map to their variants and
/// anything else (including the empty string) falls back to [`Semester::Unknown`].
/// `Unknown` marks papers whose semester was never recorded; it is a real
/// value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semester {
    Autumn,
    Spring,
    Unknown,
}

impl Semester {
    /// Total parser for the known spellings.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "autumn" => Semester::Autumn,
            "spring" => Semester::Spring,
            _ => Semester::Unknown,
        }
    }
}

impl std::fmt::Display for Semester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Autumn => write!(f, "autumn"),
            Self::Spring => write!(f, "spring"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Represents the exam type of a paper.
///
/// Class tests carry an optional ordinal (`ct` is a class test with an
/// unknown number, `ct3` is class test 3). Parsing is total; a malformed
/// ordinal falls back to [`Exam::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exam {
    Midsem,
    Endsem,
    ClassTest(Option<u32>),
    Unknown,
}

impl Exam {
    /// Total parser for the known spellings, including bare `ct` and `ct<N>`.
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "midsem" => Exam::Midsem,
            "endsem" => Exam::Endsem,
            _ => {
                if let Some(stripped) = value.strip_prefix("ct") {
                    if stripped.is_empty() {
                        Exam::ClassTest(None)
                    } else if let Ok(n) = stripped.parse::<u32>() {
                        Exam::ClassTest(Some(n))
                    } else {
                        Exam::Unknown
                    }
                } else {
                    Exam::Unknown
                }
            }
        }
    }
}

impl std::fmt::Display for Exam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Midsem => write!(f, "midsem"),
            Self::Endsem => write!(f, "endsem"),
            Self::ClassTest(None) => write!(f, "ct"),
            Self::ClassTest(Some(n)) => write!(f, "ct{}", n),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Serialize the paper enums as their canonical string spellings and accept
/// any spelling back (total parse) on deserialization.
macro_rules! string_enum_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(<$ty>::parse(&s))
            }
        }
    };
}

string_enum_serde!(Semester);
string_enum_serde!(Exam);

/// Structured exam filter accepted by the search endpoint.
///
/// `MidEnd` matches either semester exam; `ClassTest` matches any ordinal.
/// Unlike the record enums this parser is strict: an unrecognized filter is
/// a caller error, not an unknown data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExamFilter {
    #[default]
    Any,
    Midsem,
    Endsem,
    MidEnd,
    ClassTest,
}

impl ExamFilter {
    /// Whether a record's exam passes this filter. Records with an unknown
    /// exam pass every filter class.
    pub fn matches(&self, exam: Exam) -> bool {
        match self {
            ExamFilter::Any => true,
            ExamFilter::Midsem => matches!(exam, Exam::Midsem | Exam::Unknown),
            ExamFilter::Endsem => matches!(exam, Exam::Endsem | Exam::Unknown),
            ExamFilter::MidEnd => {
                matches!(exam, Exam::Midsem | Exam::Endsem | Exam::Unknown)
            }
            ExamFilter::ClassTest => matches!(exam, Exam::ClassTest(_) | Exam::Unknown),
        }
    }
}

impl std::str::FromStr for ExamFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "any" => Ok(ExamFilter::Any),
            "midsem" => Ok(ExamFilter::Midsem),
            "endsem" => Ok(ExamFilter::Endsem),
            "midend" => Ok(ExamFilter::MidEnd),
            "ct" | "classtest" => Ok(ExamFilter::ClassTest),
            other => Err(format!("Invalid exam filter: {}", other)),
        }
    }
}

/// Whether a paper came from the pre-vetted library scrape or a public upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Library,
    Uploaded,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Uploaded => write!(f, "uploaded"),
        }
    }
}

impl std::str::FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "library" => Ok(Self::Library),
            "uploaded" => Ok(Self::Uploaded),
            other => Err(format!("Invalid origin: {}", other)),
        }
    }
}

/// Review state of an uploaded paper. Pending is a first-class value, not
/// the absence of one; library papers are approved from birth and stay so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("Invalid approval status: {}", other)),
        }
    }
}

/// One question-paper record.
///
/// `filelink` is deliberately absent: the storage slug and public URL are
/// derived from the other fields via [`crate::paths::PathResolver`] and
/// never stored independently.
#[derive(Debug, Clone, Serialize)]
pub struct Paper {
    pub id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub year: i32,
    pub semester: Semester,
    pub exam: Exam,
    pub origin: Origin,
    pub approval: ApprovalStatus,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub note: String,
    pub upload_timestamp: DateTime<Utc>,
}

impl Paper {
    /// The path-determining subset of this record's fields.
    pub fn location(&self) -> PaperLocation {
        PaperLocation {
            course_code: self.course_code.clone(),
            year: self.year,
            semester: self.semester,
            exam: self.exam,
            id: self.id,
        }
    }

    /// Whether this record belongs in the public search corpus.
    pub fn is_searchable(&self) -> bool {
        !self.deleted
            && (self.origin == Origin::Library || self.approval == ApprovalStatus::Approved)
    }
}

/// Metadata for a paper being inserted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPaper {
    pub course_code: String,
    pub course_name: String,
    pub year: i32,
    pub semester: Semester,
    pub exam: Exam,
    #[serde(default)]
    pub note: String,
}

/// Partial metadata update applied by an admin edit. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperPatch {
    pub course_code: Option<String>,
    pub course_name: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<Semester>,
    pub exam: Option<Exam>,
    pub approved: Option<bool>,
    pub note: Option<String>,
}

impl PaperPatch {
    /// Whether applying this patch can change the derived storage path.
    pub fn affects_path(&self) -> bool {
        self.course_code.is_some()
            || self.year.is_some()
            || self.semester.is_some()
            || self.exam.is_some()
    }
}

/// One ranked search result, with the public file URL materialized.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub year: i32,
    pub semester: Semester,
    pub exam: Exam,
    pub origin: Origin,
    pub filelink: String,
    pub score: f64,
}

/// Per-id outcome of a batch hard delete.
#[derive(Debug, Clone, Serialize)]
pub struct HardDeleteOutcome {
    pub id: Uuid,
    pub success: bool,
    pub message: String,
}

/// Normalizes a course code to canonical uppercase, rejecting anything that
/// is not two letters followed by five digits.
pub fn normalize_course_code(raw: &str) -> std::result::Result<String, ValidationError> {
    let trimmed = raw.trim();
    if COURSE_CODE_RE.is_match(trimmed) {
        Ok(trimmed.to_uppercase())
    } else {
        Err(ValidationError::CourseCode(raw.to_string()))
    }
}

/// Rejects years before [`MIN_PAPER_YEAR`] or after the current calendar year.
pub fn validate_year(year: i32) -> std::result::Result<(), ValidationError> {
    let current = Utc::now().year();
    if (MIN_PAPER_YEAR..=current).contains(&year) {
        Ok(())
    } else {
        Err(ValidationError::Year(year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semester_parse_known_spellings() {
        assert_eq!(Semester::parse("autumn"), Semester::Autumn);
        assert_eq!(Semester::parse("spring"), Semester::Spring);
        assert_eq!(Semester::parse("Autumn "), Semester::Autumn);
    }

    #[test]
    fn test_semester_parse_is_total() {
        assert_eq!(Semester::parse(""), Semester::Unknown);
        assert_eq!(Semester::parse("unknown"), Semester::Unknown);
        assert_eq!(Semester::parse("puppy"), Semester::Unknown);
    }

    #[test]
    fn test_semester_display_round_trip() {
        for sem in [Semester::Autumn, Semester::Spring, Semester::Unknown] {
            assert_eq!(Semester::parse(&sem.to_string()), sem);
        }
    }

    #[test]
    fn test_exam_parse_class_tests() {
        assert_eq!(Exam::parse("ct"), Exam::ClassTest(None));
        assert_eq!(Exam::parse("ct1"), Exam::ClassTest(Some(1)));
        assert_eq!(Exam::parse("ct21"), Exam::ClassTest(Some(21)));
    }

    #[test]
    fn test_exam_parse_is_total() {
        assert_eq!(Exam::parse(""), Exam::Unknown);
        assert_eq!(Exam::parse("ctx"), Exam::Unknown);
        assert_eq!(Exam::parse("catto"), Exam::Unknown);
    }

    #[test]
    fn test_exam_display_round_trip() {
        for exam in [
            Exam::Midsem,
            Exam::Endsem,
            Exam::ClassTest(None),
            Exam::ClassTest(Some(3)),
            Exam::Unknown,
        ] {
            assert_eq!(Exam::parse(&exam.to_string()), exam);
        }
    }

    #[test]
    fn test_exam_serde_uses_string_form() {
        let json = serde_json::to_string(&Exam::ClassTest(Some(2))).unwrap();
        assert_eq!(json, "\"ct2\"");
        let back: Exam = serde_json::from_str("\"midsem\"").unwrap();
        assert_eq!(back, Exam::Midsem);
    }

    #[test]
    fn test_exam_filter_parse() {
        assert_eq!("".parse::<ExamFilter>().unwrap(), ExamFilter::Any);
        assert_eq!("midend".parse::<ExamFilter>().unwrap(), ExamFilter::MidEnd);
        assert_eq!("ct".parse::<ExamFilter>().unwrap(), ExamFilter::ClassTest);
        assert!("finals".parse::<ExamFilter>().is_err());
    }

    #[test]
    fn test_exam_filter_midend_matches_both() {
        assert!(ExamFilter::MidEnd.matches(Exam::Midsem));
        assert!(ExamFilter::MidEnd.matches(Exam::Endsem));
        assert!(!ExamFilter::MidEnd.matches(Exam::ClassTest(Some(1))));
    }

    #[test]
    fn test_exam_filter_unknown_record_passes_all() {
        for filter in [
            ExamFilter::Any,
            ExamFilter::Midsem,
            ExamFilter::Endsem,
            ExamFilter::MidEnd,
            ExamFilter::ClassTest,
        ] {
            assert!(filter.matches(Exam::Unknown));
        }
    }

    #[test]
    fn test_exam_filter_classtest_matches_any_ordinal() {
        assert!(ExamFilter::ClassTest.matches(Exam::ClassTest(None)));
        assert!(ExamFilter::ClassTest.matches(Exam::ClassTest(Some(7))));
        assert!(!ExamFilter::ClassTest.matches(Exam::Endsem));
    }

    #[test]
    fn test_normalize_course_code() {
        assert_eq!(normalize_course_code("cs10001").unwrap(), "CS10001");
        assert_eq!(normalize_course_code(" MA20101 ").unwrap(), "MA20101");
        assert!(normalize_course_code("CS100").is_err());
        assert!(normalize_course_code("CSE1001").is_err());
        assert!(normalize_course_code("").is_err());
    }

    #[test]
    fn test_validate_year_bounds() {
        assert!(validate_year(2020).is_ok());
        assert!(validate_year(1899).is_err());
        assert!(validate_year(Utc::now().year() + 1).is_err());
    }

    #[test]
    fn test_patch_affects_path() {
        let patch = PaperPatch {
            year: Some(2024),
            ..Default::default()
        };
        assert!(patch.affects_path());

        let patch = PaperPatch {
            course_name: Some("Thermodynamics".into()),
            note: Some("scan quality poor".into()),
            approved: Some(true),
            ..Default::default()
        };
        assert!(!patch.affects_path());
    }

    #[test]
    fn test_origin_round_trip() {
        assert_eq!("library".parse::<Origin>().unwrap(), Origin::Library);
        assert_eq!(Origin::Uploaded.to_string(), "uploaded");
        assert!("archive".parse::<Origin>().is_err());
    }

    #[test]
    fn test_approval_status_round_trip() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(
                status.to_string().parse::<ApprovalStatus>().unwrap(),
                status
            );
        }
    }

    #[test]
    fn test_paper_is_searchable() {
        let mut paper = Paper {
            id: Uuid::now_v7(),
            course_code: "CS10001".into(),
            course_name: "Programming".into(),
            year: 2023,
            semester: Semester::Autumn,
            exam: Exam::Endsem,
            origin: Origin::Uploaded,
            approval: ApprovalStatus::Pending,
            deleted: false,
            deleted_at: None,
            approved_by: None,
            note: String::new(),
            upload_timestamp: Utc::now(),
        };
        assert!(!paper.is_searchable());

        paper.approval = ApprovalStatus::Approved;
        assert!(paper.is_searchable());

        paper.deleted = true;
        assert!(!paper.is_searchable());

        paper.deleted = false;
        paper.origin = Origin::Library;
        paper.approval = ApprovalStatus::Approved;
        assert!(paper.is_searchable());
    }
}

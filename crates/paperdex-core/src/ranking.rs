//! Deterministic relevance ranking for course queries.
//!
//! The ranker scores a snapshot of the searchable corpus against a free-text
//! query plus optional structured filters. Scoring is tier-based so the
//! ordering stays explainable: an exact course-code match always beats a
//! code-prefix match, which beats a full course-name token match, which
//! beats a partial one. Ties break by year (newest first), then origin
//! (library papers are pre-vetted and considered canonical), then id, so
//! identical inputs always produce identical orderings.

use similar::TextDiff;

use crate::models::{ExamFilter, Origin, Paper, Semester};

/// Maximum number of hits returned by a search.
pub const SEARCH_RESULT_LIMIT: usize = 50;

/// Score for an exact course-code match.
const EXACT_CODE_SCORE: f64 = 1000.0;

/// Base score for a course-code prefix match.
const CODE_PREFIX_BASE: f64 = 800.0;

/// Base score when every query token matches a course-name token.
const FULL_NAME_BASE: f64 = 600.0;

/// Ceiling for partial course-name matches.
const PARTIAL_NAME_CEILING: f64 = 400.0;

/// Similarity at or above which a token pair counts as a match.
const STRONG_MATCH: f64 = 0.8;

/// Similarity at or above which a token pair earns partial credit.
const PARTIAL_MATCH: f64 = 0.6;

/// A parsed search request: free text plus optional structured filters.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub exam: ExamFilter,
    pub year: Option<i32>,
    pub semester: Option<Semester>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exam: ExamFilter::Any,
            year: None,
            semester: None,
        }
    }

    pub fn with_exam(mut self, exam: ExamFilter) -> Self {
        self.exam = exam;
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_semester(mut self, semester: Semester) -> Self {
        self.semester = Some(semester);
        self
    }
}

/// A scored paper.
#[derive(Debug, Clone)]
pub struct RankedPaper {
    pub paper: Paper,
    pub score: f64,
}

/// Lowercased alphanumeric tokens of a string.
fn tokenize(input: &str) -> Vec<String> {
    input
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Similarity of a query token against a candidate token, in `[0, 1]`.
///
/// Containment (prefix or substring) scores high so partial words like
/// "thermo" land on "thermodynamics"; otherwise a character-level diff
/// ratio tolerates minor misspellings.
fn token_similarity(query: &str, candidate: &str) -> f64 {
    if query == candidate {
        return 1.0;
    }
    let len_ratio = query.len() as f64 / candidate.len() as f64;
    if candidate.starts_with(query) {
        return 0.85 + 0.15 * len_ratio;
    }
    if candidate.contains(query) {
        return 0.7 + 0.15 * len_ratio;
    }
    TextDiff::from_chars(query, candidate).ratio() as f64
}

/// Whether a paper passes the structured filters. Records with unknown
/// exam or semester pass the corresponding filter (the value was never
/// recorded, so they may be what the caller wants).
fn passes_filters(paper: &Paper, query: &SearchQuery) -> bool {
    if !query.exam.matches(paper.exam) {
        return false;
    }
    if let Some(year) = query.year {
        if paper.year != year {
            return false;
        }
    }
    if let Some(semester) = query.semester {
        if paper.semester != semester && paper.semester != Semester::Unknown {
            return false;
        }
    }
    true
}

/// Scores one paper against the query. Zero means no match.
fn score_paper(paper: &Paper, compact_query: &str, query_tokens: &[String]) -> f64 {
    let code = paper.course_code.to_lowercase();

    if !compact_query.is_empty() && code == compact_query {
        return EXACT_CODE_SCORE;
    }

    if compact_query.len() >= 2 && code.starts_with(compact_query) {
        let coverage = compact_query.len() as f64 / code.len() as f64;
        return CODE_PREFIX_BASE + 100.0 * coverage;
    }

    if query_tokens.is_empty() {
        return 0.0;
    }

    // Name-tier matching also considers the course code as a token, so
    // queries like "cs10001 networks" still land on the right course.
    let mut name_tokens = tokenize(&paper.course_name);
    name_tokens.push(code);

    let best_per_token: Vec<f64> = query_tokens
        .iter()
        .map(|qt| {
            name_tokens
                .iter()
                .map(|nt| token_similarity(qt, nt))
                .fold(0.0, f64::max)
        })
        .collect();

    let strong_count = best_per_token.iter().filter(|&&s| s >= STRONG_MATCH).count();
    if strong_count == query_tokens.len() {
        let avg: f64 = best_per_token.iter().sum::<f64>() / best_per_token.len() as f64;
        return FULL_NAME_BASE + 100.0 * avg;
    }

    let partial_sum: f64 = best_per_token
        .iter()
        .filter(|&&s| s >= PARTIAL_MATCH)
        .sum();
    if partial_sum > 0.0 {
        return PARTIAL_NAME_CEILING * partial_sum / query_tokens.len() as f64;
    }

    0.0
}

/// Library papers sort ahead of uploads on otherwise equal footing.
fn origin_rank(origin: Origin) -> u8 {
    match origin {
        Origin::Library => 0,
        Origin::Uploaded => 1,
    }
}

/// Scores and orders a corpus snapshot against a query.
///
/// A blank query yields no results: search requires at least one
/// discriminating term and is not a browse-all operation.
pub fn rank(corpus: Vec<Paper>, query: &SearchQuery, limit: usize) -> Vec<RankedPaper> {
    let query_tokens = tokenize(&query.text);
    if query_tokens.is_empty() {
        return Vec::new();
    }
    let compact_query: String = query_tokens.concat();

    let mut hits: Vec<RankedPaper> = corpus
        .into_iter()
        .filter(|paper| passes_filters(paper, query))
        .filter_map(|paper| {
            let score = score_paper(&paper, &compact_query, &query_tokens);
            (score > 0.0).then_some(RankedPaper { paper, score })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.paper.year.cmp(&a.paper.year))
            .then_with(|| origin_rank(a.paper.origin).cmp(&origin_rank(b.paper.origin)))
            .then_with(|| a.paper.id.cmp(&b.paper.id))
    });
    hits.truncate(limit);

    tracing::debug!(
        result_count = hits.len(),
        query = %query.text,
        "ranking complete"
    );

    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalStatus, Exam};
    use chrono::Utc;
    use uuid::Uuid;

    fn paper(code: &str, name: &str, year: i32, origin: Origin) -> Paper {
        Paper {
            id: Uuid::now_v7(),
            course_code: code.to_string(),
            course_name: name.to_string(),
            year,
            semester: Semester::Autumn,
            exam: Exam::Endsem,
            origin,
            approval: ApprovalStatus::Approved,
            deleted: false,
            deleted_at: None,
            approved_by: None,
            note: String::new(),
            upload_timestamp: Utc::now(),
        }
    }

    fn corpus() -> Vec<Paper> {
        vec![
            paper("CS10001", "Programming and Data Structures", 2022, Origin::Library),
            paper("CS10003", "Programming Laboratory", 2023, Origin::Uploaded),
            paper("MA20101", "Mathematics II", 2021, Origin::Library),
            paper("ME30005", "Thermodynamics", 2020, Origin::Uploaded),
            paper("PH10002", "Physics of Waves", 2024, Origin::Library),
        ]
    }

    #[test]
    fn test_blank_query_yields_nothing() {
        assert!(rank(corpus(), &SearchQuery::new(""), 10).is_empty());
        assert!(rank(corpus(), &SearchQuery::new("   "), 10).is_empty());
        assert!(rank(corpus(), &SearchQuery::new("?!"), 10).is_empty());
    }

    #[test]
    fn test_exact_code_ranks_first() {
        let hits = rank(corpus(), &SearchQuery::new("CS10001"), 10);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].paper.course_code, "CS10001");
        assert_eq!(hits[0].score, EXACT_CODE_SCORE);
    }

    #[test]
    fn test_code_prefix_matches() {
        let hits = rank(corpus(), &SearchQuery::new("CS1"), 10);
        let codes: Vec<&str> = hits.iter().map(|h| h.paper.course_code.as_str()).collect();
        assert!(codes.contains(&"CS10001"));
        assert!(codes.contains(&"CS10003"));
        assert!(!codes.contains(&"MA20101"));
    }

    #[test]
    fn test_code_query_with_space_still_exact() {
        let hits = rank(corpus(), &SearchQuery::new("cs 10001"), 10);
        assert_eq!(hits[0].paper.course_code, "CS10001");
        assert_eq!(hits[0].score, EXACT_CODE_SCORE);
    }

    #[test]
    fn test_full_name_match_beats_partial() {
        let hits = rank(corpus(), &SearchQuery::new("programming laboratory"), 10);
        assert_eq!(hits[0].paper.course_code, "CS10003");
        // The pure "Programming ..." course still shows up as a partial hit
        assert!(hits.iter().any(|h| h.paper.course_code == "CS10001"));
    }

    #[test]
    fn test_partial_word_matches() {
        let hits = rank(corpus(), &SearchQuery::new("thermo"), 10);
        assert_eq!(hits[0].paper.course_code, "ME30005");
    }

    #[test]
    fn test_minor_misspelling_tolerated() {
        let hits = rank(corpus(), &SearchQuery::new("thermodynamcis"), 10);
        assert!(hits.iter().any(|h| h.paper.course_code == "ME30005"));
    }

    #[test]
    fn test_unrelated_query_yields_nothing() {
        let hits = rank(corpus(), &SearchQuery::new("zzzzqqq"), 10);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_ties_break_by_year_then_origin_then_id() {
        let mut a = paper("CS10001", "Programming", 2020, Origin::Uploaded);
        let mut b = paper("CS10001", "Programming", 2023, Origin::Uploaded);
        let mut c = paper("CS10001", "Programming", 2023, Origin::Library);
        a.id = Uuid::parse_str("00000000-0000-7000-8000-000000000001").unwrap();
        b.id = Uuid::parse_str("00000000-0000-7000-8000-000000000002").unwrap();
        c.id = Uuid::parse_str("00000000-0000-7000-8000-000000000003").unwrap();

        let hits = rank(vec![a, b, c], &SearchQuery::new("CS10001"), 10);
        let order: Vec<Uuid> = hits.iter().map(|h| h.paper.id).collect();
        // 2023 library first, then 2023 upload, then 2020
        assert_eq!(
            order,
            vec![
                Uuid::parse_str("00000000-0000-7000-8000-000000000003").unwrap(),
                Uuid::parse_str("00000000-0000-7000-8000-000000000002").unwrap(),
                Uuid::parse_str("00000000-0000-7000-8000-000000000001").unwrap(),
            ]
        );
    }

    #[test]
    fn test_deterministic_under_input_order() {
        let forward = corpus();
        let mut reversed = forward.clone();
        reversed.reverse();

        let query = SearchQuery::new("programming");
        let a: Vec<Uuid> = rank(forward, &query, 10).iter().map(|h| h.paper.id).collect();
        let b: Vec<Uuid> = rank(reversed, &query, 10).iter().map(|h| h.paper.id).collect();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_exam_filter_applies() {
        let mut ct_paper = paper("CS10001", "Programming", 2022, Origin::Library);
        ct_paper.exam = Exam::ClassTest(Some(1));
        let endsem_paper = paper("CS10001", "Programming", 2022, Origin::Library);

        let hits = rank(
            vec![ct_paper.clone(), endsem_paper.clone()],
            &SearchQuery::new("CS10001").with_exam(ExamFilter::ClassTest),
            10,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].paper.id, ct_paper.id);

        let hits = rank(
            vec![ct_paper, endsem_paper.clone()],
            &SearchQuery::new("CS10001").with_exam(ExamFilter::MidEnd),
            10,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].paper.id, endsem_paper.id);
    }

    #[test]
    fn test_year_and_semester_filters() {
        let hits = rank(corpus(), &SearchQuery::new("programming").with_year(2023), 10);
        assert!(hits.iter().all(|h| h.paper.year == 2023));

        let mut unknown_sem = paper("CS10001", "Programming", 2022, Origin::Library);
        unknown_sem.semester = Semester::Unknown;
        let spring = {
            let mut p = paper("CS10001", "Programming", 2022, Origin::Library);
            p.semester = Semester::Spring;
            p
        };
        let hits = rank(
            vec![unknown_sem.clone(), spring],
            &SearchQuery::new("CS10001").with_semester(Semester::Autumn),
            10,
        );
        // Unknown-semester records pass any semester filter
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].paper.id, unknown_sem.id);
    }

    #[test]
    fn test_limit_respected() {
        let many: Vec<Paper> = (0..30)
            .map(|i| paper("CS10001", "Programming", 1995 + i, Origin::Uploaded))
            .collect();
        let hits = rank(many, &SearchQuery::new("CS10001"), 5);
        assert_eq!(hits.len(), 5);
    }
}

//! Canonical mapping between paper metadata, storage slugs, and public URLs.
//!
//! A "slug" is the storage-root-relative path of a paper's object, e.g.
//! `uploaded/CS10001_2024_autumn_endsem_<id>.pdf`. The slug is a pure
//! function of the paper's path-determining metadata and is never stored:
//! prepending the static-files base URL yields the public link, prepending
//! the storage root (done by the storage backend) yields the filesystem
//! path.
//!
//! The filename encodes each component separated by `_`; no component can
//! contain `_` (course codes are slugified, enum spellings and years are
//! alphanumeric, UUIDs are hyphenated), so the mapping is invertible.

use uuid::Uuid;

use crate::models::{Exam, Origin, Semester};

/// Substituted when a course code slugifies to nothing, so that malformed
/// metadata still maps somewhere instead of failing.
const EMPTY_CODE_PLACEHOLDER: &str = "unknown";

/// The path-determining subset of a paper's metadata.
///
/// Together with the origin this determines the slug; the id component
/// keeps the mapping injective even when two papers share course, year,
/// semester, and exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperLocation {
    pub course_code: String,
    pub year: i32,
    pub semester: Semester,
    pub exam: Exam,
    pub id: Uuid,
}

/// Configuration for slug and URL derivation.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Base URL of the static-files server, without a trailing slash.
    pub static_base_url: String,
    /// Directory slug for library papers.
    pub library_dir: String,
    /// Directory slug for uploaded papers.
    pub uploaded_dir: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            static_base_url: "https://static.paperdex.org".to_string(),
            library_dir: "library".to_string(),
            uploaded_dir: "uploaded".to_string(),
        }
    }
}

/// Derives slugs, filesystem-relative paths, and public URLs from paper
/// metadata. Pure; performs no I/O and never fails on malformed metadata.
#[derive(Debug, Clone)]
pub struct PathResolver {
    config: PathConfig,
}

impl PathResolver {
    pub fn new(config: PathConfig) -> Self {
        Self { config }
    }

    /// Strips every character that is not alphanumeric, collapsing runs of
    /// stripped characters into a single `-`. Total: empty input yields an
    /// empty slug.
    pub fn slugify(input: &str) -> String {
        let mut slug = String::with_capacity(input.len());
        let mut pending_separator = false;
        for c in input.chars() {
            if c.is_alphanumeric() {
                if pending_separator && !slug.is_empty() {
                    slug.push('-');
                }
                pending_separator = false;
                slug.push(c);
            } else {
                pending_separator = true;
            }
        }
        slug
    }

    /// The directory slug for a paper category.
    fn dir_for(&self, origin: Origin) -> &str {
        match origin {
            Origin::Library => &self.config.library_dir,
            Origin::Uploaded => &self.config.uploaded_dir,
        }
    }

    /// The canonical filename for a paper:
    /// `{CODE}_{year}_{semester}_{exam}_{id}.pdf`.
    pub fn filename_for(location: &PaperLocation) -> String {
        let mut code = Self::slugify(&location.course_code).to_uppercase();
        if code.is_empty() {
            code = EMPTY_CODE_PLACEHOLDER.to_string();
        }
        format!(
            "{}_{}_{}_{}_{}.pdf",
            code, location.year, location.semester, location.exam, location.id
        )
    }

    /// The storage slug for a paper. Injective with respect to its inputs:
    /// the id component alone distinguishes colliding metadata tuples.
    pub fn path_for(&self, origin: Origin, location: &PaperLocation) -> String {
        self.slug_from_filename(&Self::filename_for(location), origin)
    }

    /// Joins a bare filename into the category directory, yielding a slug.
    pub fn slug_from_filename(&self, filename: &str, origin: Origin) -> String {
        format!("{}/{}", self.dir_for(origin), filename)
    }

    /// Maps a slug to its externally servable URL. Pure string transform;
    /// no existence check.
    pub fn url_for(&self, slug: &str) -> String {
        format!(
            "{}/{}",
            self.config.static_base_url.trim_end_matches('/'),
            slug
        )
    }

    /// Inverse of [`PathResolver::path_for`]: recovers the origin and the
    /// path-determining metadata from a slug this resolver produced.
    /// Returns `None` for paths of a different shape.
    pub fn parse_slug(&self, slug: &str) -> Option<(Origin, PaperLocation)> {
        for origin in [Origin::Library, Origin::Uploaded] {
            let prefix = format!("{}/", self.dir_for(origin));
            if let Some(filename) = slug.strip_prefix(&prefix) {
                return Self::parse_filename(filename).map(|loc| (origin, loc));
            }
        }
        None
    }

    /// Parses a canonical filename back into a [`PaperLocation`].
    pub fn parse_filename(filename: &str) -> Option<PaperLocation> {
        let stem = filename.strip_suffix(".pdf")?;
        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() != 5 {
            return None;
        }
        Some(PaperLocation {
            course_code: parts[0].to_string(),
            year: parts[1].parse().ok()?,
            semester: Semester::parse(parts[2]),
            exam: Exam::parse(parts[3]),
            id: Uuid::parse_str(parts[4]).ok()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new(PathConfig::default())
    }

    fn location(code: &str, year: i32, semester: Semester, exam: Exam) -> PaperLocation {
        PaperLocation {
            course_code: code.to_string(),
            year,
            semester,
            exam,
            id: Uuid::now_v7(),
        }
    }

    #[test]
    fn test_slugify_strips_and_collapses() {
        assert_eq!(PathResolver::slugify("Data Structures"), "Data-Structures");
        assert_eq!(
            PathResolver::slugify("Signals & Systems -- II"),
            "Signals-Systems-II"
        );
        assert_eq!(PathResolver::slugify("a/b\\c"), "a-b-c");
    }

    #[test]
    fn test_slugify_total_on_empty_and_junk() {
        assert_eq!(PathResolver::slugify(""), "");
        assert_eq!(PathResolver::slugify("!!!"), "");
        assert_eq!(PathResolver::slugify("  "), "");
    }

    #[test]
    fn test_slugify_no_leading_or_trailing_separator() {
        assert_eq!(PathResolver::slugify("  rust  "), "rust");
        assert_eq!(PathResolver::slugify("(rust)"), "rust");
    }

    #[test]
    fn test_path_round_trip() {
        let r = resolver();
        let cases = vec![
            location("CS10001", 2024, Semester::Autumn, Exam::Endsem),
            location("MA20101", 2019, Semester::Spring, Exam::Midsem),
            location("EE30001", 2021, Semester::Unknown, Exam::ClassTest(Some(2))),
            location("PH10002", 2018, Semester::Autumn, Exam::ClassTest(None)),
            location("CH40005", 2015, Semester::Spring, Exam::Unknown),
        ];

        for (origin, loc) in [Origin::Library, Origin::Uploaded]
            .into_iter()
            .flat_map(|o| cases.iter().cloned().map(move |l| (o, l)))
        {
            let slug = r.path_for(origin, &loc);
            let (parsed_origin, parsed) = r.parse_slug(&slug).expect("slug should parse back");
            assert_eq!(parsed_origin, origin);
            assert_eq!(parsed, loc);
        }
    }

    #[test]
    fn test_path_injective_via_id() {
        let r = resolver();
        let a = location("CS10001", 2024, Semester::Autumn, Exam::Endsem);
        let mut b = a.clone();
        b.id = Uuid::now_v7();

        assert_ne!(
            r.path_for(Origin::Uploaded, &a),
            r.path_for(Origin::Uploaded, &b)
        );
    }

    #[test]
    fn test_library_and_uploaded_never_collide() {
        let r = resolver();
        let loc = location("CS10001", 2024, Semester::Autumn, Exam::Endsem);
        assert_ne!(
            r.path_for(Origin::Library, &loc),
            r.path_for(Origin::Uploaded, &loc)
        );
    }

    #[test]
    fn test_empty_course_code_gets_placeholder() {
        let loc = location("", 2024, Semester::Autumn, Exam::Endsem);
        let filename = PathResolver::filename_for(&loc);
        assert!(filename.starts_with("unknown_2024_"));
        // Still parseable
        assert!(PathResolver::parse_filename(&filename).is_some());
    }

    #[test]
    fn test_url_for_prefixes_base() {
        let r = PathResolver::new(PathConfig {
            static_base_url: "https://static.example.org/".to_string(),
            ..PathConfig::default()
        });
        assert_eq!(
            r.url_for("library/CS10001_2024_autumn_endsem_x.pdf"),
            "https://static.example.org/library/CS10001_2024_autumn_endsem_x.pdf"
        );
    }

    #[test]
    fn test_parse_rejects_foreign_shapes() {
        let r = resolver();
        assert!(r.parse_slug("somewhere/else.pdf").is_none());
        assert!(PathResolver::parse_filename("CS10001_2024_autumn_endsem.pdf").is_none());
        assert!(PathResolver::parse_filename("not a filename").is_none());
        assert!(PathResolver::parse_filename("CS10001_2024_autumn_endsem_notauuid.pdf").is_none());
    }

    #[test]
    fn test_filename_encodes_class_test_ordinal() {
        let loc = location("CS10001", 2024, Semester::Autumn, Exam::ClassTest(Some(3)));
        let filename = PathResolver::filename_for(&loc);
        assert!(filename.contains("_ct3_"));
        let parsed = PathResolver::parse_filename(&filename).unwrap();
        assert_eq!(parsed.exam, Exam::ClassTest(Some(3)));
    }
}

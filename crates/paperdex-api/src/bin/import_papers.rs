//! Batch library ingestion.
//!
//! Reads a JSON manifest describing scraped library papers and a directory
//! containing the PDFs, then inserts each paper as pre-approved library
//! stock. Papers whose exact properties already exist are skipped, so
//! re-running a manifest is safe.
//!
//! Usage: `import-papers <manifest.json> <files-dir>`

use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use paperdex_core::{
    normalize_course_code, validate_year, Exam, NewPaper, PathConfig, PathResolver, Semester,
};
use paperdex_db::{create_pool, Database, FilesystemBackend};

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    course_code: String,
    course_name: String,
    year: i32,
    semester: Semester,
    exam: Exam,
    filename: String,
    #[serde(default)]
    note: String,
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let manifest_path = args
        .next()
        .context("usage: import-papers <manifest.json> <files-dir>")?;
    let files_dir = PathBuf::from(
        args.next()
            .context("usage: import-papers <manifest.json> <files-dir>")?,
    );

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let storage_root = PathBuf::from(optional("STATIC_FILES_PATH", "/srv/static"));
    let path_config = PathConfig {
        static_base_url: optional("STATIC_FILES_URL", "https://static.paperdex.org"),
        library_dir: optional("LIBRARY_DIR", "library"),
        uploaded_dir: optional("UPLOADED_DIR", "uploaded"),
    };

    let pool = create_pool(&database_url).await?;
    let db = Database::new(
        pool,
        FilesystemBackend::new(storage_root),
        PathResolver::new(path_config),
    );
    db.migrate().await?;

    let manifest: Vec<ManifestEntry> = serde_json::from_str(
        &tokio::fs::read_to_string(&manifest_path)
            .await
            .with_context(|| format!("failed to read {}", manifest_path))?,
    )
    .context("manifest is not a valid JSON array")?;

    let mut imported = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for entry in manifest {
        let course_code = match normalize_course_code(&entry.course_code) {
            Ok(code) => code,
            Err(e) => {
                warn!(filename = %entry.filename, error = %e, "Skipping entry");
                failed += 1;
                continue;
            }
        };
        if let Err(e) = validate_year(entry.year) {
            warn!(filename = %entry.filename, error = %e, "Skipping entry");
            failed += 1;
            continue;
        }

        let existing = db
            .papers
            .find_similar(
                &course_code,
                Some(entry.year),
                Some(entry.semester),
                Some(entry.exam),
            )
            .await?;
        if !existing.is_empty() {
            skipped += 1;
            continue;
        }

        let data = match tokio::fs::read(files_dir.join(&entry.filename)).await {
            Ok(data) => data,
            Err(e) => {
                warn!(filename = %entry.filename, error = %e, "Failed to read file");
                failed += 1;
                continue;
            }
        };

        let meta = NewPaper {
            course_code,
            course_name: entry.course_name,
            year: entry.year,
            semester: entry.semester,
            exam: entry.exam,
            note: entry.note,
        };
        match db.papers.insert_library_paper(meta, &data).await {
            Ok(paper) => {
                info!(paper_id = %paper.id, filename = %entry.filename, "Imported");
                imported += 1;
            }
            Err(e) => {
                warn!(filename = %entry.filename, error = %e, "Import failed");
                failed += 1;
            }
        }
    }

    info!(imported, skipped, failed, "Library import complete");
    Ok(())
}

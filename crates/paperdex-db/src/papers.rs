//! Paper repository: authoritative CRUD and lifecycle transitions.
//!
//! This is the system's sole writer of persisted paper state. Every record
//! mutation for a given id is serialized through [`MutationLocks`], and any
//! edit that changes a path-determining field relocates the stored object
//! atomically with the row update: the row changes inside a transaction,
//! the object is moved, and only then does the transaction commit. A failed
//! move rolls the row back; a failed commit moves the object back.

use std::sync::Arc;
use std::time::Instant;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use paperdex_core::{
    rank, ApprovalStatus, Exam, HardDeleteOutcome, NewPaper, Origin, Paper, PaperLocation,
    PaperPatch, PathResolver, Result, SearchHit, SearchQuery, Semester, StoreError,
    SEARCH_RESULT_LIMIT,
};

use crate::locks::MutationLocks;
use crate::storage::StorageBackend;

/// Fixed page size for the trash listing.
pub const TRASH_PAGE_SIZE: i64 = 100;

/// Column list shared by every SELECT/RETURNING over the paper table.
const PAPER_FIELDS: &str = "id, course_code, course_name, year, semester, exam, origin, \
                            approval, deleted, deleted_at, approved_by, note, upload_timestamp";

/// PostgreSQL paper repository with object storage attached.
pub struct PgPaperRepository {
    pool: PgPool,
    storage: Arc<dyn StorageBackend>,
    resolver: PathResolver,
    locks: MutationLocks,
}

/// Origin column fallback mirrors the total enum parsers: an unexpected
/// value is treated as an upload (the less-trusted origin).
fn parse_origin(s: &str) -> Origin {
    s.parse().unwrap_or(Origin::Uploaded)
}

fn parse_approval(s: &str) -> ApprovalStatus {
    s.parse().unwrap_or(ApprovalStatus::Pending)
}

/// Convert a database row to a Paper.
fn paper_from_row(row: &PgRow) -> Paper {
    let semester: String = row.get("semester");
    let exam: String = row.get("exam");
    let origin: String = row.get("origin");
    let approval: String = row.get("approval");

    Paper {
        id: row.get("id"),
        course_code: row.get("course_code"),
        course_name: row.get("course_name"),
        year: row.get("year"),
        semester: Semester::parse(&semester),
        exam: Exam::parse(&exam),
        origin: parse_origin(&origin),
        approval: parse_approval(&approval),
        deleted: row.get("deleted"),
        deleted_at: row.get("deleted_at"),
        approved_by: row.get("approved_by"),
        note: row.get("note"),
        upload_timestamp: row.get("upload_timestamp"),
    }
}

impl PgPaperRepository {
    /// Create a new repository over the given pool, storage backend, and
    /// path resolver.
    pub fn new(
        pool: PgPool,
        storage: impl StorageBackend + 'static,
        resolver: PathResolver,
    ) -> Self {
        Self {
            pool,
            storage: Arc::new(storage),
            resolver,
            locks: MutationLocks::new(),
        }
    }

    /// The storage slug derived from a paper's current metadata.
    pub fn slug_for(&self, paper: &Paper) -> String {
        self.resolver.path_for(paper.origin, &paper.location())
    }

    /// The public URL derived from a paper's current metadata.
    pub fn url_for(&self, paper: &Paper) -> String {
        self.resolver.url_for(&self.slug_for(paper))
    }

    /// Fetch a paper by id regardless of its flags. Hard-deleted ids are
    /// gone and return [`StoreError::NotFound`].
    pub async fn get_paper(&self, id: Uuid) -> Result<Paper> {
        let sql = format!("SELECT {} FROM paper WHERE id = $1", PAPER_FIELDS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        Ok(paper_from_row(&row))
    }

    /// Insert a pre-vetted library paper. Library papers are approved from
    /// birth and never re-enter the review pipeline. The object is written
    /// before the record becomes visible.
    pub async fn insert_library_paper(&self, meta: NewPaper, data: &[u8]) -> Result<Paper> {
        self.insert_paper(meta, data, Origin::Library, ApprovalStatus::Approved)
            .await
    }

    /// Insert an uploaded paper into the review pipeline with
    /// `approval = pending`. The object is written at the derived path
    /// before the record becomes visible, so no record ever references a
    /// nonexistent object.
    pub async fn insert_uploaded_paper(&self, meta: NewPaper, data: &[u8]) -> Result<Paper> {
        self.insert_paper(meta, data, Origin::Uploaded, ApprovalStatus::Pending)
            .await
    }

    async fn insert_paper(
        &self,
        meta: NewPaper,
        data: &[u8],
        origin: Origin,
        approval: ApprovalStatus,
    ) -> Result<Paper> {
        let id = Uuid::now_v7();
        let location = PaperLocation {
            course_code: meta.course_code.clone(),
            year: meta.year,
            semester: meta.semester,
            exam: meta.exam,
            id,
        };
        let slug = self.resolver.path_for(origin, &location);

        // Object first, record second.
        self.storage.write(&slug, data).await?;

        let sql = format!(
            "INSERT INTO paper (id, course_code, course_name, year, semester, exam, origin, approval, note) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            PAPER_FIELDS
        );
        let inserted = sqlx::query(&sql)
            .bind(id)
            .bind(&meta.course_code)
            .bind(&meta.course_name)
            .bind(meta.year)
            .bind(meta.semester.to_string())
            .bind(meta.exam.to_string())
            .bind(origin.to_string())
            .bind(approval.to_string())
            .bind(&meta.note)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(row) => {
                info!(
                    subsystem = "store",
                    op = "insert_paper",
                    paper_id = %id,
                    origin = %origin,
                    "Inserted paper"
                );
                Ok(paper_from_row(&row))
            }
            Err(e) => {
                // The record never became visible; drop the orphan object.
                if let Err(cleanup) = self.storage.delete(&slug).await {
                    warn!(
                        subsystem = "store",
                        paper_id = %id,
                        slug = %slug,
                        error = %cleanup,
                        "Failed to clean up object after insert failure"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Apply a partial metadata edit.
    ///
    /// If a path-determining field changes, the stored object is relocated
    /// atomically with the row update; a failed relocation leaves the
    /// record exactly as it was ([`StoreError::RelocationFailed`]).
    /// Approving through an edit records the editor's handle.
    pub async fn edit_paper(&self, id: Uuid, patch: PaperPatch, editor: &str) -> Result<Paper> {
        let _guard = self.locks.acquire(id).await;

        let current = self.get_paper(id).await?;

        if patch.approved.is_some() && current.origin == Origin::Library {
            return Err(StoreError::InvalidTransition(format!(
                "library paper {} cannot change approval",
                id
            )));
        }

        let course_code = patch.course_code.unwrap_or_else(|| current.course_code.clone());
        let course_name = patch.course_name.unwrap_or_else(|| current.course_name.clone());
        let year = patch.year.unwrap_or(current.year);
        let semester = patch.semester.unwrap_or(current.semester);
        let exam = patch.exam.unwrap_or(current.exam);
        let note = patch.note.unwrap_or_else(|| current.note.clone());
        let approval = match patch.approved {
            Some(true) => ApprovalStatus::Approved,
            Some(false) => ApprovalStatus::Rejected,
            None => current.approval,
        };
        let approved_by = match patch.approved {
            Some(true) => Some(editor.to_string()),
            Some(false) => None,
            None => current.approved_by.clone(),
        };

        let old_slug = self.slug_for(&current);
        let new_location = PaperLocation {
            course_code: course_code.clone(),
            year,
            semester,
            exam,
            id,
        };
        let new_slug = self.resolver.path_for(current.origin, &new_location);

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE paper SET course_code = $2, course_name = $3, year = $4, semester = $5, \
             exam = $6, approval = $7, approved_by = $8, note = $9 WHERE id = $1 RETURNING {}",
            PAPER_FIELDS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&course_code)
            .bind(&course_name)
            .bind(year)
            .bind(semester.to_string())
            .bind(exam.to_string())
            .bind(approval.to_string())
            .bind(&approved_by)
            .bind(&note)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        let updated = paper_from_row(&row);

        let relocated = old_slug != new_slug;
        if relocated {
            if let Err(e) = self.storage.rename(&old_slug, &new_slug).await {
                tx.rollback().await?;
                return Err(StoreError::RelocationFailed(e.to_string()));
            }
        }

        if let Err(e) = tx.commit().await {
            if relocated {
                // Put the object back so record and object stay consistent.
                if let Err(undo) = self.storage.rename(&new_slug, &old_slug).await {
                    warn!(
                        subsystem = "store",
                        paper_id = %id,
                        error = %undo,
                        "Failed to undo relocation after commit failure"
                    );
                }
            }
            return Err(e.into());
        }

        info!(
            subsystem = "store",
            op = "edit_paper",
            paper_id = %id,
            relocated,
            "Edited paper"
        );
        Ok(updated)
    }

    /// Set the approval flag of an uploaded paper. `approved = false` is
    /// the "reject" convenience; it implies nothing about deletion. The
    /// two flags are orthogonal and this never touches `deleted`.
    pub async fn set_approval(&self, id: Uuid, approved: bool, reviewer: &str) -> Result<Paper> {
        let _guard = self.locks.acquire(id).await;

        let current = self.get_paper(id).await?;
        if current.origin == Origin::Library {
            return Err(StoreError::InvalidTransition(format!(
                "library paper {} cannot change approval",
                id
            )));
        }

        let approval = if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        };
        let approved_by = approved.then(|| reviewer.to_string());

        let sql = format!(
            "UPDATE paper SET approval = $2, approved_by = $3 WHERE id = $1 RETURNING {}",
            PAPER_FIELDS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(approval.to_string())
            .bind(&approved_by)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        info!(
            subsystem = "store",
            op = "set_approval",
            paper_id = %id,
            approved,
            "Updated approval"
        );
        Ok(paper_from_row(&row))
    }

    /// Soft-delete a paper. Idempotent: deleting an already-deleted paper
    /// succeeds and leaves the record unchanged. Approval is untouched.
    pub async fn soft_delete(&self, id: Uuid) -> Result<Paper> {
        let _guard = self.locks.acquire(id).await;

        let sql = format!(
            "UPDATE paper SET deleted = true, deleted_at = COALESCE(deleted_at, NOW()) \
             WHERE id = $1 RETURNING {}",
            PAPER_FIELDS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        info!(subsystem = "store", op = "soft_delete", paper_id = %id, "Soft-deleted paper");
        Ok(paper_from_row(&row))
    }

    /// Restore a soft-deleted paper to active listings. Idempotent.
    pub async fn restore(&self, id: Uuid) -> Result<Paper> {
        let _guard = self.locks.acquire(id).await;

        let sql = format!(
            "UPDATE paper SET deleted = false, deleted_at = NULL WHERE id = $1 RETURNING {}",
            PAPER_FIELDS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        info!(subsystem = "store", op = "restore", paper_id = %id, "Restored paper");
        Ok(paper_from_row(&row))
    }

    /// Irreversibly remove records and their stored objects.
    ///
    /// Batch with independent per-item outcomes: one id's storage-removal
    /// failure neither blocks the others nor removes its record, and no
    /// lock is held across the whole batch. A missing object is tolerated
    /// (the record is still removed).
    pub async fn hard_delete(&self, ids: &[Uuid]) -> Vec<HardDeleteOutcome> {
        let mut outcomes = Vec::with_capacity(ids.len());

        for &id in ids {
            let _guard = self.locks.acquire(id).await;

            let paper = match self.get_paper(id).await {
                Ok(paper) => paper,
                Err(StoreError::NotFound(_)) => {
                    outcomes.push(HardDeleteOutcome {
                        id,
                        success: false,
                        message: "paper not found".to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    outcomes.push(HardDeleteOutcome {
                        id,
                        success: false,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let slug = self.slug_for(&paper);
            if let Err(e) = self.storage.delete(&slug).await {
                outcomes.push(HardDeleteOutcome {
                    id,
                    success: false,
                    message: format!("storage removal failed: {}", e),
                });
                continue;
            }

            match sqlx::query("DELETE FROM paper WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
            {
                Ok(_) => {
                    info!(subsystem = "store", op = "hard_delete", paper_id = %id, "Hard-deleted paper");
                    outcomes.push(HardDeleteOutcome {
                        id,
                        success: true,
                        message: "deleted".to_string(),
                    });
                }
                Err(e) => {
                    outcomes.push(HardDeleteOutcome {
                        id,
                        success: false,
                        message: format!("record removal failed: {}", e),
                    });
                }
            }
        }

        outcomes
    }

    /// All uploaded, non-deleted papers still awaiting review, newest first.
    pub async fn list_unapproved(&self) -> Result<Vec<Paper>> {
        let sql = format!(
            "SELECT {} FROM paper WHERE origin = 'uploaded' AND deleted = false \
             AND approval = 'pending' ORDER BY upload_timestamp DESC",
            PAPER_FIELDS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(paper_from_row).collect())
    }

    /// All soft-deleted papers regardless of prior approval state, most
    /// recently deleted first, bounded to [`TRASH_PAGE_SIZE`].
    pub async fn list_trash(&self) -> Result<Vec<Paper>> {
        let sql = format!(
            "SELECT {} FROM paper WHERE deleted = true \
             ORDER BY deleted_at DESC NULLS LAST, id LIMIT $1",
            PAPER_FIELDS
        );
        let rows = sqlx::query(&sql)
            .bind(TRASH_PAGE_SIZE)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(paper_from_row).collect())
    }

    /// Non-deleted papers matching the given properties exactly. Used by
    /// the admin dashboard to surface likely duplicates before approving.
    pub async fn find_similar(
        &self,
        course_code: &str,
        year: Option<i32>,
        semester: Option<Semester>,
        exam: Option<Exam>,
    ) -> Result<Vec<Paper>> {
        let mut sql = format!(
            "SELECT {} FROM paper WHERE deleted = false AND course_code = $1",
            PAPER_FIELDS
        );
        let mut param = 1;
        if year.is_some() {
            param += 1;
            sql.push_str(&format!(" AND year = ${}", param));
        }
        if semester.is_some() {
            param += 1;
            sql.push_str(&format!(" AND semester = ${}", param));
        }
        if exam.is_some() {
            param += 1;
            sql.push_str(&format!(" AND exam = ${}", param));
        }
        sql.push_str(" ORDER BY year DESC, id");

        let mut query = sqlx::query(&sql).bind(course_code);
        if let Some(year) = year {
            query = query.bind(year);
        }
        if let Some(semester) = semester {
            query = query.bind(semester.to_string());
        }
        if let Some(exam) = exam {
            query = query.bind(exam.to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(paper_from_row).collect())
    }

    /// Ranked search over the snapshot of non-deleted, approved-or-library
    /// records, merging both origins. Filelinks are materialized from the
    /// resolver; an empty query returns an empty list.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let start = Instant::now();

        let sql = format!(
            "SELECT {} FROM paper WHERE deleted = false \
             AND (origin = 'library' OR approval = 'approved')",
            PAPER_FIELDS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let corpus: Vec<Paper> = rows.iter().map(paper_from_row).collect();

        let hits = rank(corpus, query, SEARCH_RESULT_LIMIT)
            .into_iter()
            .map(|ranked| {
                let filelink = self.url_for(&ranked.paper);
                let paper = ranked.paper;
                SearchHit {
                    id: paper.id,
                    course_code: paper.course_code,
                    course_name: paper.course_name,
                    year: paper.year,
                    semester: paper.semester,
                    exam: paper.exam,
                    origin: paper.origin,
                    filelink,
                    score: ranked.score,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            subsystem = "store",
            op = "search",
            query = %query.text,
            result_count = hits.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(hits)
    }
}

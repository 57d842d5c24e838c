//! Mentor repository
//!
//! Database operations for mentors and their skills.
//!
//! Skills live in `mentor_skills`; `replace_skills` swaps the whole set
//! inside one transaction so readers never see a half-written list.

use crate::db::{with_pool, DynDatabasePool, LastInsertId};
use crate::models::{Mentor, MentorFilter, MentorSort};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

const MENTOR_COLUMNS: &str = "id, slug, full_name, title, company, bio, avatar_url, email, \
                              linkedin_url, location, years_experience, is_published, is_featured, \
                              sort_order, rating_total, rating_count, created_at, updated_at";

const FILTER_CLAUSE: &str = r#"
    WHERE (? IS NULL OR full_name LIKE ? OR title LIKE ? OR company LIKE ?)
      AND (? IS NULL OR EXISTS (
            SELECT 1 FROM mentor_skills s
            WHERE s.mentor_id = mentors.id AND LOWER(s.name) = LOWER(?)))
      AND (? = 0 OR is_published = 1)
      AND (? = 0 OR is_featured = 1)
"#;

/// Mentor repository trait
#[async_trait]
pub trait MentorRepository: Send + Sync {
    async fn create(&self, mentor: &Mentor) -> Result<Mentor>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Mentor>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Mentor>>;

    /// True if another mentor (not `exclude_id`) uses `slug`
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Write every editable column. Rating totals are left alone.
    async fn update(&self, mentor: &Mentor) -> Result<Mentor>;

    /// Returns false when no row matched
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn list(&self, filter: &MentorFilter) -> Result<Vec<Mentor>>;

    /// Total matching `filter`, ignoring limit and offset
    async fn count(&self, filter: &MentorFilter) -> Result<i64>;

    /// Single-statement flag update; false when no row matched
    async fn set_published(&self, id: i64, published: bool) -> Result<bool>;

    async fn get_skills(&self, mentor_id: i64) -> Result<Vec<String>>;

    /// Skill names per mentor, in display order
    async fn get_skills_for(&self, mentor_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>>;

    /// Delete the mentor's skills, then insert `names` in order, in one transaction
    async fn replace_skills(&self, mentor_id: i64, names: &[String]) -> Result<()>;

    /// Skill names used by published mentors, with usage counts
    async fn skill_counts(&self) -> Result<Vec<(String, i64)>>;

    /// Add to the denormalized rating sums
    async fn adjust_rating(&self, id: i64, delta_total: i64, delta_count: i64) -> Result<()>;
}

pub struct SqlxMentorRepository {
    pool: DynDatabasePool,
}

impl SqlxMentorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MentorRepository> {
        Arc::new(Self::new(pool))
    }
}

/// ORDER BY clause for a whitelisted sort key
fn order_clause(filter: &MentorFilter) -> String {
    let dir = filter.effective_direction().sql();
    match filter.sort {
        MentorSort::SortOrder => format!("sort_order {dir}, full_name ASC, id ASC"),
        MentorSort::Name => format!("full_name {dir}, id ASC"),
        MentorSort::Newest => format!("created_at {dir}, id {dir}"),
        MentorSort::Experience => format!("years_experience {dir}, full_name ASC, id ASC"),
        MentorSort::Rating => format!(
            "CASE WHEN rating_count = 0 THEN 0 ELSE rating_total * 1.0 / rating_count END {dir}, \
             rating_count {dir}, id ASC"
        ),
    }
}

struct FilterBinds {
    pattern: Option<String>,
    skill: Option<String>,
    published_only: i32,
    featured_only: i32,
}

impl FilterBinds {
    fn new(filter: &MentorFilter) -> Self {
        Self {
            pattern: filter
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(|q| format!("%{}%", q)),
            skill: filter
                .skill
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            published_only: filter.published_only as i32,
            featured_only: filter.featured_only as i32,
        }
    }
}

/// Bind the FILTER_CLAUSE parameters, in order
macro_rules! bind_filter {
    ($query:expr, $binds:expr) => {
        $query
            .bind(&$binds.pattern)
            .bind(&$binds.pattern)
            .bind(&$binds.pattern)
            .bind(&$binds.pattern)
            .bind(&$binds.skill)
            .bind(&$binds.skill)
            .bind($binds.published_only)
            .bind($binds.featured_only)
    };
}

#[async_trait]
impl MentorRepository for SqlxMentorRepository {
    async fn create(&self, mentor: &Mentor) -> Result<Mentor> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO mentors (slug, full_name, title, company, bio, avatar_url, email,
                                     linkedin_url, location, years_experience, is_published,
                                     is_featured, sort_order, rating_total, rating_count,
                                     created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
                "#,
            )
            .bind(&mentor.slug)
            .bind(&mentor.full_name)
            .bind(&mentor.title)
            .bind(&mentor.company)
            .bind(&mentor.bio)
            .bind(&mentor.avatar_url)
            .bind(&mentor.email)
            .bind(&mentor.linkedin_url)
            .bind(&mentor.location)
            .bind(mentor.years_experience)
            .bind(mentor.is_published)
            .bind(mentor.is_featured)
            .bind(mentor.sort_order)
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create mentor")?
            .last_id()
        });

        Ok(Mentor {
            id,
            rating_total: 0,
            rating_count: 0,
            created_at: now,
            updated_at: now,
            ..mentor.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Mentor>> {
        let sql = format!("SELECT {} FROM mentors WHERE id = ?", MENTOR_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Mentor>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get mentor by ID")
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Mentor>> {
        let sql = format!("SELECT {} FROM mentors WHERE slug = ?", MENTOR_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Mentor>(&sql)
                .bind(slug)
                .fetch_optional(p)
                .await
                .context("Failed to get mentor by slug")
        })
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let count = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM mentors WHERE slug = ? AND (? IS NULL OR id <> ?)",
            )
            .bind(slug)
            .bind(exclude_id)
            .bind(exclude_id)
            .fetch_one(p)
            .await
            .context("Failed to check mentor slug")?;
            Ok(count > 0)
        })
    }

    async fn update(&self, mentor: &Mentor) -> Result<Mentor> {
        let now = Utc::now();
        with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                UPDATE mentors
                SET slug = ?, full_name = ?, title = ?, company = ?, bio = ?, avatar_url = ?,
                    email = ?, linkedin_url = ?, location = ?, years_experience = ?,
                    is_published = ?, is_featured = ?, sort_order = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&mentor.slug)
            .bind(&mentor.full_name)
            .bind(&mentor.title)
            .bind(&mentor.company)
            .bind(&mentor.bio)
            .bind(&mentor.avatar_url)
            .bind(&mentor.email)
            .bind(&mentor.linkedin_url)
            .bind(&mentor.location)
            .bind(mentor.years_experience)
            .bind(mentor.is_published)
            .bind(mentor.is_featured)
            .bind(mentor.sort_order)
            .bind(now)
            .bind(mentor.id)
            .execute(p)
            .await
            .context("Failed to update mentor")?;
            Ok::<_, anyhow::Error>(())
        })?;

        Ok(Mentor {
            updated_at: now,
            ..mentor.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM mentors WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete mentor")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn list(&self, filter: &MentorFilter) -> Result<Vec<Mentor>> {
        let sql = format!(
            "SELECT {} FROM mentors {} ORDER BY {} LIMIT ? OFFSET ?",
            MENTOR_COLUMNS,
            FILTER_CLAUSE,
            order_clause(filter)
        );
        let binds = FilterBinds::new(filter);
        let limit = if filter.limit > 0 { filter.limit } else { 12 };

        with_pool!(self.pool, |p| {
            bind_filter!(sqlx::query_as::<_, Mentor>(&sql), binds)
                .bind(limit)
                .bind(filter.offset.max(0))
                .fetch_all(p)
                .await
                .context("Failed to list mentors")
        })
    }

    async fn count(&self, filter: &MentorFilter) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM mentors {}", FILTER_CLAUSE);
        let binds = FilterBinds::new(filter);

        with_pool!(self.pool, |p| {
            bind_filter!(sqlx::query_scalar::<_, i64>(&sql), binds)
                .fetch_one(p)
                .await
                .context("Failed to count mentors")
        })
    }

    async fn set_published(&self, id: i64, published: bool) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("UPDATE mentors SET is_published = ?, updated_at = ? WHERE id = ?")
                .bind(published)
                .bind(Utc::now())
                .bind(id)
                .execute(p)
                .await
                .context("Failed to update mentor visibility")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn get_skills(&self, mentor_id: i64) -> Result<Vec<String>> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, String>(
                "SELECT name FROM mentor_skills WHERE mentor_id = ? ORDER BY sort_order, id",
            )
            .bind(mentor_id)
            .fetch_all(p)
            .await
            .context("Failed to get mentor skills")
        })
    }

    async fn get_skills_for(&self, mentor_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
        let mut skills: HashMap<i64, Vec<String>> = HashMap::new();
        if mentor_ids.is_empty() {
            return Ok(skills);
        }

        let placeholders = vec!["?"; mentor_ids.len()].join(", ");
        let sql = format!(
            "SELECT mentor_id, name FROM mentor_skills WHERE mentor_id IN ({}) \
             ORDER BY mentor_id, sort_order, id",
            placeholders
        );

        let rows: Vec<(i64, String)> = with_pool!(self.pool, |p| {
            let mut query = sqlx::query_as::<_, (i64, String)>(&sql);
            for id in mentor_ids {
                query = query.bind(*id);
            }
            query.fetch_all(p).await.context("Failed to get skills")?
        });

        for (mentor_id, name) in rows {
            skills.entry(mentor_id).or_default().push(name);
        }
        Ok(skills)
    }

    async fn replace_skills(&self, mentor_id: i64, names: &[String]) -> Result<()> {
        with_pool!(self.pool, |p| {
            let mut tx = p.begin().await.context("Failed to begin transaction")?;

            sqlx::query("DELETE FROM mentor_skills WHERE mentor_id = ?")
                .bind(mentor_id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete mentor skills")?;

            for (position, name) in names.iter().enumerate() {
                sqlx::query("INSERT INTO mentor_skills (mentor_id, name, sort_order) VALUES (?, ?, ?)")
                    .bind(mentor_id)
                    .bind(name)
                    .bind(position as i32)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to insert skill '{}'", name))?;
            }

            sqlx::query("UPDATE mentors SET updated_at = ? WHERE id = ?")
                .bind(Utc::now())
                .bind(mentor_id)
                .execute(&mut *tx)
                .await
                .context("Failed to touch mentor")?;

            tx.commit().await.context("Failed to commit skills")?;
            Ok(())
        })
    }

    async fn skill_counts(&self) -> Result<Vec<(String, i64)>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, (String, i64)>(
                r#"
                SELECT s.name, COUNT(*) AS usage_count
                FROM mentor_skills s
                JOIN mentors m ON m.id = s.mentor_id
                WHERE m.is_published = 1
                GROUP BY s.name
                ORDER BY usage_count DESC, s.name ASC
                "#,
            )
            .fetch_all(p)
            .await
            .context("Failed to count skills")
        })
    }

    async fn adjust_rating(&self, id: i64, delta_total: i64, delta_count: i64) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                UPDATE mentors
                SET rating_total = CASE WHEN rating_total + ? < 0 THEN 0 ELSE rating_total + ? END,
                    rating_count = CASE WHEN rating_count + ? < 0 THEN 0 ELSE rating_count + ? END
                WHERE id = ?
                "#,
            )
            .bind(delta_total)
            .bind(delta_total)
            .bind(delta_count)
            .bind(delta_count)
            .bind(id)
            .execute(p)
            .await
            .context("Failed to adjust mentor rating")?;
            Ok(())
        })
    }
}

//! Booking repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, LastInsertId};
use crate::models::{Booking, BookingStatus, BookingView};

const BOOKING_COLUMNS: &str = "id, mentor_id, user_id, scheduled_at, duration_minutes, topic, note, \
                               status, created_at, updated_at";

const VIEW_SELECT: &str = r#"
    SELECT b.id, b.mentor_id, b.user_id, b.scheduled_at, b.duration_minutes, b.topic, b.note,
           b.status, b.created_at, b.updated_at,
           m.full_name AS mentor_name, u.full_name AS user_name
    FROM bookings b
    JOIN mentors m ON m.id = b.mentor_id
    JOIN users u ON u.id = b.user_id
"#;

/// Which bookings a listing covers
#[derive(Debug, Clone, Copy)]
pub enum BookingScope {
    User(i64),
    Mentor(i64),
    All,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: &Booking) -> Result<Booking>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Booking>>;

    /// Soonest first, with the unpaged total
    async fn list(
        &self,
        scope: BookingScope,
        status: Option<BookingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<BookingView>, i64)>;

    /// Conditional update from `from` to `to`; false when the row moved on
    async fn update_status(&self, id: i64, from: BookingStatus, to: BookingStatus) -> Result<bool>;

    /// True if the user has a completed session with the mentor
    async fn has_completed(&self, user_id: i64, mentor_id: i64) -> Result<bool>;

    async fn count_by_status(&self, status: BookingStatus) -> Result<i64>;
}

pub struct SqlxBookingRepository {
    pool: DynDatabasePool,
}

impl SqlxBookingRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookingRepository> {
        Arc::new(Self::new(pool))
    }
}

fn scope_clause(scope: BookingScope) -> (&'static str, Option<i64>) {
    match scope {
        BookingScope::User(id) => ("b.user_id = ?", Some(id)),
        BookingScope::Mentor(id) => ("b.mentor_id = ?", Some(id)),
        BookingScope::All => ("1 = 1", None),
    }
}

#[async_trait]
impl BookingRepository for SqlxBookingRepository {
    async fn create(&self, booking: &Booking) -> Result<Booking> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO bookings (mentor_id, user_id, scheduled_at, duration_minutes, topic, note,
                                      status, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(booking.mentor_id)
            .bind(booking.user_id)
            .bind(booking.scheduled_at)
            .bind(booking.duration_minutes)
            .bind(&booking.topic)
            .bind(&booking.note)
            .bind(booking.status.as_str())
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create booking")?
            .last_id()
        });

        Ok(Booking {
            id,
            created_at: now,
            updated_at: now,
            ..booking.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = ?", BOOKING_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Booking>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get booking")
        })
    }

    async fn list(
        &self,
        scope: BookingScope,
        status: Option<BookingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<BookingView>, i64)> {
        let (scope_sql, scope_id) = scope_clause(scope);
        let status = status.map(|s| s.as_str());
        let list_sql = format!(
            "{} WHERE {} AND (? IS NULL OR b.status = ?) \
             ORDER BY b.scheduled_at ASC, b.id ASC LIMIT ? OFFSET ?",
            VIEW_SELECT, scope_sql
        );
        let count_sql = format!(
            "SELECT COUNT(*) FROM bookings b WHERE {} AND (? IS NULL OR b.status = ?)",
            scope_sql
        );

        with_pool!(self.pool, |p| {
            let mut list_query = sqlx::query_as::<_, BookingView>(&list_sql);
            let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
            if let Some(id) = scope_id {
                list_query = list_query.bind(id);
                count_query = count_query.bind(id);
            }

            let items = list_query
                .bind(status)
                .bind(status)
                .bind(limit)
                .bind(offset.max(0))
                .fetch_all(p)
                .await
                .context("Failed to list bookings")?;
            let total = count_query
                .bind(status)
                .bind(status)
                .fetch_one(p)
                .await
                .context("Failed to count bookings")?;
            Ok((items, total))
        })
    }

    async fn update_status(&self, id: i64, from: BookingStatus, to: BookingStatus) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result =
                sqlx::query("UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                    .bind(to.as_str())
                    .bind(Utc::now())
                    .bind(id)
                    .bind(from.as_str())
                    .execute(p)
                    .await
                    .context("Failed to update booking status")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn has_completed(&self, user_id: i64, mentor_id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let count = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM bookings WHERE user_id = ? AND mentor_id = ? AND status = ?",
            )
            .bind(user_id)
            .bind(mentor_id)
            .bind(BookingStatus::Completed.as_str())
            .fetch_one(p)
            .await
            .context("Failed to check completed bookings")?;
            Ok(count > 0)
        })
    }

    async fn count_by_status(&self, status: BookingStatus) -> Result<i64> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(p)
                .await
                .context("Failed to count bookings")
        })
    }
}

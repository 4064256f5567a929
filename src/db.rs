use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::{Date, OffsetDateTime, Time};

use crate::config::DatabaseConfig;

pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .context("connect to database")
}

/// Applies `./migrations`; a failure is logged and startup continues.
pub async fn run_migrations(db: &PgPool) {
    if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }
}

/// Half-open `[start, end)` UTC instants covering `date`, so range filters can use the
/// timestamp indexes directly.
pub fn utc_day_bounds(date: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = date.midnight().assume_utc();
    let end = match date.next_day() {
        Some(next) => next.midnight(),
        None => date.with_time(Time::MAX),
    }
    .assume_utc();
    (start, end)
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn day_bounds_are_half_open() {
        let (start, end) = utc_day_bounds(date!(2024 - 02 - 04));
        assert_eq!(start, datetime!(2024-02-04 00:00 UTC));
        assert_eq!(end, datetime!(2024-02-05 00:00 UTC));

        let late = datetime!(2024-02-04 23:59:59.999 UTC);
        assert!(start <= late && late < end);
        let next_midnight = datetime!(2024-02-05 00:00 UTC);
        assert!(next_midnight >= end);
        let kyiv_breakfast = datetime!(2024-02-05 01:30 +02:00);
        assert!(start <= kyiv_breakfast && kyiv_breakfast < end);
    }

    #[test]
    fn day_bounds_cover_the_last_representable_day() {
        let (start, end) = utc_day_bounds(Date::MAX);
        assert!(start < end);
        assert_eq!(end.date(), Date::MAX);
    }
}

//! Usage statistics

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;
use quickonboard_common::{
    auth::AuthContext,
    errors::{AppError, Result},
};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct QueryStatsResponse {
    pub current_month: u64,
    pub last_month: u64,
    pub percentage_change: i64,
}

/// Chat queries this month vs last month
pub async fn query_stats(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<QueryStatsResponse>> {
    state.repo.require_member(workspace_id, auth.user_id).await?;

    let (last_start, current_start, next_start) = month_bounds(Utc::now())?;
    let current_month = state
        .repo
        .count_chat_queries(workspace_id, current_start, next_start)
        .await?;
    let last_month = state
        .repo
        .count_chat_queries(workspace_id, last_start, current_start)
        .await?;

    Ok(Json(QueryStatsResponse {
        current_month,
        last_month,
        percentage_change: percentage_change(current_month, last_month),
    }))
}

/// Change relative to last month, halves rounded up; 100 when growing from zero
pub fn percentage_change(current: u64, last: u64) -> i64 {
    if last > 0 {
        let change = (current as f64 - last as f64) / last as f64 * 100.0;
        (change + 0.5).floor() as i64
    } else if current > 0 {
        100
    } else {
        0
    }
}

/// Starts of last month, this month, and next month (UTC)
fn month_bounds(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>, DateTime<Utc>)> {
    let month_start = |year: i32, month: u32| {
        Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| AppError::Internal {
                message: format!("Invalid month {}-{}", year, month),
            })
    };

    let (year, month) = (now.year(), now.month());
    let (last_year, last_month) = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

    Ok((
        month_start(last_year, last_month)?,
        month_start(year, month)?,
        month_start(next_year, next_month)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_change() {
        assert_eq!(percentage_change(15, 10), 50);
        assert_eq!(percentage_change(5, 10), -50);
        assert_eq!(percentage_change(1, 3), -67);
        assert_eq!(percentage_change(7, 0), 100);
        assert_eq!(percentage_change(0, 0), 0);
    }

    #[test]
    fn test_percentage_change_rounds_halves_up() {
        assert_eq!(percentage_change(1, 8), -87);
        assert_eq!(percentage_change(3, 8), -62);
        assert_eq!(percentage_change(9, 8), 13);
    }

    #[test]
    fn test_month_bounds_wrap_year() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let (last, current, next) = month_bounds(now).unwrap();
        assert_eq!(last, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(current, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());

        let december = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(month_bounds(december).unwrap().2, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }
}

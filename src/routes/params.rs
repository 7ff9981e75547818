use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

// Query strings cannot carry numbers through `#[serde(flatten)]`, so the
// paging fields are repeated here instead of embedding `Pagination`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MovieQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl MovieQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Screening listing window. `from`/`to` win over `date`; with neither, the
/// current UTC calendar day is listed.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScreeningListQuery {
    pub date: Option<NaiveDate>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub movie_id: Option<Uuid>,
    pub screen_id: Option<Uuid>,
}

impl ScreeningListQuery {
    /// Half-open `[start, end)` range of screening start instants to list.
    pub fn range(&self, now: DateTime<Utc>) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
        let (start, end) = match (self.from, self.to) {
            (Some(from), Some(to)) => (from, to),
            (Some(from), None) => (from, from + Duration::hours(24)),
            (None, Some(to)) => (to - Duration::hours(24), to),
            (None, None) => {
                let day = self.date.unwrap_or_else(|| now.date_naive());
                let start = day
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| AppError::BadRequest("invalid date".into()))?
                    .and_utc();
                (start, start + Duration::hours(24))
            }
        };

        if end <= start {
            return Err(AppError::BadRequest("`to` must be after `from`".into()));
        }
        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_expands_to_whole_day() {
        let query = ScreeningListQuery {
            date: NaiveDate::from_ymd_opt(2030, 5, 1),
            ..Default::default()
        };
        let (start, end) = query.range(Utc::now()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2030, 5, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn defaults_to_today() {
        let now = Utc.with_ymd_and_hms(2030, 5, 1, 15, 30, 0).unwrap();
        let (start, _) = ScreeningListQuery::default().range(now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let now = Utc::now();
        let query = ScreeningListQuery {
            from: Some(now),
            to: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        assert!(matches!(query.range(now), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn pagination_is_clamped() {
        let pagination = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(pagination.normalize(), (1, 100, 0));
    }
}

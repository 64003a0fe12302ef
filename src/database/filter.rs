use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

/// Inclusive `created_at` bounds for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Parse `startDate` / `endDate` query values.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or RFC 3339. A bare end
    /// date covers the whole day.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, String> {
        let start = non_empty(start)
            .map(|s| parse_bound(s, false).ok_or_else(|| format!("invalid startDate: {s}")))
            .transpose()?;
        let end = non_empty(end)
            .map(|s| parse_bound(s, true).ok_or_else(|| format!("invalid endDate: {s}")))
            .transpose()?;

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err("startDate must not be after endDate".to_string());
            }
        }
        Ok(Self { start, end })
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Appends ` AND <column> >= $n` / ` AND <column> <= $m` for the bounds present.
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>, column: &str) {
        if let Some(start) = self.start {
            qb.push(" AND ").push(column).push(" >= ").push_bind(start);
        }
        if let Some(end) = self.end {
            qb.push(" AND ").push(column).push(" <= ").push_bind(end);
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bound(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    if end_of_day {
        Some(midnight + Duration::days(1) - Duration::microseconds(1))
    } else {
        Some(midnight)
    }
}

/// `%term%` with LIKE metacharacters escaped, for use with `ILIKE`.
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Trimmed, non-empty search term or `None`.
pub fn search_term(raw: Option<&str>) -> Option<String> {
    non_empty(raw).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_bare_dates_as_whole_days() {
        let r = DateRange::parse(Some("2024-03-01"), Some("2024-03-31")).unwrap();
        assert_eq!(r.start, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
        let end = r.end.unwrap();
        assert!(end > Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_datetime_and_rfc3339() {
        let r = DateRange::parse(Some("2024-03-01 08:30:00"), Some("2024-03-02T10:00:00+08:00"))
            .unwrap();
        assert_eq!(r.start, Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()));
        assert_eq!(r.end, Some(Utc.with_ymd_and_hms(2024, 3, 2, 2, 0, 0).unwrap()));
    }

    #[test]
    fn absent_or_blank_bounds_are_open() {
        let r = DateRange::parse(None, Some("  ")).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn rejects_garbage_and_inverted_ranges() {
        assert!(DateRange::parse(Some("yesterday"), None).is_err());
        assert!(DateRange::parse(Some("2024-05-01"), Some("2024-04-01")).is_err());
    }

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(contains_pattern("urea"), "%urea%");
        assert_eq!(contains_pattern("50%_mix"), "%50\\%\\_mix%");
    }

    #[test]
    fn pushes_only_present_bounds() {
        let r = DateRange::parse(Some("2024-01-01"), None).unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM t WHERE user_id = ");
        qb.push_bind(1_i64);
        r.push_conditions(&mut qb, "created_at");
        assert_eq!(qb.sql(), "SELECT 1 FROM t WHERE user_id = $1 AND created_at >= $2");
    }
}

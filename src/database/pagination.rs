use serde::Serialize;

/// A validated page window. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("{field} must be a positive integer")]
    NotPositive { field: &'static str },

    #[error("pageSize must not exceed {max}")]
    TooLarge { max: i64 },
}

impl PageRequest {
    pub const DEFAULT_PAGE: i64 = 1;

    /// Parse raw `page` / `pageSize` query values.
    ///
    /// Absent values fall back to page 1 and `default_size`. Values that are
    /// present but not positive integers are rejected, as is a page size above
    /// `max_size`.
    pub fn from_params(
        page: Option<&str>,
        page_size: Option<&str>,
        default_size: i64,
        max_size: i64,
    ) -> Result<Self, PageError> {
        let page = parse_positive(page, "page")?.unwrap_or(Self::DEFAULT_PAGE);
        let page_size = parse_positive(page_size, "pageSize")?.unwrap_or(default_size);
        if page_size > max_size {
            return Err(PageError::TooLarge { max: max_size });
        }
        Ok(Self { page, page_size })
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

fn parse_positive(raw: Option<&str>, field: &'static str) -> Result<Option<i64>, PageError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => match s.parse::<i64>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(PageError::NotPositive { field }),
        },
    }
}

/// One page of owner-scoped records plus the unpaginated total.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_absent() {
        let p = PageRequest::from_params(None, None, 10, 100).unwrap();
        assert_eq!(p, PageRequest { page: 1, page_size: 10 });
        assert_eq!(p.offset(), 0);

        let p = PageRequest::from_params(Some(""), Some(" "), 10, 100).unwrap();
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 10);
    }

    #[test]
    fn offset_is_page_minus_one_times_size() {
        let p = PageRequest::from_params(Some("2"), Some("10"), 10, 100).unwrap();
        assert_eq!(p.limit(), 10);
        assert_eq!(p.offset(), 10);

        let p = PageRequest::from_params(Some("4"), Some("25"), 10, 100).unwrap();
        assert_eq!(p.offset(), 75);
    }

    #[test]
    fn rejects_non_positive_and_garbage() {
        assert_eq!(
            PageRequest::from_params(Some("0"), None, 10, 100),
            Err(PageError::NotPositive { field: "page" })
        );
        assert_eq!(
            PageRequest::from_params(None, Some("-5"), 10, 100),
            Err(PageError::NotPositive { field: "pageSize" })
        );
        assert_eq!(
            PageRequest::from_params(Some("abc"), None, 10, 100),
            Err(PageError::NotPositive { field: "page" })
        );
    }

    #[test]
    fn rejects_page_size_over_max() {
        assert_eq!(
            PageRequest::from_params(None, Some("101"), 10, 100),
            Err(PageError::TooLarge { max: 100 })
        );
        assert!(PageRequest::from_params(None, Some("100"), 10, 100).is_ok());
    }
}

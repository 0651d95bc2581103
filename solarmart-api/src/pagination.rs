/// Page-number pagination
///
/// `?page=N&page_size=M` with page 1 and size 10 by default and a size cap
/// of 100. Responses look like
///
/// ```json
/// { "count": 42, "next": 3, "previous": 1, "results": [...] }
/// ```
///
/// where `next` and `previous` are page numbers or null. Asking for a page
/// past the end is a 404, except page 1 of an empty result.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
            .filter(|s| *s > 0)
            .map(|s| s.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        self.page_size()
    }

    pub fn offset(&self) -> i64 {
        (self.page().max(1) - 1) * self.page_size()
    }

    /// Rejects pages that cannot hold any of `count` rows
    pub fn check(&self, count: i64) -> ApiResult<()> {
        let page = self.page();
        let last = last_page(count, self.page_size());

        if page < 1 || page > last {
            return Err(ApiError::NotFound("Invalid page.".to_string()));
        }
        Ok(())
    }
}

fn last_page(count: i64, page_size: i64) -> i64 {
    ((count + page_size - 1) / page_size).max(1)
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(params: &PageParams, count: i64, results: Vec<T>) -> Self {
        let page = params.page();
        let last = last_page(count, params.page_size());

        Self {
            count,
            next: (page < last).then_some(page + 1),
            previous: (page > 1).then_some(page - 1),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, page_size: Option<i64>) -> PageParams {
        PageParams { page, page_size }
    }

    #[test]
    fn test_defaults_and_cap() {
        let p = params(None, None);
        assert_eq!((p.page(), p.page_size(), p.offset()), (1, 10, 0));

        let p = params(Some(3), Some(500));
        assert_eq!(p.page_size(), 100);
        assert_eq!(p.offset(), 200);

        assert_eq!(params(None, Some(0)).page_size(), 10);
    }

    #[test]
    fn test_next_previous() {
        let page = Page::new(&params(Some(2), Some(10)), 25, vec![0; 10]);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let page = Page::new(&params(Some(3), Some(10)), 25, vec![0; 5]);
        assert_eq!(page.next, None);

        let page: Page<i32> = Page::new(&params(None, None), 0, vec![]);
        assert_eq!((page.next, page.previous), (None, None));
    }

    #[test]
    fn test_invalid_page() {
        assert!(params(Some(1), None).check(0).is_ok());
        assert!(params(Some(3), Some(10)).check(25).is_ok());
        assert!(params(Some(4), Some(10)).check(25).is_err());
        assert!(params(Some(0), None).check(5).is_err());
    }
}

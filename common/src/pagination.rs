// Page math and absolute next/previous link building for listings

use crate::errors::ValidationError;
use serde::Serialize;

/// Page-number pagination over a fixed page size
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u32,
}

/// Response envelope for a paginated listing
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub count: i64,
    pub num_pages: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl Paginator {
    pub fn new(per_page: u32) -> Self {
        Self { per_page }
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    /// Row offset for a 1-based page number
    pub fn offset(&self, page: i64) -> i64 {
        (page - 1) * self.per_page as i64
    }

    /// Total number of pages; an empty result set still has one page
    pub fn num_pages(&self, count: i64) -> i64 {
        if count <= self.per_page as i64 {
            return 1;
        }
        let per_page = self.per_page as i64;
        let mut pages = count / per_page;
        if count % per_page != 0 {
            pages += 1;
        }
        pages
    }

    /// Reject page numbers outside [1, num_pages]
    pub fn validate(&self, page: i64, count: i64) -> Result<(), ValidationError> {
        if page < 1 || page > self.num_pages(count) {
            return Err(ValidationError::InvalidPage);
        }
        Ok(())
    }

    /// Absolute (previous, next) links for the current page, `None` at the edges
    pub fn links(
        &self,
        site_url: &str,
        path: &str,
        page: i64,
        count: i64,
    ) -> (Option<String>, Option<String>) {
        let num_pages = self.num_pages(count);
        let base = format!("{}{}", site_url.trim_end_matches('/'), path);

        let previous = if page > 1 {
            Some(format!("{}?page={}", base, page - 1))
        } else {
            None
        };
        let next = if page < num_pages {
            Some(format!("{}?page={}", base, page + 1))
        } else {
            None
        };

        (previous, next)
    }

    /// Assemble the full response envelope for one page of results
    pub fn page<T: Serialize>(
        &self,
        site_url: &str,
        path: &str,
        page: i64,
        count: i64,
        results: Vec<T>,
    ) -> Page<T> {
        let (previous, next) = self.links(site_url, path, page, count);
        Page {
            count,
            num_pages: self.num_pages(count),
            next,
            previous,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_pages_minimum_is_one() {
        let p = Paginator::new(10);
        assert_eq!(p.num_pages(0), 1);
        assert_eq!(p.num_pages(1), 1);
        assert_eq!(p.num_pages(10), 1);
    }

    #[test]
    fn test_num_pages_rounds_up() {
        let p = Paginator::new(10);
        assert_eq!(p.num_pages(11), 2);
        assert_eq!(p.num_pages(20), 2);
        assert_eq!(p.num_pages(21), 3);
    }

    #[test]
    fn test_offset_is_zero_based() {
        let p = Paginator::new(10);
        assert_eq!(p.offset(1), 0);
        assert_eq!(p.offset(2), 10);
        assert_eq!(p.offset(5), 40);
    }

    #[test]
    fn test_validate_rejects_out_of_range_pages() {
        let p = Paginator::new(10);
        assert!(p.validate(0, 25).is_err());
        assert!(p.validate(-1, 25).is_err());
        assert!(p.validate(4, 25).is_err());
        assert!(p.validate(1, 25).is_ok());
        assert!(p.validate(3, 25).is_ok());
    }

    #[test]
    fn test_validate_allows_first_page_of_empty_set() {
        let p = Paginator::new(10);
        assert!(p.validate(1, 0).is_ok());
        assert!(p.validate(2, 0).is_err());
    }

    #[test]
    fn test_links_middle_page() {
        let p = Paginator::new(10);
        let (prev, next) = p.links("http://127.0.0.1:8888", "/api/categories", 2, 25);
        assert_eq!(
            prev.as_deref(),
            Some("http://127.0.0.1:8888/api/categories?page=1")
        );
        assert_eq!(
            next.as_deref(),
            Some("http://127.0.0.1:8888/api/categories?page=3")
        );
    }

    #[test]
    fn test_links_first_and_last_page() {
        let p = Paginator::new(10);

        let (prev, next) = p.links("http://127.0.0.1:8888", "/api/posts", 1, 25);
        assert!(prev.is_none());
        assert_eq!(next.as_deref(), Some("http://127.0.0.1:8888/api/posts?page=2"));

        let (prev, next) = p.links("http://127.0.0.1:8888", "/api/posts", 3, 25);
        assert_eq!(
            prev.as_deref(),
            Some("http://127.0.0.1:8888/api/posts?page=2")
        );
        assert!(next.is_none());
    }

    #[test]
    fn test_links_single_page_has_no_links() {
        let p = Paginator::new(10);
        let (prev, next) = p.links("http://127.0.0.1:8888", "/api/posts", 1, 5);
        assert!(prev.is_none());
        assert!(next.is_none());
    }

    #[test]
    fn test_links_trims_trailing_slash_from_site_url() {
        let p = Paginator::new(10);
        let (_, next) = p.links("http://127.0.0.1:8888/", "/api/posts", 1, 25);
        assert_eq!(next.as_deref(), Some("http://127.0.0.1:8888/api/posts?page=2"));
    }

    #[test]
    fn test_page_envelope() {
        let p = Paginator::new(2);
        let page = p.page("http://s", "/api/categories", 2, 5, vec!["a", "b"]);
        assert_eq!(page.count, 5);
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.results.len(), 2);
        assert!(page.previous.is_some());
        assert!(page.next.is_some());
    }
}

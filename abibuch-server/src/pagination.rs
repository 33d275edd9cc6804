//! Page arithmetic for list endpoints

use serde::Serialize;

/// Default audit log page size
pub const AUDIT_PAGE_SIZE: i64 = 100;

/// Pagination metadata calculated from a total row count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_rows: i64,
    /// Offset for SQL LIMIT/OFFSET
    #[serde(skip)]
    pub offset: i64,
}

impl Pagination {
    /// Clamp `requested_page` into `[1, total_pages]`
    ///
    /// # Examples
    /// ```
    /// use abibuch_server::pagination::Pagination;
    ///
    /// // 250 rows at 100 per page = 3 pages
    /// let p = Pagination::new(250, 99, 100);
    /// assert_eq!(p.page, 3);
    /// assert_eq!(p.offset, 200);
    /// ```
    pub fn new(total_rows: i64, requested_page: i64, page_size: i64) -> Self {
        let page_size = page_size.max(1);
        let total_pages = (total_rows + page_size - 1) / page_size;
        let page = requested_page.max(1).min(total_pages.max(1));
        let offset = (page - 1) * page_size;

        Self {
            page,
            page_size,
            total_pages,
            total_rows,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = Pagination::new(250, 2, 100);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = Pagination::new(150, 0, 100);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = Pagination::new(0, 5, 100);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_exact_boundary() {
        let p = Pagination::new(200, 3, 100);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 2);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let p = Pagination::new(3, 2, 0);
        assert_eq!(p.page_size, 1);
        assert_eq!(p.page, 2);
        assert_eq!(p.offset, 1);
    }
}

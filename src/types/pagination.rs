//! Pagination types for list results.

use serde::Serialize;

/// One page of results plus the numbers needed to fetch the others
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit > 0 { total.div_ceil(limit) } else { 0 };

        Self {
            items,
            meta: PaginationMeta {
                page,
                limit,
                total,
                total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Paginated::new(vec![1, 2], 2, 12, 25);
        assert_eq!(page.meta.total_pages, 3);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn test_empty_result_has_no_pages() {
        let page: Paginated<u8> = Paginated::new(vec![], 1, 12, 0);
        assert_eq!(page.meta.total_pages, 0);
    }
}

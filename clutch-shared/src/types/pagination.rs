use serde::{Deserialize, Serialize};

const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 25 }

impl PaginationParams {
    /// Rows to skip. Saturates at `i64::MAX` instead of wrapping negative.
    pub fn offset(&self) -> i64 {
        let skipped = i64::try_from(self.page.max(1) - 1).unwrap_or(i64::MAX);
        skipped.saturating_mul(self.limit())
    }

    pub fn limit(&self) -> i64 {
        self.per_page.clamp(1, MAX_PER_PAGE) as i64
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: default_page(), per_page: default_per_page() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, params: &PaginationParams) -> Self {
        let total = total.max(0) as u64;
        let per_page = params.limit() as u64;
        Self {
            items,
            total,
            page: params.page.max(1),
            per_page,
            total_pages: total.div_ceil(per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_zero_is_first_page() {
        let params = PaginationParams { page: 0, per_page: 10 };
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn huge_page_saturates_instead_of_going_negative() {
        let params = PaginationParams { page: 100_000_000_000_000_000, per_page: 100 };
        assert_eq!(params.offset(), i64::MAX);

        let params = PaginationParams { page: u64::MAX, per_page: 1 };
        assert_eq!(params.offset(), i64::MAX);
    }

    #[test]
    fn per_page_is_clamped() {
        let params = PaginationParams { page: 3, per_page: 500 };
        assert_eq!(params.limit(), 100);
        assert_eq!(params.offset(), 200);

        let params = PaginationParams { page: 1, per_page: 0 };
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PaginationParams { page: 1, per_page: 10 };
        let page = Paginated::new(vec![1, 2, 3], 21, &params);
        assert_eq!(page.total_pages, 3);

        let empty: Paginated<i32> = Paginated::new(vec![], 0, &params);
        assert_eq!(empty.total_pages, 0);
    }
}

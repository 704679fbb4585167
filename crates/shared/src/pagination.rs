//! Page/limit pagination utilities.

use serde::{Deserialize, Serialize};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum number of items per page.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for paginated list endpoints.
///
/// Out-of-range values are clamped rather than rejected, matching the
/// behavior clients already rely on.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl PageParams {
    /// The 1-based page number, clamped to >= 1.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// The page size, clamped to 1..=MAX_PAGE_SIZE.
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Row offset for the current page.
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// Pagination metadata returned alongside page contents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl PageInfo {
    /// Builds page metadata for a total row count.
    pub fn new(params: PageParams, total: i64) -> Self {
        let limit = params.limit();
        Self {
            page: params.page(),
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let params = PageParams {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), MAX_PAGE_SIZE);

        let params = PageParams {
            page: Some(-3),
            limit: Some(0),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn test_offset() {
        let params = PageParams {
            page: Some(3),
            limit: Some(25),
        };
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn test_page_info_rounds_up() {
        let params = PageParams {
            page: Some(1),
            limit: Some(20),
        };
        let info = PageInfo::new(params, 41);
        assert_eq!(info.pages, 3);
        assert_eq!(info.total, 41);
    }

    #[test]
    fn test_page_info_empty() {
        let info = PageInfo::new(PageParams::default(), 0);
        assert_eq!(info.pages, 0);
        assert_eq!(info.total, 0);
    }

    #[test]
    fn test_page_info_serialization() {
        let info = PageInfo::new(PageParams::default(), 5);
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"total\":5"));
        assert!(json.contains("\"pages\":1"));
    }
}

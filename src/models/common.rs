//! Response envelopes shared by every endpoint

use serde::{Deserialize, Serialize};

use crate::error::FieldError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    /// Internal detail, development builds only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Successful response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 100;
/// Highest page whose row offset still fits a signed 64-bit SQL OFFSET
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_LIMIT;

/// `?page=&limit=` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    /// 1-based page, clamped to [1, MAX_PAGE]
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    /// Rows skipped before this page
    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Page size, clamped to [1, MAX_PAGE_LIMIT]
    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(query: &PageQuery, total: u64) -> Self {
        let limit = query.limit();
        Self {
            page: query.page(),
            limit,
            total,
            pages: total.div_ceil(limit),
        }
    }
}

/// A page of rows plus its pagination block
#[derive(Debug, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults_and_caps() {
        let q = PageQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 20);

        let q = PageQuery {
            page: Some(0),
            limit: Some(500),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 100);
    }

    #[test]
    fn test_pagination_pages_round_up() {
        let q = PageQuery {
            page: Some(2),
            limit: Some(20),
        };
        let p = Pagination::new(&q, 41);
        assert_eq!(p.pages, 3);
        assert_eq!(Pagination::new(&q, 0).pages, 0);
    }

    #[test]
    fn test_huge_page_offset_does_not_overflow() {
        let q = PageQuery {
            page: Some(u64::MAX),
            limit: Some(100),
        };
        assert_eq!(q.page(), MAX_PAGE);
        assert!(q.offset() <= i64::MAX as u64);
        assert_eq!(PageQuery::default().offset(), 0);
    }
}

//! Pagination and sorting parameters for item listings.

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw listing parameters, as received from a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

impl ListParams {
    /// Apply defaults and limits.
    pub fn resolve(&self) -> PageRequest {
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = self
            .page_size
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        PageRequest {
            page,
            page_size,
            sort_by: SortField::parse(self.sort_by.as_deref().unwrap_or_default()),
            sort_dir: SortDir::parse(self.sort_dir.as_deref().unwrap_or_default()),
        }
    }
}

/// Sortable item columns. Unknown names fall back to `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Name,
    Id,
}

impl SortField {
    pub fn parse(s: &str) -> Self {
        match s {
            "updated_at" => Self::UpdatedAt,
            "name" => Self::Name,
            "id" => Self::Id,
            _ => Self::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Name => "name",
            Self::Id => "id",
        }
    }
}

/// Sort direction. Only `asc` sorts ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Normalized listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortField,
    pub sort_dir: SortDir,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        ListParams::default().resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = ListParams::default().resolve();
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(req.sort_by, SortField::CreatedAt);
        assert_eq!(req.sort_dir, SortDir::Desc);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_unknown_sort_falls_back() {
        let params = ListParams {
            sort_by: Some("content; DROP TABLE items".to_string()),
            sort_dir: Some("sideways".to_string()),
            ..Default::default()
        };
        let req = params.resolve();
        assert_eq!(req.sort_by, SortField::CreatedAt);
        assert_eq!(req.sort_dir, SortDir::Desc);
    }

    #[test]
    fn test_page_size_is_capped() {
        let params = ListParams {
            page: Some(3),
            page_size: Some(10_000),
            sort_by: Some("name".to_string()),
            sort_dir: Some("ASC".to_string()),
        };
        let req = params.resolve();
        assert_eq!(req.page_size, MAX_PAGE_SIZE);
        assert_eq!(req.offset(), 200);
        assert_eq!(req.sort_by.column(), "name");
        assert_eq!(req.sort_dir.sql(), "ASC");
    }

    #[test]
    fn test_zero_page_means_first() {
        let params = ListParams {
            page: Some(0),
            page_size: Some(0),
            ..Default::default()
        };
        let req = params.resolve();
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, DEFAULT_PAGE_SIZE);
    }
}

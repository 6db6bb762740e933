use serde::{Deserialize, Serialize};

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Pagination parameters as they arrive at the public boundary: 1-based page
/// number, free-form sort field validated against a per-entity allowlist.
#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    10
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
            sort: None,
            direction: None,
        }
    }
}

impl PageParams {
    pub fn limit(&self) -> i64 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }

    /// 1-based page translated to a 0-based row offset.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }

    /// Builds an ORDER BY clause. The sort field must come from the caller's
    /// allowlist; anything else is rejected with a message suitable for the
    /// response envelope.
    pub fn order_clause(&self, allowed: &[&str], default: &str) -> Result<String, String> {
        let field = match self.sort.as_deref() {
            Some(s) => {
                if !allowed.contains(&s) {
                    return Err(format!("Cannot sort by '{s}'"));
                }
                s
            }
            None => default,
        };
        let direction = self.direction.unwrap_or(SortDirection::Asc).as_sql();
        Ok(format!("{field} {direction}"))
    }
}

/// One bounded page of results together with the totals the clients paginate
/// with.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub number: i64,
    pub size: i64,
    pub number_of_elements: i64,
    pub first: bool,
    pub last: bool,
}

impl<T> PagedResponse<T> {
    pub fn new(content: Vec<T>, total_elements: i64, params: &PageParams) -> Self {
        let size = params.limit();
        let number = params.page.max(1);
        let total_pages = if total_elements == 0 {
            0
        } else {
            (total_elements + size - 1) / size
        };
        let number_of_elements = content.len() as i64;
        Self {
            content,
            total_elements,
            total_pages,
            number,
            size,
            number_of_elements,
            first: number == 1,
            last: number >= total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: i64, size: i64) -> PageParams {
        PageParams {
            page,
            size,
            sort: None,
            direction: None,
        }
    }

    #[test]
    fn first_page_has_zero_offset() {
        let p = params(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn public_pages_are_one_based() {
        let p = params(3, 25);
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn page_zero_is_treated_as_first() {
        let p = params(0, 10);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn size_is_clamped() {
        assert_eq!(params(1, 0).limit(), 1);
        assert_eq!(params(1, 100_000).limit(), 100);
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let p = PageParams {
            sort: Some("password_hash; DROP TABLE users".into()),
            ..PageParams::default()
        };
        let err = p.order_clause(&["id", "name"], "id").unwrap_err();
        assert!(err.contains("Cannot sort by"));
    }

    #[test]
    fn allowed_sort_field_builds_clause() {
        let p = PageParams {
            sort: Some("name".into()),
            direction: Some(SortDirection::Desc),
            ..PageParams::default()
        };
        assert_eq!(p.order_clause(&["id", "name"], "id").unwrap(), "name DESC");
    }

    #[test]
    fn defaults_apply_when_unset() {
        let p = PageParams::default();
        assert_eq!(p.order_clause(&["id"], "id").unwrap(), "id ASC");
    }

    #[test]
    fn paged_response_totals() {
        let page = PagedResponse::new(vec![1, 2, 3], 23, &params(3, 10));
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.number_of_elements, 3);
        assert!(!page.first);
        assert!(page.last);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let page: PagedResponse<i32> = PagedResponse::new(vec![], 0, &params(1, 10));
        assert_eq!(page.total_pages, 0);
        assert!(page.is_empty());
        assert!(page.first);
    }
}

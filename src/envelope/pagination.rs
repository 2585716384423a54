use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Pagination block attached to paginated success envelopes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    /// 1-based index of the first item on this page, absent when empty
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub has_more_pages: bool,
    pub links: PaginationLinks,
}

/// Navigation URLs for a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaginationLinks {
    pub first: String,
    pub last: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// One page of a larger collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    current_page: u64,
    per_page: u64,
    total: u64,
    path: String,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, current_page: u64, per_page: u64, total: u64) -> Self {
        Self {
            items,
            current_page: current_page.max(1),
            per_page: per_page.max(1),
            total,
            path: String::new(),
        }
    }

    /// Base path used when building navigation links
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn last_page(&self) -> u64 {
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn first_index(&self) -> Option<u64> {
        if self.items.is_empty() {
            return None;
        }
        (self.current_page - 1).checked_mul(self.per_page)?.checked_add(1)
    }

    pub fn last_index(&self) -> Option<u64> {
        self.first_index()?.checked_add(self.items.len() as u64 - 1)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }

    fn page_url(&self, page: u64) -> String {
        format!("{}?page={}", self.path, page)
    }

    pub fn pagination(&self) -> Pagination {
        let last_page = self.last_page();
        Pagination {
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            last_page,
            from: self.first_index(),
            to: self.last_index(),
            has_more_pages: self.has_more_pages(),
            links: PaginationLinks {
                first: self.page_url(1),
                last: self.page_url(last_page),
                prev: (self.current_page > 1).then(|| self.page_url(self.current_page - 1)),
                next: self
                    .has_more_pages()
                    .then(|| self.page_url(self.current_page + 1)),
            },
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            path: self.path,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T: Serialize> Page<T> {
    /// Serialize the items for an envelope
    pub fn into_json(self) -> serde_json::Result<Page<Value>> {
        let items = self
            .items
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(Page {
            items,
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            path: self.path,
        })
    }
}

/// Cut one page out of an in-memory collection. Pages past the end,
/// however far, are empty.
pub fn paginate<T: Clone>(all: &[T], page: u64, per_page: u64) -> Page<T> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let len = all.len();
    let start = (page - 1)
        .checked_mul(per_page)
        .and_then(|offset| usize::try_from(offset).ok())
        .map_or(len, |offset| offset.min(len));
    let end = start
        .saturating_add(usize::try_from(per_page).unwrap_or(usize::MAX))
        .min(len);
    Page::new(all[start..end].to_vec(), page, per_page, len as u64)
}

//! Query state for a list screen and the intents that mutate it.
//!
//! Every mutation is a pure state transition. The returned [`QueryChange`]
//! tells the session whether to refetch and whether the refetch is debounced.

use shared::{domain::SortDirection, protocol::ListQueryParams};

pub const DEFAULT_SORT_KEY: &str = "username";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub search_term: String,
    pub sort_key: String,
    pub sort_direction: SortDirection,
    pub page: u32,
    pub page_size: u32,
}

impl Query {
    pub fn new(page_size: u32, sort_key: impl Into<String>) -> Self {
        Self {
            search_term: String::new(),
            sort_key: sort_key.into(),
            sort_direction: SortDirection::Asc,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn to_params(&self) -> ListQueryParams {
        let search_term = self.search_term.trim();
        ListQueryParams {
            search_term: (!search_term.is_empty()).then(|| search_term.to_string()),
            page: self.page,
            limit: self.page_size,
            sort_by: self.sort_key.clone(),
            sort_order: self.sort_direction,
        }
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_SORT_KEY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryChange {
    Unchanged,
    /// Free-text edit; the fetch waits for the input to go idle.
    Search,
    /// Sort or pagination change; the fetch fires immediately.
    Structural,
}

impl QueryChange {
    pub fn is_changed(self) -> bool {
        !matches!(self, QueryChange::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct ListQueryController {
    query: Query,
    total_pages: u32,
}

impl ListQueryController {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            total_pages: 1,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Page bound reported by the last successful fetch.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn set_search_term(&mut self, text: impl Into<String>) -> QueryChange {
        let text = text.into();
        if text.trim() == self.query.search_term.trim() {
            self.query.search_term = text;
            return QueryChange::Unchanged;
        }
        self.query.search_term = text;
        self.query.page = 1;
        QueryChange::Search
    }

    pub fn set_sort(&mut self, key: &str) -> QueryChange {
        if self.query.sort_key == key {
            self.query.sort_direction = self.query.sort_direction.flipped();
        } else {
            self.query.sort_key = key.to_string();
            self.query.sort_direction = SortDirection::Asc;
        }
        QueryChange::Structural
    }

    pub fn set_page(&mut self, page: u32) -> QueryChange {
        if page < 1 || page > self.total_pages || page == self.query.page {
            return QueryChange::Unchanged;
        }
        self.query.page = page;
        QueryChange::Structural
    }

    pub fn next_page(&mut self) -> QueryChange {
        self.set_page(self.query.page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> QueryChange {
        self.set_page(self.query.page.saturating_sub(1))
    }

    /// Points the query back at a page that was actually loaded, so that
    /// relative navigation after a failed fetch starts from what is shown.
    pub fn restore_page(&mut self, page: u32) {
        self.query.page = page.clamp(1, self.total_pages);
    }

    /// Records the bound from a successful fetch. A page that fell outside
    /// the new bound resets to 1 and needs a refetch.
    pub fn apply_total_pages(&mut self, total_pages: u32) -> QueryChange {
        self.total_pages = total_pages.max(1);
        if self.query.page > self.total_pages {
            self.query.page = 1;
            return QueryChange::Structural;
        }
        QueryChange::Unchanged
    }
}

impl Default for ListQueryController {
    fn default() -> Self {
        Self::new(Query::default())
    }
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;

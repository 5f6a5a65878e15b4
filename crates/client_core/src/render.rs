//! View-side state for a list screen: the last good page, the rows that
//! survive client-side filters, selection, and the loading/error flags.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use shared::protocol::UserRecord;

use crate::error::FetchError;

pub trait ListRow: Clone + Send + Sync + 'static {
    fn row_id(&self) -> &str;
}

impl ListRow for UserRecord {
    fn row_id(&self) -> &str {
        self.id.as_str()
    }
}

/// One server-returned batch. Never merged with a previous page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
    pub current_page: u32,
}

/// Presentation-layer predicate applied to every page; rows it rejects are
/// never rendered or selectable.
pub struct RowFilter<T> {
    name: &'static str,
    keep: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> RowFilter<T> {
    pub fn new(name: &'static str, keep: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name,
            keep: Arc::new(keep),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn keeps(&self, row: &T) -> bool {
        (self.keep)(row)
    }
}

impl<T> Clone for RowFilter<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            keep: Arc::clone(&self.keep),
        }
    }
}

impl<T> fmt::Debug for RowFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RowFilter").field(&self.name).finish()
    }
}

pub fn exclude_admins() -> RowFilter<UserRecord> {
    RowFilter::new("exclude_admins", |record: &UserRecord| !record.role.is_admin())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationView {
    pub current: u32,
    pub total: u32,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PaginationView {
    fn new(current: u32, total: u32) -> Self {
        Self {
            current,
            total,
            has_previous: current > 1,
            has_next: current < total,
        }
    }

    pub fn label(&self) -> String {
        format!("Page {} of {}", self.current, self.total)
    }
}

#[derive(Debug, Clone)]
pub struct RenderModel<T: ListRow> {
    page: Option<Page<T>>,
    rows: Vec<T>,
    selected: Option<String>,
    loading: bool,
    error: Option<FetchError>,
    filters: Vec<RowFilter<T>>,
}

impl<T: ListRow> RenderModel<T> {
    pub fn new(filters: Vec<RowFilter<T>>) -> Self {
        Self {
            page: None,
            rows: Vec::new(),
            selected: None,
            loading: false,
            error: None,
            filters,
        }
    }

    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    /// Replaces the page wholesale. Returns `true` when the selected row was
    /// dropped because it is no longer visible.
    pub fn apply_page(&mut self, page: Page<T>) -> bool {
        self.rows = page
            .items
            .iter()
            .filter(|row| self.filters.iter().all(|filter| filter.keeps(row)))
            .cloned()
            .collect();
        self.page = Some(page);
        self.loading = false;
        self.error = None;

        let dangling = self
            .selected
            .as_deref()
            .is_some_and(|id| !self.rows.iter().any(|row| row.row_id() == id));
        if dangling {
            self.selected = None;
        }
        dangling
    }

    /// Keeps the last good page and surfaces the failure.
    pub fn apply_failure(&mut self, error: FetchError) {
        self.loading = false;
        self.error = Some(error);
    }

    /// Selection only ever points at a rendered row; anything else is ignored.
    pub fn select(&mut self, id: &str) -> bool {
        if self.rows.iter().any(|row| row.row_id() == id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn page(&self) -> Option<&Page<T>> {
        self.page.as_ref()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_row(&self) -> Option<&T> {
        let id = self.selected.as_deref()?;
        self.rows.iter().find(|row| row.row_id() == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// A successful fetch with nothing to show. Not an error.
    pub fn is_empty(&self) -> bool {
        self.page.is_some() && self.rows.is_empty()
    }

    pub fn pagination(&self) -> PaginationView {
        match &self.page {
            Some(page) => PaginationView::new(page.current_page, page.total_pages),
            None => PaginationView::new(1, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Active,
    Inactive,
    Unknown,
}

impl ActivityStatus {
    pub fn label(self) -> &'static str {
        match self {
            ActivityStatus::Active => "active",
            ActivityStatus::Inactive => "inactive",
            ActivityStatus::Unknown => "unknown",
        }
    }
}

/// Derives active/inactive from `last_activity` at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityPolicy {
    inactive_after: Duration,
}

impl ActivityPolicy {
    pub fn new(inactive_after: Duration) -> Self {
        Self { inactive_after }
    }

    pub fn from_days(days: u32) -> Self {
        Self::new(Duration::days(i64::from(days)))
    }

    pub fn status_of(
        &self,
        last_activity: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ActivityStatus {
        match last_activity {
            None => ActivityStatus::Unknown,
            Some(at) if now.signed_duration_since(at) > self.inactive_after => {
                ActivityStatus::Inactive
            }
            Some(_) => ActivityStatus::Active,
        }
    }

    pub fn status(&self, record: &UserRecord, now: DateTime<Utc>) -> ActivityStatus {
        self.status_of(record.last_activity, now)
    }
}

impl Default for ActivityPolicy {
    fn default() -> Self {
        Self::from_days(30)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScreen {
    /// Customer list: administrators hidden, activity column shown.
    Customers,
    /// User management: every role.
    Users,
}

impl ListScreen {
    pub fn title(self) -> &'static str {
        match self {
            ListScreen::Customers => "Customers",
            ListScreen::Users => "User management",
        }
    }

    pub fn filters(self) -> Vec<RowFilter<UserRecord>> {
        match self {
            ListScreen::Customers => vec![exclude_admins()],
            ListScreen::Users => Vec::new(),
        }
    }

    pub fn shows_activity(self) -> bool {
        matches!(self, ListScreen::Customers)
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;

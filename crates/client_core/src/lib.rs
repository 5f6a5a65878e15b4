use std::sync::Arc;

use anyhow::Result;
use shared::protocol::UserRecord;

pub mod config;
pub mod error;
pub mod fetcher;
pub mod forms;
pub mod query;
pub mod render;
pub mod session;

pub use config::{load_settings, ClientSettings};
pub use error::{ErrorCategory, FetchError, FormError, SessionClosed};
pub use fetcher::{DataFetcher, HttpListSource, ListEndpoint, ListSource};
pub use forms::{AddUserForm, Redirect, UserAdminClient};
pub use query::{ListQueryController, Query, QueryChange};
pub use render::{
    ActivityPolicy, ActivityStatus, ListRow, ListScreen, Page, PaginationView, RenderModel,
    RowFilter,
};
pub use session::{ListIntent, ListSession, ListSnapshot, SessionOptions};

/// Starts a user list session against the configured backend with the
/// filters of `screen`. Must be called inside a tokio runtime.
pub fn start_user_list(
    settings: &ClientSettings,
    screen: ListScreen,
) -> Result<ListSession<UserRecord>> {
    let source = HttpListSource::from_settings(settings)?;
    Ok(ListSession::start(
        Arc::new(source),
        settings.initial_query(),
        screen.filters(),
        SessionOptions {
            search_debounce: settings.search_debounce(),
        },
    ))
}

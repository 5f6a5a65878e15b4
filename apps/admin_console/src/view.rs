//! Plain-text rendering of a list snapshot.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use client_core::{ActivityPolicy, ListScreen, ListSnapshot};
use shared::protocol::UserRecord;

pub fn render_snapshot(
    screen: ListScreen,
    snapshot: &ListSnapshot<UserRecord>,
    policy: &ActivityPolicy,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let model = &snapshot.model;
    let query = &snapshot.query;

    let _ = writeln!(
        out,
        "== {} == search: '{}'  sort: {} {}",
        screen.title(),
        query.search_term,
        query.sort_key,
        query.sort_direction
    );
    if let Some(err) = model.error() {
        let _ = writeln!(out, "!! {}", err.user_message());
    }
    if model.is_loading() {
        let _ = writeln!(out, "(loading...)");
    }

    if model.is_empty() {
        let _ = writeln!(out, "No users found.");
    }
    for row in model.rows() {
        let marker = if model.selected_id() == Some(row.id.as_str()) {
            '>'
        } else {
            ' '
        };
        let _ = write!(
            out,
            "{marker} {:<26} {:<20} {:<30} {:<8}",
            row.id, row.username, row.email, row.role.as_str()
        );
        if screen.shows_activity() {
            let _ = write!(out, " {}", policy.status(row, now).label());
        }
        out.push('\n');
    }

    let pagination = snapshot.pagination();
    let _ = writeln!(
        out,
        "{}  [prev: {}] [next: {}]",
        pagination.label(),
        if pagination.has_previous { "on" } else { "off" },
        if pagination.has_next { "on" } else { "off" }
    );

    if let Some(row) = model.selected_row() {
        let _ = writeln!(out, "-- detail --");
        let _ = writeln!(out, "username: {}", row.username);
        let _ = writeln!(out, "email:    {}", row.email);
        let _ = writeln!(out, "phone:    {}", row.phone_number);
        let _ = writeln!(out, "role:     {}", row.role.as_str());
        match row.last_activity {
            Some(at) => {
                let _ = writeln!(
                    out,
                    "active:   {} ({})",
                    at.to_rfc3339(),
                    policy.status(row, now).label()
                );
            }
            None => {
                let _ = writeln!(out, "active:   never");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use client_core::{FetchError, ListQueryController, Page, RenderModel};
    use shared::domain::{Role, UserId};

    fn record(id: &str, days_idle: Option<i64>, now: DateTime<Utc>) -> UserRecord {
        UserRecord {
            id: UserId::new(id),
            username: format!("name-{id}"),
            email: format!("{id}@example.com"),
            phone_number: String::new(),
            role: Role::User,
            last_activity: days_idle.map(|days| now - Duration::days(days)),
        }
    }

    fn snapshot(model: RenderModel<UserRecord>) -> ListSnapshot<UserRecord> {
        let controller = ListQueryController::default();
        ListSnapshot {
            query: controller.query().clone(),
            total_pages: 3,
            model,
        }
    }

    #[test]
    fn renders_rows_status_and_pagination() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap();
        let mut model = RenderModel::new(ListScreen::Customers.filters());
        model.apply_page(Page {
            items: vec![record("a", Some(1), now), record("b", Some(90), now)],
            total_pages: 3,
            current_page: 1,
        });
        model.select("b");

        let text = render_snapshot(
            ListScreen::Customers,
            &snapshot(model),
            &ActivityPolicy::default(),
            now,
        );
        assert!(text.contains("Page 1 of 3  [prev: off] [next: on]"), "{text}");
        assert!(text.contains("name-a"));
        assert!(text.contains(" active\n"));
        assert!(text.contains(" inactive\n"));
        assert!(text.contains("-- detail --\nusername: name-b"));
    }

    #[test]
    fn renders_error_banner_and_empty_state() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap();
        let mut model = RenderModel::new(Vec::new());
        model.apply_page(Page {
            items: Vec::new(),
            total_pages: 1,
            current_page: 1,
        });
        let policy = ActivityPolicy::default();
        let text = render_snapshot(ListScreen::Users, &snapshot(model.clone()), &policy, now);
        assert!(text.contains("No users found."));
        assert!(!text.contains("!!"));

        model.apply_failure(FetchError::Transport("refused".into()));
        let text = render_snapshot(ListScreen::Users, &snapshot(model), &policy, now);
        assert!(text.contains("!! Server unreachable"));
    }
}

use chrono::NaiveDate;

use crate::backend::Backend;
use crate::error::BackendError;
use crate::models::{JobApplication, Status, User, status_label};

/// Only this many of the newest applications are shown as cards.
pub const RECENT_LIMIT: usize = 10;

/// Counts shown on the four stat cards, in card order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub interview: usize,
    pub applied: usize,
    pub rejected: usize,
}

impl Stats {
    pub fn cards(&self) -> [(&'static str, usize); 4] {
        [
            ("Total Applications", self.total),
            ("Interviews", self.interview),
            ("Applied", self.applied),
            ("Rejected", self.rejected),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: String,
    pub initial: char,
    pub role: String,
    pub company: String,
    pub applied_on: String,
    pub status_label: &'static str,
    pub status_class: String,
}

impl Card {
    fn from_application(app: &JobApplication) -> Self {
        let initial = app
            .company
            .chars()
            .next()
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('?');
        let status = if app.status.is_empty() {
            Status::Applied.as_str()
        } else {
            app.status.as_str()
        };

        Self {
            id: app.id.clone(),
            initial,
            role: or_placeholder(&app.role, "Unknown Role"),
            company: or_placeholder(&app.company, "Unknown Company"),
            applied_on: app
                .applied_date
                .map(format_date)
                .unwrap_or_else(|| "Date not set".to_string()),
            status_label: status_label(&app.status),
            status_class: format!("status-{status}"),
        }
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

/// "January 1, 2024"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Placeholder,
    Cards(Vec<Card>),
}

/// Everything a renderer needs, computed once from the dashboard state.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub greeting: String,
    pub stats: Stats,
    pub listing: Listing,
}

/// The signed-in user's applications, newest first.
#[derive(Debug, Clone)]
pub struct Dashboard {
    user: User,
    applications: Vec<JobApplication>,
}

impl Dashboard {
    pub fn new(user: User, mut applications: Vec<JobApplication>) -> Self {
        // Stable, so equal timestamps keep the order the backend sent.
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { user, applications }
    }

    /// Fetch everything the user owns. A failed fetch shows as an empty dashboard.
    pub fn load(backend: &dyn Backend, user: &User) -> Self {
        let applications = match backend.list_applications(&user.id) {
            Ok(applications) => applications,
            Err(e) => {
                tracing::error!(error = %e, "error loading job applications");
                Vec::new()
            }
        };
        tracing::debug!(count = applications.len(), "loaded applications");
        Self::new(user.clone(), applications)
    }

    #[cfg(test)]
    pub fn applications(&self) -> &[JobApplication] {
        &self.applications
    }

    pub fn get(&self, id: &str) -> Option<&JobApplication> {
        self.applications.iter().find(|app| app.id == id)
    }

    pub fn stats(&self) -> Stats {
        let count = |status: Status| {
            self.applications
                .iter()
                .filter(|app| app.has_status(status))
                .count()
        };
        Stats {
            total: self.applications.len(),
            interview: count(Status::Interview),
            applied: count(Status::Applied),
            rejected: count(Status::Rejected),
        }
    }

    pub fn recent(&self) -> &[JobApplication] {
        let end = self.applications.len().min(RECENT_LIMIT);
        &self.applications[..end]
    }

    pub fn greeting(&self) -> String {
        format!("Welcome back, {}!", self.user.display_name())
    }

    pub fn view(&self) -> DashboardView {
        let listing = if self.applications.is_empty() {
            Listing::Placeholder
        } else {
            Listing::Cards(self.recent().iter().map(Card::from_application).collect())
        };
        DashboardView {
            greeting: self.greeting(),
            stats: self.stats(),
            listing,
        }
    }

    /// Delete one application server-side, then drop it locally without re-fetching.
    /// On failure nothing local changes. The caller is responsible for confirming first.
    pub fn delete(&mut self, backend: &dyn Backend, id: &str) -> Result<(), BackendError> {
        backend.delete_application(id, &self.user.id)?;
        self.applications.retain(|app| app.id != id);
        tracing::info!(%id, "application deleted");
        Ok(())
    }
}

/// Plain-text rendering used by `jobdash list`.
pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();
    out.push_str(&view.greeting);
    out.push_str("\n\n");

    let stats = view.stats.cards();
    for (label, _) in &stats {
        out.push_str(&format!("{label:<20}"));
    }
    out.push('\n');
    for (_, value) in &stats {
        out.push_str(&format!("{value:<20}"));
    }
    out.push_str("\n\n");

    match &view.listing {
        Listing::Placeholder => {
            out.push_str("No applications yet\n");
            out.push_str("Run `jobdash add` to track your first application!\n");
        }
        Listing::Cards(cards) => {
            out.push_str(&format!(
                "{:<3} {:<28} {:<22} {:<20} {:<20} {}\n",
                "", "ROLE", "COMPANY", "APPLIED", "STATUS", "ID"
            ));
            out.push_str(&"-".repeat(132));
            out.push('\n');
            for card in cards {
                out.push_str(&format!(
                    "{:<3} {:<28} {:<22} {:<20} {:<20} {}\n",
                    card.initial,
                    truncate(&card.role, 26),
                    truncate(&card.company, 20),
                    card.applied_on,
                    card.status_label,
                    card.id
                ));
            }
        }
    }
    out
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creator::{ApplicationForm, submit};
    use crate::testing::{MemoryBackend, application, session_for};

    fn user() -> User {
        session_for("user-1").user
    }

    fn sample() -> Vec<JobApplication> {
        vec![
            application("a", "Acme", "applied", 1),
            application("b", "Globex", "interview", 2),
            application("c", "Initech", "rejected", 3),
            application("d", "Umbrella", "applied", 4),
            application("e", "Hooli", "offer", 5),
        ]
    }

    #[test]
    fn test_stats() {
        let dashboard = Dashboard::new(user(), sample());
        assert_eq!(
            dashboard.stats(),
            Stats {
                total: 5,
                interview: 1,
                applied: 2,
                rejected: 1
            }
        );
    }

    #[test]
    fn test_empty_collection_renders_placeholder() {
        let dashboard = Dashboard::new(user(), Vec::new());
        let view = dashboard.view();
        assert_eq!(view.listing, Listing::Placeholder);
        assert_eq!(view.stats, Stats::default());
        assert!(render_text(&view).contains("No applications yet"));
    }

    #[test]
    fn test_at_most_ten_cards_newest_first() {
        let apps: Vec<JobApplication> = (0..15)
            .map(|i| application(&format!("id-{i}"), "Acme", "applied", i))
            .collect();
        let dashboard = Dashboard::new(user(), apps);
        let Listing::Cards(cards) = dashboard.view().listing else {
            panic!("expected cards");
        };
        assert_eq!(cards.len(), RECENT_LIMIT);
        let ids: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids[0], "id-14");
        assert_eq!(ids[9], "id-5");
        assert_eq!(dashboard.stats().total, 15);
    }

    #[test]
    fn test_card_fields() {
        let mut app = application("x", "acme corp", "review", 0);
        app.role = "Platform Engineer".into();
        let dashboard = Dashboard::new(user(), vec![app]);
        let Listing::Cards(cards) = dashboard.view().listing else {
            panic!("expected cards");
        };
        let card = &cards[0];
        assert_eq!(card.initial, 'A');
        assert_eq!(card.role, "Platform Engineer");
        assert_eq!(card.applied_on, "January 1, 2024");
        assert_eq!(card.status_label, "In Review");
        assert_eq!(card.status_class, "status-review");
    }

    #[test]
    fn test_rows_with_null_columns_render_fallbacks() {
        let json = r#"[{
            "id": "n", "user_id": "user-1", "company": null, "role": null,
            "platform": null, "applied_date": null, "status": null,
            "priority": null, "notes": null, "created_at": "2024-01-02T10:30:00Z"
        }]"#;
        let apps: Vec<JobApplication> = serde_json::from_str(json).unwrap();
        let dashboard = Dashboard::new(user(), apps);
        assert_eq!(dashboard.stats().total, 1);
        let Listing::Cards(cards) = dashboard.view().listing else {
            panic!("expected cards");
        };
        let card = &cards[0];
        assert_eq!(card.initial, '?');
        assert_eq!(card.company, "Unknown Company");
        assert_eq!(card.role, "Unknown Role");
        assert_eq!(card.status_label, "Applied");
        assert_eq!(card.status_class, "status-applied");
    }

    #[test]
    fn test_card_fallbacks() {
        let mut app = application("x", "", "ghosted", 0);
        app.role = String::new();
        app.applied_date = None;
        let card = Card::from_application(&app);
        assert_eq!(card.initial, '?');
        assert_eq!(card.role, "Unknown Role");
        assert_eq!(card.company, "Unknown Company");
        assert_eq!(card.applied_on, "Date not set");
        assert_eq!(card.status_label, "Applied");

        app.status = String::new();
        assert_eq!(Card::from_application(&app).status_class, "status-applied");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 9).unwrap();
        assert_eq!(format_date(date), "November 9, 2023");
    }

    #[test]
    fn test_load_orders_and_scopes_to_user() {
        let mut other = application("z", "Other", "applied", 99);
        other.user_id = "user-2".into();
        let mut rows = sample();
        rows.push(other);
        let backend = MemoryBackend::new().with_rows(rows);

        let dashboard = Dashboard::load(&backend, &user());
        assert_eq!(dashboard.applications().len(), 5);
        assert_eq!(dashboard.applications()[0].id, "e");
        assert!(dashboard.get("z").is_none());
    }

    #[test]
    fn test_load_failure_shows_empty_dashboard() {
        let backend = MemoryBackend::new()
            .with_rows(sample())
            .failing("JWT expired");
        let dashboard = Dashboard::load(&backend, &user());
        assert!(dashboard.applications().is_empty());
        assert_eq!(dashboard.view().listing, Listing::Placeholder);
    }

    #[test]
    fn test_delete_decrements_only_matching_counter() {
        let backend = MemoryBackend::new().with_rows(sample());
        let mut dashboard = Dashboard::load(&backend, &user());
        let before = dashboard.stats();

        dashboard.delete(&backend, "b").unwrap();

        let after = dashboard.stats();
        assert_eq!(after.total, before.total - 1);
        assert_eq!(after.interview, before.interview - 1);
        assert_eq!(after.applied, before.applied);
        assert_eq!(after.rejected, before.rejected);
        assert!(dashboard.get("b").is_none());
        assert_eq!(backend.rows.borrow().len(), 4);

        let Listing::Cards(cards) = dashboard.view().listing else {
            panic!("expected cards");
        };
        assert!(cards.iter().all(|c| c.id != "b"));
    }

    #[test]
    fn test_ids_from_other_clients_can_be_found_and_deleted() {
        let id = "3F2B8C1E-9A4D-4C7E-8B1A-0D2E4F6A8B0C";
        let backend = MemoryBackend::new().with_rows(vec![application(id, "Acme", "applied", 0)]);
        let mut dashboard = Dashboard::load(&backend, &user());
        assert!(!crate::models::is_application_id(id));
        assert_eq!(dashboard.get(id).map(|app| app.company.as_str()), Some("Acme"));

        dashboard.delete(&backend, id).unwrap();
        assert!(dashboard.get(id).is_none());
        assert!(backend.rows.borrow().is_empty());
    }

    #[test]
    fn test_delete_does_not_refetch() {
        let backend = MemoryBackend::new().with_rows(sample());
        let mut dashboard = Dashboard::load(&backend, &user());
        let calls = backend.calls.get();
        dashboard.delete(&backend, "a").unwrap();
        assert_eq!(backend.calls.get(), calls + 1);
    }

    #[test]
    fn test_delete_failure_leaves_state() {
        let backend = MemoryBackend::new().with_rows(sample());
        let mut dashboard = Dashboard::load(&backend, &user());
        *backend.fail_with.borrow_mut() = Some("permission denied".into());

        let err = dashboard.delete(&backend, "c").unwrap_err();
        assert_eq!(err.to_string(), "permission denied");
        assert_eq!(dashboard.stats().rejected, 1);
        assert!(dashboard.get("c").is_some());
    }

    #[test]
    fn test_delete_last_record_shows_placeholder() {
        let backend = MemoryBackend::new().with_rows(vec![application("a", "Acme", "applied", 0)]);
        let mut dashboard = Dashboard::load(&backend, &user());
        dashboard.delete(&backend, "a").unwrap();
        assert_eq!(dashboard.view().listing, Listing::Placeholder);
    }

    #[test]
    fn test_added_interview_increments_interview_card() {
        let backend = MemoryBackend::new().with_rows(sample());
        let session = session_for("user-1");
        let before = Dashboard::load(&backend, &session.user).stats();

        let form = ApplicationForm {
            company: "Acme".into(),
            role: "Engineer".into(),
            status: "interview".into(),
            applied_date: "2024-01-01".into(),
            ..ApplicationForm::default()
        };
        submit(&backend, &session, form).unwrap();

        let after = Dashboard::load(&backend, &session.user).stats();
        assert_eq!(after.cards()[1].1, before.cards()[1].1 + 1);
        assert_eq!(after.total, before.total + 1);
        assert_eq!(after.applied, before.applied);
    }

    #[test]
    fn test_render_text_lists_cards() {
        let dashboard = Dashboard::new(user(), sample());
        let text = render_text(&dashboard.view());
        assert!(text.starts_with("Welcome back, jane!"));
        assert!(text.contains("Interview Scheduled"));
        assert!(text.contains("Globex"));
        assert!(text.contains("January 1, 2024"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
    }
}

use std::fmt;

use crate::backend::Backend;
use crate::models::Session;

/// The screens of the tracker. Each maps onto one or more subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Index,
    Login,
    Signup,
    Dashboard,
    AddJob,
}

impl Page {
    const PROTECTED: [Page; 2] = [Page::Dashboard, Page::AddJob];
    const AUTH_ONLY: [Page; 2] = [Page::Login, Page::Signup];

    pub fn is_protected(self) -> bool {
        Self::PROTECTED.contains(&self)
    }

    pub fn is_auth_only(self) -> bool {
        Self::AUTH_ONLY.contains(&self)
    }

    pub fn command(self) -> &'static str {
        match self {
            Page::Index => "jobdash",
            Page::Login => "jobdash login",
            Page::Signup => "jobdash signup",
            Page::Dashboard => "jobdash list",
            Page::AddJob => "jobdash add",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Page::Index => "index",
            Page::Login => "login",
            Page::Signup => "signup",
            Page::Dashboard => "dashboard",
            Page::AddJob => "add-job",
        };
        f.write_str(name)
    }
}

/// Outcome of the per-command session check.
#[derive(Debug, Clone, PartialEq)]
pub struct Guard {
    pub session: Option<Session>,
    pub redirect: Option<Page>,
}

/// Look up the current session and decide whether `page` may be shown.
///
/// A failed lookup is logged and treated as signed out; it is never retried.
pub fn check_auth(backend: &dyn Backend, page: Page) -> Guard {
    let session = match backend.get_session() {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "auth check failed");
            None
        }
    };

    let redirect = match &session {
        None if page.is_protected() => Some(Page::Login),
        Some(_) if page.is_auth_only() => Some(Page::Dashboard),
        _ => None,
    };
    if let Some(to) = redirect {
        tracing::debug!(from = %page, %to, "redirecting");
    }

    Guard { session, redirect }
}

//! In-memory `Backend` used by the component tests.

use std::cell::{Cell, RefCell};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::backend::{Backend, SignUpRequest};
use crate::error::BackendError;
use crate::models::{JobApplication, Priority, Session, User, UserMetadata};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    pub rows: RefCell<Vec<JobApplication>>,
    pub session: RefCell<Option<Session>>,
    pub fail_with: RefCell<Option<String>>,
    pub session_error: Cell<bool>,
    pub calls: Cell<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in() -> Self {
        let backend = Self::new();
        *backend.session.borrow_mut() = Some(session_for("user-1"));
        backend
    }

    pub fn with_rows(self, rows: Vec<JobApplication>) -> Self {
        *self.rows.borrow_mut() = rows;
        self
    }

    pub fn failing(self, message: &str) -> Self {
        *self.fail_with.borrow_mut() = Some(message.to_string());
        self
    }

    fn check(&self) -> Result<(), BackendError> {
        self.calls.set(self.calls.get() + 1);
        match self.fail_with.borrow().as_ref() {
            Some(message) => Err(BackendError::Api {
                status: 400,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Backend for MemoryBackend {
    fn insert_application(&self, app: &JobApplication) -> Result<JobApplication, BackendError> {
        self.check()?;
        self.rows.borrow_mut().push(app.clone());
        Ok(app.clone())
    }

    fn list_applications(&self, owner_id: &str) -> Result<Vec<JobApplication>, BackendError> {
        self.check()?;
        let mut rows: Vec<JobApplication> = self
            .rows
            .borrow()
            .iter()
            .filter(|row| row.user_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    fn delete_application(&self, id: &str, owner_id: &str) -> Result<(), BackendError> {
        self.check()?;
        self.rows
            .borrow_mut()
            .retain(|row| !(row.id == id && row.user_id == owner_id));
        Ok(())
    }

    fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, BackendError> {
        self.check()?;
        let mut session = session_for("new-user");
        session.user.email = Some(request.email.clone());
        session.user.user_metadata = request.data.clone();
        *self.session.borrow_mut() = Some(session.clone());
        Ok(Some(session))
    }

    fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session, BackendError> {
        self.check()?;
        let mut session = session_for("user-1");
        session.user.email = Some(email.to_string());
        *self.session.borrow_mut() = Some(session.clone());
        Ok(session)
    }

    fn sign_in_with_oauth(
        &self,
        provider: &str,
        _redirect_to: Option<&str>,
    ) -> Result<String, BackendError> {
        self.check()?;
        Ok(format!("https://auth.example/authorize?provider={provider}"))
    }

    fn session_from_redirect(&self, redirect_url: &str) -> Result<Session, BackendError> {
        self.check()?;
        crate::backend::parse_redirect_tokens(redirect_url)?;
        let session = session_for("oauth-user");
        *self.session.borrow_mut() = Some(session.clone());
        Ok(session)
    }

    fn sign_out(&self) -> Result<(), BackendError> {
        self.check()?;
        *self.session.borrow_mut() = None;
        Ok(())
    }

    fn get_session(&self) -> Result<Option<Session>, BackendError> {
        if self.session_error.get() {
            return Err(BackendError::InvalidResponse("session lookup failed".into()));
        }
        Ok(self.session.borrow().clone())
    }
}

pub fn session_for(user_id: &str) -> Session {
    Session {
        access_token: "access".into(),
        refresh_token: "refresh".into(),
        token_type: "bearer".into(),
        expires_at: None,
        user: User {
            id: user_id.into(),
            email: Some("jane@example.com".into()),
            user_metadata: UserMetadata::default(),
        },
    }
}

/// A stored application created `minutes` after a fixed epoch.
pub fn application(id: &str, company: &str, status: &str, minutes: i64) -> JobApplication {
    JobApplication {
        id: id.into(),
        user_id: "user-1".into(),
        company: company.into(),
        role: "Engineer".into(),
        platform: None,
        applied_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        status: status.into(),
        priority: Priority::Medium,
        notes: None,
        created_at: at_minute(minutes),
    }
}

pub fn at_minute(minutes: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200 + minutes * 60, 0)
        .single()
        .unwrap_or_default()
}

use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::models::{JobApplication, Priority, Session, Status};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Raw field values as the user typed them.
#[derive(Debug, Clone, Default)]
pub struct ApplicationForm {
    pub company: String,
    pub role: String,
    pub platform: Option<String>,
    pub applied_date: String,
    pub status: String,
    pub priority: Option<String>,
    pub notes: Option<String>,
}

impl ApplicationForm {
    /// Validate the form and turn it into a record owned by `owner_id`.
    pub fn into_application(
        self,
        owner_id: &str,
        id: String,
        now: DateTime<Utc>,
    ) -> Result<JobApplication> {
        let company = self.company.trim().to_string();
        let role = self.role.trim().to_string();
        let status = self.status.trim();
        let applied_date = self.applied_date.trim();

        if company.is_empty() || role.is_empty() || status.is_empty() || applied_date.is_empty() {
            return Err(Error::MissingRequiredFields);
        }

        let status: Status = status.parse()?;
        let applied_date = NaiveDate::parse_from_str(applied_date, "%Y-%m-%d")
            .map_err(|_| Error::InvalidDate(applied_date.to_string()))?;
        let priority = match non_empty(self.priority) {
            Some(p) => p.parse()?,
            None => Priority::default(),
        };

        Ok(JobApplication {
            id,
            user_id: owner_id.to_string(),
            company,
            role,
            platform: non_empty(self.platform),
            applied_date: Some(applied_date),
            status: status.as_str().to_string(),
            priority,
            notes: non_empty(self.notes),
            created_at: now,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A random identifier in the textual layout of a v4 UUID:
/// `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx`, `y` one of 8, 9, a, b.
pub fn generate_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx"
        .chars()
        .map(|c| match c {
            'x' => HEX[rng.gen_range(0..16usize)] as char,
            'y' => HEX[rng.gen_range(8..12usize)] as char,
            other => other,
        })
        .collect()
}

/// Identifier from a fast, non-cryptographic generator.
pub fn new_id() -> String {
    generate_id(&mut SmallRng::from_entropy())
}

/// Validate and insert exactly one application. Nothing is retried.
pub fn submit(
    backend: &dyn Backend,
    session: &Session,
    form: ApplicationForm,
) -> Result<JobApplication> {
    let application = form.into_application(&session.user.id, new_id(), Utc::now())?;
    tracing::debug!(id = %application.id, company = %application.company, "inserting application");
    let inserted = backend.insert_application(&application)?;
    tracing::info!(id = %inserted.id, "application added");
    Ok(inserted)
}

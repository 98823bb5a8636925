use crate::backend::{Backend, SignUpRequest};
use crate::config::AuthConfig;
use crate::error::{BackendError, Error, Result};
use crate::models::{Session, UserMetadata};

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    fn into_request(self) -> Result<SignUpRequest> {
        let email = self.email.trim().to_string();
        if email.is_empty() || self.password.is_empty() || self.confirm_password.is_empty() {
            return Err(Error::MissingRequiredFields);
        }
        if self.password != self.confirm_password {
            return Err(Error::PasswordMismatch);
        }

        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        let full_name = full_name(&first_name, &last_name, &email);

        Ok(SignUpRequest {
            email,
            password: self.password,
            data: UserMetadata {
                full_name: Some(full_name),
                first_name: Some(first_name),
                last_name: Some(last_name),
            },
        })
    }
}

fn full_name(first: &str, last: &str, email: &str) -> String {
    match (first.is_empty(), last.is_empty()) {
        (false, false) => format!("{first} {last}"),
        (false, true) => first.to_string(),
        _ => email.split('@').next().unwrap_or_default().to_string(),
    }
}

/// Create an account. `Ok(None)` means the backend wants the email confirmed first.
pub fn sign_up(backend: &dyn Backend, form: SignUpForm) -> Result<Option<Session>> {
    let request = form.into_request()?;
    match backend.sign_up(&request) {
        Ok(session) => Ok(session),
        Err(e) if e.to_string().to_lowercase().contains("already") => Err(Error::AccountExists),
        Err(e) => Err(e.into()),
    }
}

pub fn sign_in(backend: &dyn Backend, email: &str, password: &str) -> Result<Session> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(Error::MissingCredentials);
    }
    Ok(backend.sign_in_with_password(email, password)?)
}

pub fn oauth_url(backend: &dyn Backend, config: &AuthConfig) -> Result<String> {
    Ok(backend.sign_in_with_oauth(&config.oauth_provider, config.redirect_to.as_deref())?)
}

pub fn complete_oauth(backend: &dyn Backend, redirect_url: &str) -> Result<Session> {
    let redirect_url = redirect_url.trim();
    if redirect_url.is_empty() {
        return Err(Error::InvalidRedirect("nothing was pasted".to_string()));
    }
    backend.session_from_redirect(redirect_url).map_err(|e| match e {
        BackendError::InvalidResponse(message) => Error::InvalidRedirect(message),
        other => other.into(),
    })
}

pub fn sign_out(backend: &dyn Backend) -> Result<()> {
    Ok(backend.sign_out()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBackend;

    fn form() -> SignUpForm {
        SignUpForm {
            first_name: " Jane ".into(),
            last_name: "Doe".into(),
            email: " jane@example.com ".into(),
            password: "hunter22".into(),
            confirm_password: "hunter22".into(),
        }
    }

    #[test]
    fn test_sign_up_sends_names_as_metadata() {
        let backend = MemoryBackend::new();
        let session = sign_up(&backend, form()).unwrap().unwrap();
        assert_eq!(session.user.email.as_deref(), Some("jane@example.com"));
        assert_eq!(session.user.user_metadata.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(session.user.user_metadata.first_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_full_name_fallbacks() {
        assert_eq!(full_name("Jane", "", "j@example.com"), "Jane");
        assert_eq!(full_name("", "Doe", "jd@example.com"), "jd");
        assert_eq!(full_name("", "", "jd@example.com"), "jd");
    }

    #[test]
    fn test_sign_up_requires_fields() {
        let backend = MemoryBackend::new();
        for blank in 0..3 {
            let mut f = form();
            match blank {
                0 => f.email = "  ".into(),
                1 => f.password = String::new(),
                _ => f.confirm_password = String::new(),
            }
            assert!(matches!(sign_up(&backend, f), Err(Error::MissingRequiredFields)));
        }
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn test_sign_up_password_mismatch() {
        let backend = MemoryBackend::new();
        let mut f = form();
        f.confirm_password = "hunter23".into();
        assert!(matches!(sign_up(&backend, f), Err(Error::PasswordMismatch)));
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn test_sign_up_existing_account_message() {
        let backend = MemoryBackend::new().failing("User already registered");
        let err = sign_up(&backend, form()).unwrap_err();
        assert_eq!(err.to_string(), "An account with this email already exists");
    }

    #[test]
    fn test_sign_up_other_errors_are_verbatim() {
        let backend = MemoryBackend::new().failing("Password should be at least 6 characters");
        let err = sign_up(&backend, form()).unwrap_err();
        assert_eq!(err.to_string(), "Password should be at least 6 characters");
    }

    #[test]
    fn test_sign_in_requires_fields() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            sign_in(&backend, "", "pw"),
            Err(Error::MissingCredentials)
        ));
        assert!(matches!(
            sign_in(&backend, "a@example.com", ""),
            Err(Error::MissingCredentials)
        ));
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn test_sign_in_surfaces_backend_message() {
        let backend = MemoryBackend::new().failing("Invalid login credentials");
        let err = sign_in(&backend, "a@example.com", "wrong").unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn test_sign_in_then_out() {
        let backend = MemoryBackend::new();
        let session = sign_in(&backend, " a@example.com ", "pw").unwrap();
        assert_eq!(session.user.email.as_deref(), Some("a@example.com"));
        assert!(backend.session.borrow().is_some());
        sign_out(&backend).unwrap();
        assert!(backend.session.borrow().is_none());
    }

    #[test]
    fn test_oauth_flow() {
        let backend = MemoryBackend::new();
        let url = oauth_url(&backend, &AuthConfig::default()).unwrap();
        assert!(url.contains("provider=google"));

        assert!(matches!(
            complete_oauth(&backend, "http://localhost/#access_token=a"),
            Err(Error::InvalidRedirect(_))
        ));
        assert!(matches!(complete_oauth(&backend, "  "), Err(Error::InvalidRedirect(_))));

        let session =
            complete_oauth(&backend, "http://localhost/#access_token=a&refresh_token=b").unwrap();
        assert_eq!(session.user.id, "oauth-user");
    }
}

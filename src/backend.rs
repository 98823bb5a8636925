use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::{BackendError, Error};
use crate::models::{JobApplication, Session, User, UserMetadata};
use crate::session::SessionStore;

// Refresh this many seconds before the access token actually expires.
const EXPIRY_LEEWAY_SECS: i64 = 10;

/// The hosted auth + data service. Every call is a single request with no retry.
pub trait Backend {
    fn insert_application(&self, app: &JobApplication) -> Result<JobApplication, BackendError>;
    /// All applications owned by `owner_id`, newest first.
    fn list_applications(&self, owner_id: &str) -> Result<Vec<JobApplication>, BackendError>;
    fn delete_application(&self, id: &str, owner_id: &str) -> Result<(), BackendError>;

    /// Returns `None` when the account needs email confirmation before it can sign in.
    fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, BackendError>;
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError>;
    /// URL the user must open to sign in with `provider`.
    fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: Option<&str>,
    ) -> Result<String, BackendError>;
    /// Finish an OAuth sign-in from the URL the provider redirected to.
    fn session_from_redirect(&self, redirect_url: &str) -> Result<Session, BackendError>;
    fn sign_out(&self) -> Result<(), BackendError>;
    fn get_session(&self) -> Result<Option<Session>, BackendError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub data: UserMetadata,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_at,
            user: self.user,
        }
    }
}

/// Tokens carried in the fragment of an OAuth redirect.
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<i64>,
    pub token_type: String,
}

/// Talks to a Supabase-compatible project: GoTrue under `/auth/v1`, PostgREST under `/rest/v1`.
#[derive(Debug)]
pub struct SupabaseBackend {
    base_url: String,
    anon_key: String,
    table: String,
    client: Client,
    store: SessionStore,
}

impl SupabaseBackend {
    pub fn new(config: &BackendConfig, store: SessionStore) -> Result<Self, Error> {
        config.require_endpoint()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(BackendError::from)?;
        Ok(Self {
            base_url: config.url.trim().trim_end_matches('/').to_string(),
            anon_key: config.anon_key.trim().to_string(),
            table: config.table.clone(),
            client,
            store,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn list_request(&self, token: &str, owner_id: &str) -> RequestBuilder {
        self.client
            .get(self.table_url())
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{owner_id}")),
                ("order", "created_at.desc".to_string()),
            ])
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    fn delete_request(&self, token: &str, id: &str, owner_id: &str) -> RequestBuilder {
        self.client
            .delete(self.table_url())
            .query(&[("id", format!("eq.{id}")), ("user_id", format!("eq.{owner_id}"))])
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    fn access_token(&self) -> Result<String, BackendError> {
        self.get_session()?
            .map(|session| session.access_token)
            .ok_or(BackendError::NotSignedIn)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send()?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        tracing::debug!(status = status.as_u16(), %message, "backend request failed");
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn token_grant<T: Serialize>(&self, grant_type: &str, body: &T) -> Result<Session, BackendError> {
        let response = self.send(
            self.client
                .post(self.auth_url("token"))
                .query(&[("grant_type", grant_type)])
                .header("apikey", &self.anon_key)
                .json(body),
        )?;
        let tokens: TokenResponse = response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        Ok(tokens.into_session())
    }

    fn fetch_user(&self, token: &str) -> Result<User, BackendError> {
        let response = self.send(
            self.client
                .get(self.auth_url("user"))
                .header("apikey", &self.anon_key)
                .bearer_auth(token),
        )?;
        response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn refresh(&self, session: &Session) -> Result<Session, BackendError> {
        tracing::debug!(user = %session.user.id, "refreshing expired session");
        let refreshed = self.token_grant(
            "refresh_token",
            &RefreshGrant {
                refresh_token: &session.refresh_token,
            },
        )?;
        self.store.save(&refreshed)?;
        Ok(refreshed)
    }
}

impl Backend for SupabaseBackend {
    fn insert_application(&self, app: &JobApplication) -> Result<JobApplication, BackendError> {
        let token = self.access_token()?;
        let response = self.send(
            self.client
                .post(self.table_url())
                .header("apikey", &self.anon_key)
                .header("Prefer", "return=representation")
                .bearer_auth(&token)
                .json(&[app]),
        )?;
        let mut rows: Vec<JobApplication> = response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        if rows.is_empty() {
            return Err(BackendError::InvalidResponse(
                "insert returned no rows".to_string(),
            ));
        }
        Ok(rows.swap_remove(0))
    }

    fn list_applications(&self, owner_id: &str) -> Result<Vec<JobApplication>, BackendError> {
        let token = self.access_token()?;
        let response = self.send(self.list_request(&token, owner_id))?;
        response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn delete_application(&self, id: &str, owner_id: &str) -> Result<(), BackendError> {
        let token = self.access_token()?;
        self.send(self.delete_request(&token, id, owner_id))?;
        Ok(())
    }

    fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, BackendError> {
        let response = self.send(
            self.client
                .post(self.auth_url("signup"))
                .header("apikey", &self.anon_key)
                .json(request),
        )?;
        let body: serde_json::Value = response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        // With email confirmation on, the service answers with the bare user.
        if body.get("access_token").is_none() {
            return Ok(None);
        }
        let tokens: TokenResponse = serde_json::from_value(body)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        let session = tokens.into_session();
        self.store.save(&session)?;
        Ok(Some(session))
    }

    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let session = self.token_grant("password", &PasswordGrant { email, password })?;
        self.store.save(&session)?;
        tracing::info!(user = %session.user.id, "signed in");
        Ok(session)
    }

    fn sign_in_with_oauth(
        &self,
        provider: &str,
        redirect_to: Option<&str>,
    ) -> Result<String, BackendError> {
        let mut url = format!(
            "{}?provider={}",
            self.auth_url("authorize"),
            urlencoding::encode(provider)
        );
        if let Some(redirect) = redirect_to {
            url.push_str("&redirect_to=");
            url.push_str(&urlencoding::encode(redirect));
        }
        Ok(url)
    }

    fn session_from_redirect(&self, redirect_url: &str) -> Result<Session, BackendError> {
        let tokens = parse_redirect_tokens(redirect_url)?;
        let user = self.fetch_user(&tokens.access_token)?;
        let session = Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_at: tokens.expires_at,
            user,
        };
        self.store.save(&session)?;
        Ok(session)
    }

    fn sign_out(&self) -> Result<(), BackendError> {
        let Some(session) = self.store.load()? else {
            return Ok(());
        };
        let result = self.send(
            self.client
                .post(self.auth_url("logout"))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token),
        );
        match result {
            Ok(_) => {}
            // The token is already dead server-side; just forget it locally.
            Err(BackendError::Api { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16()
                    || status == StatusCode::NOT_FOUND.as_u16() => {}
            Err(e) => return Err(e),
        }
        self.store.clear()?;
        tracing::info!(user = %session.user.id, "signed out");
        Ok(())
    }

    fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(session) = self.store.load()? else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now(), EXPIRY_LEEWAY_SECS) {
            return Ok(Some(session));
        }
        match self.refresh(&session) {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(e) => {
                self.store.clear()?;
                Err(e)
            }
        }
    }
}

/// Pull a human-readable message out of a GoTrue or PostgREST error body.
pub fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.to_string());
    };
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Read the session tokens out of an OAuth redirect URL (fragment, or query as a fallback).
pub fn parse_redirect_tokens(redirect_url: &str) -> Result<RedirectTokens, BackendError> {
    let params = redirect_url
        .split_once('#')
        .or_else(|| redirect_url.split_once('?'))
        .map(|(_, rest)| rest)
        .unwrap_or_default();

    let mut access_token = None;
    let mut refresh_token = None;
    let mut expires_at = None;
    let mut expires_in = None;
    let mut token_type = None;
    let mut error = None;

    for pair in params.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(&value.replace('+', " "))
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "access_token" => access_token = Some(value),
            "refresh_token" => refresh_token = Some(value),
            "expires_at" => expires_at = value.parse::<i64>().ok(),
            "expires_in" => expires_in = value.parse::<i64>().ok(),
            "token_type" => token_type = Some(value),
            "error_description" => error = Some(value),
            "error" if error.is_none() => error = Some(value),
            _ => {}
        }
    }

    if let Some(message) = error {
        return Err(BackendError::Api {
            status: StatusCode::BAD_REQUEST.as_u16(),
            message,
        });
    }

    match (access_token, refresh_token) {
        (Some(access_token), Some(refresh_token)) => Ok(RedirectTokens {
            access_token,
            refresh_token,
            expires_at: expires_at.or_else(|| expires_in.map(|secs| Utc::now().timestamp() + secs)),
            token_type: token_type.unwrap_or_else(|| "bearer".to_string()),
        }),
        _ => Err(BackendError::InvalidResponse(
            "redirect URL does not contain access and refresh tokens".to_string(),
        )),
    }
}

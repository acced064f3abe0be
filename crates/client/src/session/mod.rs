//! Authentication session lifecycle.
//!
//! The [`SessionStore`] owns the authenticated identity, its durable
//! persistence, and the one-time restoration gate at startup. Route and
//! resource authorization consume snapshots of its state; nothing that
//! depends on `is_auth`/`role` may evaluate while the store is still
//! [`SessionState::Loading`].

mod persist;

pub use persist::{FileSessionStore, MemorySessionStore, PersistedSession, SessionPersistence};

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::warn;

use clementine_core::{Email, Role, UserId};

use crate::api::{CommerceApi, SignupRequest, UpdateProfileRequest};
use crate::authz::Route;
use crate::error::{AuthError, ClientError, Result};
use crate::notify::Notices;

/// Minimum password length accepted client-side.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Login form input.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Signup form input.
#[derive(Debug, Clone)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub mobile: String,
}

/// Profile edit input.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub mobile: Option<String>,
    pub password_change: Option<PasswordChange>,
}

/// Password change attached to a profile edit.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current: String,
    pub new_password: String,
}

/// An authenticated identity.
///
/// Invariant: a `Session` always carries a non-empty token and one of the
/// two defined roles; construction goes through login or validated
/// restoration only.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub email: String,
    pub mobile: String,
    pub token: SecretString,
}

/// Observable session state.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// Restoration has not completed; no authorization decision may be made.
    #[default]
    Loading,
    /// Settled: no identity.
    Anonymous,
    /// Settled: logged in.
    Authenticated(Session),
}

impl SessionState {
    /// Whether restoration is still pending.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether a session is present.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The session, if authenticated.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// The session role, if authenticated.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.session().map(|s| s.role)
    }
}

/// Owns authentication state, persistence, and restoration.
pub struct SessionStore {
    state: RwLock<SessionState>,
    persistence: Box<dyn SessionPersistence>,
    api: CommerceApi,
    notices: Notices,
}

impl SessionStore {
    /// Create a store in the [`SessionState::Loading`] state.
    ///
    /// Call [`SessionStore::restore`] exactly once before evaluating routes.
    #[must_use]
    pub fn new(
        api: CommerceApi,
        persistence: Box<dyn SessionPersistence>,
        notices: Notices,
    ) -> Self {
        Self {
            state: RwLock::new(SessionState::Loading),
            persistence,
            api,
            notices,
        }
    }

    /// Snapshot of the current state.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// The session token, or `SessionExpired` when logged out.
    pub async fn token(&self) -> Result<SecretString> {
        self.state
            .read()
            .await
            .session()
            .map(|s| s.token.clone())
            .ok_or_else(|| AuthError::SessionExpired.into())
    }

    /// One-time startup gate: rebuild identity from persisted state.
    ///
    /// Fails open to logged-out: any validation or storage failure clears
    /// the persisted record and settles [`SessionState::Anonymous`] instead
    /// of raising. Performs no network round-trip.
    pub async fn restore(&self) {
        let settled = match self.persistence.load() {
            Ok(Some(record)) => match validate_record(record) {
                Ok(session) => SessionState::Authenticated(session),
                Err(reason) => {
                    warn!(%reason, "discarding persisted session");
                    self.discard_persisted();
                    SessionState::Anonymous
                }
            },
            Ok(None) => SessionState::Anonymous,
            Err(err) => {
                warn!(error = %err, "session storage unreadable, starting logged out");
                self.discard_persisted();
                SessionState::Anonymous
            }
        };

        *self.state.write().await = settled;
    }

    /// Log in against the role-specific endpoint.
    ///
    /// On success the session is durably persisted before the in-memory
    /// state flips, and the role's home route is returned for navigation.
    /// On failure prior state is left untouched.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidCredentials` for rejected credentials, network
    /// categories otherwise.
    pub async fn login(&self, role_hint: Role, credentials: &Credentials) -> Result<Route> {
        let (profile, role, token) = match self
            .api
            .login(role_hint, &credentials.email, &credentials.password)
            .await
        {
            Ok(ok) => ok,
            Err(err) => {
                self.notices.error(err.to_string());
                return Err(err);
            }
        };

        let session = Session {
            user_id: profile.id,
            username: profile.username,
            role,
            email: profile.email,
            mobile: profile.mobile,
            token,
        };

        if let Err(err) = self.persistence.save(&to_record(&session)) {
            // The login itself succeeded; a broken disk only costs restoration.
            warn!(error = %err, "failed to persist session");
        }
        *self.state.write().await = SessionState::Authenticated(session);
        self.notices.success("Logged in successfully");

        Ok(Route::home_for(role))
    }

    /// Register a new user account.
    ///
    /// # Errors
    ///
    /// `ClientError::Validation` for malformed input, checked before any
    /// request is sent.
    pub async fn signup(&self, form: &SignupForm) -> Result<Route> {
        validate_signup(form)?;

        let request = SignupRequest {
            username: &form.username,
            email: &form.email,
            password: &form.password,
            mobile: &form.mobile,
        };
        match self.api.signup(&request).await {
            Ok(response) => {
                self.notices.success(
                    response
                        .message
                        .unwrap_or_else(|| "Account created, please log in".to_owned()),
                );
                Ok(Route::Login)
            }
            Err(err) => {
                self.notices.error(err.to_string());
                Err(err)
            }
        }
    }

    /// Clear persisted state, then in-memory state, and hand back the login
    /// route. Dependent state (cart, checkout) is cleared by the caller
    /// between this returning and navigation, preserving the cascade order.
    pub async fn logout(&self) -> Route {
        self.discard_persisted();
        *self.state.write().await = SessionState::Anonymous;
        self.notices.success("Logged out successfully");
        Route::Login
    }

    /// Update profile fields, then mirror them into memory and storage.
    pub async fn update_profile(&self, changes: &ProfileChanges) -> Result<()> {
        let current = self
            .snapshot()
            .await
            .session()
            .cloned()
            .ok_or(AuthError::SessionExpired)?;

        let username = changes.username.clone().unwrap_or(current.username);
        let mobile = changes.mobile.clone().unwrap_or(current.mobile);
        validate_username(&username)?;
        validate_mobile(&mobile)?;
        if let Some(change) = &changes.password_change {
            validate_password(&change.new_password)?;
        }

        let request = UpdateProfileRequest {
            username: &username,
            mobile: &mobile,
            password: changes.password_change.as_ref().map(|c| c.current.as_str()),
            new_password: changes
                .password_change
                .as_ref()
                .map(|c| c.new_password.as_str()),
        };
        let response = match self
            .api
            .update_profile(&current.token, current.role, &request)
            .await
        {
            Ok(ok) => ok,
            Err(err) => {
                self.notices.error(err.to_string());
                return Err(err);
            }
        };

        let updated = Session {
            username,
            mobile,
            ..current
        };
        if let Err(err) = self.persistence.save(&to_record(&updated)) {
            warn!(error = %err, "failed to persist updated profile");
        }
        *self.state.write().await = SessionState::Authenticated(updated);
        self.notices.success(
            response
                .message
                .unwrap_or_else(|| "Profile updated".to_owned()),
        );
        Ok(())
    }

    fn discard_persisted(&self) {
        if let Err(err) = self.persistence.clear() {
            warn!(error = %err, "failed to clear persisted session");
        }
    }
}

/// Validate a persisted record's shape and lift it into a `Session`.
fn validate_record(record: PersistedSession) -> std::result::Result<Session, AuthError> {
    if record.username.trim().is_empty() {
        return Err(AuthError::CorruptedSession("empty username".to_owned()));
    }
    if record.token.is_empty() {
        return Err(AuthError::CorruptedSession("empty token".to_owned()));
    }
    let role: Role = record
        .role
        .parse()
        .map_err(AuthError::CorruptedSession)?;

    Ok(Session {
        user_id: UserId::new(record.user_id),
        username: record.username,
        role,
        email: record.email,
        mobile: record.mobile,
        token: SecretString::from(record.token),
    })
}

fn to_record(session: &Session) -> PersistedSession {
    PersistedSession {
        user_id: session.user_id.as_str().to_owned(),
        username: session.username.clone(),
        role: session.role.to_string(),
        email: session.email.clone(),
        mobile: session.mobile.clone(),
        token: session.token.expose_secret().to_owned(),
    }
}

/// Shared by signup and the admin-creation console; both submit the same
/// account shape.
pub(crate) fn validate_signup(form: &SignupForm) -> Result<()> {
    validate_username(&form.username)?;
    Email::parse(&form.email).map_err(|e| ClientError::Validation(e.to_string()))?;
    validate_password(&form.password)?;
    validate_mobile(&form.mobile)?;
    Ok(())
}

fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(ClientError::Validation("username is required".to_owned()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ClientError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_mobile(mobile: &str) -> Result<()> {
    let ok = (7..=15).contains(&mobile.len()) && mobile.bytes().all(|b| b.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(ClientError::Validation(
            "mobile must be 7-15 digits".to_owned(),
        ))
    }
}

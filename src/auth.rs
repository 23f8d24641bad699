use std::collections::HashMap;
use std::ops::Add;

use axum::Extension;
use chrono::{DateTime, Duration, Utc};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::config::Settings;
use crate::err::{Error, JsonBody};
use crate::models::{Role, Session, StudentRecord};
use crate::{breaks, proceeds, Payload, SharedState};

/// Lowercase hex SHA-256 of the UTF-8 password. No salt: there is exactly one
/// credential and it is compiled in.
pub fn hash_password(pw: &str) -> String {
    let mut hasher: Sha256 = Digest::new();
    hasher.update(pw.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct AdminCredential {
    pub username: String,
    pub password_hash: String,
}

impl AdminCredential {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            username: settings.admin_username.clone(),
            password_hash: settings.admin_password_hash.clone(),
        }
    }

    pub fn check(&self, username: &str, password: &str) -> bool {
        username == self.username && hash_password(password) == self.password_hash
    }
}

impl Default for AdminCredential {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Checks against the compiled-in administrator credential.
pub fn check_admin(username: &str, password: &str) -> bool {
    AdminCredential::default().check(username, password)
}

pub fn check_student(roll: &str, records: &[StudentRecord]) -> bool {
    records.iter().any(|s| s.roll == roll)
}

fn already_logged_in(session: &Session) -> Result<(), Error> {
    if session.is_authenticated() {
        return Err(Error::AuthenticationFailure {
            message: "Already logged in. Logout first.".to_string(),
        });
    }
    Ok(())
}

pub fn login_admin(
    session: &Session,
    credential: &AdminCredential,
    username: &str,
    password: &str,
) -> Result<Session, Error> {
    already_logged_in(session)?;
    if !credential.check(username, password) {
        return Err(Error::AuthenticationFailure {
            message: "Invalid admin credentials".to_string(),
        });
    }
    Ok(Session::Admin(username.to_string()))
}

pub fn login_student(
    session: &Session,
    roll: &str,
    records: &[StudentRecord],
) -> Result<Session, Error> {
    already_logged_in(session)?;
    if !check_student(roll, records) {
        return Err(Error::AuthenticationFailure {
            message: "Roll number not found. Ask admin to add your record.".to_string(),
        });
    }
    Ok(Session::Student(roll.to_string()))
}

#[derive(Debug, Clone)]
struct SessionEntry {
    session: Session,
    editing: Option<StudentRecord>,
    expires_at: DateTime<Utc>,
}

/// Live sessions keyed by their opaque id. Kept in memory only.
#[derive(Debug)]
pub struct SessionRegistry {
    lifetime: Duration,
    entries: RwLock<HashMap<String, SessionEntry>>,
}

fn generate_ssid() -> String {
    let ssid_bytes: [u8; 32] = thread_rng().gen();

    let mut hasher: Sha256 = Digest::new();
    hasher.update(&ssid_bytes);
    hex::encode(hasher.finalize())
}

impl SessionRegistry {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drops expired entries, then hands back the live session already held by
    /// this identity or mints a new one.
    pub async fn open(&self, session: Session) -> (String, DateTime<Utc>) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| now <= entry.expires_at);

        if let Some((ssid, existing)) = entries.iter().find(|(_, entry)| entry.session == session) {
            // already authenticated
            return (ssid.clone(), existing.expires_at);
        }

        let ssid = generate_ssid();
        let expires_at = now.add(self.lifetime);
        entries.insert(
            ssid.clone(),
            SessionEntry {
                session,
                editing: None,
                expires_at,
            },
        );
        (ssid, expires_at)
    }

    /// Unknown and expired ids are anonymous. Expired entries are dropped here.
    pub async fn resolve(&self, ssid: &str) -> Session {
        {
            let entries = self.entries.read().await;
            match entries.get(ssid) {
                None => return Session::Anonymous,
                Some(entry) if Utc::now() <= entry.expires_at => return entry.session.clone(),
                Some(_) => {}
            }
        }
        log::debug!("Session {} expired", ssid);
        self.entries.write().await.remove(ssid);
        Session::Anonymous
    }

    pub async fn close(&self, ssid: &str) -> Session {
        self.entries
            .write()
            .await
            .remove(ssid)
            .map(|entry| entry.session.logout())
            .unwrap_or_default()
    }

    pub async fn editing(&self, ssid: &str) -> Option<StudentRecord> {
        self.entries
            .read()
            .await
            .get(ssid)
            .and_then(|entry| entry.editing.clone())
    }

    /// Replaces the edit snapshot and returns the previous one. `None` means the
    /// session is gone and nothing was stored.
    pub async fn set_editing(
        &self,
        ssid: &str,
        snapshot: Option<StudentRecord>,
    ) -> Option<Option<StudentRecord>> {
        self.entries
            .write()
            .await
            .get_mut(ssid)
            .map(|entry| std::mem::replace(&mut entry.editing, snapshot))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

pub async fn admin_login(
    Extension(state): Extension<SharedState>,
    JsonBody(login): JsonBody<LoginAdmin>,
) -> Payload<LoggedIn> {
    let session = match login_admin(
        &Session::Anonymous,
        &state.admin,
        &login.username,
        &login.password,
    ) {
        Ok(session) => session,
        Err(err) => {
            log::warn!("Rejected admin login for `{}`", login.username);
            return breaks(err);
        }
    };

    log::info!("Admin `{}` logged in", login.username);
    proceeds(state.open_session(session).await)
}

pub async fn student_login(
    Extension(state): Extension<SharedState>,
    JsonBody(login): JsonBody<LoginStudent>,
) -> Payload<LoggedIn> {
    let students = state.store.load().await;
    let session = login_student(&Session::Anonymous, &login.roll, &students)?;

    log::info!("Student `{}` logged in", login.roll);
    proceeds(state.open_session(session).await)
}

pub async fn logout(
    Extension(state): Extension<SharedState>,
    JsonBody(EnsureSession { ssid, .. }): JsonBody<EnsureSession<NoPayload>>,
) -> Payload<LoggedOut> {
    let session = state.sessions.resolve(&ssid).await;
    if let Some(identity) = session.identity() {
        log::info!("`{}` logged out", identity);
    }
    state.sessions.close(&ssid).await;
    proceeds(LoggedOut {
        was_logged_in: session.is_authenticated(),
    })
}

pub async fn who_am_i(
    Extension(state): Extension<SharedState>,
    JsonBody(EnsureSession { ssid, .. }): JsonBody<EnsureSession<NoPayload>>,
) -> Payload<SessionInfo> {
    let session = state.sessions.resolve(&ssid).await;
    let editing = match session {
        Session::Admin(_) => state.sessions.editing(&ssid).await.map(|rec| rec.roll),
        _ => None,
    };
    proceeds(SessionInfo {
        role: session.role(),
        identity: session.identity().map(str::to_string),
        editing,
    })
}

/// Request body wrapper for every call made on behalf of a session.
#[derive(Debug, Clone, Deserialize)]
pub struct EnsureSession<V> {
    pub ssid: String,
    #[serde(flatten)]
    pub value: V,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoPayload {}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginStudent {
    pub roll: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedIn {
    pub session_id: String,
    pub role: Role,
    pub identity: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedOut {
    pub was_logged_in: bool,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub role: Role,
    pub identity: Option<String>,
    pub editing: Option<String>,
}

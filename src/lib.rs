pub mod admin;
pub mod auth;
pub mod config;
pub mod err;
pub mod models;
pub mod records;
pub mod store;
pub mod student;

use std::sync::Arc;

use axum::handler::Handler;
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::Serialize;

use crate::auth::{AdminCredential, LoggedIn, SessionRegistry};
use crate::config::{Settings, APP_TITLE};
use crate::err::{Error, Fine, Maybe, Nothing};
use crate::models::Session;
use crate::store::RecordStore;

pub type RefStr = &'static str;
pub type Payload<T> = Result<Maybe<T>, Error>;
pub type SharedState = Arc<AppState>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Fine(value))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Ok(Nothing(err))
}

#[derive(Debug)]
pub struct AppState {
    pub settings: Settings,
    pub admin: AdminCredential,
    pub store: RecordStore,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            admin: AdminCredential::from_settings(&settings),
            store: RecordStore::new(settings.data_file.clone()),
            sessions: SessionRegistry::new(settings.session_lifetime),
            settings,
        }
    }

    pub(crate) async fn open_session(&self, session: Session) -> LoggedIn {
        let role = session.role();
        let identity = session.identity().unwrap_or_default().to_string();
        let (session_id, expires_at) = self.sessions.open(session).await;
        LoggedIn {
            session_id,
            role,
            identity,
            expires_at,
        }
    }
}

pub fn app(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login/admin", post(auth::admin_login))
        .route("/login/student", post(auth::student_login))
        .route("/logout", post(auth::logout))
        .route("/session", post(auth::who_am_i))
        .route("/students/add", post(admin::add_student))
        .route("/students/list", post(admin::list_students))
        .route("/students/edit/load", post(admin::load_for_edit))
        .route("/students/edit/save", post(admin::save_edit))
        .route("/students/edit/clear", post(admin::clear_edit))
        .route("/students/search", post(admin::search_student))
        .route("/students/delete", post(admin::delete_student))
        .route("/me", post(student::view_own_record))
        .fallback(err::handler404.into_service())
        .layer(Extension(state))
}

async fn index() -> Payload<Index> {
    proceeds(Index {
        title: APP_TITLE,
        roles: "Admin (add/edit/delete) - Student (view only)",
        message: "Please login as Admin or Student to continue.",
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Index {
    title: RefStr,
    roles: RefStr,
    message: RefStr,
}

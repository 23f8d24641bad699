use axum::Extension;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{EnsureSession, NoPayload};
use crate::err::{Error, JsonBody};
use crate::models::{NewStudent, StudentEdit, StudentRecord, StudentRow};
use crate::{proceeds, records, Payload, SharedState};

pub async fn add_student(
    Extension(state): Extension<SharedState>,
    JsonBody(EnsureSession { ssid, value }): JsonBody<EnsureSession<NewStudent>>,
) -> Payload<StudentAdded> {
    state.sessions.resolve(&ssid).await.require_admin()?;

    let _cycle = state.store.lock().await;
    let mut students = state.store.load().await;
    let student = records::add(&mut students, value, Utc::now())?.clone();
    state.store.save(&students).await?;

    log::info!("Added student `{}` ({})", student.roll, student.name);
    proceeds(StudentAdded { student })
}

pub async fn list_students(
    Extension(state): Extension<SharedState>,
    JsonBody(EnsureSession { ssid, .. }): JsonBody<EnsureSession<NoPayload>>,
) -> Payload<StudentList> {
    state.sessions.resolve(&ssid).await.require_admin()?;

    let students = records::list(&state.store.load().await);
    proceeds(StudentList {
        count: students.len(),
        students,
    })
}

pub async fn load_for_edit(
    Extension(state): Extension<SharedState>,
    JsonBody(EnsureSession { ssid, value }): JsonBody<EnsureSession<ByRoll>>,
) -> Payload<Editing> {
    state.sessions.resolve(&ssid).await.require_admin()?;

    let students = state.store.load().await;
    let student = records::load_for_edit(&students, &value.roll)?;
    if state
        .sessions
        .set_editing(&ssid, Some(student.clone()))
        .await
        .is_none()
    {
        return Err(session_ended());
    }
    proceeds(Editing { student })
}

pub async fn save_edit(
    Extension(state): Extension<SharedState>,
    JsonBody(EnsureSession { ssid, value }): JsonBody<EnsureSession<StudentEdit>>,
) -> Payload<Edited> {
    state.sessions.resolve(&ssid).await.require_admin()?;
    let snapshot = state
        .sessions
        .editing(&ssid)
        .await
        .ok_or_else(|| Error::not_found("No record loaded for edit."))?;

    let _cycle = state.store.lock().await;
    let mut students = state.store.load().await;
    let student = records::save_edit(&mut students, &snapshot, value)?.clone();
    state.store.save(&students).await?;
    state.sessions.set_editing(&ssid, None).await;

    log::info!("Updated student `{}`", student.roll);
    proceeds(Edited { student })
}

pub async fn clear_edit(
    Extension(state): Extension<SharedState>,
    JsonBody(EnsureSession { ssid, .. }): JsonBody<EnsureSession<NoPayload>>,
) -> Payload<EditCleared> {
    state.sessions.resolve(&ssid).await.require_admin()?;
    let previous = state
        .sessions
        .set_editing(&ssid, None)
        .await
        .ok_or_else(session_ended)?;
    proceeds(EditCleared {
        cleared: previous.is_some(),
    })
}

pub async fn search_student(
    Extension(state): Extension<SharedState>,
    JsonBody(EnsureSession { ssid, value }): JsonBody<EnsureSession<ByRoll>>,
) -> Payload<Found> {
    state.sessions.resolve(&ssid).await.require_admin()?;

    let students = state.store.load().await;
    let student = records::search(&students, &value.roll)?.clone();
    proceeds(Found { student })
}

pub async fn delete_student(
    Extension(state): Extension<SharedState>,
    JsonBody(EnsureSession { ssid, value }): JsonBody<EnsureSession<ByRoll>>,
) -> Payload<Deleted> {
    state.sessions.resolve(&ssid).await.require_admin()?;

    let _cycle = state.store.lock().await;
    let mut students = state.store.load().await;
    let removed = records::delete(&mut students, &value.roll)?;
    state.store.save(&students).await?;

    log::info!("Deleted student `{}`", value.roll);
    proceeds(Deleted {
        roll: value.roll,
        removed,
    })
}

fn session_ended() -> Error {
    Error::Forbidden {
        message: "Session ended. Please login again.".to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ByRoll {
    pub roll: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentAdded {
    pub student: StudentRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentList {
    pub count: usize,
    pub students: Vec<StudentRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Editing {
    pub student: StudentRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct Edited {
    pub student: StudentRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditCleared {
    pub cleared: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Found {
    pub student: StudentRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
    pub roll: String,
    pub removed: usize,
}

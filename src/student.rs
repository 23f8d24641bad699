use axum::Extension;
use serde::Serialize;

use crate::auth::{EnsureSession, NoPayload};
use crate::err::JsonBody;
use crate::models::StudentRecord;
use crate::{proceeds, records, Payload, SharedState, RefStr};

const VIEW_ONLY_NOTE: RefStr = "You can only view your record. Contact admin for changes.";

pub async fn view_own_record(
    Extension(state): Extension<SharedState>,
    JsonBody(EnsureSession { ssid, .. }): JsonBody<EnsureSession<NoPayload>>,
) -> Payload<OwnRecord> {
    let session = state.sessions.resolve(&ssid).await;
    session.require_student()?;

    let students = state.store.load().await;
    let student = match records::view_own(&students, &session) {
        Ok(student) => student.clone(),
        Err(err) => {
            log::warn!(
                "Student `{}` has a session but no record",
                session.identity().unwrap_or_default()
            );
            return Err(err);
        }
    };
    proceeds(OwnRecord {
        student,
        note: VIEW_ONLY_NOTE,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnRecord {
    pub student: StudentRecord,
    pub note: RefStr,
}

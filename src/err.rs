#![allow(non_snake_case)]

use axum::async_trait;
use axum::body::HttpBody;
use axum::extract::{FromRequest, RequestParts};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Json};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        message: format!("Invalid path: {}", path),
    }
}

/// `Json` whose rejections come back in the usual failure envelope.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for JsonBody<T>
where
    T: DeserializeOwned,
    B: HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(Error::Validation {
                message: rejection.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Maybe<T> {
    Nothing(Failure),
    Fine(Success<T>),
}

pub fn Fine<V>(v: V) -> Maybe<V>
where
    V: Serialize,
{
    Maybe::Fine(Success::of(v))
}

pub fn Nothing<V>(err: Error) -> Maybe<V> {
    Maybe::Nothing(Failure::of(err))
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    success: bool,
    #[serde(flatten)]
    value: V,
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            success: true,
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    success: bool,
    #[serde(flatten)]
    error: Error,
}

impl Failure {
    pub fn of(error: Error) -> Self {
        Self {
            success: false,
            error,
        }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }
}

impl<T> IntoResponse for Maybe<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match self {
            Maybe::Nothing(failure) => {
                (failure.error.status(), Json(failure)).into_response()
            }
            Maybe::Fine(success) => Json(success).into_response(),
        }
    }
}

/// Every way an operation can fail. Serialized as `{"error": "<Variant>", "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    Validation { message: String },
    DuplicateKey { message: String },
    NotFound { message: String },
    AuthenticationFailure { message: String },
    Forbidden { message: String },
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::DuplicateKey { .. } => StatusCode::CONFLICT,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::AuthenticationFailure { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Validation { message }
            | Error::DuplicateKey { message }
            | Error::NotFound { message }
            | Error::AuthenticationFailure { message }
            | Error::Forbidden { message }
            | Error::InternalError { message, .. } => message,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.status(), self.message())
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(Failure::of(self))).into_response()
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::InternalError {
            kind: "IOError",
            message: io.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError {
            kind: "SerializationError",
            message: err.to_string(),
        }
    }
}

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use lazy_static::lazy_static;

use crate::auth::hash_password;

pub const APP_TITLE: &str = "GGI STUDENT MANAGEMENT (Auth)";
pub const DATA_FILE: &str = "students_auth.json";

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PLAIN_PASSWORD: &str = "ggi1234";

lazy_static! {
    // only the digest is compared at runtime
    pub static ref ADMIN_PW_HASH: String = hash_password(ADMIN_PLAIN_PASSWORD);
}

pub fn bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

pub fn session_lifetime() -> Duration {
    Duration::days(2)
}

/// Everything a running server needs to know up front.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_file: PathBuf,
    pub admin_username: String,
    pub admin_password_hash: String,
    pub session_lifetime: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DATA_FILE),
            admin_username: ADMIN_USERNAME.to_string(),
            admin_password_hash: ADMIN_PW_HASH.clone(),
            session_lifetime: session_lifetime(),
        }
    }
}

impl Settings {
    pub fn with_data_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_file = path.into();
        self
    }
}

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::err::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Year {
    #[default]
    #[serde(rename = "1st")]
    First,
    #[serde(rename = "2nd")]
    Second,
    #[serde(rename = "3rd")]
    Third,
    #[serde(rename = "4th")]
    Fourth,
}

pub const MAX_MARKS: u8 = 100;

/// One persisted student. `roll` is the key and never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    pub roll: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub year: Year,
    #[serde(default)]
    pub marks: u8,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(deserialize_with = "created_at_lenient")]
    pub created_at: DateTime<Utc>,
}

/// Accepts RFC 3339 as well as zone-less ISO-8601 (`2025-03-01T10:20:30.123456`),
/// which is read as UTC.
fn created_at_lenient<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(stamp) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(stamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(serde::de::Error::custom)
}

/// Display projection used by the student table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRow {
    pub roll: String,
    pub name: String,
    pub course: String,
    pub year: Year,
    pub marks: u8,
    pub phone: String,
    pub email: String,
}

impl From<&StudentRecord> for StudentRow {
    fn from(record: &StudentRecord) -> Self {
        Self {
            roll: record.roll.clone(),
            name: record.name.clone(),
            course: record.course.clone(),
            year: record.year,
            marks: record.marks,
            phone: record.phone.clone(),
            email: record.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub roll: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub year: Year,
    #[serde(default)]
    pub marks: u8,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

/// Replacement values for every non-key field of a record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentEdit {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub year: Year,
    #[serde(default)]
    pub marks: u8,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    None,
    Admin,
    Student,
}

/// Who is on the other end of a connection. Role and identity live in one
/// value so they can only ever change together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Admin(String),
    Student(String),
}

impl Session {
    pub fn role(&self) -> Role {
        match self {
            Session::Anonymous => Role::None,
            Session::Admin(_) => Role::Admin,
            Session::Student(_) => Role::Student,
        }
    }

    pub fn identity(&self) -> Option<&str> {
        match self {
            Session::Anonymous => None,
            Session::Admin(username) => Some(username),
            Session::Student(roll) => Some(roll),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Session::Anonymous)
    }

    pub fn logout(self) -> Session {
        Session::Anonymous
    }

    pub fn require_admin(&self) -> Result<&str, Error> {
        match self {
            Session::Admin(username) => Ok(username),
            _ => Err(Error::Forbidden {
                message: "Please login as Admin to continue.".to_string(),
            }),
        }
    }

    pub fn require_student(&self) -> Result<&str, Error> {
        match self {
            Session::Student(roll) => Ok(roll),
            _ => Err(Error::Forbidden {
                message: "Please login as Student to continue.".to_string(),
            }),
        }
    }
}

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated account, as returned by GET /api/auth/me.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A birth profile the backend computes charts for. Owned exclusively by
/// the session's profile list; consumers look profiles up by id instead of
/// keeping copies across refreshes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub gender: String,
    pub birth_date: NaiveDate,
    pub birth_time: NaiveTime,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub relation: String,
    pub profession: String,
    pub marital_status: String,
}

/// Payload for creating or updating a profile: everything but the id,
/// which the server assigns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileDraft {
    pub name: String,
    pub gender: String,
    pub birth_date: NaiveDate,
    pub birth_time: NaiveTime,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub relation: String,
    pub profession: String,
    pub marital_status: String,
}

impl ProfileDraft {
    /// Materialize a draft into a full profile under a server-assigned id.
    pub fn into_profile(self, id: i64) -> Profile {
        Profile {
            id,
            name: self.name,
            gender: self.gender,
            birth_date: self.birth_date,
            birth_time: self.birth_time,
            location_name: self.location_name,
            latitude: self.latitude,
            longitude: self.longitude,
            relation: self.relation,
            profession: self.profession,
            marital_status: self.marital_status,
        }
    }
}

/// Which zodiac system the UI is presenting. A session-local preference,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    #[default]
    Vedic,
    Western,
}

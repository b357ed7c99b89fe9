//! In-memory stand-in for the jyotish backend. Lets the CLI run offline
//! and gives the session tests a backend they can drive directly,
//! including token revocation to provoke the 401 path.

use chrono::{NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::client::ApiError;
use crate::api::dto::{RegisterRequest, TokenResponse};
use crate::models::{Profile, ProfileDraft, User};

#[derive(Debug, Clone)]
pub struct DevBackend {
    state: Arc<Mutex<DevState>>,
}

#[derive(Debug)]
struct DevState {
    accounts: Vec<DevAccount>,
    /// token -> user id
    tokens: HashMap<String, i64>,
    /// (owner user id, profile), insertion order preserved
    profiles: Vec<(i64, Profile)>,
    next_user_id: i64,
    next_profile_id: i64,
    next_token: u64,
}

#[derive(Debug, Clone)]
struct DevAccount {
    password: String,
    user: User,
}

impl Default for DevBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DevBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(seed_state())),
        }
    }

    /// Invalidate every issued token. Subsequent authenticated calls get
    /// `ApiError::Unauthorized`, as if the server had expired the session.
    pub fn revoke_tokens(&self) {
        self.state
            .lock()
            .expect("dev state lock poisoned")
            .tokens
            .clear();
    }

    pub fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let mut state = self.state.lock().expect("dev state lock poisoned");

        let user_id = state
            .accounts
            .iter()
            .find(|a| a.user.email == username && a.password == password)
            .map(|a| a.user.id)
            .ok_or_else(|| ApiError::Rejected {
                status: 401,
                detail: "Incorrect email or password".to_string(),
            })?;

        Ok(TokenResponse {
            access_token: state.issue_token(user_id),
        })
    }

    pub fn register(&self, seed: &RegisterRequest) -> Result<TokenResponse, ApiError> {
        let mut state = self.state.lock().expect("dev state lock poisoned");

        if state.accounts.iter().any(|a| a.user.email == seed.email) {
            return Err(ApiError::Rejected {
                status: 400,
                detail: "Email already registered".to_string(),
            });
        }

        let id = state.next_user_id;
        state.next_user_id += 1;
        state.accounts.push(DevAccount {
            password: seed.password.clone(),
            user: User {
                id,
                full_name: seed.full_name.clone(),
                email: seed.email.clone(),
                phone_number: seed.phone_number.clone(),
                photo_url: None,
                created_at: Utc::now(),
            },
        });

        Ok(TokenResponse {
            access_token: state.issue_token(id),
        })
    }

    pub fn me(&self, token: &str) -> Result<User, ApiError> {
        let state = self.state.lock().expect("dev state lock poisoned");
        let user_id = state.authorize(token)?;
        state
            .accounts
            .iter()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
            .ok_or(ApiError::Unauthorized)
    }

    pub fn list_profiles(&self, token: &str) -> Result<Vec<Profile>, ApiError> {
        let state = self.state.lock().expect("dev state lock poisoned");
        let user_id = state.authorize(token)?;
        Ok(state
            .profiles
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, p)| p.clone())
            .collect())
    }

    pub fn create_profile(&self, token: &str, draft: &ProfileDraft) -> Result<Profile, ApiError> {
        let mut state = self.state.lock().expect("dev state lock poisoned");
        let user_id = state.authorize(token)?;

        let id = state.next_profile_id;
        state.next_profile_id += 1;
        let profile = draft.clone().into_profile(id);
        state.profiles.push((user_id, profile.clone()));
        Ok(profile)
    }

    pub fn update_profile(
        &self,
        token: &str,
        id: i64,
        draft: &ProfileDraft,
    ) -> Result<Profile, ApiError> {
        let mut state = self.state.lock().expect("dev state lock poisoned");
        let user_id = state.authorize(token)?;

        let slot = state
            .profiles
            .iter_mut()
            .find(|(owner, p)| *owner == user_id && p.id == id)
            .ok_or_else(|| ApiError::Rejected {
                status: 404,
                detail: "Profile not found".to_string(),
            })?;
        slot.1 = draft.clone().into_profile(id);
        Ok(slot.1.clone())
    }

    /// Idempotent delete: removing an id that is already gone succeeds.
    pub fn delete_profile(&self, token: &str, id: i64) -> Result<(), ApiError> {
        let mut state = self.state.lock().expect("dev state lock poisoned");
        let user_id = state.authorize(token)?;
        state
            .profiles
            .retain(|(owner, p)| !(*owner == user_id && p.id == id));
        Ok(())
    }
}

impl DevState {
    fn authorize(&self, token: &str) -> Result<i64, ApiError> {
        self.tokens.get(token).copied().ok_or(ApiError::Unauthorized)
    }

    fn issue_token(&mut self, user_id: i64) -> String {
        let token = format!("dev-token-{}", self.next_token);
        self.next_token += 1;
        self.tokens.insert(token.clone(), user_id);
        token
    }
}

fn seed_state() -> DevState {
    let mira = User {
        id: 1,
        full_name: "Mira Devi".to_string(),
        email: "mira@jyotish.dev".to_string(),
        phone_number: None,
        photo_url: None,
        created_at: Utc::now(),
    };

    let profile = Profile {
        id: 1,
        name: "Mira".to_string(),
        gender: "female".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1992, 4, 14).unwrap_or_default(),
        birth_time: NaiveTime::from_hms_opt(6, 45, 0).unwrap_or_default(),
        location_name: "Varanasi, India".to_string(),
        latitude: 25.3176,
        longitude: 82.9739,
        relation: "self".to_string(),
        profession: "musician".to_string(),
        marital_status: "single".to_string(),
    };

    DevState {
        accounts: vec![DevAccount {
            password: "chandra".to_string(),
            user: mira,
        }],
        tokens: HashMap::new(),
        profiles: vec![(1, profile)],
        next_user_id: 2,
        next_profile_id: 2,
        next_token: 1,
    }
}

//! Client core for the jyotish astrology service: the session & profile
//! synchronization layer plus the birth date/time picker state machines.
//! Chart computation happens on the backend; this crate owns the token,
//! the authenticated-request contract and the local profile cache.

pub mod api;
pub mod config;
pub mod models;
pub mod picker;
pub mod session;
pub mod token_store;

pub use api::{ApiClient, ApiError, DevBackend, RegisterRequest};
pub use config::JyotishConfig;
pub use models::{AppMode, Profile, ProfileDraft, User};
pub use picker::{DatePart, DatePicker, Meridiem, TimePart, TimePicker};
pub use session::{SessionError, SessionPhase, SessionSnapshot, SessionStore};
pub use token_store::TokenStore;

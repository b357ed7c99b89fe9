mod client;
mod dev_backend;
mod dto;

pub use client::{ApiClient, ApiError};
pub use dev_backend::DevBackend;
pub use dto::{RegisterRequest, TokenResponse};

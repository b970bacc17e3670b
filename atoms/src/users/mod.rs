pub mod http;
pub mod memory;
pub mod model;
pub mod service;

pub use memory::InMemoryUserStore;
pub use model::{RegisterUserPayload, User, VerifiedClaims};
pub use service::{DynamoUserStore, UserStore};

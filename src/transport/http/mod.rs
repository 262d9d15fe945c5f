pub mod auth;
pub mod error;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod games;
    pub mod health;
    pub mod users;
}

pub use error::ApiError;
pub use router::{create_router, ApiDoc};
pub use types::AppState;

pub mod router;
pub mod types;
pub mod handlers {
    pub mod common;
    pub mod health;
    pub mod history;
    pub mod notify;
    pub mod register;
    pub mod transactions;
    pub mod webhook;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;

//! External service integrations.

pub mod auth_client {
    pub use crate::auth_client::*;
}

pub mod webhook_client {
    pub use crate::webhook_client::*;
}

pub mod webhook_models {
    pub use crate::webhook_models::*;
}

pub mod db_storage {
    pub use crate::db_storage::*;
}

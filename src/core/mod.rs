// Domain-layer modules and shared errors/models
pub mod relay {
    pub use crate::relay::*;
}

pub mod tokens {
    pub use crate::tokens::*;
}

pub mod ingestion {
    pub use crate::ingestion::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}

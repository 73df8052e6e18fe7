// Domain-layer modules and shared errors/models
pub mod roleta {
    pub use crate::roleta::*;
}

pub mod registro {
    pub use crate::registro::*;
}

pub mod validacao {
    pub use crate::validacao::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}

pub mod models;
pub mod pii;

pub use models::ParseEnumError;
pub use pii::Masked;

pub mod id;
pub mod request;

pub use id::TransactionId;
pub use request::*;

pub mod requester;
pub mod validator;

pub use requester::EndorsementRequester;
pub use validator::{classify, EndorsementFailure, EndorsementOutcome, ResponseValidator};

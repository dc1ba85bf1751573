pub mod validator;

pub use validator::{classify_response, HttpValidator};

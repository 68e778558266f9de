//! HTTP-facing error type and response envelope shared by the backoffice
//! handlers.

pub mod error;
pub mod ids;
pub mod response;

pub use error::ApiError;
pub use ids::parse_ids;
pub use response::{ApiResponse, Envelope};

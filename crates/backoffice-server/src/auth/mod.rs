//! Authentication: access tokens, password hashing and the bearer-token
//! middleware guarding every non-public route.

pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{AuthState, Principal, RENEWED_TOKEN_HEADER, require_auth};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenError, TokenService};

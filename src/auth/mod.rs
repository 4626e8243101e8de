//! Authentication and authorization.
//!
//! - [`credentials`]: user registration and login verification
//! - [`password`]: pluggable secret schemes (plain, Argon2)
//! - [`token`]: HS256 bearer token issuance and validation
//! - [`guard`]: bearer header → identity, and the ownership rule

pub mod credentials;
pub mod guard;
pub mod password;
pub mod token;

pub use credentials::{CredentialError, CredentialStore};
pub use guard::{authorize_ownership, AuthError, AuthGuard, Authenticated, MaybeAuthenticated};
pub use password::SecretScheme;
pub use token::{Claims, Clock, SystemClock, TokenError, TokenService, TOKEN_TTL_SECS};

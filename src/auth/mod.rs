//! Bearer-token authentication.
//!
//! Access tokens are verified statelessly on every request. Refresh tokens
//! are only accepted where a session identity is needed, and then only while
//! their session is live and not blacklisted.

mod bearer;
mod extractors;
mod gate;
mod policy;
mod state;
mod types;

pub use bearer::{
    AUTHORIZATION_QUERY_PARAM, BearerSource, PROXY_AUTHORIZATION_HEADER, RawBearer, find_bearer,
    parse_bearer,
};
pub use extractors::{Auth, Bearer, SessionAuth};
pub use gate::AuthGate;
pub use policy::{RolePolicy, SessionPolicy};
pub use state::HasAuthGate;
pub use types::Caller;

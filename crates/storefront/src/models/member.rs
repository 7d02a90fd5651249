//! Member (login account) types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use store_core::{MemberId, Username};

/// A registered member.
///
/// Members are read-only here; there is no registration flow.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: MemberId,
    pub channel_id: String,
    pub username: Username,
    /// Password hash (bcrypt or argon2 PHC string).
    pub credential: SecretString,
    /// Appended to the password before hashing.
    pub salt: String,
    pub created_date: DateTime<Utc>,
}

/// Body of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub id_user: MemberId,
    pub token: String,
}

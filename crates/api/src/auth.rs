use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "hrm_session";

/// Default for the role-lookup race in seconds; a lookup slower than this
/// resolves the request with an unknown role instead of blocking it.
pub const DEFAULT_ROLE_LOOKUP_TIMEOUT_SECS: u64 = 8;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
    pub role_lookup_timeout: Duration,
}

impl AuthConfig {
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

/// Session claims deliberately omit the role: the role is re-resolved from
/// storage on every request so an admin demotion takes effect immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

/// Every privileged operation in the schema names one of these actions and
/// consults `role_allows`; pages cannot forget the check because there is no
/// other way to reach a privileged code path.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Action {
    ViewAllRecords,
    ManageEmployees,
    ManagePayroll,
    ApproveLeave,
    ManageReviews,
    ManageRoles,
    ManagePostings,
}

pub fn role_allows(role: Role, action: Action) -> bool {
    match action {
        Action::ViewAllRecords | Action::ManageEmployees | Action::ManagePostings => {
            matches!(role, Role::Admin | Role::Manager)
        }
        Action::ManagePayroll
        | Action::ApproveLeave
        | Action::ManageReviews
        | Action::ManageRoles => matches!(role, Role::Admin),
    }
}

/// The authenticated caller. `role` is `None` when the role lookup timed out
/// or the user has no role row; an unknown role carries no capabilities.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role: Option<Role>,
}

impl CurrentUser {
    pub fn can(&self, action: Action) -> bool {
        self.role.map(|role| role_allows(role, action)).unwrap_or(false)
    }

    pub fn sees_all_records(&self) -> bool {
        self.can(Action::ViewAllRecords)
    }
}

/// Pure mapping from a stored role row to the session role.
pub fn resolve_role(row: Option<entity::user_role::Model>) -> Option<Role> {
    row.map(|model| match model.role {
        entity::user_role::Role::Admin => Role::Admin,
        entity::user_role::Role::Manager => Role::Manager,
        entity::user_role::Role::Employee => Role::Employee,
    })
}

/// Race a role lookup against `timeout`. A slow lookup yields `None` (role
/// unknown) rather than an error so sign-in never blocks on the role table.
pub async fn resolve_role_with_timeout<F>(lookup: F, timeout: Duration) -> Option<Role>
where
    F: Future<Output = Option<Role>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(role) => role,
        Err(_) => None,
    }
}

pub fn issue_token(user_id: Uuid, config: &AuthConfig) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(chrono::Duration::minutes(config.session_ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(
    token: &str,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}

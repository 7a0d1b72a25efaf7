//! Caller identity attached to authenticated requests

use kernel::id::{SessionId, UserId};
use serde::Serialize;

use crate::domain::value_object::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    pub role: UserRole,
    pub session_id: SessionId,
}

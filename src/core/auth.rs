use std::collections::HashSet;

use super::models::UserId;

/// Returns true when `user_id` may invoke privileged commands.
///
/// The automation account itself is always allowed so it can drive its own
/// commands from the same session.
#[must_use]
pub fn is_authorized(user_id: &UserId, admin_ids: &HashSet<UserId>, self_id: Option<&UserId>) -> bool {
    admin_ids.contains(user_id) || self_id.is_some_and(|id| id == user_id)
}

//! Role-rights authorization evaluator.
//!
//! Pure policy check: no I/O, no panics, no state. The rights table is an
//! explicitly constructed value handed in by the caller, never a global.

use gatehouse_core::{AuthError, UserId};

use crate::rights::{Permission, RoleRights};
use crate::users::User;

/// Decide whether `user` may proceed on a route requiring `required`.
///
/// - Empty `required` always allows: authentication alone suffices.
/// - Otherwise every required permission must be granted by the user's role,
///   OR the route's subject is the user themself (`subject_user_id`), in
///   which case rights are irrelevant: a user may always act on a resource
///   scoped to their own account.
pub fn authorize(
    rights: &RoleRights,
    user: &User,
    required: &[Permission],
    subject_user_id: Option<UserId>,
) -> Result<(), AuthError> {
    if required.is_empty() {
        return Ok(());
    }

    if subject_user_id == Some(user.id) {
        return Ok(());
    }

    if rights.grants_all(&user.role, required) {
        return Ok(());
    }

    Err(AuthError::Forbidden)
}

//! Role hierarchy and permission predicates.
//!
//! The route guard and the API handlers both call into this module, so a
//! permission rule lives in exactly one place. Every function is total: an
//! actor without a resolved profile is passed as `None` and is treated as the
//! least privileged caller possible.

mod role;

pub use role::{Role, UnknownRole};

use uuid::Uuid;

use crate::error::AccessError;

/// True for `ADMIN` and `SUPER_ADMIN`.
pub fn is_admin(role: Option<Role>) -> bool {
    matches!(role, Some(Role::Admin) | Some(Role::SuperAdmin))
}

pub fn is_super_admin(role: Option<Role>) -> bool {
    matches!(role, Some(Role::SuperAdmin))
}

/// Position of a role in the hierarchy `USER(1) < ADMIN(2) < SUPER_ADMIN(3)`.
///
/// `DIRECTOR` and `PROFESOR` sit outside the hierarchy and rank 0, the same as
/// an unresolved actor.
pub fn role_rank(role: Option<Role>) -> u8 {
    match role {
        Some(Role::User) => 1,
        Some(Role::Admin) => 2,
        Some(Role::SuperAdmin) => 3,
        Some(Role::Director) | Some(Role::Profesor) | None => 0,
    }
}

/// Hierarchy check: the actor ranks at least as high as the required role.
pub fn can_access_resource(actor: Option<Role>, required: Role) -> bool {
    actor.is_some() && role_rank(actor) >= role_rank(Some(required))
}

/// Whether `actor` may edit or deactivate `target`.
///
/// Anyone may modify themself. `SUPER_ADMIN` may modify anyone, `ADMIN` only
/// `USER` profiles.
pub fn can_modify_user(
    actor_role: Option<Role>,
    target_role: Role,
    actor_id: Option<Uuid>,
    target_id: Uuid,
) -> bool {
    let Some(actor_role) = actor_role else {
        return false;
    };

    if actor_id == Some(target_id) {
        return true;
    }

    match actor_role {
        Role::SuperAdmin => true,
        Role::Admin => target_role == Role::User,
        _ => false,
    }
}

pub fn can_create_user_with_role(actor_role: Option<Role>, desired: Role) -> bool {
    match actor_role {
        Some(Role::SuperAdmin) => true,
        Some(Role::Admin) => desired == Role::User,
        _ => false,
    }
}

/// Handler-side form of [`is_admin`].
pub fn require_admin(role: Option<Role>) -> Result<(), AccessError> {
    if is_admin(role) {
        Ok(())
    } else {
        Err(AccessError::Unauthorized)
    }
}

pub fn require_super_admin(role: Option<Role>) -> Result<(), AccessError> {
    if is_super_admin(role) {
        Ok(())
    } else {
        Err(AccessError::Unauthorized)
    }
}

use std::fmt::{self, Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Every role a panel account can hold, least to most privileged.
/// The hierarchy is a chain: an admin can do everything a mesário can,
/// and a mesário everything an eleitor can.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize_repr, Deserialize_repr,
)]
#[repr(u8)]
pub enum Role {
    /// A voter account. The urna itself identifies voters by matrícula,
    /// so this is the floor of the hierarchy rather than a login the
    /// ballot box requires.
    Eleitor = 0,
    /// A poll worker: manages the voter roll.
    Mesario = 1,
    /// Full administrative rights.
    Admin = 2,
}

impl Role {
    /// Does this role include the capabilities of `required`?
    pub fn permits(self, required: Role) -> bool {
        self >= required
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Eleitor => "eleitor",
                Self::Mesario => "mesario",
                Self::Admin => "admin",
            }
        )
    }
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        to_bson(&role).expect("Serialisation is infallible")
    }
}

/// Marker types giving routes a minimum access level via
/// [`AuthToken`](super::AuthToken) request guards.
pub trait AccessLevel: Send {
    const REQUIRED: Role;
}

#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

#[derive(Debug, Clone, Copy)]
pub struct MesarioAccess;

#[derive(Debug, Clone, Copy)]
pub struct EleitorAccess;

impl AccessLevel for AdminAccess {
    const REQUIRED: Role = Role::Admin;
}

impl AccessLevel for MesarioAccess {
    const REQUIRED: Role = Role::Mesario;
}

impl AccessLevel for EleitorAccess {
    const REQUIRED: Role = Role::Eleitor;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_permits_everything() {
        assert!(Role::Admin.permits(Role::Admin));
        assert!(Role::Admin.permits(Role::Mesario));
        assert!(Role::Admin.permits(Role::Eleitor));
    }

    #[test]
    fn mesario_cannot_act_as_admin() {
        assert!(!Role::Mesario.permits(Role::Admin));
        assert!(Role::Mesario.permits(Role::Mesario));
        assert!(Role::Mesario.permits(Role::Eleitor));
    }

    #[test]
    fn eleitor_is_the_floor() {
        assert!(!Role::Eleitor.permits(Role::Admin));
        assert!(!Role::Eleitor.permits(Role::Mesario));
        assert!(Role::Eleitor.permits(Role::Eleitor));
    }
}

use dashmap::DashMap;
use ulid::Ulid;

use crate::model::{Requester, Reservation, Role};

/// Authorization decisions delegated to the identity collaborator.
pub trait Authorizer: Send + Sync {
    fn is_admin(&self, requester_id: Ulid) -> bool;

    fn is_owner_or_admin(&self, requester_id: Ulid, reservation: &Reservation) -> bool {
        reservation.requester_id == requester_id || self.is_admin(requester_id)
    }
}

/// Role table of authenticated users. Unknown ids are plain users.
#[derive(Default)]
pub struct RoleDirectory {
    roles: DashMap<Ulid, Role>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, requester: Requester) {
        self.roles.insert(requester.id, requester.role);
    }
}

impl Authorizer for RoleDirectory {
    fn is_admin(&self, requester_id: Ulid) -> bool {
        self.roles
            .get(&requester_id)
            .is_some_and(|role| *role == Role::Admin)
    }
}

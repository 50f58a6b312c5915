//! The authenticated caller, as a closed set of roles.
//!
//! Services take `BuyerId` or `FarmerId` rather than a raw user id, so an
//! operation reserved for one role cannot be called with the other.

use crate::entities::user::Role;
use crate::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BuyerId(pub i32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FarmerId(pub i32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Principal {
    Buyer(BuyerId),
    Farmer(FarmerId),
}

impl Principal {
    pub fn new(user_id: i32, role: Role) -> Self {
        match role {
            Role::Buyer => Principal::Buyer(BuyerId(user_id)),
            Role::Farmer => Principal::Farmer(FarmerId(user_id)),
        }
    }

    pub fn user_id(&self) -> i32 {
        match self {
            Principal::Buyer(BuyerId(id)) | Principal::Farmer(FarmerId(id)) => *id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::Buyer(_) => Role::Buyer,
            Principal::Farmer(_) => Role::Farmer,
        }
    }

    /// The buyer capability, or 403 with `denied` as the message.
    pub fn buyer(self, denied: &str) -> Result<BuyerId, ApiError> {
        match self {
            Principal::Buyer(id) => Ok(id),
            Principal::Farmer(_) => Err(ApiError::Forbidden(denied.to_owned())),
        }
    }

    /// The farmer capability, or 403 with `denied` as the message.
    pub fn farmer(self, denied: &str) -> Result<FarmerId, ApiError> {
        match self {
            Principal::Farmer(id) => Ok(id),
            Principal::Buyer(_) => Err(ApiError::Forbidden(denied.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_follow_the_role() {
        let buyer = Principal::new(7, Role::Buyer);
        assert_eq!(buyer.buyer("no"), Ok(BuyerId(7)));
        assert_eq!(
            buyer.farmer("Only farmers"),
            Err(ApiError::Forbidden("Only farmers".into()))
        );

        let farmer = Principal::new(9, Role::Farmer);
        assert_eq!(farmer.user_id(), 9);
        assert_eq!(farmer.role(), Role::Farmer);
        assert!(farmer.buyer("Only buyers").is_err());
    }
}

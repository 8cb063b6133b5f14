//! Validation and permission helpers used across the services.

pub mod permissions;
pub mod validation;

pub use permissions::{MemberAction, Membership, PermissionChecker};
pub use validation::Validator;

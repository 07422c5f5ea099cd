//! Identity collaborator: the core only consumes bearer tokens, it never
//! issues credentials.

pub mod claims;
pub mod extractors;
pub mod jwt;

pub use extractors::{AuthUser, MaybeUser};

//! Auth-domain identifiers, role sets, and credential models.

pub mod id;
pub mod roles;
pub mod token;

pub use id::*;
pub use roles::*;
pub use token::{access::*, pair::*, refresh::*, secret::*};

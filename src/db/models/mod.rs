//! Database models split into domain-specific modules.

pub mod common;
pub mod inquiry;
pub mod package;
pub mod stats;
pub mod user;

pub use common::*;
pub use inquiry::*;
pub use package::*;
pub use stats::*;
pub use user::*;

//! Auth-domain identifiers, credentials, cached profiles, and input validation.

pub mod credential;
pub mod profile;
pub mod secret;
pub mod subject;
pub mod validate;

pub use credential::*;
pub use profile::*;
pub use secret::*;
pub use subject::*;
pub use validate::*;

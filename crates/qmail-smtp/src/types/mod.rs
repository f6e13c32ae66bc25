//! Core SMTP types.

mod extension;
mod relay;
mod reply;

pub use extension::{AuthMechanism, Extension};
pub use relay::{Credentials, RelayAddress, Security};
pub use reply::{Reply, ReplyCode};

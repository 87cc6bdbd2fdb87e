//! Credential signing: redacted secrets, JWT assertions, RS256 signing, and the token exchange.

pub mod assertion;
pub mod exchange;
pub mod secret;
pub mod signer;

pub use assertion::*;
pub use exchange::*;
pub use secret::*;
pub use signer::*;

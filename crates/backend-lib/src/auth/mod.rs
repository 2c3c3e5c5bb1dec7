// ============================
// gamenight-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

mod extract;
pub mod session;

pub use extract::AuthUser;
pub use session::{Session, SessionManager};

//! Domain definitions.

pub mod authority;
pub mod emergency;
pub mod encounter;
pub mod guardian;
pub mod safety_code;
pub mod session;
pub mod user;

pub use self::{
    encounter::{Encounter, Review},
    guardian::Guardian,
    session::SafetySession,
};

//! Read entities definitions.

pub mod guardian;
pub mod session;

pub use self::session::Overdue;

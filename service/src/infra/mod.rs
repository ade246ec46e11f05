//! Infrastructure layer.

pub mod database;
pub mod directory;
pub mod messenger;

pub use self::database::Database;
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
pub use self::{directory::Directory, messenger::Messenger};

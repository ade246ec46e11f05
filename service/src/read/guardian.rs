//! [`Guardian`] read model definition.
//!
//! [`Guardian`]: crate::domain::Guardian

use crate::domain::{guardian::group, user};
#[cfg(doc)]
use crate::domain::{guardian::Status, Guardian};

/// Selector of [`Status::Active`] [`Guardian`]s to be alerted for a user.
#[derive(Clone, Debug)]
pub struct ActiveOf {
    /// ID of the user the [`Guardian`]s protect.
    pub user_id: user::Id,

    /// [`group::Group`]s restricting the selection.
    ///
    /// Empty means no restriction: all active [`Guardian`]s of the user.
    pub group_ids: Vec<group::Id>,
}

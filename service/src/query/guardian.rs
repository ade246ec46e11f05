//! [`Query`] collection related to [`Guardian`]s.

use common::operations::By;

use crate::domain::{guardian, user, Guardian};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Guardian`] by its [`guardian::Id`].
pub type ById = DatabaseQuery<By<Option<Guardian>, guardian::Id>>;

/// Queries all [`Guardian`]s of a user.
pub type OfUser = DatabaseQuery<By<Vec<Guardian>, user::Id>>;

/// Queries all [`guardian::Group`]s of a user.
pub type GroupsOfUser = DatabaseQuery<By<Vec<guardian::Group>, user::Id>>;

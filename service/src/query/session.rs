//! [`Query`] collection related to a single [`SafetySession`].

use common::operations::By;

use crate::domain::{session, SafetySession};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`SafetySession`] by its [`session::Id`].
pub type ById = DatabaseQuery<By<Option<SafetySession>, session::Id>>;

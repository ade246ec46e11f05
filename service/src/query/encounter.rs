//! [`Query`] collection related to a single [`Encounter`].

use common::operations::By;

use crate::domain::{encounter, Encounter, Review};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries an [`Encounter`] by its [`encounter::Id`].
pub type ById = DatabaseQuery<By<Option<Encounter>, encounter::Id>>;

/// Queries all [`Review`]s of an [`Encounter`].
pub type Reviews = DatabaseQuery<By<Vec<Review>, encounter::Id>>;

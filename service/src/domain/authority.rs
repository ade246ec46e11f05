//! [`Contact`] definitions.

use common::GeoPoint;
use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

/// Nearest law-enforcement point of contact, as resolved by a directory
/// lookup.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Contact {
    /// [`Name`] of the authority.
    pub name: Name,

    /// Street address of the authority.
    pub address: String,

    /// Phone number of the authority, if known.
    pub phone: Option<String>,

    /// [`GeoPoint`] of the authority.
    pub location: GeoPoint,

    /// Straight-line distance to the looked up position, in meters.
    pub distance_meters: f64,
}

impl Contact {
    /// Returns a map link pointing at this [`Contact`]'s location.
    #[must_use]
    pub fn map_link(&self) -> String {
        self.location.map_link()
    }
}

/// Name of an authority.
#[derive(AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        (!name.is_empty() && name.len() <= 256).then_some(Self(name))
    }
}

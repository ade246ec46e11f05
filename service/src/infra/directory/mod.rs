//! Authority [`Directory`]-related implementations.

pub mod places;
pub mod unconfigured;

use common::{
    operations::{By, Select},
    GeoPoint,
};
use derive_more::{Display, Error as StdError, From};
use tracerr::Traced;

use crate::domain::authority;

pub use self::{places::Places, unconfigured::Unconfigured};

/// Directory operation.
pub use common::Handler as Directory;

/// [`Directory`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// HTTP transport failure.
    #[display("HTTP request failed: {_0}")]
    Http(reqwest::Error),

    /// Directory provider returned an unusable response.
    #[display("directory provider returned an unusable response: {_0}")]
    #[from(ignore)]
    BadResponse(#[error(not(source))] String),

    /// No directory provider is configured.
    #[display("no directory provider is configured")]
    Unconfigured,
}

/// [`Directory`] implementation selected at startup.
#[derive(Clone, Debug, From)]
pub enum Provider {
    /// [Google Places] lookups.
    ///
    /// [Google Places]: https://developers.google.com/maps/documentation/places
    Places(Places),

    /// No lookups configured.
    Unconfigured(Unconfigured),
}

impl Directory<Select<By<Option<authority::Contact>, GeoPoint>>> for Provider {
    type Ok = Option<authority::Contact>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        select: Select<By<Option<authority::Contact>, GeoPoint>>,
    ) -> Result<Self::Ok, Self::Err> {
        match self {
            Self::Places(d) => d.execute(select).await,
            Self::Unconfigured(d) => d.execute(select).await,
        }
        .map_err(tracerr::wrap!())
    }
}

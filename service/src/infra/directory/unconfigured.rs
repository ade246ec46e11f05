//! No-op [`Directory`] implementation.

use common::{
    operations::{By, Select},
    GeoPoint,
};
use tracerr::Traced;

use crate::{domain::authority, infra::directory};

use super::Directory;

/// [`Directory`] used when no lookup provider is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unconfigured;

impl Directory<Select<By<Option<authority::Contact>, GeoPoint>>>
    for Unconfigured
{
    type Ok = Option<authority::Contact>;
    type Err = Traced<directory::Error>;

    async fn execute(
        &self,
        _: Select<By<Option<authority::Contact>, GeoPoint>>,
    ) -> Result<Self::Ok, Self::Err> {
        Err(tracerr::new!(directory::Error::Unconfigured))
    }
}

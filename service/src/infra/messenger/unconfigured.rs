//! No-op [`Messenger`] implementation.

use common::operations::Dispatch;
use tracerr::Traced;
use tracing as log;

use crate::infra::messenger;

use super::{Alert, Messenger};

/// [`Messenger`] used when no SMS provider is configured.
///
/// Alerts are logged instead of delivered, so the rest of the emergency
/// pipeline stays exercisable in development environments.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unconfigured;

impl Messenger<Dispatch<Alert>> for Unconfigured {
    type Ok = ();
    type Err = Traced<messenger::Error>;

    async fn execute(
        &self,
        Dispatch(alert): Dispatch<Alert>,
    ) -> Result<Self::Ok, Self::Err> {
        log::warn!(to = %alert.to, "SMS delivery is not configured, dropping alert");
        Ok(())
    }
}

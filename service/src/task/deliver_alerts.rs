//! [`DeliverAlerts`] [`Task`].

use std::{convert::Infallible, error::Error};

use common::operations::{By, Perform, Start};
use tokio::sync::mpsc;
use tracerr::Traced;
use tracing as log;

use crate::{
    command::trigger_emergency::{self, FanOut},
    domain::emergency::Event,
    Command, Service,
};

use super::Task;

/// [`Task`] delivering queued guardian alert [`FanOut`]s.
///
/// Covert emergency triggers answer their caller before any alert goes out,
/// so the fan-outs they raise are queued and delivered here instead of on the
/// request path.
#[derive(Clone, Debug)]
pub struct DeliverAlerts<S> {
    /// [`Service`] instance.
    service: S,
}

impl<Db, Sms, Dir>
    Task<Start<By<DeliverAlerts<Self>, mpsc::UnboundedReceiver<FanOut>>>>
    for Service<Db, Sms, Dir>
where
    DeliverAlerts<Service<Db, Sms, Dir>>:
        Task<Perform<FanOut>, Ok = Event, Err: Error>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<
            By<DeliverAlerts<Self>, mpsc::UnboundedReceiver<FanOut>>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let mut queue = by.into_inner();
        let task = DeliverAlerts {
            service: self.clone(),
        };

        while let Some(fan_out) = queue.recv().await {
            let event_id = fan_out.event.id;
            if let Err(e) = task.execute(Perform(fan_out)).await {
                log::error!(
                    event_id = %event_id,
                    "`task::DeliverAlerts` failed to deliver alerts: {e}",
                );
            }
        }

        Ok(())
    }
}

impl<Db, Sms, Dir> Task<Perform<FanOut>>
    for DeliverAlerts<Service<Db, Sms, Dir>>
where
    Service<Db, Sms, Dir>: Command<
        FanOut,
        Ok = Event,
        Err = Traced<trigger_emergency::ExecutionError>,
    >,
{
    type Ok = Event;
    type Err = Traced<trigger_emergency::ExecutionError>;

    async fn execute(
        &self,
        Perform(fan_out): Perform<FanOut>,
    ) -> Result<Self::Ok, Self::Err> {
        self.service.execute(fan_out).await
    }
}

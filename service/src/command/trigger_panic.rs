//! [`Command`] for pressing the panic button.

use common::GeoPoint;
use tracerr::Traced;

use crate::{
    domain::{
        emergency::{Event, Trigger},
        session, user,
    },
    Service,
};

use super::{trigger_emergency, Command, TriggerEmergency};

/// [`Command`] for pressing the panic button.
///
/// Works both inside a [`SafetySession`] and without one: a bare press raises
/// a [`Trigger::Manual`] emergency.
///
/// [`SafetySession`]: crate::domain::SafetySession
#[derive(Clone, Copy, Debug)]
pub struct TriggerPanic {
    /// ID of the user pressing the button.
    pub user_id: user::Id,

    /// ID of the [`session::SafetySession`] the button was pressed within,
    /// if any.
    pub session_id: Option<session::Id>,

    /// Reported [`GeoPoint`] at the moment of the press, if any.
    pub location: Option<GeoPoint>,
}

impl<Db, Sms, Dir> Command<TriggerPanic> for Service<Db, Sms, Dir>
where
    Self: Command<
        TriggerEmergency,
        Ok = Event,
        Err = Traced<trigger_emergency::ExecutionError>,
    >,
{
    type Ok = Event;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: TriggerPanic) -> Result<Self::Ok, Self::Err> {
        let TriggerPanic {
            user_id,
            session_id,
            location,
        } = cmd;

        let trigger = if session_id.is_some() {
            Trigger::PanicButton
        } else {
            Trigger::Manual
        };

        // A panic press is overt: the presser knows help is on the way, so
        // the fan-out runs right here and its result is returned.
        self.execute(TriggerEmergency {
            user_id,
            session_id,
            trigger,
            location,
            covert: false,
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

/// Error of [`TriggerPanic`] [`Command`] execution.
pub type ExecutionError = trigger_emergency::ExecutionError;

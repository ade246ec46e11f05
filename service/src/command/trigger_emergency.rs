//! [`Command`] for raising an emergency.

use common::{
    operations::{By, Dispatch, Insert, Select, Update},
    DateTime, GeoPoint,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        emergency::{self, Event},
        guardian::group,
        session, user, Guardian, SafetySession,
    },
    infra::{
        database,
        messenger::{self, Alert},
        Database, Messenger,
    },
    read,
    Service,
};

#[cfg(doc)]
use crate::task;

use super::Command;

/// [`Command`] for raising an emergency and fanning alerts out to guardians.
///
/// Every trigger path of the subsystem funnels through this one routine: the
/// watchdog, the panic button and the decoy code only differ in the
/// [`emergency::Trigger`] they pass.
#[derive(Clone, Debug)]
pub struct TriggerEmergency {
    /// ID of the user the emergency is raised for.
    pub user_id: user::Id,

    /// ID of the [`SafetySession`] raising the emergency, if any.
    pub session_id: Option<session::Id>,

    /// [`emergency::Trigger`] raising the emergency.
    pub trigger: emergency::Trigger,

    /// Explicitly reported [`GeoPoint`], if any.
    pub location: Option<GeoPoint>,

    /// Indicator whether the trigger must stay hidden from its caller.
    ///
    /// A covert trigger answers before any alert goes out: the [`FanOut`] is
    /// queued for [`task::DeliverAlerts`] instead of running on the caller's
    /// path, so the response betrays nothing (not even by its timing).
    pub covert: bool,
}

impl<Db, Sms, Dir> Command<TriggerEmergency> for Service<Db, Sms, Dir>
where
    Db: Database<
            Update<session::Transition>,
            Ok = Option<SafetySession>,
            Err = Traced<database::Error>,
        > + Database<Insert<Event>, Ok = (), Err = Traced<database::Error>>,
    Self: Command<FanOut, Ok = Event, Err = Traced<ExecutionError>>,
{
    type Ok = Event;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: TriggerEmergency,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let TriggerEmergency {
            user_id,
            session_id,
            trigger,
            location,
            covert,
        } = cmd;

        let (session, group_ids) = if let Some(id) = session_id {
            // Compare-and-set: a session leaves `Active` exactly once, so a
            // concurrent trigger (or the watchdog) losing this race is a
            // no-op.
            let session = self
                .database()
                .execute(Update(session::Transition {
                    id,
                    to: session::Status::Emergency,
                }))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::SessionNotActive(id))
                .map_err(tracerr::wrap!())?;
            let group_ids = session.group_ids.clone();
            (Some(session), group_ids)
        } else {
            (None, vec![])
        };

        let location = location.or_else(|| {
            session
                .as_ref()
                .and_then(|s| s.last_location)
                .map(|l| l.point)
        });

        // The event is persisted before any alert goes out, so a crash
        // mid-fan-out never loses the emergency itself.
        let event = Event {
            id: emergency::Id::new(),
            user_id,
            session_id,
            trigger,
            location,
            address: None,
            notified: vec![],
            created_at: DateTime::now().coerce(),
            status: emergency::Status::Active,
        };
        self.database()
            .execute(Insert(event.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let fan_out = FanOut {
            event: event.clone(),
            body: alert_body(trigger, location, session.as_ref()),
            group_ids,
        };
        if covert {
            if self.alerts().send(fan_out).is_err() {
                log::error!(
                    event_id = %event.id,
                    "alert delivery queue is closed, alerts are lost",
                );
            }
            return Ok(event);
        }
        self.execute(fan_out).await
    }
}

/// Guardian alert fan-out of a raised emergency [`Event`].
///
/// [`TriggerEmergency`] runs it inline for overt triggers and queues it for
/// [`task::DeliverAlerts`] for covert ones.
#[derive(Clone, Debug)]
pub struct FanOut {
    /// Raised [`Event`] to fan alerts out for.
    pub event: Event,

    /// Composed alert text.
    pub body: String,

    /// IDs of the guardian groups the fan-out is restricted to, if any.
    pub group_ids: Vec<group::Id>,
}

impl<Db, Sms, Dir> Command<FanOut> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Vec<Guardian>, read::guardian::ActiveOf>>,
            Ok = Vec<Guardian>,
            Err = Traced<database::Error>,
        > + Database<Update<Event>, Ok = (), Err = Traced<database::Error>>,
    Sms: Messenger<Dispatch<Alert>, Ok = (), Err = Traced<messenger::Error>>,
{
    type Ok = Event;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: FanOut) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let FanOut {
            mut event,
            body,
            group_ids,
        } = cmd;

        let guardians = self
            .database()
            .execute(Select(By::<Vec<Guardian>, _>::new(
                read::guardian::ActiveOf {
                    user_id: event.user_id,
                    group_ids,
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if guardians.is_empty() {
            log::warn!(
                event_id = %event.id,
                "no active guardians to alert about the emergency",
            );
        }

        for guardian in guardians {
            // Partial delivery failure must not fail the whole emergency.
            match self
                .messenger()
                .execute(Dispatch(Alert {
                    to: guardian.phone.clone(),
                    body: body.clone(),
                }))
                .await
            {
                Ok(()) => event.notified.push(guardian.id),
                Err(e) => log::error!(
                    event_id = %event.id,
                    guardian_id = %guardian.id,
                    "failed to alert guardian: {e}",
                ),
            }
        }

        self.database()
            .execute(Update(event.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(event)
    }
}

/// Composes the alert text for the provided emergency details.
fn alert_body(
    trigger: emergency::Trigger,
    location: Option<GeoPoint>,
    session: Option<&SafetySession>,
) -> String {
    use emergency::Trigger as T;

    let mut body = String::from(match trigger {
        T::PanicButton => "EMERGENCY: panic button pressed.",
        T::DecoyCode => "EMERGENCY: duress code entered.",
        T::MissedCheckin => "EMERGENCY: missed a scheduled check-in.",
        T::TimerExpired => "EMERGENCY: safety timer expired unacknowledged.",
        T::Manual => "EMERGENCY: help requested.",
    });

    if let Some(point) = location {
        body.push_str(" Last known location: ");
        body.push_str(&point.map_link());
    }
    if let Some(details) = session.and_then(|s| s.vai_details.as_ref()) {
        if !details.is_expired() {
            body.push_str(" Meeting: ");
            body.push_str(details.as_ref());
        }
    }
    if let Some(authority) = session.and_then(|s| s.nearest_authority.as_ref())
    {
        body.push_str(" Nearest police: ");
        body.push_str(authority.name.as_ref());
    }

    body
}

/// Error of [`TriggerEmergency`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`SafetySession`] is not active anymore.
    #[display("`SafetySession(id: {_0})` is not active")]
    #[from(ignore)]
    SessionNotActive(#[error(not(source))] session::Id),
}

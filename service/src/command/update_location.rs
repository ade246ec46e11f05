//! [`Command`] for reporting a location of a [`SafetySession`].

use common::{
    operations::{By, Dispatch, Insert, Select, Update},
    DateTime, GeoPoint,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        emergency::{message, Event},
        session::{self, LocationPing},
        user, Guardian, SafetySession,
    },
    infra::{
        database,
        messenger::{self, Alert},
        Database, Messenger,
    },
    read,
    Service,
};

use super::Command;

/// [`Command`] for reporting a fresh GPS location of a [`SafetySession`].
///
/// While an emergency is ongoing, each accepted ping is also broadcast to the
/// already alerted guardians and recorded on the emergency event.
#[derive(Clone, Copy, Debug)]
pub struct UpdateLocation {
    /// ID of the user reporting the location.
    pub user_id: user::Id,

    /// ID of the [`SafetySession`] being located.
    pub session_id: session::Id,

    /// Reported [`GeoPoint`].
    pub location: GeoPoint,
}

impl<Db, Sms, Dir> Command<UpdateLocation> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Option<SafetySession>, session::Id>>,
            Ok = Option<SafetySession>,
            Err = Traced<database::Error>,
        > + Database<
            Update<session::Ping>,
            Ok = Option<SafetySession>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Event>, session::Id>>,
            Ok = Option<Event>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Guardian>, read::guardian::ActiveOf>>,
            Ok = Vec<Guardian>,
            Err = Traced<database::Error>,
        > + Database<
            Insert<message::Message>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
    Sms: Messenger<Dispatch<Alert>, Ok = (), Err = Traced<messenger::Error>>,
{
    type Ok = SafetySession;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateLocation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateLocation {
            user_id,
            session_id,
            location,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<SafetySession>, _>::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|s| s.user_id == user_id)
            .ok_or(E::SessionNotExists(session_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let session = self
            .database()
            .execute(Update(session::Ping {
                id: session_id,
                location: LocationPing {
                    point: location,
                    at: DateTime::now().coerce(),
                },
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SessionNotTrackable(session_id))
            .map_err(tracerr::wrap!())?;

        if session.status == session::Status::Emergency {
            self.broadcast_ping(&session, location)
                .await
                .map_err(tracerr::wrap!())?;
        }

        Ok(session)
    }
}

impl<Db, Sms, Dir> Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Option<Event>, session::Id>>,
            Ok = Option<Event>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Guardian>, read::guardian::ActiveOf>>,
            Ok = Vec<Guardian>,
            Err = Traced<database::Error>,
        > + Database<
            Insert<message::Message>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
    Sms: Messenger<Dispatch<Alert>, Ok = (), Err = Traced<messenger::Error>>,
{
    /// Broadcasts the accepted ping to the guardians already alerted about
    /// the ongoing emergency of the `session`.
    async fn broadcast_ping(
        &self,
        session: &SafetySession,
        location: GeoPoint,
    ) -> Result<(), Traced<ExecutionError>> {
        use ExecutionError as E;

        let Some(event) = self
            .database()
            .execute(Select(By::<Option<Event>, _>::new(session.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            return Ok(());
        };

        let body = format!("Location update: {}", location.map_link());

        // Recorded regardless of the delivery outcome.
        self.database()
            .execute(Insert(message::Message {
                id: message::Id::new(),
                event_id: event.id,
                body: message::Body::new(body.clone())
                    .expect("map link fits the `Body` limits"),
                sent_at: DateTime::now().coerce(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let guardians = self
            .database()
            .execute(Select(By::<Vec<Guardian>, _>::new(
                read::guardian::ActiveOf {
                    user_id: session.user_id,
                    group_ids: session.group_ids.clone(),
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        for guardian in guardians
            .into_iter()
            .filter(|g| event.notified.contains(&g.id))
        {
            if let Err(e) = self
                .messenger()
                .execute(Dispatch(Alert {
                    to: guardian.phone.clone(),
                    body: body.clone(),
                }))
                .await
            {
                log::error!(
                    event_id = %event.id,
                    guardian_id = %guardian.id,
                    "failed to broadcast location update: {e}",
                );
            }
        }

        Ok(())
    }
}

/// Error of [`UpdateLocation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`SafetySession`] accepts no location updates anymore.
    #[display("`SafetySession(id: {_0})` accepts no location updates")]
    #[from(ignore)]
    SessionNotTrackable(#[error(not(source))] session::Id),

    /// [`SafetySession`] with the provided ID does not exist.
    #[display("`SafetySession(id: {_0})` does not exist")]
    #[from(ignore)]
    SessionNotExists(#[error(not(source))] session::Id),
}

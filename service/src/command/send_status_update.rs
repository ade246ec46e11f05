//! [`Command`] for sending a status update during an emergency.

use common::{
    operations::{By, Dispatch, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        emergency::{self, message, Event},
        user, Guardian,
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

/// [`Command`] for sending a free-text status update to the guardians already
/// alerted about an ongoing emergency.
#[derive(Clone, Debug)]
pub struct SendStatusUpdate {
    /// ID of the user sending the update.
    pub user_id: user::Id,

    /// ID of the [`Event`] the update is about.
    pub event_id: emergency::Id,

    /// [`message::Body`] of the update.
    pub body: message::Body,
}

impl<Db, Sms, Dir> Command<SendStatusUpdate> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Option<Event>, emergency::Id>>,
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
    type Ok = message::Message;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SendStatusUpdate,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SendStatusUpdate {
            user_id,
            event_id,
            body,
        } = cmd;

        let event = self
            .database()
            .execute(Select(By::<Option<Event>, _>::new(event_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|e| e.user_id == user_id)
            .ok_or(E::EventNotExists(event_id))
            .map_err(tracerr::wrap!())?;
        if event.status != emergency::Status::Active {
            return Err(tracerr::new!(E::EventNotActive(event_id)));
        }

        // Recorded regardless of the delivery outcome.
        let message = message::Message {
            id: message::Id::new(),
            event_id: event.id,
            body,
            sent_at: DateTime::now().coerce(),
        };
        self.database()
            .execute(Insert(message.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let guardians = self
            .database()
            .execute(Select(By::<Vec<Guardian>, _>::new(
                read::guardian::ActiveOf {
                    user_id,
                    group_ids: vec![],
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
                    body: message.body.to_string(),
                }))
                .await
            {
                log::error!(
                    event_id = %event.id,
                    guardian_id = %guardian.id,
                    "failed to deliver status update: {e}",
                );
            }
        }

        Ok(message)
    }
}

/// Error of [`SendStatusUpdate`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Event`] is resolved already.
    #[display("`emergency::Event(id: {_0})` is not active")]
    #[from(ignore)]
    EventNotActive(#[error(not(source))] emergency::Id),

    /// [`Event`] with the provided ID does not exist.
    #[display("`emergency::Event(id: {_0})` does not exist")]
    #[from(ignore)]
    EventNotExists(#[error(not(source))] emergency::Id),
}

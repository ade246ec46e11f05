//! [`Command`] for checking in on a [`SafetySession`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{session, user, SafetySession},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for checking in on a [`SafetySession`].
#[derive(Clone, Copy, Debug)]
pub struct CheckIn {
    /// ID of the user checking in.
    pub user_id: user::Id,

    /// ID of the [`SafetySession`] being checked in.
    pub session_id: session::Id,
}

impl<Db, Sms, Dir> Command<CheckIn> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Option<SafetySession>, session::Id>>,
            Ok = Option<SafetySession>,
            Err = Traced<database::Error>,
        > + Database<
            Update<session::CheckIn>,
            Ok = Option<SafetySession>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = SafetySession;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CheckIn) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CheckIn {
            user_id,
            session_id,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<SafetySession>, _>::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|s| s.user_id == user_id)
            .ok_or(E::SessionNotExists(session_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        // Compare-and-set: refreshes the check-in mark only while the session
        // is still active, so a check-in racing the watchdog cannot revive an
        // escalated session.
        self.database()
            .execute(Update(session::CheckIn {
                id: session_id,
                at: DateTime::now().coerce(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SessionNotActive(session_id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`CheckIn`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`SafetySession`] is not active anymore.
    #[display("`SafetySession(id: {_0})` is not active")]
    #[from(ignore)]
    SessionNotActive(#[error(not(source))] session::Id),

    /// [`SafetySession`] with the provided ID does not exist.
    #[display("`SafetySession(id: {_0})` does not exist")]
    #[from(ignore)]
    SessionNotExists(#[error(not(source))] session::Id),
}

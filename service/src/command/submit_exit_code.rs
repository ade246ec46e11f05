//! [`Command`] for submitting an exit code of a [`SafetySession`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        emergency::{Event, Trigger},
        safety_code::{Classification, Codes, ExitCode},
        session, user, SafetySession,
    },
    infra::{database, Database},
    Service,
};

use super::{trigger_emergency, Command, TriggerEmergency};

/// [`Command`] for ending a [`SafetySession`] with an exit code.
///
/// The decoy code path is outwardly indistinguishable from the safe one: the
/// same [`Ended`] result and the same error taxonomy, while the emergency it
/// raises stays entirely server-side.
#[derive(Clone, Debug)]
pub struct SubmitExitCode {
    /// ID of the user submitting the code.
    pub user_id: user::Id,

    /// ID of the [`SafetySession`] being ended.
    pub session_id: session::Id,

    /// Submitted [`ExitCode`].
    pub code: ExitCode,
}

/// Result of a successfully accepted exit code.
#[derive(Clone, Copy, Debug)]
pub struct Ended {
    /// ID of the ended [`SafetySession`].
    pub session_id: session::Id,

    /// [`DateTime`] when the [`SafetySession`] was ended.
    pub ended_at: DateTime,
}

impl<Db, Sms, Dir> Command<SubmitExitCode> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Option<SafetySession>, session::Id>>,
            Ok = Option<SafetySession>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Codes>, user::Id>>,
            Ok = Option<Codes>,
            Err = Traced<database::Error>,
        > + Database<
            Update<session::Transition>,
            Ok = Option<SafetySession>,
            Err = Traced<database::Error>,
        >,
    Self: Command<
        TriggerEmergency,
        Ok = Event,
        Err = Traced<trigger_emergency::ExecutionError>,
    >,
{
    type Ok = Ended;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SubmitExitCode,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitExitCode {
            user_id,
            session_id,
            code,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<SafetySession>, _>::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|s| s.user_id == user_id)
            .ok_or(E::SessionNotExists(session_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let codes = self
            .database()
            .execute(Select(By::<Option<Codes>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SafetyCodesNotSet)
            .map_err(tracerr::wrap!())?;

        match codes.classify(&code) {
            Classification::Safe => {
                self.database()
                    .execute(Update(session::Transition {
                        id: session_id,
                        to: session::Status::Completed,
                    }))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::SessionNotActive(session_id))
                    .map_err(tracerr::wrap!())
                    .map(drop)?;
            }
            Classification::Decoy => {
                // The covert path: the session transitions and the emergency
                // is durably recorded, while guardians are alerted off this
                // request path and the caller observes the same `Ended`.
                self.execute(TriggerEmergency {
                    user_id,
                    session_id: Some(session_id),
                    trigger: Trigger::DecoyCode,
                    location: None,
                    covert: true,
                })
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            }
            Classification::Unknown => {
                return Err(tracerr::new!(E::WrongCode));
            }
        }

        Ok(Ended {
            session_id,
            ended_at: DateTime::now(),
        })
    }
}

/// Error of [`SubmitExitCode`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// User has not set up safety codes yet.
    #[display("safety codes are not set up")]
    SafetyCodesNotSet,

    /// [`SafetySession`] is not active anymore.
    #[display("`SafetySession(id: {_0})` is not active")]
    #[from(ignore)]
    SessionNotActive(#[error(not(source))] session::Id),

    /// [`SafetySession`] with the provided ID does not exist.
    #[display("`SafetySession(id: {_0})` does not exist")]
    #[from(ignore)]
    SessionNotExists(#[error(not(source))] session::Id),

    /// Submitted code matches neither of the configured codes.
    #[display("submitted code is not recognized")]
    WrongCode,
}

impl From<trigger_emergency::ExecutionError> for ExecutionError {
    fn from(e: trigger_emergency::ExecutionError) -> Self {
        use trigger_emergency::ExecutionError as TE;

        match e {
            TE::Db(e) => Self::Db(e),
            TE::SessionNotActive(id) => Self::SessionNotActive(id),
        }
    }
}

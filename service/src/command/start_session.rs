//! [`Command`] for starting a new [`SafetySession`].

use std::time::Duration;

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        encounter,
        guardian::group,
        safety_code::Codes,
        session::{self, VaiDetails},
        user, Encounter, Guardian, SafetySession,
    },
    infra::{database, Database},
    read,
    Service,
};

use super::Command;

/// Longest monitoring period a single [`SafetySession`] may cover.
const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// [`Command`] for starting a new [`SafetySession`].
#[derive(Clone, Debug)]
pub struct StartSession {
    /// ID of the user to be monitored.
    pub user_id: user::Id,

    /// Scheduled length of the monitoring.
    pub duration: Duration,

    /// [`group::Group`]s whose members should be alerted on emergency.
    ///
    /// Empty means all active guardians of the user.
    pub group_ids: Vec<group::Id>,

    /// [`Encounter`] this [`SafetySession`] monitors, if any.
    pub encounter_id: Option<encounter::Id>,

    /// Identity details of the other party to expose to guardians, if any.
    pub vai_details: Option<VaiDetails>,
}

impl<Db, Sms, Dir> Command<StartSession> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Option<Codes>, user::Id>>,
            Ok = Option<Codes>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Guardian>, read::guardian::ActiveOf>>,
            Ok = Vec<Guardian>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Encounter>, encounter::Id>>,
            Ok = Option<Encounter>,
            Err = Traced<database::Error>,
        > + Database<
            Insert<SafetySession>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = SafetySession;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: StartSession) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let StartSession {
            user_id,
            duration,
            group_ids,
            encounter_id,
            vai_details,
        } = cmd;

        if duration.is_zero() || duration > MAX_DURATION {
            return Err(tracerr::new!(E::InvalidDuration));
        }

        // Without configured exit codes the session could never be ended
        // covertly, so starting one is refused upfront.
        self.database()
            .execute(Select(By::<Option<Codes>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SafetyCodesNotSet)
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let guardians = self
            .database()
            .execute(Select(By::<Vec<Guardian>, _>::new(
                read::guardian::ActiveOf {
                    user_id,
                    group_ids: group_ids.clone(),
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if guardians.is_empty() {
            return Err(tracerr::new!(E::NoActiveGuardians));
        }

        if let Some(encounter_id) = encounter_id {
            let encounter = self
                .database()
                .execute(Select(By::<Option<Encounter>, _>::new(encounter_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|e| e.is_party(user_id))
                .ok_or(E::EncounterNotExists(encounter_id))
                .map_err(tracerr::wrap!())?;
            if encounter.is_closed() || !encounter.dateguard_window.is_open() {
                return Err(tracerr::new!(E::EncounterWindowClosed(
                    encounter_id
                )));
            }
        }

        let now = DateTime::now();
        let session = SafetySession {
            id: session::Id::new(),
            user_id,
            status: session::Status::Active,
            started_at: now.coerce(),
            ends_at: (now + duration).coerce(),
            last_check_in: None,
            last_location: None,
            group_ids,
            encounter_id,
            vai_details,
            nearest_authority: None,
        };

        self.database()
            .execute(Insert(session.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(session)
    }
}

/// Error of [`StartSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Encounter`] with the provided ID does not exist (or the user is not
    /// one of its parties).
    #[display("`Encounter(id: {_0})` does not exist")]
    #[from(ignore)]
    EncounterNotExists(#[error(not(source))] encounter::Id),

    /// Linked [`Encounter`]'s window is closed already.
    #[display("`Encounter(id: {_0})` window is closed already")]
    #[from(ignore)]
    EncounterWindowClosed(#[error(not(source))] encounter::Id),

    /// Requested monitoring period is unreasonable.
    #[display("monitoring period must be non-zero and at most 24 hours")]
    InvalidDuration,

    /// User has no active guardians in the selected scope.
    #[display("no active guardians to alert")]
    NoActiveGuardians,

    /// User has not set up safety codes yet.
    #[display("safety codes are not set up")]
    SafetyCodesNotSet,
}

//! [`Command`] for recording a new [`Encounter`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        encounter::{self, Window},
        user, Encounter,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for recording a mutually verified [`Encounter`].
///
/// Issued by the verification subsystem once both parties confirmed the
/// meeting; opens both review and DateGuard windows.
#[derive(Clone, Copy, Debug)]
pub struct RecordEncounter {
    /// ID of the verification session the [`Encounter`] originates from.
    pub verification_id: encounter::VerificationId,

    /// ID of the providing party.
    pub provider_id: user::Id,

    /// ID of the client party.
    pub client_id: user::Id,
}

impl<Db, Sms, Dir> Command<RecordEncounter> for Service<Db, Sms, Dir>
where
    Db: Database<Insert<Encounter>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Encounter;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RecordEncounter,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RecordEncounter {
            verification_id,
            provider_id,
            client_id,
        } = cmd;

        if provider_id == client_id {
            return Err(tracerr::new!(E::SameParty(provider_id)));
        }

        let encounter = Encounter {
            id: encounter::Id::new(),
            verification_id,
            provider_id,
            client_id,
            status: encounter::Status::Accepted,
            accepted_at: DateTime::now().coerce(),
            reviews_window: Window::open(),
            dateguard_window: Window::open(),
            publish_due_at: None,
        };

        self.database()
            .execute(Insert(encounter.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(encounter)
    }
}

/// Error of [`RecordEncounter`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Both parties of the [`Encounter`] are the same user.
    #[display("`User(id: {_0})` cannot meet themselves")]
    #[from(ignore)]
    SameParty(#[error(not(source))] user::Id),
}

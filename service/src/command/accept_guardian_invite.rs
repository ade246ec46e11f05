//! [`Command`] for accepting a [`Guardian`] invitation.

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{guardian, Guardian},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for accepting a [`Guardian`] invitation.
#[derive(Clone, Copy, Debug, From)]
pub struct AcceptGuardianInvite {
    /// ID of the [`Guardian`] accepting the invitation.
    pub guardian_id: guardian::Id,
}

impl<Db, Sms, Dir> Command<AcceptGuardianInvite> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Option<Guardian>, guardian::Id>>,
            Ok = Option<Guardian>,
            Err = Traced<database::Error>,
        > + Database<Update<Guardian>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Guardian;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AcceptGuardianInvite,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AcceptGuardianInvite { guardian_id } = cmd;

        let mut guardian = self
            .database()
            .execute(Select(By::<Option<Guardian>, _>::new(guardian_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::GuardianNotExists(guardian_id))
            .map_err(tracerr::wrap!())?;

        guardian
            .accept(DateTime::now().coerce())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        self.database()
            .execute(Update(guardian.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(guardian)
    }
}

/// Error of [`AcceptGuardianInvite`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Guardian`] has accepted the invitation already.
    #[display("{_0}")]
    AlreadyActive(guardian::AlreadyActive),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Guardian`] with the provided ID does not exist.
    #[display("`Guardian(id: {_0})` does not exist")]
    #[from(ignore)]
    GuardianNotExists(#[error(not(source))] guardian::Id),
}

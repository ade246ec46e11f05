//! [`Command`] for removing a [`Guardian`].

use common::operations::{By, Delete, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{guardian, user, Guardian},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for removing a [`Guardian`].
#[derive(Clone, Copy, Debug)]
pub struct RemoveGuardian {
    /// ID of the user removing the [`Guardian`].
    pub user_id: user::Id,

    /// ID of the [`Guardian`] to remove.
    pub guardian_id: guardian::Id,
}

impl<Db, Sms, Dir> Command<RemoveGuardian> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Option<Guardian>, guardian::Id>>,
            Ok = Option<Guardian>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Guardian, guardian::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RemoveGuardian,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RemoveGuardian {
            user_id,
            guardian_id,
        } = cmd;

        let guardian = self
            .database()
            .execute(Select(By::<Option<Guardian>, _>::new(guardian_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|g| g.user_id == user_id)
            .ok_or(E::GuardianNotExists(guardian_id))
            .map_err(tracerr::wrap!())?;

        self.database()
            .execute(Delete(By::<Guardian, _>::new(guardian.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`RemoveGuardian`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Guardian`] with the provided ID does not exist.
    #[display("`Guardian(id: {_0})` does not exist")]
    #[from(ignore)]
    GuardianNotExists(#[error(not(source))] guardian::Id),
}

//! [`Command`] for inviting a new [`Guardian`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        guardian::{self, group, Group},
        user, Guardian,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for inviting a new [`Guardian`].
#[derive(Clone, Debug)]
pub struct InviteGuardian {
    /// ID of the user inviting the [`Guardian`].
    pub user_id: user::Id,

    /// [`guardian::Name`] of the new [`Guardian`].
    pub name: guardian::Name,

    /// [`guardian::Phone`] of the new [`Guardian`].
    pub phone: guardian::Phone,

    /// [`Group`]s to place the new [`Guardian`] into.
    pub group_ids: Vec<group::Id>,
}

impl<Db, Sms, Dir> Command<InviteGuardian> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Vec<Group>, user::Id>>,
            Ok = Vec<Group>,
            Err = Traced<database::Error>,
        > + Database<Insert<Guardian>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Guardian;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: InviteGuardian,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let InviteGuardian {
            user_id,
            name,
            phone,
            group_ids,
        } = cmd;

        if !group_ids.is_empty() {
            let owned = self
                .database()
                .execute(Select(By::<Vec<Group>, _>::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if let Some(id) = group_ids
                .iter()
                .find(|id| !owned.iter().any(|g| g.id == **id))
            {
                return Err(tracerr::new!(E::GroupNotExists(*id)));
            }
        }

        let guardian = Guardian {
            id: guardian::Id::new(),
            user_id,
            name,
            phone,
            status: guardian::Status::Pending,
            group_ids,
            invited_at: DateTime::now().coerce(),
            accepted_at: None,
        };

        self.database()
            .execute(Insert(guardian.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(guardian)
    }
}

/// Error of [`InviteGuardian`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Group`] with the provided ID does not exist.
    #[display("`Group(id: {_0})` does not exist")]
    #[from(ignore)]
    GroupNotExists(#[error(not(source))] group::Id),
}

//! [`Command`] for creating a new [`Group`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        guardian::{self, group, Group},
        user,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Group`] of [`Guardian`]s.
///
/// [`Guardian`]: crate::domain::Guardian
#[derive(Clone, Debug)]
pub struct CreateGuardianGroup {
    /// ID of the user owning the new [`Group`].
    pub user_id: user::Id,

    /// [`guardian::Name`] of the new [`Group`].
    pub name: guardian::Name,
}

impl<Db, Sms, Dir> Command<CreateGuardianGroup> for Service<Db, Sms, Dir>
where
    Db: Database<Insert<Group>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Group;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateGuardianGroup,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateGuardianGroup { user_id, name } = cmd;

        let group = Group {
            id: group::Id::new(),
            user_id,
            name,
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(group.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(group)
    }
}

/// Error of [`CreateGuardianGroup`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

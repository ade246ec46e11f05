//! [`Command`] for setting up safety [`Codes`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        safety_code::{CodeHash, Codes, ExitCode},
        user,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for setting up the safe and decoy exit [`Codes`] of a user.
///
/// Replaces any previously configured pair; only hashes are persisted.
#[derive(Clone, Debug)]
pub struct SetSafetyCodes {
    /// ID of the user setting the [`Codes`] up.
    pub user_id: user::Id,

    /// Safe [`ExitCode`], ending a session normally.
    pub safe: ExitCode,

    /// Decoy [`ExitCode`], covertly raising an emergency.
    pub decoy: ExitCode,
}

impl<Db, Sms, Dir> Command<SetSafetyCodes> for Service<Db, Sms, Dir>
where
    Db: Database<Insert<Codes>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SetSafetyCodes,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SetSafetyCodes {
            user_id,
            safe,
            decoy,
        } = cmd;

        let safe = CodeHash::new(&safe);
        let decoy = CodeHash::new(&decoy);

        // Identical codes would make the decoy signal unexpressable.
        if safe == decoy {
            return Err(tracerr::new!(E::CodesIdentical));
        }

        self.database()
            .execute(Insert(Codes {
                user_id,
                safe,
                decoy,
                created_at: DateTime::now().coerce(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`SetSafetyCodes`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Safe and decoy codes are the same.
    #[display("safe and decoy codes must differ")]
    CodesIdentical,

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

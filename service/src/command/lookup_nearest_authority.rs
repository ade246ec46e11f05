//! [`Command`] for looking up the nearest authority.

use common::{
    operations::{By, Select, Update},
    GeoPoint,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{authority, session, user, SafetySession},
    infra::{database, directory, Database, Directory},
    Service,
};

use super::Command;

/// [`Command`] for resolving the law-enforcement point of contact nearest to
/// the last known location of a [`SafetySession`].
///
/// The result is cached on the session, so repeated lookups during one
/// emergency do not hit the directory provider again.
#[derive(Clone, Copy, Debug)]
pub struct LookupNearestAuthority {
    /// ID of the user looking up.
    pub user_id: user::Id,

    /// ID of the [`SafetySession`] to look up for.
    pub session_id: session::Id,
}

impl<Db, Sms, Dir> Command<LookupNearestAuthority> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Option<SafetySession>, session::Id>>,
            Ok = Option<SafetySession>,
            Err = Traced<database::Error>,
        > + Database<
            Update<session::AuthorityCache>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
    Dir: Directory<
        Select<By<Option<authority::Contact>, GeoPoint>>,
        Ok = Option<authority::Contact>,
        Err = Traced<directory::Error>,
    >,
{
    type Ok = authority::Contact;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: LookupNearestAuthority,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let LookupNearestAuthority {
            user_id,
            session_id,
        } = cmd;

        let session = self
            .database()
            .execute(Select(By::<Option<SafetySession>, _>::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|s| s.user_id == user_id)
            .ok_or(E::SessionNotExists(session_id))
            .map_err(tracerr::wrap!())?;

        if let Some(contact) = session.nearest_authority {
            return Ok(contact);
        }

        let point = session
            .last_location
            .map(|l| l.point)
            .ok_or(E::LocationUnknown(session_id))
            .map_err(tracerr::wrap!())?;

        let contact = self
            .directory()
            .execute(Select(By::<Option<authority::Contact>, _>::new(point)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NoAuthorityFound)
            .map_err(tracerr::wrap!())?;

        self.database()
            .execute(Update(session::AuthorityCache {
                id: session_id,
                contact: contact.clone(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(contact)
    }
}

/// Error of [`LookupNearestAuthority`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Directory`] error.
    #[display("`Directory` operation failed: {_0}")]
    Directory(directory::Error),

    /// [`SafetySession`] has no known location to look up around.
    #[display("`SafetySession(id: {_0})` has no known location")]
    #[from(ignore)]
    LocationUnknown(#[error(not(source))] session::Id),

    /// Directory found no authority around the location.
    #[display("no authority found around the location")]
    NoAuthorityFound,

    /// [`SafetySession`] with the provided ID does not exist.
    #[display("`SafetySession(id: {_0})` does not exist")]
    #[from(ignore)]
    SessionNotExists(#[error(not(source))] session::Id),
}

//! [`Command`] for authorizing a user [`Session`].

use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::user::{self, Session},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a user [`Session`].
///
/// Tokens are issued by the external identity service sharing the decoding
/// key, so authorization here is pure validation.
#[derive(Clone, Debug, From)]
pub struct AuthorizeSession {
    /// [`Session`] token to authorize.
    pub token: user::Token,
}

impl<Db, Sms, Dir> Command<AuthorizeSession> for Service<Db, Sms, Dir> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        Ok(session)
    }
}

/// Error of [`AuthorizeSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),
}

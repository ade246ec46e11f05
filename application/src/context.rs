//! Request authentication definitions.

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use common::DateTime;
use service::{
    command::{self, Command as _},
    domain::user,
};

use crate::{define_error, AsError, Error, Service};

/// Authenticated [`Session`] of the current HTTP request.
#[derive(Clone, Debug)]
pub struct Auth(pub Session);

/// Authenticated session of a user.
#[derive(Clone, Copy, Debug)]
pub struct Session {
    /// ID of the user this [`Session`] belongs to.
    pub user_id: user::Id,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: DateTime,
}

#[async_trait]
impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        let bearer = match parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
        {
            Ok(TypedHeader(Authorization(bearer))) => bearer,
            Err(e) => {
                return Err(if e.is_missing() {
                    AuthError::AuthorizationRequired.into()
                } else {
                    e.into_error()
                });
            }
        };

        #[expect(unsafe_code, reason = "specified in correct header")]
        let token =
            unsafe { user::Token::new_unchecked(bearer.token().to_owned()) };

        service
            .execute(command::AuthorizeSession { token })
            .await
            .map(|s| {
                Self(Session {
                    user_id: s.user_id,
                    expires_at: s.expires_at.coerce(),
                })
            })
            .map_err(|e| e.as_error())
    }
}

impl AsError for command::authorize_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::JsonWebTokenDecodeError(_) => {
                Some(AuthError::AuthorizationRequired.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,
    }
}

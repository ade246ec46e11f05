//! Guardian endpoints.

use axum::{extract::Path, Extension, Json};
use serde::{Deserialize, Serialize};
use service::{
    command::{
        accept_guardian_invite, create_guardian_group, invite_guardian,
        remove_guardian, AcceptGuardianInvite, Command as _,
        CreateGuardianGroup, InviteGuardian, RemoveGuardian,
    },
    domain::guardian::{self, group},
    query, Query as _,
};

use crate::{define_error, AsError as _, Auth, Error, Service};

/// Guardian, as exposed by the API.
#[derive(Debug, Serialize)]
pub struct Guardian {
    /// ID of this guardian.
    pub id: guardian::Id,

    /// Name of this guardian.
    pub name: String,

    /// Phone number alerts are sent to.
    pub phone: String,

    /// Status of this guardian.
    pub status: String,

    /// Groups this guardian belongs to.
    pub group_ids: Vec<group::Id>,

    /// When this guardian was invited.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub invited_at: guardian::InvitationDateTime,

    /// When this guardian accepted the invitation, if they did.
    #[serde(with = "common::datetime::serde::rfc3339::option")]
    pub accepted_at: Option<guardian::AcceptanceDateTime>,
}

impl From<guardian::Guardian> for Guardian {
    fn from(g: guardian::Guardian) -> Self {
        Self {
            id: g.id,
            name: g.name.to_string(),
            phone: g.phone.to_string(),
            status: g.status.to_string(),
            group_ids: g.group_ids,
            invited_at: g.invited_at,
            accepted_at: g.accepted_at,
        }
    }
}

/// Guardian group, as exposed by the API.
#[derive(Debug, Serialize)]
pub struct Group {
    /// ID of this group.
    pub id: group::Id,

    /// Name of this group.
    pub name: String,

    /// When this group was created.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: group::CreationDateTime,
}

impl From<group::Group> for Group {
    fn from(g: group::Group) -> Self {
        Self {
            id: g.id,
            name: g.name.to_string(),
            created_at: g.created_at,
        }
    }
}

/// `GET /guardians`
///
/// Lists all guardians of the authenticated user.
pub async fn list(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
) -> Result<Json<Vec<Guardian>>, Error> {
    service
        .execute(query::guardian::OfUser::by(auth.user_id))
        .await
        .map(|gs| Json(gs.into_iter().map(Into::into).collect()))
        .map_err(|e| e.as_error())
}

/// Request body for inviting a guardian.
#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    /// Name of the guardian.
    pub name: String,

    /// Phone number of the guardian.
    pub phone: String,

    /// Groups to place the guardian into.
    #[serde(default)]
    pub group_ids: Vec<group::Id>,
}

/// `POST /guardians`
///
/// Invites a new guardian for the authenticated user.
pub async fn invite(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Json(req): Json<InviteRequest>,
) -> Result<Json<Guardian>, Error> {
    let name = guardian::Name::new(req.name)
        .ok_or(GuardianError::InvalidName)
        .map_err(Error::from)?;
    let phone = guardian::Phone::new(req.phone)
        .ok_or(GuardianError::InvalidPhone)
        .map_err(Error::from)?;

    service
        .execute(InviteGuardian {
            user_id: auth.user_id,
            name,
            phone,
            group_ids: req.group_ids,
        })
        .await
        .map(|g| Json(g.into()))
        .map_err(|e| e.as_error())
}

/// `POST /guardians/:id/accept`
///
/// Accepts a guardian invitation.
///
/// Reached via the invitation link sent to the guardian, so it carries no
/// bearer authentication.
pub async fn accept(
    Extension(service): Extension<Service>,
    Path(id): Path<guardian::Id>,
) -> Result<Json<Guardian>, Error> {
    service
        .execute(AcceptGuardianInvite { guardian_id: id })
        .await
        .map(|g| Json(g.into()))
        .map_err(|e| e.as_error())
}

/// `DELETE /guardians/:id`
///
/// Removes a guardian of the authenticated user.
pub async fn remove(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Path(id): Path<guardian::Id>,
) -> Result<http::StatusCode, Error> {
    service
        .execute(RemoveGuardian {
            user_id: auth.user_id,
            guardian_id: id,
        })
        .await
        .map(|()| http::StatusCode::NO_CONTENT)
        .map_err(|e| e.as_error())
}

/// `GET /guardian-groups`
///
/// Lists all guardian groups of the authenticated user.
pub async fn groups(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
) -> Result<Json<Vec<Group>>, Error> {
    service
        .execute(query::guardian::GroupsOfUser::by(auth.user_id))
        .await
        .map(|gs| Json(gs.into_iter().map(Into::into).collect()))
        .map_err(|e| e.as_error())
}

/// Request body for creating a guardian group.
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    /// Name of the group.
    pub name: String,
}

/// `POST /guardian-groups`
///
/// Creates a new guardian group for the authenticated user.
pub async fn create_group(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Json(req): Json<CreateGroupRequest>,
) -> Result<Json<Group>, Error> {
    let name = guardian::Name::new(req.name)
        .ok_or(GuardianError::InvalidName)
        .map_err(Error::from)?;

    service
        .execute(CreateGuardianGroup {
            user_id: auth.user_id,
            name,
        })
        .await
        .map(|g| Json(g.into()))
        .map_err(|e| e.as_error())
}

impl crate::AsError for invite_guardian::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::GroupNotExists(_) => {
                Some(GuardianError::GroupNotExists.into())
            }
        }
    }
}

impl crate::AsError for accept_guardian_invite::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::AlreadyActive(_) => Some(GuardianError::AlreadyActive.into()),
            Self::Db(e) => e.try_as_error(),
            Self::GuardianNotExists(_) => Some(GuardianError::NotExists.into()),
        }
    }
}

impl crate::AsError for remove_guardian::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::GuardianNotExists(_) => Some(GuardianError::NotExists.into()),
        }
    }
}

impl crate::AsError for create_guardian_group::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

define_error! {
    enum GuardianError {
        #[code = "GUARDIAN_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Guardian does not exist"]
        NotExists,

        #[code = "GUARDIAN_ALREADY_ACTIVE"]
        #[status = CONFLICT]
        #[message = "Guardian is already active"]
        AlreadyActive,

        #[code = "GROUP_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Guardian group does not exist"]
        GroupNotExists,

        #[code = "INVALID_NAME"]
        #[status = BAD_REQUEST]
        #[message = "Name must be non-empty, trimmed and at most 128 characters"]
        InvalidName,

        #[code = "INVALID_PHONE"]
        #[status = BAD_REQUEST]
        #[message = "Phone number format is not recognized"]
        InvalidPhone,
    }
}

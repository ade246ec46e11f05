//! Safety session endpoints.

use axum::{extract::Path, Extension, Json};
use common::GeoPoint;
use serde::{Deserialize, Serialize};
use service::{
    command::{
        check_in, lookup_nearest_authority, set_safety_codes, start_session,
        submit_exit_code, update_location, CheckIn, Command as _,
        LookupNearestAuthority, SetSafetyCodes, StartSession, SubmitExitCode,
        UpdateLocation,
    },
    domain::{
        authority, encounter,
        guardian::group,
        safety_code::ExitCode,
        session::{self, SafetySession, VaiDetails},
    },
    query, Query as _,
};

use crate::{define_error, AsError as _, Auth, Error, Service};

/// Safety session, as exposed by the API.
#[derive(Debug, Serialize)]
pub struct Session {
    /// ID of this session.
    pub id: session::Id,

    /// Status of this session.
    pub status: String,

    /// When the monitoring started.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub started_at: session::StartDateTime,

    /// When the monitoring is scheduled to end.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub ends_at: session::ExpirationDateTime,

    /// When the last check-in happened, if any did.
    #[serde(with = "common::datetime::serde::rfc3339::option")]
    pub last_check_in: Option<session::CheckInDateTime>,

    /// Last reported location, if any.
    pub last_location: Option<session::LocationPing>,

    /// Guardian groups to be alerted on emergency.
    pub group_ids: Vec<group::Id>,

    /// Encounter this session monitors, if any.
    pub encounter_id: Option<encounter::Id>,

    /// Identity details of the other party exposed to guardians, if any.
    pub vai_details: Option<String>,

    /// Cached nearest-authority lookup result, if any.
    pub nearest_authority: Option<authority::Contact>,
}

impl From<SafetySession> for Session {
    fn from(s: SafetySession) -> Self {
        Self {
            id: s.id,
            status: s.status.to_string(),
            started_at: s.started_at,
            ends_at: s.ends_at,
            last_check_in: s.last_check_in,
            last_location: s.last_location,
            group_ids: s.group_ids,
            encounter_id: s.encounter_id,
            vai_details: s.vai_details.map(|d| d.to_string()),
            nearest_authority: s.nearest_authority,
        }
    }
}

/// Request body for setting up safety codes.
#[derive(Debug, Deserialize)]
pub struct SetCodesRequest {
    /// Safe exit code, ending a session normally.
    pub safe: String,

    /// Decoy exit code, covertly raising an emergency.
    pub decoy: String,
}

/// `PUT /safety-codes`
///
/// Sets up (or replaces) the safe and decoy exit codes of the authenticated
/// user.
pub async fn set_codes(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Json(req): Json<SetCodesRequest>,
) -> Result<http::StatusCode, Error> {
    let safe = ExitCode::new(req.safe)
        .ok_or(SessionError::InvalidExitCode)
        .map_err(Error::from)?;
    let decoy = ExitCode::new(req.decoy)
        .ok_or(SessionError::InvalidExitCode)
        .map_err(Error::from)?;

    service
        .execute(SetSafetyCodes {
            user_id: auth.user_id,
            safe,
            decoy,
        })
        .await
        .map(|()| http::StatusCode::NO_CONTENT)
        .map_err(|e| e.as_error())
}

/// Request body for starting a safety session.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// Scheduled length of the monitoring (e.g. `2h 30m`).
    #[serde(with = "humantime_serde")]
    pub duration: std::time::Duration,

    /// Guardian groups to be alerted on emergency.
    ///
    /// Empty means all active guardians of the user.
    #[serde(default)]
    pub group_ids: Vec<group::Id>,

    /// Encounter this session should monitor, if any.
    #[serde(default)]
    pub encounter_id: Option<encounter::Id>,

    /// Identity details of the other party to expose to guardians, if any.
    #[serde(default)]
    pub vai_details: Option<String>,
}

/// `POST /sessions`
///
/// Starts monitoring the authenticated user.
pub async fn start(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Json(req): Json<StartRequest>,
) -> Result<Json<Session>, Error> {
    let vai_details = req
        .vai_details
        .map(|d| {
            VaiDetails::new(d)
                .ok_or(SessionError::InvalidVaiDetails)
                .map_err(Error::from)
        })
        .transpose()?;

    service
        .execute(StartSession {
            user_id: auth.user_id,
            duration: req.duration,
            group_ids: req.group_ids,
            encounter_id: req.encounter_id,
            vai_details,
        })
        .await
        .map(|s| Json(s.into()))
        .map_err(|e| e.as_error())
}

/// `GET /sessions/:id`
///
/// Returns a safety session of the authenticated user.
pub async fn show(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Path(id): Path<session::Id>,
) -> Result<Json<Session>, Error> {
    service
        .execute(query::session::ById::by(id))
        .await
        .map_err(|e| e.as_error())?
        .filter(|s| s.user_id == auth.user_id)
        .ok_or_else(|| SessionError::NotExists.into())
        .map(|s| Json(s.into()))
}

/// `POST /sessions/:id/check-in`
///
/// Acknowledges the session, refreshing its last check-in time.
pub async fn check_in(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Path(id): Path<session::Id>,
) -> Result<Json<Session>, Error> {
    service
        .execute(CheckIn {
            user_id: auth.user_id,
            session_id: id,
        })
        .await
        .map(|s| Json(s.into()))
        .map_err(|e| e.as_error())
}

/// Request body for submitting an exit code.
#[derive(Debug, Deserialize)]
pub struct ExitCodeRequest {
    /// Submitted exit code.
    pub code: String,
}

/// Result of a successfully accepted exit code.
///
/// Deliberately identical for the safe and the decoy code.
#[derive(Debug, Serialize)]
pub struct Ended {
    /// ID of the ended session.
    pub session_id: session::Id,

    /// When the session was ended.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub ended_at: common::DateTime,
}

/// `POST /sessions/:id/exit-code`
///
/// Ends the session with an exit code.
pub async fn submit_exit_code(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Path(id): Path<session::Id>,
    Json(req): Json<ExitCodeRequest>,
) -> Result<Json<Ended>, Error> {
    let code = ExitCode::new(req.code)
        .ok_or(SessionError::InvalidExitCode)
        .map_err(Error::from)?;

    service
        .execute(SubmitExitCode {
            user_id: auth.user_id,
            session_id: id,
            code,
        })
        .await
        .map(|ended| {
            Json(Ended {
                session_id: ended.session_id,
                ended_at: ended.ended_at,
            })
        })
        .map_err(|e| e.as_error())
}

/// Request body carrying reported coordinates.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct LocationRequest {
    /// Latitude, in degrees.
    pub lat: f64,

    /// Longitude, in degrees.
    pub lng: f64,
}

impl TryFrom<LocationRequest> for GeoPoint {
    type Error = Error;

    fn try_from(req: LocationRequest) -> Result<Self, Self::Error> {
        Self::new(req.lat, req.lng)
            .ok_or_else(|| SessionError::InvalidLocation.into())
    }
}

/// `POST /sessions/:id/location`
///
/// Reports the current location of the monitored user.
pub async fn update_location(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Path(id): Path<session::Id>,
    Json(req): Json<LocationRequest>,
) -> Result<Json<Session>, Error> {
    service
        .execute(UpdateLocation {
            user_id: auth.user_id,
            session_id: id,
            location: req.try_into()?,
        })
        .await
        .map(|s| Json(s.into()))
        .map_err(|e| e.as_error())
}

/// `GET /sessions/:id/nearest-authority`
///
/// Resolves the law-enforcement point of contact nearest to the last known
/// location of the session.
pub async fn nearest_authority(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Path(id): Path<session::Id>,
) -> Result<Json<authority::Contact>, Error> {
    service
        .execute(LookupNearestAuthority {
            user_id: auth.user_id,
            session_id: id,
        })
        .await
        .map(Json)
        .map_err(|e| e.as_error())
}

impl crate::AsError for set_safety_codes::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::CodesIdentical => Some(SessionError::CodesIdentical.into()),
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl crate::AsError for start_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EncounterNotExists(_) => {
                Some(super::encounter::EncounterError::NotExists.into())
            }
            Self::EncounterWindowClosed(_) => {
                Some(super::encounter::EncounterError::WindowClosed.into())
            }
            Self::InvalidDuration => {
                Some(SessionError::InvalidDuration.into())
            }
            Self::NoActiveGuardians => {
                Some(SessionError::NoActiveGuardians.into())
            }
            Self::SafetyCodesNotSet => {
                Some(SessionError::SafetyCodesNotSet.into())
            }
        }
    }
}

impl crate::AsError for check_in::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SessionNotActive(_) => Some(SessionError::NotActive.into()),
            Self::SessionNotExists(_) => Some(SessionError::NotExists.into()),
        }
    }
}

impl crate::AsError for submit_exit_code::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SafetyCodesNotSet => {
                Some(SessionError::SafetyCodesNotSet.into())
            }
            Self::SessionNotActive(_) => Some(SessionError::NotActive.into()),
            Self::SessionNotExists(_) => Some(SessionError::NotExists.into()),
            Self::WrongCode => Some(SessionError::WrongCode.into()),
        }
    }
}

impl crate::AsError for update_location::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SessionNotTrackable(_) => {
                Some(SessionError::NotTrackable.into())
            }
            Self::SessionNotExists(_) => Some(SessionError::NotExists.into()),
        }
    }
}

impl crate::AsError for lookup_nearest_authority::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Directory(_) => None,
            Self::LocationUnknown(_) => {
                Some(SessionError::LocationUnknown.into())
            }
            Self::NoAuthorityFound => {
                Some(SessionError::NoAuthorityFound.into())
            }
            Self::SessionNotExists(_) => Some(SessionError::NotExists.into()),
        }
    }
}

define_error! {
    enum SessionError {
        #[code = "SESSION_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Safety session does not exist"]
        NotExists,

        #[code = "SESSION_NOT_ACTIVE"]
        #[status = CONFLICT]
        #[message = "Safety session is not active"]
        NotActive,

        #[code = "SESSION_NOT_TRACKABLE"]
        #[status = CONFLICT]
        #[message = "Safety session accepts no location updates"]
        NotTrackable,

        #[code = "INVALID_DURATION"]
        #[status = BAD_REQUEST]
        #[message = "Monitoring period must be non-zero and at most 24 hours"]
        InvalidDuration,

        #[code = "NO_ACTIVE_GUARDIANS"]
        #[status = UNPROCESSABLE_ENTITY]
        #[message = "No active guardians to alert"]
        NoActiveGuardians,

        #[code = "SAFETY_CODES_NOT_SET"]
        #[status = UNPROCESSABLE_ENTITY]
        #[message = "Safety codes are not set up"]
        SafetyCodesNotSet,

        #[code = "CODES_IDENTICAL"]
        #[status = BAD_REQUEST]
        #[message = "Safe and decoy codes must differ"]
        CodesIdentical,

        #[code = "INVALID_EXIT_CODE"]
        #[status = BAD_REQUEST]
        #[message = "Exit code must be 4 to 64 characters long"]
        InvalidExitCode,

        #[code = "WRONG_CODE"]
        #[status = FORBIDDEN]
        #[message = "Submitted code is not recognized"]
        WrongCode,

        #[code = "INVALID_VAI_DETAILS"]
        #[status = BAD_REQUEST]
        #[message = "Identity details must be non-empty and at most 512 characters"]
        InvalidVaiDetails,

        #[code = "INVALID_LOCATION"]
        #[status = BAD_REQUEST]
        #[message = "Coordinates are out of range"]
        InvalidLocation,

        #[code = "LOCATION_UNKNOWN"]
        #[status = CONFLICT]
        #[message = "Safety session has no known location"]
        LocationUnknown,

        #[code = "NO_AUTHORITY_FOUND"]
        #[status = NOT_FOUND]
        #[message = "No authority found around the location"]
        NoAuthorityFound,
    }
}

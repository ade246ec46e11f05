//! Emergency endpoints.

use axum::{extract::Path, Extension, Json};
use common::GeoPoint;
use serde::{Deserialize, Serialize};
use service::{
    command::{
        send_status_update, trigger_emergency, Command as _, SendStatusUpdate,
        TriggerPanic,
    },
    domain::{
        emergency::{self, message},
        guardian, session,
    },
};

use super::session::LocationRequest;
use crate::{define_error, AsError as _, Auth, Error, Service};

/// Emergency event, as exposed by the API.
#[derive(Debug, Serialize)]
pub struct Event {
    /// ID of this event.
    pub id: emergency::Id,

    /// ID of the session that raised the emergency, if any.
    pub session_id: Option<session::Id>,

    /// Trigger that raised the emergency.
    pub trigger: String,

    /// Last known location at the time of the trigger, if any.
    pub location: Option<GeoPoint>,

    /// Human-readable address of the location, if resolved.
    pub address: Option<String>,

    /// IDs of the guardians actually alerted.
    pub notified: Vec<guardian::Id>,

    /// When the emergency was triggered.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: emergency::CreationDateTime,

    /// Status of this event.
    pub status: String,
}

impl From<emergency::Event> for Event {
    fn from(e: emergency::Event) -> Self {
        Self {
            id: e.id,
            session_id: e.session_id,
            trigger: e.trigger.to_string(),
            location: e.location,
            address: e.address.map(|a| a.to_string()),
            notified: e.notified,
            created_at: e.created_at,
            status: e.status.to_string(),
        }
    }
}

/// Request body for pressing the panic button.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PanicRequest {
    /// ID of the session the button was pressed within, if any.
    pub session_id: Option<session::Id>,

    /// Reported coordinates at the moment of the press, if any.
    pub location: Option<LocationRequest>,
}

/// `POST /panic`
///
/// Raises an emergency for the authenticated user, with or without an active
/// safety session.
pub async fn panic(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Json(req): Json<PanicRequest>,
) -> Result<Json<Event>, Error> {
    let location = req.location.map(GeoPoint::try_from).transpose()?;

    service
        .execute(TriggerPanic {
            user_id: auth.user_id,
            session_id: req.session_id,
            location,
        })
        .await
        .map(|e| Json(e.into()))
        .map_err(|e| e.as_error())
}

/// Request body for broadcasting a status update.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    /// Text of the update.
    pub body: String,
}

/// Broadcast message of an emergency, as exposed by the API.
#[derive(Debug, Serialize)]
pub struct Message {
    /// ID of this message.
    pub id: message::Id,

    /// ID of the event this message belongs to.
    pub event_id: emergency::Id,

    /// Text of this message.
    pub body: String,

    /// When this message was broadcast.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub sent_at: message::SendingDateTime,
}

impl From<message::Message> for Message {
    fn from(m: message::Message) -> Self {
        Self {
            id: m.id,
            event_id: m.event_id,
            body: m.body.to_string(),
            sent_at: m.sent_at,
        }
    }
}

/// `POST /events/:id/status-update`
///
/// Broadcasts a status update to the guardians alerted for the event.
pub async fn status_update(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Path(id): Path<emergency::Id>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Message>, Error> {
    let body = message::Body::new(req.body)
        .ok_or(EventError::InvalidBody)
        .map_err(Error::from)?;

    service
        .execute(SendStatusUpdate {
            user_id: auth.user_id,
            event_id: id,
            body,
        })
        .await
        .map(|m| Json(m.into()))
        .map_err(|e| e.as_error())
}

impl crate::AsError for trigger_emergency::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SessionNotActive(_) => {
                Some(super::session::SessionError::NotActive.into())
            }
        }
    }
}

impl crate::AsError for send_status_update::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EventNotActive(_) => Some(EventError::NotActive.into()),
            Self::EventNotExists(_) => Some(EventError::NotExists.into()),
        }
    }
}

define_error! {
    enum EventError {
        #[code = "EVENT_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Emergency event does not exist"]
        NotExists,

        #[code = "EVENT_NOT_ACTIVE"]
        #[status = CONFLICT]
        #[message = "Emergency event is resolved already"]
        NotActive,

        #[code = "INVALID_BODY"]
        #[status = BAD_REQUEST]
        #[message = "Message body must be non-empty and at most 1024 characters"]
        InvalidBody,
    }
}

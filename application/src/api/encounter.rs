//! Encounter endpoints.

use axum::{extract::Path, Extension, Json};
use serde::{Deserialize, Serialize};
use service::{
    command::{
        record_encounter, submit_review, Command as _, RecordEncounter,
        SubmitReview,
    },
    domain::{
        encounter::{self, review, Window},
        user,
    },
    query, Query as _,
};

use crate::{define_error, AsError as _, Auth, Error, Service};

/// Encounter, as exposed by the API.
#[derive(Debug, Serialize)]
pub struct Encounter {
    /// ID of this encounter.
    pub id: encounter::Id,

    /// ID of the verification session this encounter originates from.
    pub verification_id: encounter::VerificationId,

    /// ID of the providing party.
    pub provider_id: user::Id,

    /// ID of the client party.
    pub client_id: user::Id,

    /// Status of this encounter.
    pub status: String,

    /// When both parties confirmed the meeting.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub accepted_at: encounter::AcceptanceDateTime,

    /// Window gating review submission.
    pub reviews_window: WindowState,

    /// Window gating DateGuard session linkage.
    pub dateguard_window: WindowState,

    /// When submitted reviews are scheduled to publish, if both are in.
    #[serde(with = "common::datetime::serde::rfc3339::option")]
    pub publish_due_at: Option<encounter::PublicationDateTime>,
}

impl From<encounter::Encounter> for Encounter {
    fn from(e: encounter::Encounter) -> Self {
        Self {
            id: e.id,
            verification_id: e.verification_id,
            provider_id: e.provider_id,
            client_id: e.client_id,
            status: e.status.to_string(),
            accepted_at: e.accepted_at,
            reviews_window: e.reviews_window.into(),
            dateguard_window: e.dateguard_window.into(),
            publish_due_at: e.publish_due_at,
        }
    }
}

/// State of an encounter window, as exposed by the API.
#[derive(Debug, Serialize)]
pub struct WindowState {
    /// Whether the window is still open.
    pub open: bool,

    /// When the window was closed, if it was.
    #[serde(with = "common::datetime::serde::rfc3339::option")]
    pub closed_at: Option<encounter::ClosureDateTime>,

    /// Reason the window was closed for, if it was.
    pub reason: Option<String>,
}

impl From<Window> for WindowState {
    fn from(w: Window) -> Self {
        Self {
            open: w.is_open(),
            closed_at: w.closed_at(),
            reason: w.reason().map(|r| r.to_string()),
        }
    }
}

/// Review, as exposed by the API.
#[derive(Debug, Serialize)]
pub struct Review {
    /// ID of this review.
    pub id: review::Id,

    /// ID of the encounter this review is about.
    pub encounter_id: encounter::Id,

    /// ID of the reviewing party.
    pub reviewer_id: user::Id,

    /// Rating given by the reviewer, on a 1 to 5 scale.
    pub rating: i16,

    /// Free-text comment of the reviewer, if any.
    pub comment: Option<String>,

    /// When this review was submitted.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub submitted_at: review::SubmissionDateTime,

    /// When this review was published, if it was.
    #[serde(with = "common::datetime::serde::rfc3339::option")]
    pub published_at: Option<review::PublicationDateTime>,
}

impl From<review::Review> for Review {
    fn from(r: review::Review) -> Self {
        Self {
            id: r.id,
            encounter_id: r.encounter_id,
            reviewer_id: r.reviewer_id,
            rating: r.rating.into(),
            comment: r.comment.map(|c| c.to_string()),
            submitted_at: r.submitted_at,
            published_at: r.published_at,
        }
    }
}

/// Request body for recording an encounter.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RecordRequest {
    /// ID of the verification session the encounter originates from.
    pub verification_id: encounter::VerificationId,

    /// ID of the providing party.
    pub provider_id: user::Id,

    /// ID of the client party.
    pub client_id: user::Id,
}

/// `POST /encounters`
///
/// Records a mutually verified encounter, opening its review and DateGuard
/// windows.
pub async fn record(
    Extension(service): Extension<Service>,
    Auth(_): Auth,
    Json(req): Json<RecordRequest>,
) -> Result<Json<Encounter>, Error> {
    service
        .execute(RecordEncounter {
            verification_id: req.verification_id,
            provider_id: req.provider_id,
            client_id: req.client_id,
        })
        .await
        .map(|e| Json(e.into()))
        .map_err(|e| e.as_error())
}

/// `GET /encounters/:id`
///
/// Returns an encounter the authenticated user is a party of.
pub async fn show(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Path(id): Path<encounter::Id>,
) -> Result<Json<Encounter>, Error> {
    service
        .execute(query::encounter::ById::by(id))
        .await
        .map_err(|e| e.as_error())?
        .filter(|e| e.is_party(auth.user_id))
        .ok_or_else(|| EncounterError::NotExists.into())
        .map(|e| Json(e.into()))
}

/// `GET /encounters/:id/reviews`
///
/// Lists reviews of an encounter the authenticated user is a party of.
///
/// Unpublished reviews of the counterparty stay hidden, keeping submissions
/// double-blind until the window controller publishes them.
pub async fn reviews(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Path(id): Path<encounter::Id>,
) -> Result<Json<Vec<Review>>, Error> {
    let _ = service
        .execute(query::encounter::ById::by(id))
        .await
        .map_err(|e| e.as_error())?
        .filter(|e| e.is_party(auth.user_id))
        .ok_or_else(|| Error::from(EncounterError::NotExists))?;

    service
        .execute(query::encounter::Reviews::by(id))
        .await
        .map(|rs| {
            Json(
                rs.into_iter()
                    .filter(|r| {
                        r.is_published() || r.reviewer_id == auth.user_id
                    })
                    .map(Into::into)
                    .collect(),
            )
        })
        .map_err(|e| e.as_error())
}

/// Request body for submitting a review.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// Rating, on a 1 to 5 scale.
    pub rating: i16,

    /// Optional free-text comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// `POST /encounters/:id/reviews`
///
/// Submits a review of the counterparty of an encounter.
pub async fn submit_review(
    Extension(service): Extension<Service>,
    Auth(auth): Auth,
    Path(id): Path<encounter::Id>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<Review>, Error> {
    let rating = review::Rating::new(req.rating)
        .ok_or(EncounterError::InvalidRating)
        .map_err(Error::from)?;
    let comment = req
        .comment
        .map(|c| {
            review::Comment::new(c)
                .ok_or(EncounterError::InvalidComment)
                .map_err(Error::from)
        })
        .transpose()?;

    service
        .execute(SubmitReview {
            encounter_id: id,
            reviewer_id: auth.user_id,
            rating,
            comment,
        })
        .await
        .map(|r| Json(r.into()))
        .map_err(|e| e.as_error())
}

impl crate::AsError for record_encounter::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SameParty(_) => Some(EncounterError::SameParty.into()),
        }
    }
}

impl crate::AsError for submit_review::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::AlreadyReviewed(_) => {
                Some(EncounterError::AlreadyReviewed.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::EncounterNotExists(_) => {
                Some(EncounterError::NotExists.into())
            }
            Self::WindowClosed(_) => Some(EncounterError::WindowClosed.into()),
        }
    }
}

define_error! {
    enum EncounterError {
        #[code = "ENCOUNTER_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Encounter does not exist"]
        NotExists,

        #[code = "ENCOUNTER_WINDOW_CLOSED"]
        #[status = CONFLICT]
        #[message = "Encounter window is closed already"]
        WindowClosed,

        #[code = "SAME_PARTY"]
        #[status = BAD_REQUEST]
        #[message = "Encounter parties must differ"]
        SameParty,

        #[code = "ALREADY_REVIEWED"]
        #[status = CONFLICT]
        #[message = "Encounter is reviewed by this user already"]
        AlreadyReviewed,

        #[code = "INVALID_RATING"]
        #[status = BAD_REQUEST]
        #[message = "Rating must be between 1 and 5"]
        InvalidRating,

        #[code = "INVALID_COMMENT"]
        #[status = BAD_REQUEST]
        #[message = "Comment must be non-empty and at most 2048 characters"]
        InvalidComment,
    }
}

//! [`Command`] for submitting a [`Review`].

use common::{
    operations::{By, Insert, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        encounter::{self, review},
        user, Encounter, Review,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for submitting a [`Review`] about an [`Encounter`].
///
/// Submission and publication are decoupled: once both parties have
/// submitted, publication of the pair is scheduled after a fixed delay, so
/// neither party can read the other's review and retaliate within it.
#[derive(Clone, Debug)]
pub struct SubmitReview {
    /// ID of the [`Encounter`] the [`Review`] is about.
    pub encounter_id: encounter::Id,

    /// ID of the reviewing party.
    pub reviewer_id: user::Id,

    /// [`review::Rating`] given by the reviewer.
    pub rating: review::Rating,

    /// Optional [`review::Comment`] of the reviewer.
    pub comment: Option<review::Comment>,
}

impl<Db, Sms, Dir> Command<SubmitReview> for Service<Db, Sms, Dir>
where
    Db: Database<
            Select<By<Option<Encounter>, encounter::Id>>,
            Ok = Option<Encounter>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Review>, encounter::Id>>,
            Ok = Vec<Review>,
            Err = Traced<database::Error>,
        > + Database<Insert<Review>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Update<encounter::PublishDue>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = Review;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SubmitReview) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitReview {
            encounter_id,
            reviewer_id,
            rating,
            comment,
        } = cmd;

        let encounter = self
            .database()
            .execute(Select(By::<Option<Encounter>, _>::new(encounter_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|e| e.is_party(reviewer_id))
            .ok_or(E::EncounterNotExists(encounter_id))
            .map_err(tracerr::wrap!())?;
        if encounter.is_closed() || !encounter.reviews_window.is_open() {
            return Err(tracerr::new!(E::WindowClosed(encounter_id)));
        }

        let submitted = self
            .database()
            .execute(Select(By::<Vec<Review>, _>::new(encounter_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if submitted.iter().any(|r| r.reviewer_id == reviewer_id) {
            return Err(tracerr::new!(E::AlreadyReviewed(encounter_id)));
        }

        let review = Review {
            id: review::Id::new(),
            encounter_id,
            reviewer_id,
            rating,
            comment,
            submitted_at: DateTime::now().coerce(),
            published_at: None,
        };
        self.database()
            .execute(Insert(review.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Both parties have submitted now: schedule the delayed publication.
        let counterparty = encounter.counterparty(reviewer_id);
        if submitted
            .iter()
            .any(|r| Some(r.reviewer_id) == counterparty)
        {
            let delay = self.config().close_encounter_windows.publish_delay;
            self.database()
                .execute(Update(encounter::PublishDue {
                    id: encounter_id,
                    at: (DateTime::now() + delay).coerce(),
                }))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        Ok(review)
    }
}

/// Error of [`SubmitReview`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Reviewer has submitted a [`Review`] for this [`Encounter`] already.
    #[display("`Encounter(id: {_0})` is reviewed by this user already")]
    #[from(ignore)]
    AlreadyReviewed(#[error(not(source))] encounter::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Encounter`] with the provided ID does not exist (or the user is not
    /// one of its parties).
    #[display("`Encounter(id: {_0})` does not exist")]
    #[from(ignore)]
    EncounterNotExists(#[error(not(source))] encounter::Id),

    /// Review window of the [`Encounter`] is closed already.
    #[display("`Encounter(id: {_0})` review window is closed")]
    #[from(ignore)]
    WindowClosed(#[error(not(source))] encounter::Id),
}

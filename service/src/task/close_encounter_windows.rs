//! [`CloseEncounterWindows`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{By, Perform, Select, Start, Update},
    DateTime,
};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        encounter::{self, review, CloseReason},
        session, Encounter, Review,
    },
    infra::{database, Database},
    Service,
};

use super::Task;

/// Configuration for a [`CloseEncounterWindows`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between [`CloseEncounterWindows`] sweeps.
    pub interval: time::Duration,

    /// Delay between both reviews being submitted and their publication.
    pub publish_delay: time::Duration,

    /// Deadline past an [`Encounter`]'s acceptance after which its windows
    /// close regardless of submissions.
    pub review_deadline: time::Duration,
}

/// [`Task`] closing the review and DateGuard windows of [`Encounter`]s.
///
/// Two sweeps drive the same closure routine: one claims encounters whose
/// scheduled publication is due ([`CloseReason::ReviewsPosted`]), the other
/// claims encounters whose deadline elapsed ([`CloseReason::DeadlinePassed`]).
/// Closure is claimed via compare-and-set, so the sweeps never double-close.
#[derive(Clone, Debug)]
pub struct CloseEncounterWindows<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

/// Sweep over [`Encounter`]s whose scheduled publication is due.
#[derive(Clone, Copy, Debug)]
pub struct Publish;

/// Sweep over [`Encounter`]s whose review deadline elapsed.
#[derive(Clone, Copy, Debug)]
pub struct Expiry;

/// Results of a single [`CloseEncounterWindows`] sweep.
#[derive(Clone, Copy, Debug, Default)]
pub struct Outcome {
    /// Number of [`Encounter`]s closed by the sweep.
    pub closed: usize,

    /// Number of [`Review`]s published by the sweep.
    pub published: usize,
}

impl<Db, Sms, Dir> Task<Start<By<CloseEncounterWindows<Self>, Config>>>
    for Service<Db, Sms, Dir>
where
    CloseEncounterWindows<Service<Db, Sms, Dir>>: Task<
            Perform<Publish>,
            Ok = Outcome,
            Err: Error,
        > + Task<Perform<Expiry>, Ok = Outcome, Err: Error>
        + Send
        + Sync
        + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CloseEncounterWindows<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CloseEncounterWindows {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(Publish)).await.map_err(|e| {
                log::error!(
                    "`task::CloseEncounterWindows` publish sweep failed: {e}",
                );
            });
            _ = task.execute(Perform(Expiry)).await.map_err(|e| {
                log::error!(
                    "`task::CloseEncounterWindows` expiry sweep failed: {e}",
                );
            });
        }
    }
}

impl<Db, Sms, Dir> Task<Perform<Publish>>
    for CloseEncounterWindows<Service<Db, Sms, Dir>>
where
    Db: Database<
            Select<By<Vec<Encounter>, encounter::PublicationDateTime>>,
            Ok = Vec<Encounter>,
            Err = Traced<database::Error>,
        > + SettleDatabase,
{
    type Ok = Outcome;
    type Err = ExecutionError;

    async fn execute(
        &self,
        _: Perform<Publish>,
    ) -> Result<Self::Ok, Self::Err> {
        let now: encounter::PublicationDateTime = DateTime::now().coerce();
        let due = self
            .service
            .database()
            .execute(Select(By::new(now)))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;

        self.settle(due, CloseReason::ReviewsPosted).await
    }
}

impl<Db, Sms, Dir> Task<Perform<Expiry>>
    for CloseEncounterWindows<Service<Db, Sms, Dir>>
where
    Db: Database<
            Select<By<Vec<Encounter>, encounter::AcceptanceDateTime>>,
            Ok = Vec<Encounter>,
            Err = Traced<database::Error>,
        > + SettleDatabase,
{
    type Ok = Outcome;
    type Err = ExecutionError;

    async fn execute(
        &self,
        _: Perform<Expiry>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline: encounter::AcceptanceDateTime =
            (DateTime::now() - self.config.review_deadline).coerce();
        let expired = self
            .service
            .database()
            .execute(Select(By::new(deadline)))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;

        self.settle(expired, CloseReason::DeadlinePassed).await
    }
}

/// [`Database`] operations required to settle a closed [`Encounter`].
pub trait SettleDatabase:
    Database<
        Update<encounter::Close>,
        Ok = Option<Encounter>,
        Err = Traced<database::Error>,
    > + Database<
        Select<By<Vec<Review>, encounter::Id>>,
        Ok = Vec<Review>,
        Err = Traced<database::Error>,
    > + Database<
        Update<review::Publish>,
        Ok = (),
        Err = Traced<database::Error>,
    > + Database<
        Update<session::ExpireVai>,
        Ok = (),
        Err = Traced<database::Error>,
    >
{
}

impl<Db> SettleDatabase for Db where
    Db: Database<
            Update<encounter::Close>,
            Ok = Option<Encounter>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Review>, encounter::Id>>,
            Ok = Vec<Review>,
            Err = Traced<database::Error>,
        > + Database<
            Update<review::Publish>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Update<session::ExpireVai>,
            Ok = (),
            Err = Traced<database::Error>,
        >
{
}

impl<Db, Sms, Dir> CloseEncounterWindows<Service<Db, Sms, Dir>>
where
    Db: SettleDatabase,
{
    /// Closes each of the provided [`Encounter`]s for the `reason` and
    /// settles its aftermath.
    ///
    /// Claiming happens via compare-and-set, so an [`Encounter`] closed by a
    /// concurrent sweep is skipped silently. Submitted [`Review`]s publish
    /// and exposed identity details expire on the claimed ones only. Each
    /// [`Encounter`] is handled in isolation.
    async fn settle(
        &self,
        encounters: Vec<Encounter>,
        reason: CloseReason,
    ) -> Result<Outcome, ExecutionError> {
        let mut outcome = Outcome::default();
        for enc in encounters {
            let claimed = self
                .service
                .database()
                .execute(Update(encounter::Close {
                    id: enc.id,
                    reason,
                    at: DateTime::now().coerce(),
                }))
                .await
                .map_err(tracerr::map_from_and_wrap!())?;
            if claimed.is_none() {
                continue;
            }
            outcome.closed += 1;

            if let Err(e) = self.publish_reviews(enc.id, &mut outcome).await {
                log::error!(
                    encounter_id = %enc.id,
                    "failed to publish reviews: {e}",
                );
            }

            if let Err(e) = self
                .service
                .database()
                .execute(Update(session::ExpireVai {
                    encounter_id: enc.id,
                }))
                .await
            {
                log::error!(
                    encounter_id = %enc.id,
                    "failed to expire exposed identity details: {e}",
                );
            }
        }

        Ok(outcome)
    }

    /// Publishes all still-unpublished [`Review`]s of the provided
    /// [`Encounter`].
    async fn publish_reviews(
        &self,
        encounter_id: encounter::Id,
        outcome: &mut Outcome,
    ) -> Result<(), ExecutionError> {
        let reviews = self
            .service
            .database()
            .execute(Select(By::<Vec<Review>, _>::new(encounter_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;

        for review in reviews.into_iter().filter(|r| !r.is_published()) {
            self.service
                .database()
                .execute(Update(review::Publish {
                    id: review.id,
                    at: DateTime::now().coerce(),
                }))
                .await
                .map_err(tracerr::map_from_and_wrap!())?;
            outcome.published += 1;
        }

        Ok(())
    }
}

/// Error of [`CloseEncounterWindows`] execution.
pub type ExecutionError = Traced<database::Error>;

//! [`Watchdog`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{By, Perform, Select, Start, Update},
    DateTime,
};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{trigger_emergency, TriggerEmergency},
    domain::{emergency, session, SafetySession},
    infra::{database, Database},
    read::Overdue,
    Command, Service,
};

use super::Task;

/// Configuration for a [`Watchdog`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between [`Watchdog`] sweeps.
    pub interval: time::Duration,

    /// Grace period a [`SafetySession`] is given past its scheduled end.
    pub grace: time::Duration,
}

/// [`Task`] sweeping [`SafetySession`]s whose scheduled end (plus the grace
/// period) has passed.
///
/// A session acknowledged by a recent enough check-in completes quietly;
/// anything else escalates into an emergency. Each session is handled in
/// isolation, so one failure never starves the rest of the sweep.
#[derive(Clone, Debug)]
pub struct Watchdog<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

/// Results of a single [`Watchdog`] sweep.
#[derive(Clone, Copy, Debug, Default)]
pub struct Outcome {
    /// Number of overdue [`SafetySession`]s inspected.
    pub checked: usize,

    /// Number of [`SafetySession`]s completed quietly.
    pub completed: usize,

    /// Number of [`SafetySession`]s escalated into an emergency.
    pub escalated: usize,
}

impl<Db, Sms, Dir> Task<Start<By<Watchdog<Self>, Config>>>
    for Service<Db, Sms, Dir>
where
    Watchdog<Service<Db, Sms, Dir>>:
        Task<Perform<()>, Ok = Outcome, Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<Watchdog<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = Watchdog {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(outcome) if outcome.escalated > 0 => {
                    log::info!(
                        checked = outcome.checked,
                        completed = outcome.completed,
                        escalated = outcome.escalated,
                        "`task::Watchdog` escalated overdue sessions",
                    );
                }
                Ok(_) => {}
                Err(e) => log::error!("`task::Watchdog` failed: {e}"),
            }
        }
    }
}

impl<Db, Sms, Dir> Task<Perform<()>> for Watchdog<Service<Db, Sms, Dir>>
where
    Db: Database<
            Select<
                By<
                    Vec<Overdue<SafetySession>>,
                    session::ExpirationDateTime,
                >,
            >,
            Ok = Vec<Overdue<SafetySession>>,
            Err = Traced<database::Error>,
        > + Database<
            Update<session::Transition>,
            Ok = Option<SafetySession>,
            Err = Traced<database::Error>,
        >,
    Service<Db, Sms, Dir>: Command<
        TriggerEmergency,
        Ok = emergency::Event,
        Err = Traced<trigger_emergency::ExecutionError>,
    >,
{
    type Ok = Outcome;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        // Sessions ended this long ago are overdue even after the grace
        // period.
        let deadline: session::ExpirationDateTime =
            (DateTime::now() - self.config.grace).coerce();
        let overdue = self
            .service
            .database()
            .execute(Select(By::new(deadline)))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;

        let mut outcome = Outcome::default();
        for Overdue(session) in overdue {
            outcome.checked += 1;

            if session.is_acknowledged(self.config.grace) {
                // Compare-and-set: a `None` here means another sweep (or the
                // user) already handled the session.
                let completed = self
                    .service
                    .database()
                    .execute(Update(session::Transition {
                        id: session.id,
                        to: session::Status::Completed,
                    }))
                    .await
                    .map_err(tracerr::map_from_and_wrap!())?;
                if completed.is_some() {
                    outcome.completed += 1;
                }
                continue;
            }

            let trigger = if session.last_check_in.is_none() {
                emergency::Trigger::TimerExpired
            } else {
                emergency::Trigger::MissedCheckin
            };
            match self
                .service
                .execute(TriggerEmergency {
                    user_id: session.user_id,
                    session_id: Some(session.id),
                    trigger,
                    location: None,
                    covert: false,
                })
                .await
            {
                Ok(_) => outcome.escalated += 1,
                Err(e) => {
                    if matches!(
                        e.as_ref(),
                        trigger_emergency::ExecutionError::SessionNotActive(_)
                    ) {
                        // Lost the race to a concurrent trigger.
                        continue;
                    }
                    log::error!(
                        session_id = %session.id,
                        "`task::Watchdog` failed to escalate session: {e}",
                    );
                }
            }
        }

        Ok(outcome)
    }
}

/// Error of [`Watchdog`] execution.
pub type ExecutionError = Traced<database::Error>;

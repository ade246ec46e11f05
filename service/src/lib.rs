//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::error::Error;

use common::operations::{By, Start};
use derive_more::Debug;
use tokio::sync::mpsc;

use command::trigger_emergency::FanOut;

#[cfg(doc)]
use infra::{Database, Directory, Messenger};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] decoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// [`task::Watchdog`] configuration.
    pub watchdog: task::watchdog::Config,

    /// [`task::CloseEncounterWindows`] configuration.
    pub close_encounter_windows: task::close_encounter_windows::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Sms, Dir> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Messenger`] of this [`Service`].
    messenger: Sms,

    /// [`Directory`] of this [`Service`].
    directory: Dir,

    /// Queue of alert [`FanOut`]s deferred to [`task::DeliverAlerts`].
    alerts: mpsc::UnboundedSender<FanOut>,
}

impl<Db, Sms, Dir> Service<Db, Sms, Dir> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(
        config: Config,
        database: Db,
        messenger: Sms,
        directory: Dir,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<By<task::Watchdog<Self>, task::watchdog::Config>>,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::CloseEncounterWindows<Self>,
                        task::close_encounter_windows::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::DeliverAlerts<Self>,
                        mpsc::UnboundedReceiver<FanOut>,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let (alerts, queue) = mpsc::unbounded_channel();
        let this = Service {
            config,
            database,
            messenger,
            directory,
            alerts,
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::new(svc.config().watchdog))).await
        });
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::new(svc.config().close_encounter_windows)))
                .await
        });
        let svc = this.clone();
        bg.spawn(async move { svc.execute(Start(By::new(queue))).await });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Messenger`] of this [`Service`].
    #[must_use]
    pub fn messenger(&self) -> &Sms {
        &self.messenger
    }

    /// Returns [`Directory`] of this [`Service`].
    #[must_use]
    pub fn directory(&self) -> &Dir {
        &self.directory
    }

    /// Returns the queue of alert [`FanOut`]s deferred to
    /// [`task::DeliverAlerts`].
    pub(crate) fn alerts(&self) -> &mpsc::UnboundedSender<FanOut> {
        &self.alerts
    }
}

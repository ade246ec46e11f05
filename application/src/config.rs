//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::SecretString;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// SMS messenger configuration.
    pub messenger: Messenger,

    /// Authority directory configuration.
    pub directory: Directory,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret shared with the identity service issuing tokens.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default("secret".to_owned())]
    pub jwt_secret: String,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            jwt_secret,
            tasks:
                Tasks {
                    watchdog,
                    encounter_windows,
                },
        } = value;
        Self {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            watchdog: service::task::watchdog::Config {
                interval: watchdog.interval,
                grace: watchdog.grace,
            },
            close_encounter_windows:
                service::task::close_encounter_windows::Config {
                    interval: encounter_windows.interval,
                    publish_delay: encounter_windows.publish_delay,
                    review_deadline: encounter_windows.review_deadline,
                },
        }
    }
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Tasks {
    /// `Watchdog` task configuration.
    pub watchdog: Watchdog,

    /// `CloseEncounterWindows` task configuration.
    pub encounter_windows: EncounterWindows,
}

/// `Watchdog` task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Watchdog {
    /// Interval between watchdog sweeps.
    #[default(time::Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,

    /// Grace period a session is given past its scheduled end.
    #[default(time::Duration::from_secs(5 * 60))]
    #[serde(with = "humantime_serde")]
    pub grace: time::Duration,
}

/// `CloseEncounterWindows` task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct EncounterWindows {
    /// Interval between window-closing sweeps.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,

    /// Delay between both reviews being submitted and their publication.
    #[default(time::Duration::from_secs(24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub publish_delay: time::Duration,

    /// Deadline past an encounter's acceptance after which its windows close
    /// regardless of submissions.
    #[default(time::Duration::from_secs(7 * 24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub review_deadline: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// SMS messenger configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Messenger {
    /// [Twilio] configuration, if SMS delivery is enabled.
    ///
    /// [Twilio]: https://www.twilio.com
    pub twilio: Option<Twilio>,
}

/// [Twilio] configuration.
///
/// [Twilio]: https://www.twilio.com
#[derive(Clone, Debug, Deserialize)]
pub struct Twilio {
    /// Account SID to authenticate with.
    pub account_sid: String,

    /// Auth token to authenticate with.
    pub auth_token: SecretString,

    /// Phone number (or messaging service SID) to send from.
    pub from: String,
}

impl From<Twilio> for service::infra::messenger::twilio::Config {
    fn from(value: Twilio) -> Self {
        let Twilio {
            account_sid,
            auth_token,
            from,
        } = value;

        Self {
            account_sid,
            auth_token,
            from,
        }
    }
}

/// Authority directory configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Directory {
    /// [Google Places] configuration, if authority lookups are enabled.
    ///
    /// [Google Places]: https://developers.google.com/maps/documentation/places
    pub places: Option<Places>,
}

/// [Google Places] configuration.
///
/// [Google Places]: https://developers.google.com/maps/documentation/places
#[derive(Clone, Debug, Deserialize)]
pub struct Places {
    /// API key to authenticate with.
    pub api_key: SecretString,
}

impl From<Places> for service::infra::directory::places::Config {
    fn from(value: Places) -> Self {
        let Places { api_key } = value;

        Self { api_key }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

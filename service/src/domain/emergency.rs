//! [`Event`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, GeoPoint};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{guardian, session, user};

/// Immutable record of one triggered emergency.
///
/// Created exactly once per trigger; only its [`Status`] and the set of
/// notified guardians (filled right after the fan-out finishes) may change.
#[derive(Clone, Debug)]
pub struct Event {
    /// ID of this [`Event`].
    pub id: Id,

    /// ID of the user the emergency was raised for.
    pub user_id: user::Id,

    /// ID of the [`session::SafetySession`] that raised the emergency, if
    /// any.
    pub session_id: Option<session::Id>,

    /// [`Trigger`] that raised the emergency.
    pub trigger: Trigger,

    /// Last known [`GeoPoint`] at the time of the trigger, if any.
    pub location: Option<GeoPoint>,

    /// Human-readable [`Address`] of the location, if resolved.
    pub address: Option<Address>,

    /// IDs of the [`guardian::Guardian`]s actually alerted.
    pub notified: Vec<guardian::Id>,

    /// [`DateTime`] when the emergency was triggered.
    pub created_at: CreationDateTime,

    /// [`Status`] of this [`Event`].
    pub status: Status,
}

define_kind! {
    #[doc = "Signal that raised an [`Event`]."]
    enum Trigger {
        #[doc = "Explicit panic button press within a session."]
        PanicButton = 1,

        #[doc = "Decoy (duress) code submitted as an exit code."]
        DecoyCode = 2,

        #[doc = "No valid check-in within the grace period."]
        MissedCheckin = 3,

        #[doc = "Session expired unacknowledged."]
        TimerExpired = 4,

        #[doc = "Raised outside of any session."]
        Manual = 5,
    }
}

define_kind! {
    #[doc = "Status of an [`Event`]."]
    enum Status {
        #[doc = "The emergency is ongoing."]
        Active = 1,

        #[doc = "The emergency was resolved downstream."]
        Resolved = 2,
    }
}

/// Human-readable address.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Address(String);

impl Address {
    /// Creates a new [`Address`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        (!address.is_empty() && address.len() <= 512).then_some(Self(address))
    }
}

impl FromStr for Address {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Address`")
    }
}

/// ID of an [`Event`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// [`DateTime`] when an [`Event`] was created.
pub type CreationDateTime = DateTimeOf<(Event, unit::Creation)>;

pub mod message {
    //! [`Message`] definitions.

    #[cfg(doc)]
    use common::DateTime;
    use common::{unit, DateTimeOf};
    use derive_more::{AsRef, Display, From, FromStr, Into};
    #[cfg(feature = "postgres")]
    use postgres_types::{FromSql, ToSql};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    use super::Event;

    /// Timestamped message broadcast to guardians during an emergency.
    ///
    /// Persisted for every GPS broadcast and status update, regardless of
    /// delivery outcome.
    #[derive(Clone, Debug)]
    pub struct Message {
        /// ID of this [`Message`].
        pub id: Id,

        /// ID of the [`Event`] this [`Message`] belongs to.
        pub event_id: super::Id,

        /// [`Body`] of this [`Message`].
        pub body: Body,

        /// [`DateTime`] when this [`Message`] was broadcast.
        pub sent_at: SendingDateTime,
    }

    /// ID of a [`Message`].
    #[derive(
        Clone,
        Copy,
        Debug,
        Default,
        Deserialize,
        Display,
        Eq,
        From,
        FromStr,
        Hash,
        Into,
        PartialEq,
        Serialize,
    )]
    #[cfg_attr(
        feature = "postgres",
        derive(ToSql, FromSql),
        postgres(transparent)
    )]
    pub struct Id(Uuid);

    impl Id {
        /// Creates a new random [`Id`].
        #[must_use]
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    /// Body of a [`Message`].
    #[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
    #[as_ref(str, String)]
    #[cfg_attr(
        feature = "postgres",
        derive(FromSql, ToSql),
        postgres(transparent)
    )]
    pub struct Body(String);

    impl Body {
        /// Creates a new [`Body`] if the given `body` is valid.
        #[must_use]
        pub fn new(body: impl Into<String>) -> Option<Self> {
            let body = body.into();
            (!body.is_empty() && body.len() <= 1024).then_some(Self(body))
        }
    }

    /// [`DateTime`] when a [`Message`] was broadcast.
    pub type SendingDateTime = DateTimeOf<(Message, unit::Creation)>;
}

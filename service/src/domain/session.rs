//! [`SafetySession`] definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, GeoPoint};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{authority, encounter, guardian::group, user};

/// Time-boxed monitored period of a user.
///
/// While a [`SafetySession`] is [`Status::Active`], the user is expected to
/// check in periodically; the watchdog escalates sessions whose scheduled end
/// passed without a recent enough check-in.
#[derive(Clone, Debug)]
pub struct SafetySession {
    /// ID of this [`SafetySession`].
    pub id: Id,

    /// ID of the user being monitored.
    pub user_id: user::Id,

    /// [`Status`] of this [`SafetySession`].
    pub status: Status,

    /// [`DateTime`] when the monitoring started.
    pub started_at: StartDateTime,

    /// [`DateTime`] when the monitoring is scheduled to end.
    pub ends_at: ExpirationDateTime,

    /// [`DateTime`] of the last check-in, if any happened.
    pub last_check_in: Option<CheckInDateTime>,

    /// Last reported [`LocationPing`], if any.
    pub last_location: Option<LocationPing>,

    /// [`group::Group`]s whose members should be alerted on emergency.
    ///
    /// Empty means all active guardians of the user.
    pub group_ids: Vec<group::Id>,

    /// [`encounter::Encounter`] this [`SafetySession`] monitors, if any.
    pub encounter_id: Option<encounter::Id>,

    /// Identity details of the other party exposed to guardians, if any.
    pub vai_details: Option<VaiDetails>,

    /// Cached nearest-authority lookup result, if any.
    pub nearest_authority: Option<authority::Contact>,
}

impl SafetySession {
    /// Checks whether the last check-in of this [`SafetySession`] is recent
    /// enough to consider its expiry acknowledged.
    ///
    /// A check-in timestamped at `ends_at - grace` or later counts (the
    /// boundary is inclusive, tolerating clock skew and delivery delay on
    /// both sides of the nominal deadline).
    #[must_use]
    pub fn is_acknowledged(&self, grace: Duration) -> bool {
        let earliest: common::DateTime = (self.ends_at - grace).coerce();
        self.last_check_in.is_some_and(|at| at.coerce() >= earliest)
    }

    /// Checks whether this [`SafetySession`] has outlived both its scheduled
    /// end and the grace period following it.
    #[must_use]
    pub fn is_overdue(&self, now: common::DateTime, grace: Duration) -> bool {
        now > (self.ends_at + grace).coerce()
    }
}

define_kind! {
    #[doc = "Status of a [`SafetySession`]."]
    enum Status {
        #[doc = "Monitoring is in progress."]
        Active = 1,

        #[doc = "Monitoring ended normally."]
        Completed = 2,

        #[doc = "An emergency was raised; terminal for this subsystem."]
        Emergency = 3,
    }
}

impl Status {
    /// Applies a transition from this [`Status`] to the provided one.
    ///
    /// # Errors
    ///
    /// With an [`InvalidTransition`] rejection if the transition is not legal:
    /// only `Active -> Completed` and `Active -> Emergency` are.
    pub fn transition(self, to: Self) -> Result<Self, InvalidTransition> {
        use Status as S;

        match (self, to) {
            (S::Active, S::Completed | S::Emergency) => Ok(to),
            (
                S::Active | S::Completed | S::Emergency,
                S::Active | S::Completed | S::Emergency,
            ) => Err(InvalidTransition { from: self, to }),
        }
    }
}

/// Rejection of an illegal [`Status`] transition.
#[derive(Clone, Copy, Debug, Display, derive_more::Error)]
#[display("illegal `SafetySession` transition: {from} -> {to}")]
pub struct InvalidTransition {
    /// [`Status`] the transition was attempted from.
    pub from: Status,

    /// [`Status`] the transition was attempted to.
    pub to: Status,
}

/// Guarded [`Status`] change of a [`SafetySession`].
///
/// Applied as a compare-and-set: only a [`Status::Active`] session is
/// affected, so concurrent transitions cannot both succeed.
#[derive(Clone, Copy, Debug)]
pub struct Transition {
    /// ID of the [`SafetySession`] to transition.
    pub id: Id,

    /// [`Status`] to transition the [`SafetySession`] into.
    pub to: Status,
}

/// Check-in of a [`SafetySession`], refreshing its last check-in time.
#[derive(Clone, Copy, Debug)]
pub struct CheckIn {
    /// ID of the [`SafetySession`] being checked in.
    pub id: Id,

    /// [`DateTime`] of the check-in.
    pub at: CheckInDateTime,
}

/// Location update of a [`SafetySession`].
#[derive(Clone, Copy, Debug)]
pub struct Ping {
    /// ID of the [`SafetySession`] being located.
    pub id: Id,

    /// Reported [`LocationPing`].
    pub location: LocationPing,
}

/// Caching of a nearest-authority lookup result on a [`SafetySession`].
#[derive(Clone, Debug)]
pub struct AuthorityCache {
    /// ID of the [`SafetySession`] to cache the result on.
    pub id: Id,

    /// Looked up [`authority::Contact`].
    pub contact: authority::Contact,
}

/// Expiry of identity details on all [`SafetySession`]s linked to an
/// [`encounter::Encounter`].
///
/// Exposed details are replaced with an expiry marker; session records
/// themselves are never deleted.
#[derive(Clone, Copy, Debug)]
pub struct ExpireVai {
    /// ID of the [`encounter::Encounter`] whose windows were closed.
    pub encounter_id: encounter::Id,
}

/// Timestamped GPS coordinates reported by a client.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct LocationPing {
    /// Reported [`GeoPoint`].
    pub point: GeoPoint,

    /// [`DateTime`] when the [`GeoPoint`] was reported.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub at: PingDateTime,
}

/// Identity details of a verified party, as exposed to guardians.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct VaiDetails(String);

impl VaiDetails {
    /// Marker value replacing details once they expire.
    const EXPIRED: &'static str = "EXPIRED";

    /// Creates new [`VaiDetails`] if the given `details` are valid.
    #[must_use]
    pub fn new(details: impl Into<String>) -> Option<Self> {
        let details = details.into();
        (!details.is_empty() && details.len() <= 512).then_some(Self(details))
    }

    /// Returns [`VaiDetails`] representing expired details.
    #[must_use]
    pub fn expired() -> Self {
        Self(Self::EXPIRED.into())
    }

    /// Checks whether these [`VaiDetails`] have expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.0 == Self::EXPIRED
    }
}

/// ID of a [`SafetySession`].
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

/// [`DateTime`] when a [`SafetySession`] started.
pub type StartDateTime = DateTimeOf<(SafetySession, unit::Creation)>;

/// [`DateTime`] when a [`SafetySession`] is scheduled to end.
pub type ExpirationDateTime = DateTimeOf<(SafetySession, unit::Expiration)>;

/// [`DateTime`] when a [`SafetySession`] was last checked in.
pub type CheckInDateTime = DateTimeOf<(SafetySession, unit::CheckIn)>;

/// [`DateTime`] when a [`LocationPing`] was reported.
pub type PingDateTime = DateTimeOf<(LocationPing, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use super::{SafetySession, Status};

    fn session(ends_in: Duration) -> SafetySession {
        SafetySession {
            id: super::Id::new(),
            user_id: crate::domain::user::Id::new(),
            status: Status::Active,
            started_at: DateTime::now().coerce(),
            ends_at: (DateTime::now() + ends_in).coerce(),
            last_check_in: None,
            last_location: None,
            group_ids: vec![],
            encounter_id: None,
            vai_details: None,
            nearest_authority: None,
        }
    }

    #[test]
    fn only_active_transitions_are_legal() {
        use Status as S;

        assert_eq!(S::Active.transition(S::Completed).unwrap(), S::Completed);
        assert_eq!(S::Active.transition(S::Emergency).unwrap(), S::Emergency);

        for from in [S::Completed, S::Emergency] {
            for to in [S::Active, S::Completed, S::Emergency] {
                assert!(from.transition(to).is_err(), "{from} -> {to}");
            }
        }
        assert!(S::Active.transition(S::Active).is_err());
    }

    #[test]
    fn grace_boundary_is_inclusive() {
        let grace = Duration::from_secs(5 * 60);
        let mut sess = session(Duration::ZERO);

        // Exactly at `ends_at - grace`.
        sess.last_check_in = Some((sess.ends_at - grace).coerce());
        assert!(sess.is_acknowledged(grace));

        // One second older than the boundary.
        sess.last_check_in =
            Some((sess.ends_at - grace - Duration::from_secs(1)).coerce());
        assert!(!sess.is_acknowledged(grace));

        sess.last_check_in = None;
        assert!(!sess.is_acknowledged(grace));
    }

    #[test]
    fn overdue_only_after_grace_elapses() {
        let grace = Duration::from_secs(5 * 60);
        let sess = session(Duration::ZERO);

        let now = DateTime::now();
        assert!(!sess.is_overdue(now + Duration::from_secs(4 * 60), grace));
        assert!(sess.is_overdue(now + Duration::from_secs(6 * 60), grace));
    }
}

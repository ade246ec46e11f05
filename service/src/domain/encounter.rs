//! [`Encounter`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

pub use self::review::Review;

/// Completed, mutually verified in-person meeting between two parties.
///
/// An [`Encounter`] gates the post-meeting review lifecycle through two
/// independent [`Window`]s, which close permanently once both reviews are
/// posted or a fixed deadline elapses.
#[derive(Clone, Debug)]
pub struct Encounter {
    /// ID of this [`Encounter`].
    pub id: Id,

    /// ID of the verification session this [`Encounter`] originates from.
    pub verification_id: VerificationId,

    /// ID of the providing party.
    pub provider_id: user::Id,

    /// ID of the client party.
    pub client_id: user::Id,

    /// [`Status`] of this [`Encounter`].
    pub status: Status,

    /// [`DateTime`] when both parties confirmed the meeting.
    pub accepted_at: AcceptanceDateTime,

    /// [`Window`] gating [`Review`] submission.
    pub reviews_window: Window,

    /// [`Window`] gating DateGuard session linkage.
    pub dateguard_window: Window,

    /// [`DateTime`] when submitted [`Review`]s are scheduled to publish.
    ///
    /// Set once both parties have submitted.
    pub publish_due_at: Option<PublicationDateTime>,
}

impl Encounter {
    /// Checks whether this [`Encounter`] is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == Status::Closed
    }

    /// Checks whether the provided user is one of the parties of this
    /// [`Encounter`].
    #[must_use]
    pub fn is_party(&self, user_id: user::Id) -> bool {
        self.provider_id == user_id || self.client_id == user_id
    }

    /// Returns the party of this [`Encounter`] other than the provided one.
    ///
    /// [`None`] is returned if the provided user is not a party at all.
    #[must_use]
    pub fn counterparty(&self, user_id: user::Id) -> Option<user::Id> {
        if self.provider_id == user_id {
            Some(self.client_id)
        } else if self.client_id == user_id {
            Some(self.provider_id)
        } else {
            None
        }
    }
}

define_kind! {
    #[doc = "Status of an [`Encounter`]."]
    enum Status {
        #[doc = "Confirmed by both parties; review windows may be open."]
        Accepted = 1,

        #[doc = "Windows closed permanently; terminal."]
        Closed = 2,
    }
}

define_kind! {
    #[doc = "Reason a [`Window`] was closed for."]
    enum CloseReason {
        #[doc = "The fixed deadline elapsed."]
        DeadlinePassed = 1,

        #[doc = "Both parties posted their reviews."]
        ReviewsPosted = 2,
    }
}

/// Open-or-closed gate of an [`Encounter`].
///
/// Closure is monotonic: once closed, a [`Window`] never reopens.
#[derive(Clone, Copy, Debug)]
pub struct Window {
    /// [`DateTime`] when this [`Window`] was closed, if it was.
    closed_at: Option<ClosureDateTime>,

    /// [`CloseReason`] this [`Window`] was closed for, if it was.
    reason: Option<CloseReason>,
}

impl Window {
    /// Creates a new open [`Window`].
    #[must_use]
    pub fn open() -> Self {
        Self {
            closed_at: None,
            reason: None,
        }
    }

    /// Restores a [`Window`] from its persisted parts.
    #[must_use]
    pub fn from_parts(
        closed_at: Option<ClosureDateTime>,
        reason: Option<CloseReason>,
    ) -> Self {
        Self { closed_at, reason }
    }

    /// Checks whether this [`Window`] is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    /// Closes this [`Window`] for the provided [`CloseReason`].
    ///
    /// Returns whether the [`Window`] was open before: closing an already
    /// closed [`Window`] is a no-op preserving the original closure.
    pub fn close(&mut self, reason: CloseReason, at: ClosureDateTime) -> bool {
        if self.closed_at.is_some() {
            return false;
        }

        self.closed_at = Some(at);
        self.reason = Some(reason);
        true
    }

    /// Returns the [`DateTime`] this [`Window`] was closed at, if it was.
    #[must_use]
    pub fn closed_at(&self) -> Option<ClosureDateTime> {
        self.closed_at
    }

    /// Returns the [`CloseReason`] this [`Window`] was closed for, if it was.
    #[must_use]
    pub fn reason(&self) -> Option<CloseReason> {
        self.reason
    }
}

/// Closure of an [`Encounter`], applied as a compare-and-set.
///
/// Only an [`Status::Accepted`] encounter is affected; both its [`Window`]s
/// are closed alongside, preserving any earlier closure of either.
#[derive(Clone, Copy, Debug)]
pub struct Close {
    /// ID of the [`Encounter`] to close.
    pub id: Id,

    /// [`CloseReason`] to close the [`Encounter`] for.
    pub reason: CloseReason,

    /// [`DateTime`] of the closure.
    pub at: ClosureDateTime,
}

/// Scheduling of [`Review`] publication on an [`Encounter`].
#[derive(Clone, Copy, Debug)]
pub struct PublishDue {
    /// ID of the [`Encounter`] to schedule.
    pub id: Id,

    /// [`DateTime`] when submitted [`Review`]s should publish.
    pub at: PublicationDateTime,
}

/// ID of an [`Encounter`].
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

/// ID of the verification session an [`Encounter`] originates from.
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
pub struct VerificationId(Uuid);

/// [`DateTime`] when an [`Encounter`] was accepted.
pub type AcceptanceDateTime = DateTimeOf<(Encounter, unit::Acceptance)>;

/// [`DateTime`] when a [`Window`] was closed.
pub type ClosureDateTime = DateTimeOf<(Window, unit::Closure)>;

/// [`DateTime`] when [`Review`]s of an [`Encounter`] publish.
pub type PublicationDateTime = DateTimeOf<(Encounter, unit::Publication)>;

pub mod review {
    //! [`Review`] definitions.

    #[cfg(doc)]
    use common::DateTime;
    use common::{unit, DateTimeOf};
    use derive_more::{AsRef, Display, From, FromStr, Into};
    #[cfg(feature = "postgres")]
    use postgres_types::{FromSql, ToSql};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[cfg(doc)]
    use super::Encounter;
    use crate::domain::user;

    /// Rating and comment one party leaves about the other after an
    /// [`Encounter`].
    ///
    /// Submission and publication are decoupled: a [`Review`] is submitted by
    /// its author, but published only by the window controller.
    #[derive(Clone, Debug)]
    pub struct Review {
        /// ID of this [`Review`].
        pub id: Id,

        /// ID of the [`Encounter`] this [`Review`] is about.
        pub encounter_id: super::Id,

        /// ID of the reviewing party.
        pub reviewer_id: user::Id,

        /// [`Rating`] given by the reviewer.
        pub rating: Rating,

        /// Optional [`Comment`] of the reviewer.
        pub comment: Option<Comment>,

        /// [`DateTime`] when this [`Review`] was submitted.
        pub submitted_at: SubmissionDateTime,

        /// [`DateTime`] when this [`Review`] was published, if it was.
        pub published_at: Option<PublicationDateTime>,
    }

    impl Review {
        /// Checks whether this [`Review`] has been published.
        #[must_use]
        pub fn is_published(&self) -> bool {
            self.published_at.is_some()
        }
    }

    /// Publication of a [`Review`].
    #[derive(Clone, Copy, Debug)]
    pub struct Publish {
        /// ID of the [`Review`] to publish.
        pub id: Id,

        /// [`DateTime`] of the publication.
        pub at: PublicationDateTime,
    }

    /// ID of a [`Review`].
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

    /// Rating of a [`Review`], on a 1 to 5 scale.
    #[derive(
        Clone, Copy, Debug, Deserialize, Display, Eq, Into, PartialEq,
        Serialize,
    )]
    #[cfg_attr(
        feature = "postgres",
        derive(FromSql, ToSql),
        postgres(transparent)
    )]
    pub struct Rating(i16);

    impl Rating {
        /// Creates a new [`Rating`] if the given value is in the `1..=5`
        /// range.
        #[must_use]
        pub fn new(value: i16) -> Option<Self> {
            (1..=5).contains(&value).then_some(Self(value))
        }
    }

    /// Free-text comment of a [`Review`].
    #[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
    #[as_ref(str, String)]
    #[cfg_attr(
        feature = "postgres",
        derive(FromSql, ToSql),
        postgres(transparent)
    )]
    pub struct Comment(String);

    impl Comment {
        /// Creates a new [`Comment`] if the given `comment` is valid.
        #[must_use]
        pub fn new(comment: impl Into<String>) -> Option<Self> {
            let comment = comment.into();
            (!comment.is_empty() && comment.len() <= 2048)
                .then_some(Self(comment))
        }
    }

    /// [`DateTime`] when a [`Review`] was submitted.
    pub type SubmissionDateTime = DateTimeOf<(Review, unit::Submission)>;

    /// [`DateTime`] when a [`Review`] was published.
    pub type PublicationDateTime = DateTimeOf<(Review, unit::Publication)>;

    #[cfg(test)]
    mod spec {
        use super::{Comment, Rating};

        #[test]
        fn rating_accepts_1_to_5_only() {
            for value in 1..=5 {
                assert!(Rating::new(value).is_some());
            }
            assert!(Rating::new(0).is_none());
            assert!(Rating::new(6).is_none());
            assert!(Rating::new(-1).is_none());
        }

        #[test]
        fn comment_rejects_empty_and_oversized() {
            assert!(Comment::new("on time, polite").is_some());
            assert!(Comment::new("").is_none());
            assert!(Comment::new("a".repeat(2048)).is_some());
            assert!(Comment::new("a".repeat(2049)).is_none());
        }
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{CloseReason, Encounter, Status, Window};
    use crate::domain::user;

    fn encounter(provider_id: user::Id, client_id: user::Id) -> Encounter {
        Encounter {
            id: super::Id::new(),
            verification_id: super::VerificationId::default(),
            provider_id,
            client_id,
            status: Status::Accepted,
            accepted_at: DateTime::now().coerce(),
            reviews_window: Window::open(),
            dateguard_window: Window::open(),
            publish_due_at: None,
        }
    }

    #[test]
    fn window_closes_once() {
        let mut window = Window::open();
        assert!(window.is_open());

        let first = DateTime::now().coerce();
        assert!(window.close(CloseReason::ReviewsPosted, first));
        assert!(!window.is_open());

        let later = (DateTime::now() + std::time::Duration::from_secs(60))
            .coerce();
        assert!(!window.close(CloseReason::DeadlinePassed, later));
        assert_eq!(window.closed_at(), Some(first));
        assert_eq!(window.reason(), Some(CloseReason::ReviewsPosted));
    }

    #[test]
    fn restored_closed_window_stays_closed() {
        let at = DateTime::now().coerce();
        let mut window =
            Window::from_parts(Some(at), Some(CloseReason::DeadlinePassed));

        assert!(!window.is_open());
        assert!(!window.close(CloseReason::ReviewsPosted, at));
        assert_eq!(window.reason(), Some(CloseReason::DeadlinePassed));
    }

    #[test]
    fn counterparty_resolves_for_parties_only() {
        let provider_id = user::Id::new();
        let client_id = user::Id::new();
        let enc = encounter(provider_id, client_id);

        assert!(enc.is_party(provider_id));
        assert!(enc.is_party(client_id));
        assert_eq!(enc.counterparty(provider_id), Some(client_id));
        assert_eq!(enc.counterparty(client_id), Some(provider_id));

        let stranger = user::Id::new();
        assert!(!enc.is_party(stranger));
        assert_eq!(enc.counterparty(stranger), None);
    }
}

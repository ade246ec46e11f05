//! [`Guardian`] definitions.

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

pub use self::group::Group;

/// Trusted contact designated by a user to receive emergency alerts.
#[derive(Clone, Debug)]
pub struct Guardian {
    /// ID of this [`Guardian`].
    pub id: Id,

    /// ID of the user this [`Guardian`] protects.
    pub user_id: user::Id,

    /// [`Name`] of this [`Guardian`].
    pub name: Name,

    /// [`Phone`] number alerts are sent to.
    pub phone: Phone,

    /// [`Status`] of this [`Guardian`].
    pub status: Status,

    /// [`Group`]s this [`Guardian`] belongs to.
    pub group_ids: Vec<group::Id>,

    /// [`DateTime`] when this [`Guardian`] was invited.
    pub invited_at: InvitationDateTime,

    /// [`DateTime`] when this [`Guardian`] accepted the invitation.
    pub accepted_at: Option<AcceptanceDateTime>,
}

impl Guardian {
    /// Accepts the invitation, activating this [`Guardian`].
    ///
    /// # Errors
    ///
    /// With an [`AlreadyActive`] rejection if the invitation has been accepted
    /// before.
    pub fn accept(
        &mut self,
        at: AcceptanceDateTime,
    ) -> Result<(), AlreadyActive> {
        if self.status == Status::Active {
            return Err(AlreadyActive(self.id));
        }

        self.status = Status::Active;
        self.accepted_at = Some(at);
        Ok(())
    }
}

/// Rejection of accepting an already accepted [`Guardian`] invitation.
#[derive(Clone, Copy, Debug, Display, derive_more::Error)]
#[display("`Guardian(id: {_0})` is already active")]
pub struct AlreadyActive(#[error(not(source))] pub Id);

/// ID of a [`Guardian`].
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

define_kind! {
    #[doc = "Status of a [`Guardian`]."]
    enum Status {
        #[doc = "Invited, but has not accepted the invitation yet."]
        Pending = 1,

        #[doc = "Accepted the invitation and receives alerts."]
        Active = 2,
    }
}

/// Name of a [`Guardian`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 128
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Phone number of a [`Guardian`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Phone(String);

impl Phone {
    /// Creates a new [`Phone`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`Phone`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`Phone`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Phone`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^([+]?\d{1,2}[-\s]?|)\d{3}[-\s]?\d{3}[-\s]?\d{4}$")
                .expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for Phone {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Phone`")
    }
}

/// [`DateTime`] when a [`Guardian`] was invited.
pub type InvitationDateTime = DateTimeOf<(Guardian, unit::Invitation)>;

/// [`DateTime`] when a [`Guardian`] accepted the invitation.
pub type AcceptanceDateTime = DateTimeOf<(Guardian, unit::Acceptance)>;

pub mod group {
    //! [`Group`] definitions.

    #[cfg(doc)]
    use common::DateTime;
    use common::{unit, DateTimeOf};
    use derive_more::{Display, From, FromStr, Into};
    #[cfg(feature = "postgres")]
    use postgres_types::{FromSql, ToSql};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[cfg(doc)]
    use super::Guardian;
    use crate::domain::user;

    /// Regional grouping of [`Guardian`]s.
    ///
    /// A [`Guardian`] may belong to any number of [`Group`]s; safety sessions
    /// select the [`Group`]s whose members should be alerted.
    #[derive(Clone, Debug)]
    pub struct Group {
        /// ID of this [`Group`].
        pub id: Id,

        /// ID of the user owning this [`Group`].
        pub user_id: user::Id,

        /// [`Name`] of this [`Group`].
        pub name: super::Name,

        /// [`DateTime`] when this [`Group`] was created.
        pub created_at: CreationDateTime,
    }

    /// ID of a [`Group`].
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

    /// [`DateTime`] when a [`Group`] was created.
    pub type CreationDateTime = DateTimeOf<(Group, unit::Creation)>;

    /// [`Name`] of a [`Group`].
    pub use super::Name;
}

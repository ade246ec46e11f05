//! In-memory test doubles for the [`Service`] seams.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use common::{
    operations::{By, Delete, Dispatch, Insert, Select, Update},
    GeoPoint,
};
use service::{
    domain::{
        authority,
        emergency::{self, message::Message, Event},
        encounter::{self, review, Encounter, Review},
        guardian::{
            self,
            group::{self, Group},
            Guardian,
        },
        safety_code::Codes,
        session::{self, SafetySession, VaiDetails},
        user,
    },
    infra::{
        database,
        messenger::{self, Alert},
        Database, Directory, Messenger,
    },
    read, task, Config, Service,
};
use tracerr::Traced;

/// [`Service`] over the in-memory test doubles.
pub type TestService = Service<InMemoryDb, RecordingSms, StubDirectory>;

/// Builds a [`TestService`] over fresh test doubles.
///
/// The returned doubles are handles into the same state the service uses, so
/// tests may seed and inspect it directly. Awaiting the returned
/// [`task::Background`] drives the watchdog and window sweeps.
pub fn service() -> (TestService, InMemoryDb, RecordingSms, task::Background) {
    let db = InMemoryDb::default();
    let sms = RecordingSms::default();
    let (svc, bg) = Service::new(
        config(),
        db.clone(),
        sms.clone(),
        StubDirectory::default(),
    );
    (svc, db, sms, bg)
}

/// Builds a [`Service`] [`Config`] suitable for tests.
pub fn config() -> Config {
    Config {
        jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
            b"test-secret",
        ),
        watchdog: task::watchdog::Config {
            interval: Duration::from_secs(60 * 60),
            grace: Duration::from_secs(5 * 60),
        },
        close_encounter_windows: task::close_encounter_windows::Config {
            interval: Duration::from_secs(60 * 60),
            publish_delay: Duration::from_secs(24 * 60 * 60),
            review_deadline: Duration::from_secs(14 * 24 * 60 * 60),
        },
    }
}

/// Builds a valid [`guardian::Phone`] from the provided suffix digit.
pub fn phone(digit: u8) -> guardian::Phone {
    guardian::Phone::new(format!("+1 555 123 456{digit}")).unwrap()
}

/// Safe exit code used by [`monitored_user`].
pub const SAFE_CODE: &str = "sunny day";

/// Decoy exit code used by [`monitored_user`].
pub const DECOY_CODE: &str = "rainy day";

/// Sets up a new user with both exit codes and one active [`Guardian`].
pub async fn monitored_user(
    svc: &TestService,
    phone_digit: u8,
) -> (user::Id, Guardian) {
    let user_id = user::Id::new();
    let guardian = monitored_user_with_id(svc, user_id, phone_digit).await;
    (user_id, guardian)
}

/// Sets up the provided user with both exit codes and one active
/// [`Guardian`].
pub async fn monitored_user_with_id(
    svc: &TestService,
    user_id: user::Id,
    phone_digit: u8,
) -> Guardian {
    use service::command::{
        AcceptGuardianInvite, InviteGuardian, SetSafetyCodes,
    };
    use service::domain::safety_code::ExitCode;

    svc.execute(SetSafetyCodes {
        user_id,
        safe: ExitCode::new(SAFE_CODE).unwrap(),
        decoy: ExitCode::new(DECOY_CODE).unwrap(),
    })
    .await
    .unwrap();

    let guardian = svc
        .execute(InviteGuardian {
            user_id,
            name: guardian::Name::new("Dana").unwrap(),
            phone: phone(phone_digit),
            group_ids: vec![],
        })
        .await
        .unwrap();
    let guardian = svc
        .execute(AcceptGuardianInvite {
            guardian_id: guardian.id,
        })
        .await
        .unwrap();

    guardian
}

/// Starts a one-hour [`SafetySession`] for the provided user.
pub async fn start_session(
    svc: &TestService,
    user_id: user::Id,
) -> SafetySession {
    svc.execute(service::command::StartSession {
        user_id,
        duration: Duration::from_secs(60 * 60),
        group_ids: vec![],
        encounter_id: None,
        vai_details: None,
    })
    .await
    .unwrap()
}

/// Builds an arbitrary [`GeoPoint`].
pub fn geo_point() -> GeoPoint {
    GeoPoint::new(52.52, 13.405).unwrap()
}

/// Entire persisted state of an [`InMemoryDb`].
#[derive(Debug, Default)]
pub struct State {
    pub sessions: HashMap<session::Id, SafetySession>,
    pub codes: HashMap<user::Id, Codes>,
    pub guardians: HashMap<guardian::Id, Guardian>,
    pub groups: HashMap<group::Id, Group>,
    pub events: HashMap<emergency::Id, Event>,
    pub messages: Vec<Message>,
    pub encounters: HashMap<encounter::Id, Encounter>,
    pub reviews: Vec<Review>,
}

/// In-memory [`Database`] double mirroring the PostgreSQL semantics,
/// compare-and-set updates included.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDb(Arc<Mutex<State>>);

impl InMemoryDb {
    /// Locks the whole [`State`] for direct inspection or seeding.
    pub fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap()
    }

    /// Mutates the stored [`SafetySession`] with the provided ID in place.
    ///
    /// Intended for rewinding timestamps that commands always set to now.
    pub fn tweak_session(
        &self,
        id: session::Id,
        f: impl FnOnce(&mut SafetySession),
    ) {
        f(self.state().sessions.get_mut(&id).unwrap());
    }

    /// Mutates the stored [`Encounter`] with the provided ID in place.
    pub fn tweak_encounter(
        &self,
        id: encounter::Id,
        f: impl FnOnce(&mut Encounter),
    ) {
        f(self.state().encounters.get_mut(&id).unwrap());
    }
}

type DbResult<T> = Result<T, Traced<database::Error>>;

impl Database<Insert<SafetySession>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(session): Insert<SafetySession>,
    ) -> DbResult<()> {
        let _ = self.state().sessions.insert(session.id, session);
        Ok(())
    }
}

impl Database<Select<By<Option<SafetySession>, session::Id>>> for InMemoryDb {
    type Ok = Option<SafetySession>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<SafetySession>, session::Id>>,
    ) -> DbResult<Self::Ok> {
        Ok(self.state().sessions.get(&by.into_inner()).cloned())
    }
}

impl
    Database<
        Select<
            By<Vec<read::Overdue<SafetySession>>, session::ExpirationDateTime>,
        >,
    > for InMemoryDb
{
    type Ok = Vec<read::Overdue<SafetySession>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::Overdue<SafetySession>>, session::ExpirationDateTime>,
        >,
    ) -> DbResult<Self::Ok> {
        let deadline = by.into_inner();
        Ok(self
            .state()
            .sessions
            .values()
            .filter(|s| {
                s.status == session::Status::Active && s.ends_at < deadline
            })
            .cloned()
            .map(read::Overdue)
            .collect())
    }
}

impl Database<Update<session::Transition>> for InMemoryDb {
    type Ok = Option<SafetySession>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(tr): Update<session::Transition>,
    ) -> DbResult<Self::Ok> {
        Ok(self.state().sessions.get_mut(&tr.id).and_then(|s| {
            (s.status == session::Status::Active).then(|| {
                s.status = tr.to;
                s.clone()
            })
        }))
    }
}

impl Database<Update<session::CheckIn>> for InMemoryDb {
    type Ok = Option<SafetySession>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(ci): Update<session::CheckIn>,
    ) -> DbResult<Self::Ok> {
        Ok(self.state().sessions.get_mut(&ci.id).and_then(|s| {
            (s.status == session::Status::Active).then(|| {
                s.last_check_in = Some(ci.at);
                s.clone()
            })
        }))
    }
}

impl Database<Update<session::Ping>> for InMemoryDb {
    type Ok = Option<SafetySession>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(ping): Update<session::Ping>,
    ) -> DbResult<Self::Ok> {
        Ok(self.state().sessions.get_mut(&ping.id).and_then(|s| {
            matches!(
                s.status,
                session::Status::Active | session::Status::Emergency,
            )
            .then(|| {
                s.last_location = Some(ping.location);
                s.clone()
            })
        }))
    }
}

impl Database<Update<session::AuthorityCache>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(cache): Update<session::AuthorityCache>,
    ) -> DbResult<()> {
        if let Some(s) = self.state().sessions.get_mut(&cache.id) {
            s.nearest_authority = Some(cache.contact);
        }
        Ok(())
    }
}

impl Database<Update<session::ExpireVai>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(expire): Update<session::ExpireVai>,
    ) -> DbResult<()> {
        for s in self.state().sessions.values_mut() {
            if s.encounter_id == Some(expire.encounter_id)
                && s.vai_details.is_some()
            {
                s.vai_details = Some(VaiDetails::expired());
            }
        }
        Ok(())
    }
}

impl Database<Insert<Codes>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(codes): Insert<Codes>) -> DbResult<()> {
        let _ = self.state().codes.insert(codes.user_id, codes);
        Ok(())
    }
}

impl Database<Select<By<Option<Codes>, user::Id>>> for InMemoryDb {
    type Ok = Option<Codes>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Codes>, user::Id>>,
    ) -> DbResult<Self::Ok> {
        Ok(self.state().codes.get(&by.into_inner()).cloned())
    }
}

impl Database<Insert<Guardian>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(guardian): Insert<Guardian>,
    ) -> DbResult<()> {
        let _ = self.state().guardians.insert(guardian.id, guardian);
        Ok(())
    }
}

impl Database<Update<Guardian>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(guardian): Update<Guardian>,
    ) -> DbResult<()> {
        let _ = self.state().guardians.insert(guardian.id, guardian);
        Ok(())
    }
}

impl Database<Delete<By<Guardian, guardian::Id>>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Guardian, guardian::Id>>,
    ) -> DbResult<()> {
        let _ = self.state().guardians.remove(&by.into_inner());
        Ok(())
    }
}

impl Database<Select<By<Option<Guardian>, guardian::Id>>> for InMemoryDb {
    type Ok = Option<Guardian>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Guardian>, guardian::Id>>,
    ) -> DbResult<Self::Ok> {
        Ok(self.state().guardians.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Vec<Guardian>, user::Id>>> for InMemoryDb {
    type Ok = Vec<Guardian>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Guardian>, user::Id>>,
    ) -> DbResult<Self::Ok> {
        let user_id = by.into_inner();
        let mut guardians: Vec<_> = self
            .state()
            .guardians
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        guardians.sort_by_key(|g| g.invited_at);
        Ok(guardians)
    }
}

impl Database<Select<By<Vec<Guardian>, read::guardian::ActiveOf>>>
    for InMemoryDb
{
    type Ok = Vec<Guardian>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Guardian>, read::guardian::ActiveOf>>,
    ) -> DbResult<Self::Ok> {
        let read::guardian::ActiveOf { user_id, group_ids } = by.into_inner();
        Ok(self
            .state()
            .guardians
            .values()
            .filter(|g| {
                g.user_id == user_id
                    && g.status == guardian::Status::Active
                    && (group_ids.is_empty()
                        || g.group_ids.iter().any(|id| group_ids.contains(id)))
            })
            .cloned()
            .collect())
    }
}

impl Database<Insert<Group>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(group): Insert<Group>) -> DbResult<()> {
        let _ = self.state().groups.insert(group.id, group);
        Ok(())
    }
}

impl Database<Select<By<Vec<Group>, user::Id>>> for InMemoryDb {
    type Ok = Vec<Group>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Group>, user::Id>>,
    ) -> DbResult<Self::Ok> {
        let user_id = by.into_inner();
        Ok(self
            .state()
            .groups
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }
}

impl Database<Insert<Event>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(event): Insert<Event>) -> DbResult<()> {
        let _ = self.state().events.insert(event.id, event);
        Ok(())
    }
}

impl Database<Update<Event>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Update(event): Update<Event>) -> DbResult<()> {
        if let Some(stored) = self.state().events.get_mut(&event.id) {
            stored.notified = event.notified;
            stored.status = event.status;
        }
        Ok(())
    }
}

impl Database<Select<By<Option<Event>, emergency::Id>>> for InMemoryDb {
    type Ok = Option<Event>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Event>, emergency::Id>>,
    ) -> DbResult<Self::Ok> {
        Ok(self.state().events.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Option<Event>, session::Id>>> for InMemoryDb {
    type Ok = Option<Event>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Event>, session::Id>>,
    ) -> DbResult<Self::Ok> {
        let session_id = by.into_inner();
        Ok(self
            .state()
            .events
            .values()
            .filter(|e| {
                e.session_id == Some(session_id)
                    && e.status == emergency::Status::Active
            })
            .max_by_key(|e| e.created_at)
            .cloned())
    }
}

impl Database<Insert<Message>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(message): Insert<Message>) -> DbResult<()> {
        self.state().messages.push(message);
        Ok(())
    }
}

impl Database<Insert<Encounter>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(encounter): Insert<Encounter>,
    ) -> DbResult<()> {
        let _ = self.state().encounters.insert(encounter.id, encounter);
        Ok(())
    }
}

impl Database<Select<By<Option<Encounter>, encounter::Id>>> for InMemoryDb {
    type Ok = Option<Encounter>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Encounter>, encounter::Id>>,
    ) -> DbResult<Self::Ok> {
        Ok(self.state().encounters.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Vec<Encounter>, encounter::PublicationDateTime>>>
    for InMemoryDb
{
    type Ok = Vec<Encounter>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Encounter>, encounter::PublicationDateTime>>,
    ) -> DbResult<Self::Ok> {
        let now = by.into_inner();
        Ok(self
            .state()
            .encounters
            .values()
            .filter(|e| {
                e.status == encounter::Status::Accepted
                    && e.publish_due_at.is_some_and(|due| due <= now)
            })
            .cloned()
            .collect())
    }
}

impl Database<Select<By<Vec<Encounter>, encounter::AcceptanceDateTime>>>
    for InMemoryDb
{
    type Ok = Vec<Encounter>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Encounter>, encounter::AcceptanceDateTime>>,
    ) -> DbResult<Self::Ok> {
        let deadline = by.into_inner();
        Ok(self
            .state()
            .encounters
            .values()
            .filter(|e| {
                e.status == encounter::Status::Accepted
                    && e.accepted_at < deadline
            })
            .cloned()
            .collect())
    }
}

impl Database<Update<encounter::Close>> for InMemoryDb {
    type Ok = Option<Encounter>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(close): Update<encounter::Close>,
    ) -> DbResult<Self::Ok> {
        Ok(self.state().encounters.get_mut(&close.id).and_then(|e| {
            (e.status == encounter::Status::Accepted).then(|| {
                e.status = encounter::Status::Closed;
                let _ = e.reviews_window.close(close.reason, close.at);
                let _ = e.dateguard_window.close(close.reason, close.at);
                e.clone()
            })
        }))
    }
}

impl Database<Update<encounter::PublishDue>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(due): Update<encounter::PublishDue>,
    ) -> DbResult<()> {
        if let Some(e) = self.state().encounters.get_mut(&due.id) {
            if e.publish_due_at.is_none() {
                e.publish_due_at = Some(due.at);
            }
        }
        Ok(())
    }
}

impl Database<Insert<Review>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(review): Insert<Review>) -> DbResult<()> {
        self.state().reviews.push(review);
        Ok(())
    }
}

impl Database<Select<By<Vec<Review>, encounter::Id>>> for InMemoryDb {
    type Ok = Vec<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Review>, encounter::Id>>,
    ) -> DbResult<Self::Ok> {
        let encounter_id = by.into_inner();
        Ok(self
            .state()
            .reviews
            .iter()
            .filter(|r| r.encounter_id == encounter_id)
            .cloned()
            .collect())
    }
}

impl Database<Update<review::Publish>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(publish): Update<review::Publish>,
    ) -> DbResult<()> {
        if let Some(r) = self
            .state()
            .reviews
            .iter_mut()
            .find(|r| r.id == publish.id)
        {
            if r.published_at.is_none() {
                r.published_at = Some(publish.at);
            }
        }
        Ok(())
    }
}

/// [`Messenger`] double recording every dispatched [`Alert`].
///
/// Delivery to any phone number registered via [`RecordingSms::fail`] is
/// rejected, allowing partial fan-out failures to be staged.
#[derive(Clone, Debug, Default)]
pub struct RecordingSms {
    /// Every [`Alert`] dispatch attempted, in order.
    attempts: Arc<Mutex<Vec<Alert>>>,

    /// Phone numbers whose delivery is rejected.
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingSms {
    /// Registers the provided [`guardian::Phone`] as failing delivery.
    pub fn fail(&self, phone: &guardian::Phone) {
        let _ = self
            .failing
            .lock()
            .unwrap()
            .insert(AsRef::<str>::as_ref(phone).to_owned());
    }

    /// Returns every [`Alert`] dispatch attempted so far.
    pub fn attempts(&self) -> Vec<Alert> {
        self.attempts.lock().unwrap().clone()
    }

    /// Returns the bodies of all attempted [`Alert`]s.
    pub fn bodies(&self) -> Vec<String> {
        self.attempts().into_iter().map(|a| a.body).collect()
    }
}

impl Messenger<Dispatch<Alert>> for RecordingSms {
    type Ok = ();
    type Err = Traced<messenger::Error>;

    async fn execute(
        &self,
        Dispatch(alert): Dispatch<Alert>,
    ) -> Result<Self::Ok, Self::Err> {
        let rejected = self
            .failing
            .lock()
            .unwrap()
            .contains(AsRef::<str>::as_ref(&alert.to));
        self.attempts.lock().unwrap().push(alert);

        if rejected {
            return Err(tracerr::new!(messenger::Error::Rejected(
                "staged delivery failure".into(),
            )));
        }
        Ok(())
    }
}

/// [`Directory`] double returning a fixed [`authority::Contact`].
#[derive(Clone, Debug, Default)]
pub struct StubDirectory(pub Option<authority::Contact>);

impl Directory<Select<By<Option<authority::Contact>, GeoPoint>>>
    for StubDirectory
{
    type Ok = Option<authority::Contact>;
    type Err = Traced<service::infra::directory::Error>;

    async fn execute(
        &self,
        _: Select<By<Option<authority::Contact>, GeoPoint>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.0.clone())
    }
}

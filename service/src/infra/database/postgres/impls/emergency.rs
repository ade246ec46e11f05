//! [`Event`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select, Update},
    GeoPoint,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        emergency::{self, message::Message, Event},
        session,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Restores an [`Event`] from the provided [`Row`].
fn from_row(row: &Row) -> Event {
    let location = match (
        row.get::<_, Option<_>>("location_lat"),
        row.get::<_, Option<_>>("location_lng"),
    ) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
    };

    Event {
        id: row.get("id"),
        user_id: row.get("user_id"),
        session_id: row.get("session_id"),
        trigger: row.get("trigger"),
        location,
        address: row.get("address"),
        notified: row.get("notified"),
        created_at: row.get("created_at"),
        status: row.get("status"),
    }
}

/// Columns of the `emergency_events` table, in [`from_row()`] order.
const COLUMNS: &str = "\
    id, user_id, session_id, trigger, \
    location_lat, location_lng, address, \
    notified, created_at, status";

impl<C> Database<Insert<Event>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Event>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(event): Insert<Event>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(event)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Event>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(event): Update<Event>,
    ) -> Result<Self::Ok, Self::Err> {
        let Event {
            id,
            user_id,
            session_id,
            trigger,
            location,
            address,
            notified,
            created_at,
            status,
        } = event;

        let (loc_lat, loc_lng) = location
            .map(|l| (Some(l.lat), Some(l.lng)))
            .unwrap_or_default();

        const SQL: &str = "\
            INSERT INTO emergency_events (\
                id, user_id, session_id, trigger, \
                location_lat, location_lng, address, \
                notified, created_at, status\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::INT2, \
                $5::FLOAT8, $6::FLOAT8, $7::VARCHAR, \
                $8::UUID[], $9::TIMESTAMPTZ, $10::INT2\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET notified = EXCLUDED.notified, \
                status = EXCLUDED.status";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &session_id,
                &trigger,
                &loc_lat,
                &loc_lng,
                &address,
                &notified,
                &created_at,
                &status,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<Event>, emergency::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Event>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Event>, emergency::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: emergency::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM emergency_events \
             WHERE id = $1::UUID \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

/// Selects the latest still-active [`Event`] raised by the provided
/// [`session::Id`], if any.
impl<C> Database<Select<By<Option<Event>, session::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Event>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Event>, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let session_id: session::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM emergency_events \
             WHERE session_id = $1::UUID \
               AND status = $2::INT2 \
             ORDER BY created_at DESC \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&session_id, &emergency::Status::Active])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<Message>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(msg): Insert<Message>,
    ) -> Result<Self::Ok, Self::Err> {
        let Message {
            id,
            event_id,
            body,
            sent_at,
        } = msg;

        const SQL: &str = "\
            INSERT INTO emergency_messages (id, event_id, body, sent_at) \
            VALUES ($1::UUID, $2::UUID, $3::VARCHAR, $4::TIMESTAMPTZ) \
            ON CONFLICT (id) DO NOTHING";
        self.exec(SQL, &[&id, &event_id, &body, &sent_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

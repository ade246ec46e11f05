//! [`SafetySession`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select, Update},
    GeoPoint,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        authority,
        session::{self, LocationPing, VaiDetails},
        SafetySession,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Restores a [`SafetySession`] from the provided [`Row`].
fn from_row(row: &Row) -> SafetySession {
    let last_location = match (
        row.get::<_, Option<_>>("last_location_lat"),
        row.get::<_, Option<_>>("last_location_lng"),
        row.get::<_, Option<_>>("last_location_at"),
    ) {
        (Some(lat), Some(lng), Some(at)) => Some(LocationPing {
            point: GeoPoint { lat, lng },
            at,
        }),
        _ => None,
    };

    let nearest_authority = match (
        row.get::<_, Option<_>>("authority_name"),
        row.get::<_, Option<_>>("authority_lat"),
        row.get::<_, Option<_>>("authority_lng"),
    ) {
        (Some(name), Some(lat), Some(lng)) => Some(authority::Contact {
            name,
            address: row.get("authority_address"),
            phone: row.get("authority_phone"),
            location: GeoPoint { lat, lng },
            distance_meters: row.get("authority_distance"),
        }),
        _ => None,
    };

    SafetySession {
        id: row.get("id"),
        user_id: row.get("user_id"),
        status: row.get("status"),
        started_at: row.get("started_at"),
        ends_at: row.get("ends_at"),
        last_check_in: row.get("last_check_in"),
        last_location,
        group_ids: row.get("group_ids"),
        encounter_id: row.get("encounter_id"),
        vai_details: row.get("vai_details"),
        nearest_authority,
    }
}

/// Columns of the `safety_sessions` table, in [`from_row()`] order.
const COLUMNS: &str = "\
    id, user_id, status, \
    started_at, ends_at, last_check_in, \
    last_location_lat, last_location_lng, last_location_at, \
    group_ids, encounter_id, vai_details, \
    authority_name, authority_address, authority_phone, \
    authority_lat, authority_lng, authority_distance";

impl<C> Database<Insert<SafetySession>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(sess): Insert<SafetySession>,
    ) -> Result<Self::Ok, Self::Err> {
        let SafetySession {
            id,
            user_id,
            status,
            started_at,
            ends_at,
            last_check_in,
            last_location,
            group_ids,
            encounter_id,
            vai_details,
            nearest_authority,
        } = sess;

        let (loc_lat, loc_lng, loc_at) = last_location
            .map(|l| (Some(l.point.lat), Some(l.point.lng), Some(l.at)))
            .unwrap_or_default();
        let (auth_name, auth_address, auth_phone, auth_lat, auth_lng, auth_dist) =
            nearest_authority
                .map(|a| {
                    (
                        Some(a.name),
                        Some(a.address),
                        a.phone,
                        Some(a.location.lat),
                        Some(a.location.lng),
                        Some(a.distance_meters),
                    )
                })
                .unwrap_or_default();

        const SQL: &str = "\
            INSERT INTO safety_sessions (\
                id, user_id, status, \
                started_at, ends_at, last_check_in, \
                last_location_lat, last_location_lng, last_location_at, \
                group_ids, encounter_id, vai_details, \
                authority_name, authority_address, authority_phone, \
                authority_lat, authority_lng, authority_distance\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT2, \
                $4::TIMESTAMPTZ, $5::TIMESTAMPTZ, $6::TIMESTAMPTZ, \
                $7::FLOAT8, $8::FLOAT8, $9::TIMESTAMPTZ, \
                $10::UUID[], $11::UUID, $12::VARCHAR, \
                $13::VARCHAR, $14::VARCHAR, $15::VARCHAR, \
                $16::FLOAT8, $17::FLOAT8, $18::FLOAT8\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &status,
                &started_at,
                &ends_at,
                &last_check_in,
                &loc_lat,
                &loc_lng,
                &loc_at,
                &group_ids,
                &encounter_id,
                &vai_details,
                &auth_name,
                &auth_address,
                &auth_phone,
                &auth_lat,
                &auth_lng,
                &auth_dist,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<SafetySession>, session::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<SafetySession>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<SafetySession>, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: session::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM safety_sessions \
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

impl<C>
    Database<
        Select<
            By<Vec<read::Overdue<SafetySession>>, session::ExpirationDateTime>,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<read::Overdue<SafetySession>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::Overdue<SafetySession>>, session::ExpirationDateTime>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let deadline: session::ExpirationDateTime = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM safety_sessions \
             WHERE status = $1::INT2 \
               AND ends_at < $2::TIMESTAMPTZ \
             ORDER BY ends_at",
        );
        Ok(self
            .query(&sql, &[&session::Status::Active, &deadline])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| read::Overdue(from_row(row)))
            .collect())
    }
}

impl<C> Database<Update<session::Transition>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<SafetySession>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(transition): Update<session::Transition>,
    ) -> Result<Self::Ok, Self::Err> {
        let session::Transition { id, to } = transition;

        // Compare-and-set: only an `Active` session transitions, so
        // concurrent transitions cannot both succeed.
        let sql = format!(
            "UPDATE safety_sessions \
             SET status = $2::INT2 \
             WHERE id = $1::UUID \
               AND status = $3::INT2 \
             RETURNING {COLUMNS}",
        );
        Ok(self
            .query_opt(&sql, &[&id, &to, &session::Status::Active])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Update<session::CheckIn>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<SafetySession>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(check_in): Update<session::CheckIn>,
    ) -> Result<Self::Ok, Self::Err> {
        let session::CheckIn { id, at } = check_in;

        let sql = format!(
            "UPDATE safety_sessions \
             SET last_check_in = $2::TIMESTAMPTZ \
             WHERE id = $1::UUID \
               AND status = $3::INT2 \
             RETURNING {COLUMNS}",
        );
        Ok(self
            .query_opt(&sql, &[&id, &at, &session::Status::Active])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Update<session::Ping>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<SafetySession>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(ping): Update<session::Ping>,
    ) -> Result<Self::Ok, Self::Err> {
        let session::Ping { id, location } = ping;

        // Location is still trackable while an emergency is ongoing.
        let sql = format!(
            "UPDATE safety_sessions \
             SET last_location_lat = $2::FLOAT8, \
                 last_location_lng = $3::FLOAT8, \
                 last_location_at = $4::TIMESTAMPTZ \
             WHERE id = $1::UUID \
               AND status IN ($5::INT2, $6::INT2) \
             RETURNING {COLUMNS}",
        );
        Ok(self
            .query_opt(
                &sql,
                &[
                    &id,
                    &location.point.lat,
                    &location.point.lng,
                    &location.at,
                    &session::Status::Active,
                    &session::Status::Emergency,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Update<session::AuthorityCache>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(cache): Update<session::AuthorityCache>,
    ) -> Result<Self::Ok, Self::Err> {
        let session::AuthorityCache { id, contact } = cache;

        const SQL: &str = "\
            UPDATE safety_sessions \
            SET authority_name = $2::VARCHAR, \
                authority_address = $3::VARCHAR, \
                authority_phone = $4::VARCHAR, \
                authority_lat = $5::FLOAT8, \
                authority_lng = $6::FLOAT8, \
                authority_distance = $7::FLOAT8 \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                &id,
                &contact.name,
                &contact.address,
                &contact.phone,
                &contact.location.lat,
                &contact.location.lng,
                &contact.distance_meters,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<session::ExpireVai>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(expire): Update<session::ExpireVai>,
    ) -> Result<Self::Ok, Self::Err> {
        let session::ExpireVai { encounter_id } = expire;

        const SQL: &str = "\
            UPDATE safety_sessions \
            SET vai_details = $2::VARCHAR \
            WHERE encounter_id = $1::UUID \
              AND vai_details IS NOT NULL";
        self.exec(SQL, &[&encounter_id, &VaiDetails::expired()])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

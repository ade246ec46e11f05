//! [`Guardian`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        guardian::{self, Group},
        user, Guardian,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Restores a [`Guardian`] from the provided [`Row`].
fn from_row(row: &Row) -> Guardian {
    Guardian {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        phone: row.get("phone"),
        status: row.get("status"),
        group_ids: row.get("group_ids"),
        invited_at: row.get("invited_at"),
        accepted_at: row.get("accepted_at"),
    }
}

impl<C> Database<Insert<Guardian>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Guardian>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(guardian): Insert<Guardian>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(guardian))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Guardian>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(guardian): Update<Guardian>,
    ) -> Result<Self::Ok, Self::Err> {
        let Guardian {
            id,
            user_id,
            name,
            phone,
            status,
            group_ids,
            invited_at,
            accepted_at,
        } = guardian;

        const SQL: &str = "\
            INSERT INTO guardians (\
                id, user_id, \
                name, phone, status, group_ids, \
                invited_at, accepted_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, \
                $3::VARCHAR, $4::VARCHAR, $5::INT2, $6::UUID[], \
                $7::TIMESTAMPTZ, $8::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET user_id = EXCLUDED.user_id, \
                name = EXCLUDED.name, \
                phone = EXCLUDED.phone, \
                status = EXCLUDED.status, \
                group_ids = EXCLUDED.group_ids, \
                invited_at = EXCLUDED.invited_at, \
                accepted_at = EXCLUDED.accepted_at";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &name,
                &phone,
                &status,
                &group_ids,
                &invited_at,
                &accepted_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Guardian, guardian::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Guardian, guardian::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: guardian::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM guardians \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Option<Guardian>, guardian::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Guardian>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Guardian>, guardian::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: guardian::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, \
                   name, phone, status, group_ids, \
                   invited_at, accepted_at \
            FROM guardians \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Guardian>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Guardian>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Guardian>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, \
                   name, phone, status, group_ids, \
                   invited_at, accepted_at \
            FROM guardians \
            WHERE user_id = $1::UUID \
            ORDER BY invited_at";
        Ok(self
            .query(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Guardian>, read::guardian::ActiveOf>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Guardian>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Guardian>, read::guardian::ActiveOf>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::guardian::ActiveOf { user_id, group_ids } = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, \
                   name, phone, status, group_ids, \
                   invited_at, accepted_at \
            FROM guardians \
            WHERE user_id = $1::UUID \
              AND status = $2::INT2 \
              AND (cardinality($3::UUID[]) = 0 \
                   OR group_ids && $3::UUID[]) \
            ORDER BY invited_at";
        Ok(self
            .query(SQL, &[&user_id, &guardian::Status::Active, &group_ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Group>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(group): Insert<Group>,
    ) -> Result<Self::Ok, Self::Err> {
        let Group {
            id,
            user_id,
            name,
            created_at,
        } = group;

        const SQL: &str = "\
            INSERT INTO guardian_groups (id, user_id, name, created_at) \
            VALUES ($1::UUID, $2::UUID, $3::VARCHAR, $4::TIMESTAMPTZ) \
            ON CONFLICT (id) DO NOTHING";
        self.exec(SQL, &[&id, &user_id, &name, &created_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Vec<Group>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Group>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Group>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, name, created_at \
            FROM guardian_groups \
            WHERE user_id = $1::UUID \
            ORDER BY created_at";
        Ok(self
            .query(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| Group {
                id: row.get("id"),
                user_id: row.get("user_id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

//! [`Codes`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{safety_code::Codes, user},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Insert<Codes>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(codes): Insert<Codes>,
    ) -> Result<Self::Ok, Self::Err> {
        let Codes {
            user_id,
            safe,
            decoy,
            created_at,
        } = codes;

        // Setting new codes replaces the previous pair entirely.
        const SQL: &str = "\
            INSERT INTO safety_codes (\
                user_id, safe_hash, decoy_hash, created_at\
            ) \
            VALUES ($1::UUID, $2::BYTEA, $3::BYTEA, $4::TIMESTAMPTZ) \
            ON CONFLICT (user_id) DO UPDATE \
            SET safe_hash = EXCLUDED.safe_hash, \
                decoy_hash = EXCLUDED.decoy_hash, \
                created_at = EXCLUDED.created_at";
        self.exec(SQL, &[&user_id, &safe, &decoy, &created_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Option<Codes>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Codes>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Codes>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT user_id, safe_hash, decoy_hash, created_at \
            FROM safety_codes \
            WHERE user_id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Codes {
                user_id: row.get("user_id"),
                safe: row.get("safe_hash"),
                decoy: row.get("decoy_hash"),
                created_at: row.get("created_at"),
            }))
    }
}

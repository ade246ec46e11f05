//! [`Encounter`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        encounter::{self, review, Window},
        Encounter, Review,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Restores an [`Encounter`] from the provided [`Row`].
fn from_row(row: &Row) -> Encounter {
    Encounter {
        id: row.get("id"),
        verification_id: row.get("verification_id"),
        provider_id: row.get("provider_id"),
        client_id: row.get("client_id"),
        status: row.get("status"),
        accepted_at: row.get("accepted_at"),
        reviews_window: Window::from_parts(
            row.get("reviews_closed_at"),
            row.get("reviews_close_reason"),
        ),
        dateguard_window: Window::from_parts(
            row.get("dateguard_closed_at"),
            row.get("dateguard_close_reason"),
        ),
        publish_due_at: row.get("publish_due_at"),
    }
}

/// Columns of the `encounters` table, in [`from_row()`] order.
const COLUMNS: &str = "\
    id, verification_id, provider_id, client_id, \
    status, accepted_at, \
    reviews_closed_at, reviews_close_reason, \
    dateguard_closed_at, dateguard_close_reason, \
    publish_due_at";

impl<C> Database<Insert<Encounter>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(enc): Insert<Encounter>,
    ) -> Result<Self::Ok, Self::Err> {
        let Encounter {
            id,
            verification_id,
            provider_id,
            client_id,
            status,
            accepted_at,
            reviews_window,
            dateguard_window,
            publish_due_at,
        } = enc;

        const SQL: &str = "\
            INSERT INTO encounters (\
                id, verification_id, provider_id, client_id, \
                status, accepted_at, \
                reviews_closed_at, reviews_close_reason, \
                dateguard_closed_at, dateguard_close_reason, \
                publish_due_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::INT2, $6::TIMESTAMPTZ, \
                $7::TIMESTAMPTZ, $8::INT2, \
                $9::TIMESTAMPTZ, $10::INT2, \
                $11::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO NOTHING";
        self.exec(
            SQL,
            &[
                &id,
                &verification_id,
                &provider_id,
                &client_id,
                &status,
                &accepted_at,
                &reviews_window.closed_at(),
                &reviews_window.reason(),
                &dateguard_window.closed_at(),
                &dateguard_window.reason(),
                &publish_due_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<Encounter>, encounter::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Encounter>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Encounter>, encounter::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: encounter::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM encounters \
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

/// Selects [`Encounter`]s whose scheduled [`Review`]s publication is due at
/// the provided [`encounter::PublicationDateTime`] already.
impl<C> Database<Select<By<Vec<Encounter>, encounter::PublicationDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Encounter>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<Encounter>, encounter::PublicationDateTime>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let now: encounter::PublicationDateTime = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM encounters \
             WHERE status = $1::INT2 \
               AND publish_due_at IS NOT NULL \
               AND publish_due_at <= $2::TIMESTAMPTZ \
             ORDER BY publish_due_at",
        );
        Ok(self
            .query(&sql, &[&encounter::Status::Accepted, &now])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

/// Selects [`Encounter`]s accepted before the provided
/// [`encounter::AcceptanceDateTime`] and still not closed.
impl<C> Database<Select<By<Vec<Encounter>, encounter::AcceptanceDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Encounter>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Encounter>, encounter::AcceptanceDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let deadline: encounter::AcceptanceDateTime = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM encounters \
             WHERE status = $1::INT2 \
               AND accepted_at < $2::TIMESTAMPTZ \
             ORDER BY accepted_at",
        );
        Ok(self
            .query(&sql, &[&encounter::Status::Accepted, &deadline])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Update<encounter::Close>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Encounter>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(close): Update<encounter::Close>,
    ) -> Result<Self::Ok, Self::Err> {
        let encounter::Close { id, reason, at } = close;

        // Compare-and-set: only an `Accepted` encounter closes, so
        // concurrent sweeps cannot both claim it. `COALESCE` preserves any
        // earlier closure of either window.
        let sql = format!(
            "UPDATE encounters \
             SET status = $2::INT2, \
                 reviews_closed_at = \
                     COALESCE(reviews_closed_at, $3::TIMESTAMPTZ), \
                 reviews_close_reason = \
                     COALESCE(reviews_close_reason, $4::INT2), \
                 dateguard_closed_at = \
                     COALESCE(dateguard_closed_at, $3::TIMESTAMPTZ), \
                 dateguard_close_reason = \
                     COALESCE(dateguard_close_reason, $4::INT2) \
             WHERE id = $1::UUID \
               AND status = $5::INT2 \
             RETURNING {COLUMNS}",
        );
        Ok(self
            .query_opt(
                &sql,
                &[
                    &id,
                    &encounter::Status::Closed,
                    &at,
                    &reason,
                    &encounter::Status::Accepted,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Update<encounter::PublishDue>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(due): Update<encounter::PublishDue>,
    ) -> Result<Self::Ok, Self::Err> {
        let encounter::PublishDue { id, at } = due;

        const SQL: &str = "\
            UPDATE encounters \
            SET publish_due_at = $2::TIMESTAMPTZ \
            WHERE id = $1::UUID \
              AND publish_due_at IS NULL";
        self.exec(SQL, &[&id, &at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Insert<Review>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(review): Insert<Review>,
    ) -> Result<Self::Ok, Self::Err> {
        let Review {
            id,
            encounter_id,
            reviewer_id,
            rating,
            comment,
            submitted_at,
            published_at,
        } = review;

        const SQL: &str = "\
            INSERT INTO reviews (\
                id, encounter_id, reviewer_id, \
                rating, comment, \
                submitted_at, published_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::INT2, $5::VARCHAR, \
                $6::TIMESTAMPTZ, $7::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &encounter_id,
                &reviewer_id,
                &rating,
                &comment,
                &submitted_at,
                &published_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Vec<Review>, encounter::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Review>, encounter::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let encounter_id: encounter::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, encounter_id, reviewer_id, \
                   rating, comment, \
                   submitted_at, published_at \
            FROM reviews \
            WHERE encounter_id = $1::UUID \
            ORDER BY submitted_at";
        Ok(self
            .query(SQL, &[&encounter_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| Review {
                id: row.get("id"),
                encounter_id: row.get("encounter_id"),
                reviewer_id: row.get("reviewer_id"),
                rating: row.get("rating"),
                comment: row.get("comment"),
                submitted_at: row.get("submitted_at"),
                published_at: row.get("published_at"),
            })
            .collect())
    }
}

impl<C> Database<Update<review::Publish>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(publish): Update<review::Publish>,
    ) -> Result<Self::Ok, Self::Err> {
        let review::Publish { id, at } = publish;

        const SQL: &str = "\
            UPDATE reviews \
            SET published_at = $2::TIMESTAMPTZ \
            WHERE id = $1::UUID \
              AND published_at IS NULL";
        self.exec(SQL, &[&id, &at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, delete, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::repositories::checkout_locks::CheckoutLockRepository,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::checkout_locks},
};

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = checkout_locks)]
struct InsertCheckoutLock {
    user_id: Uuid,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

pub struct CheckoutLockPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CheckoutLockPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CheckoutLockRepository for CheckoutLockPostgres {
    async fn try_acquire(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let inserted = conn.transaction::<usize, diesel::result::Error, _>(|conn| {
            // Stale locks from crashed requests are taken over.
            delete(
                checkout_locks::table
                    .filter(checkout_locks::user_id.eq(user_id))
                    .filter(checkout_locks::expires_at.le(now)),
            )
            .execute(conn)?;

            insert_into(checkout_locks::table)
                .values(&InsertCheckoutLock {
                    user_id,
                    acquired_at: now,
                    expires_at,
                })
                .on_conflict(checkout_locks::user_id)
                .do_nothing()
                .execute(conn)
        })?;

        Ok(inserted == 1)
    }

    async fn release(&self, user_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        delete(checkout_locks::table.filter(checkout_locks::user_id.eq(user_id)))
            .execute(&mut conn)?;

        Ok(())
    }
}

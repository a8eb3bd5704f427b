//! Reference-counting helpers for the content store.
//!
//! The reference count of a global file is never stored: it is the number of
//! `file` rows whose `file_hash` equals its `hash_id`, recomputed whenever a
//! delete needs to know whether an entry became an orphan.

use chrono::Utc;
use sea_orm::sea_query::{LockType, OnConflict, Query as SeaQuery};
use sea_orm::*;
use tracing::debug;

use crate::entity::{file, global_file};
use crate::models::file::{HashCheck, NewGlobalFile};

/// Upper bound on keys bound into one `IN (...)` list. Keeps every statement
/// well under the SQLite and PostgreSQL bind parameter limits.
pub const BATCH_SIZE: usize = 900;

pub struct GlobalFiles<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> GlobalFiles<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Insert an entry, leaving an existing entry for the same hash untouched.
    /// Returns whichever entry is stored afterwards.
    pub async fn insert(&self, entry: NewGlobalFile) -> Result<global_file::Model, DbErr> {
        let now = Utc::now();
        let hash_id = entry.hash_id.clone();

        let model = global_file::ActiveModel {
            hash_id: Set(entry.hash_id),
            file_type: Set(entry.file_type),
            size: Set(entry.size),
            url: Set(entry.url),
            metadata: Set(entry.metadata),
            creator: Set(entry.creator),
            created_at: Set(now),
            accessed_at: Set(now),
        };

        global_file::Entity::insert(model)
            .on_conflict(
                OnConflict::column(global_file::Column::HashId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;

        self.find(&hash_id).await?.ok_or_else(|| {
            DbErr::RecordNotFound(format!("global_file {hash_id} missing after upsert"))
        })
    }

    pub async fn find(&self, hash: &str) -> Result<Option<global_file::Model>, DbErr> {
        global_file::Entity::find_by_id(hash.to_owned())
            .one(self.conn)
            .await
    }

    pub async fn check(&self, hash: &str) -> Result<HashCheck, DbErr> {
        Ok(self
            .find(hash)
            .await?
            .map(HashCheck::from)
            .unwrap_or_else(HashCheck::missing))
    }

    /// Lock the entries for `hashes` in hash order and return those that exist.
    ///
    /// Taking these row locks before touching `file` rows serializes concurrent
    /// deletes of sibling records, so exactly one of them observes the last
    /// reference disappearing. On SQLite the clause is dropped and the
    /// immediate write transaction does the serializing.
    ///
    /// `hashes` must be sorted so batches lock in a consistent order.
    pub async fn lock(
        &self,
        hashes: &[String],
        lock: LockType,
    ) -> Result<Vec<global_file::Model>, DbErr> {
        let mut locked = Vec::new();

        for batch in hashes.chunks(BATCH_SIZE) {
            let rows = global_file::Entity::find()
                .filter(global_file::Column::HashId.is_in(batch.to_vec()))
                .order_by_asc(global_file::Column::HashId)
                .lock(lock)
                .all(self.conn)
                .await?;
            locked.extend(rows);
        }

        Ok(locked)
    }

    /// Number of file records, across all users, pointing at `hash`.
    pub async fn count_references(&self, hash: &str) -> Result<u64, DbErr> {
        file::Entity::find()
            .filter(file::Column::FileHash.eq(hash))
            .count(self.conn)
            .await
    }

    /// Remove every entry among `hashes` that no file record references any more.
    ///
    /// The delete itself carries the "no referencing rows" condition, so a
    /// second sweep over the same hashes is a no-op.
    pub async fn sweep_orphans(
        &self,
        hashes: &[String],
    ) -> Result<Vec<global_file::Model>, DbErr> {
        let mut removed = Vec::new();

        for batch in hashes.chunks(BATCH_SIZE) {
            let orphans = global_file::Entity::find()
                .filter(orphaned(batch))
                .order_by_asc(global_file::Column::HashId)
                .all(self.conn)
                .await?;

            if orphans.is_empty() {
                continue;
            }

            let result = global_file::Entity::delete_many()
                .filter(orphaned(batch))
                .exec(self.conn)
                .await?;

            debug!(
                candidates = batch.len(),
                removed = result.rows_affected,
                "swept orphaned global files"
            );
            removed.extend(orphans);
        }

        if removed.is_empty() {
            debug!(candidates = hashes.len(), "no orphaned global files");
        }

        Ok(removed)
    }

    /// Remove one entry if nothing references it. Returns whether a row was deleted.
    pub async fn remove_if_unreferenced(&self, hash: &str) -> Result<bool, DbErr> {
        let result = global_file::Entity::delete_many()
            .filter(orphaned(&[hash.to_owned()]))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

/// `hash_id IN (hashes) AND hash_id NOT IN (SELECT file_hash FROM file WHERE file_hash IN (hashes))`
fn orphaned(hashes: &[String]) -> Condition {
    Condition::all()
        .add(global_file::Column::HashId.is_in(hashes.to_vec()))
        .add(
            global_file::Column::HashId.not_in_subquery(
                SeaQuery::select()
                    .column(file::Column::FileHash)
                    .from(file::Entity)
                    .and_where(file::Column::FileHash.is_in(hashes.to_vec()))
                    .to_owned(),
            ),
        )
}

use std::sync::Arc;

use chrono::Utc;
use common::RemovalPolicy;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Alias, Func, LikeExpr, LockType, Query as SeaQuery};
use sea_orm::*;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::entity::{file, global_file, knowledge_base_file};
use crate::error::{RegistryError, RegistryResult};
use crate::models::file::{
    CreateFileParams, DeletedFiles, FileQuery, HashCheck, NewGlobalFile, SortField, SortOrder,
    UpdateFileParams,
};
use crate::models::shared::escape_like;
use crate::service::global_file::{BATCH_SIZE, GlobalFiles};

/// Generate a fresh file record id.
pub fn new_file_id() -> String {
    format!("file_{}", Uuid::now_v7().simple())
}

/// File records of one user, plus the content store bookkeeping they drive.
///
/// Stateless apart from the user id: every operation runs against `conn` and
/// mutating operations open their own transaction.
pub struct FileRegistry<'a, C: ConnectionTrait + TransactionTrait> {
    conn: &'a C,
    user_id: String,
    policy: Arc<dyn RemovalPolicy>,
}

impl<'a, C: ConnectionTrait + TransactionTrait> FileRegistry<'a, C> {
    pub fn new(conn: &'a C, user_id: impl Into<String>, policy: Arc<dyn RemovalPolicy>) -> Self {
        Self {
            conn,
            user_id: user_id.into(),
            policy,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Insert a file record, and its knowledge base link when one is given.
    ///
    /// A `file_hash` must name an existing global file unless
    /// `insert_global_file` asks for the entry to be created from this record.
    #[instrument(skip(self, params), fields(user_id = %self.user_id, name = %params.name))]
    pub async fn create(&self, params: CreateFileParams) -> RegistryResult<file::Model> {
        if params.name.trim().is_empty() {
            return Err(RegistryError::Constraint("file name must not be empty".into()));
        }

        let txn = self.begin_write().await?;

        if let Some(hash) = &params.file_hash {
            let globals = GlobalFiles::new(&txn);
            // Shared lock keeps a concurrent orphan sweep from removing the entry
            // between this check and the insert below.
            let existing = globals.lock(std::slice::from_ref(hash), LockType::Share).await?;

            if existing.is_empty() {
                if !params.insert_global_file {
                    return Err(RegistryError::Constraint(format!(
                        "file hash {hash} does not reference a global file"
                    )));
                }
                globals
                    .insert(NewGlobalFile {
                        hash_id: hash.clone(),
                        file_type: params.file_type.clone(),
                        size: params.size,
                        url: params.url.clone(),
                        metadata: params.metadata.clone(),
                        creator: Some(self.user_id.clone()),
                    })
                    .await?;
                debug!(%hash, "created global file alongside record");
            }
        }

        let now = Utc::now();
        let id = params.id.unwrap_or_else(new_file_id);

        let model = file::ActiveModel {
            id: Set(id.clone()),
            user_id: Set(self.user_id.clone()),
            file_type: Set(params.file_type),
            file_hash: Set(params.file_hash),
            name: Set(params.name),
            size: Set(params.size),
            url: Set(params.url),
            metadata: Set(params.metadata),
            created_at: Set(now),
            updated_at: Set(now),
            accessed_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if let Some(knowledge_base_id) = params.knowledge_base_id {
            let link = knowledge_base_file::ActiveModel {
                knowledge_base_id: Set(knowledge_base_id),
                file_id: Set(id),
                created_at: Set(now),
            };
            knowledge_base_file::Entity::insert(link)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(model)
    }

    /// Insert a content store entry directly, without any file record.
    #[instrument(skip(self, entry), fields(hash = %entry.hash_id))]
    pub async fn create_global_file(
        &self,
        entry: NewGlobalFile,
    ) -> RegistryResult<global_file::Model> {
        Ok(GlobalFiles::new(self.conn).insert(entry).await?)
    }

    pub async fn check_hash(&self, hash: &str) -> RegistryResult<HashCheck> {
        Ok(GlobalFiles::new(self.conn).check(hash).await?)
    }

    /// Apply a metadata patch. Returns `None` when the record is absent or
    /// belongs to someone else; that is not an error.
    #[instrument(skip(self, patch), fields(user_id = %self.user_id))]
    pub async fn update(
        &self,
        id: &str,
        patch: UpdateFileParams,
    ) -> RegistryResult<Option<file::Model>> {
        let txn = self.begin_write().await?;

        let Some(existing) = self
            .scoped()
            .filter(file::Column::Id.eq(id))
            .lock(LockType::Update)
            .one(&txn)
            .await?
        else {
            debug!(%id, "update skipped, record not found");
            return Ok(None);
        };

        if patch == UpdateFileParams::default() {
            return Ok(Some(existing));
        }

        let mut active: file::ActiveModel = existing.into();

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(RegistryError::Constraint("file name must not be empty".into()));
            }
            active.name = Set(name);
        }
        if let Some(size) = patch.size {
            active.size = Set(size);
        }
        if let Some(file_type) = patch.file_type {
            active.file_type = Set(file_type);
        }
        if let Some(url) = patch.url {
            active.url = Set(url);
        }
        if let Some(metadata) = patch.metadata {
            active.metadata = Set(Some(metadata));
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&txn).await?;
        txn.commit().await?;

        Ok(Some(model))
    }

    /// Delete one record. Absent ids are treated as already deleted.
    pub async fn delete(&self, id: &str) -> RegistryResult<DeletedFiles> {
        self.delete_with(id, true).await
    }

    /// Delete one record, optionally skipping the orphan sweep for this call.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn delete_with(
        &self,
        id: &str,
        remove_global_file: bool,
    ) -> RegistryResult<DeletedFiles> {
        self.remove(Some(&[id.to_owned()]), remove_global_file).await
    }

    /// Delete several records in one transaction with a single orphan sweep.
    #[instrument(skip(self, ids), fields(user_id = %self.user_id, count = ids.len()))]
    pub async fn delete_many(&self, ids: &[String]) -> RegistryResult<DeletedFiles> {
        self.remove(Some(ids), true).await
    }

    /// Delete every record of the user.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn clear(&self) -> RegistryResult<DeletedFiles> {
        self.remove(None, true).await
    }

    /// Shared delete path. `ids == None` targets all of the user's records.
    async fn remove(
        &self,
        ids: Option<&[String]>,
        remove_global_file: bool,
    ) -> RegistryResult<DeletedFiles> {
        if ids.is_some_and(|ids| ids.is_empty()) {
            return Ok(DeletedFiles::default());
        }

        let txn = self.begin_write().await?;

        let files = match ids {
            Some(ids) => {
                let mut ids = ids.to_vec();
                ids.sort();
                ids.dedup();

                let mut files = Vec::with_capacity(ids.len());
                for batch in ids.chunks(BATCH_SIZE) {
                    let rows = self
                        .scoped()
                        .filter(file::Column::Id.is_in(batch.to_vec()))
                        .order_by_asc(file::Column::Id)
                        .lock(LockType::Update)
                        .all(&txn)
                        .await?;
                    files.extend(rows);
                }
                files
            }
            None => {
                self.scoped()
                    .order_by_asc(file::Column::Id)
                    .lock(LockType::Update)
                    .all(&txn)
                    .await?
            }
        };

        if files.is_empty() {
            return Ok(DeletedFiles::default());
        }

        let mut hashes: Vec<String> = files.iter().filter_map(|f| f.file_hash.clone()).collect();
        hashes.sort();
        hashes.dedup();

        let globals = GlobalFiles::new(&txn);
        globals.lock(&hashes, LockType::Update).await?;

        // Delete exactly the rows selected above, so a record created
        // concurrently for this user is neither removed nor left out of the sweep.
        for batch in files.chunks(BATCH_SIZE) {
            let batch_ids: Vec<String> = batch.iter().map(|f| f.id.clone()).collect();

            knowledge_base_file::Entity::delete_many()
                .filter(knowledge_base_file::Column::FileId.is_in(batch_ids.clone()))
                .exec(&txn)
                .await?;

            file::Entity::delete_many()
                .filter(file::Column::UserId.eq(self.user_id.as_str()))
                .filter(file::Column::Id.is_in(batch_ids))
                .exec(&txn)
                .await?;
        }

        let removed_global_files = if hashes.is_empty() || !remove_global_file {
            Vec::new()
        } else if self.policy.removal_disabled() {
            info!(
                hashes = hashes.len(),
                "global file removal disabled, retaining entries"
            );
            Vec::new()
        } else {
            globals.sweep_orphans(&hashes).await?
        };

        txn.commit().await?;

        if !removed_global_files.is_empty() {
            info!(
                files = files.len(),
                removed = removed_global_files.len(),
                "removed orphaned global files"
            );
        }

        Ok(DeletedFiles {
            files,
            removed_global_files,
        })
    }

    /// List the user's records matching `filter`, fully materialized.
    #[instrument(skip(self, filter), fields(user_id = %self.user_id))]
    pub async fn query(&self, filter: FileQuery) -> RegistryResult<Vec<file::Model>> {
        let mut select = self.scoped();

        if let Some(q) = filter.q.as_deref() {
            let term = escape_like(q.trim());
            if !term.is_empty() {
                select = select.filter(
                    Expr::expr(Func::lower(Expr::col(file::Column::Name)))
                        .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
                );
            }
        }

        if let Some(category) = filter.category {
            let prefixes = category.mime_prefixes();
            if !prefixes.is_empty() {
                let condition = prefixes.iter().fold(Condition::any(), |cond, prefix| {
                    cond.add(file::Column::FileType.starts_with(*prefix))
                });
                select = select.filter(condition);
            }
        }

        if let Some(knowledge_base_id) = filter.knowledge_base_id {
            select = select.filter(
                file::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(knowledge_base_file::Column::FileId)
                        .from(knowledge_base_file::Entity)
                        .and_where(knowledge_base_file::Column::KnowledgeBaseId.eq(knowledge_base_id))
                        .to_owned(),
                ),
            );
        } else if filter.show_files_in_knowledge_base == Some(false) {
            select = select.filter(
                file::Column::Id.not_in_subquery(
                    SeaQuery::select()
                        .column(knowledge_base_file::Column::FileId)
                        .from(knowledge_base_file::Entity)
                        .to_owned(),
                ),
            );
        }

        let (column, order) = match filter.sorter.as_deref().map(SortField::parse) {
            Some(Some(field)) => {
                let order = match filter.sort_type.unwrap_or_default() {
                    SortOrder::Asc => Order::Asc,
                    SortOrder::Desc => Order::Desc,
                };
                (field.column(), order)
            }
            Some(None) => {
                debug!(sorter = ?filter.sorter, "unrecognized sorter, falling back to created_at");
                (file::Column::CreatedAt, Order::Desc)
            }
            None => (file::Column::CreatedAt, Order::Desc),
        };

        let files = select
            .order_by(column, order.clone())
            .order_by(file::Column::Id, order)
            .all(self.conn)
            .await?;

        Ok(files)
    }

    pub async fn find_by_id(&self, id: &str) -> RegistryResult<file::Model> {
        self.scoped()
            .filter(file::Column::Id.eq(id))
            .one(self.conn)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("file {id}")))
    }

    pub async fn find_by_ids(&self, ids: &[String]) -> RegistryResult<Vec<file::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .scoped()
            .filter(file::Column::Id.is_in(ids.to_vec()))
            .order_by_desc(file::Column::CreatedAt)
            .all(self.conn)
            .await?)
    }

    pub async fn find_by_names(&self, names: &[String]) -> RegistryResult<Vec<file::Model>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .scoped()
            .filter(file::Column::Name.is_in(names.to_vec()))
            .order_by_desc(file::Column::CreatedAt)
            .all(self.conn)
            .await?)
    }

    /// Records of any user referencing `hash`.
    pub async fn count_files_by_hash(&self, hash: &str) -> RegistryResult<u64> {
        Ok(GlobalFiles::new(self.conn).count_references(hash).await?)
    }

    /// Sum of `size` over the user's records, duplicates included.
    pub async fn count_usage(&self) -> RegistryResult<i64> {
        // SUM over BIGINT is NUMERIC on PostgreSQL, so cast back for the i64 decode.
        let sum: Expr = Func::sum(Expr::col(file::Column::Size)).into();
        let total = self
            .scoped()
            .select_only()
            .column_as(
                Expr::from(Func::cast_as(
                    Func::coalesce([sum, Expr::val(0i64)]),
                    Alias::new("BIGINT"),
                )),
                "total",
            )
            .into_tuple::<i64>()
            .one(self.conn)
            .await?;

        Ok(total.unwrap_or(0))
    }

    /// Remove a content store entry that nothing references. Entries still in use
    /// are left alone and `false` is returned.
    #[instrument(skip(self))]
    pub async fn delete_global_file(&self, hash: &str) -> RegistryResult<bool> {
        let txn = self.begin_write().await?;
        let globals = GlobalFiles::new(&txn);
        globals.lock(&[hash.to_owned()], LockType::Update).await?;
        let removed = globals.remove_if_unreferenced(hash).await?;
        txn.commit().await?;

        if removed {
            info!(%hash, "removed global file");
        }
        Ok(removed)
    }

    /// Start a write transaction. SQLite takes the write lock at `BEGIN`, so a
    /// second writer waits on the busy timeout instead of failing to upgrade a
    /// read lock. Other backends ignore the mode.
    async fn begin_write(&self) -> Result<C::Transaction, DbErr> {
        self.conn
            .begin_with_options(TransactionOptions {
                sqlite_transaction_mode: Some(SqliteTransactionMode::Immediate),
                ..Default::default()
            })
            .await
    }

    fn scoped(&self) -> Select<file::Entity> {
        file::Entity::find().filter(file::Column::UserId.eq(self.user_id.as_str()))
    }
}

//! Business rules. Every function takes the request's transaction and
//! never commits it; the handler settles the transaction once with
//! [`commit_or_rollback`].

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod inventory;
pub mod messaging;
pub mod offer;
pub mod order_status;

#[cfg(test)]
pub(crate) mod testing;

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tracing::warn;

use crate::error::ApiError;

/// Begins a transaction that holds the database write lock from its first
/// statement.
///
/// SQLite only waits out a busy lock for a transaction that has not read
/// anything yet; a deferred transaction that reads and then writes fails at
/// once with `SQLITE_BUSY` when another writer is active. Taking the lock up
/// front makes concurrent writers queue behind each other instead.
pub async fn begin_write(db: &DatabaseConnection) -> Result<DatabaseTransaction, DbErr> {
    let txn = db.begin().await?;
    txn.execute_unprepared("UPDATE products SET id = id WHERE 0")
        .await?;
    Ok(txn)
}

/// Commits `txn` when `result` is `Ok`, rolls it back otherwise.
pub async fn commit_or_rollback<T>(
    txn: DatabaseTransaction,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = txn.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(err)
        }
    }
}

// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Cached copies of server records.

use ledgercommon::records::{Record, sort_by_date_desc};
use sqlx::{SqliteConnection, SqliteExecutor, query, query_scalar};

use super::{StoreError, StoreResult};

/// All cached records of kind `R`, most recent first.
pub(crate) async fn load_all<R: Record>(executor: impl SqliteExecutor<'_>) -> StoreResult<Vec<R>> {
    let payloads: Vec<String> =
        query_scalar("SELECT payload FROM local_record WHERE resource = ?1")
            .bind(R::KIND.as_str())
            .fetch_all(executor)
            .await?;
    let mut records = payloads
        .iter()
        .map(|payload| decode::<R>(payload))
        .collect::<StoreResult<Vec<R>>>()?;
    sort_by_date_desc(&mut records);
    Ok(records)
}

pub(crate) async fn load<R: Record>(
    executor: impl SqliteExecutor<'_>,
    id: R::Id,
) -> StoreResult<Option<R>> {
    let payload: Option<String> =
        query_scalar("SELECT payload FROM local_record WHERE resource = ?1 AND id = ?2")
            .bind(R::KIND.as_str())
            .bind(id.to_string())
            .fetch_optional(executor)
            .await?;
    payload.as_deref().map(decode::<R>).transpose()
}

pub(crate) async fn upsert<R: Record>(
    executor: impl SqliteExecutor<'_>,
    record: &R,
) -> StoreResult<()> {
    query(
        "INSERT INTO local_record (resource, id, payload, date)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (resource, id) DO UPDATE
        SET payload = excluded.payload, date = excluded.date",
    )
    .bind(R::KIND.as_str())
    .bind(record.id().to_string())
    .bind(serde_json::to_string(record)?)
    .bind(record.date())
    .execute(executor)
    .await?;
    Ok(())
}

/// Returns whether a record was removed.
pub(crate) async fn delete<R: Record>(
    executor: impl SqliteExecutor<'_>,
    id: R::Id,
) -> StoreResult<bool> {
    let result = query("DELETE FROM local_record WHERE resource = ?1 AND id = ?2")
        .bind(R::KIND.as_str())
        .bind(id.to_string())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Overwrites all cached records of kind `R`.
pub(crate) async fn replace_all<R: Record>(
    connection: &mut SqliteConnection,
    records: &[R],
) -> StoreResult<()> {
    query("DELETE FROM local_record WHERE resource = ?1")
        .bind(R::KIND.as_str())
        .execute(&mut *connection)
        .await?;
    for record in records {
        upsert(&mut *connection, record).await?;
    }
    Ok(())
}

fn decode<R: Record>(payload: &str) -> StoreResult<R> {
    serde_json::from_str(payload).map_err(|error| StoreError::Corrupted {
        table: "local_record",
        reason: format!("{}: {error}", R::KIND.record_name()),
    })
}

//! Postgres implementation of [`SubmissionStore`].
//!
//! Plain `sqlx::query` + `bind` + `try_get` (no compile-time checked macros,
//! so the crate builds without a live database). All pair mutations run in a
//! transaction; `register` additionally takes a per-key advisory lock so two
//! concurrent uploads from the same submitter cannot both stay active.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tally_schemas::{CanonicalRecord, PlaceType, Submission, SubmissionStatus};
use uuid::Uuid;

use crate::versioning::{storage_key_for, version_from_prior_count};
use crate::{NewSubmission, StoreError, SubmissionStore, ENV_DB_URL};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using TALLY_DATABASE_URL.
    pub async fn connect_from_env() -> anyhow::Result<Self> {
        let url = std::env::var(ENV_DB_URL)
            .with_context(|| format!("missing env var {ENV_DB_URL}"))?;

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await
            .context("failed to connect to Postgres")?;

        Ok(Self::new(pool))
    }

    /// Run embedded SQLx migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("db migrate failed")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const SUBMISSION_COLUMNS: &str = r#"
    id, submitter, region, report_date, created_at, version, storage_key,
    status, cancelled, peer_id, rows, errors, warnings, source_urls, notes
"#;

fn submission_from_row(row: &PgRow) -> Result<Submission, StoreError> {
    let status_raw: String = row.try_get("status")?;
    let status = SubmissionStatus::parse(&status_raw).map_err(StoreError::Backend)?;

    let rows_json: serde_json::Value = row.try_get("rows")?;
    let errors_json: serde_json::Value = row.try_get("errors")?;
    let warnings_json: serde_json::Value = row.try_get("warnings")?;
    let source_urls_json: serde_json::Value = row.try_get("source_urls")?;

    Ok(Submission {
        id: row.try_get("id")?,
        owner: row.try_get("submitter")?,
        region: row.try_get("region")?,
        report_date: row.try_get("report_date")?,
        created_at: row.try_get("created_at")?,
        version: row.try_get("version")?,
        storage_key: row.try_get("storage_key")?,
        status,
        cancelled: row.try_get("cancelled")?,
        peer_id: row.try_get("peer_id")?,
        rows: serde_json::from_value(rows_json)
            .context("decode submission rows")
            .map_err(StoreError::Backend)?,
        errors: serde_json::from_value(errors_json)
            .context("decode submission errors")
            .map_err(StoreError::Backend)?,
        warnings: serde_json::from_value(warnings_json)
            .context("decode submission warnings")
            .map_err(StoreError::Backend)?,
        source_urls: serde_json::from_value(source_urls_json)
            .context("decode submission source_urls")
            .map_err(StoreError::Backend)?,
        notes: row.try_get("notes")?,
    })
}

fn canonical_from_row(row: &PgRow) -> Result<CanonicalRecord, StoreError> {
    let place_type_raw: String = row.try_get("place_type")?;
    let place_type = PlaceType::parse(&place_type_raw).map_err(StoreError::Backend)?;

    Ok(CanonicalRecord {
        id: row.try_get("id")?,
        region: row.try_get("region")?,
        place_type,
        place_code: row.try_get("place_code")?,
        place_name: row.try_get("place_name")?,
        date: row.try_get("date")?,
        confirmed: row.try_get("confirmed")?,
        deaths: row.try_get("deaths")?,
        population: row.try_get("population")?,
        order_for_place: row.try_get("order_for_place")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Fetch one submission inside a transaction, locking the row.
async fn fetch_locked(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Submission, StoreError> {
    let sql = format!(
        "select {SUBMISSION_COLUMNS} from submissions where id = $1 for update"
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::NotFound(id))?;
    submission_from_row(&row)
}

/// Guard a status flip through the one authoritative transition table.
fn require_transition(
    sub: &Submission,
    to: SubmissionStatus,
) -> Result<(), StoreError> {
    if !sub.status.can_become(to) {
        return Err(StoreError::invalid_state(format!(
            "submission {} cannot move {} -> {}",
            sub.id,
            sub.status.as_str(),
            to.as_str()
        )));
    }
    Ok(())
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn register(&self, new: NewSubmission) -> Result<Submission, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serialize concurrent writers sharing this (submitter, region, date)
        // key for the duration of the transaction.
        let key = format!("{}/{}/{}", new.owner, new.region, new.report_date);
        sqlx::query("select pg_advisory_xact_lock(hashtext($1))")
            .bind(&key)
            .execute(&mut *tx)
            .await?;

        let (prior,): (i64,) = sqlx::query_as(
            r#"
            select count(*)::bigint
            from submissions
            where submitter = $1 and region = $2 and report_date = $3
            "#,
        )
        .bind(&new.owner)
        .bind(&new.region)
        .bind(new.report_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            update submissions
            set cancelled = true
            where submitter = $1 and region = $2 and report_date = $3
              and not cancelled
            "#,
        )
        .bind(&new.owner)
        .bind(&new.region)
        .bind(new.report_date)
        .execute(&mut *tx)
        .await?;

        let version = version_from_prior_count(prior as u64);
        let storage_key = storage_key_for(&new.region, new.report_date, &new.owner, version);
        let sub = Submission {
            id: Uuid::new_v4(),
            owner: new.owner,
            region: new.region,
            report_date: new.report_date,
            created_at: Utc::now(),
            version,
            storage_key,
            status: SubmissionStatus::Received,
            cancelled: false,
            peer_id: None,
            rows: new.rows,
            errors: Vec::new(),
            warnings: new.warnings,
            source_urls: new.source_urls,
            notes: new.notes,
        };

        sqlx::query(
            r#"
            insert into submissions (
              id, submitter, region, report_date, created_at, version,
              storage_key, status, cancelled, rows, errors, warnings,
              source_urls, notes
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14
            )
            "#,
        )
        .bind(sub.id)
        .bind(&sub.owner)
        .bind(&sub.region)
        .bind(sub.report_date)
        .bind(sub.created_at)
        .bind(sub.version)
        .bind(&sub.storage_key)
        .bind(sub.status.as_str())
        .bind(sub.cancelled)
        .bind(serde_json::to_value(&sub.rows).context("encode rows").map_err(StoreError::Backend)?)
        .bind(serde_json::Value::Array(vec![]))
        .bind(serde_json::to_value(&sub.warnings).context("encode warnings").map_err(StoreError::Backend)?)
        .bind(serde_json::to_value(&sub.source_urls).context("encode source_urls").map_err(StoreError::Backend)?)
        .bind(&sub.notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(sub)
    }

    async fn fetch(&self, id: Uuid) -> Result<Submission, StoreError> {
        let sql = format!("select {SUBMISSION_COLUMNS} from submissions where id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        submission_from_row(&row)
    }

    async fn siblings_of(&self, sub: &Submission) -> Result<Vec<Submission>, StoreError> {
        let sql = format!(
            r#"
            select {SUBMISSION_COLUMNS}
            from submissions
            where region = $1
              and report_date = $2
              and not cancelled
              and status in ('RECEIVED', 'CHECK_FAILED')
              and id <> $3
              and submitter <> $4
            order by created_at desc, id desc
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(&sub.region)
            .bind(sub.report_date)
            .bind(sub.id)
            .bind(&sub.owner)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(submission_from_row).collect()
    }

    async fn record_mismatch(
        &self,
        a: Uuid,
        b: Uuid,
        errors: &[String],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let sub_a = fetch_locked(&mut tx, a).await?;
        let sub_b = fetch_locked(&mut tx, b).await?;
        require_transition(&sub_a, SubmissionStatus::CheckFailed)?;
        require_transition(&sub_b, SubmissionStatus::CheckFailed)?;

        let errors_json = serde_json::to_value(errors)
            .context("encode errors")
            .map_err(StoreError::Backend)?;
        for id in [a, b] {
            sqlx::query(
                r#"
                update submissions
                set status = 'CHECK_FAILED', errors = $2
                where id = $1
                "#,
            )
            .bind(id)
            .bind(&errors_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn link_pair(&self, a: Uuid, b: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let sub_a = fetch_locked(&mut tx, a).await?;
        let sub_b = fetch_locked(&mut tx, b).await?;
        require_transition(&sub_a, SubmissionStatus::Received)?;
        require_transition(&sub_b, SubmissionStatus::Received)?;

        for (id, peer) in [(a, b), (b, a)] {
            sqlx::query(
                r#"
                update submissions
                set status = 'RECEIVED', errors = '[]'::jsonb, peer_id = $2
                where id = $1
                "#,
            )
            .bind(id)
            .bind(peer)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn deploy_pair(&self, published: Uuid, peer: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let sub = fetch_locked(&mut tx, published).await?;
        let peer_sub = fetch_locked(&mut tx, peer).await?;

        if !sub.ready_to_publish() || sub.peer_id != Some(peer) {
            return Err(StoreError::invalid_state(format!(
                "submission {} is not ready to deploy (status={}, cancelled={}, peer={:?})",
                sub.id,
                sub.status.as_str(),
                sub.cancelled,
                sub.peer_id,
            )));
        }
        if peer_sub.peer_id != Some(published) {
            return Err(StoreError::invalid_state(format!(
                "peer link is not mutual between {} and {}",
                published, peer
            )));
        }
        require_transition(&sub, SubmissionStatus::Deployed)?;
        require_transition(&peer_sub, SubmissionStatus::Deployed)?;

        for id in [published, peer] {
            sqlx::query("update submissions set status = 'DEPLOYED' where id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let now = Utc::now();
        for row in &sub.rows {
            let (next_order,): (i32,) = sqlx::query_as(
                r#"
                select coalesce(max(order_for_place), 0)::int + 1
                from canonical_records
                where region = $1
                  and place_type = $2
                  and place_code is not distinct from $3
                  and place_name is not distinct from $4
                "#,
            )
            .bind(&sub.region)
            .bind(row.place_type.as_str())
            .bind(row.place_code)
            .bind(&row.place_name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                insert into canonical_records (
                  id, region, place_type, place_code, place_name, date,
                  confirmed, deaths, population, order_for_place, created_at
                ) values (
                  $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
                )
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&sub.region)
            .bind(row.place_type.as_str())
            .bind(row.place_code)
            .bind(&row.place_name)
            .bind(sub.report_date)
            .bind(row.confirmed)
            .bind(row.deaths)
            .bind(Option::<i64>::None)
            .bind(next_order)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn submissions_for_key(
        &self,
        owner: &str,
        region: &str,
        report_date: NaiveDate,
    ) -> Result<Vec<Submission>, StoreError> {
        let sql = format!(
            r#"
            select {SUBMISSION_COLUMNS}
            from submissions
            where submitter = $1 and region = $2 and report_date = $3
            order by created_at asc, id asc
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(owner)
            .bind(region)
            .bind(report_date)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(submission_from_row).collect()
    }

    async fn canonical_for_region(
        &self,
        region: &str,
    ) -> Result<Vec<CanonicalRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            select id, region, place_type, place_code, place_name, date,
                   confirmed, deaths, population, order_for_place, created_at
            from canonical_records
            where region = $1
            order by date asc, order_for_place asc
            "#,
        )
        .bind(region)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(canonical_from_row).collect()
    }
}

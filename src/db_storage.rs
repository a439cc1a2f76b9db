use crate::errors::{AppError, ResultExt};
use crate::models::{DeliveryAttemptLog, LeadRecord};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Bind parameters per `leads` row.
pub const LEAD_COLUMNS: usize = 24;

/// Postgres caps a statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

/// Rows per multi-row insert, kept well under the bind parameter cap.
pub const LEADS_PER_STATEMENT: usize = 1_000;

const _: () = assert!(LEADS_PER_STATEMENT * LEAD_COLUMNS <= MAX_BIND_PARAMS);

/// Datastore capabilities the relay needs.
///
/// The schema is owned elsewhere; the relay only inserts audit rows and
/// leads, and reads a user's webhook override.
#[async_trait]
pub trait RelayStore: Send + Sync {
    /// Persists the single audit row of one relay run.
    async fn insert_delivery_log(&self, log: &DeliveryAttemptLog) -> Result<(), AppError>;

    /// Inserts all leads in one batch and returns how many rows were written.
    async fn insert_leads(&self, leads: &[LeadRecord]) -> Result<u64, AppError>;

    /// The user's saved webhook URL, if any.
    async fn user_webhook_url(&self, user_id: Uuid) -> Result<Option<String>, AppError>;
}

/// Postgres-backed [`RelayStore`].
#[derive(Clone)]
pub struct PgRelayStore {
    pool: PgPool,
}

impl PgRelayStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelayStore for PgRelayStore {
    async fn insert_delivery_log(&self, log: &DeliveryAttemptLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_logs
                (user_id, payload, webhook_url, status, attempts,
                 last_attempt_at, response_code, response_body)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(log.user_id)
        .bind(sqlx::types::Json(&log.payload))
        .bind(&log.webhook_url)
        .bind(log.status.as_str())
        .bind(log.attempts)
        .bind(log.last_attempt_at)
        .bind(log.response_code)
        .bind(&log.response_body)
        .execute(&self.pool)
        .await
        .context("inserting webhook log")?;

        tracing::debug!(
            "Stored webhook log for user_id={} status={}",
            log.user_id,
            log.status.as_str()
        );
        Ok(())
    }

    async fn insert_leads(&self, leads: &[LeadRecord]) -> Result<u64, AppError> {
        if leads.is_empty() {
            return Ok(0);
        }

        // One transaction across chunks keeps the batch all or nothing
        let mut tx = self
            .pool
            .begin()
            .await
            .context("starting lead insert transaction")?;
        let mut saved = 0u64;

        for chunk in leads.chunks(LEADS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO leads (user_id, name, niche, city, country, rating, reviews, phone, \
                 email, additional_emails, website, has_website, instagram, facebook, twitter, \
                 youtube, tiktok, linkedin, address, maps_url, image_url, last_review_date, \
                 campaign, source) ",
            );

            builder.push_values(chunk, |mut row, lead| {
                row.push_bind(lead.user_id)
                    .push_bind(lead.name.clone())
                    .push_bind(lead.niche.clone())
                    .push_bind(lead.city.clone())
                    .push_bind(lead.country.clone())
                    .push_bind(lead.rating)
                    .push_bind(lead.reviews)
                    .push_bind(lead.phone.clone())
                    .push_bind(lead.email.clone())
                    .push_bind(lead.additional_emails.clone())
                    .push_bind(lead.website.clone())
                    .push_bind(lead.has_website)
                    .push_bind(lead.instagram.clone())
                    .push_bind(lead.facebook.clone())
                    .push_bind(lead.twitter.clone())
                    .push_bind(lead.youtube.clone())
                    .push_bind(lead.tiktok.clone())
                    .push_bind(lead.linkedin.clone())
                    .push_bind(lead.address.clone())
                    .push_bind(lead.maps_url.clone())
                    .push_bind(lead.image_url.clone())
                    .push_bind(lead.last_review_date.clone())
                    .push_bind(lead.campaign.clone())
                    .push_bind(lead.source.clone());
            });
            builder.push(" RETURNING id");

            let inserted = builder
                .build()
                .fetch_all(&mut *tx)
                .await
                .with_context(|| {
                    format!("inserting {} of {} leads", chunk.len(), leads.len())
                })?;
            saved += inserted.len() as u64;
        }

        tx.commit().await.context("committing lead insert")?;

        if leads.len() > LEADS_PER_STATEMENT {
            tracing::debug!(
                "Inserted {} leads in {} statements",
                saved,
                leads.len().div_ceil(LEADS_PER_STATEMENT)
            );
        }
        Ok(saved)
    }

    async fn user_webhook_url(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        let url = sqlx::query_scalar::<_, Option<String>>(
            "SELECT webhook_url FROM user_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("reading user settings")?
        .flatten();

        Ok(url)
    }
}

//! Redis-backed generation store.
//!
//! Job records are serialized JSON under `{prefix}:gen:{id}`, with an id set
//! at `{prefix}:gen:active` feeding the reconciliation sweep. Status writes
//! go through a value compare-and-swap (Lua) so racing reconcilers re-read
//! and re-evaluate instead of clobbering each other.

use async_trait::async_trait;
use metrics::counter;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use tracing::{debug, info, warn};

use fastcut_models::{evaluate, RenderJob, RenderJobId, StatusUpdate, Transition};

use crate::error::{StoreError, StoreResult};
use crate::store::{GenerationStore, Upserted};

/// Guarded write: replace the value only if it still equals what we read.
const CAS_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2])
    return 1
else
    return 0
end
"#;

/// Re-read attempts before giving up on a contended record.
const MAX_CAS_ATTEMPTS: u32 = 5;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL
    pub redis_url: String,
    /// Key namespace prefix
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "fastcut".to_string(),
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("STORE_KEY_PREFIX")
                .unwrap_or_else(|_| "fastcut".to_string()),
        }
    }
}

/// Redis generation store client.
pub struct RedisGenerationStore {
    client: redis::Client,
    config: StoreConfig,
    cas: Script,
}

impl RedisGenerationStore {
    /// Create a new store.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self {
            client,
            config,
            cas: Script::new(CAS_SCRIPT),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(StoreConfig::from_env())
    }

    fn job_key(&self, id: &RenderJobId) -> String {
        format!("{}:gen:{}", self.config.key_prefix, id)
    }

    fn active_key(&self) -> String {
        format!("{}:gen:active", self.config.key_prefix)
    }

    async fn conn(&self) -> StoreResult<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn read(
        &self,
        conn: &mut MultiplexedConnection,
        id: &RenderJobId,
    ) -> StoreResult<Option<(String, RenderJob)>> {
        let raw: Option<String> = conn.get(self.job_key(id)).await?;
        match raw {
            Some(json) => {
                let job: RenderJob = serde_json::from_str(&json)?;
                Ok(Some((json, job)))
            }
            None => Ok(None),
        }
    }

    /// Swap the stored value if it is still `old`. Returns true on success.
    async fn swap(
        &self,
        conn: &mut MultiplexedConnection,
        id: &RenderJobId,
        old: &str,
        new: &str,
    ) -> StoreResult<bool> {
        let swapped: i32 = self
            .cas
            .key(self.job_key(id))
            .arg(old)
            .arg(new)
            .invoke_async(conn)
            .await?;
        Ok(swapped == 1)
    }
}

#[async_trait]
impl GenerationStore for RedisGenerationStore {
    async fn upsert_pending(&self, job: &RenderJob) -> StoreResult<Upserted> {
        let mut conn = self.conn().await?;
        let key = self.job_key(&job.id);
        let json = serde_json::to_string(job)?;

        // Fast path: first submission
        let created: bool = redis::cmd("SET")
            .arg(&key)
            .arg(&json)
            .arg("NX")
            .query_async(&mut conn)
            .await?;

        if created {
            conn.sadd::<_, _, ()>(self.active_key(), job.id.as_str())
                .await?;
            counter!("fastcut_store_upserts_total", "outcome" => "created").increment(1);
            info!(job_id = %job.id, "Created render job record");
            return Ok(Upserted::Created);
        }

        // Duplicate submission: refresh the envelope on the existing record,
        // leave lifecycle fields alone
        for _ in 0..MAX_CAS_ATTEMPTS {
            let (old_json, mut existing) = self
                .read(&mut conn, &job.id)
                .await?
                .ok_or_else(|| StoreError::not_found(job.id.as_str()))?;

            existing.envelope = job.envelope.clone();
            existing.campaign_id = job.campaign_id.clone();
            existing.updated_at = chrono::Utc::now();

            let new_json = serde_json::to_string(&existing)?;
            if self.swap(&mut conn, &job.id, &old_json, &new_json).await? {
                counter!("fastcut_store_upserts_total", "outcome" => "updated").increment(1);
                debug!(job_id = %job.id, "Refreshed existing render job record");
                return Ok(Upserted::Updated);
            }
        }

        Err(StoreError::Conflict(job.id.to_string()))
    }

    async fn get(&self, id: &RenderJobId) -> StoreResult<Option<RenderJob>> {
        let mut conn = self.conn().await?;
        Ok(self.read(&mut conn, id).await?.map(|(_, job)| job))
    }

    async fn record_backend_call(&self, id: &RenderJobId, call_id: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;

        for _ in 0..MAX_CAS_ATTEMPTS {
            let (old_json, mut job) = self
                .read(&mut conn, id)
                .await?
                .ok_or_else(|| StoreError::not_found(id.as_str()))?;

            job.backend_call_id = Some(call_id.to_string());
            job.updated_at = chrono::Utc::now();

            let new_json = serde_json::to_string(&job)?;
            if self.swap(&mut conn, id, &old_json, &new_json).await? {
                debug!(job_id = %id, call_id, "Recorded backend call id");
                return Ok(());
            }
        }

        Err(StoreError::Conflict(id.to_string()))
    }

    async fn apply_status(&self, id: &RenderJobId, update: StatusUpdate) -> StoreResult<Transition> {
        let mut conn = self.conn().await?;

        for _ in 0..MAX_CAS_ATTEMPTS {
            let (old_json, current) = self
                .read(&mut conn, id)
                .await?
                .ok_or_else(|| StoreError::not_found(id.as_str()))?;

            let transition = evaluate(&current, &update);
            let job = match &transition {
                Transition::Apply { job, .. } => job,
                Transition::Ignore(reason) => {
                    debug!(job_id = %id, ?reason, "Status update ignored");
                    counter!("fastcut_store_transitions_total", "outcome" => "ignored")
                        .increment(1);
                    return Ok(transition);
                }
            };

            let new_json = serde_json::to_string(job.as_ref())?;
            if self.swap(&mut conn, id, &old_json, &new_json).await? {
                if job.is_terminal() {
                    conn.srem::<_, _, ()>(self.active_key(), id.as_str()).await?;
                }
                counter!(
                    "fastcut_store_transitions_total",
                    "outcome" => "applied",
                    "to" => job.status.as_str()
                )
                .increment(1);
                info!(job_id = %id, status = %job.status, progress = job.progress, "Applied status update");
                return Ok(transition);
            }

            warn!(job_id = %id, "Concurrent status write, re-evaluating");
        }

        Err(StoreError::Conflict(id.to_string()))
    }

    async fn get_for_retry(&self, id: &RenderJobId) -> StoreResult<RenderJob> {
        let mut conn = self.conn().await?;
        let (_, job) = self
            .read(&mut conn, id)
            .await?
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        if !job.status.is_retryable() {
            return Err(StoreError::not_retryable(id.as_str(), job.status));
        }

        Ok(job)
    }

    async fn list_active(&self) -> StoreResult<Vec<RenderJobId>> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn.smembers(self.active_key()).await?;
        Ok(ids.into_iter().map(RenderJobId::from_string).collect())
    }
}

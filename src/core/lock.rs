use crate::domain::model::{Document, Filter};
use crate::domain::ports::DocumentStore;
use crate::utils::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

pub const LOCK_COLLECTION: &str = "migrationLock";
pub const LOCK_ID: &str = "migration-lock";

#[derive(Debug, Clone, PartialEq)]
pub struct LockSettings {
    pub lease: Duration,
    pub retry_interval: Duration,
    pub max_attempts: u32,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(300),
            retry_interval: Duration::from_millis(1000),
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockDocument {
    #[serde(rename = "_id")]
    id: String,
    owner: String,
    acquired_at: i64,
    expires_at: i64,
}

impl LockDocument {
    fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(MigrationError::StoreError {
                message: "Lock document did not serialize to an object".to_string(),
            }),
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 以單一文件實作的 runner 互斥鎖
///
/// owner 是每個 instance 各自的 token，同一個 execution id 的兩個 runner
/// 也不會共用同一把鎖。
pub struct MigrationLock<'a> {
    store: &'a dyn DocumentStore,
    owner: String,
    settings: LockSettings,
    // 目前持有的 lease 到期時間，未持有時為 0
    expires_at: AtomicI64,
}

impl<'a> MigrationLock<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        execution_id: &str,
        settings: LockSettings,
    ) -> Self {
        Self {
            store,
            owner: format!("{}-{}", execution_id, uuid::Uuid::new_v4().simple()),
            settings,
            expires_at: AtomicI64::new(0),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn fresh_lock(&self) -> LockDocument {
        let now = now_millis();
        LockDocument {
            id: LOCK_ID.to_string(),
            owner: self.owner.clone(),
            acquired_at: now,
            expires_at: now + self.settings.lease.as_millis() as i64,
        }
    }

    async fn current_holder(&self) -> Result<String> {
        let holder = self
            .store
            .find_one(LOCK_COLLECTION, &Filter::by_id(LOCK_ID))
            .await?
            .and_then(|doc| doc.get("owner").and_then(|o| o.as_str()).map(str::to_string));
        Ok(holder.unwrap_or_else(|| String::from("<released>")))
    }

    async fn try_acquire(&self) -> Result<std::result::Result<(), String>> {
        let wanted = self.fresh_lock();

        match self
            .store
            .insert_one(LOCK_COLLECTION, wanted.to_document()?)
            .await
        {
            Ok(_) => {
                self.expires_at.store(wanted.expires_at, Ordering::SeqCst);
                return Ok(Ok(()));
            }
            Err(MigrationError::DuplicateKeyError { .. }) => {}
            Err(e) => return Err(e),
        }

        let existing = self
            .store
            .find_one(LOCK_COLLECTION, &Filter::by_id(LOCK_ID))
            .await?;
        let Some(existing) = existing else {
            // 剛好被釋放，下一輪再試
            return Ok(Err(String::from("<released>")));
        };
        let existing: LockDocument = serde_json::from_value(serde_json::Value::Object(existing))?;

        if existing.owner == self.owner || existing.expires_at <= wanted.acquired_at {
            // compare-and-swap：只有在鎖沒被別人更新過時才接手
            let cas = Filter::by_id(LOCK_ID)
                .eq("owner", existing.owner.clone())
                .eq("expiresAt", existing.expires_at);
            if self
                .store
                .replace_one(LOCK_COLLECTION, &cas, wanted.to_document()?)
                .await?
            {
                if existing.owner != self.owner {
                    tracing::warn!("🔓 Took over expired migration lock from {}", existing.owner);
                }
                self.expires_at.store(wanted.expires_at, Ordering::SeqCst);
                return Ok(Ok(()));
            }
        }

        Ok(Err(existing.owner))
    }

    pub async fn acquire(&self) -> Result<()> {
        let attempts = self.settings.max_attempts.max(1);
        let mut holder = String::new();

        for attempt in 1..=attempts {
            match self.try_acquire().await? {
                Ok(()) => {
                    tracing::debug!("🔒 Migration lock acquired by {}", self.owner);
                    return Ok(());
                }
                Err(owner) => {
                    tracing::info!(
                        "⏳ Migration lock held by {} (attempt {}/{})",
                        owner,
                        attempt,
                        attempts
                    );
                    holder = owner;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.retry_interval).await;
            }
        }

        Err(MigrationError::LockUnavailableError { owner: holder })
    }

    /// 延長 lease；鎖已被別人接手時回傳 LockUnavailableError
    pub async fn refresh(&self) -> Result<()> {
        let held = self.expires_at.load(Ordering::SeqCst);
        let renewed = self.fresh_lock();
        let cas = Filter::by_id(LOCK_ID)
            .eq("owner", self.owner.clone())
            .eq("expiresAt", held);

        if self
            .store
            .replace_one(LOCK_COLLECTION, &cas, renewed.to_document()?)
            .await?
        {
            self.expires_at.store(renewed.expires_at, Ordering::SeqCst);
            tracing::debug!("🔒 Migration lock lease extended for {}", self.owner);
            return Ok(());
        }

        self.expires_at.store(0, Ordering::SeqCst);
        let holder = self.current_holder().await?;
        tracing::error!("❌ Migration lock lease lost to {}", holder);
        Err(MigrationError::LockUnavailableError { owner: holder })
    }

    /// 只釋放自己持有的鎖
    pub async fn release(&self) -> Result<bool> {
        let deleted = self
            .store
            .delete_many(
                LOCK_COLLECTION,
                &Filter::by_id(LOCK_ID).eq("owner", self.owner.clone()),
            )
            .await?;
        self.expires_at.store(0, Ordering::SeqCst);
        if deleted > 0 {
            tracing::debug!("🔓 Migration lock released by {}", self.owner);
        }
        Ok(deleted > 0)
    }
}

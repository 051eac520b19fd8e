use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::config::DriveupConfig;
use crate::error::DriveupError;
use crate::oauth::device::{DeviceAuthorizer, DeviceCodeAuthorizer};
use crate::oauth::refresh::{OAuthRefresher, TokenRefresher};
use crate::oauth::store::{FileTokenStore, TokenStore};
use crate::oauth::token::TokenRecord;
use crate::transport::{FormTransport, ReqwestTransport};

/// Where the manager is in its acquisition sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NoToken,
    HaveRefreshable,
    Authorized,
}

/// Which path produced the returned access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cached,
    Refreshed,
    DeviceCode,
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenSource::Cached => "cached token",
            TokenSource::Refreshed => "refresh token",
            TokenSource::DeviceCode => "device code login",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct AcquiredToken {
    pub access_token: String,
    pub source: TokenSource,
}

/// Produces a usable access token: silent refresh first, interactive
/// device-code login as the fallback. Whichever succeeds is persisted.
pub struct TokenLifecycleManager {
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    authorizer: Arc<dyn DeviceAuthorizer>,
    reuse_unexpired: bool,
    state: Mutex<LifecycleState>,
}

impl std::fmt::Debug for TokenLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLifecycleManager")
            .field("reuse_unexpired", &self.reuse_unexpired)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl TokenLifecycleManager {
    pub fn new(
        store: Arc<dyn TokenStore>,
        refresher: Arc<dyn TokenRefresher>,
        authorizer: Arc<dyn DeviceAuthorizer>,
    ) -> Self {
        Self {
            store,
            refresher,
            authorizer,
            reuse_unexpired: false,
            state: Mutex::new(LifecycleState::NoToken),
        }
    }

    /// Return a still-fresh cached access token without contacting the server.
    pub fn with_cached_token_reuse(mut self, enabled: bool) -> Self {
        self.reuse_unexpired = enabled;
        self
    }

    /// Wire the production components from configuration.
    pub fn from_config(config: &DriveupConfig, client: reqwest::Client) -> Self {
        let transport: Arc<dyn FormTransport> = Arc::new(ReqwestTransport::new(client));
        Self::new(
            Arc::new(FileTokenStore::new(config.token_file.clone())),
            Arc::new(OAuthRefresher::new(transport.clone(), &config.auth)),
            Arc::new(DeviceCodeAuthorizer::new(transport, &config.auth)),
        )
        .with_cached_token_reuse(config.auth.reuse_unexpired_access_token)
    }

    pub fn state(&self) -> LifecycleState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: LifecycleState) {
        tracing::debug!(state = ?next, "token lifecycle transition");
        match self.state.lock() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Return a valid access token, acquiring one if needed.
    pub async fn get_valid_token(&self, cancel: &CancellationToken) -> Result<String, DriveupError> {
        self.acquire(cancel).await.map(|t| t.access_token)
    }

    /// Like [`get_valid_token`](Self::get_valid_token), also reporting which path succeeded.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<AcquiredToken, DriveupError> {
        self.set_state(LifecycleState::NoToken);

        if let Some(record) = self.store.load() {
            if self.reuse_unexpired && record.is_fresh_at(chrono::Utc::now()) {
                tracing::info!("reusing cached access token");
                self.set_state(LifecycleState::Authorized);
                return Ok(AcquiredToken {
                    access_token: record.access_token,
                    source: TokenSource::Cached,
                });
            }

            if let Some(refresh_token) = record.refresh_token.as_deref() {
                self.set_state(LifecycleState::HaveRefreshable);
                tracing::info!("refreshing access token");
                match self.refresher.refresh(refresh_token).await {
                    Ok(mut fresh) => {
                        fresh.retain_refresh_token(refresh_token);
                        tracing::info!("access token refreshed");
                        return Ok(self.finish(fresh, TokenSource::Refreshed));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "token refresh failed, falling back to device code login");
                    }
                }
            } else {
                tracing::info!("stored token has no refresh token");
            }
        } else {
            tracing::info!("no stored token");
        }

        self.set_state(LifecycleState::NoToken);
        let record = self.authorizer.authorize(cancel).await.map_err(|e| {
            tracing::error!(error = %e, code = e.code(), "device code login failed");
            e
        })?;
        Ok(self.finish(record, TokenSource::DeviceCode))
    }

    fn finish(&self, record: TokenRecord, source: TokenSource) -> AcquiredToken {
        if let Err(e) = self.store.save(&record) {
            tracing::error!(error = %e, "could not persist token, the next run will need to log in again");
        }
        self.set_state(LifecycleState::Authorized);
        AcquiredToken {
            access_token: record.access_token,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        record: Mutex<Option<TokenRecord>>,
        fail_saves: bool,
        saves: AtomicUsize,
    }

    impl TokenStore for MemoryStore {
        fn load(&self) -> Option<TokenRecord> {
            self.record.lock().unwrap().clone()
        }

        fn save(&self, record: &TokenRecord) -> Result<(), DriveupError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_saves {
                return Err(DriveupError::StorageWriteFailed {
                    path: "mem".into(),
                    detail: "disk full".into(),
                });
            }
            *self.record.lock().unwrap() = Some(record.clone());
            Ok(())
        }
    }

    struct FixedRefresher(Result<TokenRecord, String>);

    #[async_trait]
    impl TokenRefresher for FixedRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<TokenRecord, DriveupError> {
            self.0.clone().map_err(DriveupError::RefreshRejected)
        }
    }

    struct CountingAuthorizer {
        calls: AtomicUsize,
        outcome: Option<TokenRecord>,
    }

    #[async_trait]
    impl DeviceAuthorizer for CountingAuthorizer {
        async fn authorize(&self, _cancel: &CancellationToken) -> Result<TokenRecord, DriveupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone().ok_or(DriveupError::DeviceFlowExpired)
        }
    }

    fn manager(
        store: Arc<MemoryStore>,
        refresher: Result<TokenRecord, String>,
        device: Option<TokenRecord>,
    ) -> (TokenLifecycleManager, Arc<CountingAuthorizer>) {
        let authorizer = Arc::new(CountingAuthorizer {
            calls: AtomicUsize::new(0),
            outcome: device,
        });
        let mgr = TokenLifecycleManager::new(
            store,
            Arc::new(FixedRefresher(refresher)),
            authorizer.clone(),
        );
        (mgr, authorizer)
    }

    fn store_with(record: Option<TokenRecord>) -> Arc<MemoryStore> {
        Arc::new(MemoryStore {
            record: Mutex::new(record),
            ..MemoryStore::default()
        })
    }

    #[tokio::test]
    async fn initial_state_is_no_token() {
        let (mgr, _) = manager(store_with(None), Err("x".into()), None);
        assert_eq!(mgr.state(), LifecycleState::NoToken);
    }

    #[tokio::test]
    async fn refresh_without_rotation_keeps_old_refresh_token() {
        let store = store_with(Some(TokenRecord::new("old", Some("keep-me".into()))));
        let (mgr, _) = manager(store.clone(), Ok(TokenRecord::new("new", None)), None);

        let acquired = mgr.acquire(&CancellationToken::new()).await.unwrap();
        assert_eq!(acquired.source, TokenSource::Refreshed);

        let saved = store.load().unwrap();
        assert_eq!(saved.access_token, "new");
        assert_eq!(saved.refresh_token.as_deref(), Some("keep-me"));
    }

    #[tokio::test]
    async fn record_without_refresh_token_goes_to_device_flow() {
        let store = store_with(Some(TokenRecord::new("stale", None)));
        let (mgr, device) = manager(
            store,
            Ok(TokenRecord::new("never", None)),
            Some(TokenRecord::new("interactive", Some("r".into()))),
        );
        let token = mgr.get_valid_token(&CancellationToken::new()).await.unwrap();
        assert_eq!(token, "interactive");
        assert_eq!(device.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn save_failure_does_not_fail_the_run() {
        let store = Arc::new(MemoryStore {
            fail_saves: true,
            ..MemoryStore::default()
        });
        let (mgr, _) = manager(
            store.clone(),
            Err("unused".into()),
            Some(TokenRecord::new("interactive", None)),
        );
        let token = mgr.get_valid_token(&CancellationToken::new()).await.unwrap();
        assert_eq!(token, "interactive");
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.state(), LifecycleState::Authorized);
    }

    #[tokio::test]
    async fn fresh_cached_token_is_reused_when_enabled() {
        let mut record = TokenRecord::new("cached", Some("r".into()));
        record.obtained_at = Some(chrono::Utc::now());
        record
            .raw_fields
            .insert("expires_in".into(), serde_json::json!(3600));
        let store = store_with(Some(record));
        let (mgr, device) = manager(store.clone(), Err("should not refresh".into()), None);
        let mgr = mgr.with_cached_token_reuse(true);

        let acquired = mgr.acquire(&CancellationToken::new()).await.unwrap();
        assert_eq!(acquired.access_token, "cached");
        assert_eq!(acquired.source, TokenSource::Cached);
        assert_eq!(device.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cached_token_is_refreshed_when_reuse_disabled() {
        let mut record = TokenRecord::new("cached", Some("r".into()));
        record.obtained_at = Some(chrono::Utc::now());
        record
            .raw_fields
            .insert("expires_in".into(), serde_json::json!(3600));
        let (mgr, _) = manager(store_with(Some(record)), Ok(TokenRecord::new("refreshed", None)), None);

        let acquired = mgr.acquire(&CancellationToken::new()).await.unwrap();
        assert_eq!(acquired.access_token, "refreshed");
    }
}

//! Keyed secret storage on top of attribute search.
//!
//! Defines the [`KeyedStore`] trait and [`SecretStorage`], which emulates a
//! key-value store inside the default Secret Service collection. Every
//! operation re-derives the item's attributes and locates it by search; the
//! service has no native notion of a key.
//!
//! Concurrent `create(key, _, false)` calls on one handle may both pass the
//! existence check and both write. Callers that need "one item per key" under
//! concurrency must serialize their writes.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use keyfolder_core::Config;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zvariant::{ObjectPath, OwnedObjectPath};

use crate::attributes::{attributes_for, label_for, KEY_ATTRIBUTE};
use crate::bus::{SecretBus, DEFAULT_COLLECTION, NO_PROMPT};
use crate::codec::SecretPayload;
use crate::dbus::DbusSecretBus;
use crate::error::{Result, SecretError};
use crate::session::{self, Session};
use crate::types::{CollectionProperties, ItemInfo, SecretValue};
use crate::unlock::{UnlockCoordinator, UnlockOptions, UnlockOutcome};

/// Async trait for keyed secret storage.
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Store `value` under `key`. With `replace == false` an existing key is
    /// a [`SecretError::Conflict`] and nothing is written.
    async fn create(&self, key: &str, value: &[u8], replace: bool) -> Result<()>;

    /// Retrieve the value stored under `key`, or `None` if there is none.
    async fn get(&self, key: &str) -> Result<Option<SecretValue>>;

    /// Delete the item stored under `key`. Returns false if there was none.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List every key in the folder, in service order.
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// Lifecycle phase of a [`SecretStorage`] handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Ready,
    Closed,
}

/// Configuration fixed by a successful connect.
#[derive(Debug)]
pub struct Ready {
    session: Session,
    app_folder: String,
    unlock: UnlockOutcome,
}

impl Ready {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn app_folder(&self) -> &str {
        &self.app_folder
    }

    /// How the collection was unlocked during connect.
    pub fn unlock(&self) -> UnlockOutcome {
        self.unlock
    }
}

enum ConnectionState {
    Disconnected,
    Connecting,
    Ready(Arc<Ready>),
    Closed,
}

/// Resets a connect attempt to `Disconnected` unless it completed.
struct ConnectingGuard<'a> {
    state: &'a RwLock<ConnectionState>,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.write();
        if matches!(*state, ConnectionState::Connecting) {
            *state = ConnectionState::Disconnected;
        }
    }
}

/// Keyed secret storage in the default collection, scoped to one folder.
pub struct SecretStorage<B: SecretBus> {
    bus: Arc<B>,
    state: RwLock<ConnectionState>,
    unlock_options: UnlockOptions,
    cancel: CancellationToken,
}

impl SecretStorage<DbusSecretBus> {
    /// Connect according to `config`: pick the bus, open a session, unlock
    /// the default collection, and bind to `config.app_folder`.
    pub async fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let bus = match &config.bus.address {
            Some(address) => DbusSecretBus::from_address(address).await?,
            None => DbusSecretBus::session().await?,
        };
        let storage =
            Self::new(Arc::new(bus)).with_unlock_options(UnlockOptions::from(&config.unlock));
        storage.connect(&config.app_folder).await?;
        Ok(storage)
    }
}

impl<B: SecretBus> SecretStorage<B> {
    /// Create a disconnected handle over `bus`.
    pub fn new(bus: Arc<B>) -> Self {
        Self {
            bus,
            state: RwLock::new(ConnectionState::Disconnected),
            unlock_options: UnlockOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_unlock_options(mut self, options: UnlockOptions) -> Self {
        self.unlock_options = options;
        self
    }

    /// Use `token` to cancel every operation on this handle. Cancelling it
    /// is terminal: the in-flight operation fails with
    /// [`SecretError::Cancelled`] and the handle is closed.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn bus(&self) -> &Arc<B> {
        &self.bus
    }

    pub fn phase(&self) -> ConnectionPhase {
        match &*self.state.read() {
            ConnectionState::Disconnected => ConnectionPhase::Disconnected,
            ConnectionState::Connecting => ConnectionPhase::Connecting,
            ConnectionState::Ready(_) => ConnectionPhase::Ready,
            ConnectionState::Closed => ConnectionPhase::Closed,
        }
    }

    /// The folder bound at connect time.
    pub fn app_folder(&self) -> Option<String> {
        match &*self.state.read() {
            ConnectionState::Ready(ready) => Some(ready.app_folder.clone()),
            _ => None,
        }
    }

    /// How the collection was unlocked at connect time. A dismissed prompt
    /// shows up here as `Prompted { dismissed: true }`.
    pub fn unlock_outcome(&self) -> Option<UnlockOutcome> {
        match &*self.state.read() {
            ConnectionState::Ready(ready) => Some(ready.unlock),
            _ => None,
        }
    }

    /// Open a session and unlock the default collection, binding this handle
    /// to `app_folder`. Allowed once; a failed attempt leaves the handle
    /// disconnected so it can be retried.
    ///
    /// If the service shows an unlock prompt and no timeout is configured,
    /// this waits until the prompt completes or the handle is cancelled.
    pub async fn connect(&self, app_folder: &str) -> Result<()> {
        self.connect_inner(app_folder, None).await
    }

    /// Like [`connect`](Self::connect), but also abandoned when `token` is
    /// cancelled. Only this attempt fails; the handle goes back to
    /// disconnected and can connect again.
    pub async fn connect_with_cancellation(
        &self,
        app_folder: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        self.connect_inner(app_folder, Some(token)).await
    }

    async fn connect_inner(&self, app_folder: &str, token: Option<&CancellationToken>) -> Result<()> {
        validate_folder(app_folder)?;

        {
            let mut state = self.state.write();
            match *state {
                ConnectionState::Disconnected => *state = ConnectionState::Connecting,
                ConnectionState::Connecting | ConnectionState::Ready(_) => {
                    return Err(SecretError::AlreadyConnected)
                }
                ConnectionState::Closed => return Err(SecretError::Closed),
            }
        }
        let _guard = ConnectingGuard { state: &self.state };

        let ready = self.cancellable(token, self.establish(app_folder)).await?;

        let mut state = self.state.write();
        if matches!(*state, ConnectionState::Closed) {
            return Err(SecretError::Closed);
        }
        debug!(
            folder = app_folder,
            session = %ready.session.path().as_str(),
            unlock = ?ready.unlock,
            "storage ready"
        );
        *state = ConnectionState::Ready(Arc::new(ready));
        Ok(())
    }

    /// Close the handle. Later operations fail with [`SecretError::Closed`].
    pub fn close(&self) {
        *self.state.write() = ConnectionState::Closed;
    }

    /// True if an item exists under `key`.
    pub async fn contains(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let ready = self.ready()?;
        let items = self.cancellable(None, self.find(&ready, key)).await?;
        Ok(!items.is_empty())
    }

    /// Overwrite the secret of the existing item under `key` in place.
    /// Returns false if there is no such item.
    pub async fn update(&self, key: &str, value: &[u8]) -> Result<bool> {
        validate_key(key)?;
        let ready = self.ready()?;
        self.cancellable(None, self.update_inner(&ready, key, value)).await
    }

    /// Metadata of the item under `key`, without transferring its secret.
    pub async fn item_info(&self, key: &str) -> Result<Option<ItemInfo>> {
        validate_key(key)?;
        let ready = self.ready()?;
        self.cancellable(None, self.item_info_inner(&ready, key)).await
    }

    /// Label, lock state and item count of the default collection.
    pub async fn collection_info(&self) -> Result<CollectionProperties> {
        self.ready()?;
        self.cancellable(None, self.bus.collection_properties()).await
    }

    fn ready(&self) -> Result<Arc<Ready>> {
        match &*self.state.read() {
            ConnectionState::Ready(ready) => Ok(Arc::clone(ready)),
            ConnectionState::Closed => Err(SecretError::Closed),
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                Err(SecretError::NotConnected)
            }
        }
    }

    /// Race `operation` against the handle's token and the caller's `call`
    /// token, if any. The handle token closes the handle.
    async fn cancellable<T>(
        &self,
        call: Option<&CancellationToken>,
        operation: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let call_cancelled = async {
            match call {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.close();
                Err(SecretError::Cancelled)
            }
            _ = call_cancelled => Err(SecretError::Cancelled),
            result = operation => result,
        }
    }

    async fn establish(&self, app_folder: &str) -> Result<Ready> {
        let session = session::open_session(self.bus.as_ref()).await?;
        let collection: OwnedObjectPath =
            ObjectPath::from_static_str_unchecked(DEFAULT_COLLECTION).into();
        let unlock = UnlockCoordinator::new(self.bus.as_ref(), &self.unlock_options)
            .unlock(&collection)
            .await?;

        Ok(Ready {
            session,
            app_folder: app_folder.to_string(),
            unlock,
        })
    }

    async fn find(&self, ready: &Ready, key: &str) -> Result<Vec<OwnedObjectPath>> {
        let attributes = attributes_for(&ready.app_folder, Some(key));
        self.bus.search_items(&attributes).await
    }

    /// First match for `key`, warning when the attributes are not unique.
    async fn find_first(&self, ready: &Ready, key: &str) -> Result<Option<OwnedObjectPath>> {
        let mut items = self.find(ready, key).await?;
        if items.len() > 1 {
            warn!(
                key,
                folder = %ready.app_folder,
                matches = items.len(),
                "multiple items share the same attributes; using the first"
            );
        }
        Ok(if items.is_empty() {
            None
        } else {
            Some(items.swap_remove(0))
        })
    }

    async fn create_inner(&self, ready: &Ready, key: &str, value: &[u8], replace: bool) -> Result<()> {
        let attributes = attributes_for(&ready.app_folder, Some(key));

        if !replace {
            let existing = self.bus.search_items(&attributes).await?;
            if !existing.is_empty() {
                return Err(SecretError::Conflict {
                    folder: ready.app_folder.clone(),
                    key: key.to_string(),
                });
            }
        }

        let mut wire = SecretPayload::new(ready.session.path().clone(), value).encode();
        let label = label_for(&ready.app_folder, key);

        // The service's replace flag matches on attributes only, which is
        // exactly the key identity.
        let created = self.bus.create_item(&label, &attributes, &wire, true).await;
        wire.zeroize_value();
        let (item, prompt) = created?;

        debug!(key, folder = %ready.app_folder, item = %item.as_str(), prompt = %prompt.as_str(), "stored secret");
        Ok(())
    }

    async fn get_inner(&self, ready: &Ready, key: &str) -> Result<Option<SecretValue>> {
        let items = self.find(ready, key).await?;
        let Some(item) = items.first() else {
            debug!(key, folder = %ready.app_folder, "no item for key");
            return Ok(None);
        };

        let wire = self.bus.get_secret(item, ready.session.path()).await?;
        let payload = SecretPayload::decode(wire);
        Ok(Some(SecretValue::new(payload.into_value())))
    }

    async fn delete_inner(&self, ready: &Ready, key: &str) -> Result<bool> {
        let Some(item) = self.find_first(ready, key).await? else {
            return Ok(false);
        };

        let prompt = self.bus.delete_item(&item).await?;
        if prompt.as_str() != NO_PROMPT {
            warn!(key, prompt = %prompt.as_str(), "service requested a prompt to delete the item");
        }
        debug!(key, folder = %ready.app_folder, item = %item.as_str(), "deleted secret");
        Ok(true)
    }

    async fn list_keys_inner(&self, ready: &Ready) -> Result<Vec<String>> {
        let items = self
            .bus
            .search_items(&attributes_for(&ready.app_folder, None))
            .await?;

        let mut keys = Vec::with_capacity(items.len());
        for item in &items {
            let properties = self.bus.item_properties(item).await?;
            match properties.attributes.get(KEY_ATTRIBUTE) {
                Some(key) => keys.push(key.clone()),
                None => {
                    warn!(item = %item.as_str(), folder = %ready.app_folder, "skipping item without a key attribute");
                }
            }
        }
        Ok(keys)
    }

    async fn update_inner(&self, ready: &Ready, key: &str, value: &[u8]) -> Result<bool> {
        let Some(item) = self.find_first(ready, key).await? else {
            return Ok(false);
        };

        let mut wire = SecretPayload::new(ready.session.path().clone(), value).encode();
        let result = self.bus.set_secret(&item, &wire).await;
        wire.zeroize_value();
        result?;

        debug!(key, folder = %ready.app_folder, item = %item.as_str(), "updated secret");
        Ok(true)
    }

    async fn item_info_inner(&self, ready: &Ready, key: &str) -> Result<Option<ItemInfo>> {
        let Some(item) = self.find_first(ready, key).await? else {
            return Ok(None);
        };

        let properties = self.bus.item_properties(&item).await?;
        Ok(Some(ItemInfo {
            path: item.as_str().to_string(),
            key: key.to_string(),
            label: properties.label,
            locked: properties.locked,
            created: properties.created,
            modified: properties.modified,
        }))
    }
}

#[async_trait]
impl<B: SecretBus> KeyedStore for SecretStorage<B> {
    async fn create(&self, key: &str, value: &[u8], replace: bool) -> Result<()> {
        validate_key(key)?;
        let ready = self.ready()?;
        self.cancellable(None, self.create_inner(&ready, key, value, replace))
            .await
    }

    async fn get(&self, key: &str) -> Result<Option<SecretValue>> {
        validate_key(key)?;
        let ready = self.ready()?;
        self.cancellable(None, self.get_inner(&ready, key)).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let ready = self.ready()?;
        self.cancellable(None, self.delete_inner(&ready, key)).await
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let ready = self.ready()?;
        self.cancellable(None, self.list_keys_inner(&ready)).await
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(SecretError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}

fn validate_folder(folder: &str) -> Result<()> {
    if folder.trim().is_empty() {
        return Err(SecretError::InvalidFolder(
            "folder must not be empty".to_string(),
        ));
    }
    Ok(())
}

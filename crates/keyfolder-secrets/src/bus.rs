//! The object-bus capability consumed by the store.
//!
//! [`SecretBus`] exposes exactly the Secret Service calls this crate needs.
//! [`crate::dbus::DbusSecretBus`] speaks them over D-Bus;
//! [`crate::memory::MemorySecretBus`] answers them in-process.

use async_trait::async_trait;
use tokio::task::JoinHandle;
use zvariant::OwnedObjectPath;

use crate::attributes::Attributes;
use crate::codec::WireSecret;
use crate::error::Result;
use crate::types::{CollectionProperties, ItemProperties, PromptCompletion};

/// Well-known bus name of the Secret Service.
pub const SERVICE_NAME: &str = "org.freedesktop.secrets";

/// Object path of the service root.
pub const SERVICE_PATH: &str = "/org/freedesktop/secrets";

/// Object path of the default collection alias.
pub const DEFAULT_COLLECTION: &str = "/org/freedesktop/secrets/aliases/default";

/// Prompt path returned when no prompt is needed.
pub const NO_PROMPT: &str = "/";

/// Session negotiation algorithm (no transport encryption).
pub const ALGORITHM_PLAIN: &str = "plain";

pub const SERVICE_INTERFACE: &str = "org.freedesktop.Secret.Service";
pub const COLLECTION_INTERFACE: &str = "org.freedesktop.Secret.Collection";
pub const ITEM_INTERFACE: &str = "org.freedesktop.Secret.Item";
pub const PROMPT_INTERFACE: &str = "org.freedesktop.Secret.Prompt";

/// `CreateItem` property carrying the display label.
pub const ITEM_LABEL_PROPERTY: &str = "org.freedesktop.Secret.Item.Label";

/// `CreateItem` property carrying the attribute map.
pub const ITEM_ATTRIBUTES_PROPERTY: &str = "org.freedesktop.Secret.Item.Attributes";

/// Callback invoked once when a prompt completes.
pub type CompletionCallback = Box<dyn FnOnce(PromptCompletion) + Send + 'static>;

/// Handle to a prompt `Completed` watch. Dropping it stops the watch.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Tie the watch to a background task, aborted on drop.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// A subscription with nothing to dispose of.
    pub fn detached() -> Self {
        Self { task: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Async capability over the Secret Service.
///
/// Collection calls always target [`DEFAULT_COLLECTION`].
#[async_trait]
pub trait SecretBus: Send + Sync {
    /// `Service.OpenSession`. Returns the session path.
    async fn open_session(&self, algorithm: &str, input: &str) -> Result<OwnedObjectPath>;

    /// `Service.Unlock`. Returns the objects unlocked immediately and a
    /// prompt path, which is [`NO_PROMPT`] when nothing is left to unlock.
    async fn unlock(
        &self,
        objects: &[OwnedObjectPath],
    ) -> Result<(Vec<OwnedObjectPath>, OwnedObjectPath)>;

    /// `Collection.SearchItems`: items whose attributes contain all of `attributes`.
    async fn search_items(&self, attributes: &Attributes) -> Result<Vec<OwnedObjectPath>>;

    /// `Collection.CreateItem`. Returns the item path and a prompt path.
    async fn create_item(
        &self,
        label: &str,
        attributes: &Attributes,
        secret: &WireSecret,
        replace: bool,
    ) -> Result<(OwnedObjectPath, OwnedObjectPath)>;

    /// `Item.GetSecret`.
    async fn get_secret(
        &self,
        item: &OwnedObjectPath,
        session: &OwnedObjectPath,
    ) -> Result<WireSecret>;

    /// `Item.SetSecret`.
    async fn set_secret(&self, item: &OwnedObjectPath, secret: &WireSecret) -> Result<()>;

    /// `Item.Delete`. Returns a prompt path.
    async fn delete_item(&self, item: &OwnedObjectPath) -> Result<OwnedObjectPath>;

    /// The property set of an item.
    async fn item_properties(&self, item: &OwnedObjectPath) -> Result<ItemProperties>;

    /// The property set of the default collection.
    async fn collection_properties(&self) -> Result<CollectionProperties>;

    /// Watch a prompt's `Completed` signal, invoking `on_completed` once.
    ///
    /// The watch is active when this returns, so a `Prompt` call issued
    /// afterwards cannot race past it.
    async fn subscribe_prompt_completed(
        &self,
        prompt: &OwnedObjectPath,
        on_completed: CompletionCallback,
    ) -> Result<Subscription>;

    /// `Prompt.Prompt`.
    async fn show_prompt(&self, prompt: &OwnedObjectPath, window_id: &str) -> Result<()>;
}

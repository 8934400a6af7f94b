//! In-process [`SecretBus`] used by tests and offline tooling.
//!
//! Behaves like a single-collection Secret Service: exact attribute search,
//! attribute-based replace on `CreateItem`, an optional locked state that
//! must be cleared through a prompt, and secret transfer gated on a known
//! session. Items are kept in creation order.

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use zeroize::Zeroizing;
use zvariant::{ObjectPath, OwnedObjectPath};

use crate::attributes::Attributes;
use crate::bus::{CompletionCallback, SecretBus, Subscription, NO_PROMPT};
use crate::codec::WireSecret;
use crate::error::{Result, SecretError};
use crate::types::{CollectionProperties, ItemProperties, PromptCompletion};

const ITEM_PREFIX: &str = "/org/freedesktop/secrets/collection/login";
const SESSION_PREFIX: &str = "/org/freedesktop/secrets/session";
const PROMPT_PREFIX: &str = "/org/freedesktop/secrets/prompt";

/// What the service does when a prompt is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptBehaviour {
    /// Unlock and emit `Completed(dismissed = false)`.
    #[default]
    Complete,
    /// Stay locked and emit `Completed(dismissed = true)`.
    Dismiss,
    /// Emit nothing until [`MemorySecretBus::complete_pending_prompts`] is called.
    Hold,
}

/// Number of calls received per method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub open_session: usize,
    pub unlock: usize,
    pub search_items: usize,
    pub create_item: usize,
    pub get_secret: usize,
    pub set_secret: usize,
    pub delete_item: usize,
    pub item_properties: usize,
    pub show_prompt: usize,
}

struct StoredItem {
    path: OwnedObjectPath,
    label: String,
    attributes: Attributes,
    value: Zeroizing<Vec<u8>>,
    content_type: String,
    created: u64,
    modified: u64,
}

impl StoredItem {
    fn matches(&self, attributes: &Attributes) -> bool {
        attributes
            .iter()
            .all(|(name, value)| self.attributes.get(name) == Some(value))
    }
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    sessions: HashSet<String>,
    items: Vec<StoredItem>,
    locked: bool,
    prompt_behaviour: PromptBehaviour,
    pending_prompts: HashSet<String>,
    watchers: HashMap<String, CompletionCallback>,
    unreachable: bool,
    calls: CallCounts,
    last_window_id: Option<String>,
}

impl MemoryState {
    fn next_path(&mut self, prefix: &str) -> OwnedObjectPath {
        self.next_id += 1;
        object_path(format!("{prefix}/{}", self.next_id))
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.unreachable {
            return Err(zbus::Error::Failure("secret service is unreachable".to_string()).into());
        }
        Ok(())
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(zbus::Error::Failure("collection is locked".to_string()).into());
        }
        Ok(())
    }

    fn ensure_session(&self, session: &OwnedObjectPath) -> Result<()> {
        if !self.sessions.contains(session.as_str()) {
            return Err(unknown_object(session));
        }
        Ok(())
    }

    fn item(&self, path: &OwnedObjectPath) -> Result<&StoredItem> {
        self.items
            .iter()
            .find(|item| item.path == *path)
            .ok_or_else(|| unknown_object(path))
    }

    fn item_mut(&mut self, path: &OwnedObjectPath) -> Result<&mut StoredItem> {
        self.items
            .iter_mut()
            .find(|item| item.path == *path)
            .ok_or_else(|| unknown_object(path))
    }
}

/// An in-memory Secret Service with a single default collection.
#[derive(Default)]
pub struct MemorySecretBus {
    state: Mutex<MemoryState>,
}

impl MemorySecretBus {
    /// An unlocked, empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// A locked service whose unlock goes through a prompt.
    pub fn locked(behaviour: PromptBehaviour) -> Self {
        let bus = Self::default();
        {
            let mut state = bus.state.lock();
            state.locked = true;
            state.prompt_behaviour = behaviour;
        }
        bus
    }

    pub fn set_locked(&self, locked: bool) {
        self.state.lock().locked = locked;
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    /// Make every subsequent call fail with a transport error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    pub fn item_count(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Window id passed to the most recent `Prompt` call.
    pub fn last_window_id(&self) -> Option<String> {
        self.state.lock().last_window_id.clone()
    }

    /// Insert an item directly, bypassing replace semantics. Lets tests
    /// create duplicate or foreign items.
    pub fn insert_item(&self, label: &str, attributes: Attributes, value: &[u8]) -> OwnedObjectPath {
        let mut state = self.state.lock();
        let path = state.next_path(ITEM_PREFIX);
        let now = unix_now();
        state.items.push(StoredItem {
            path: path.clone(),
            label: label.to_string(),
            attributes,
            value: Zeroizing::new(value.to_vec()),
            content_type: crate::codec::CONTENT_TYPE.to_string(),
            created: now,
            modified: now,
        });
        path
    }

    /// Resolve every prompt held back by [`PromptBehaviour::Hold`].
    ///
    /// Returns the number of watchers notified.
    pub fn complete_pending_prompts(&self, dismissed: bool) -> usize {
        let callbacks: Vec<CompletionCallback> = {
            let mut state = self.state.lock();
            if !dismissed && !state.pending_prompts.is_empty() {
                state.locked = false;
            }
            let pending: Vec<String> = state.pending_prompts.drain().collect();
            pending
                .iter()
                .filter_map(|prompt| state.watchers.remove(prompt))
                .collect()
        };

        let notified = callbacks.len();
        for callback in callbacks {
            callback(PromptCompletion { dismissed });
        }
        notified
    }
}

#[async_trait]
impl SecretBus for MemorySecretBus {
    async fn open_session(&self, _algorithm: &str, _input: &str) -> Result<OwnedObjectPath> {
        let mut state = self.state.lock();
        state.ensure_reachable()?;
        state.calls.open_session += 1;

        let session = state.next_path(SESSION_PREFIX);
        state.sessions.insert(session.as_str().to_string());
        Ok(session)
    }

    async fn unlock(
        &self,
        objects: &[OwnedObjectPath],
    ) -> Result<(Vec<OwnedObjectPath>, OwnedObjectPath)> {
        let mut state = self.state.lock();
        state.ensure_reachable()?;
        state.calls.unlock += 1;

        if !state.locked {
            return Ok((objects.to_vec(), object_path(NO_PROMPT.to_string())));
        }

        let prompt = state.next_path(PROMPT_PREFIX);
        state.pending_prompts.insert(prompt.as_str().to_string());
        Ok((Vec::new(), prompt))
    }

    async fn search_items(&self, attributes: &Attributes) -> Result<Vec<OwnedObjectPath>> {
        let mut state = self.state.lock();
        state.ensure_reachable()?;
        state.calls.search_items += 1;

        Ok(state
            .items
            .iter()
            .filter(|item| item.matches(attributes))
            .map(|item| item.path.clone())
            .collect())
    }

    async fn create_item(
        &self,
        label: &str,
        attributes: &Attributes,
        secret: &WireSecret,
        replace: bool,
    ) -> Result<(OwnedObjectPath, OwnedObjectPath)> {
        let mut state = self.state.lock();
        state.ensure_reachable()?;
        state.calls.create_item += 1;
        state.ensure_unlocked()?;
        state.ensure_session(&secret.session)?;

        let now = unix_now();
        let no_prompt = object_path(NO_PROMPT.to_string());

        if replace {
            if let Some(existing) = state
                .items
                .iter_mut()
                .find(|item| item.attributes == *attributes)
            {
                existing.label = label.to_string();
                existing.value = Zeroizing::new(secret.value.clone());
                existing.content_type = secret.content_type.clone();
                existing.modified = now;
                return Ok((existing.path.clone(), no_prompt));
            }
        }

        let path = state.next_path(ITEM_PREFIX);
        state.items.push(StoredItem {
            path: path.clone(),
            label: label.to_string(),
            attributes: attributes.clone(),
            value: Zeroizing::new(secret.value.clone()),
            content_type: secret.content_type.clone(),
            created: now,
            modified: now,
        });
        Ok((path, no_prompt))
    }

    async fn get_secret(
        &self,
        item: &OwnedObjectPath,
        session: &OwnedObjectPath,
    ) -> Result<WireSecret> {
        let mut state = self.state.lock();
        state.ensure_reachable()?;
        state.calls.get_secret += 1;
        state.ensure_unlocked()?;
        state.ensure_session(session)?;

        let stored = state.item(item)?;
        Ok(WireSecret {
            session: session.clone(),
            parameters: Vec::new(),
            value: stored.value.to_vec(),
            content_type: stored.content_type.clone(),
        })
    }

    async fn set_secret(&self, item: &OwnedObjectPath, secret: &WireSecret) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_reachable()?;
        state.calls.set_secret += 1;
        state.ensure_unlocked()?;
        state.ensure_session(&secret.session)?;

        let stored = state.item_mut(item)?;
        stored.value = Zeroizing::new(secret.value.clone());
        stored.content_type = secret.content_type.clone();
        stored.modified = unix_now();
        Ok(())
    }

    async fn delete_item(&self, item: &OwnedObjectPath) -> Result<OwnedObjectPath> {
        let mut state = self.state.lock();
        state.ensure_reachable()?;
        state.calls.delete_item += 1;
        state.ensure_unlocked()?;

        let index = state
            .items
            .iter()
            .position(|stored| stored.path == *item)
            .ok_or_else(|| unknown_object(item))?;
        state.items.remove(index);
        Ok(object_path(NO_PROMPT.to_string()))
    }

    async fn item_properties(&self, item: &OwnedObjectPath) -> Result<ItemProperties> {
        let mut state = self.state.lock();
        state.ensure_reachable()?;
        state.calls.item_properties += 1;

        let locked = state.locked;
        let stored = state.item(item)?;
        Ok(ItemProperties {
            locked,
            attributes: stored.attributes.clone(),
            label: stored.label.clone(),
            item_type: String::new(),
            created: stored.created,
            modified: stored.modified,
        })
    }

    async fn collection_properties(&self) -> Result<CollectionProperties> {
        let state = self.state.lock();
        state.ensure_reachable()?;

        Ok(CollectionProperties {
            items: state.items.iter().map(|item| item.path.clone()).collect(),
            label: "Login".to_string(),
            locked: state.locked,
            created: state.items.iter().map(|item| item.created).min().unwrap_or_default(),
            modified: state.items.iter().map(|item| item.modified).max().unwrap_or_default(),
        })
    }

    async fn subscribe_prompt_completed(
        &self,
        prompt: &OwnedObjectPath,
        on_completed: CompletionCallback,
    ) -> Result<Subscription> {
        let mut state = self.state.lock();
        state.ensure_reachable()?;
        state
            .watchers
            .insert(prompt.as_str().to_string(), on_completed);
        Ok(Subscription::detached())
    }

    async fn show_prompt(&self, prompt: &OwnedObjectPath, window_id: &str) -> Result<()> {
        let fired = {
            let mut state = self.state.lock();
            state.ensure_reachable()?;
            state.calls.show_prompt += 1;
            state.last_window_id = Some(window_id.to_string());

            if !state.pending_prompts.contains(prompt.as_str()) {
                return Err(unknown_object(prompt));
            }

            let dismissed = match state.prompt_behaviour {
                PromptBehaviour::Hold => return Ok(()),
                PromptBehaviour::Complete => false,
                PromptBehaviour::Dismiss => true,
            };
            state.pending_prompts.remove(prompt.as_str());
            if !dismissed {
                state.locked = false;
            }
            state
                .watchers
                .remove(prompt.as_str())
                .map(|callback| (callback, dismissed))
        };

        if let Some((callback, dismissed)) = fired {
            callback(PromptCompletion { dismissed });
        }
        Ok(())
    }
}

fn object_path(path: String) -> OwnedObjectPath {
    ObjectPath::from_string_unchecked(path).into()
}

fn unknown_object(path: &OwnedObjectPath) -> SecretError {
    zbus::fdo::Error::UnknownObject(format!("no such object: {}", path.as_str())).into()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::attributes_for;
    use crate::codec::SecretPayload;

    async fn session(bus: &MemorySecretBus) -> OwnedObjectPath {
        bus.open_session("plain", "test").await.unwrap()
    }

    #[tokio::test]
    async fn test_replace_matches_on_attributes() {
        let bus = MemorySecretBus::new();
        let session = session(&bus).await;
        let attrs = attributes_for("App", Some("k"));

        let first = SecretPayload::new(session.clone(), b"one".to_vec()).encode();
        let second = SecretPayload::new(session.clone(), b"two".to_vec()).encode();
        let (a, _) = bus.create_item("label-a", &attrs, &first, true).await.unwrap();
        let (b, _) = bus.create_item("label-b", &attrs, &second, true).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(bus.item_count(), 1);
        let secret = bus.get_secret(&a, &session).await.unwrap();
        assert_eq!(secret.value, b"two");
    }

    #[tokio::test]
    async fn test_create_without_replace_duplicates() {
        let bus = MemorySecretBus::new();
        let session = session(&bus).await;
        let attrs = attributes_for("App", Some("k"));
        let wire = SecretPayload::new(session, b"v".to_vec()).encode();

        bus.create_item("l", &attrs, &wire, false).await.unwrap();
        bus.create_item("l", &attrs, &wire, false).await.unwrap();

        assert_eq!(bus.search_items(&attrs).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_is_subset_match() {
        let bus = MemorySecretBus::new();
        bus.insert_item("a", attributes_for("App", Some("a")), b"1");
        bus.insert_item("b", attributes_for("App", Some("b")), b"2");
        bus.insert_item("c", attributes_for("Other", Some("a")), b"3");

        let folder = bus.search_items(&attributes_for("App", None)).await.unwrap();
        assert_eq!(folder.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_session_rejected() {
        let bus = MemorySecretBus::new();
        let item = bus.insert_item("a", attributes_for("App", Some("a")), b"1");
        let bogus = object_path("/org/freedesktop/secrets/session/999".to_string());

        let result = bus.get_secret(&item, &bogus).await;
        assert!(matches!(result, Err(SecretError::Transport(_))));
    }

    #[tokio::test]
    async fn test_locked_unlock_returns_prompt() {
        let bus = MemorySecretBus::locked(PromptBehaviour::Hold);
        let collection = object_path(crate::bus::DEFAULT_COLLECTION.to_string());

        let (unlocked, prompt) = bus.unlock(&[collection]).await.unwrap();
        assert!(unlocked.is_empty());
        assert_ne!(prompt.as_str(), NO_PROMPT);
        assert!(bus.is_locked());
    }

    #[tokio::test]
    async fn test_unreachable() {
        let bus = MemorySecretBus::new();
        bus.set_unreachable(true);
        assert!(matches!(
            bus.open_session("plain", "x").await,
            Err(SecretError::Transport(_))
        ));
    }
}

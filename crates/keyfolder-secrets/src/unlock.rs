//! Unlocking the target collection.
//!
//! `Service.Unlock` either unlocks synchronously (prompt path `/`) or hands
//! back a prompt object. In the second case the coordinator watches the
//! prompt's `Completed` signal, shows the prompt, and waits for the signal.
//!
//! ```text
//! Requesting ──(no prompt)──────────────────────────▶ Unlocked
//!     └──(prompt)──▶ AwaitingPrompt ──(Completed)──▶ Unlocked
//! ```
//!
//! Without a configured timeout the wait is unbounded; cancel the
//! surrounding future to abandon it.

use std::time::Duration;

use keyfolder_core::config::UnlockConfig;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use zvariant::OwnedObjectPath;

use crate::bus::{SecretBus, NO_PROMPT};
use crate::error::{Result, SecretError};
use crate::types::PromptCompletion;

/// Tunables for the interactive unlock path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockOptions {
    /// Upper bound on the prompt wait. `None` waits forever.
    pub prompt_timeout: Option<Duration>,
    /// Window identifier passed to `Prompt.Prompt`.
    pub window_id: String,
}

impl From<&UnlockConfig> for UnlockOptions {
    fn from(config: &UnlockConfig) -> Self {
        Self {
            prompt_timeout: config.prompt_timeout_secs.map(Duration::from_secs),
            window_id: config.window_id.clone(),
        }
    }
}

/// Where the coordinator is in the unlock handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockState {
    Requesting,
    AwaitingPrompt,
    Unlocked,
}

/// How the collection ended up unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// The service unlocked the collection without a prompt.
    Immediate,
    /// A prompt was shown and completed.
    Prompted { dismissed: bool },
}

/// Drives one collection through the unlock handshake.
pub struct UnlockCoordinator<'a, B: SecretBus + ?Sized> {
    bus: &'a B,
    options: &'a UnlockOptions,
    state: UnlockState,
}

impl<'a, B: SecretBus + ?Sized> UnlockCoordinator<'a, B> {
    pub fn new(bus: &'a B, options: &'a UnlockOptions) -> Self {
        Self {
            bus,
            options,
            state: UnlockState::Requesting,
        }
    }

    pub fn state(&self) -> UnlockState {
        self.state
    }

    /// Unlock `collection`, showing a prompt if the service asks for one.
    ///
    /// A dismissed prompt still counts as completion; later secret calls
    /// report the collection as locked if it stayed locked.
    pub async fn unlock(&mut self, collection: &OwnedObjectPath) -> Result<UnlockOutcome> {
        self.state = UnlockState::Requesting;
        let (unlocked, prompt) = self.bus.unlock(std::slice::from_ref(collection)).await?;

        if prompt.as_str() == NO_PROMPT {
            debug!(
                collection = %collection.as_str(),
                unlocked = unlocked.len(),
                "collection unlocked without prompt"
            );
            self.state = UnlockState::Unlocked;
            return Ok(UnlockOutcome::Immediate);
        }

        info!(prompt = %prompt.as_str(), "collection is locked; showing unlock prompt");
        self.state = UnlockState::AwaitingPrompt;
        let completion = self.await_prompt(&prompt).await?;

        if completion.dismissed {
            warn!(prompt = %prompt.as_str(), "unlock prompt was dismissed");
        } else {
            info!(prompt = %prompt.as_str(), "unlock prompt completed");
        }
        self.state = UnlockState::Unlocked;
        Ok(UnlockOutcome::Prompted {
            dismissed: completion.dismissed,
        })
    }

    async fn await_prompt(&self, prompt: &OwnedObjectPath) -> Result<PromptCompletion> {
        let (tx, rx) = oneshot::channel();
        // Keep the watch alive until the completion arrives.
        let _subscription = self
            .bus
            .subscribe_prompt_completed(
                prompt,
                Box::new(move |completion| {
                    let _ = tx.send(completion);
                }),
            )
            .await?;

        self.bus.show_prompt(prompt, &self.options.window_id).await?;

        let received = match self.options.prompt_timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| SecretError::PromptTimeout(limit))?,
            None => rx.await,
        };

        received.map_err(|_| {
            SecretError::Transport(zbus::Error::Failure(format!(
                "watch on prompt {} closed before completion",
                prompt.as_str()
            )))
        })
    }
}

/// Unlock `collection` with a fresh coordinator.
pub async fn unlock_collection<B: SecretBus + ?Sized>(
    bus: &B,
    collection: &OwnedObjectPath,
    options: &UnlockOptions,
) -> Result<UnlockOutcome> {
    UnlockCoordinator::new(bus, options).unlock(collection).await
}

//! Session negotiation against the service root.

use tracing::debug;
use zvariant::OwnedObjectPath;

use crate::bus::{SecretBus, ALGORITHM_PLAIN};
use crate::error::Result;

/// Identifying token sent as the `OpenSession` input.
pub const SESSION_INPUT: &str = "keyfolder";

/// A negotiated session. Every secret transfer is bound to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    path: OwnedObjectPath,
}

impl Session {
    pub fn path(&self) -> &OwnedObjectPath {
        &self.path
    }
}

/// Open a `plain` session. Not retried; call once per connection.
pub async fn open_session<B: SecretBus + ?Sized>(bus: &B) -> Result<Session> {
    let path = bus.open_session(ALGORITHM_PLAIN, SESSION_INPUT).await?;
    debug!(session = %path.as_str(), "opened secret service session");
    Ok(Session { path })
}

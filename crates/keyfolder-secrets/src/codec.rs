//! Wire representation of a secret payload.
//!
//! The Secret Service transfers secrets as a `(oayays)` struct: session path,
//! algorithm parameters, value bytes, content type. Under the `plain`
//! algorithm the parameters are always empty.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};
use zvariant::{OwnedObjectPath, Type};

/// Content type attached to every secret written by this crate.
pub const CONTENT_TYPE: &str = "application/octet-stream";

/// The `(oayays)` struct exchanged with `CreateItem`, `GetSecret` and `SetSecret`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct WireSecret {
    pub session: OwnedObjectPath,
    pub parameters: Vec<u8>,
    pub value: Vec<u8>,
    pub content_type: String,
}

/// A secret payload bound to a session.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretPayload {
    #[zeroize(skip)]
    session: OwnedObjectPath,
    parameters: Vec<u8>,
    value: Vec<u8>,
    #[zeroize(skip)]
    content_type: String,
}

impl SecretPayload {
    /// Build a fresh payload for writing: empty parameters, fixed content type.
    pub fn new(session: OwnedObjectPath, value: impl Into<Vec<u8>>) -> Self {
        Self {
            session,
            parameters: Vec::new(),
            value: value.into(),
            content_type: CONTENT_TYPE.to_string(),
        }
    }

    pub fn session(&self) -> &OwnedObjectPath {
        &self.session
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Pack into the wire struct.
    pub fn encode(&self) -> WireSecret {
        WireSecret {
            session: self.session.clone(),
            parameters: self.parameters.clone(),
            value: self.value.clone(),
            content_type: self.content_type.clone(),
        }
    }

    /// Unpack a wire struct. The content type is carried over unchecked.
    pub fn decode(mut wire: WireSecret) -> Self {
        let payload = Self {
            session: wire.session.clone(),
            parameters: std::mem::take(&mut wire.parameters),
            value: std::mem::take(&mut wire.value),
            content_type: std::mem::take(&mut wire.content_type),
        };
        wire.zeroize_value();
        payload
    }

    /// Take the secret bytes out of the payload, leaving it empty.
    pub fn into_value(mut self) -> Vec<u8> {
        std::mem::take(&mut self.value)
    }
}

impl WireSecret {
    /// Wipe the secret bytes held by this wire struct.
    pub fn zeroize_value(&mut self) {
        self.value.zeroize();
    }
}

//! [`SecretBus`] over a live D-Bus connection.
//!
//! Service and collection proxies are built once; item and prompt proxies
//! are built per call. A prompt's `Completed` signal is received through a
//! match rule whose stream is drained by a background task.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::TryStreamExt;
use tracing::{debug, warn};
use zbus::{Connection, MatchRule, MessageStream, Proxy};
use zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::attributes::Attributes;
use crate::bus::{
    CompletionCallback, SecretBus, Subscription, COLLECTION_INTERFACE, DEFAULT_COLLECTION,
    ITEM_ATTRIBUTES_PROPERTY, ITEM_INTERFACE, ITEM_LABEL_PROPERTY, PROMPT_INTERFACE,
    SERVICE_INTERFACE, SERVICE_NAME, SERVICE_PATH,
};
use crate::codec::WireSecret;
use crate::error::Result;
use crate::types::{CollectionProperties, ItemProperties, PromptCompletion};

/// Secret Service client bound to one bus connection.
pub struct DbusSecretBus {
    connection: Connection,
    service: Proxy<'static>,
    collection: Proxy<'static>,
}

impl DbusSecretBus {
    /// Connect to the user's session bus.
    pub async fn session() -> Result<Self> {
        let connection = Connection::session().await?;
        Self::with_connection(connection).await
    }

    /// Connect to an explicit D-Bus address, e.g. `unix:path=/run/user/1000/bus`
    /// or `tcp:host=localhost,port=7834`.
    pub async fn from_address(address: &str) -> Result<Self> {
        debug!(address, "connecting to bus");
        let connection = zbus::connection::Builder::address(address)?
            .build()
            .await?;
        Self::with_connection(connection).await
    }

    /// Wrap an already established connection.
    pub async fn with_connection(connection: Connection) -> Result<Self> {
        let service = Proxy::new(&connection, SERVICE_NAME, SERVICE_PATH, SERVICE_INTERFACE).await?;
        let collection = Proxy::new(
            &connection,
            SERVICE_NAME,
            DEFAULT_COLLECTION,
            COLLECTION_INTERFACE,
        )
        .await?;

        Ok(Self {
            connection,
            service,
            collection,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    async fn item_proxy<'p>(&self, item: &'p OwnedObjectPath) -> Result<Proxy<'p>> {
        Ok(Proxy::new(&self.connection, SERVICE_NAME, item.as_str(), ITEM_INTERFACE).await?)
    }
}

#[async_trait]
impl SecretBus for DbusSecretBus {
    async fn open_session(&self, algorithm: &str, input: &str) -> Result<OwnedObjectPath> {
        let (_output, session): (OwnedValue, OwnedObjectPath) = self
            .service
            .call("OpenSession", &(algorithm, Value::from(input)))
            .await?;
        Ok(session)
    }

    async fn unlock(
        &self,
        objects: &[OwnedObjectPath],
    ) -> Result<(Vec<OwnedObjectPath>, OwnedObjectPath)> {
        Ok(self.service.call("Unlock", &(objects,)).await?)
    }

    async fn search_items(&self, attributes: &Attributes) -> Result<Vec<OwnedObjectPath>> {
        Ok(self.collection.call("SearchItems", &(attributes,)).await?)
    }

    async fn create_item(
        &self,
        label: &str,
        attributes: &Attributes,
        secret: &WireSecret,
        replace: bool,
    ) -> Result<(OwnedObjectPath, OwnedObjectPath)> {
        let mut properties: HashMap<&str, Value<'_>> = HashMap::with_capacity(2);
        properties.insert(ITEM_LABEL_PROPERTY, Value::from(label));
        properties.insert(ITEM_ATTRIBUTES_PROPERTY, Value::from(attributes.clone()));

        Ok(self
            .collection
            .call("CreateItem", &(properties, secret, replace))
            .await?)
    }

    async fn get_secret(
        &self,
        item: &OwnedObjectPath,
        session: &OwnedObjectPath,
    ) -> Result<WireSecret> {
        let proxy = self.item_proxy(item).await?;
        Ok(proxy.call("GetSecret", &(session,)).await?)
    }

    async fn set_secret(&self, item: &OwnedObjectPath, secret: &WireSecret) -> Result<()> {
        let proxy = self.item_proxy(item).await?;
        let _: () = proxy.call("SetSecret", &(secret,)).await?;
        Ok(())
    }

    async fn delete_item(&self, item: &OwnedObjectPath) -> Result<OwnedObjectPath> {
        let proxy = self.item_proxy(item).await?;
        Ok(proxy.call("Delete", &()).await?)
    }

    async fn item_properties(&self, item: &OwnedObjectPath) -> Result<ItemProperties> {
        let proxy = self.item_proxy(item).await?;

        // Older keyring daemons do not publish `Type`.
        let item_type = match proxy.get_property::<String>("Type").await {
            Ok(t) => t,
            Err(e) => {
                debug!(item = %item.as_str(), "item has no Type property: {e}");
                String::new()
            }
        };

        Ok(ItemProperties {
            locked: proxy.get_property("Locked").await?,
            attributes: proxy.get_property("Attributes").await?,
            label: proxy.get_property("Label").await?,
            item_type,
            created: proxy.get_property("Created").await?,
            modified: proxy.get_property("Modified").await?,
        })
    }

    async fn collection_properties(&self) -> Result<CollectionProperties> {
        Ok(CollectionProperties {
            items: self.collection.get_property("Items").await?,
            label: self.collection.get_property("Label").await?,
            locked: self.collection.get_property("Locked").await?,
            created: self.collection.get_property("Created").await?,
            modified: self.collection.get_property("Modified").await?,
        })
    }

    async fn subscribe_prompt_completed(
        &self,
        prompt: &OwnedObjectPath,
        on_completed: CompletionCallback,
    ) -> Result<Subscription> {
        let rule = MatchRule::builder()
            .msg_type(zbus::message::Type::Signal)
            .interface(PROMPT_INTERFACE)?
            .member("Completed")?
            .path(prompt.as_str())?
            .build();
        let mut stream = MessageStream::for_match_rule(rule, &self.connection, None).await?;

        let prompt_path = prompt.as_str().to_string();
        let task = tokio::spawn(async move {
            match stream.try_next().await {
                Ok(Some(msg)) => {
                    // Completed(dismissed: bool, result: variant)
                    let dismissed = match msg.body().deserialize::<(bool, OwnedValue)>() {
                        Ok((dismissed, _result)) => dismissed,
                        Err(e) => {
                            warn!(prompt = %prompt_path, "malformed Completed signal: {e}");
                            false
                        }
                    };
                    on_completed(PromptCompletion { dismissed });
                }
                Ok(None) => {
                    debug!(prompt = %prompt_path, "prompt signal stream ended");
                }
                Err(e) => {
                    warn!(prompt = %prompt_path, "prompt signal stream failed: {e}");
                }
            }
        });

        Ok(Subscription::from_task(task))
    }

    async fn show_prompt(&self, prompt: &OwnedObjectPath, window_id: &str) -> Result<()> {
        let proxy = Proxy::new(
            &self.connection,
            SERVICE_NAME,
            prompt.as_str(),
            PROMPT_INTERFACE,
        )
        .await?;
        let _: () = proxy.call("Prompt", &(window_id,)).await?;
        Ok(())
    }
}

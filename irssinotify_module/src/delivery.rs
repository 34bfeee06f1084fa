use encrypt_module::{EncryptError, EncryptOptions, Encryptor};
use send_notification_module::{NotificationPayload, NotifierClient, SendNotificationError};
use tracing::{info, warn};

use crate::buffer_store::ConversationKey;
use crate::settings::ModuleSettings;

/// Channel name IrssiNotifier clients show for private conversations.
pub const PRIVATE_CHANNEL_MARKER: &str = "!PRIVATE";

/// The text flushed for one conversation.
#[derive(Debug, Clone, Copy)]
pub struct Conversation<'a> {
    pub key: &'a ConversationKey,
    pub text: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("no buffered message for {0}")]
    EmptyBuffer(ConversationKey),
    #[error("encryption failed: {0}")]
    Encrypt(#[from] EncryptError),
    #[error("notification request failed: {0}")]
    Send(#[from] SendNotificationError),
}

pub trait Deliver {
    fn deliver(
        &self,
        settings: &ModuleSettings,
        conversation: &Conversation<'_>,
    ) -> Result<(), DeliveryError>;
}

/// Encrypts every field with the configured passphrase and hands the payload
/// to the IrssiNotifier relay.
#[derive(Debug, Clone)]
pub struct RelayDeliverer {
    client: NotifierClient,
    encrypt_options: EncryptOptions,
}

impl RelayDeliverer {
    pub fn new(client: NotifierClient, encrypt_options: EncryptOptions) -> Self {
        Self {
            client,
            encrypt_options,
        }
    }

    pub fn client(&self) -> &NotifierClient {
        &self.client
    }
}

impl Deliver for RelayDeliverer {
    fn deliver(
        &self,
        settings: &ModuleSettings,
        conversation: &Conversation<'_>,
    ) -> Result<(), DeliveryError> {
        let encryptor = Encryptor::new(settings.key(), self.encrypt_options.clone());
        let channel = conversation
            .key
            .destination()
            .unwrap_or(PRIVATE_CHANNEL_MARKER);

        let payload = NotificationPayload::new(
            settings.token(),
            encryptor.encrypt(conversation.key.sender())?,
            encryptor.encrypt(channel)?,
            encryptor.encrypt(conversation.text)?,
        );
        let response = self.client.send(&payload)?;
        if response.is_success() {
            info!(
                "delivered notification for {} (status {})",
                conversation.key, response.status
            );
        } else {
            // The relay's answer does not decide success; the buffer is still cleared.
            warn!(
                "relay answered {} for {}; treating the request as delivered",
                response.status, conversation.key
            );
        }
        Ok(())
    }
}

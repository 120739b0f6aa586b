use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::auth::ActorContext;

use crate::models::{
    DispatchOutcome, EmailMessage, NewNotification, Notification, NotificationError, Recipient,
};
use crate::services::email::EmailSender;
use crate::services::store::NotificationStore;

pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    email: Arc<dyn EmailSender>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>, email: Arc<dyn EmailSender>) -> Self {
        Self { store, email }
    }

    /// Writes the in-app row, then emails the recipient if an address is known.
    ///
    /// Never fails: each step that goes wrong is logged and reported as not
    /// done in the outcome.
    pub async fn dispatch(
        &self,
        recipient: &Recipient,
        notification: NewNotification,
        auth_token: &str,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        let email = recipient.email.as_ref().map(|to| EmailMessage {
            to: to.clone(),
            subject: notification.title.clone(),
            text: notification.message.clone(),
        });

        match self.store.insert(notification.for_user(&recipient.user_id), auth_token).await {
            Ok(stored) => {
                debug!("Stored notification {} for {}", stored.id, recipient.user_id);
                outcome.stored = true;
            }
            Err(e) => warn!("Failed to store notification for {}: {}", recipient.user_id, e),
        }

        if let Some(message) = email {
            match self.email.send(&message, auth_token).await {
                Ok(()) => outcome.emailed = true,
                Err(e) => warn!("Failed to email {}: {}", message.to, e),
            }
        }

        outcome
    }

    pub async fn list_own(
        &self,
        unread_only: bool,
        actor: &ActorContext,
    ) -> Result<Vec<Notification>, NotificationError> {
        self.store.list_for_user(&actor.user_id, unread_only, actor.token()).await
    }

    pub async fn mark_read(&self, id: Uuid, actor: &ActorContext) -> Result<Notification, NotificationError> {
        self.store
            .mark_read(id, &actor.user_id, actor.token())
            .await?
            .ok_or(NotificationError::NotFound)
    }
}

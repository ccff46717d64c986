//! Update handlers.

use granary_core::TelegramId;
use tracing::{debug, error, info, instrument, warn};

use super::Bot;
use super::command::{CallbackAction, Command, ProductInput};
use crate::db::UserRepository;
use crate::db::users::ProfileUpsert;
use crate::error::AppError;
use crate::models::{ProductDraft, User};
use crate::services::{AccessService, InventoryService, LinkOutcome, PhoneGate};
use crate::telegram::{
    CallbackQuery, Contact, Message, OutgoingMessage, Update, User as TelegramUser, messages,
};

impl Bot {
    /// Handle one update. Failures are logged and reported to the chat.
    #[instrument(skip(self, update), fields(update_id = update.update_id))]
    pub async fn handle_update(&self, update: Update) {
        if let Err(e) = self.dispatch(&update).await {
            if e.is_server_error() {
                error!(error = %e, "Bot handler failed");
            } else {
                warn!(error = %e, "Bot handler rejected update");
            }

            if let Some(chat_id) = chat_of(&update) {
                self.send(chat_id, &messages::error_reply(&e.public_message()))
                    .await;
            }
        }
    }

    async fn dispatch(&self, update: &Update) -> Result<(), AppError> {
        let Some(from) = update.sender() else {
            debug!("Update without sender ignored");
            return Ok(());
        };
        if from.is_bot {
            return Ok(());
        }

        let user = self.ensure_user(from).await?;

        if let Some(query) = &update.callback_query {
            return self.on_callback(&user, query).await;
        }
        if let Some(message) = &update.message {
            return self.on_message(&user, from, message).await;
        }
        Ok(())
    }

    /// Create the sender's user row or refresh its profile.
    async fn ensure_user(&self, from: &TelegramUser) -> Result<User, AppError> {
        let profile = ProfileUpsert {
            telegram_id: from.id,
            username: from.username.as_deref(),
            first_name: Some(from.first_name.as_str()),
            last_name: from.last_name.as_deref(),
        };
        Ok(UserRepository::new(self.state.pool())
            .upsert_profile(profile, None)
            .await?)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    async fn on_message(
        &self,
        user: &User,
        from: &TelegramUser,
        message: &Message,
    ) -> Result<(), AppError> {
        let chat_id = message.chat.id;

        if let Some(contact) = &message.contact {
            return self.on_contact(user, from, chat_id, contact).await;
        }

        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };

        if let Some(command) = Command::parse(text) {
            return self.on_command(user, chat_id, command).await;
        }

        if let Some(input) = self.products.parse(text) {
            if !user.role.is_staff() {
                debug!(user_id = %user.id, "Product entry from non-staff ignored");
                return Ok(());
            }
            return self
                .on_product_input(user, chat_id, message.message_id, input)
                .await;
        }

        Ok(())
    }

    async fn on_command(
        &self,
        user: &User,
        chat_id: TelegramId,
        command: Command,
    ) -> Result<(), AppError> {
        debug!(?command, user_id = %user.id, "Bot command");

        if !user.role.is_staff() {
            self.send(chat_id, &messages::contact_request()).await;
            return Ok(());
        }

        match command {
            Command::Start | Command::Menu => {
                self.send(chat_id, &messages::main_menu()).await;
            }
            Command::Inventory => self.show_inventory(chat_id).await?,
            Command::Add => {
                self.send(chat_id, &messages::add_product_prompt()).await;
            }
        }
        Ok(())
    }

    async fn on_product_input(
        &self,
        user: &User,
        chat_id: TelegramId,
        message_id: i64,
        input: ProductInput,
    ) -> Result<(), AppError> {
        self.delete(chat_id, message_id).await;

        let draft = ProductDraft {
            name: input.name,
            quantity: input.quantity,
            min_threshold: input.min_threshold,
            unit: None,
            category: None,
        };

        let reply = match InventoryService::new(self.state.pool(), self.state.notifier())
            .create_product(draft)
            .await
        {
            Ok(product) => {
                info!(user_id = %user.id, product_id = %product.id, "Product added from chat");
                messages::product_created(&product)
            }
            Err(e) if e.is_server_error() => return Err(e),
            Err(e) => messages::error_reply(&e.public_message()),
        };

        self.send(chat_id, &reply).await;
        self.send(chat_id, &messages::main_menu()).await;
        Ok(())
    }

    async fn on_contact(
        &self,
        user: &User,
        from: &TelegramUser,
        chat_id: TelegramId,
        contact: &Contact,
    ) -> Result<(), AppError> {
        let outcome = PhoneGate::new(self.state.pool(), self.state.notifier())
            .link_contact(user, from.id, contact.user_id, &contact.phone_number)
            .await?;

        let webapp_url = self.state.notifier().webapp_url();
        match outcome {
            LinkOutcome::ForeignContact => {
                self.send(chat_id, &messages::foreign_contact()).await;
            }
            LinkOutcome::Linked { .. } => {
                self.send(chat_id, &messages::phone_linked()).await;
                self.send(chat_id, &messages::open_app(webapp_url)).await;
                self.send(chat_id, &messages::main_menu()).await;
            }
            LinkOutcome::Taken => {
                self.send(chat_id, &messages::phone_taken()).await;
            }
            LinkOutcome::AlreadyStaff => {
                self.send(chat_id, &messages::open_app(webapp_url)).await;
            }
            LinkOutcome::AlreadyPending => {
                self.send(chat_id, &messages::access_request_already_pending())
                    .await;
            }
            LinkOutcome::Forwarded(_) => {
                self.send(chat_id, &messages::access_request_forwarded())
                    .await;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    async fn on_callback(&self, user: &User, query: &CallbackQuery) -> Result<(), AppError> {
        let action = query.data.as_deref().and_then(CallbackAction::parse);

        // Stop the client's spinner whatever happens next
        if let Err(e) = self
            .state
            .telegram()
            .answer_callback_query(&query.id, None)
            .await
        {
            warn!(error = %e, "Failed to answer callback query");
        }

        let Some(action) = action else {
            debug!(data = ?query.data, "Unknown callback data");
            return Ok(());
        };

        let chat_id = query.message.as_ref().map_or(query.from.id, |m| m.chat.id);

        match action {
            CallbackAction::Inventory | CallbackAction::Add => {
                if !user.role.is_staff() {
                    self.send(chat_id, &messages::contact_request()).await;
                    return Ok(());
                }
                if let Some(menu) = &query.message {
                    self.delete(chat_id, menu.message_id).await;
                }
                if action == CallbackAction::Inventory {
                    self.show_inventory(chat_id).await?;
                } else {
                    self.send(chat_id, &messages::add_product_prompt()).await;
                }
            }
            CallbackAction::Approve(id) | CallbackAction::Decline(id) => {
                let service = AccessService::new(self.state.pool(), self.state.notifier());
                let approved = matches!(action, CallbackAction::Approve(_));
                let view = if approved {
                    service.approve(id, user, None).await?
                } else {
                    service.decline(id, user, None).await?
                };
                self.send(
                    chat_id,
                    &messages::review_recorded(approved, &view.applicant.display_name()),
                )
                .await;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn show_inventory(&self, chat_id: TelegramId) -> Result<(), AppError> {
        let products = InventoryService::new(self.state.pool(), self.state.notifier())
            .list_products()
            .await?;
        for page in messages::inventory_list(&products) {
            self.send(chat_id, &page).await;
        }
        self.send(chat_id, &messages::main_menu()).await;
        Ok(())
    }

    async fn send(&self, chat_id: TelegramId, message: &OutgoingMessage) {
        self.state.notifier().send(chat_id, message).await;
    }

    /// Delete a message; the bot may lack the rights, which is not fatal.
    async fn delete(&self, chat_id: TelegramId, message_id: i64) {
        if let Err(e) = self
            .state
            .telegram()
            .delete_message(chat_id, message_id)
            .await
        {
            debug!(error = %e, message_id, "Could not delete message");
        }
    }
}

/// Chat to answer for an update.
fn chat_of(update: &Update) -> Option<TelegramId> {
    update.message.as_ref().map(|m| m.chat.id).or_else(|| {
        update
            .callback_query
            .as_ref()
            .map(|q| q.message.as_ref().map_or(q.from.id, |m| m.chat.id))
    })
}

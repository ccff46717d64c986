//! Bot message builders.
//!
//! Provides factory functions for building outgoing messages for:
//! - The main menu and the product entry prompt
//! - The stock list
//! - Access request notifications (reviewer and applicant sides)
//! - The contact sharing flow and low-stock alerts
//!
//! All texts use HTML parse mode; user-supplied values go through
//! [`escape_html`].

use granary_core::{AccessRequestId, PhoneNumber};

use super::types::{
    InlineKeyboardButton, KeyboardButton, OutgoingMessage, ReplyKeyboardMarkup,
    ReplyKeyboardRemove, ReplyMarkup,
};
use crate::models::{AccessRequestView, Product};

/// Callback data for the stock list button.
pub const CALLBACK_INVENTORY: &str = "inventory";
/// Callback data for the product entry button.
pub const CALLBACK_ADD: &str = "add";
/// Callback data prefix for approving an access request.
pub const CALLBACK_APPROVE_PREFIX: &str = "approve_access:";
/// Callback data prefix for declining an access request.
pub const CALLBACK_DECLINE_PREFIX: &str = "decline_access:";

/// Telegram's limit on message text, in UTF-16 code units.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Longest product name shown in a list line, in characters.
const MAX_LISTED_NAME_CHARS: usize = 200;

const OPEN_APP: &str = "🚀 Открыть приложение";

/// Escape text for HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escaped product name for list lines, cut to [`MAX_LISTED_NAME_CHARS`].
fn listed_name(name: &str) -> String {
    if name.chars().count() <= MAX_LISTED_NAME_CHARS {
        return escape_html(name);
    }
    let cut: String = name.chars().take(MAX_LISTED_NAME_CHARS).collect();
    format!("{}…", escape_html(&cut))
}

/// Pack `lines` below `header` into as few messages as fit the text limit.
///
/// Only the first message carries the header.
fn paginate(header: &str, lines: impl IntoIterator<Item = String>) -> Vec<OutgoingMessage> {
    let mut pages = Vec::new();
    let mut current = header.to_string();
    let mut current_len = utf16_len(header);
    let mut has_lines = false;

    for line in lines {
        let line_len = utf16_len(&line);
        if has_lines && current_len + 1 + line_len > MAX_MESSAGE_LEN {
            pages.push(OutgoingMessage::text(std::mem::take(&mut current)));
            current_len = 0;
            has_lines = false;
        }
        if has_lines {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(&line);
        current_len += line_len;
        has_lines = true;
    }

    pages.push(OutgoingMessage::text(current));
    pages
}

/// Length as Telegram counts it.
fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Main menu with the stock and add buttons.
#[must_use]
pub fn main_menu() -> OutgoingMessage {
    OutgoingMessage::text("🔹 Главное меню:").with_inline(vec![vec![
        InlineKeyboardButton::callback("📦 Остатки", CALLBACK_INVENTORY),
        InlineKeyboardButton::callback("➕ Добавить", CALLBACK_ADD),
    ]])
}

/// Current stock, one line per product.
///
/// A product is marked green while its quantity is at or above the minimum
/// threshold and red otherwise. Long lists are split across several messages.
#[must_use]
pub fn inventory_list(products: &[Product]) -> Vec<OutgoingMessage> {
    if products.is_empty() {
        return vec![OutgoingMessage::text("Список товаров пуст 😢")];
    }

    let lines = products.iter().map(|p| {
        let mark = if p.is_low() { "🔴" } else { "🟢" };
        format!(
            "{mark} {} — {} (мин. {})",
            listed_name(&p.name),
            p.quantity,
            p.min_threshold
        )
    });

    paginate("📦 <b>Актуальные остатки:</b>\n\n", lines)
}

/// Instructions for the `name;quantity;min` product entry.
#[must_use]
pub fn add_product_prompt() -> OutgoingMessage {
    OutgoingMessage::text(
        "📝 Введите товар в формате:\n\
         <code>Название;Количество;Мин.порог</code>\n\n\
         Пример: <code>Маски;100;50</code>",
    )
}

/// Confirmation after a product was created from chat.
#[must_use]
pub fn product_created(product: &Product) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "✅ Товар добавлен:\n• {}\n• Количество: {}\n• Мин. порог: {}",
        escape_html(&product.name),
        product.quantity,
        product.min_threshold
    ))
}

/// Generic failure reply.
#[must_use]
pub fn error_reply(message: &str) -> OutgoingMessage {
    OutgoingMessage::text(format!("❌ Ошибка: {}", escape_html(message)))
}

/// Ask a guest to share their phone number.
#[must_use]
pub fn contact_request() -> OutgoingMessage {
    OutgoingMessage::text(
        "👋 Чтобы получить доступ, поделитесь номером телефона, \
         привязанным к Telegram.",
    )
    .with_markup(ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: vec![vec![KeyboardButton {
            text: "📱 Отправить номер".to_string(),
            request_contact: true,
        }]],
        resize_keyboard: true,
        one_time_keyboard: true,
    }))
}

/// The shared contact is not the sender's own.
#[must_use]
pub fn foreign_contact() -> OutgoingMessage {
    OutgoingMessage::text("⚠️ Отправьте, пожалуйста, свой собственный номер.")
}

/// The phone is allowlisted and now linked to the account.
#[must_use]
pub fn phone_linked() -> OutgoingMessage {
    OutgoingMessage::text("✅ Номер подтверждён, доступ открыт.")
        .with_markup(ReplyMarkup::Remove(ReplyKeyboardRemove::default()))
}

/// Button that opens the mini-app.
#[must_use]
pub fn open_app(webapp_url: &str) -> OutgoingMessage {
    OutgoingMessage::text("Приложение доступно по кнопке ниже.")
        .with_inline(vec![vec![InlineKeyboardButton::web_app(OPEN_APP, webapp_url)]])
}

/// The phone is already linked to another account.
#[must_use]
pub fn phone_taken() -> OutgoingMessage {
    OutgoingMessage::text("⛔ Этот номер уже привязан к другому аккаунту.")
        .with_markup(ReplyMarkup::Remove(ReplyKeyboardRemove::default()))
}

/// The phone is not allowlisted; a request went to the reviewers.
#[must_use]
pub fn access_request_forwarded() -> OutgoingMessage {
    OutgoingMessage::text(
        "📨 Номера нет в списке разрешённых. \
         Заявка на доступ отправлена администратору.",
    )
    .with_markup(ReplyMarkup::Remove(ReplyKeyboardRemove::default()))
}

/// A request from this user is already waiting for review.
#[must_use]
pub fn access_request_already_pending() -> OutgoingMessage {
    OutgoingMessage::text("⏳ Ваша заявка уже на рассмотрении.")
        .with_markup(ReplyMarkup::Remove(ReplyKeyboardRemove::default()))
}

/// Reviewer notification with approve and decline buttons.
#[must_use]
pub fn access_request_for_review(view: &AccessRequestView) -> OutgoingMessage {
    let applicant = &view.applicant;
    let id = view.request.id;

    let mut text = format!(
        "🚪 <b>Запрос на доступ</b>\nИмя: {}\n",
        escape_html(&applicant.display_name())
    );
    if let Some(username) = &applicant.username {
        text.push_str(&format!("Username: @{}\n", escape_html(username)));
    }
    text.push_str(&format!("Telegram ID: <code>{}</code>", applicant.telegram_id));
    if let Some(message) = &view.request.message {
        text.push_str(&format!("\n\n{}", escape_html(message)));
    }

    OutgoingMessage::text(text).with_inline(vec![vec![
        InlineKeyboardButton::callback("Одобрить", approve_callback(id)),
        InlineKeyboardButton::callback("Отклонить", decline_callback(id)),
    ]])
}

/// Tell the applicant they were approved.
#[must_use]
pub fn access_approved(admin_note: Option<&str>, webapp_url: &str) -> OutgoingMessage {
    let mut text = "✅ Ваша заявка на доступ была одобрена!".to_string();
    if let Some(note) = admin_note {
        text.push_str(&format!("\n\nКомментарий: {}", escape_html(note)));
    }
    OutgoingMessage::text(text)
        .with_inline(vec![vec![InlineKeyboardButton::web_app(OPEN_APP, webapp_url)]])
}

/// Tell the applicant they were declined.
#[must_use]
pub fn access_declined(admin_note: Option<&str>) -> OutgoingMessage {
    let mut text = "❌ Ваша заявка на доступ была отклонена".to_string();
    if let Some(note) = admin_note {
        text.push_str(&format!("\n\nПричина: {}", escape_html(note)));
    }
    OutgoingMessage::text(text)
}

/// Reviewer-side confirmation after a button press.
#[must_use]
pub fn review_recorded(approved: bool, applicant: &str) -> OutgoingMessage {
    let text = if approved {
        format!("✅ Доступ одобрен: {}", escape_html(applicant))
    } else {
        format!("❌ Доступ отклонён: {}", escape_html(applicant))
    };
    OutgoingMessage::text(text)
}

/// Alert for products that dropped below their minimum threshold.
#[must_use]
pub fn low_stock_alert(products: &[Product]) -> Vec<OutgoingMessage> {
    let lines = products.iter().map(|p| {
        format!(
            "🔴 {} — {} (мин. {})",
            listed_name(&p.name),
            p.quantity,
            p.min_threshold
        )
    });

    paginate("⚠️ <b>Заканчиваются товары:</b>\n\n", lines)
}

/// Reviewer-facing message body for an access request created from a phone.
#[must_use]
pub fn phone_request_note(phone: &PhoneNumber) -> String {
    format!("Номер {phone} отсутствует в списке разрешённых")
}

/// Callback data for approving a request.
#[must_use]
pub fn approve_callback(id: AccessRequestId) -> String {
    format!("{CALLBACK_APPROVE_PREFIX}{id}")
}

/// Callback data for declining a request.
#[must_use]
pub fn decline_callback(id: AccessRequestId) -> String {
    format!("{CALLBACK_DECLINE_PREFIX}{id}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use granary_core::{AccessRequestStatus, ProductId, TelegramId, UserId};

    use super::*;
    use crate::models::{AccessRequest, Applicant};

    fn product(name: &str, quantity: i32, min_threshold: i32) -> Product {
        Product {
            id: ProductId::new(1),
            name: name.to_string(),
            quantity,
            min_threshold,
            unit: None,
            category: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn view(message: Option<&str>) -> AccessRequestView {
        AccessRequestView {
            request: AccessRequest {
                id: AccessRequestId::new(42),
                user_id: UserId::new(3),
                status: AccessRequestStatus::Pending,
                message: message.map(str::to_string),
                admin_note: None,
                processed_by: None,
                processed_at: None,
                created_at: Utc::now(),
            },
            applicant: Applicant {
                telegram_id: TelegramId::new(239_676_985),
                username: Some("ivan".to_string()),
                first_name: Some("Иван".to_string()),
                last_name: None,
            },
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & c > \"d\""), "a &lt; b &amp; c &gt; &quot;d&quot;");
        assert_eq!(escape_html("Маски"), "Маски");
    }

    fn single(mut messages: Vec<OutgoingMessage>) -> OutgoingMessage {
        assert_eq!(messages.len(), 1);
        messages.pop().unwrap()
    }

    #[test]
    fn test_inventory_list_empty() {
        assert_eq!(single(inventory_list(&[])).text, "Список товаров пуст 😢");
    }

    #[test]
    fn test_inventory_list_marks() {
        let message = single(inventory_list(&[
            product("Маски", 100, 50),
            product("Перчатки", 10, 20),
        ]));
        assert!(message.text.contains("🟢 Маски — 100 (мин. 50)"));
        assert!(message.text.contains("🔴 Перчатки — 10 (мин. 20)"));
    }

    #[test]
    fn test_inventory_list_at_threshold_is_green() {
        let message = single(inventory_list(&[product("Бинты", 5, 5)]));
        assert!(message.text.contains("🟢 Бинты"));
    }

    #[test]
    fn test_inventory_list_escapes_names() {
        let message = single(inventory_list(&[product("<b>", 1, 0)]));
        assert!(message.text.contains("&lt;b&gt;"));
    }

    #[test]
    fn test_long_inventory_is_split_under_limit() {
        let products: Vec<_> = (0..400)
            .map(|i| product(&format!("Товар номер {i:03}"), i, 10))
            .collect();
        let pages = inventory_list(&products);

        assert!(pages.len() > 1);
        for page in &pages {
            assert!(utf16_len(&page.text) <= MAX_MESSAGE_LEN);
        }
        assert!(pages.first().unwrap().text.starts_with("📦"));
        assert!(!pages.last().unwrap().text.starts_with("📦"));

        let listed: usize = pages
            .iter()
            .map(|p| p.text.lines().filter(|l| l.contains("Товар номер")).count())
            .sum();
        assert_eq!(listed, 400);
    }

    #[test]
    fn test_long_names_are_cut() {
        let name = "&".repeat(5000);
        let message = single(inventory_list(&[product(&name, 1, 0)]));
        assert!(utf16_len(&message.text) <= MAX_MESSAGE_LEN);
        assert!(message.text.contains("…"));
    }

    #[test]
    fn test_main_menu_buttons() {
        let json = serde_json::to_value(main_menu().reply_markup.unwrap()).unwrap();
        let row = &json["inline_keyboard"][0];
        assert_eq!(row[0]["callback_data"], CALLBACK_INVENTORY);
        assert_eq!(row[1]["callback_data"], CALLBACK_ADD);
    }

    #[test]
    fn test_review_message_buttons() {
        let message = access_request_for_review(&view(Some("Номер +79001234567")));
        assert!(message.text.contains("Иван"));
        assert!(message.text.contains("@ivan"));
        assert!(message.text.contains("239676985"));
        assert!(message.text.contains("+79001234567"));

        let json = serde_json::to_value(message.reply_markup.unwrap()).unwrap();
        let row = &json["inline_keyboard"][0];
        assert_eq!(row[0]["callback_data"], "approve_access:42");
        assert_eq!(row[1]["callback_data"], "decline_access:42");
    }

    #[test]
    fn test_access_approved_has_web_app_button() {
        let message = access_approved(Some("добро пожаловать"), "https://app.example.org");
        assert!(message.text.contains("Комментарий: добро пожаловать"));
        let json = serde_json::to_value(message.reply_markup.unwrap()).unwrap();
        assert_eq!(
            json["inline_keyboard"][0][0]["web_app"]["url"],
            "https://app.example.org"
        );
    }

    #[test]
    fn test_access_declined_reason() {
        assert_eq!(
            access_declined(None).text,
            "❌ Ваша заявка на доступ была отклонена"
        );
        assert!(access_declined(Some("нет мест")).text.ends_with("Причина: нет мест"));
    }

    #[test]
    fn test_contact_request_keyboard() {
        let json = serde_json::to_value(contact_request().reply_markup.unwrap()).unwrap();
        assert_eq!(json["keyboard"][0][0]["request_contact"], true);
        assert_eq!(json["one_time_keyboard"], true);
    }

    #[test]
    fn test_low_stock_alert() {
        let message = single(low_stock_alert(&[product("Маски", 3, 50)]));
        assert!(message.text.contains("🔴 Маски — 3 (мин. 50)"));
    }
}

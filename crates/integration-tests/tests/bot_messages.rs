//! Integration tests for bot replies and callback data.
//!
//! Reply builders and the update parser must agree on callback data, and
//! every payload must serialize to what the Bot API expects.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use chrono::Utc;
use granary_core::{
    AccessRequestId, AccessRequestStatus, PhoneNumber, ProductId, TelegramId, UserId,
};
use granary_server::bot::{CallbackAction, Command, ProductInputParser};
use granary_server::models::{AccessRequest, AccessRequestView, Applicant, Product};
use granary_server::telegram::{OutgoingMessage, ReplyMarkup, messages};

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

fn only_page(mut pages: Vec<OutgoingMessage>) -> OutgoingMessage {
    assert_eq!(pages.len(), 1);
    pages.pop().unwrap()
}

fn review_view(id: i32) -> AccessRequestView {
    AccessRequestView {
        request: AccessRequest {
            id: AccessRequestId::new(id),
            user_id: UserId::new(5),
            status: AccessRequestStatus::Pending,
            message: Some("Ночная смена <склад>".to_string()),
            admin_note: None,
            processed_by: None,
            processed_at: None,
            created_at: Utc::now(),
        },
        applicant: Applicant {
            telegram_id: TelegramId::new(239_676_985),
            username: Some("ivan".to_string()),
            first_name: Some("Ivan".to_string()),
            last_name: None,
        },
    }
}

fn inline_callbacks(markup: Option<&ReplyMarkup>) -> Vec<String> {
    match markup {
        Some(ReplyMarkup::Inline(keyboard)) => keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| b.callback_data.clone())
            .collect(),
        _ => Vec::new(),
    }
}

// =============================================================================
// Menu and Inventory
// =============================================================================

#[test]
fn test_main_menu_buttons_parse_back() {
    let menu = messages::main_menu();
    let actions: Vec<_> = inline_callbacks(menu.reply_markup.as_ref())
        .iter()
        .map(|data| CallbackAction::parse(data))
        .collect();

    assert_eq!(
        actions,
        [Some(CallbackAction::Inventory), Some(CallbackAction::Add)]
    );
}

#[test]
fn test_inventory_marks_low_stock() {
    let list = only_page(messages::inventory_list(&[
        product("Маски", 100, 50),
        product("Перчатки", 3, 10),
    ]));

    assert!(list.text.contains("🟢 Маски — 100"));
    assert!(list.text.contains("🔴 Перчатки — 3"));
}

#[test]
fn test_threshold_boundary_is_not_low() {
    let list = only_page(messages::inventory_list(&[product("Бинты", 10, 10)]));
    assert!(list.text.contains("🟢 Бинты"));
}

#[test]
fn test_empty_inventory() {
    assert_eq!(
        only_page(messages::inventory_list(&[])).text,
        "Список товаров пуст 😢"
    );
}

#[test]
fn test_product_names_are_escaped() {
    let list = only_page(messages::inventory_list(&[product("<b>Соль & сахар</b>", 1, 0)]));
    assert!(list.text.contains("&lt;b&gt;Соль &amp; сахар&lt;/b&gt;"));
}

// =============================================================================
// Access Review
// =============================================================================

#[test]
fn test_review_buttons_round_trip() {
    let message = messages::access_request_for_review(&review_view(42));
    let actions: Vec<_> = inline_callbacks(message.reply_markup.as_ref())
        .iter()
        .map(|data| CallbackAction::parse(data))
        .collect();

    assert_eq!(
        actions,
        [
            Some(CallbackAction::Approve(AccessRequestId::new(42))),
            Some(CallbackAction::Decline(AccessRequestId::new(42))),
        ]
    );
}

#[test]
fn test_review_message_shows_applicant() {
    let message = messages::access_request_for_review(&review_view(1));

    assert!(message.text.contains("Ivan"));
    assert!(message.text.contains("@ivan"));
    assert!(message.text.contains("239676985"));
    assert!(message.text.contains("Ночная смена &lt;склад&gt;"));
}

#[test]
fn test_approval_opens_app() {
    let message = messages::access_approved(Some("Добро пожаловать"), "https://app.example.com");
    let json = serde_json::to_value(&message.reply_markup).unwrap();

    assert!(message.text.contains("Комментарий: Добро пожаловать"));
    assert_eq!(
        json["inline_keyboard"][0][0]["web_app"]["url"],
        "https://app.example.com"
    );
}

#[test]
fn test_decline_includes_reason() {
    let message = messages::access_declined(Some("Нет мест"));
    assert!(message.text.contains("Причина: Нет мест"));
    assert!(message.reply_markup.is_none());
}

#[test]
fn test_phone_request_note() {
    let phone = PhoneNumber::parse("+7 900 111-22-33").unwrap();
    assert_eq!(
        messages::phone_request_note(&phone),
        "Номер +79001112233 отсутствует в списке разрешённых"
    );
}

// =============================================================================
// Commands and Product Entry
// =============================================================================

#[test]
fn test_commands() {
    assert_eq!(Command::parse("/start"), Some(Command::Start));
    assert_eq!(Command::parse("/inventory@granary_bot"), Some(Command::Inventory));
    assert_eq!(Command::parse("hello"), None);
}

#[test]
fn test_contact_request_keyboard() {
    let json = serde_json::to_value(messages::contact_request().reply_markup).unwrap();
    assert_eq!(json["keyboard"][0][0]["request_contact"], true);
    assert_eq!(json["one_time_keyboard"], true);
}

#[test]
fn test_product_entry() {
    let parser = ProductInputParser::new().unwrap();
    let input = parser.parse("Маски; 100 ;50").unwrap();

    assert_eq!(input.name, "Маски");
    assert_eq!(input.quantity, 100);
    assert_eq!(input.min_threshold, 50);
    assert!(parser.parse("Маски;сто;50").is_none());
}

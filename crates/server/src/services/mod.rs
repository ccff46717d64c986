//! Business logic services.
//!
//! # Services
//!
//! - `init_data` - Telegram init data signature verification
//! - `access` - Access request workflow
//! - `phone_gate` - Phone allowlist and contact sharing
//! - `inventory` - Products, receipts and shift reports
//! - `notifications` - Best-effort bot notifications

pub mod access;
pub mod init_data;
pub mod inventory;
pub mod notifications;
pub mod phone_gate;

pub use access::AccessService;
pub use init_data::{InitData, InitDataError, TelegramUser, VerifiedInitData};
pub use inventory::InventoryService;
pub use notifications::Notifier;
pub use phone_gate::{LinkOutcome, PhoneGate};

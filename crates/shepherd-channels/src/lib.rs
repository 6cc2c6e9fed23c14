//! # Shepherd Channels
//!
//! Delivery providers for follow-up reminders. Each provider speaks one
//! transport (SMS gateway, SMTP, WhatsApp Business Cloud API); the
//! [`ReminderRouter`] tries them in configured priority order until one
//! accepts the message.

pub mod email;
pub mod router;
pub mod sms;
pub mod whatsapp;

pub use email::EmailProvider;
pub use router::{MessageProvider, MockProvider, ReminderRouter};
pub use sms::SmsProvider;
pub use whatsapp::WhatsAppProvider;

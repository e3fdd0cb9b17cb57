//! Due-payment notification filter.
//!
//! A read-only projection over the order book: every non-cancelled order
//! with money still to collect yields a notification, whether the due date
//! is ahead or already passed. Paid and cancelled orders never notify.

pub mod types;

pub use types::{notification_for, DueNotification};

//! Repository abstractions for data access.
//!
//! Each repository owns its unit-of-work orchestrations; the core crate
//! supplies the pure validation they run inside the transaction.

pub mod batch;
pub mod notification;
pub mod order;

mod support;

pub use batch::{BatchRepoError, BatchRepository, CreateBatchInput};
pub use notification::{NotificationError, NotificationRepository};
pub use order::{OrderDetails, OrderRepoError, OrderRepository, RefundOutcome};

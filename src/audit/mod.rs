//! Audit notifier
//!
//! Best-effort delivery of join-log and admin-action messages to an external
//! sink. Never on the decision path.

pub mod events;
pub mod notifier;
pub mod sink;

pub use events::{AuditAction, AuditEvent};
pub use notifier::{AuditNotifier, DEFAULT_QUEUE_CAPACITY};
pub use sink::{AuditSink, LogSink, NotifierError, RecordingSink, WebhookSink};

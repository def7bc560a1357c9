// ============================================================================
// Notifications
// ============================================================================
//
// Customer-facing side effects of delivery completion. Every channel is
// best-effort; the fan-out isolates channels from each other and the guard
// from all of them.
//
// ============================================================================

pub mod fanout;
pub mod inapp;
pub mod push;
pub mod sender;

pub use fanout::NotificationFanout;
pub use inapp::InAppNotifier;
pub use push::PushGatewayClient;
pub use sender::{CustomerNotice, NoticeKind, NotificationSender};

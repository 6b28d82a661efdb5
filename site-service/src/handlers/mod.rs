pub mod admin_handlers;
pub mod guestbook_handlers;
pub mod stats_handlers;
pub mod subscriber_handlers;
pub mod timeline_handlers;

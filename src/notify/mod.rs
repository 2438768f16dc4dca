mod sink;
mod templates;

pub use sink::NotificationSink;
pub use templates::Message;

mod backend;
mod noop;
mod slack;

pub use backend::NotifyBackend;
pub use noop::NoopBackend;
pub use slack::SlackWebhook;

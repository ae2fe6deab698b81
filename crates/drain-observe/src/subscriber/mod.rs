mod view;
pub use view::{View, log_event, message_for};

mod log;
pub use log::LogSubscriber;

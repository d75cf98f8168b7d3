//! DingTalk Webhook Notifications
//!
//! Turns host error events into DingTalk robot messages. The pipeline runs
//! one way: `extractor` pulls context out of the notification, `composer`
//! builds the markdown body from project options, and the DingTalk channel
//! signs the URL (optionally) and POSTs the message.

pub mod channels;
pub mod composer;
pub mod extractor;
pub mod integration;
pub mod service;
pub mod signing;
pub mod types;

pub use channels::{DingtalkChannel, WebhookChannel};
pub use composer::compose;
pub use extractor::extract;
pub use integration::{dispatch_on_event, dispatch_with_options};
pub use service::NotifyService;
pub use types::*;

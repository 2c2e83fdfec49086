// Messaging - channels between the player thread and its callers

pub mod channels;
pub mod command;
pub mod notification;

pub use channels::{
    create_command_channel, create_midi_event_channel, create_notification_channel,
    create_status_channel,
};
pub use command::Command;
pub use notification::{Notification, NotificationCategory, NotificationLevel};

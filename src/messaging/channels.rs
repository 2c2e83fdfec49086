// Communication channels
// Commands use a bounded crossbeam channel (the player blocks on it with a timeout);
// status, notifications and MIDI output are lock-free ring buffers drained by the caller

use crate::messaging::command::Command;
use crate::messaging::notification::Notification;
use crate::midi::event::MidiEventTimed;
use crate::sequencer::player::PlaybackStatus;
use ringbuf::{HeapRb, traits::Split};

pub type CommandSender = crossbeam_channel::Sender<Command>;
pub type CommandReceiver = crossbeam_channel::Receiver<Command>;

pub fn create_command_channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    crossbeam_channel::bounded(capacity)
}

pub type StatusProducer = ringbuf::HeapProd<PlaybackStatus>;
pub type StatusConsumer = ringbuf::HeapCons<PlaybackStatus>;

pub fn create_status_channel(capacity: usize) -> (StatusProducer, StatusConsumer) {
    let rb = HeapRb::<PlaybackStatus>::new(capacity);
    rb.split()
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

pub type MidiEventProducer = ringbuf::HeapProd<MidiEventTimed>;
pub type MidiEventConsumer = ringbuf::HeapCons<MidiEventTimed>;

pub fn create_midi_event_channel(capacity: usize) -> (MidiEventProducer, MidiEventConsumer) {
    let rb = HeapRb::<MidiEventTimed>::new(capacity);
    rb.split()
}

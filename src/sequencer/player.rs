// Sequencer player - dedicated thread that owns the playback context
// Holds at most one armed step; commands cancel it, apply a transition and re-arm

use crate::audio::engine::{SoundEngine, Volume, VolumeScaled};
use crate::audio::timing::Clock;
use crate::config::PlayerConfig;
use crate::messaging::channels::{
    CommandReceiver, CommandSender, NotificationConsumer, NotificationProducer, StatusConsumer,
    StatusProducer, create_command_channel, create_notification_channel, create_status_channel,
};
use crate::messaging::command::Command;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::midi::decoded::DecodedMidi;
use crate::sequencer::PlaybackError;
use crate::sequencer::action::Action;
use crate::sequencer::context::PlaybackContext;
use crate::sequencer::deriver::derive_actions;
use crate::sequencer::scheduler::arm;
use crate::sequencer::transport::TransportState;
use crossbeam_channel::RecvTimeoutError;
use ringbuf::traits::Producer;
use std::io;
use std::ops::ControlFlow;
use std::thread::{self, JoinHandle};

/// Snapshot published after every context change, for progress display
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    pub state: TransportState,
    /// Next action index; None while parked
    pub cursor: Option<usize>,
    pub len: usize,
    /// Seconds of the piece played so far (frozen while paused)
    pub elapsed_secs: f64,
    pub pressed_notes: Vec<String>,
    pub sustain_active: bool,
    pub paused: bool,
    pub volume: f32,
}

impl PlaybackStatus {
    pub fn from_context(ctx: &PlaybackContext, volume: Volume, now: f64) -> Self {
        let (_, len) = ctx.progress();
        Self {
            state: ctx.transport_state(),
            cursor: ctx.cursor(),
            len,
            elapsed_secs: ctx.elapsed(now),
            pressed_notes: ctx.pressed_notes().iter().cloned().collect(),
            sustain_active: ctx.is_sustain_active(),
            paused: ctx.is_paused(),
            volume: volume.get(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor == Some(self.len)
    }
}

/// Receiving ends handed to the presentation layer
pub struct PlayerChannels {
    pub status: StatusConsumer,
    pub notifications: NotificationConsumer,
}

/// Handle to the player thread
///
/// Dropping the handle stops the thread and releases anything still sounding.
pub struct Player {
    commands: CommandSender,
    thread: Option<JoinHandle<Result<(), PlaybackError>>>,
}

impl Player {
    /// Start the player thread with an empty, idle context
    pub fn spawn<E, C>(engine: E, clock: C, config: &PlayerConfig) -> io::Result<(Self, PlayerChannels)>
    where
        E: SoundEngine + Send + 'static,
        C: Clock + 'static,
    {
        let (command_tx, command_rx) = create_command_channel(config.command_capacity);
        let (status_tx, status_rx) = create_status_channel(config.status_capacity);
        let (notification_tx, notification_rx) =
            create_notification_channel(config.notification_capacity);

        let now = clock.now();
        let task = PlayerTask {
            engine,
            clock,
            commands: command_rx,
            status: status_tx,
            notifications: notification_tx,
            ctx: PlaybackContext::empty(now),
            volume: config.volume(),
            seek_lead: config.seek_lead_secs,
            autoplay: config.autoplay,
        };

        let thread = thread::Builder::new()
            .name("pianola-player".to_string())
            .spawn(move || task.run())?;

        log::info!("Player thread started");

        Ok((
            Self {
                commands: command_tx,
                thread: Some(thread),
            },
            PlayerChannels {
                status: status_rx,
                notifications: notification_rx,
            },
        ))
    }

    pub fn send(&self, command: Command) -> Result<(), PlaybackError> {
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::PlayerDisconnected)
    }

    /// Derive the action list for a decoded file and load it
    pub fn load_file(&self, midi: Option<&DecodedMidi>) -> Result<usize, PlaybackError> {
        let actions = derive_actions(midi);
        let len = actions.len();
        self.send(Command::Load(actions))?;
        Ok(len)
    }

    pub fn load_actions(&self, actions: Vec<Action>) -> Result<(), PlaybackError> {
        self.send(Command::Load(actions))
    }

    pub fn set_paused(&self, paused: bool) -> Result<(), PlaybackError> {
        self.send(Command::SetPaused(paused))
    }

    pub fn toggle_pause(&self) -> Result<(), PlaybackError> {
        self.send(Command::TogglePause)
    }

    pub fn seek(&self, index: usize) -> Result<(), PlaybackError> {
        self.send(Command::Seek(index))
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        self.send(Command::SetVolume(volume))
    }

    /// True while the thread has not exited
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the thread and return how it ended
    pub fn stop(mut self) -> Result<(), PlaybackError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), PlaybackError> {
        let Some(handle) = self.thread.take() else {
            return Ok(());
        };

        // Already gone if the thread ended on an error
        let _ = self.commands.send(Command::Stop);

        handle
            .join()
            .map_err(|_| PlaybackError::PlayerDisconnected)?
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Player stopped with error: {}", e);
        }
    }
}

/// State owned by the player thread
struct PlayerTask<E, C> {
    engine: E,
    clock: C,
    commands: CommandReceiver,
    status: StatusProducer,
    notifications: NotificationProducer,
    ctx: PlaybackContext,
    volume: Volume,
    seek_lead: f64,
    autoplay: bool,
}

impl<E: SoundEngine, C: Clock> PlayerTask<E, C> {
    fn run(mut self) -> Result<(), PlaybackError> {
        self.publish();

        loop {
            let pending = arm(&self.ctx, self.clock.now());

            let received = match &pending {
                Some(step) => self.commands.recv_timeout(step.delay()),
                None => self
                    .commands
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(command) => {
                    if let Some(step) = pending {
                        step.cancel();
                    }
                    if self.handle(command).is_break() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    let Some(step) = pending else {
                        continue;
                    };

                    // Woken before the injected clock reached the deadline
                    if self.clock.now() < step.fire_at() {
                        step.cancel();
                        continue;
                    }

                    let mut engine = VolumeScaled::new(&mut self.engine, self.volume);
                    match step.fire(&self.ctx, &mut engine) {
                        Ok(next) => self.ctx = next,
                        Err(e) => {
                            log::error!("Scheduler error: {}", e);
                            self.notify(Notification::error(
                                NotificationCategory::Scheduler,
                                e.to_string(),
                            ));
                            self.release_all();
                            return Err(e);
                        }
                    }

                    self.publish();

                    if self.ctx.is_finished() {
                        log::info!("Playback finished ({} actions)", self.ctx.len());
                        self.notify(Notification::info(
                            NotificationCategory::Playback,
                            "Playback finished".to_string(),
                        ));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("All player handles dropped, shutting down");
                    self.release_all();
                    break;
                }
            }
        }

        log::info!("Player thread stopped");
        Ok(())
    }

    fn handle(&mut self, command: Command) -> ControlFlow<()> {
        let now = self.clock.now();

        match command {
            Command::Load(actions) => {
                // Nothing from the previous piece may keep sounding
                self.release_all();

                let loaded = PlaybackContext::new(actions, now);
                self.ctx = if self.autoplay {
                    loaded
                } else {
                    loaded.pause(now)
                };

                log::info!("Loaded piece with {} actions", self.ctx.len());
                self.notify(Notification::info(
                    NotificationCategory::Playback,
                    format!("Loaded {} actions", self.ctx.len()),
                ));
            }
            Command::SetPaused(paused) => {
                self.ctx = self.ctx.set_paused(paused, now);
            }
            Command::TogglePause => {
                self.ctx = self.ctx.toggle_paused(now);
            }
            Command::Seek(index) => {
                match self.ctx.scrub(index, &mut self.engine, now, self.seek_lead) {
                    Ok(next) => self.ctx = next,
                    Err(e) => {
                        log::warn!("Seek rejected: {}", e);
                        self.notify(Notification::warning(
                            NotificationCategory::Transport,
                            e.to_string(),
                        ));
                        return ControlFlow::Continue(());
                    }
                }
            }
            Command::SetVolume(volume) => {
                self.volume = Volume::new(volume);
            }
            Command::Stop => {
                self.release_all();
                return ControlFlow::Break(());
            }
        }

        self.publish();
        ControlFlow::Continue(())
    }

    /// Silence everything and park the cursor
    fn release_all(&mut self) {
        let now = self.clock.now();
        self.ctx = self.ctx.clear(&mut self.engine, now);
        self.publish();
    }

    fn publish(&mut self) {
        let status = PlaybackStatus::from_context(&self.ctx, self.volume, self.clock.now());
        if self.status.try_push(status).is_err() {
            log::trace!("Status queue full, dropping update");
        }
    }

    fn notify(&mut self, notification: Notification) {
        if self.notifications.try_push(notification).is_err() {
            log::trace!("Notification queue full, dropping notification");
        }
    }
}

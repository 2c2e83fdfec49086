use pianola::audio::engine::{LogEngine, MidiOutEngine};
use pianola::messaging::channels::{MidiEventConsumer, create_midi_event_channel};
use pianola::midi::decoded::DecodedMidi;
use pianola::sequencer::action::actions_to_json;
use pianola::sequencer::player::PlayerChannels;
use pianola::{PlaybackError, Player, PlayerConfig, SoundEngine, SystemClock, derive_actions};
use ringbuf::traits::Consumer;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

// Sized for dense piano writing: a full-keyboard glissando with pedal stays well below this
const MIDI_OUT_RINGBUFFER_CAPACITY: usize = 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

const USAGE: &str = "\
Usage: pianola <decoded.json> [options]

Options:
  --dump-actions     Print the derived action list as JSON and exit
  --midi             Print raw MIDI bytes instead of note names
  --volume <0..1>    Initial volume
  --start <index>    Start from this action index
  --config <path>    Player config (RON); defaults to the user config dir";

#[derive(Debug, Default)]
struct CliOptions {
    input: PathBuf,
    dump_actions: bool,
    midi_out: bool,
    volume: Option<f32>,
    start: Option<usize>,
    config: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut input = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump-actions" => options.dump_actions = true,
            "--midi" => options.midi_out = true,
            "--volume" => {
                let value = args.next().ok_or("--volume needs a value")?;
                options.volume = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid volume '{}'", value))?,
                );
            }
            "--start" => {
                let value = args.next().ok_or("--start needs a value")?;
                options.start = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid action index '{}'", value))?,
                );
            }
            "--config" => {
                let value = args.next().ok_or("--config needs a path")?;
                options.config = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            path => {
                if input.replace(PathBuf::from(path)).is_some() {
                    return Err("only one input file can be played".to_string());
                }
            }
        }
    }

    options.input = input.ok_or("missing input file")?;
    Ok(options)
}

fn load_config(options: &CliOptions) -> Result<PlayerConfig, pianola::ConfigError> {
    match options.config.clone().or_else(PlayerConfig::default_path) {
        Some(path) => PlayerConfig::load_or_default(&path),
        None => Ok(PlayerConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("ERROR: {}\n\n{}", message, USAGE);
            std::process::exit(2);
        }
    };

    let midi = DecodedMidi::load(&options.input)?;

    if options.dump_actions {
        println!("{}", actions_to_json(&derive_actions(Some(&midi)))?);
        return Ok(());
    }

    let config = load_config(&options)?;
    let clock = SystemClock::new();

    let (engine, mut midi_out): (Box<dyn SoundEngine + Send>, Option<MidiEventConsumer>) =
        if options.midi_out {
            let (producer, consumer) = create_midi_event_channel(MIDI_OUT_RINGBUFFER_CAPACITY);
            let engine = MidiOutEngine::new(producer, clock);
            (Box::new(engine) as Box<dyn SoundEngine + Send>, Some(consumer))
        } else {
            (Box::new(LogEngine) as Box<dyn SoundEngine + Send>, None)
        };

    let (player, mut channels) = Player::spawn(engine, clock, &config)?;

    if let Some(volume) = options.volume {
        player.set_volume(volume)?;
    }

    let total = start_playback(&player, &midi, options.start)?;
    if total == 0 {
        log::warn!("{} contains nothing to play", options.input.display());
        return Ok(player.stop()?);
    }

    run_until_finished(&player, &mut channels, midi_out.as_mut(), total);

    let stopped = player.stop();
    // Releases sent while stopping
    if let Some(consumer) = midi_out.as_mut() {
        print_midi(consumer);
    }
    Ok(stopped?)
}

fn print_midi(consumer: &mut MidiEventConsumer) {
    for timed in consumer.pop_iter() {
        let [status, data1, data2] = timed.event.to_bytes(0);
        println!(
            "{:9.3}s  {:02X} {:02X} {:02X}",
            timed.time_seconds, status, data1, data2
        );
    }
}

/// Load the piece and start it, returning its action count
///
/// Resumes explicitly: a config with `autoplay: false` loads pieces paused.
fn start_playback(
    player: &Player,
    midi: &DecodedMidi,
    start: Option<usize>,
) -> Result<usize, PlaybackError> {
    let total = player.load_file(Some(midi))?;
    if total == 0 {
        return Ok(0);
    }

    player.set_paused(false)?;
    if let Some(start) = start {
        player.seek(start)?;
    }
    Ok(total)
}

/// Print progress, notifications and MIDI output until the last action
/// fired or the player thread ended
fn run_until_finished(
    player: &Player,
    channels: &mut PlayerChannels,
    mut midi_out: Option<&mut MidiEventConsumer>,
    total: usize,
) {
    let mut last_cursor = None;

    loop {
        thread::sleep(POLL_INTERVAL);

        for notification in channels.notifications.pop_iter() {
            notification.log();
        }

        if let Some(consumer) = midi_out.as_deref_mut() {
            print_midi(consumer);
        }

        let mut finished = false;
        for status in channels.status.pop_iter() {
            if status.len != total {
                continue;
            }
            if status.cursor != last_cursor {
                last_cursor = status.cursor;
                log::debug!(
                    "Progress: {}/{} at {:.2}s {}",
                    status.cursor.unwrap_or(0),
                    status.len,
                    status.elapsed_secs,
                    if status.sustain_active { "[pedal]" } else { "" }
                );
            }
            finished = status.is_finished();
        }

        if finished {
            break;
        }
        if !player.is_running() {
            log::error!("Player thread ended before the piece finished");
            break;
        }
    }
}

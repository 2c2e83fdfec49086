// Audio boundary - clocks and the sound engine sinks the scheduler drives

pub mod engine;
pub mod timing;

pub use engine::{
    EngineEvent, KeyPress, KeyRelease, LogEngine, MidiOutEngine, RecordingEngine, SoundEngine,
    Volume, VolumeScaled,
};
pub use timing::{Clock, ManualClock, SystemClock};

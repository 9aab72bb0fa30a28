use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::map_adapter::MapAdapter;
use crate::playback::{PlaybackEngine, Schedule, Speed, MIN_INTERVAL};
use crate::track::Path;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Toggle,
    Reset,
    SetSpeed(Speed),
    SpeedUp,
    SlowDown,
    Load(Path),
    Shutdown,
}

/// Sending half of a player. Cheap to clone, one per UI control if needed.
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl PlayerHandle {
    /// Returns false once the player has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn play(&self) -> bool {
        self.send(Command::Play)
    }

    pub fn pause(&self) -> bool {
        self.send(Command::Pause)
    }

    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }
}

pub fn channel() -> (PlayerHandle, mpsc::UnboundedReceiver<Command>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PlayerHandle { tx }, rx)
}

/// Drives `engine` on the current task until `Command::Shutdown` arrives or
/// every handle is dropped, then pauses and tears it down. At most one
/// interval exists at a time and it always belongs to the engine's current
/// schedule.
pub async fn run<M: MapAdapter>(
    engine: &mut PlaybackEngine<M>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let mut timer: Option<(u64, Interval)> = None;
    info!("player started");
    loop {
        sync_timer(engine.schedule(), &mut timer);

        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => {
                    if !apply(engine, command) {
                        break;
                    }
                }
                None => {
                    debug!("all player handles dropped");
                    break;
                }
            },
            id = next_tick(&mut timer) => {
                engine.tick(id);
            }
        }
    }
    drop(timer);
    engine.pause();
    engine.teardown();
    info!("player stopped");
}

/// Makes `timer` match `schedule`: the same id keeps its interval, anything
/// else replaces or drops it.
pub(crate) fn sync_timer(schedule: Option<Schedule>, timer: &mut Option<(u64, Interval)>) {
    let current = timer.as_ref().map(|(id, _)| *id);
    match schedule {
        Some(schedule) if current == Some(schedule.id) => (),
        Some(schedule) => {
            // the old interval goes away before the new one exists
            *timer = None;
            let period = schedule.period.max(MIN_INTERVAL);
            let Some(first_tick) = Instant::now().checked_add(period) else {
                warn!("schedule {} period {:?} is out of range", schedule.id, period);
                return;
            };
            let mut interval = time::interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            *timer = Some((schedule.id, interval));
        }
        None => *timer = None,
    }
}

/// Resolves with the schedule id on the next tick. Never resolves without a
/// timer.
pub(crate) async fn next_tick(timer: &mut Option<(u64, Interval)>) -> u64 {
    match timer.as_mut() {
        Some((id, interval)) => {
            interval.tick().await;
            *id
        }
        None => std::future::pending().await,
    }
}

// false means stop
fn apply<M: MapAdapter>(engine: &mut PlaybackEngine<M>, command: Command) -> bool {
    debug!("player command: {command:?}");
    match command {
        Command::Play => {
            if let Err(e) = engine.start() {
                warn!("cannot start playback: {e}");
            }
        }
        Command::Pause => engine.pause(),
        Command::Toggle => {
            if let Err(e) = engine.toggle() {
                warn!("cannot start playback: {e}");
            }
        }
        Command::Reset => engine.reset(),
        Command::SetSpeed(speed) => engine.set_speed(speed),
        Command::SpeedUp => engine.speed_up(),
        Command::SlowDown => engine.slow_down(),
        Command::Load(path) => engine.load_path(path),
        Command::Shutdown => return false,
    }
    true
}

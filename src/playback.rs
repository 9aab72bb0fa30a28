use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::map_adapter::{MapAdapter, MarkerId, MarkerStyle};
use crate::track::{Path, Point};

pub const MIN_MULTIPLIER: u32 = 1;
pub const MAX_MULTIPLIER: u32 = 4;
pub const MIN_INTERVAL: Duration = Duration::from_millis(5);
// Slower than this is indistinguishable from paused.
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);
pub const INTERVAL_STEP: Duration = Duration::from_millis(5);

// `FixedSteps` always covers the whole path in this many ticks.
pub const FIXED_STEP_COUNT: u64 = 200;
// `FrameFraction` moves 1/100 of a segment per tick at 1x.
const FRACTION_UNITS_PER_SAMPLE: u64 = 100;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Finished,
}

/// How a tick advances the cursor. Fixed for the lifetime of an engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// `cursor += 0.01 * multiplier` on every frame. Long paths take longer.
    FrameFraction,
    /// 200 ticks from start to end on a timer, regardless of path length.
    FixedSteps,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Speed {
    Multiplier(u32),
    /// Time between two ticks. Lower is faster.
    Interval(Duration),
}

impl Speed {
    pub fn normalized(self) -> Self {
        match self {
            Speed::Multiplier(m) => Speed::Multiplier(m.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER)),
            Speed::Interval(d) => Speed::Interval(clamp_interval(d)),
        }
    }

    pub fn faster(self) -> Self {
        match self {
            Speed::Multiplier(m) => Speed::Multiplier(m.saturating_add(1)),
            Speed::Interval(d) => Speed::Interval(d.saturating_sub(INTERVAL_STEP)),
        }
        .normalized()
    }

    pub fn slower(self) -> Self {
        match self {
            Speed::Multiplier(m) => Speed::Multiplier(m.saturating_sub(1)),
            Speed::Interval(d) => Speed::Interval(d.saturating_add(INTERVAL_STEP)),
        }
        .normalized()
    }

    pub fn is_fastest(&self) -> bool {
        match self {
            Speed::Multiplier(m) => *m >= MAX_MULTIPLIER,
            Speed::Interval(d) => *d <= MIN_INTERVAL,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Speed::Multiplier(m) => format!("{m}X"),
            Speed::Interval(d) => {
                let ms = d.as_millis();
                match ms {
                    0..=5 => "Very Fast",
                    6..=10 => "Fast",
                    11..=20 => "Normal",
                    21..=30 => "Slow",
                    _ => "Very Slow",
                }
                .to_string()
            }
        }
    }
}

pub fn clamp_interval(d: Duration) -> Duration {
    d.clamp(MIN_INTERVAL, MAX_INTERVAL)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    pub policy: AdvancePolicy,
    /// Tick period for `FrameFraction` at any multiplier.
    pub frame_interval: Duration,
    /// Tick period for `FixedSteps` at 1x.
    pub base_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            policy: AdvancePolicy::FrameFraction,
            frame_interval: Duration::from_millis(16),
            base_interval: Duration::from_millis(20),
        }
    }
}

/// The one live timer of an engine. A new id is handed out every time the
/// schedule is (re)installed, ticks from older ids are stale.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub id: u64,
    pub period: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    Position(Point),
    Progress(f64),
    StateChanged(PlaybackState),
}

pub trait PlaybackObserver {
    fn on_event(&mut self, event: &PlaybackEvent);
}

impl<F: FnMut(&PlaybackEvent)> PlaybackObserver for F {
    fn on_event(&mut self, event: &PlaybackEvent) {
        self(event)
    }
}

pub struct PlaybackEngine<M: MapAdapter> {
    map: M,
    path: Path,
    config: PlaybackConfig,
    speed: Speed,
    state: PlaybackState,
    // progress in policy units, see `end_units`
    position: u64,
    schedule: Option<Schedule>,
    next_schedule_id: u64,
    drawn: bool,
    observers: Vec<Box<dyn PlaybackObserver>>,
}

impl<M: MapAdapter> PlaybackEngine<M> {
    pub fn new(map: M, mut config: PlaybackConfig) -> Self {
        config.frame_interval = clamp_interval(config.frame_interval);
        config.base_interval = clamp_interval(config.base_interval);
        let speed = match config.policy {
            AdvancePolicy::FrameFraction => Speed::Multiplier(MIN_MULTIPLIER),
            AdvancePolicy::FixedSteps => Speed::Interval(config.base_interval),
        }
        .normalized();
        PlaybackEngine {
            map,
            path: Path::empty(),
            config,
            speed,
            state: PlaybackState::Idle,
            position: 0,
            schedule: None,
            next_schedule_id: 0,
            drawn: false,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: impl PlaybackObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Replaces the current path. The previous polyline and markers are
    /// removed before anything new is drawn.
    pub fn load_path(&mut self, path: Path) {
        self.teardown();
        self.path = path;
        self.position = 0;
        self.set_state(PlaybackState::Idle);

        let (first, last) = match (self.path.first(), self.path.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                info!("no data to draw");
                self.emit(PlaybackEvent::Progress(0.0));
                return;
            }
        };
        self.map.draw_path(self.path.points());
        self.map
            .place_marker(MarkerId::Start, first, MarkerStyle::for_marker(MarkerId::Start));
        self.map
            .place_marker(MarkerId::End, last, MarkerStyle::for_marker(MarkerId::End));
        self.map
            .place_marker(MarkerId::Cursor, first, MarkerStyle::for_marker(MarkerId::Cursor));
        if let Some(bounds) = self.path.bounds() {
            self.map.fit_bounds(bounds);
        }
        self.drawn = true;
        self.emit(PlaybackEvent::Progress(0.0));
    }

    /// Cancels the schedule and releases everything drawn on the map.
    pub fn teardown(&mut self) {
        self.cancel_schedule();
        if self.drawn {
            self.map.remove_marker(MarkerId::Cursor);
            self.map.remove_marker(MarkerId::Start);
            self.map.remove_marker(MarkerId::End);
            self.map.clear_path();
            self.drawn = false;
        }
    }

    pub fn start(&mut self) -> Result<()> {
        match self.path.len() {
            0 => return Err(Error::EmptyPath),
            1 => return Err(Error::InsufficientPath { len: 1 }),
            _ => (),
        }
        match self.state {
            PlaybackState::Playing => return Ok(()),
            PlaybackState::Paused => (),
            PlaybackState::Idle | PlaybackState::Finished => {
                self.position = 0;
                self.emit_position();
            }
        }
        self.set_state(PlaybackState::Playing);
        self.install_schedule();
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            debug!("pause ignored in state {:?}", self.state);
            return;
        }
        self.cancel_schedule();
        self.set_state(PlaybackState::Paused);
    }

    pub fn toggle(&mut self) -> Result<()> {
        if self.state == PlaybackState::Playing {
            self.pause();
            Ok(())
        } else {
            self.start()
        }
    }

    pub fn reset(&mut self) {
        self.cancel_schedule();
        self.position = 0;
        if !self.path.is_empty() {
            self.emit_position();
        }
        self.set_state(PlaybackState::Idle);
    }

    pub fn set_speed(&mut self, speed: Speed) {
        let speed = speed.normalized();
        if speed == self.speed {
            return;
        }
        info!("speed changed: {:?} -> {:?}", self.speed, speed);
        self.speed = speed;
        if self.state == PlaybackState::Playing {
            self.install_schedule();
        }
    }

    pub fn speed_up(&mut self) {
        self.set_speed(self.speed.faster());
    }

    pub fn slow_down(&mut self) {
        self.set_speed(self.speed.slower());
    }

    /// Called by whatever drives the schedule. Returns false when the tick
    /// belongs to a schedule that is no longer live.
    pub fn tick(&mut self, schedule_id: u64) -> bool {
        match self.schedule {
            Some(schedule) if schedule.id == schedule_id => (),
            _ => {
                warn!("ignoring stale tick from schedule {schedule_id}");
                return false;
            }
        }

        let end = self.end_units();
        self.position = (self.position + self.step_units()).min(end);
        self.emit_position();
        if self.position >= end {
            self.finish();
        }
        true
    }

    fn finish(&mut self) {
        info!("playback finished");
        self.cancel_schedule();
        self.position = 0;
        self.set_state(PlaybackState::Finished);
        self.emit_position();
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn speed_label(&self) -> String {
        self.speed.label()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn policy(&self) -> AdvancePolicy {
        self.config.policy
    }

    pub fn schedule(&self) -> Option<Schedule> {
        self.schedule
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    /// Playback needs at least two points; callers disable their controls
    /// instead of calling `start` when this is false.
    pub fn controls_enabled(&self) -> bool {
        self.path.len() >= 2
    }

    pub fn cursor(&self) -> f64 {
        if self.path.len() < 2 {
            return 0.0;
        }
        match self.config.policy {
            AdvancePolicy::FrameFraction => self.position as f64 / FRACTION_UNITS_PER_SAMPLE as f64,
            AdvancePolicy::FixedSteps => {
                self.position as f64 / FIXED_STEP_COUNT as f64 * (self.path.len() - 1) as f64
            }
        }
    }

    pub fn progress_percent(&self) -> f64 {
        let end = self.end_units();
        if end == 0 {
            return 0.0;
        }
        (self.position as f64 * 100.0 / end as f64).clamp(0.0, 100.0)
    }

    pub fn position_at(&self, cursor: f64) -> Option<Point> {
        self.path.position_at(cursor)
    }

    pub fn current_position(&self) -> Option<Point> {
        self.path.position_at(self.cursor())
    }

    /// Ticks left before the engine finishes at the current speed.
    pub fn remaining_ticks(&self) -> u64 {
        let remaining = self.end_units().saturating_sub(self.position);
        remaining.div_ceil(self.step_units())
    }

    fn end_units(&self) -> u64 {
        if self.path.len() < 2 {
            return 0;
        }
        match self.config.policy {
            AdvancePolicy::FrameFraction => (self.path.len() as u64 - 1) * FRACTION_UNITS_PER_SAMPLE,
            AdvancePolicy::FixedSteps => FIXED_STEP_COUNT,
        }
    }

    fn step_units(&self) -> u64 {
        match (self.config.policy, self.speed) {
            (AdvancePolicy::FrameFraction, Speed::Multiplier(m)) => m as u64,
            (AdvancePolicy::FrameFraction, Speed::Interval(_)) => 1,
            (AdvancePolicy::FixedSteps, _) => 1,
        }
    }

    fn period(&self) -> Duration {
        match (self.config.policy, self.speed) {
            (AdvancePolicy::FrameFraction, Speed::Multiplier(_)) => self.config.frame_interval,
            (AdvancePolicy::FixedSteps, Speed::Multiplier(m)) => {
                (self.config.base_interval / m).max(MIN_INTERVAL)
            }
            (_, Speed::Interval(d)) => d,
        }
    }

    fn install_schedule(&mut self) {
        self.cancel_schedule();
        self.next_schedule_id += 1;
        let schedule = Schedule {
            id: self.next_schedule_id,
            period: self.period(),
        };
        debug!("installing schedule {} every {:?}", schedule.id, schedule.period);
        self.schedule = Some(schedule);
    }

    fn cancel_schedule(&mut self) {
        if let Some(schedule) = self.schedule.take() {
            debug!("cancelled schedule {}", schedule.id);
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            info!("playback state: {:?} -> {:?}", self.state, state);
            self.state = state;
            self.emit(PlaybackEvent::StateChanged(state));
        }
    }

    fn emit_position(&mut self) {
        if let Some(point) = self.current_position() {
            self.map.move_marker(MarkerId::Cursor, point);
            self.emit(PlaybackEvent::Position(point));
        }
        self.emit(PlaybackEvent::Progress(self.progress_percent()));
    }

    fn emit(&mut self, event: PlaybackEvent) {
        for observer in self.observers.iter_mut() {
            observer.on_event(&event);
        }
    }
}

impl<M: MapAdapter> Drop for PlaybackEngine<M> {
    fn drop(&mut self) {
        self.teardown();
    }
}

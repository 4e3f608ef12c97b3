//! Pomodoro countdown.
//!
//! The timer is a plain state machine advanced by [`PomodoroTimer::tick`].
//! Where ticks come from is a [`TickSource`]: adapters use [`ThreadTicker`]
//! for a real one-second cadence, tests use [`ManualTicker`] and call `tick`
//! themselves.

use crate::error::AppError;
use crate::notify::{self, Notice, Notifier};
use crate::stats::{StudyHours, local_weekday_index};
use crate::storage::{PersistentStore, StoreKey};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::{debug, info};

/// Focus completions tracked per cycle; further completions keep showing 4.
pub const CYCLE_LENGTH: u8 = 4;
pub const FOCUS_CREDIT_HOURS: f64 = 0.5;
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimerMode {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Focus => "Focus",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimerMode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "focus" => Ok(Self::Focus),
            "short" | "short_break" => Ok(Self::ShortBreak),
            "long" | "long_break" => Ok(Self::LongBreak),
            other => Err(AppError::invalid_input(format!("unknown timer mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerDurations {
    pub focus: u32,
    pub short_break: u32,
    pub long_break: u32,
}

impl Default for TimerDurations {
    fn default() -> Self {
        Self {
            focus: 25 * 60,
            short_break: 5 * 60,
            long_break: 15 * 60,
        }
    }
}

impl TimerDurations {
    pub fn duration_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Focus => self.focus,
            TimerMode::ShortBreak => self.short_break,
            TimerMode::LongBreak => self.long_break,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    pub mode: TimerMode,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    pub running: bool,
    pub sessions_completed_in_cycle: u8,
}

/// Outcome of the tick that drove the countdown to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Completion {
    Focus {
        sessions_in_cycle: u8,
        total_pomodoros: u64,
        weekday: usize,
    },
    Break {
        mode: TimerMode,
    },
}

pub trait TickSource {
    /// Begins emitting ticks every `period`.
    fn start(&mut self, period: Duration);

    /// Stops emitting ticks. A tick already in flight may still arrive, so
    /// consumers drop ticks that land while the timer is not running.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// Tick source that never fires on its own.
#[derive(Debug, Default)]
pub struct ManualTicker {
    active: bool,
    starts: usize,
    stops: usize,
}

impl ManualTicker {
    pub fn starts(&self) -> usize {
        self.starts
    }

    pub fn stops(&self) -> usize {
        self.stops
    }
}

impl TickSource for ManualTicker {
    fn start(&mut self, _period: Duration) {
        self.active = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        if self.active {
            self.stops += 1;
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// Background thread sending one [`Tick`] per period over a channel.
///
/// Every `start` spawns a fresh thread with its own stop flag, so a stopped
/// thread can never resume sending.
pub struct ThreadTicker {
    sender: Sender<Tick>,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl ThreadTicker {
    pub fn new() -> (Self, Receiver<Tick>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender,
                stop_flag: None,
            },
            receiver,
        )
    }
}

impl TickSource for ThreadTicker {
    fn start(&mut self, period: Duration) {
        self.stop();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_flag = Arc::clone(&stop_flag);
        let sender = self.sender.clone();
        std::thread::spawn(move || {
            loop {
                std::thread::sleep(period);
                if thread_flag.load(Ordering::Acquire) || sender.send(Tick).is_err() {
                    break;
                }
            }
        });
        self.stop_flag = Some(stop_flag);
    }

    fn stop(&mut self) {
        if let Some(flag) = self.stop_flag.take() {
            flag.store(true, Ordering::Release);
        }
    }

    fn is_active(&self) -> bool {
        self.stop_flag.is_some()
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct PomodoroTimer<S: TickSource> {
    state: TimerState,
    resumable: bool,
    durations: TimerDurations,
    ticker: S,
    store: PersistentStore,
    notifier: Rc<dyn Notifier>,
    total_pomodoros: u64,
    study_hours: StudyHours,
    weekday: fn() -> usize,
}

impl<S: TickSource> PomodoroTimer<S> {
    pub fn new(
        ticker: S,
        store: PersistentStore,
        notifier: Rc<dyn Notifier>,
        durations: TimerDurations,
    ) -> Self {
        let total_pomodoros = store.load(StoreKey::PomodoroCounter, 0);
        let study_hours = store.load(StoreKey::StudyHours, StudyHours::default());
        let focus = durations.duration_for(TimerMode::Focus);
        Self {
            state: TimerState {
                mode: TimerMode::Focus,
                remaining_seconds: focus,
                total_seconds: focus,
                running: false,
                sessions_completed_in_cycle: 0,
            },
            resumable: false,
            durations,
            ticker,
            store,
            notifier,
            total_pomodoros,
            study_hours,
            weekday: local_weekday_index,
        }
    }

    /// Replaces the source of "today" used when crediting study hours.
    pub fn with_weekday(mut self, weekday: fn() -> usize) -> Self {
        self.weekday = weekday;
        self
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn mode(&self) -> TimerMode {
        self.state.mode
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.state.remaining_seconds
    }

    pub fn sessions_completed(&self) -> u8 {
        self.state.sessions_completed_in_cycle
    }

    pub fn total_pomodoros(&self) -> u64 {
        self.total_pomodoros
    }

    pub fn study_hours(&self) -> &StudyHours {
        &self.study_hours
    }

    pub fn durations(&self) -> TimerDurations {
        self.durations
    }

    pub fn tick_source(&self) -> &S {
        &self.ticker
    }

    /// Switches mode and rewinds the countdown. Refused while running.
    pub fn set_mode(&mut self, mode: TimerMode) -> bool {
        if self.state.running {
            debug!(requested = %mode, "mode change refused while running");
            return false;
        }
        let seconds = self.durations.duration_for(mode);
        self.state.mode = mode;
        self.state.remaining_seconds = seconds;
        self.state.total_seconds = seconds;
        self.resumable = false;
        debug!(mode = %mode, seconds, "mode set");
        true
    }

    /// Starts or pauses the countdown; returns whether it is now running.
    pub fn toggle(&mut self) -> bool {
        if self.state.running {
            self.ticker.stop();
            self.state.running = false;
            self.resumable = true;
            debug!(remaining = self.state.remaining_seconds, "paused");
        } else {
            self.ticker.stop();
            self.ticker.start(TICK_PERIOD);
            self.state.running = true;
            debug!(remaining = self.state.remaining_seconds, "started");
        }
        self.state.running
    }

    pub fn tick(&mut self) -> Option<Completion> {
        if !self.state.running || self.state.remaining_seconds == 0 {
            return None;
        }
        self.state.remaining_seconds -= 1;
        if self.state.remaining_seconds > 0 {
            return None;
        }

        self.ticker.stop();
        self.state.running = false;
        Some(self.complete())
    }

    pub fn reset(&mut self) {
        self.ticker.stop();
        self.state.running = false;
        self.resumable = false;
        let seconds = self.durations.duration_for(self.state.mode);
        self.state.remaining_seconds = seconds;
        self.state.total_seconds = seconds;
    }

    fn complete(&mut self) -> Completion {
        let finished = self.state.mode;
        if finished == TimerMode::Focus {
            self.state.sessions_completed_in_cycle =
                (self.state.sessions_completed_in_cycle + 1).min(CYCLE_LENGTH);
            self.total_pomodoros += 1;
            self.store
                .save(StoreKey::PomodoroCounter, &self.total_pomodoros);

            let weekday = (self.weekday)();
            self.study_hours.credit(weekday, FOCUS_CREDIT_HOURS);
            self.store.save(StoreKey::StudyHours, &self.study_hours);

            info!(
                total = self.total_pomodoros,
                in_cycle = self.state.sessions_completed_in_cycle,
                "focus session complete"
            );
            notify::deliver(self.notifier.as_ref(), &Notice::FocusComplete);
            self.set_mode(TimerMode::ShortBreak);

            Completion::Focus {
                sessions_in_cycle: self.state.sessions_completed_in_cycle,
                total_pomodoros: self.total_pomodoros,
                weekday,
            }
        } else {
            info!(mode = %finished, "break over");
            notify::deliver(self.notifier.as_ref(), &Notice::BreakOver);
            self.set_mode(TimerMode::Focus);
            Completion::Break { mode: finished }
        }
    }

    /// Elapsed fraction of the current interval, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.state.total_seconds == 0 {
            return 1.0;
        }
        1.0 - f64::from(self.state.remaining_seconds) / f64::from(self.state.total_seconds)
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        let remaining = self.state.remaining_seconds;
        format!("{:02}:{:02}", remaining / 60, remaining % 60)
    }

    pub fn session_label(&self) -> String {
        match self.state.mode {
            TimerMode::Focus => format!(
                "Session {} of {}",
                (self.state.sessions_completed_in_cycle + 1).min(CYCLE_LENGTH),
                CYCLE_LENGTH
            ),
            mode => mode.label().to_string(),
        }
    }

    pub fn control_label(&self) -> &'static str {
        if self.state.running {
            "Pause"
        } else if self.resumable {
            "Resume"
        } else {
            "Start"
        }
    }

    pub fn session_dots(&self) -> [bool; CYCLE_LENGTH as usize] {
        let mut dots = [false; CYCLE_LENGTH as usize];
        for dot in dots
            .iter_mut()
            .take(usize::from(self.state.sessions_completed_in_cycle))
        {
            *dot = true;
        }
        dots
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CYCLE_LENGTH, Completion, ManualTicker, PomodoroTimer, ThreadTicker, TickSource,
        TimerDurations, TimerMode,
    };
    use crate::notify::Notice;
    use crate::notify::testing::RecordingNotifier;
    use crate::stats::StudyHours;
    use crate::storage::{MemoryStore, PersistentStore, StoreKey};
    use proptest::prelude::*;
    use std::rc::Rc;
    use std::time::Duration;

    fn wednesday() -> usize {
        2
    }

    fn timer_with(
        store: PersistentStore,
        durations: TimerDurations,
    ) -> (PomodoroTimer<ManualTicker>, Rc<RecordingNotifier>) {
        let notifier = Rc::new(RecordingNotifier::default());
        let timer = PomodoroTimer::new(ManualTicker::default(), store, notifier.clone(), durations)
            .with_weekday(wednesday);
        (timer, notifier)
    }

    fn short_durations() -> TimerDurations {
        TimerDurations {
            focus: 3,
            short_break: 2,
            long_break: 4,
        }
    }

    #[test]
    fn starts_in_focus_with_full_duration() {
        let (timer, _) = timer_with(PersistentStore::in_memory(), TimerDurations::default());
        let state = timer.state();

        assert_eq!(state.mode, TimerMode::Focus);
        assert_eq!(state.remaining_seconds, 1500);
        assert_eq!(state.total_seconds, 1500);
        assert!(!state.running);
        assert_eq!(timer.display(), "25:00");
        assert_eq!(timer.control_label(), "Start");
        assert_eq!(timer.progress(), 0.0);
    }

    #[test]
    fn full_focus_session_completes_exactly_once() {
        let backend = Rc::new(MemoryStore::default());
        let store = PersistentStore::new(backend.clone());
        let (mut timer, notifier) = timer_with(store.clone(), TimerDurations::default());
        let before = StudyHours::default();

        assert!(timer.set_mode(TimerMode::Focus));
        assert!(timer.toggle());

        let mut completions = Vec::new();
        for _ in 0..1500 {
            if let Some(completion) = timer.tick() {
                completions.push(completion);
            }
        }

        assert_eq!(
            completions,
            vec![Completion::Focus {
                sessions_in_cycle: 1,
                total_pomodoros: 1,
                weekday: 2,
            }]
        );
        assert_eq!(store.load(StoreKey::PomodoroCounter, 0u64), 1);

        let after: StudyHours = store.load(StoreKey::StudyHours, StudyHours::default());
        let changed: Vec<usize> = (0..7).filter(|day| after.0[*day] != before.0[*day]).collect();
        assert_eq!(changed, vec![2]);
        assert_eq!(after.0[2], before.0[2] + 0.5);

        assert_eq!(timer.mode(), TimerMode::ShortBreak);
        assert_eq!(timer.remaining_seconds(), 300);
        assert_eq!(timer.sessions_completed(), 1);
        assert!(!timer.is_running());
        assert!(!timer.tick_source().is_active());
        assert_eq!(notifier.notices(), vec![Notice::FocusComplete]);
    }

    #[test]
    fn break_completion_returns_to_focus() {
        let (mut timer, notifier) = timer_with(PersistentStore::in_memory(), short_durations());
        timer.set_mode(TimerMode::LongBreak);
        timer.toggle();

        let results: Vec<_> = (0..4).map(|_| timer.tick()).collect();

        assert_eq!(results[3], Some(Completion::Break { mode: TimerMode::LongBreak }));
        assert!(results[..3].iter().all(Option::is_none));
        assert_eq!(timer.mode(), TimerMode::Focus);
        assert_eq!(timer.remaining_seconds(), 3);
        assert_eq!(timer.sessions_completed(), 0);
        assert_eq!(timer.total_pomodoros(), 0);
        assert_eq!(notifier.notices(), vec![Notice::BreakOver]);
    }

    #[test]
    fn set_mode_is_refused_while_running() {
        let (mut timer, _) = timer_with(PersistentStore::in_memory(), TimerDurations::default());
        timer.toggle();
        timer.tick();
        let before = timer.state();

        assert!(!timer.set_mode(TimerMode::LongBreak));
        assert_eq!(timer.state(), before);
    }

    #[test]
    fn toggle_pauses_without_resetting() {
        let (mut timer, _) = timer_with(PersistentStore::in_memory(), TimerDurations::default());
        timer.toggle();
        timer.tick();
        timer.tick();

        assert!(!timer.toggle());
        assert_eq!(timer.remaining_seconds(), 1498);
        assert_eq!(timer.control_label(), "Resume");
        assert!(!timer.tick_source().is_active());

        assert!(timer.toggle());
        assert_eq!(timer.control_label(), "Pause");
        assert_eq!(timer.tick_source().starts(), 2);
    }

    #[test]
    fn late_tick_after_pause_is_ignored() {
        let (mut timer, notifier) = timer_with(PersistentStore::in_memory(), short_durations());
        timer.toggle();
        timer.tick();
        timer.toggle();

        assert_eq!(timer.tick(), None);
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining_seconds(), 2);
        assert_eq!(timer.total_pomodoros(), 0);
        assert!(notifier.notices().is_empty());
    }

    #[test]
    fn reset_restores_duration_and_keeps_mode_and_sessions() {
        let (mut timer, _) = timer_with(PersistentStore::in_memory(), short_durations());
        timer.toggle();
        for _ in 0..3 {
            timer.tick();
        }
        timer.toggle();
        timer.tick();

        timer.reset();

        assert_eq!(timer.mode(), TimerMode::ShortBreak);
        assert_eq!(timer.remaining_seconds(), 2);
        assert_eq!(timer.sessions_completed(), 1);
        assert!(!timer.is_running());
        assert!(!timer.tick_source().is_active());
        assert_eq!(timer.control_label(), "Start");
    }

    #[test]
    fn set_mode_clears_resume_state() {
        let (mut timer, _) = timer_with(PersistentStore::in_memory(), TimerDurations::default());
        timer.toggle();
        timer.tick();
        timer.toggle();

        assert!(timer.set_mode(TimerMode::ShortBreak));
        assert_eq!(timer.control_label(), "Start");
        assert_eq!(timer.display(), "05:00");
        assert_eq!(timer.session_label(), "Short Break");
    }

    #[test]
    fn starting_stops_the_previous_source_first() {
        let (mut timer, _) = timer_with(PersistentStore::in_memory(), TimerDurations::default());
        timer.toggle();
        timer.toggle();
        timer.toggle();

        let ticker = timer.tick_source();
        assert_eq!(ticker.starts(), 2);
        assert_eq!(ticker.stops(), 1);
        assert!(ticker.is_active());
    }

    #[test]
    fn progress_and_display_follow_the_countdown() {
        let (mut timer, _) = timer_with(PersistentStore::in_memory(), TimerDurations::default());
        timer.toggle();
        for _ in 0..375 {
            timer.tick();
        }

        assert_eq!(timer.progress(), 0.25);
        assert_eq!(timer.display(), "18:45");
    }

    #[test]
    fn counter_continues_from_stored_value() {
        let store = PersistentStore::in_memory();
        store.save(StoreKey::PomodoroCounter, &41u64);
        let (mut timer, _) = timer_with(store.clone(), short_durations());

        timer.toggle();
        for _ in 0..3 {
            timer.tick();
        }

        assert_eq!(timer.total_pomodoros(), 42);
        assert_eq!(store.load(StoreKey::PomodoroCounter, 0u64), 42);
    }

    #[test]
    fn unavailable_store_still_counts_in_memory() {
        let backend = Rc::new(MemoryStore::default());
        backend.set_unavailable(true);
        let (mut timer, notifier) =
            timer_with(PersistentStore::new(backend), short_durations());

        timer.toggle();
        for _ in 0..3 {
            timer.tick();
        }

        assert_eq!(timer.total_pomodoros(), 1);
        assert_eq!(timer.study_hours().0[2], 1.5);
        assert_eq!(notifier.notices(), vec![Notice::FocusComplete]);
    }

    #[test]
    fn session_label_and_dots_cap_at_cycle_length() {
        let (mut timer, _) = timer_with(
            PersistentStore::in_memory(),
            TimerDurations {
                focus: 1,
                short_break: 1,
                long_break: 1,
            },
        );
        assert_eq!(timer.session_label(), "Session 1 of 4");

        for _ in 0..6 {
            timer.set_mode(TimerMode::Focus);
            timer.toggle();
            timer.tick();
        }
        timer.set_mode(TimerMode::Focus);

        assert_eq!(timer.sessions_completed(), CYCLE_LENGTH);
        assert_eq!(timer.session_label(), "Session 4 of 4");
        assert_eq!(timer.session_dots(), [true; 4]);
        assert_eq!(timer.total_pomodoros(), 6);
    }

    #[test]
    fn mode_parses_common_spellings() {
        assert_eq!("focus".parse::<TimerMode>().unwrap(), TimerMode::Focus);
        assert_eq!("Short-Break".parse::<TimerMode>().unwrap(), TimerMode::ShortBreak);
        assert_eq!("long".parse::<TimerMode>().unwrap(), TimerMode::LongBreak);
        assert_eq!("nap".parse::<TimerMode>().unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn thread_ticker_delivers_until_stopped() {
        let (mut ticker, ticks) = ThreadTicker::new();
        ticker.start(Duration::from_millis(5));
        assert!(ticker.is_active());

        ticks.recv_timeout(Duration::from_secs(2)).unwrap();
        ticker.stop();
        assert!(!ticker.is_active());

        // Drain anything sent before the flag was observed.
        std::thread::sleep(Duration::from_millis(30));
        while ticks.try_recv().is_ok() {}
        assert!(ticks.recv_timeout(Duration::from_millis(50)).is_err());
    }

    proptest! {
        #[test]
        fn sessions_never_exceed_cycle_length(completions in 1usize..12) {
            let (mut timer, _) = timer_with(
                PersistentStore::in_memory(),
                TimerDurations { focus: 1, short_break: 1, long_break: 1 },
            );

            for _ in 0..completions {
                prop_assert!(timer.set_mode(TimerMode::Focus));
                timer.toggle();
                timer.tick();
                prop_assert!(timer.sessions_completed() <= CYCLE_LENGTH);
            }

            prop_assert_eq!(
                usize::from(timer.sessions_completed()),
                completions.min(usize::from(CYCLE_LENGTH))
            );
            prop_assert_eq!(timer.total_pomodoros(), completions as u64);
        }

        #[test]
        fn progress_stays_in_unit_range(ticks in 0u32..1600) {
            let (mut timer, _) = timer_with(PersistentStore::in_memory(), TimerDurations::default());
            timer.toggle();
            for _ in 0..ticks {
                if !timer.is_running() {
                    break;
                }
                timer.tick();
                let progress = timer.progress();
                prop_assert!((0.0..=1.0).contains(&progress));
                prop_assert!(timer.state().remaining_seconds <= timer.state().total_seconds);
            }
        }
    }
}

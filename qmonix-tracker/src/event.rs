//! Event variants and their lifecycle state machines
//!
//! There are two kinds of caller-facing handles:
//!
//! - [`Event`]: an instantaneous event, optionally carrying a volume. It moves
//!   from `Initial` to `Fired` exactly once.
//! - [`TimingEvent`]: an event whose volume is the time spent running across
//!   any number of pause/resume cycles. `Initial -> Started <-> Paused -> Fired`.
//!
//! Firing a handle produces an immutable [`EventRecord`], which is what
//! dispatchers buffer and serialize. Records are created once per fire and are
//! owned by exactly one buffer.

use crate::dispatcher::Dispatcher;
use crate::interval::TimeInterval;
use crate::message::WireEvent;
use crate::time::TimeSource;
use crate::types::{Result, Tag, Timestamp, TrackerError};
use std::fmt;
use std::sync::Arc;

/// Kind-specific payload of a fired event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Plain occurrence without a quantity
    Instant,
    /// Occurrence carrying a caller supplied quantity
    Volume { volume: u64 },
    /// Accumulated duration; the volume is derived from the closed intervals
    Timing { intervals: Vec<TimeInterval> },
}

/// A fired, read-only event ready for serialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    tag: Tag,
    when_arised: Timestamp,
    kind: EventKind,
}

impl EventRecord {
    pub(crate) fn new(tag: Tag, when_arised: Timestamp, kind: EventKind) -> Self {
        Self {
            tag,
            when_arised,
            kind,
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn when_arised(&self) -> Timestamp {
        self.when_arised
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Volume of the event, `None` for instantaneous events
    ///
    /// Timing volumes are summed from the interval log on every call.
    pub fn volume(&self) -> Result<Option<u64>> {
        match &self.kind {
            EventKind::Instant => Ok(None),
            EventKind::Volume { volume } => Ok(Some(*volume)),
            EventKind::Timing { intervals } => total_duration(intervals).map(Some),
        }
    }

    /// Convert to the wire representation
    pub fn to_wire(&self) -> Result<WireEvent> {
        let volume = self
            .volume()
            .map_err(|e| TrackerError::EncodingError(format!("event '{}': {}", self.tag, e)))?;
        Ok(WireEvent {
            tag: self.tag.to_string(),
            when_arised: self.when_arised,
            volume,
        })
    }
}

fn total_duration(intervals: &[TimeInterval]) -> Result<u64> {
    intervals.iter().map(TimeInterval::duration).sum()
}

fn checked_volume(volume: i64) -> Result<u64> {
    u64::try_from(volume).map_err(|_| {
        TrackerError::invalid_argument(format!(
            "event volume must be a non-negative integer, got {}",
            volume
        ))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventState {
    Initial,
    Fired { at: Timestamp },
}

/// Instantaneous event handle, with or without a volume
#[derive(Debug, Clone)]
pub struct Event {
    tag: Tag,
    volume: Option<u64>,
    state: EventState,
}

impl Event {
    /// Create an instantaneous event without a volume
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            volume: None,
            state: EventState::Initial,
        }
    }

    /// Create a volume event; negative volumes are rejected
    pub fn with_volume(tag: Tag, volume: i64) -> Result<Self> {
        let volume = checked_volume(volume)?;
        Ok(Self {
            tag,
            volume: Some(volume),
            state: EventState::Initial,
        })
    }

    /// Replace the volume of a not yet fired event
    pub fn set_volume(&mut self, volume: i64) -> Result<()> {
        let volume = checked_volume(volume)?;
        if self.is_fired() {
            return Err(TrackerError::illegal_state(
                "volume cannot be changed after the event was fired",
            ));
        }
        self.volume = Some(volume);
        Ok(())
    }

    /// Fire the event at `now` and submit it to `dispatcher`
    ///
    /// Fails with `IllegalState` on a second call; nothing is re-submitted.
    pub fn fire(&mut self, now: Timestamp, dispatcher: &dyn Dispatcher) -> Result<()> {
        if self.is_fired() {
            return Err(TrackerError::illegal_state(format!(
                "event '{}' cannot be fired more than once",
                self.tag
            )));
        }
        self.state = EventState::Fired { at: now };
        let record = self.record(now);
        dispatcher.submit(record);
        Ok(())
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn volume(&self) -> Option<u64> {
        self.volume
    }

    pub fn is_fired(&self) -> bool {
        matches!(self.state, EventState::Fired { .. })
    }

    /// Time the event was fired, if it has been
    pub fn time_arised(&self) -> Option<Timestamp> {
        match self.state {
            EventState::Initial => None,
            EventState::Fired { at } => Some(at),
        }
    }

    /// Wire form of a fired event
    pub fn to_wire(&self) -> Result<WireEvent> {
        match self.state {
            EventState::Initial => Err(TrackerError::illegal_state(format!(
                "event '{}' has not been fired yet",
                self.tag
            ))),
            EventState::Fired { at } => self.record(at).to_wire(),
        }
    }

    fn record(&self, at: Timestamp) -> EventRecord {
        let kind = match self.volume {
            Some(volume) => EventKind::Volume { volume },
            None => EventKind::Instant,
        };
        EventRecord::new(self.tag.clone(), at, kind)
    }
}

/// Lifecycle state of a timing event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingState {
    Initial,
    /// Running; `current` is the one open interval
    Started { current: TimeInterval },
    Paused,
    Fired,
}

/// Clock-free core of a timing event
///
/// Every transition takes the current time as an argument and either moves to
/// the next state or fails leaving state and interval log untouched. The log
/// only ever holds closed intervals and is append-only; the open interval is
/// carried by `TimingState::Started`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingMachine {
    state: TimingState,
    intervals: Vec<TimeInterval>,
}

impl Default for TimingMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingMachine {
    pub fn new() -> Self {
        Self {
            state: TimingState::Initial,
            intervals: Vec::new(),
        }
    }

    pub fn state(&self) -> TimingState {
        self.state
    }

    /// Closed intervals recorded so far, oldest first
    pub fn intervals(&self) -> &[TimeInterval] {
        &self.intervals
    }

    pub fn start(&mut self, now: Timestamp) -> Result<()> {
        match self.state {
            TimingState::Initial => {
                self.state = TimingState::Started {
                    current: TimeInterval::open(now),
                };
                Ok(())
            }
            other => Err(transition_error("start", other)),
        }
    }

    pub fn pause(&mut self, now: Timestamp) -> Result<()> {
        match self.state {
            TimingState::Started { current } => {
                self.close_running(current, now)?;
                self.state = TimingState::Paused;
                Ok(())
            }
            other => Err(transition_error("pause", other)),
        }
    }

    pub fn resume(&mut self, now: Timestamp) -> Result<()> {
        match self.state {
            TimingState::Paused => {
                self.state = TimingState::Started {
                    current: TimeInterval::open(now),
                };
                Ok(())
            }
            other => Err(transition_error("resume", other)),
        }
    }

    /// Terminal transition; closes the running interval when started
    pub fn finish(&mut self, now: Timestamp) -> Result<()> {
        match self.state {
            TimingState::Started { current } => {
                self.close_running(current, now)?;
                self.state = TimingState::Fired;
                Ok(())
            }
            TimingState::Paused => {
                self.state = TimingState::Fired;
                Ok(())
            }
            other => Err(transition_error("fire", other)),
        }
    }

    /// Start of the first interval, once there is one
    pub fn time_arised(&self) -> Option<Timestamp> {
        match (self.intervals.first(), self.state) {
            (Some(first), _) => Some(first.start()),
            (None, TimingState::Started { current }) => Some(current.start()),
            (None, _) => None,
        }
    }

    /// Sum of the closed interval durations
    pub fn volume(&self) -> Result<u64> {
        total_duration(&self.intervals)
    }

    /// Close a copy of the open interval so a failed close leaves it open
    fn close_running(&mut self, mut current: TimeInterval, now: Timestamp) -> Result<()> {
        current.close(now)?;
        self.intervals.push(current);
        Ok(())
    }
}

fn transition_error(action: &str, state: TimingState) -> TrackerError {
    let state = match state {
        TimingState::Initial => "initial",
        TimingState::Started { .. } => "started",
        TimingState::Paused => "paused",
        TimingState::Fired => "fired",
    };
    TrackerError::illegal_state(format!(
        "cannot {} a timing event in the {} state",
        action, state
    ))
}

/// Timing event handle returned by [`crate::Tracker::start_timing`]
///
/// Not meant to be driven from several threads at once; the owner serializes
/// calls. The event submits to the dispatcher it was created with, regardless
/// of later changes to the tracker.
pub struct TimingEvent {
    tag: Tag,
    machine: TimingMachine,
    clock: Arc<dyn TimeSource>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl TimingEvent {
    /// Create an unstarted timing event bound to `dispatcher`
    pub fn new(tag: Tag, clock: Arc<dyn TimeSource>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            tag,
            machine: TimingMachine::new(),
            clock,
            dispatcher,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.machine.start(self.clock.now())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.machine.pause(self.clock.now())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.machine.resume(self.clock.now())
    }

    /// Stop timing and submit the event to the bound dispatcher
    pub fn fire(&mut self) -> Result<()> {
        self.machine.finish(self.clock.now())?;
        let record = self.record()?;
        log::trace!(
            "Timing event '{}' fired after {} interval(s)",
            self.tag,
            self.machine.intervals().len()
        );
        self.dispatcher.submit(record);
        Ok(())
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn state(&self) -> TimingState {
        self.machine.state()
    }

    pub fn time_arised(&self) -> Option<Timestamp> {
        self.machine.time_arised()
    }

    pub fn intervals(&self) -> &[TimeInterval] {
        self.machine.intervals()
    }

    /// Time accumulated in closed intervals so far
    pub fn volume(&self) -> Result<u64> {
        self.machine.volume()
    }

    /// Wire form; fails before the event has been started
    pub fn to_wire(&self) -> Result<WireEvent> {
        let when_arised = self.time_arised().ok_or_else(|| {
            TrackerError::illegal_state(format!("timing event '{}' was never started", self.tag))
        })?;
        Ok(WireEvent {
            tag: self.tag.to_string(),
            when_arised,
            volume: Some(self.volume()?),
        })
    }

    fn record(&self) -> Result<EventRecord> {
        let when_arised = self.time_arised().ok_or_else(|| {
            TrackerError::illegal_state(format!("timing event '{}' has no intervals", self.tag))
        })?;
        let kind = EventKind::Timing {
            intervals: self.machine.intervals().to_vec(),
        };
        Ok(EventRecord::new(self.tag.clone(), when_arised, kind))
    }
}

impl fmt::Debug for TimingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimingEvent")
            .field("tag", &self.tag)
            .field("machine", &self.machine)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::LogDispatcher;
    use crate::time::ManualClock;

    fn tag(name: &str) -> Tag {
        Tag::new(name).unwrap()
    }

    #[test]
    fn test_event_fires_once() {
        let dispatcher = LogDispatcher::new();
        let mut event = Event::new(tag("app/open"));
        assert!(event.to_wire().is_err());

        event.fire(1_000, &dispatcher).unwrap();
        assert_eq!(event.time_arised(), Some(1_000));
        assert_eq!(dispatcher.pending(), 1);

        let err = event.fire(2_000, &dispatcher).unwrap_err();
        assert!(matches!(err, TrackerError::IllegalState(_)));
        assert_eq!(event.time_arised(), Some(1_000));
        assert_eq!(dispatcher.pending(), 1);
    }

    #[test]
    fn test_volume_validation() {
        assert!(matches!(
            Event::with_volume(tag("purchase"), -5),
            Err(TrackerError::InvalidArgument(_))
        ));

        let mut event = Event::with_volume(tag("purchase"), 3).unwrap();
        assert!(event.set_volume(-1).is_err());
        assert_eq!(event.volume(), Some(3));
        event.set_volume(7).unwrap();

        let dispatcher = LogDispatcher::new();
        event.fire(10, &dispatcher).unwrap();
        assert!(matches!(event.set_volume(9), Err(TrackerError::IllegalState(_))));

        let wire = event.to_wire().unwrap();
        assert_eq!(wire.volume, Some(7));
        assert_eq!(wire.when_arised, 10);
    }

    #[test]
    fn test_instant_event_has_no_volume_on_wire() {
        let dispatcher = LogDispatcher::new();
        let mut event = Event::new(tag("click"));
        event.fire(5, &dispatcher).unwrap();
        assert_eq!(event.to_wire().unwrap().volume, None);
    }

    #[test]
    fn test_machine_pause_resume_accounting() {
        let mut machine = TimingMachine::new();
        machine.start(100).unwrap();
        machine.pause(110).unwrap();
        machine.resume(150).unwrap();
        machine.pause(155).unwrap();
        machine.resume(200).unwrap();
        machine.finish(201).unwrap();

        assert_eq!(machine.state(), TimingState::Fired);
        assert_eq!(machine.intervals().len(), 3);
        assert_eq!(machine.volume().unwrap(), 10 + 5 + 1);
        assert_eq!(machine.time_arised(), Some(100));
    }

    #[test]
    fn test_machine_finish_from_paused_adds_nothing() {
        let mut machine = TimingMachine::new();
        machine.start(0).unwrap();
        machine.pause(4).unwrap();
        machine.finish(100).unwrap();
        assert_eq!(machine.intervals().len(), 1);
        assert_eq!(machine.volume().unwrap(), 4);
    }

    #[test]
    fn test_machine_rejects_invalid_transitions() {
        let mut machine = TimingMachine::new();
        assert!(machine.pause(1).is_err());
        assert!(machine.resume(1).is_err());
        assert!(machine.finish(1).is_err());
        assert_eq!(machine.time_arised(), None);

        machine.start(1).unwrap();
        assert!(machine.start(2).is_err());
        assert!(machine.resume(2).is_err());

        machine.pause(3).unwrap();
        assert!(machine.pause(4).is_err());

        machine.finish(5).unwrap();
        for result in [
            machine.start(6),
            machine.pause(6),
            machine.resume(6),
            machine.finish(6),
        ] {
            assert!(matches!(result, Err(TrackerError::IllegalState(_))));
        }
        assert_eq!(machine.volume().unwrap(), 2);
    }

    #[test]
    fn test_machine_failed_transition_keeps_state() {
        let mut machine = TimingMachine::new();
        machine.start(100).unwrap();
        // Clock went backwards
        assert!(matches!(
            machine.pause(90),
            Err(TrackerError::InvalidInterval { start: 100, stop: 90 })
        ));
        match machine.state() {
            TimingState::Started { current } => {
                assert!(current.is_open());
                assert_eq!(current.start(), 100);
            }
            other => panic!("expected started, got {:?}", other),
        }
        assert!(machine.intervals().is_empty());

        // A later, valid close still works
        machine.pause(120).unwrap();
        assert_eq!(machine.intervals(), &[TimeInterval::closed(100, 120).unwrap()]);
        assert!(machine.intervals().iter().all(|i| !i.is_open()));
    }

    #[test]
    fn test_timing_event_submits_to_bound_dispatcher() {
        let clock = ManualClock::new(1_000);
        let dispatcher = Arc::new(LogDispatcher::new());
        let mut event = TimingEvent::new(tag("checkout"), Arc::new(clock.clone()), dispatcher.clone());
        assert!(matches!(event.to_wire(), Err(TrackerError::IllegalState(_))));

        event.start().unwrap();
        clock.advance(30);
        event.fire().unwrap();

        assert_eq!(dispatcher.pending(), 1);
        let wire = event.to_wire().unwrap();
        assert_eq!(wire.when_arised, 1_000);
        assert_eq!(wire.volume, Some(30));

        assert!(event.fire().is_err());
        assert_eq!(dispatcher.pending(), 1);
    }
}

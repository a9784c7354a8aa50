//! Scripted tracker session
//!
//! Drives a [`Tracker`] through a list of steps and keeps a numbered activity
//! log of what happened, newest entry last.

use crate::config::Step;
use anyhow::{anyhow, Context, Result};
use qmonix_tracker::{DispatchHandler, Dispatcher, TimingEvent, Tracker};
use std::collections::HashMap;
use std::thread;
use std::time::Duration;

pub struct Session {
    tracker: Tracker,
    timings: HashMap<String, TimingEvent>,
    log: Vec<String>,
}

impl Session {
    pub fn new(tracker: Tracker) -> Self {
        let mut session = Self {
            tracker,
            timings: HashMap::new(),
            log: Vec::new(),
        };
        session.note("Sample started.");
        session
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Activity log entries, numbered from 1
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Tags of timing events that were started but not stopped yet
    pub fn running(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.timings.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn run(&mut self, steps: &[Step]) -> Result<()> {
        for step in steps {
            self.run_step(step)?;
        }
        Ok(())
    }

    pub fn run_step(&mut self, step: &Step) -> Result<()> {
        log::debug!("Running step {:?}", step);
        match step {
            Step::Fire { tag } => {
                self.tracker.fire(tag)?;
                self.note(format!("Single event fired: {}", tag));
            }
            Step::Volume { tag, volume } => {
                self.tracker.fire_volume(tag, *volume)?;
                self.note(format!("Volume event fired: {} ({})", tag, volume));
            }
            Step::Start { tag } => {
                if self.timings.contains_key(tag) {
                    return Err(anyhow!("Timing event already running: {}", tag));
                }
                let event = self.tracker.start_timing(tag)?;
                self.timings.insert(tag.clone(), event);
                self.note(format!("Timing event started: {}", tag));
            }
            Step::Pause { tag } => {
                self.timing(tag)?.pause()?;
                self.note(format!("Timing event was paused: {}", tag));
            }
            Step::Resume { tag } => {
                self.timing(tag)?.resume()?;
                self.note(format!("Timing event was resumed: {}", tag));
            }
            Step::Stop { tag } => {
                // Keep the handle until fire succeeds so a failed stop can be retried
                let event = self.timing(tag)?;
                event.fire()?;
                let volume = event.volume()?;
                self.timings.remove(tag);
                self.note(format!("Timing event was stopped: {} ({}s)", tag, volume));
            }
            Step::Dispatch => self.dispatch()?,
            Step::Clear => {
                let dispatcher = self.tracker.dispatcher()?;
                let dropped = dispatcher.pending();
                dispatcher.clear();
                self.note(format!("Dropped {} event(s) without sending.", dropped));
            }
            Step::Wait { seconds } => {
                thread::sleep(Duration::from_secs(*seconds));
                self.note(format!("Waited {}s.", seconds));
            }
        }
        Ok(())
    }

    fn dispatch(&mut self) -> Result<()> {
        self.note("Dispatching events...");
        let mut outcome = Outcome::default();
        self.tracker.dispatch(&mut outcome).context("Dispatch failed")?;

        match outcome.error {
            None => self.note("Events were successfully sent to the server."),
            Some(err) => self.note(format!("Failed to dispatch events: {}", err)),
        }
        Ok(())
    }

    fn timing(&mut self, tag: &str) -> Result<&mut TimingEvent> {
        self.timings
            .get_mut(tag)
            .ok_or_else(|| anyhow!("No running timing event: {}", tag))
    }

    fn note(&mut self, text: impl Into<String>) {
        let entry = format!("{}. {}", self.log.len() + 1, text.into());
        log::info!("{}", entry);
        self.log.push(entry);
    }
}

/// Dispatch outcome captured for the activity log
#[derive(Default)]
struct Outcome {
    error: Option<String>,
}

impl DispatchHandler for Outcome {
    fn on_success(&mut self) {
        self.error = None;
    }

    fn on_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }
}

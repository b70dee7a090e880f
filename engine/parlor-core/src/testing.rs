//! Fakes for the injected collaborators
//!
//! A [`Probe`] records everything the core says and schedules so tests can
//! assert on it after driving a lobby or a session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::id::{ChannelId, User};
use crate::services::{MemoryLedger, Scheduler, Services, TimerHandle, TimerToken, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTimer {
    pub channel: ChannelId,
    pub token: TimerToken,
    pub delay: Duration,
    pub cancelled: bool,
    pub fired: bool,
}

#[derive(Debug, Default)]
struct ProbeState {
    messages: Vec<(ChannelId, String)>,
    memberships: HashMap<String, Vec<ChannelId>>,
    timers: Vec<ScheduledTimer>,
}

/// Shared recorder behind the fake transport and scheduler.
#[derive(Debug, Default, Clone)]
pub struct Probe {
    state: Rc<RefCell<ProbeState>>,
}

impl Probe {
    pub fn transport(&self) -> RecordingTransport {
        RecordingTransport {
            probe: self.clone(),
        }
    }

    pub fn scheduler(&self) -> ManualScheduler {
        ManualScheduler {
            probe: self.clone(),
        }
    }

    /// Services backed by this probe and an empty in-memory ledger.
    pub fn services(&self) -> Services {
        Services::new(
            Box::new(self.transport()),
            Box::new(MemoryLedger::default()),
            Box::new(self.scheduler()),
        )
    }

    pub fn messages(&self, channel: &ChannelId) -> Vec<String> {
        self.state
            .borrow()
            .messages
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Whether any message to `channel` contains `needle`.
    pub fn said(&self, channel: &ChannelId, needle: &str) -> bool {
        self.state
            .borrow()
            .messages
            .iter()
            .any(|(c, text)| c == channel && text.contains(needle))
    }

    pub fn clear_messages(&self) {
        self.state.borrow_mut().messages.clear();
    }

    /// Put `user` in exactly these channels.
    pub fn set_channels(&self, user: &str, channels: &[&str]) {
        self.state.borrow_mut().memberships.insert(
            crate::id::to_id(user),
            channels.iter().map(ChannelId::new).collect(),
        );
    }

    pub fn timers(&self) -> Vec<ScheduledTimer> {
        self.state.borrow().timers.clone()
    }

    /// Timers neither cancelled nor fired.
    pub fn live_timers(&self) -> Vec<ScheduledTimer> {
        self.state
            .borrow()
            .timers
            .iter()
            .filter(|t| !t.cancelled && !t.fired)
            .cloned()
            .collect()
    }

    /// Mark the most recent live timer as fired and return it, so the test
    /// can hand its token back to the lobby.
    pub fn expire_latest(&self) -> Option<ScheduledTimer> {
        let mut state = self.state.borrow_mut();
        let timer = state
            .timers
            .iter_mut()
            .rev()
            .find(|t| !t.cancelled && !t.fired)?;
        timer.fired = true;
        Some(timer.clone())
    }
}

#[derive(Debug, Clone)]
pub struct RecordingTransport {
    probe: Probe,
}

impl Transport for RecordingTransport {
    fn say(&mut self, channel: &ChannelId, text: &str) {
        self.probe
            .state
            .borrow_mut()
            .messages
            .push((channel.clone(), text.to_string()));
    }

    fn channels_of(&self, user: &User) -> Vec<ChannelId> {
        self.probe
            .state
            .borrow()
            .memberships
            .get(&user.id())
            .cloned()
            .unwrap_or_default()
    }
}

/// Scheduler whose timers only fire when the test says so.
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    probe: Probe,
}

impl Scheduler for ManualScheduler {
    fn schedule(
        &mut self,
        channel: &ChannelId,
        token: TimerToken,
        delay: Duration,
    ) -> Box<dyn TimerHandle> {
        let mut state = self.probe.state.borrow_mut();
        state.timers.push(ScheduledTimer {
            channel: channel.clone(),
            token,
            delay,
            cancelled: false,
            fired: false,
        });
        Box::new(ManualTimer {
            probe: self.probe.clone(),
            index: state.timers.len() - 1,
        })
    }
}

#[derive(Debug)]
struct ManualTimer {
    probe: Probe,
    index: usize,
}

impl TimerHandle for ManualTimer {
    fn cancel(self: Box<Self>) {
        if let Some(timer) = self.probe.state.borrow_mut().timers.get_mut(self.index) {
            timer.cancelled = true;
        }
    }
}

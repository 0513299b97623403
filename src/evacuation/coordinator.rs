// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Evacuation coordinator - the trigger / acknowledge / resolve state machine

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::ReentrantMutex;
use tracing::{info, warn};

use super::observers::{Dispatch, ObserverList, SubscriptionId};
use super::{EvacuationEvent, EvacuationState, EvacuationStatistics};
use crate::prediction::RiskPrediction;

/// Minimum prediction confidence that may start an evacuation
pub const TRIGGER_CONFIDENCE: f64 = 0.70;

type TriggerHandler = dyn Fn() + Send + Sync;
type EventHandler = dyn Fn(&EvacuationEvent) + Send + Sync;

/// What a processed prediction did
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Auto evacuation is disabled
    Ignored,
    Triggered(EvacuationEvent),
    Resolved(EvacuationEvent),
    Unchanged,
}

/// A queued subscriber call, frozen at the transition that produced it
enum Notification {
    Triggered(Dispatch<TriggerHandler>),
    Event(Dispatch<EventHandler>, EvacuationEvent),
}

impl Notification {
    fn deliver(&self) {
        match self {
            Self::Triggered(handlers) => handlers.each(|handler| handler()),
            Self::Event(handlers, event) => handlers.each(|handler| handler(event)),
        }
    }
}

struct CoordinatorState {
    enabled: bool,
    history: Vec<EvacuationEvent>,
    /// Index into `history` of the non-resolved event
    current: Option<usize>,
    evacuation_subscribers: ObserverList<TriggerHandler>,
    event_subscribers: ObserverList<EventHandler>,
    pending: VecDeque<Notification>,
    /// Set while the outermost caller is draining `pending`
    delivering: bool,
}

impl CoordinatorState {
    fn current(&self) -> Option<&EvacuationEvent> {
        self.current.map(|idx| &self.history[idx])
    }

    fn queue_trigger(&mut self) {
        let handlers = self.evacuation_subscribers.snapshot();
        self.pending.push_back(Notification::Triggered(handlers));
    }

    fn queue_event(&mut self, event: &EvacuationEvent) {
        let handlers = self.event_subscribers.snapshot();
        self.pending.push_back(Notification::Event(handlers, event.clone()));
    }

    fn resolve(&mut self) -> Option<EvacuationEvent> {
        let idx = self.current.take()?;
        let event = &mut self.history[idx];
        event.state = EvacuationState::Resolved;
        event.resolved_at = Some(Utc::now());
        Some(event.clone())
    }
}

/// Owns the current evacuation and its history.
///
/// Every transition runs under one lock, so at most one event is ever
/// active. Transitions queue their notifications; the outermost call on the
/// (reentrant) lock delivers the queue in FIFO order once its own state
/// change is complete. A subscriber may call back into the coordinator:
/// its transition is queued behind the one being delivered, so every
/// subscriber sees events in transition order. A panicking subscriber is
/// logged and skipped in both subscriber lists.
pub struct EvacuationCoordinator {
    state: ReentrantMutex<RefCell<CoordinatorState>>,
}

impl Default for EvacuationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl EvacuationCoordinator {
    pub fn new() -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(CoordinatorState {
                enabled: true,
                history: Vec::new(),
                current: None,
                evacuation_subscribers: ObserverList::new("evacuation"),
                event_subscribers: ObserverList::new("evacuation-event"),
                pending: VecDeque::new(),
                delivering: false,
            })),
        }
    }

    /// Gate new triggers; an event already in progress is unaffected
    pub fn set_enabled(&self, enabled: bool) {
        let guard = self.state.lock();
        guard.borrow_mut().enabled = enabled;
        info!("Auto evacuation {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().borrow().enabled
    }

    /// Called with no arguments whenever a new evacuation is triggered
    pub fn on_evacuation_triggered<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let guard = self.state.lock();
        let id = guard.borrow_mut().evacuation_subscribers.subscribe(Arc::new(handler));
        id
    }

    /// Called with the event on every transition
    pub fn on_evacuation_event<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&EvacuationEvent) + Send + Sync + 'static,
    {
        let guard = self.state.lock();
        let id = guard.borrow_mut().event_subscribers.subscribe(Arc::new(handler));
        id
    }

    /// Remove a handler from whichever list holds it
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.evacuation_subscribers.unsubscribe(id) || state.event_subscribers.unsubscribe(id)
    }

    /// Feed one prediction through the trigger / auto-resolve rules
    pub fn process_prediction(&self, prediction: &RiskPrediction) -> Outcome {
        let guard = self.state.lock();

        let outcome = {
            let mut state = guard.borrow_mut();
            if !state.enabled {
                return Outcome::Ignored;
            }

            let active = state.current().is_some_and(|e| e.state.is_active());
            if prediction.is_high_risk && prediction.confidence >= TRIGGER_CONFIDENCE && !active {
                let event = EvacuationEvent::triggered(prediction.clone());
                state.history.push(event.clone());
                state.current = Some(state.history.len() - 1);

                warn!(
                    "AUTO EVACUATION TRIGGERED: {} (confidence {:.2}, factors: {})",
                    event.id,
                    prediction.confidence,
                    prediction.contributing_factors.join(", ")
                );

                state.queue_trigger();
                state.queue_event(&event);
                Outcome::Triggered(event)
            } else if state.current.is_some() && !prediction.is_high_risk {
                // Safe conditions end the evacuation even after acknowledgment
                match state.resolve() {
                    Some(event) => {
                        info!("Evacuation {} resolved - conditions safe", event.id);
                        state.queue_event(&event);
                        Outcome::Resolved(event)
                    }
                    None => return Outcome::Unchanged,
                }
            } else {
                return Outcome::Unchanged;
            }
        };

        deliver_pending(&guard);
        outcome
    }

    /// Operator acknowledgment of a triggered evacuation; no-op otherwise
    pub fn acknowledge(&self) -> Option<EvacuationEvent> {
        let guard = self.state.lock();

        let event = {
            let mut state = guard.borrow_mut();
            let idx = state.current?;
            let entry = &mut state.history[idx];
            if entry.state != EvacuationState::Triggered {
                return None;
            }
            entry.state = EvacuationState::Acknowledged;
            entry.acknowledged_at = Some(Utc::now());
            let event = entry.clone();
            info!("Evacuation {} acknowledged by operator", event.id);
            state.queue_event(&event);
            event
        };

        deliver_pending(&guard);
        Some(event)
    }

    /// End the current evacuation; no-op when none is active
    pub fn resolve(&self) -> Option<EvacuationEvent> {
        let guard = self.state.lock();

        let event = {
            let mut state = guard.borrow_mut();
            let event = state.resolve()?;
            info!("Evacuation {} resolved", event.id);
            state.queue_event(&event);
            event
        };

        deliver_pending(&guard);
        Some(event)
    }

    /// Snapshot of the non-resolved event, if any
    pub fn current(&self) -> Option<EvacuationEvent> {
        self.state.lock().borrow().current().cloned()
    }

    /// Snapshot of every event in trigger order
    pub fn history(&self) -> Vec<EvacuationEvent> {
        self.state.lock().borrow().history.clone()
    }

    /// Drop past events. An ongoing evacuation stays current and recorded.
    pub fn clear_history(&self) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let current = state.current().cloned();
        state.history.clear();
        state.current = None;
        if let Some(event) = current {
            state.history.push(event);
            state.current = Some(0);
        }
        info!("Evacuation history cleared");
    }

    pub fn statistics(&self) -> EvacuationStatistics {
        let guard = self.state.lock();
        let state = guard.borrow();

        let mut stats = EvacuationStatistics {
            total: state.history.len(),
            currently_evacuating: state.current.is_some(),
            ..EvacuationStatistics::default()
        };
        for event in &state.history {
            match event.state {
                EvacuationState::Triggered => stats.triggered += 1,
                EvacuationState::Acknowledged => stats.acknowledged += 1,
                EvacuationState::Resolved => stats.resolved += 1,
            }
        }
        stats
    }
}

/// Drain queued notifications unless an outer call on this thread is
/// already doing so. The state borrow is released around every delivery.
fn deliver_pending(state: &RefCell<CoordinatorState>) {
    {
        let mut state = state.borrow_mut();
        if state.delivering {
            return;
        }
        state.delivering = true;
    }

    loop {
        let next = state.borrow_mut().pending.pop_front();
        match next {
            Some(notification) => notification.deliver(),
            None => break,
        }
    }

    state.borrow_mut().delivering = false;
}

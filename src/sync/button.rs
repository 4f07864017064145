//! Button event bridge
//!
//! The GPIO edge interrupt feeds raw levels into a [`ButtonClassifier`],
//! which turns each transition into one [`ButtonEventKind`] and pushes it
//! onto that button's single-producer/single-consumer queue without
//! blocking. The presentation task owns the matching [`ButtonEvents`] and
//! drains every queue once per cycle, so handlers always run in task context
//! and per-button order is the order the edges happened.
//!
//! A full queue drops the new event and bumps a counter; an interrupt never
//! waits on the consumer.
//!
//! The classifier is registered once, at startup, in a [`ButtonRegistry`]
//! that lives in a `static` next to the bridge. The GPIO interrupt reaches it
//! through [`ButtonRegistry::on_gpio_edge`]:
//!
//! ```ignore
//! static SHARED: Shared = Shared::new();
//!
//! let bridge = cortex_m::singleton!(: ButtonBridge = ButtonBridge::new()).unwrap();
//! let (classifier, events) = bridge.split();
//! SHARED.buttons.register(classifier)?;
//!
//! #[interrupt]
//! fn EXTI0() {
//!     SHARED.buttons.on_gpio_edge(buttons::PLAY_PAUSE, read_level());
//! }
//! ```

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::spsc::{Consumer, Producer, Queue};
use heapless::Vec;

use crate::config::{CFG_BUTTON_COUNT, CFG_BUTTON_QUEUE_DEPTH, CFG_LONG_PRESS_TICKS};
use crate::error::{OsError, OsResult};
use crate::types::{ButtonEvent, ButtonEventKind, ButtonId, Level, Tick};

type EventQueue = Queue<ButtonEventKind, CFG_BUTTON_QUEUE_DEPTH>;

/// Backing storage for the per-button queues
pub struct ButtonBridge {
    queues: [EventQueue; CFG_BUTTON_COUNT],
}

impl ButtonBridge {
    pub const fn new() -> Self {
        Self {
            queues: [const { Queue::new() }; CFG_BUTTON_COUNT],
        }
    }

    /// Split into the interrupt-side classifier and the task-side receiver.
    ///
    /// Borrowing the bridge mutably for the lifetime of both halves makes the
    /// classifier the only producer there will ever be.
    pub fn split(&mut self) -> (ButtonClassifier<'_>, ButtonEvents<'_>) {
        let mut producers = Vec::new();
        let mut consumers = Vec::new();
        for queue in self.queues.iter_mut() {
            let (tx, rx) = queue.split();
            // One entry per button; both vecs hold exactly CFG_BUTTON_COUNT.
            let _ = producers.push(tx);
            let _ = consumers.push(rx);
        }

        (
            ButtonClassifier {
                producers,
                pressed_at: [None; CFG_BUTTON_COUNT],
                long_press: [CFG_LONG_PRESS_TICKS; CFG_BUTTON_COUNT],
                dropped: 0,
            },
            ButtonEvents { consumers },
        )
    }
}

impl Default for ButtonBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side half: classifies edges and enqueues events
pub struct ButtonClassifier<'a> {
    producers: Vec<Producer<'a, ButtonEventKind, CFG_BUTTON_QUEUE_DEPTH>, CFG_BUTTON_COUNT>,
    pressed_at: [Option<Tick>; CFG_BUTTON_COUNT],
    long_press: [Tick; CFG_BUTTON_COUNT],
    dropped: u32,
}

impl ButtonClassifier<'_> {
    /// Hold time from which a release counts as a long press
    pub fn set_long_press_threshold(&mut self, id: ButtonId, ticks: Tick) {
        if let Some(slot) = self.long_press.get_mut(id as usize) {
            *slot = ticks;
        }
    }

    pub fn long_press_threshold(&self, id: ButtonId) -> Option<Tick> {
        self.long_press.get(id as usize).copied()
    }

    /// Classify one raw edge.
    ///
    /// A press yields `Pressed`. A release yields `LongPress` when the button
    /// was held for at least its threshold, `Released` otherwise. An edge that
    /// does not change the level (bounce, missed edge) yields nothing, as does
    /// an unknown button id.
    pub fn on_edge(&mut self, id: ButtonId, level: Level, now: Tick) -> Option<ButtonEventKind> {
        let idx = id as usize;
        if idx >= CFG_BUTTON_COUNT {
            crate::warn!("edge on unknown button {}", id);
            return None;
        }

        let kind = match (level, self.pressed_at[idx]) {
            (Level::Down, None) => {
                self.pressed_at[idx] = Some(now);
                ButtonEventKind::Pressed
            }
            (Level::Up, Some(since)) => {
                self.pressed_at[idx] = None;
                if now.wrapping_sub(since) >= self.long_press[idx] {
                    ButtonEventKind::LongPress
                } else {
                    ButtonEventKind::Released
                }
            }
            _ => return None,
        };

        if self.producers[idx].enqueue(kind).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            crate::warn!("button {} queue full, {} dropped", id, kind);
        }
        Some(kind)
    }

    /// Events lost to full queues
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// The one classifier the GPIO interrupt feeds, behind a critical section
pub struct ButtonRegistry {
    classifier: Mutex<RefCell<Option<ButtonClassifier<'static>>>>,
}

impl ButtonRegistry {
    pub const fn new() -> Self {
        Self {
            classifier: Mutex::new(RefCell::new(None)),
        }
    }

    /// Install the classifier. Only the first registration is accepted.
    ///
    /// # Returns
    /// * `Err(OsError::ObjCreated)` - a classifier is already registered
    pub fn register(&self, classifier: ButtonClassifier<'static>) -> OsResult<()> {
        critical_section::with(|cs| {
            let mut slot = self.classifier.borrow_ref_mut(cs);
            if slot.is_some() {
                return Err(OsError::ObjCreated);
            }
            *slot = Some(classifier);
            Ok(())
        })
    }

    pub fn is_registered(&self) -> bool {
        critical_section::with(|cs| self.classifier.borrow_ref(cs).is_some())
    }

    /// Classify one edge at the current system tick. Call from the GPIO
    /// interrupt.
    pub fn on_gpio_edge(&self, id: ButtonId, level: Level) -> Option<ButtonEventKind> {
        self.on_edge(id, level, crate::time::ticks())
    }

    /// Classify one edge observed at `now`. Edges before registration are
    /// ignored.
    pub fn on_edge(&self, id: ButtonId, level: Level, now: Tick) -> Option<ButtonEventKind> {
        critical_section::with(|cs| {
            let mut slot = self.classifier.borrow_ref_mut(cs);
            match slot.as_mut() {
                Some(classifier) => classifier.on_edge(id, level, now),
                None => {
                    crate::warn!("edge on button {} before registration", id);
                    None
                }
            }
        })
    }

    /// Events lost to full queues
    pub fn dropped(&self) -> u32 {
        critical_section::with(|cs| {
            self.classifier
                .borrow_ref(cs)
                .as_ref()
                .map_or(0, ButtonClassifier::dropped)
        })
    }
}

impl Default for ButtonRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver of classified events, e.g. the user interface
pub trait ButtonHandler {
    fn on_press(&mut self, id: ButtonId);
    fn on_release(&mut self, id: ButtonId);
    fn on_long_press(&mut self, id: ButtonId);
}

/// Route one event to the matching handler method
pub fn dispatch<H: ButtonHandler + ?Sized>(handler: &mut H, event: ButtonEvent) {
    match event.kind {
        ButtonEventKind::Pressed => handler.on_press(event.id),
        ButtonEventKind::Released => handler.on_release(event.id),
        ButtonEventKind::LongPress => handler.on_long_press(event.id),
    }
}

/// Task-side half: drained once per presentation cycle
pub struct ButtonEvents<'a> {
    consumers: Vec<Consumer<'a, ButtonEventKind, CFG_BUTTON_QUEUE_DEPTH>, CFG_BUTTON_COUNT>,
}

impl ButtonEvents<'_> {
    /// Deliver every queued event, one at a time, button by button.
    /// Returns how many were delivered.
    pub fn drain<H: ButtonHandler + ?Sized>(&mut self, handler: &mut H) -> usize {
        let mut delivered = 0;
        for (id, rx) in self.consumers.iter_mut().enumerate() {
            while let Some(kind) = rx.dequeue() {
                dispatch(handler, ButtonEvent { id: id as ButtonId, kind });
                delivered += 1;
            }
        }
        delivered
    }

    /// Events waiting across all buttons
    pub fn pending(&self) -> usize {
        self.consumers.iter().map(|rx| rx.len()).sum()
    }
}

//! Presentation task
//!
//! Optional. Owns the display and the receiving half of the button bridge.
//! Each cycle it first hands queued button events to the display, then
//! redraws. While load shedding is engaged it redraws every other cycle.

use crate::drivers::DisplayDevice;
use crate::health::LoadShed;
use crate::sync::button::{ButtonEvents, ButtonHandler};
use crate::task::{BringUp, TaskBody, TaskContext};
use crate::types::{ButtonEvent, ButtonEventKind, ButtonId, PeripheralState, Resource};

pub struct PresentationTask<'a, D: DisplayDevice> {
    device: D,
    buttons: Option<ButtonEvents<'a>>,
    shed: &'a LoadShed,
    state: PeripheralState,
    cycle: u32,
    skipped: u32,
}

impl<'a, D: DisplayDevice> PresentationTask<'a, D> {
    pub fn new(device: D, buttons: Option<ButtonEvents<'a>>, shed: &'a LoadShed) -> Self {
        Self {
            device,
            buttons,
            shed,
            state: PeripheralState::Absent,
            cycle: 0,
            skipped: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> PeripheralState {
        self.state
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Redraws skipped under load shedding
    pub fn skipped_redraws(&self) -> u32 {
        self.skipped
    }
}

impl<D: DisplayDevice> ButtonHandler for PresentationTask<'_, D> {
    fn on_press(&mut self, id: ButtonId) {
        self.device.on_button(ButtonEvent { id, kind: ButtonEventKind::Pressed });
    }

    fn on_release(&mut self, id: ButtonId) {
        self.device.on_button(ButtonEvent { id, kind: ButtonEventKind::Released });
    }

    fn on_long_press(&mut self, id: ButtonId) {
        self.device.on_button(ButtonEvent { id, kind: ButtonEventKind::LongPress });
    }
}

impl<D: DisplayDevice> TaskBody for PresentationTask<'_, D> {
    fn bring_up(&mut self, _ctx: &TaskContext) -> BringUp {
        match self.device.bring_up() {
            Ok(()) => {
                self.device.presentation_setup();
                self.state = PeripheralState::Ready;
                BringUp::Ready
            }
            Err(err) => {
                crate::debug!("display unavailable: {}", err);
                self.state = PeripheralState::Failed(err);
                BringUp::Failed(err)
            }
        }
    }

    fn service(&mut self, _ctx: &TaskContext) {
        if !self.state.is_ready() {
            return;
        }

        if let Some(mut buttons) = self.buttons.take() {
            buttons.drain(self);
            self.buttons = Some(buttons);
        }

        self.cycle = self.cycle.wrapping_add(1);
        if self.shed.is_engaged() && self.cycle % 2 == 0 {
            self.skipped = self.skipped.wrapping_add(1);
            return;
        }
        self.device.redraw_tick();
    }

    fn resource(&self) -> Option<Resource> {
        Some(Resource::Display)
    }
}

//! Audio task
//!
//! Tightest cadence in the system. Audio is best effort: a failed bring-up is
//! logged at debug level and never reaches the fault channel.

use crate::drivers::AudioDevice;
use crate::task::{BringUp, TaskBody, TaskContext};
use crate::types::{PeripheralState, Resource};

pub struct AudioTask<D: AudioDevice> {
    device: D,
    state: PeripheralState,
}

impl<D: AudioDevice> AudioTask<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            state: PeripheralState::Absent,
        }
    }

    #[inline]
    pub fn state(&self) -> PeripheralState {
        self.state
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: AudioDevice> TaskBody for AudioTask<D> {
    fn bring_up(&mut self, _ctx: &TaskContext) -> BringUp {
        match self.device.bring_up() {
            Ok(()) => {
                self.state = PeripheralState::Ready;
                BringUp::Ready
            }
            Err(err) => {
                crate::debug!("audio unavailable: {}", err);
                self.state = PeripheralState::Failed(err);
                BringUp::Failed(err)
            }
        }
    }

    fn service(&mut self, _ctx: &TaskContext) {
        if self.state.is_ready() {
            self.device.playback_tick();
        }
    }

    fn resource(&self) -> Option<Resource> {
        Some(Resource::Audio)
    }
}

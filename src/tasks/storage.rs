//! Storage task
//!
//! Brings up the card, then mounts the filesystem, strictly in that order.
//! Each step has its own fault code so the two failures can be told apart.

use crate::drivers::StorageDevice;
use crate::error::FaultCode;
use crate::fault::FaultChannel;
use crate::task::{BringUp, TaskBody, TaskContext};
use crate::types::{PeripheralState, Resource};

pub struct StorageTask<'a, D: StorageDevice> {
    device: D,
    faults: &'a FaultChannel,
    state: PeripheralState,
    /// Code this task last reported, cleared again if a retry succeeds
    reported: FaultCode,
}

impl<'a, D: StorageDevice> StorageTask<'a, D> {
    pub fn new(device: D, faults: &'a FaultChannel) -> Self {
        Self {
            device,
            faults,
            state: PeripheralState::Absent,
            reported: FaultCode::None,
        }
    }

    #[inline]
    pub fn state(&self) -> PeripheralState {
        self.state
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn fail(&mut self, code: FaultCode, err: crate::error::DeviceError) -> BringUp {
        self.state = PeripheralState::Failed(err);
        self.reported = code;
        self.faults.report(code);
        BringUp::Failed(err)
    }
}

impl<D: StorageDevice> TaskBody for StorageTask<'_, D> {
    fn bring_up(&mut self, _ctx: &TaskContext) -> BringUp {
        if let Err(err) = self.device.bring_up() {
            return self.fail(FaultCode::StorageInitFailed, err);
        }
        if let Err(err) = self.device.mount() {
            return self.fail(FaultCode::StorageMountFailed, err);
        }

        if self.reported.is_some() {
            self.faults.clear_if(self.reported);
            self.reported = FaultCode::None;
        }
        self.state = PeripheralState::Ready;
        BringUp::Ready
    }

    fn service(&mut self, _ctx: &TaskContext) {
        if self.state.is_ready() {
            self.device.service_tick();
        }
    }

    fn resource(&self) -> Option<Resource> {
        Some(Resource::Storage)
    }
}

//! Input facade
//!
//! Devices keep pending state written by the main thread and move it to
//! current state in [`InputDevices::update`], which only the game thread
//! calls once per poll.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

/// Platform virtual key or button code
pub type VirtualKey = u32;

pub trait InputDevices {
    /// Moves pending state to current state
    fn update(&mut self);

    fn pressing(&self, key: VirtualKey) -> bool;

    /// Presses since the previous update
    fn press_count(&self, key: VirtualKey) -> i32;

    fn analog_value(&self, key: VirtualKey) -> f32;
}

/// A device that never reports input
#[derive(Debug, Default, Clone, Copy)]
pub struct NullInput;

impl InputDevices for NullInput {
    fn update(&mut self) {}

    fn pressing(&self, _key: VirtualKey) -> bool {
        false
    }

    fn press_count(&self, _key: VirtualKey) -> i32 {
        0
    }

    fn analog_value(&self, _key: VirtualKey) -> f32 {
        0.0
    }
}

/// Several devices queried as one
#[derive(Default)]
pub struct CombinedInput {
    devices: SmallVec<[Box<dyn InputDevices + Send>; 4]>,
}

impl CombinedInput {
    pub fn new(devices: impl IntoIterator<Item = Box<dyn InputDevices + Send>>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
        }
    }

    pub fn add_device(&mut self, device: Box<dyn InputDevices + Send>) {
        self.devices.push(device);
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl InputDevices for CombinedInput {
    fn update(&mut self) {
        for device in &mut self.devices {
            device.update();
        }
    }

    fn pressing(&self, key: VirtualKey) -> bool {
        self.devices.iter().any(|device| device.pressing(key))
    }

    fn press_count(&self, key: VirtualKey) -> i32 {
        self.devices.iter().map(|device| device.press_count(key)).sum()
    }

    /// The value with the largest magnitude across devices
    fn analog_value(&self, key: VirtualKey) -> f32 {
        self.devices
            .iter()
            .map(|device| device.analog_value(key))
            .fold(0.0, |best, value| if value.abs() > best.abs() { value } else { best })
    }
}

/// Game-thread handle to the scheduler's combined input
#[derive(Clone, Default)]
pub struct InputHandle(Rc<RefCell<CombinedInput>>);

impl InputHandle {
    pub fn new(input: CombinedInput) -> Self {
        Self(Rc::new(RefCell::new(input)))
    }

    pub fn pressing(&self, key: VirtualKey) -> bool {
        self.0.borrow().pressing(key)
    }

    pub fn press_count(&self, key: VirtualKey) -> i32 {
        self.0.borrow().press_count(key)
    }

    pub fn analog_value(&self, key: VirtualKey) -> f32 {
        self.0.borrow().analog_value(key)
    }

    pub(crate) fn update(&self) {
        self.0.borrow_mut().update();
    }
}

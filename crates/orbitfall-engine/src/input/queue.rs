/// Analog axes the flight model reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Yaw,
    Pitch,
    Roll,
    Throttle,
    Brake,
}

impl Axis {
    /// Wire code used by the host bridge.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Axis::Yaw),
            1 => Some(Axis::Pitch),
            2 => Some(Axis::Roll),
            3 => Some(Axis::Throttle),
            4 => Some(Axis::Brake),
            _ => None,
        }
    }
}

/// Discrete context actions, delivered as "just pressed" edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    EnterExitVehicle,
    Interact,
    Cancel,
}

impl Action {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Action::EnterExitVehicle),
            1 => Some(Action::Interact),
            2 => Some(Action::Cancel),
            _ => None,
        }
    }
}

/// Input event types the engine understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// An axis moved. Values persist until the next event for the same axis.
    Axis { axis: Axis, value: f32 },
    /// A context action was pressed this frame.
    Pressed(Action),
}

/// A queue of input events.
/// The host writes events into the queue; the runner drains them each frame.
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events. Returns a Vec and clears the queue.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Held axis values, normalized. Brake is [0, 1], everything else [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightAxes {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub throttle: f32,
    pub brake: f32,
}

impl FlightAxes {
    pub fn set(&mut self, axis: Axis, value: f32) {
        let value = if value.is_finite() { value } else { 0.0 };
        match axis {
            Axis::Yaw => self.yaw = value.clamp(-1.0, 1.0),
            Axis::Pitch => self.pitch = value.clamp(-1.0, 1.0),
            Axis::Roll => self.roll = value.clamp(-1.0, 1.0),
            Axis::Throttle => self.throttle = value.clamp(-1.0, 1.0),
            Axis::Brake => self.brake = value.clamp(0.0, 1.0),
        }
    }

    pub fn with(mut self, axis: Axis, value: f32) -> Self {
        self.set(axis, value);
        self
    }

    /// True if any axis is deflected beyond `deadzone`.
    pub fn any_beyond(&self, deadzone: f32) -> bool {
        [self.yaw, self.pitch, self.roll, self.throttle, self.brake]
            .iter()
            .any(|v| v.abs() > deadzone)
    }
}

/// One tick's worth of input: held axes plus the edges pressed since the last tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    pub axes: FlightAxes,
    pressed: Vec<Action>,
}

impl FrameInput {
    pub fn new(axes: FlightAxes) -> Self {
        Self {
            axes,
            pressed: Vec::new(),
        }
    }

    pub fn with_pressed(mut self, action: Action) -> Self {
        if !self.pressed.contains(&action) {
            self.pressed.push(action);
        }
        self
    }

    /// Fold queued events into the held axes and collect this frame's edges.
    pub fn collect(held: &mut FlightAxes, events: impl IntoIterator<Item = InputEvent>) -> Self {
        let mut frame = FrameInput::default();
        for event in events {
            match event {
                InputEvent::Axis { axis, value } => held.set(axis, value),
                InputEvent::Pressed(action) => frame = frame.with_pressed(action),
            }
        }
        frame.axes = *held;
        frame
    }

    pub fn just_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    /// Movement or throttle input strong enough to cancel a scripted approach.
    pub fn override_active(&self, deadzone: f32) -> bool {
        self.axes.any_beyond(deadzone)
    }

    /// Same held axes, edges consumed. Used for extra fixed steps in one frame.
    pub fn without_edges(&self) -> Self {
        Self::new(self.axes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain() {
        let mut q = InputQueue::new();
        q.push(InputEvent::Axis { axis: Axis::Yaw, value: 0.5 });
        q.push(InputEvent::Pressed(Action::Interact));
        assert_eq!(q.len(), 2);
        let events = q.drain();
        assert_eq!(events.len(), 2);
        assert!(q.is_empty());
    }

    #[test]
    fn collect_holds_axes_and_edges() {
        let mut held = FlightAxes::default();
        let frame = FrameInput::collect(
            &mut held,
            vec![
                InputEvent::Axis { axis: Axis::Throttle, value: 3.0 },
                InputEvent::Pressed(Action::EnterExitVehicle),
                InputEvent::Pressed(Action::EnterExitVehicle),
            ],
        );
        assert_eq!(frame.axes.throttle, 1.0);
        assert!(frame.just_pressed(Action::EnterExitVehicle));
        assert!(!frame.just_pressed(Action::Interact));

        let next = FrameInput::collect(&mut held, Vec::new());
        assert_eq!(next.axes.throttle, 1.0, "axes persist between frames");
        assert!(!next.just_pressed(Action::EnterExitVehicle), "edges do not");
    }

    #[test]
    fn override_needs_deflection() {
        let still = FrameInput::new(FlightAxes::default().with(Axis::Yaw, 0.05));
        assert!(!still.override_active(0.15));
        let moving = FrameInput::new(FlightAxes::default().with(Axis::Brake, 0.6));
        assert!(moving.override_active(0.15));
    }

    #[test]
    fn codes_map_to_variants() {
        assert_eq!(Axis::from_code(3), Some(Axis::Throttle));
        assert_eq!(Action::from_code(1), Some(Action::Interact));
        assert_eq!(Action::from_code(9), None);
    }
}

/// Shared buffer layout.
/// Must stay in sync with the browser host's `protocol.ts`.
///
/// Layout (all values in f32 / 4 bytes):
/// ```text
/// [Header: 20 floats]
/// [Bodies: max_bodies × 8 floats]
/// [Events: max_events × 4 floats]
/// ```
///
/// Capacities are written once into the header at init.
/// The host reads them from the header to compute offsets dynamically.

use crate::api::config::EngineConfig;

/// Number of floats in the header section.
pub const HEADER_FLOATS: usize = 20;

/// Header field indices.
pub const HEADER_LOCK: usize = 0;
pub const HEADER_FRAME_COUNTER: usize = 1;
pub const HEADER_LOCOMOTION_STATE: usize = 2;
/// Player position x, y, z.
pub const HEADER_PLAYER_POS: usize = 3;
/// Player rotation quaternion x, y, z, w.
pub const HEADER_PLAYER_ROT: usize = 6;
pub const HEADER_FEEDBACK: usize = 10;
pub const HEADER_MAX_EVENTS: usize = 11;
pub const HEADER_EVENT_COUNT: usize = 12;
pub const HEADER_PROTOCOL_VERSION: usize = 13;
/// 1 while a scene load is in flight.
pub const HEADER_LOADING: usize = 14;
pub const HEADER_MAX_BODIES: usize = 15;
pub const HEADER_BODY_COUNT: usize = 16;
/// Entity id of the scene anchor, 0 when there is none.
pub const HEADER_ANCHOR_ID: usize = 17;
/// Number of fixed steps run during the last `session_tick`.
pub const HEADER_STEPS: usize = 18;
pub const HEADER_SUB_AREA_DEPTH: usize = 19;

/// Protocol version written into the header.
pub const PROTOCOL_VERSION: f32 = 1.0;

/// Floats per body: entity id, x, y, z, qx, qy, qz, qw. Fixed wire format.
pub const BODY_FLOATS: usize = 8;

/// Floats per game event: kind, a, b, c. Fixed wire format.
pub const EVENT_FLOATS: usize = 4;

/// Runtime-computed buffer layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolLayout {
    /// Maximum body poses per frame.
    pub max_bodies: usize,
    /// Maximum game events per frame.
    pub max_events: usize,

    /// Size of body data section in floats.
    pub body_data_floats: usize,
    /// Size of event data section in floats.
    pub event_data_floats: usize,

    /// Offset (in floats) where body data begins.
    pub body_data_offset: usize,
    /// Offset (in floats) where event data begins.
    pub event_data_offset: usize,

    /// Total buffer size in floats.
    pub buffer_total_floats: usize,
    /// Total buffer size in bytes.
    pub buffer_total_bytes: usize,
}

impl ProtocolLayout {
    /// Compute layout from raw capacity values.
    pub fn new(max_bodies: usize, max_events: usize) -> Self {
        let body_data_floats = max_bodies * BODY_FLOATS;
        let event_data_floats = max_events * EVENT_FLOATS;

        let body_data_offset = HEADER_FLOATS;
        let event_data_offset = body_data_offset + body_data_floats;

        let buffer_total_floats = event_data_offset + event_data_floats;
        let buffer_total_bytes = buffer_total_floats * 4;

        Self {
            max_bodies,
            max_events,
            body_data_floats,
            event_data_floats,
            body_data_offset,
            event_data_offset,
            buffer_total_floats,
            buffer_total_bytes,
        }
    }

    /// Compute layout from an EngineConfig.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_bodies, config.max_events)
    }

    /// Float offset of body slot `index`.
    pub fn body_offset(&self, index: usize) -> Option<usize> {
        (index < self.max_bodies).then(|| self.body_data_offset + index * BODY_FLOATS)
    }

    /// Float offset of event slot `index`.
    pub fn event_offset(&self, index: usize) -> Option<usize> {
        (index < self.max_events).then(|| self.event_data_offset + index * EVENT_FLOATS)
    }

    /// A zeroed buffer with the capacities and version already in the header.
    pub fn allocate(&self) -> Vec<f32> {
        let mut buffer = vec![0.0; self.buffer_total_floats];
        buffer[HEADER_MAX_BODIES] = self.max_bodies as f32;
        buffer[HEADER_MAX_EVENTS] = self.max_events as f32;
        buffer[HEADER_PROTOCOL_VERSION] = PROTOCOL_VERSION;
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_default_config_matches_expected_sizes() {
        let layout = ProtocolLayout::from_config(&EngineConfig::default());

        assert_eq!(layout.max_bodies, 128);
        assert_eq!(layout.max_events, 64);
        assert_eq!(layout.body_data_floats, 128 * 8);
        assert_eq!(layout.event_data_floats, 64 * 4);
        assert_eq!(layout.body_data_offset, 20);
        assert_eq!(layout.event_data_offset, 20 + 128 * 8);
        assert_eq!(layout.buffer_total_floats, 20 + 128 * 8 + 64 * 4);
        assert_eq!(layout.buffer_total_bytes, layout.buffer_total_floats * 4);
    }

    #[test]
    fn offsets_are_contiguous() {
        let layout = ProtocolLayout::new(10, 3);

        assert_eq!(layout.body_data_offset, HEADER_FLOATS);
        assert_eq!(layout.event_data_offset, layout.body_data_offset + layout.body_data_floats);
        assert_eq!(layout.buffer_total_floats, layout.event_data_offset + layout.event_data_floats);
        assert_eq!(layout.body_offset(9), Some(HEADER_FLOATS + 72));
        assert_eq!(layout.body_offset(10), None);
        assert_eq!(layout.event_offset(2), Some(layout.event_data_offset + 8));
        assert_eq!(layout.event_offset(3), None);
    }

    #[test]
    fn header_fields_fit_and_do_not_overlap() {
        let mut fields = vec![
            HEADER_LOCK,
            HEADER_FRAME_COUNTER,
            HEADER_LOCOMOTION_STATE,
            HEADER_FEEDBACK,
            HEADER_MAX_EVENTS,
            HEADER_EVENT_COUNT,
            HEADER_PROTOCOL_VERSION,
            HEADER_LOADING,
            HEADER_MAX_BODIES,
            HEADER_BODY_COUNT,
            HEADER_ANCHOR_ID,
            HEADER_STEPS,
            HEADER_SUB_AREA_DEPTH,
        ];
        fields.extend(HEADER_PLAYER_POS..HEADER_PLAYER_POS + 3);
        fields.extend(HEADER_PLAYER_ROT..HEADER_PLAYER_ROT + 4);
        let count = fields.len();
        fields.sort();
        fields.dedup();
        assert_eq!(fields.len(), count);
        assert_eq!(count, HEADER_FLOATS);
        assert!(fields.iter().all(|&f| f < HEADER_FLOATS));
    }

    #[test]
    fn allocate_writes_capacities() {
        let layout = ProtocolLayout::new(4, 2);
        let buffer = layout.allocate();
        assert_eq!(buffer.len(), layout.buffer_total_floats);
        assert_eq!(buffer[HEADER_MAX_BODIES], 4.0);
        assert_eq!(buffer[HEADER_MAX_EVENTS], 2.0);
        assert_eq!(buffer[HEADER_PROTOCOL_VERSION], PROTOCOL_VERSION);
    }
}

/// Flat frame buffer layout shared with the host renderer.
/// Must stay in sync with the TypeScript `protocol.ts` reader.
///
/// Layout (all values in f32 / 4 bytes):
/// ```text
/// [Header: 24 floats]
/// [Camera: 20 floats]
/// [Dice: max_dice × 16 floats]
/// [Labels: max_labels × 16 floats]
/// [Flair: max_dice × 12 floats]
/// [Rings: max_rings × 8 floats]
/// [Lights: max_lights × 8 floats]
/// [Sounds: max_sounds × 5 floats]
/// [Events: max_events × 4 floats]
/// ```
///
/// Capacities are written once into the header at init; the reader derives
/// offsets from them.

use crate::api::config::EngineConfig;
use crate::api::types::{RollEvent, SoundEvent};
use crate::renderer::camera::CameraUniform;
use crate::renderer::instance::{
    texture_slot, DieInstance, FlairInstance, LabelInstance, RenderFrame, RingInstance,
};
use crate::systems::lighting::PointLight;

/// Number of floats in the header section.
pub const HEADER_FLOATS: usize = 24;

/// Header field indices.
pub const HEADER_LOCK: usize = 0;
pub const HEADER_FRAME_COUNTER: usize = 1;
pub const HEADER_PROTOCOL_VERSION: usize = 2;
pub const HEADER_MAX_DICE: usize = 3;
pub const HEADER_DIE_COUNT: usize = 4;
pub const HEADER_MAX_LABELS: usize = 5;
pub const HEADER_LABEL_COUNT: usize = 6;
pub const HEADER_FLAIR_COUNT: usize = 7;
pub const HEADER_MAX_RINGS: usize = 8;
pub const HEADER_RING_COUNT: usize = 9;
pub const HEADER_MAX_LIGHTS: usize = 10;
pub const HEADER_LIGHT_COUNT: usize = 11;
pub const HEADER_MAX_SOUNDS: usize = 12;
pub const HEADER_SOUND_COUNT: usize = 13;
pub const HEADER_MAX_EVENTS: usize = 14;
pub const HEADER_EVENT_COUNT: usize = 15;
pub const HEADER_AMBIENT_R: usize = 16;
pub const HEADER_AMBIENT_G: usize = 17;
pub const HEADER_AMBIENT_B: usize = 18;
pub const HEADER_SHAKE: usize = 19;
/// Bloom field texture: id, `-1` flat, `-2` disabled.
pub const HEADER_BLOOM_FIELD: usize = 20;

/// Protocol version written into the header.
pub const PROTOCOL_VERSION: f32 = 1.0;

pub const LIGHT_FLOATS: usize = PointLight::FLOATS;
pub const SOUND_FLOATS: usize = SoundEvent::FLOATS;
pub const EVENT_FLOATS: usize = RollEvent::FLOATS;

/// Runtime-computed buffer layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolLayout {
    pub max_dice: usize,
    pub max_labels: usize,
    pub max_rings: usize,
    pub max_lights: usize,
    pub max_sounds: usize,
    pub max_events: usize,

    pub camera_offset: usize,
    pub dice_offset: usize,
    pub labels_offset: usize,
    pub flair_offset: usize,
    pub rings_offset: usize,
    pub lights_offset: usize,
    pub sounds_offset: usize,
    pub events_offset: usize,

    /// Total buffer size in floats.
    pub buffer_total_floats: usize,
    /// Total buffer size in bytes.
    pub buffer_total_bytes: usize,
}

impl ProtocolLayout {
    pub fn new(
        max_dice: usize,
        max_labels: usize,
        max_rings: usize,
        max_lights: usize,
        max_sounds: usize,
        max_events: usize,
    ) -> Self {
        let camera_offset = HEADER_FLOATS;
        let dice_offset = camera_offset + CameraUniform::FLOATS;
        let labels_offset = dice_offset + max_dice * DieInstance::FLOATS;
        let flair_offset = labels_offset + max_labels * LabelInstance::FLOATS;
        let rings_offset = flair_offset + max_dice * FlairInstance::FLOATS;
        let lights_offset = rings_offset + max_rings * RingInstance::FLOATS;
        let sounds_offset = lights_offset + max_lights * LIGHT_FLOATS;
        let events_offset = sounds_offset + max_sounds * SOUND_FLOATS;
        let buffer_total_floats = events_offset + max_events * EVENT_FLOATS;

        Self {
            max_dice,
            max_labels,
            max_rings,
            max_lights,
            max_sounds,
            max_events,
            camera_offset,
            dice_offset,
            labels_offset,
            flair_offset,
            rings_offset,
            lights_offset,
            sounds_offset,
            events_offset,
            buffer_total_floats,
            buffer_total_bytes: buffer_total_floats * 4,
        }
    }

    /// Compute layout from an EngineConfig.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.max_dice,
            config.max_labels(),
            config.impact.max_live,
            config.max_lights,
            config.max_sounds,
            config.event_capacity(),
        )
    }
}

/// Owned frame buffer the host reads through a raw pointer.
pub struct FrameBuffer {
    layout: ProtocolLayout,
    data: Vec<f32>,
    frame_counter: u32,
}

impl FrameBuffer {
    pub fn new(layout: ProtocolLayout) -> Self {
        let mut data = vec![0.0; layout.buffer_total_floats];
        data[HEADER_PROTOCOL_VERSION] = PROTOCOL_VERSION;
        data[HEADER_MAX_DICE] = layout.max_dice as f32;
        data[HEADER_MAX_LABELS] = layout.max_labels as f32;
        data[HEADER_MAX_RINGS] = layout.max_rings as f32;
        data[HEADER_MAX_LIGHTS] = layout.max_lights as f32;
        data[HEADER_MAX_SOUNDS] = layout.max_sounds as f32;
        data[HEADER_MAX_EVENTS] = layout.max_events as f32;
        data[HEADER_BLOOM_FIELD] = -2.0;
        Self {
            layout,
            data,
            frame_counter: 0,
        }
    }

    pub fn layout(&self) -> &ProtocolLayout {
        &self.layout
    }

    /// Serialize one frame. Sections are truncated to their capacities.
    pub fn write(&mut self, frame: &RenderFrame, sounds: &[SoundEvent], events: &[RollEvent]) {
        let l = &self.layout;
        let data = &mut self.data;
        data[HEADER_LOCK] = 1.0;

        write_pod(data, l.camera_offset, 1, std::slice::from_ref(&frame.camera));
        let dice = write_pod(data, l.dice_offset, l.max_dice, &frame.dice);
        let labels = write_pod(data, l.labels_offset, l.max_labels, &frame.labels);
        let flair = write_pod(data, l.flair_offset, l.max_dice, &frame.flair);
        let rings = write_pod(data, l.rings_offset, l.max_rings, &frame.rings);
        let lights = write_pod(data, l.lights_offset, l.max_lights, &frame.lights);

        let sound_count = sounds.len().min(l.max_sounds);
        for (i, sound) in sounds.iter().take(sound_count).enumerate() {
            let at = l.sounds_offset + i * SOUND_FLOATS;
            data[at..at + SOUND_FLOATS].copy_from_slice(&sound.to_wire());
        }
        let event_count = events.len().min(l.max_events);
        for (i, event) in events.iter().take(event_count).enumerate() {
            let at = l.events_offset + i * EVENT_FLOATS;
            data[at..at + EVENT_FLOATS].copy_from_slice(&event.to_wire());
        }
        if sounds.len() > sound_count || events.len() > event_count {
            log::warn!(
                "frame dropped {} sounds and {} events over capacity",
                sounds.len() - sound_count,
                events.len() - event_count
            );
        }

        data[HEADER_DIE_COUNT] = dice as f32;
        data[HEADER_LABEL_COUNT] = labels as f32;
        data[HEADER_FLAIR_COUNT] = flair as f32;
        data[HEADER_RING_COUNT] = rings as f32;
        data[HEADER_LIGHT_COUNT] = lights as f32;
        data[HEADER_SOUND_COUNT] = sound_count as f32;
        data[HEADER_EVENT_COUNT] = event_count as f32;
        data[HEADER_AMBIENT_R..=HEADER_AMBIENT_B].copy_from_slice(&frame.ambient);
        data[HEADER_SHAKE] = frame.shake;
        data[HEADER_BLOOM_FIELD] = frame.bloom_field.map_or(-2.0, |h| texture_slot(h).0);

        self.frame_counter = self.frame_counter.wrapping_add(1);
        data[HEADER_FRAME_COUNTER] = self.frame_counter as f32;
        data[HEADER_LOCK] = 0.0;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Raw pointer to the buffer for SharedArrayBuffer reads.
    pub fn as_ptr(&self) -> *const f32 {
        self.data.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Copy up to `capacity` records into `data` at `offset`; returns the count.
fn write_pod<T: bytemuck::Pod>(data: &mut [f32], offset: usize, capacity: usize, items: &[T]) -> usize {
    let count = items.len().min(capacity);
    let floats: &[f32] = bytemuck::cast_slice(&items[..count]);
    data[offset..offset + floats.len()].copy_from_slice(floats);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::SoundCue;
    use glam::{Quat, Vec3};

    #[test]
    fn default_config_layout() {
        let config = EngineConfig::default();
        let layout = ProtocolLayout::from_config(&config);
        assert_eq!(layout.max_dice, config.max_dice);
        assert_eq!(layout.max_labels, config.max_dice * 20);
        assert_eq!(layout.camera_offset, HEADER_FLOATS);
        assert_eq!(layout.dice_offset, HEADER_FLOATS + 20);
    }

    #[test]
    fn event_section_fits_every_completion() {
        let config = EngineConfig {
            max_dice: 40,
            max_events: 8,
            ..EngineConfig::default()
        };
        let layout = ProtocolLayout::from_config(&config);
        assert_eq!(layout.max_events, 80);

        let mut buf = FrameBuffer::new(layout);
        let events: Vec<RollEvent> = (0..40)
            .flat_map(|die| {
                [
                    RollEvent::Settled { die, epoch: 1, forced: false },
                    RollEvent::Completed { die, epoch: 1, value: 3 },
                ]
            })
            .collect();
        buf.write(&RenderFrame::new(), &[], &events);
        assert_eq!(buf.as_slice()[HEADER_EVENT_COUNT], 80.0);

        let small = EngineConfig {
            max_dice: 4,
            ..EngineConfig::default()
        };
        assert_eq!(ProtocolLayout::from_config(&small).max_events, 32);
    }

    #[test]
    fn custom_capacities_compute_correctly() {
        let layout = ProtocolLayout::new(4, 80, 6, 8, 16, 32);
        let expected_total = HEADER_FLOATS
            + 20
            + 4 * 16
            + 80 * 16
            + 4 * 12
            + 6 * 8
            + 8 * 8
            + 16 * 5
            + 32 * 4;
        assert_eq!(layout.buffer_total_floats, expected_total);
        assert_eq!(layout.buffer_total_bytes, expected_total * 4);
    }

    #[test]
    fn offsets_are_contiguous() {
        let l = ProtocolLayout::new(3, 20, 2, 5, 7, 9);
        assert_eq!(l.labels_offset, l.dice_offset + 3 * DieInstance::FLOATS);
        assert_eq!(l.flair_offset, l.labels_offset + 20 * LabelInstance::FLOATS);
        assert_eq!(l.rings_offset, l.flair_offset + 3 * FlairInstance::FLOATS);
        assert_eq!(l.lights_offset, l.rings_offset + 2 * RingInstance::FLOATS);
        assert_eq!(l.sounds_offset, l.lights_offset + 5 * LIGHT_FLOATS);
        assert_eq!(l.events_offset, l.sounds_offset + 7 * SOUND_FLOATS);
        assert_eq!(l.buffer_total_floats, l.events_offset + 9 * EVENT_FLOATS);
    }

    #[test]
    fn header_carries_capacities() {
        let buf = FrameBuffer::new(ProtocolLayout::new(2, 40, 6, 8, 16, 32));
        let data = buf.as_slice();
        assert_eq!(data[HEADER_PROTOCOL_VERSION], PROTOCOL_VERSION);
        assert_eq!(data[HEADER_MAX_DICE], 2.0);
        assert_eq!(data[HEADER_MAX_LABELS], 40.0);
        assert_eq!(data[HEADER_MAX_EVENTS], 32.0);
        assert_eq!(data[HEADER_BLOOM_FIELD], -2.0);
    }

    #[test]
    fn write_places_sections_and_truncates() {
        let layout = ProtocolLayout::new(2, 4, 1, 2, 1, 2);
        let mut buf = FrameBuffer::new(layout.clone());
        let mut frame = RenderFrame::new();
        for i in 0..3 {
            let mut die = DieInstance::default();
            die.set_pose(Vec3::new(i as f32, 0.5, 0.0), Quat::IDENTITY);
            die.sides = 20.0;
            frame.dice.push(die);
        }
        frame.ambient = [0.4, 0.4, 0.4];
        frame.shake = 0.25;
        let sounds = [
            SoundEvent::new(SoundCue::Roll, 0.8, Vec3::ZERO),
            SoundEvent::new(SoundCue::Impact, 0.5, Vec3::ONE),
        ];
        let events = [RollEvent::Completed { die: 1, epoch: 3, value: 17 }];
        buf.write(&frame, &sounds, &events);

        let data = buf.as_slice();
        assert_eq!(data[HEADER_LOCK], 0.0);
        assert_eq!(data[HEADER_FRAME_COUNTER], 1.0);
        assert_eq!(data[HEADER_DIE_COUNT], 2.0);
        assert_eq!(data[HEADER_SOUND_COUNT], 1.0);
        assert_eq!(data[HEADER_EVENT_COUNT], 1.0);
        assert_eq!(data[HEADER_SHAKE], 0.25);
        assert_eq!(data[layout.dice_offset + DieInstance::FLOATS], 1.0);
        assert_eq!(data[layout.dice_offset + 8], 20.0);
        assert_eq!(&data[layout.sounds_offset..layout.sounds_offset + 5], &sounds[0].to_wire());
        assert_eq!(&data[layout.events_offset..layout.events_offset + 4], &events[0].to_wire());
    }
}

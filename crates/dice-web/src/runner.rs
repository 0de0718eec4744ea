use dice_engine::{
    DeviceCapabilities, DiceScene, EngineConfig, EngineError, FrameBuffer, ProtocolLayout,
    QualityProfile, RenderFrame, RendererContext, RollRequest,
};

#[cfg(feature = "physics")]
pub type Physics = dice_engine::RapierWorld;
#[cfg(not(feature = "physics"))]
pub type Physics = dice_engine::HeadlessWorld;

#[cfg(feature = "physics")]
fn build_scene(config: EngineConfig, quality: QualityProfile) -> DiceScene<Physics> {
    DiceScene::with_rapier(config, quality)
}

#[cfg(not(feature = "physics"))]
fn build_scene(config: EngineConfig, quality: QualityProfile) -> DiceScene<Physics> {
    DiceScene::headless(config, quality)
}

/// Drives one dice scene and owns the flat buffer the host reads.
///
/// wasm-bindgen cannot export generic structs, so `lib.rs` keeps one runner in
/// a `thread_local!` and exposes free functions over it.
pub struct RollerRunner {
    scene: DiceScene<Physics>,
    ctx: RendererContext,
    frame: RenderFrame,
    buffer: FrameBuffer,
}

impl RollerRunner {
    pub fn new(config: EngineConfig, caps: &DeviceCapabilities) -> Self {
        let quality = QualityProfile::select(caps);
        let buffer = FrameBuffer::new(ProtocolLayout::from_config(&config));
        let mut ctx = RendererContext::new();
        ctx.models.preload();
        Self {
            scene: build_scene(config, quality),
            ctx,
            frame: RenderFrame::new(),
            buffer,
        }
    }

    /// Parse both JSON inputs; empty strings mean defaults.
    pub fn from_json(config_json: &str, caps_json: &str) -> Result<Self, EngineError> {
        let config = match config_json.trim() {
            "" => EngineConfig::default(),
            json => EngineConfig::from_json(json)?,
        };
        let caps = match caps_json.trim() {
            "" => DeviceCapabilities::default(),
            json => DeviceCapabilities::from_json(json)?,
        };
        Ok(Self::new(config, &caps))
    }

    /// Start a roll from a JSON request. Returns the roll epoch.
    pub fn roll(&mut self, request_json: &str) -> Result<u64, EngineError> {
        let request = RollRequest::from_json(request_json)?;
        self.scene.roll(&mut self.ctx, &request)
    }

    /// Start a two-die percentile roll for `result` in `1..=100`.
    pub fn roll_percentile(&mut self, result: u32) -> Result<u64, EngineError> {
        self.scene.roll(&mut self.ctx, &RollRequest::percentile(result))
    }

    /// Advance the scene and rewrite the frame buffer.
    pub fn tick(&mut self, dt: f32) {
        self.scene.update(dt);
        self.scene.build_frame(&mut self.ctx, &mut self.frame);
        let sounds = self.scene.drain_sounds();
        let events = self.scene.drain_events();
        self.buffer.write(&self.frame, &sounds, &events);
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.scene.resize(width, height);
    }

    pub fn teardown(&mut self) {
        self.scene.teardown();
        self.frame.clear();
    }

    pub fn is_rolling(&self) -> bool {
        self.scene.is_rolling()
    }

    pub fn quality_tier(&self) -> &'static str {
        self.scene.quality().tier.as_str()
    }

    // ---- Buffer accessors ----

    pub fn buffer_ptr(&self) -> *const f32 {
        self.buffer.as_ptr()
    }

    pub fn buffer_len(&self) -> u32 {
        self.buffer.len() as u32
    }

    pub fn layout(&self) -> &ProtocolLayout {
        self.buffer.layout()
    }

    // ---- Asset accessors ----

    /// Triangle list (position + normal, 6 floats per vertex) for a side count.
    pub fn mesh(&mut self, sides: u32) -> Vec<f32> {
        self.ctx.models.get_or_build(sides).mesh().to_triangle_list()
    }

    pub fn texture_count(&self) -> u32 {
        self.ctx.textures.assets().len() as u32
    }

    /// `(width, height)` of a synthesized texture.
    pub fn texture_size(&self, id: u32) -> Option<(u32, u32)> {
        let asset = self.ctx.textures.get(dice_engine::TextureId(id))?;
        Some((asset.width(), asset.height()))
    }

    /// RGBA8 pixels of a synthesized texture.
    pub fn texture_pixels(&self, id: u32) -> Option<Vec<u8>> {
        let asset = self.ctx.textures.get(dice_engine::TextureId(id))?;
        Some(asset.pixels().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dice_engine::bridge::protocol::{HEADER_DIE_COUNT, HEADER_EVENT_COUNT, HEADER_FRAME_COUNTER};

    #[test]
    fn empty_json_uses_defaults() {
        let runner = RollerRunner::from_json("", "").unwrap();
        assert_eq!(runner.layout(), &ProtocolLayout::from_config(&EngineConfig::default()));
        assert!(!runner.is_rolling());
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(RollerRunner::from_json("{", "").is_err());
        let mut runner = RollerRunner::from_json("", "").unwrap();
        assert!(runner.roll("not json").is_err());
        assert!(runner.roll(r#"{"dice": []}"#).is_err());
    }

    #[test]
    fn reduced_motion_selects_low_tier() {
        let runner = RollerRunner::from_json("", r#"{"reducedMotion": true}"#).unwrap();
        assert_eq!(runner.quality_tier(), "low");
    }

    #[test]
    fn tick_writes_frames_until_completion() {
        let mut runner = RollerRunner::from_json(r#"{"seed": 7}"#, "").unwrap();
        let epoch = runner
            .roll(r#"{"dice": [{"sides": 20, "value": 12}, {"sides": 6, "value": 4}]}"#)
            .unwrap();
        assert_eq!(epoch, 1);

        let mut completions = 0;
        for _ in 0..900 {
            runner.tick(1.0 / 60.0);
            let data = runner.buffer.as_slice();
            assert_eq!(data[HEADER_DIE_COUNT], 2.0);
            let events = data[HEADER_EVENT_COUNT] as usize;
            let base = runner.layout().events_offset;
            for i in 0..events {
                if data[base + i * 4] == 2.0 {
                    completions += 1;
                }
            }
            if !runner.is_rolling() {
                break;
            }
        }
        assert_eq!(completions, 2);
        assert!(runner.buffer.as_slice()[HEADER_FRAME_COUNTER] > 0.0);
    }

    #[test]
    fn meshes_and_textures_are_exposed() {
        let mut runner = RollerRunner::from_json("", "").unwrap();
        assert_eq!(runner.mesh(20).len(), 20 * 3 * 6);
        runner.roll_percentile(42).unwrap();
        runner.tick(1.0 / 60.0);
        if cfg!(feature = "vectors") {
            assert!(runner.texture_count() > 0);
            let (w, h) = runner.texture_size(0).unwrap();
            assert_eq!(runner.texture_pixels(0).unwrap().len(), (w * h * 4) as usize);
        }
        assert!(runner.texture_size(10_000).is_none());
    }

    #[test]
    fn teardown_clears_bodies() {
        let mut runner = RollerRunner::from_json("", "").unwrap();
        runner.roll_percentile(100).unwrap();
        runner.tick(1.0 / 60.0);
        runner.teardown();
        runner.tick(1.0 / 60.0);
        assert_eq!(runner.buffer.as_slice()[HEADER_DIE_COUNT], 0.0);
    }
}

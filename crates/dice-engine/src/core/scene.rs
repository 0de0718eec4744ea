//! One roller scene: tray, dice, feedback and frame assembly.

use glam::{Quat, Vec3};

use crate::api::config::EngineConfig;
use crate::api::types::{face_label, DieKind, RollEvent, RollRequest, SoundEvent};
use crate::assets::context::RendererContext;
use crate::assets::texture::{LabelStyle, TextureHandle, TextureKey};
use crate::assets::theme::{DieFlair, ThemeConfig};
use crate::core::physics::{
    BodyHandle, ColliderMaterial, ContactEvent, HeadlessWorld, PhysicsService, TrayDesc,
};
use crate::error::EngineError;
use crate::renderer::camera::Camera3D;
use crate::renderer::instance::{
    texture_slot, DieInstance, FlairInstance, LabelInstance, RenderFrame, RingInstance,
};
use crate::systems::impact::ImpactPipeline;
use crate::systems::layout::{TrayLayout, LID_HEADROOM};
use crate::systems::lighting::{LightState, PointLight};
use crate::systems::orchestrator::{DieSlot, Highlight, RollOrchestrator};
use crate::systems::quality::QualityProfile;

/// Longest frame step the scene will simulate in one update.
const MAX_FRAME_DT: f32 = 0.1;
/// Decals float this far off their face.
const LABEL_LIFT: f32 = 0.05;
const SPARKLES_BASE: f32 = 20.0;
const HIGHLIGHT_SPARKLE_BOOST: f32 = 1.6;

/// Decal on one face of a die.
#[derive(Debug, Clone)]
struct FaceDecal {
    value: u32,
    text: String,
    texture: TextureHandle,
}

/// Resolved visuals for one die slot. Rebuilt on every roll.
#[derive(Debug, Clone)]
struct DieVisual {
    decals: Vec<FaceDecal>,
    label_size: f32,
    bloom: TextureHandle,
    sigil: TextureHandle,
    flair: DieFlair,
    ring_yaw: f32,
}

/// A dice roller driven by explicit `update(dt)` calls.
pub struct DiceScene<P: PhysicsService> {
    config: EngineConfig,
    quality: QualityProfile,
    theme: ThemeConfig,
    physics: P,
    orchestrator: RollOrchestrator,
    impact: ImpactPipeline,
    layout: Option<TrayLayout>,
    camera: Camera3D,
    lights: LightState,
    visuals: Vec<DieVisual>,
    contacts: Vec<ContactEvent>,
    events: Vec<RollEvent>,
    sounds: Vec<SoundEvent>,
    time: f32,
}

impl DiceScene<HeadlessWorld> {
    /// Scene backed by the solver-less physics service.
    pub fn headless(config: EngineConfig, quality: QualityProfile) -> Self {
        Self::new(config, quality, HeadlessWorld::new())
    }
}

#[cfg(feature = "physics")]
impl DiceScene<crate::core::physics::RapierWorld> {
    /// Scene backed by the rapier3d solver.
    pub fn with_rapier(config: EngineConfig, quality: QualityProfile) -> Self {
        let physics = crate::core::physics::RapierWorld::new(config.launch.gravity);
        Self::new(config, quality, physics)
    }
}

impl<P: PhysicsService> DiceScene<P> {
    pub fn new(config: EngineConfig, quality: QualityProfile, physics: P) -> Self {
        let theme = config.theme.config();
        let orchestrator =
            RollOrchestrator::new(config.settle.clone(), config.launch.clone(), config.seed);
        let impact =
            ImpactPipeline::new(config.impact.clone()).with_reduced_motion(quality.reduced_motion);
        let lights = LightState::themed(&theme, config.max_lights);
        Self {
            quality,
            theme,
            physics,
            orchestrator,
            impact,
            layout: None,
            camera: Camera3D::new(1.0),
            lights,
            visuals: Vec::new(),
            contacts: Vec::new(),
            events: Vec::new(),
            sounds: Vec::new(),
            time: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn quality(&self) -> &QualityProfile {
        &self.quality
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn layout(&self) -> Option<&TrayLayout> {
        self.layout.as_ref()
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn impact(&self) -> &ImpactPipeline {
        &self.impact
    }

    pub fn slots(&self) -> &[DieSlot] {
        self.orchestrator.slots()
    }

    /// Epoch of the most recent roll.
    pub fn epoch(&self) -> u64 {
        self.orchestrator.epoch()
    }

    /// Whether any die has yet to report its result.
    pub fn is_rolling(&self) -> bool {
        self.orchestrator.is_busy()
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.camera.resize(width, height);
    }

    /// Start a roll. Supersedes any roll still in flight.
    pub fn roll(
        &mut self,
        ctx: &mut RendererContext,
        request: &RollRequest,
    ) -> Result<u64, EngineError> {
        request.validate(self.config.max_dice)?;

        let count = request.len();
        if self.layout.as_ref().map(|l| l.count) != Some(count) {
            let layout = TrayLayout::for_count(count);
            let half = layout.half_extents();
            let launch = &self.config.launch;
            self.physics.build_tray(&TrayDesc {
                half_width: half.x,
                half_depth: half.y,
                wall_height: layout.wall_height,
                ceiling: launch.spawn_height + launch.spawn_height_jitter.max(0.0) + LID_HEADROOM,
                material: ColliderMaterial::new(
                    launch.tray_restitution,
                    launch.tray_friction,
                ),
            });
            self.camera.set_rig(&layout.camera());
            log::debug!(
                "tray {}x{} for {} dice ({}x{} grid)",
                layout.width,
                layout.depth,
                count,
                layout.columns,
                layout.rows
            );
            self.layout = Some(layout);
        }
        let Some(layout) = self.layout.as_ref() else {
            return Err(EngineError::EmptyRoll);
        };

        let epoch = self
            .orchestrator
            .roll(&mut self.physics, &mut ctx.models, &request.dice, layout);
        let live: Vec<BodyHandle> = self.orchestrator.slots().iter().map(|s| s.body).collect();
        self.impact.retain_bodies(&live);
        self.events.retain(|e| e.epoch() == epoch);
        self.resolve_visuals(ctx);
        Ok(epoch)
    }

    fn resolve_visuals(&mut self, ctx: &mut RendererContext) {
        let theme = &self.theme;
        let bloom = ctx.textures.resolve(&TextureKey::bloom(theme));
        self.visuals = self
            .orchestrator
            .slots()
            .iter()
            .map(|slot| {
                let kind = slot.spec.kind();
                let mode = slot.spec.display_mode();
                let decals = slot
                    .model
                    .faces()
                    .iter()
                    .map(|face| {
                        let text = face_label(kind, face.value, mode);
                        let key = TextureKey::Label(LabelStyle::for_face(text.clone(), mode, theme));
                        FaceDecal {
                            value: face.value,
                            text,
                            texture: ctx.textures.resolve(&key),
                        }
                    })
                    .collect();
                DieVisual {
                    decals,
                    label_size: kind.map_or(0.6, DieKind::label_size),
                    bloom,
                    sigil: ctx.textures.resolve(&TextureKey::sigil(slot.spec.sides(), theme)),
                    flair: DieFlair::for_kind(kind),
                    ring_yaw: 0.0,
                }
            })
            .collect();
    }

    /// Advance the scene by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
        self.time += dt;

        self.physics.step(dt, &mut self.contacts);
        for contact in self.contacts.drain(..) {
            self.impact.on_collision(&contact);
        }
        self.orchestrator.update(&mut self.physics, dt);
        self.impact.advance(dt);

        self.events.extend(self.orchestrator.drain_events());
        self.sounds.extend(self.orchestrator.drain_sounds());
        self.sounds.extend(self.impact.drain_sounds());

        self.camera
            .apply_shake(self.impact.shake_offset(), self.impact.shake().is_active(), dt);

        for (slot, visual) in self.orchestrator.slots().iter().zip(&mut self.visuals) {
            let active = slot.lifecycle.is_rolling() || slot.highlight.is_some();
            let speed = visual.flair.orbit_speed * if active { 1.15 } else { 0.65 };
            visual.ring_yaw = (visual.ring_yaw + dt * speed) % std::f32::consts::TAU;
        }
    }

    /// Label of the face currently pointing up on die `index`.
    pub fn shown_label(&self, index: usize) -> Option<&str> {
        let slot = self.orchestrator.slots().get(index)?;
        let rotation = self.physics.pose(slot.body)?.rotation;
        let value = slot.model.face_up(rotation)?.value;
        self.visuals
            .get(index)?
            .decals
            .iter()
            .find(|d| d.value == value)
            .map(|d| d.text.as_str())
    }

    /// Assemble everything the host renderer needs for this frame.
    pub fn build_frame(&mut self, ctx: &mut RendererContext, frame: &mut RenderFrame) {
        frame.clear();
        let t = self.time;
        let glow = self.theme.glow_intensity;
        let accent = self.theme.accent.rgb_f32();

        for (index, (slot, visual)) in self
            .orchestrator
            .slots()
            .iter()
            .zip(&self.visuals)
            .enumerate()
        {
            let Some(pose) = self.physics.pose(slot.body) else {
                continue;
            };
            let flair = &visual.flair;
            let rolling = slot.lifecycle.is_rolling();

            let (emissive, edge, bloom) = if rolling {
                let pulse = (t * 6.0).sin() * 0.2 + 0.8;
                (
                    glow * pulse,
                    flair.edge_opacity * (0.85 + pulse * 0.4),
                    (0.18 + pulse * 0.12).clamp(0.08, 0.35),
                )
            } else if slot.highlight.is_some() {
                let pulse = (t * 2.0).sin() * 0.1 + 0.9;
                (
                    glow * pulse,
                    flair.edge_opacity * (0.9 + pulse * 0.3),
                    (0.24 + pulse * 0.18).clamp(0.1, 0.45),
                )
            } else {
                (glow * 0.35, flair.edge_opacity, 0.12)
            };
            let boost = if slot.highlight.is_some() { HIGHLIGHT_SPARKLE_BOOST } else { 1.0 };
            let sparkles =
                (SPARKLES_BASE * boost * flair.particle_boost * self.quality.particle_scale).round();

            let mut die = DieInstance {
                scale: 1.0,
                sides: slot.spec.sides() as f32,
                emissive,
                bloom_opacity: bloom,
                edge_opacity: edge,
                sparkles,
                highlight: match slot.highlight {
                    None => 0.0,
                    Some(Highlight::Critical) => 1.0,
                    Some(Highlight::Fumble) => 2.0,
                },
                bloom_texture: texture_slot(visual.bloom).0,
                ..DieInstance::default()
            };
            die.set_pose(pose.position, pose.rotation);
            frame.dice.push(die);

            for (face, decal) in slot.model.faces().iter().zip(&visual.decals) {
                let local = face.center + face.normal * LABEL_LIFT;
                let position = pose.position + pose.rotation * local;
                let rotation = pose.rotation * Quat::from_rotation_arc(Vec3::Z, face.normal);
                let (texture, [r, g, b, a]) = texture_slot(decal.texture);
                let [x, y, z] = position.to_array();
                let [qx, qy, qz, qw] = rotation.to_array();
                frame.labels.push(LabelInstance {
                    die: index as f32,
                    x,
                    y,
                    z,
                    qx,
                    qy,
                    qz,
                    qw,
                    size: visual.label_size,
                    texture,
                    r,
                    g,
                    b,
                    a,
                    value: decal.value as f32,
                    _pad: 0.0,
                });
            }

            if self.quality.flair {
                let active = rolling || slot.highlight.is_some();
                let sides = slot.spec.sides() as f32;
                let pulse = 0.75 + (t * 2.1).sin() * 0.12 + if active { 0.1 } else { 0.0 };
                frame.flair.push(FlairInstance {
                    x: pose.position.x,
                    y: pose.position.y + flair.float_height + (t * 1.2).sin() * 0.04,
                    z: pose.position.z,
                    ring_yaw: visual.ring_yaw,
                    ring_tilt: (t * 0.7 + sides).sin() * flair.ring_tilt,
                    ring_scale: flair.ring_scale,
                    ring_opacity: flair.ring_opacity * pulse,
                    ring_count: flair.ring_count as f32,
                    glyph_scale: flair.glyph_scale,
                    glyph_opacity: flair.glyph_opacity * (0.7 + pulse * 0.3),
                    texture: texture_slot(visual.sigil).0,
                    _pad: 0.0,
                });
            }
        }

        for ring in self.impact.rings() {
            let [x, y, z] = ring.position.to_array();
            let [r, g, b] = accent;
            frame.rings.push(RingInstance {
                x,
                y,
                z,
                scale: ring.scale,
                opacity: ring.opacity,
                r,
                g,
                b,
            });
        }

        self.lights.begin_frame();
        for flash in self.impact.flashes() {
            if !self
                .lights
                .add(PointLight::new(flash.position, accent, flash.intensity, flash.radius))
            {
                break;
            }
        }
        frame.lights.extend_from_slice(self.lights.lights());
        frame.ambient = self.lights.ambient();
        frame.camera = self.camera.uniform();
        frame.shake = self.impact.shake().value();
        if self.quality.bloom_field {
            frame.bloom_field = Some(ctx.textures.resolve(&TextureKey::bloom_field(&self.theme)));
        }
    }

    /// Completion and settle notifications for the current epoch.
    pub fn drain_events(&mut self) -> Vec<RollEvent> {
        let epoch = self.orchestrator.epoch();
        let mut events = std::mem::take(&mut self.events);
        events.retain(|e| e.epoch() == epoch);
        events
    }

    pub fn drain_sounds(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.sounds)
    }

    /// Release every physics body and scene-scoped feedback state. The
    /// renderer context keeps its caches.
    pub fn teardown(&mut self) {
        self.orchestrator.teardown(&mut self.physics);
        self.physics.clear();
        self.impact.reset();
        self.visuals.clear();
        self.contacts.clear();
        self.events.clear();
        self.sounds.clear();
        self.layout = None;
        log::info!("roller scene torn down");
    }
}

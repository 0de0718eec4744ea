//! Device capability → rendering quality.
//!
//! Only decoration scales with the tier. Settle detection and face
//! correction run identically on every profile.

use serde::{Deserialize, Serialize};

/// Coarse capability signal supplied by the host once per session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceCapabilities {
    pub reduced_motion: bool,
    pub save_data: bool,
    /// Network class such as `"4g"`, `"2g"` or `"slow-2g"`.
    pub effective_type: Option<String>,
    /// Device memory in GB.
    pub device_memory: Option<f32>,
    pub cpu_cores: Option<u32>,
    /// Device pixel-ratio ceiling; caps the tier's resolution scale.
    pub max_pixel_ratio: Option<f32>,
    /// Forced tier, bypassing detection.
    pub tier_override: Option<PerformanceTier>,
}

impl DeviceCapabilities {
    pub fn from_json(json: &str) -> Result<Self, crate::error::EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    fn slow_network(&self) -> bool {
        matches!(self.effective_type.as_deref(), Some("slow-2g") | Some("2g"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Low,
    #[default]
    Balanced,
    High,
    Ultra,
}

impl PerformanceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Low => "low",
            PerformanceTier::Balanced => "balanced",
            PerformanceTier::High => "high",
            PerformanceTier::Ultra => "ultra",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(PerformanceTier::Low),
            "balanced" | "medium" => Some(PerformanceTier::Balanced),
            "high" => Some(PerformanceTier::High),
            "ultra" => Some(PerformanceTier::Ultra),
            _ => None,
        }
    }

    /// Detect a tier from capabilities. An explicit override wins.
    pub fn detect(caps: &DeviceCapabilities) -> Self {
        if let Some(tier) = caps.tier_override {
            return tier;
        }
        let memory = caps.device_memory.unwrap_or(8.0);
        let cores = caps.cpu_cores.unwrap_or(8);
        let constrained = caps.save_data || caps.slow_network();
        if caps.reduced_motion || constrained || memory <= 4.0 || cores <= 4 {
            PerformanceTier::Low
        } else if memory >= 12.0 && cores >= 12 {
            PerformanceTier::Ultra
        } else if memory >= 8.0 && cores >= 8 {
            PerformanceTier::High
        } else {
            PerformanceTier::Balanced
        }
    }

    /// Upper bound on the render resolution scale
    pub fn max_pixel_ratio(&self) -> f32 {
        match self {
            PerformanceTier::Low => 1.0,
            PerformanceTier::Balanced => 1.6,
            PerformanceTier::High => 2.25,
            PerformanceTier::Ultra => 2.75,
        }
    }

    pub fn shadow_map_size(&self) -> u32 {
        match self {
            PerformanceTier::Low => 512,
            PerformanceTier::Balanced => 1024,
            PerformanceTier::High => 1536,
            PerformanceTier::Ultra => 2048,
        }
    }

    /// Sparkle particle multiplier
    pub fn particle_scale(&self) -> f32 {
        match self {
            PerformanceTier::Low => 0.65,
            PerformanceTier::Balanced => 0.95,
            PerformanceTier::High => 1.1,
            PerformanceTier::Ultra => 1.25,
        }
    }

    pub fn contact_shadow_blur(&self) -> f32 {
        match self {
            PerformanceTier::Low => 1.2,
            PerformanceTier::Balanced => 2.2,
            _ => 2.8,
        }
    }

    pub fn contact_shadow_opacity(&self) -> f32 {
        match self {
            PerformanceTier::Low => 0.3,
            PerformanceTier::Balanced => 0.38,
            _ => 0.42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    LowPower,
    HighPerformance,
}

/// Rendering toggles for the session. Read-only once selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityProfile {
    pub tier: PerformanceTier,
    pub reduced_motion: bool,
    pub resolution_scale: f32,
    pub antialias: bool,
    pub power_preference: PowerPreference,
    pub shadows: bool,
    pub shadow_map_size: u32,
    pub contact_shadows: bool,
    pub contact_shadow_blur: f32,
    pub contact_shadow_opacity: f32,
    pub environment: bool,
    pub bloom_field: bool,
    pub flair: bool,
    pub particle_scale: f32,
}

impl QualityProfile {
    pub fn select(caps: &DeviceCapabilities) -> Self {
        let tier = PerformanceTier::detect(caps);
        if caps.save_data && tier != PerformanceTier::Low {
            log::warn!(
                "save-data requested but tier '{}' was forced; keeping it",
                tier.as_str()
            );
        }
        let mut profile = Self::for_tier(tier);
        profile.reduced_motion = caps.reduced_motion;
        if let Some(ceiling) = caps.max_pixel_ratio.filter(|r| *r > 0.0) {
            profile.resolution_scale = profile.resolution_scale.min(ceiling.max(1.0));
        }
        log::info!("quality tier: {}", tier.as_str());
        profile
    }

    pub fn for_tier(tier: PerformanceTier) -> Self {
        let decorated = tier != PerformanceTier::Low;
        Self {
            tier,
            reduced_motion: false,
            resolution_scale: tier.max_pixel_ratio(),
            antialias: decorated,
            power_preference: if decorated {
                PowerPreference::HighPerformance
            } else {
                PowerPreference::LowPower
            },
            shadows: decorated,
            shadow_map_size: tier.shadow_map_size(),
            contact_shadows: tier >= PerformanceTier::High,
            contact_shadow_blur: tier.contact_shadow_blur(),
            contact_shadow_opacity: tier.contact_shadow_opacity(),
            environment: decorated,
            bloom_field: decorated,
            flair: decorated,
            particle_scale: tier.particle_scale(),
        }
    }
}

impl Default for QualityProfile {
    fn default() -> Self {
        Self::for_tier(PerformanceTier::default())
    }
}

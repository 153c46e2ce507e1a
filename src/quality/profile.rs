use std::fmt;

use eframe::glow::{self, HasContext};
use regex::RegexSet;
use sysinfo::System;

use crate::error::Result;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const ASSUMED_MEMORY_GB: f64 = 4.0;
const ASSUMED_CORES: usize = 4;

const LOW_POWER_SIGNATURES: &[&str] = &[
    r"(?i)intel.*hd",
    r"(?i)intel.*uhd",
    r"(?i)intel.*iris",
    r"(?i)mali",
    r"(?i)adreno\s*(\(tm\)\s*)?[0-5]",
    r"(?i)powervr",
    r"(?i)apple.*gpu",
    r"(?i)swiftshader",
    r"(?i)llvmpipe|softpipe",
];

const HIGH_POWER_SIGNATURES: &[&str] = &[
    r"(?i)nvidia.*rtx",
    r"(?i)nvidia.*gtx\s*1[0-9]{3}",
    r"(?i)radeon.*rx",
    r"(?i)apple.*m[1-3]",
    r"(?i)adreno\s*(\(tm\)\s*)?[6-7]",
];

/// Ordered so that `Low < Medium < High`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    pub fn config(self) -> TierConfig {
        match self {
            Self::High => TierConfig {
                max_nodes: 200,
                max_particles: 5000,
                target_fps: 60,
                enable_blur: true,
                enable_shadows: true,
                enable_post_processing: true,
                lod_distance: 50.0,
            },
            Self::Medium => TierConfig {
                max_nodes: 100,
                max_particles: 2000,
                target_fps: 30,
                enable_blur: true,
                enable_shadows: false,
                enable_post_processing: false,
                lod_distance: 30.0,
            },
            Self::Low => TierConfig {
                max_nodes: 50,
                max_particles: 500,
                target_fps: 30,
                enable_blur: false,
                enable_shadows: false,
                enable_post_processing: false,
                lod_distance: 20.0,
            },
        }
    }

    /// One step down, or `None` at the floor.
    pub fn demoted(self) -> Option<Self> {
        match self {
            Self::High => Some(Self::Medium),
            Self::Medium => Some(Self::Low),
            Self::Low => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierConfig {
    pub max_nodes: usize,
    pub max_particles: usize,
    pub target_fps: u32,
    pub enable_blur: bool,
    pub enable_shadows: bool,
    pub enable_post_processing: bool,
    pub lod_distance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformClass {
    Desktop,
    Mobile,
}

impl PlatformClass {
    pub fn current() -> Self {
        if cfg!(any(target_os = "ios", target_os = "android")) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    /// Mobile GL contexts are known to be dropped under memory pressure.
    pub fn is_context_unstable(self) -> bool {
        self == Self::Mobile
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Preferences {
    pub reduced_graphics: bool,
    pub reduced_motion: bool,
}

/// Raw facts about the host, gathered once at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct HostProbe {
    pub accelerated: bool,
    pub renderer: Option<String>,
    pub memory_gb: Option<f64>,
    pub cores: Option<usize>,
    pub platform: PlatformClass,
    pub preferences: Preferences,
}

impl HostProbe {
    pub fn detect(gl: Option<&glow::Context>, preferences: Preferences) -> Self {
        let renderer = gl.map(|gl| {
            // SAFETY: the context is current on the UI thread during app creation.
            unsafe { gl.get_parameter_string(glow::RENDERER) }
        });

        let mut system = System::new();
        system.refresh_memory();
        let total = system.total_memory();
        let memory_gb = (total > 0).then(|| total as f64 / BYTES_PER_GB);

        let cores = std::thread::available_parallelism()
            .ok()
            .map(|cores| cores.get());

        Self {
            accelerated: gl.is_some(),
            renderer,
            memory_gb,
            cores,
            platform: PlatformClass::current(),
            preferences,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeviceProfile {
    pub tier: QualityTier,
    pub config: TierConfig,
    pub platform: PlatformClass,
    /// Human readable trail of the decisions that produced `tier`.
    pub reasons: Vec<String>,
    pub vector_fallback: bool,
}

/// Classifies a [`HostProbe`] into a [`DeviceProfile`] and remembers the
/// answer until [`DeviceProfiler::reset`].
pub struct DeviceProfiler {
    low_power: RegexSet,
    high_power: RegexSet,
    cached: Option<DeviceProfile>,
}

impl DeviceProfiler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            low_power: RegexSet::new(LOW_POWER_SIGNATURES)?,
            high_power: RegexSet::new(HIGH_POWER_SIGNATURES)?,
            cached: None,
        })
    }

    pub fn profile(&mut self, probe: &HostProbe) -> &DeviceProfile {
        let profile = match self.cached.take() {
            Some(profile) => profile,
            None => {
                let profile = self.classify(probe);
                tracing::info!(
                    tier = %profile.tier,
                    fallback = profile.vector_fallback,
                    reasons = ?profile.reasons,
                    "device profile"
                );
                profile
            }
        };
        self.cached.insert(profile)
    }

    #[cfg(test)]
    pub fn cached(&self) -> Option<&DeviceProfile> {
        self.cached.as_ref()
    }

    #[cfg(test)]
    pub fn reset(&mut self) {
        self.cached = None;
    }

    pub fn classify(&self, probe: &HostProbe) -> DeviceProfile {
        let mut reasons = Vec::new();
        let prefs = probe.preferences;

        let tier = if prefs.reduced_graphics {
            reasons.push("reduced graphics requested".to_owned());
            QualityTier::Low
        } else if prefs.reduced_motion {
            reasons.push("reduced motion preferred".to_owned());
            QualityTier::Low
        } else if !probe.accelerated {
            reasons.push("no accelerated rendering context".to_owned());
            QualityTier::Low
        } else {
            self.classify_hardware(probe, &mut reasons)
        };

        let tier = if tier == QualityTier::High && probe.platform.is_context_unstable() {
            reasons.push("context-unstable platform capped at medium".to_owned());
            QualityTier::Medium
        } else {
            tier
        };

        DeviceProfile {
            tier,
            config: tier.config(),
            platform: probe.platform,
            reasons,
            vector_fallback: prefs.reduced_graphics || prefs.reduced_motion || !probe.accelerated,
        }
    }

    fn classify_hardware(&self, probe: &HostProbe, reasons: &mut Vec<String>) -> QualityTier {
        if let Some(renderer) = probe.renderer.as_deref() {
            if self.low_power.is_match(renderer) {
                reasons.push(format!("low-power GPU: {renderer}"));
                return QualityTier::Low;
            }
            if self.high_power.is_match(renderer) {
                reasons.push(format!("high-power GPU: {renderer}"));
                return QualityTier::High;
            }
        }

        let memory = probe.memory_gb.unwrap_or(ASSUMED_MEMORY_GB);
        let cores = probe.cores.unwrap_or(ASSUMED_CORES);
        reasons.push(format!("heuristic: {memory:.1} GB, {cores} cores"));

        if memory >= 8.0 && cores >= 8 {
            QualityTier::High
        } else if memory >= 4.0 && cores >= 4 {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }
}

mod camera;
mod connections;
mod fallback;
mod gpu;
mod instances;
pub mod palette;

use std::fmt;

pub use camera::OrbitCamera;
pub use connections::Connections;
pub use fallback::FallbackRenderer;
pub use gpu::{FramePacket, GpuScene, GpuState, SharedGpu, paint_callback};
pub use instances::NodeInstances;

use crate::error::RenderError;
use crate::quality::Preferences;

#[derive(Clone, Debug, PartialEq)]
pub enum FallbackReason {
    ReducedGraphics,
    ReducedMotion,
    NoAcceleratedContext,
    ContextInstability,
    LayoutUnavailable,
    RenderFailure(RenderError),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReducedGraphics => f.write_str("reduced graphics requested"),
            Self::ReducedMotion => f.write_str("reduced motion preferred"),
            Self::NoAcceleratedContext => f.write_str("no accelerated rendering context"),
            Self::ContextInstability => f.write_str("graphics context lost repeatedly"),
            Self::LayoutUnavailable => f.write_str("layout worker could not be started"),
            Self::RenderFailure(error) => write!(f, "render failure: {error}"),
        }
    }
}

/// One-way rendering state machine:
/// `Detecting -> Accelerated | VectorFallback`, `Accelerated -> VectorFallback`.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderMode {
    Detecting,
    Accelerated,
    VectorFallback(FallbackReason),
}

impl RenderMode {
    /// Leaves `Detecting`. `init` builds the accelerated scene and is only
    /// called when nothing already rules the accelerated path out. Later
    /// calls are no-ops.
    pub fn detect<T>(
        &mut self,
        preferences: Preferences,
        accelerated: bool,
        init: impl FnOnce() -> Result<T, RenderError>,
    ) -> Option<T> {
        if *self != Self::Detecting {
            return None;
        }

        let reason = if preferences.reduced_graphics {
            Some(FallbackReason::ReducedGraphics)
        } else if preferences.reduced_motion {
            Some(FallbackReason::ReducedMotion)
        } else if !accelerated {
            Some(FallbackReason::NoAcceleratedContext)
        } else {
            None
        };
        if let Some(reason) = reason {
            tracing::info!(%reason, "using vector fallback");
            *self = Self::VectorFallback(reason);
            return None;
        }

        match init() {
            Ok(scene) => {
                *self = Self::Accelerated;
                Some(scene)
            }
            Err(error) => {
                tracing::error!(%error, "accelerated renderer failed to initialize");
                *self = Self::VectorFallback(FallbackReason::RenderFailure(error));
                None
            }
        }
    }

    /// Switches to the fallback. Returns false when already there; the first
    /// reason is kept.
    pub fn degrade(&mut self, reason: FallbackReason) -> bool {
        if self.is_fallback() {
            return false;
        }
        tracing::warn!(%reason, "switching to vector fallback for the rest of the session");
        *self = Self::VectorFallback(reason);
        true
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::VectorFallback(_))
    }

    pub fn is_accelerated(&self) -> bool {
        matches!(self, Self::Accelerated)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Detecting => "detecting",
            Self::Accelerated => "accelerated",
            Self::VectorFallback(_) => "vector fallback",
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn successful_init_activates_acceleration() {
        let mut mode = RenderMode::Detecting;
        assert_eq!(mode.detect(Preferences::default(), true, || Ok(7)), Some(7));
        assert_eq!(mode, RenderMode::Accelerated);
    }

    #[test]
    fn init_failure_falls_back() {
        let mut mode = RenderMode::Detecting;
        let scene = mode.detect::<()>(Preferences::default(), true, || Err(RenderError::NoContext));
        assert!(scene.is_none());
        assert_eq!(mode, RenderMode::VectorFallback(FallbackReason::RenderFailure(RenderError::NoContext)));
    }

    #[test]
    fn missing_context_skips_init() {
        let mut mode = RenderMode::Detecting;
        let scene = mode.detect::<()>(Preferences::default(), false, || {
            panic!("init must not run without a context")
        });
        assert!(scene.is_none());
        assert_eq!(mode, RenderMode::VectorFallback(FallbackReason::NoAcceleratedContext));
    }

    #[test]
    fn detection_runs_once() {
        let mut mode = RenderMode::Detecting;
        mode.detect(Preferences::default(), true, || Ok(()));
        let again = mode.detect::<()>(Preferences::default(), true, || panic!("already detected"));
        assert!(again.is_none());
        assert!(mode.is_accelerated());
    }

    #[test]
    fn degradation_is_one_way_and_keeps_the_first_reason() {
        let mut mode = RenderMode::Accelerated;
        assert!(mode.degrade(FallbackReason::ContextInstability));
        assert!(!mode.degrade(FallbackReason::RenderFailure(RenderError::ContextLost)));
        assert_eq!(mode, RenderMode::VectorFallback(FallbackReason::ContextInstability));
        assert!(!mode.is_accelerated());
    }

    proptest! {
        #[test]
        fn reduced_motion_always_uses_the_fallback(reduced_graphics: bool, accelerated: bool, init_ok: bool) {
            let preferences = Preferences { reduced_graphics, reduced_motion: true };
            let mut mode = RenderMode::Detecting;
            let scene = mode.detect(preferences, accelerated, || {
                if init_ok { Ok(()) } else { Err(RenderError::NoContext) }
            });
            prop_assert!(mode.is_fallback());
            prop_assert!(scene.is_none());
        }
    }
}

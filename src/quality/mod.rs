mod controller;
mod crash_guard;
mod profile;

pub use controller::QualityController;
pub use crash_guard::{CrashGuard, LossVerdict};
#[cfg(test)]
pub use profile::PlatformClass;
pub use profile::{DeviceProfile, DeviceProfiler, HostProbe, Preferences, QualityTier};

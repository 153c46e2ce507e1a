use std::time::{Duration, Instant};

/// Losses needed before the accelerated path is abandoned for the session.
pub const CONTEXT_LOSS_LIMIT: u32 = 2;
pub const RECENT_LOSS_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossVerdict {
    /// Keep rendering; the context may come back.
    Tolerated,
    /// Switch to the vector fallback for the rest of the session.
    Tripped,
}

/// Watches for graphics context loss. Once tripped it stays tripped;
/// restoring the context afterwards changes nothing.
#[derive(Debug, Default)]
pub struct CrashGuard {
    losses: u32,
    last_loss: Option<Instant>,
    tripped: bool,
}

impl CrashGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_context_loss(&mut self, now: Instant) -> LossVerdict {
        self.losses += 1;
        self.last_loss = Some(now);

        if self.tripped {
            return LossVerdict::Tripped;
        }
        if self.losses >= CONTEXT_LOSS_LIMIT {
            tracing::error!(losses = self.losses, "repeated graphics context loss; switching to vector fallback");
            self.tripped = true;
            return LossVerdict::Tripped;
        }

        tracing::warn!("graphics context lost");
        LossVerdict::Tolerated
    }

    pub fn record_context_restored(&mut self) {
        tracing::info!(tripped = self.tripped, "graphics context restored");
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn loss_count(&self) -> u32 {
        self.losses
    }

    /// True while a loss happened recently enough to keep animation minimal.
    pub fn should_reduce_quality(&self, now: Instant) -> bool {
        self.last_loss
            .is_some_and(|at| now.saturating_duration_since(at) < RECENT_LOSS_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_loss_is_tolerated() {
        let mut guard = CrashGuard::new();
        assert_eq!(guard.record_context_loss(Instant::now()), LossVerdict::Tolerated);
        assert!(!guard.is_tripped());
        assert_eq!(guard.loss_count(), 1);
    }

    #[test]
    fn second_loss_trips_permanently() {
        let mut guard = CrashGuard::new();
        let now = Instant::now();
        guard.record_context_loss(now);
        assert_eq!(guard.record_context_loss(now), LossVerdict::Tripped);

        guard.record_context_restored();
        assert!(guard.is_tripped());
        assert_eq!(guard.record_context_loss(now), LossVerdict::Tripped);
    }

    #[test]
    fn recent_loss_reduces_quality_for_a_minute() {
        let mut guard = CrashGuard::new();
        let now = Instant::now();
        assert!(!guard.should_reduce_quality(now));

        guard.record_context_loss(now);
        assert!(guard.should_reduce_quality(now + Duration::from_secs(59)));
        assert!(!guard.should_reduce_quality(now + Duration::from_secs(61)));
    }
}

//! Frame telemetry and runtime quality demotion.
//!
//! The host reports every painted frame. Once per sample interval the
//! accumulated frames are folded into a [`TelemetrySample`]; sustained low
//! frame rates step the active tier down. Tiers only ever go down.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::profile::QualityTier;

/// 60 fps frame budget, in whole microseconds so dropped-frame math is exact.
pub const FRAME_BUDGET: Duration = Duration::from_micros(16_667);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetryConfig {
    pub sample_interval: Duration,
    pub max_samples: usize,
    pub fps_threshold: f32,
    pub low_fps_samples: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(1),
            max_samples: 60,
            fps_threshold: 20.0,
            low_fps_samples: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TelemetrySample {
    pub fps: f32,
    pub dropped_frames: u32,
    pub draw_calls: u32,
    pub tick_time: Duration,
    /// Tier active while the sample was taken.
    pub tier: QualityTier,
}

pub struct QualityController {
    config: TelemetryConfig,
    tier: QualityTier,
    samples: VecDeque<TelemetrySample>,
    window_start: Option<Instant>,
    last_frame: Option<Instant>,
    frame_count: u32,
    dropped_frames: u32,
    draw_calls: u32,
    tick_time: Duration,
    consecutive_low: u32,
    /// Whether the previous frame asked the host for another one.
    repaint_pending: bool,
}

impl QualityController {
    pub fn new(tier: QualityTier) -> Self {
        Self::with_config(tier, TelemetryConfig::default())
    }

    pub fn with_config(tier: QualityTier, config: TelemetryConfig) -> Self {
        Self {
            config,
            tier,
            samples: VecDeque::with_capacity(config.max_samples),
            window_start: None,
            last_frame: None,
            frame_count: 0,
            dropped_frames: 0,
            draw_calls: 0,
            tick_time: Duration::ZERO,
            consecutive_low: 0,
            repaint_pending: false,
        }
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    pub fn record_draw_calls(&mut self, count: u32) {
        self.draw_calls = count;
    }

    pub fn record_tick_time(&mut self, tick_time: Duration) {
        self.tick_time = tick_time;
    }

    /// Records one painted frame. `repaint_pending` says whether this frame
    /// asked the host for another one; a long gap after such a frame is a
    /// slow frame, while a gap after a frame that did not is idleness.
    /// Returns the new tier when this frame closed a sample that triggered a
    /// demotion.
    pub fn record_frame(&mut self, now: Instant, repaint_pending: bool) -> Option<QualityTier> {
        let was_pending = std::mem::replace(&mut self.repaint_pending, repaint_pending);
        let Some(last) = self.last_frame else {
            self.restart_window(now);
            return None;
        };

        let delta = now.saturating_duration_since(last);
        if delta > self.config.sample_interval && !was_pending {
            self.restart_window(now);
            return None;
        }

        self.frame_count += 1;
        self.last_frame = Some(now);
        if delta.as_micros() * 2 > FRAME_BUDGET.as_micros() * 3 {
            let budgets = delta.as_micros() / FRAME_BUDGET.as_micros();
            self.dropped_frames += u32::try_from(budgets.saturating_sub(1)).unwrap_or(u32::MAX);
        }

        let window_start = self.window_start.unwrap_or(now);
        let elapsed = now.saturating_duration_since(window_start);
        if elapsed < self.config.sample_interval {
            return None;
        }

        let fps = self.frame_count as f32 / elapsed.as_secs_f32();
        let sample = TelemetrySample {
            fps,
            dropped_frames: self.dropped_frames,
            draw_calls: self.draw_calls,
            tick_time: self.tick_time,
            tier: self.tier,
        };
        tracing::trace!(fps, dropped = sample.dropped_frames, "telemetry sample");
        self.samples.push_back(sample);
        while self.samples.len() > self.config.max_samples {
            self.samples.pop_front();
        }

        self.window_start = Some(now);
        self.frame_count = 0;
        self.dropped_frames = 0;
        self.evaluate(fps)
    }

    /// Lowers the tier to at most `ceiling`. Never raises it.
    pub fn clamp_to(&mut self, ceiling: QualityTier) -> Option<QualityTier> {
        if ceiling >= self.tier {
            return None;
        }
        tracing::warn!(from = %self.tier, to = %ceiling, "quality tier clamped");
        self.tier = ceiling;
        self.consecutive_low = 0;
        Some(ceiling)
    }

    #[cfg(test)]
    pub fn samples(&self) -> impl Iterator<Item = &TelemetrySample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.samples.back()
    }

    /// Mean fps of the last `count` samples, 60 when nothing was sampled yet.
    pub fn average_fps(&self, count: usize) -> f32 {
        let recent = self.samples.iter().rev().take(count);
        let (sum, n) = recent.fold((0.0, 0usize), |(sum, n), sample| (sum + sample.fps, n + 1));
        if n == 0 { 60.0 } else { sum / n as f32 }
    }

    fn restart_window(&mut self, now: Instant) {
        self.window_start = Some(now);
        self.last_frame = Some(now);
        self.frame_count = 0;
        self.dropped_frames = 0;
    }

    fn evaluate(&mut self, fps: f32) -> Option<QualityTier> {
        if fps >= self.config.fps_threshold {
            self.consecutive_low = 0;
            return None;
        }

        self.consecutive_low += 1;
        if self.consecutive_low < self.config.low_fps_samples {
            return None;
        }

        self.consecutive_low = 0;
        let next = self.tier.demoted()?;
        tracing::warn!(from = %self.tier, to = %next, fps, "sustained low frame rate; demoting quality tier");
        self.tier = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds continuously rendered frames spaced `frame_ms` apart,
    /// returning every demotion seen.
    fn drive(
        controller: &mut QualityController,
        base: Instant,
        start_ms: u64,
        frames: u64,
        frame_ms: u64,
    ) -> Vec<QualityTier> {
        drive_with(controller, base, start_ms, frames, frame_ms, true)
    }

    fn drive_with(
        controller: &mut QualityController,
        base: Instant,
        start_ms: u64,
        frames: u64,
        frame_ms: u64,
        repaint_pending: bool,
    ) -> Vec<QualityTier> {
        (0..frames)
            .filter_map(|index| {
                let at = base + Duration::from_millis(start_ms + index * frame_ms);
                controller.record_frame(at, repaint_pending)
            })
            .collect()
    }

    #[test]
    fn average_fps_defaults_to_sixty() {
        let controller = QualityController::new(QualityTier::High);
        assert_eq!(controller.average_fps(5), 60.0);
        assert!(controller.latest().is_none());
    }

    #[test]
    fn steady_frames_produce_one_sample_per_interval() {
        let mut controller = QualityController::new(QualityTier::High);
        let base = Instant::now();
        controller.record_draw_calls(2);
        controller.record_tick_time(Duration::from_millis(3));

        let demotions = drive(&mut controller, base, 0, 31, 100);

        assert!(demotions.len() <= 1);
        assert_eq!(controller.samples().count(), 3);
        let sample = controller.latest().unwrap();
        assert!((sample.fps - 10.0).abs() < 0.01);
        assert_eq!(sample.draw_calls, 2);
        assert_eq!(sample.tick_time, Duration::from_millis(3));
        // 100ms holds five whole budgets, so four frames drop per frame.
        assert_eq!(sample.dropped_frames, 40);
    }

    #[test]
    fn three_low_samples_demote_one_step_at_a_time() {
        let mut controller = QualityController::new(QualityTier::High);
        let base = Instant::now();

        let first = drive(&mut controller, base, 0, 31, 100);
        assert_eq!(first, vec![QualityTier::Medium]);

        let second = drive(&mut controller, base, 3_100, 30, 100);
        assert_eq!(second, vec![QualityTier::Low]);

        let third = drive(&mut controller, base, 6_100, 30, 100);
        assert!(third.is_empty());
        assert_eq!(controller.tier(), QualityTier::Low);
    }

    #[test]
    fn recovered_fps_never_promotes() {
        let mut controller = QualityController::new(QualityTier::High);
        let base = Instant::now();
        drive(&mut controller, base, 0, 31, 100);
        assert_eq!(controller.tier(), QualityTier::Medium);

        let fast = drive(&mut controller, base, 3_100, 600, 10);
        assert!(fast.is_empty());
        assert_eq!(controller.tier(), QualityTier::Medium);
        assert!(controller.average_fps(3) > 90.0);
    }

    #[test]
    fn a_good_sample_resets_the_low_streak() {
        let mut controller = QualityController::new(QualityTier::High);
        let base = Instant::now();

        assert!(drive(&mut controller, base, 0, 21, 100).is_empty());
        assert!(drive(&mut controller, base, 2_010, 100, 10).is_empty());
        assert!(drive(&mut controller, base, 3_100, 20, 100).is_empty());
        assert_eq!(controller.tier(), QualityTier::High);
    }

    #[test]
    fn idle_gaps_restart_the_window() {
        let mut controller = QualityController::new(QualityTier::High);
        let base = Instant::now();

        drive_with(&mut controller, base, 0, 30, 16, false);
        drive_with(&mut controller, base, 10_000, 30, 16, false);
        assert_eq!(controller.samples().count(), 0);
        assert_eq!(controller.tier(), QualityTier::High);
    }

    #[test]
    fn frames_slower_than_the_interval_still_demote_while_rendering() {
        let mut controller = QualityController::new(QualityTier::High);
        let base = Instant::now();

        let demotions = drive(&mut controller, base, 0, 30, 1_100);

        assert_eq!(demotions, vec![QualityTier::Medium, QualityTier::Low]);
        assert_eq!(controller.tier(), QualityTier::Low);
        let sample = controller.latest().unwrap();
        assert!(sample.fps < 1.0);
        assert_eq!(sample.tier, QualityTier::Low);
    }

    #[test]
    fn history_is_bounded() {
        let config = TelemetryConfig {
            max_samples: 4,
            ..TelemetryConfig::default()
        };
        let mut controller = QualityController::with_config(QualityTier::High, config);
        drive(&mut controller, Instant::now(), 0, 1_000, 10);
        assert_eq!(controller.samples().count(), 4);
    }

    #[test]
    fn clamp_only_lowers() {
        let mut controller = QualityController::new(QualityTier::Medium);
        assert_eq!(controller.clamp_to(QualityTier::High), None);
        assert_eq!(controller.clamp_to(QualityTier::Low), Some(QualityTier::Low));
        assert_eq!(controller.tier(), QualityTier::Low);
    }
}

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::Vec3;

/// Deterministic pseudo-random offset in `[-1, 1]^3` derived from an id.
pub fn stable_jitter(id: &str) -> Vec3 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let unit = |bits: u64| ((bits & 0x1f_ffff) as f64 / 0x1f_ffff as f64) as f32;
    let x = unit(hash);
    let y = unit(hash >> 21);
    let z = unit(hash >> 42);
    Vec3::new((x * 2.0) - 1.0, (y * 2.0) - 1.0, (z * 2.0) - 1.0)
}

pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_owned();
    }

    let mut short = label.chars().take(max_chars.saturating_sub(1)).collect::<String>();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_is_stable_and_bounded() {
        let first = stable_jitter("signal-7");
        assert_eq!(first, stable_jitter("signal-7"));
        assert_ne!(first, stable_jitter("signal-8"));
        for axis in first.to_array() {
            assert!((-1.0..=1.0).contains(&axis));
        }
    }

    #[test]
    fn labels_are_shortened_with_ellipsis() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("a much longer label", 6), "a muc…");
    }
}

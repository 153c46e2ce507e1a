use eframe::egui::Color32;

use crate::graph::NodeStatus;

pub const HEALTHY: Color32 = Color32::from_rgb(0x0d, 0x94, 0x88);
pub const ATTENTION: Color32 = Color32::from_rgb(0xd9, 0x77, 0x06);
pub const ALERT: Color32 = Color32::from_rgb(0xdc, 0x26, 0x26);

pub const HEALTHY_GLOW: Color32 = Color32::from_rgb(0x14, 0xb8, 0xa6);
pub const ATTENTION_GLOW: Color32 = Color32::from_rgb(0xf5, 0x9e, 0x0b);
pub const ALERT_GLOW: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);

/// Gamma-space RGBA for a link touching the selected or hovered node.
pub const LINK_HIGHLIGHT: [f32; 4] = [0.05, 0.58, 0.55, 0.6];
pub const LINK_DEFAULT: [f32; 4] = [0.47, 0.44, 0.40, 0.2];

pub fn status_color(status: NodeStatus) -> Color32 {
    match status {
        NodeStatus::Healthy => HEALTHY,
        NodeStatus::Attention => ATTENTION,
        NodeStatus::Alert => ALERT,
    }
}

pub fn status_glow(status: NodeStatus) -> Color32 {
    match status {
        NodeStatus::Healthy => HEALTHY_GLOW,
        NodeStatus::Attention => ATTENTION_GLOW,
        NodeStatus::Alert => ALERT_GLOW,
    }
}

/// Selected nodes take the glow color, hovered ones sit halfway to it.
pub fn emphasized(status: NodeStatus, selected: bool, hovered: bool) -> Color32 {
    let base = status_color(status);
    if selected {
        status_glow(status)
    } else if hovered {
        blend(base, status_glow(status), 0.5)
    } else {
        base
    }
}

pub fn blend(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

/// egui paints in gamma space, so shaders take the sRGB bytes unconverted.
pub fn to_gl(color: Color32) -> [f32; 4] {
    color.to_normalized_gamma_f32()
}

pub fn from_gl(color: [f32; 4]) -> Color32 {
    let [r, g, b, a] = color.map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8);
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_uses_glow_and_hover_sits_between() {
        assert_eq!(emphasized(NodeStatus::Alert, true, false), ALERT_GLOW);
        assert_eq!(emphasized(NodeStatus::Alert, false, false), ALERT);

        let hovered = emphasized(NodeStatus::Healthy, false, true);
        assert!(hovered.g() > HEALTHY.g() && hovered.g() < HEALTHY_GLOW.g());
    }

    #[test]
    fn gl_conversion_keeps_opaque_colors() {
        let gl = to_gl(ATTENTION);
        assert!((gl[3] - 1.0).abs() < f32::EPSILON);
        assert_eq!(from_gl(gl), ATTENTION);
    }
}

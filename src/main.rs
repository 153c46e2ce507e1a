mod app;
mod error;
mod graph;
mod layout;
mod quality;
mod render;
mod util;

use std::path::PathBuf;

use clap::Parser;
use eframe::egui::Color32;
use tracing_subscriber::EnvFilter;

use crate::app::{AppConfig, ConstellationApp, ConstellationProps};
use crate::error::ConstellationError;
use crate::quality::Preferences;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON graph file with `nodes` and `links`.
    graph: PathBuf,

    /// Skip the accelerated renderer entirely.
    #[arg(long, env = "CONSTELLATION_REDUCED_GRAPHICS")]
    reduced_graphics: bool,

    /// Prefer reduced motion: vector rendering, no animation.
    #[arg(long, env = "CONSTELLATION_REDUCED_MOTION")]
    reduced_motion: bool,

    /// Lay the constellation out in two dimensions.
    #[arg(long)]
    flat: bool,

    #[arg(long)]
    hide_links: bool,

    /// Jump straight to simulated positions instead of interpolating.
    #[arg(long = "static")]
    static_positions: bool,

    /// Canvas background as `#rrggbb`.
    #[arg(long, default_value = "#fafaf9")]
    background: String,

    #[arg(long, default_value = "Signal constellation")]
    aria_label: String,

    /// Node id selected at startup.
    #[arg(long)]
    select: Option<String>,

    /// Keep the running layout when a reload leaves the drawn nodes unchanged.
    #[arg(long)]
    keep_layout: bool,

    /// Show frame telemetry in the top bar.
    #[arg(long)]
    telemetry: bool,
}

impl Args {
    fn into_config(self) -> error::Result<AppConfig> {
        let background = Color32::from_hex(&self.background).map_err(|error| {
            ConstellationError::Config(format!("invalid background color {:?}: {error:?}", self.background))
        })?;
        let preferences = Preferences {
            reduced_graphics: self.reduced_graphics,
            reduced_motion: self.reduced_motion,
        };

        Ok(AppConfig {
            graph_path: self.graph,
            preferences,
            props: ConstellationProps {
                selected_id: self.select,
                is_3d: !self.flat,
                background,
                show_links: !self.hide_links,
                animated: !self.static_positions && !self.reduced_motion,
                aria_label: self.aria_label,
                keep_layout: self.keep_layout,
            },
            show_telemetry: self.telemetry,
        })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,constellation_view=debug")),
        )
        .init();

    let config = Args::parse().into_config()?;
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 840.0]),
        depth_buffer: 24,
        ..Default::default()
    };

    eframe::run_native(
        "constellation-view",
        options,
        Box::new(move |cc| Ok(Box::new(ConstellationApp::new(cc, config)?))),
    )
    .map_err(|error| anyhow::anyhow!("failed to run the viewer: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_component_props() {
        let args = Args::parse_from([
            "constellation-view",
            "graph.json",
            "--flat",
            "--static",
            "--select",
            "sig-3",
            "--background",
            "#102030",
        ]);
        let config = args.into_config().expect("valid config");
        assert!(!config.props.is_3d);
        assert!(!config.props.animated);
        assert!(config.props.show_links);
        assert!(!config.props.keep_layout);
        assert_eq!(config.props.selected_id.as_deref(), Some("sig-3"));
        assert_eq!(config.props.background, Color32::from_rgb(0x10, 0x20, 0x30));
    }

    #[test]
    fn reduced_motion_disables_animation() {
        let args = Args::parse_from(["constellation-view", "graph.json", "--reduced-motion"]);
        let config = args.into_config().expect("valid config");
        assert!(config.preferences.reduced_motion);
        assert!(!config.props.animated);
    }

    #[test]
    fn keep_layout_is_opt_in() {
        let args = Args::parse_from(["constellation-view", "graph.json", "--keep-layout"]);
        let config = args.into_config().expect("valid config");
        assert!(config.props.keep_layout);
    }

    #[test]
    fn malformed_background_is_a_config_error() {
        let args = Args::parse_from(["constellation-view", "graph.json", "--background", "teal"]);
        assert!(matches!(args.into_config(), Err(ConstellationError::Config(_))));
    }
}

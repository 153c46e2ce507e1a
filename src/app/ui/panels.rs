use std::path::Path;

use eframe::egui::{self, Align, Context, Layout};

use crate::render::RenderMode;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        graph_path: &Path,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Constellation");
                    ui.separator();
                    ui.label(format!("graph: {}", graph_path.display()));
                    ui.label(format!("signals: {}", self.graph.node_count()));
                    ui.label(format!("links: {}", self.graph.link_count()));
                    let reload_button = ui.add_enabled(!is_loading, egui::Button::new("Reload graph"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    self.draw_render_status(ui);
                    self.draw_layout_controls(ui);
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.checkbox(&mut self.show_telemetry, "Telemetry");
                        if let Some(telemetry_text) = self.telemetry_text() {
                            ui.label(telemetry_text);
                        }
                        ui.label(self.visible_graph_text());
                    });
                });
            });

        egui::TopBottomPanel::bottom("announcements")
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(self.announcement.as_str());
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let output = self.constellation.show(ui, &self.props);
                if let Some(hovered) = output.hovered {
                    tracing::trace!(?hovered, "hover changed");
                }
                if let Some(clicked) = output.clicked {
                    tracing::debug!(%clicked, "node clicked");
                    self.props.selected_id = Some(clicked);
                }
                self.announcement = output.announcement;
            });
    }

    fn draw_render_status(&self, ui: &mut egui::Ui) {
        let session = self.constellation.session();
        let profile = session.profile();
        ui.label(format!("tier: {}", session.quality().tier()))
            .on_hover_text(profile.reasons.join("\n"));
        match session.mode() {
            RenderMode::VectorFallback(reason) => {
                ui.label(format!("vector fallback ({reason})"));
            }
            mode => {
                ui.label(mode.label());
            }
        }
    }

    fn draw_layout_controls(&mut self, ui: &mut egui::Ui) {
        let has_layout = self.constellation.alpha().is_some();
        ui.add_enabled_ui(has_layout, |ui| {
            if ui.button("Reheat").clicked() {
                self.constellation.reheat();
            }
            let paused = self.constellation.is_paused();
            if ui.button(if paused { "Resume" } else { "Pause" }).clicked() {
                self.constellation.set_paused(!paused);
            }
            if ui.add_enabled(paused, egui::Button::new("Step")).clicked() {
                self.constellation.step();
            }
        });
        ui.toggle_value(&mut self.props.is_3d, "3D");
        ui.toggle_value(&mut self.props.show_links, "Links");
    }
}

use std::time::Instant;

use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Ui, WidgetInfo, WidgetType, vec2};

use crate::error::RenderError;
use crate::quality::LossVerdict;
use crate::render::{FallbackReason, FramePacket, paint_callback};
use crate::util::truncate_label;

use super::super::a11y;
use super::{Constellation, ConstellationOutput, ConstellationProps};

const LABEL_CHARS: usize = 28;

impl Constellation {
    pub fn show(&mut self, ui: &mut Ui, props: &ConstellationProps) -> ConstellationOutput {
        let now = Instant::now();
        self.selected_id.clone_from(&props.selected_id);
        self.set_dimensions(props.is_3d);
        self.absorb_paint_report(now);
        if self.session.mode.is_accelerated() && self.session.gpu.is_none() {
            self.degrade(FallbackReason::RenderFailure(RenderError::NoContext));
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.handle_camera_zoom(ui, &response);
        self.handle_pointer_drag(rect, &response);

        let mut output = ConstellationOutput::default();
        let pointer = ui.input(|input| input.pointer.hover_pos());
        let hovered_index = match &self.drag {
            Some(drag) => Some(drag.index),
            None => self.hovered_index(rect, pointer),
        };
        let hovered = hovered_index
            .and_then(|index| self.visible.nodes.get(index))
            .map(|node| node.id.clone());
        if hovered != self.hovered {
            output.hovered = Some(hovered.clone());
            self.hovered = hovered;
        }
        if response.clicked() {
            output.clicked.clone_from(&self.hovered);
        }

        let painter = ui.painter_at(rect);
        if self.session.mode.is_accelerated() {
            self.draw_accelerated(ui, &painter, rect, props, now);
        } else {
            self.last_frame = None;
            self.draw_fallback(&painter, rect, props);
        }

        output.announcement = a11y::announcement(&self.graph, props.selected_id.as_deref());
        let description = format!("{}. {}", props.aria_label, output.announcement);
        response.widget_info(|| WidgetInfo::labeled(WidgetType::Other, true, &description));

        if let Some(node) = self.hovered.as_deref().and_then(|id| self.visible.node(id)) {
            response.on_hover_text(a11y::node_label(node));
        }
        output
    }

    /// Consumes what the GPU reported since the last frame. Context loss is
    /// counted once per episode; any other render error is fatal to the
    /// accelerated path.
    fn absorb_paint_report(&mut self, now: Instant) {
        if !self.session.mode.is_accelerated() {
            return;
        }
        let Some(gpu) = &self.session.gpu else {
            return;
        };
        let report = gpu.lock().take_report();
        self.session.quality.record_draw_calls(report.draw_calls);

        if report.painted_frames > self.session.painted_frames {
            self.session.painted_frames = report.painted_frames;
            if self.session.context_lost && report.error.is_none() {
                self.session.context_lost = false;
                self.session.crash_guard.record_context_restored();
            }
        }

        match report.error {
            None => {}
            Some(RenderError::ContextLost) => {
                if self.session.context_lost {
                    return;
                }
                self.session.context_lost = true;
                if self.session.crash_guard.record_context_loss(now) == LossVerdict::Tripped {
                    self.degrade(FallbackReason::ContextInstability);
                }
            }
            Some(error) => {
                tracing::error!(%error, "accelerated render failed");
                self.degrade(FallbackReason::RenderFailure(error));
            }
        }
    }

    fn draw_accelerated(&mut self, ui: &Ui, painter: &Painter, rect: Rect, props: &ConstellationProps, now: Instant) {
        let dt = self
            .last_frame
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last_frame = Some(now);

        let (Some(bridge), Some(instances), Some(connections), Some(gpu)) = (
            self.bridge.as_mut(),
            self.instances.as_mut(),
            self.connections.as_mut(),
            self.session.gpu.clone(),
        ) else {
            return;
        };

        if bridge.poll() {
            let snapshot = bridge.positions();
            if !snapshot.is_empty() {
                instances.set_targets(&snapshot);
            }
            self.session.quality.record_tick_time(bridge.last_tick_time());
        }
        instances.set_highlight(self.selected_id.as_deref(), self.hovered.as_deref());

        let animate = props.animated && !self.session.crash_guard.should_reduce_quality(now);
        let moving = if animate {
            instances.advance(dt)
        } else {
            instances.snap();
            false
        };
        let lines = (props.show_links && !connections.is_empty()).then(|| {
            connections.refresh(instances);
            connections.packed()
        });

        painter.rect_filled(rect, 0.0, props.background);
        let (packed, instance_revision) = instances.packed();
        let packet = FramePacket {
            view_proj: self.camera.view_proj(rect.aspect_ratio()),
            instances: packed,
            instance_revision,
            lines,
        };
        painter.add(paint_callback(rect, gpu, packet));

        for index in [instances.selected(), instances.hovered()].into_iter().flatten() {
            let (Some(position), Some(node)) = (instances.displayed(index), self.visible.nodes.get(index)) else {
                continue;
            };
            let Some((screen, pixels_per_unit)) = self.camera.project(rect, position) else {
                continue;
            };
            let offset = instances.world_radius(index) * pixels_per_unit + 4.0;
            draw_label(painter, screen + vec2(0.0, offset), &node.label);
        }

        let repaint_pending = bridge.is_simulating() || moving || self.drag.is_some();
        if repaint_pending {
            ui.ctx().request_repaint();
        }

        if let Some(tier) = self.session.quality.record_frame(now, repaint_pending) {
            self.apply_demotion(tier);
        }
    }

    fn draw_fallback(&self, painter: &Painter, rect: Rect, props: &ConstellationProps) {
        let Some(fallback) = &self.fallback else {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Unable to display the constellation",
                FontId::proportional(14.0),
                Color32::from_gray(90),
            );
            return;
        };
        let hovered = self
            .hovered
            .as_deref()
            .and_then(|id| self.visible.nodes.iter().position(|node| node.id == id));
        fallback.paint(
            painter,
            rect,
            &self.visible,
            self.selected_index_in_visible(),
            hovered,
            props.show_links,
            props.background,
        );
    }
}

fn draw_label(painter: &Painter, anchor: Pos2, label: &str) {
    painter.text(
        anchor,
        Align2::CENTER_TOP,
        truncate_label(label, LABEL_CHARS),
        FontId::proportional(12.0),
        Color32::from_gray(60),
    );
}

use eframe::egui::{PointerButton, Pos2, Rect, Response, Ui};

use crate::layout::Dimensions;

use super::{Constellation, DragState};

/// Energy injected when a drag starts or ends.
const DRAG_REHEAT_ALPHA: f32 = 0.3;

impl Constellation {
    pub(super) fn handle_camera_zoom(&mut self, ui: &Ui, response: &Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }
        self.camera.zoom(scroll);
    }

    /// Primary drags on a node pin it under the pointer; on the background
    /// they orbit (3D) or pan (2D). Secondary and middle drags always pan.
    pub(super) fn handle_pointer_drag(&mut self, rect: Rect, response: &Response) {
        if response.drag_started_by(PointerButton::Primary) {
            self.begin_node_drag(rect, response);
        }

        if response.dragged_by(PointerButton::Primary) {
            if self.drag.is_some() {
                self.continue_node_drag(rect, response);
            } else if self.dimensions == Dimensions::Three {
                self.camera.orbit(response.drag_delta());
            } else {
                self.camera.pan(rect, response.drag_delta());
            }
        }

        if response.dragged_by(PointerButton::Secondary) || response.dragged_by(PointerButton::Middle) {
            self.camera.pan(rect, response.drag_delta());
        }

        if response.drag_stopped() {
            self.end_node_drag();
        }
    }

    pub(super) fn hovered_index(&self, rect: Rect, pointer: Option<Pos2>) -> Option<usize> {
        let pointer = pointer.filter(|pointer| rect.contains(*pointer))?;
        if let Some(instances) = &self.instances {
            return instances.pick(&self.camera, rect, pointer);
        }
        let fallback = self.fallback.as_ref()?;
        let selected = self.selected_index_in_visible();
        fallback.pick(rect, &self.visible, selected, pointer)
    }

    pub(super) fn selected_index_in_visible(&self) -> Option<usize> {
        let selected = self.selected_id.as_deref()?;
        self.visible.nodes.iter().position(|node| node.id == selected)
    }

    fn begin_node_drag(&mut self, rect: Rect, response: &Response) {
        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };
        let (Some(instances), Some(bridge)) = (self.instances.as_ref(), self.bridge.as_mut()) else {
            return;
        };
        let Some(index) = instances.pick(&self.camera, rect, pointer) else {
            return;
        };
        let (Some(id), Some(anchor)) = (instances.id(index), instances.displayed(index)) else {
            return;
        };

        bridge.pin_node(id, Some(anchor));
        bridge.reheat(DRAG_REHEAT_ALPHA);
        self.paused = false;
        self.drag = Some(DragState {
            index,
            id: id.to_owned(),
            anchor,
        });
    }

    fn continue_node_drag(&mut self, rect: Rect, response: &Response) {
        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };
        let (Some(drag), Some(instances), Some(bridge)) =
            (self.drag.as_mut(), self.instances.as_mut(), self.bridge.as_mut())
        else {
            return;
        };
        let Some(position) = self.camera.unproject_on_plane(rect, pointer, drag.anchor) else {
            return;
        };

        instances.place(drag.index, position);
        bridge.pin_node(&drag.id, Some(position));
        drag.anchor = position;
    }

    fn end_node_drag(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.pin_node(&drag.id, None);
            bridge.reheat(DRAG_REHEAT_ALPHA);
        }
    }
}

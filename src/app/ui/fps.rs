use super::super::ViewModel;

/// Samples averaged for the telemetry bar.
const AVERAGE_WINDOW: usize = 5;

impl ViewModel {
    pub(in crate::app) fn telemetry_text(&self) -> Option<String> {
        if !self.show_telemetry {
            return None;
        }

        let session = self.constellation.session();
        let quality = session.quality();
        let mut parts = Vec::new();

        match quality.latest() {
            Some(sample) => {
                parts.push(format!("FPS {:.0}", sample.fps));
                parts.push(format!("avg {:.1}", quality.average_fps(AVERAGE_WINDOW)));
                parts.push(format!("dropped {}", sample.dropped_frames));
                parts.push(format!("draws {}", sample.draw_calls));
                parts.push(format!("tick {:.1} ms", sample.tick_time.as_secs_f32() * 1000.0));
                if sample.tier != quality.tier() {
                    parts.push(format!("sampled at {}", sample.tier));
                }
            }
            None => parts.push("no samples".to_owned()),
        }
        if let Some(alpha) = self.constellation.alpha() {
            let state = if !self.constellation.is_layout_loaded() {
                "starting"
            } else if self.constellation.is_simulating() {
                "cooling"
            } else {
                "settled"
            };
            parts.push(format!("alpha {alpha:.3} {state}"));
        }
        let guard = session.crash_guard();
        if guard.loss_count() > 0 {
            let tripped = if guard.is_tripped() { ", tripped" } else { "" };
            parts.push(format!("context losses {}{tripped}", guard.loss_count()));
        }
        parts.push(format!("tier {}", quality.tier()));
        parts.push(session.mode().label().to_owned());

        Some(parts.join(" | "))
    }

    pub(in crate::app) fn visible_graph_text(&self) -> String {
        format!(
            "drawn: {} nodes / {} links",
            self.constellation.visible_node_count(),
            self.constellation.visible_link_count()
        )
    }
}

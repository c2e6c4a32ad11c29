use crate::store::feature::Feature;

use super::session::DrawTool;

/// The map the user draws on. It captures pointer input for the active tool and shows the
/// current features. It only ever receives snapshots, it never owns feature state.
pub trait MapViewport {
    /// Start capturing pointer input for `tool`.
    fn arm_draw(&mut self, tool: DrawTool);
    fn disarm_draw(&mut self);
    /// Make existing features draggable/editable, or stop doing so.
    fn set_editing(&mut self, enabled: bool);
    /// Make existing features pickable for deletion, or stop doing so.
    fn set_deleting(&mut self, enabled: bool);
    fn render(&mut self, features: &[Feature]);
    /// Move the view so that `bounds` (x = longitude, y = latitude) is visible.
    fn fit_bounds(&mut self, bounds: geo::Rect);
}

/// Viewport without a display, used by the command line. It logs what a map would show.
#[derive(Default)]
pub struct HeadlessViewport;

impl MapViewport for HeadlessViewport {
    fn arm_draw(&mut self, tool: DrawTool) {
        log::debug!("Capturing points for {:?}", tool);
    }

    fn disarm_draw(&mut self) {
        log::debug!("Stopped capturing points");
    }

    fn set_editing(&mut self, enabled: bool) {
        log::debug!("Editing {}", if enabled { "enabled" } else { "disabled" });
    }

    fn set_deleting(&mut self, enabled: bool) {
        log::debug!("Deleting {}", if enabled { "enabled" } else { "disabled" });
    }

    fn render(&mut self, features: &[Feature]) {
        let visible = features.iter().filter(|feature| feature.visible()).count();
        log::debug!("Rendering {} of {} features", visible, features.len());
    }

    fn fit_bounds(&mut self, bounds: geo::Rect) {
        let (min, max) = (bounds.min(), bounds.max());
        log::info!(
            "Imported features span lat {:.5}..{:.5}, lon {:.5}..{:.5}",
            min.y,
            max.y,
            min.x,
            max.x
        );
    }
}

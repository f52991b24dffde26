use crate::figure::builder::{FEATURE_MENU, TOGGLE_MENU};
use crate::figure::{Figure, MenuKind, UpdateMenu};
use crate::plot3d::camera::OrbitalCamera;

/// Interactive view over an immutable, already-built figure.
///
/// Control presses re-style the displayed copy; the built figure is kept
/// as is. The camera survives every press as long as the layout's
/// `uirevision` key stays the same.
#[derive(Debug, Clone)]
pub struct FigureView {
    built: Figure,
    displayed: Figure,
    /// Active button per menu; `None` is a released toggle.
    active: Vec<Option<usize>>,
    pub camera: OrbitalCamera,
}

impl FigureView {
    pub fn new(figure: Figure) -> Self {
        let active = figure.layout.updatemenus.iter().map(|m| Some(m.active)).collect();
        Self {
            displayed: figure.clone(),
            built: figure,
            active,
            camera: OrbitalCamera::default(),
        }
    }

    /// The figure as currently displayed.
    pub fn figure(&self) -> &Figure {
        &self.displayed
    }

    pub fn menus(&self) -> &[UpdateMenu] {
        &self.built.layout.updatemenus
    }

    pub fn active_button(&self, menu: usize) -> Option<usize> {
        self.active.get(menu).copied().flatten()
    }

    /// Label of the feature currently coloring the backbone.
    pub fn selected_feature(&self) -> Option<&str> {
        let menu = self.menus().get(FEATURE_MENU)?;
        let button = menu.buttons.get(self.active_button(FEATURE_MENU)?)?;
        Some(button.label.as_str())
    }

    /// Same as pressing the surface toggle button.
    pub fn toggle_surface(&mut self) {
        self.press(TOGGLE_MENU, 0);
    }

    /// Press button `button` of menu `menu`.
    ///
    /// Dropdown entries apply their `args`. A button carrying `args2`
    /// behaves as a toggle: pressed while active it applies `args2` and
    /// releases, otherwise it applies `args` and becomes active.
    pub fn press(&mut self, menu: usize, button: usize) {
        let Some(menu_def) = self.built.layout.updatemenus.get(menu) else {
            tracing::warn!("No control menu {menu}");
            return;
        };
        let Some(button_def) = menu_def.buttons.get(button) else {
            tracing::warn!("No button {button} in control menu {menu}");
            return;
        };

        let currently_active = self.active.get(menu).copied().flatten() == Some(button);
        let (args, now_active) = match (&button_def.args2, menu_def.kind) {
            (Some(args2), MenuKind::Buttons) if currently_active => (args2, None),
            _ => (&button_def.args, Some(button)),
        };

        let next = self.displayed.apply_update(args);
        if next.layout.uirevision != self.displayed.layout.uirevision {
            self.camera.reset();
        }
        tracing::debug!("Control '{}' pressed (menu {menu})", button_def.label);

        self.displayed = next;
        if let Some(slot) = self.active.get_mut(menu) {
            *slot = now_active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::{ColumnTable, FeatureTable, SurfaceCloud};
    use crate::figure::builder::{build_chromosome_figure, FigureStyle, BACKBONE_TRACE, SURFACE_TRACE};

    fn view() -> FigureView {
        let features = FeatureTable::new(
            ColumnTable::new(
                vec!["x", "y", "z", "a", "b"].into_iter().map(String::from).collect(),
                vec![
                    vec![0.0, 1.0, 2.0],
                    vec![0.0, 1.0, 0.0],
                    vec![0.0, 0.0, 1.0],
                    vec![-1.0, 0.0, 1.0],
                    vec![2.0, 0.5, -0.5],
                ],
            )
            .unwrap(),
        )
        .unwrap();
        let surface = SurfaceCloud { x: vec![3.0, -3.0], y: vec![0.0, 0.0], z: vec![0.0, 0.0] };
        let fig = build_chromosome_figure(&features, &surface, &["a", "b"], &FigureStyle::default()).unwrap();
        FigureView::new(fig)
    }

    #[test]
    fn test_toggle_cycles_surface_visibility() {
        let mut v = view();
        assert_eq!(v.active_button(TOGGLE_MENU), Some(0));

        v.press(TOGGLE_MENU, 0);
        assert!(!v.figure().data[SURFACE_TRACE].visible);
        assert!(v.figure().data[BACKBONE_TRACE].visible);
        assert_eq!(v.active_button(TOGGLE_MENU), None);

        v.press(TOGGLE_MENU, 0);
        assert!(v.figure().data[SURFACE_TRACE].visible);
        assert_eq!(v.active_button(TOGGLE_MENU), Some(0));

        v.press(TOGGLE_MENU, 0);
        assert!(!v.figure().data[SURFACE_TRACE].visible);
        assert!(v.figure().data[BACKBONE_TRACE].visible);
    }

    #[test]
    fn test_camera_survives_controls() {
        let mut v = view();
        v.camera.rotate(0.7, -0.2);
        v.camera.zoom(0.5);
        let before = (v.camera.azimuth, v.camera.elevation, v.camera.distance);

        v.press(FEATURE_MENU, 1);
        v.press(TOGGLE_MENU, 0);
        v.press(TOGGLE_MENU, 0);
        v.press(FEATURE_MENU, 0);

        assert_eq!((v.camera.azimuth, v.camera.elevation, v.camera.distance), before);
    }

    #[test]
    fn test_dropdown_selection_keeps_other_state() {
        let mut v = view();
        v.press(TOGGLE_MENU, 0);
        v.press(FEATURE_MENU, 1);

        let line = v.figure().data[BACKBONE_TRACE].line.as_ref().unwrap();
        assert_eq!(line.color, vec![2.0, 0.5, -0.5]);
        assert_eq!((line.cmin, line.cmax), (-1.0, 2.0));
        assert!(!v.figure().data[SURFACE_TRACE].visible);
        assert_eq!(v.active_button(FEATURE_MENU), Some(1));
        assert_eq!(v.figure().layout, view().figure().layout);
    }

    #[test]
    fn test_selected_feature_follows_dropdown() {
        let mut v = view();
        assert_eq!(v.selected_feature(), Some("A"));
        v.press(FEATURE_MENU, 1);
        assert_eq!(v.selected_feature(), Some("B"));
    }

    #[test]
    fn test_toggle_surface_matches_button() {
        let mut v = view();
        v.toggle_surface();
        assert!(!v.figure().data[SURFACE_TRACE].visible);
        assert_eq!(v.active_button(TOGGLE_MENU), None);
        v.toggle_surface();
        assert!(v.figure().data[SURFACE_TRACE].visible);
    }

    #[test]
    fn test_out_of_range_press_is_ignored() {
        let mut v = view();
        v.press(7, 0);
        v.press(FEATURE_MENU, 9);
        assert_eq!(v.figure(), view().figure());
    }
}

use egui::{Color32, Visuals};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn visuals(&self) -> Visuals {
        match self {
            Theme::Dark => Visuals::dark(),
            Theme::Light => Visuals::light(),
        }
    }

    /// Page color behind the scene; shows through transparent figure backgrounds.
    pub fn page_bg(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgb(17, 17, 17),
            Theme::Light => Color32::from_rgb(250, 250, 250),
        }
    }

    pub fn heading_color(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::WHITE,
            Theme::Light => Color32::from_rgb(30, 30, 30),
        }
    }

    /// Legend text for traces that are currently hidden.
    pub fn hidden_text(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_gray(110),
            Theme::Light => Color32::from_gray(160),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::Dark => "Dark",
            Theme::Light => "Light",
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Dark
    }
}

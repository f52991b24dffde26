pub mod app_state;
pub mod figure_view;
pub mod theme;

pub mod date_form;
pub mod log_panel;
pub mod results_grid;

pub use date_form::DateForm;
pub use log_panel::LogPanel;
pub use results_grid::ResultsGrid;

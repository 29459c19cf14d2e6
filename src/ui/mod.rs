pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::{lesson_icon, Icons};
pub use output::{header, info, muted, section, success, summary_row, warn};
pub use table::{render, stats_table, TableBuilder};
pub use theme::{theme, Theme};

pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{check, dim, error, header, info, record, records, section, success, warn};
pub use table::{stats_table, TableBuilder};
pub use theme::{theme, Theme};

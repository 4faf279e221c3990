pub mod aggregate;
mod catalog;
mod filter;
pub mod model;
mod tree;

pub use aggregate::{aggregate, BucketStat, Dimension, DimensionStats, ReportStats};
pub use catalog::ReportKind;
pub use filter::{parse_date, ReportFilter, SortOrder};
pub use model::{CellValue, ColumnResolver, GroupNode, GroupTotals, LeafRow, ReportNodes, RowShape};
pub use tree::{flatten, is_grouped_data, parse_nodes, table_cells, DisplayRow, ExpansionState};

//! Detection products: groups, tables, column roles and rows.

pub mod columns;
pub mod metadata;
pub mod product;
pub mod rows;
pub mod table;

pub use columns::ColumnRoles;
pub use metadata::{DeploymentMetadata, MetadataFields, MetadataIndex, SiteMetadata};
pub use product::{ProductGroup, choose_best_files, deployment_from_set, find_group_for_set};
pub use rows::{DetectionRow, read_all_rows, read_detection_rows};
pub use table::CsvTable;

pub mod aggregate;
pub mod config;
pub mod histogram;
pub mod model;
pub mod report;
pub mod report_export;
pub mod survival;
pub mod table_parse;

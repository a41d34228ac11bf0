//! I/O module
//!
//! Handles scenario parsing, replay, and report output.
//!
//! # Components
//!
//! - `scenario` - Scenario file format (record conversion, streaming reader)
//! - `replay` - Drives scenario steps against a bank
//! - `report` - Balance report serialization

pub mod replay;
pub mod report;
pub mod scenario;

pub use replay::{run_scenario, ReplayDriver, ReplaySummary};
pub use report::write_balance_report;
pub use scenario::{convert_scenario_record, ScenarioOp, ScenarioReader, ScenarioRecord};

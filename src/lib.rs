//! Reader for seasonal `__Record` ranking workbooks and the master
//! extracts compiled from them.

pub mod catalog;
pub mod config;
pub mod error;
pub mod hype;
pub mod master;
pub mod models;
pub mod normalize;
pub mod ranking;
pub mod record;
pub mod report;
pub mod roster;
pub mod schema;
pub mod season;
pub mod version;
pub mod workbook;

pub use error::{CompileError, ParseWarning, RankingError, RecordError, WorkbookError};
pub use models::{EpisodeRecord, HypeList, SeasonRecord, ShowKey, ShowRecord, WeekRankingSheet};
pub use record::{load_record, open_record};
pub use season::{Season, SeasonIdentity, SeasonIndex};
pub use version::RecordVersion;
pub use workbook::{CalamineOpener, MemoryWorkbook, TableSource, WorkbookOpener};

use chrono::NaiveDate;

use crate::config::Config;

pub mod r#do;
pub mod item;
pub mod process;
pub mod recur;

/// Settings every command needs besides the repository.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub json: bool,
    pub today: NaiveDate,
}

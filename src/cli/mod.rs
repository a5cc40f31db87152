mod command;
mod runner;
mod util;

pub use command::Command;
pub use runner::{OutputMode, run, run_with_format};
pub use util::{parse_import_format, parse_index_keys, parse_index_kind};

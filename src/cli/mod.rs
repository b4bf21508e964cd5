mod extract;
mod r#match;
mod search;

pub use extract::*;
pub use r#match::*;
pub use search::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> anyhow::Result<()>;
}

//! Rolldown plugins backing the default pipeline stages.

mod externals;
mod json;
mod replace;

pub(crate) use externals::ExternalsPlugin;
pub(crate) use json::{JsonMode, JsonPlugin};
pub(crate) use replace::ReplacePlugin;

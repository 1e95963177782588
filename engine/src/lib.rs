use crate::poet::PoemGenerator;

pub mod acquisition;
pub mod data_uri;
pub mod export;
pub mod poet;
pub mod session;

pub type PoetBox = Box<dyn PoemGenerator + Send + Sync>;
pub const CLAUDE_MODEL: &str = "claude-sonnet-4-5";

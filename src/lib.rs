mod config;
mod error;
mod locate;
mod node;
mod normalize;
mod patch;
mod storage;
mod table;
mod translate;
mod wrap;

pub use crate::config::{Config, CONFIG_PATH};
pub use crate::error::{Error, Result};
pub use crate::locate::{find_translation, original_strings_set, MAX_DISTANCE};
pub use crate::node::{KagParser, Scenario, ScenarioParser, ScriptNode};
pub use crate::normalize::normalize;
pub use crate::patch::{apply_translation, PatchOutcome, PatchShape};
pub use crate::storage::{FsStorage, Storage};
pub use crate::table::{decode_dict, decode_rows, encode_rows, TranslationEntry};
pub use crate::translate::{OffsetChange, RefreshUi, Translator};
pub use crate::wrap::{wrap, WrapStyle, LINE_BREAK};

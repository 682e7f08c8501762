pub mod claude;
pub mod error;
pub mod parse;
pub mod provider;
pub mod text;

pub use claude::Claude;
pub use error::{CompletionError, Result};
pub use parse::{parse_completion, ParseError};
pub use provider::{CompletionProvider, CompletionRequest};
pub use text::truncate_utf8;

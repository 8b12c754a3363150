pub mod due;
pub mod shell;
pub mod task_parser;

pub use due::{DueParseError, parse_due};
pub use shell::{UnterminatedQuote, split_line};
pub use task_parser::{merge_tags, normalize_tag, parse_title_and_tags};

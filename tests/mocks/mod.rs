pub mod captions;
pub mod completions;
pub mod quotes;

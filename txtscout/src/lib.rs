pub mod config;
pub mod errors;
pub mod filters;
pub mod results;
pub mod search;
pub mod walker;

pub use config::{CliOverrides, EncodingMode, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use results::{SearchOutput, TaskFailure};
pub use search::{search, search_files};
pub use walker::{enumerate_files, FileHandle};

pub mod executor;
pub mod harvest;
pub mod lang;
pub mod locale;
pub mod message;
pub mod model;
pub mod traits;

// Re-export common types for convenience
pub use executor::*;
pub use harvest::{extract, BlockStream, CancelToken, ExtractPipeline, Options};
pub use lang::{BlockRule, CommentLexer, Language, LanguageRegistry};
pub use locale::{Localizer, Message, MessageKey};
pub use message::{Cause, ErrorRecord, Handler, ValidationError};
pub use model::*;
pub use traits::*;

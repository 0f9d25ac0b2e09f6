/// Data models for vocl-service
///
/// Database entities derive `sqlx::FromRow`; enum-like columns are stored as
/// text and exposed through typed accessors. Request DTOs carry `validator`
/// rules checked by handlers before services run.
pub mod engagement;
pub mod media;
pub mod notification;
pub mod post;
pub mod profile;
pub mod report;
pub mod search;

pub use engagement::*;
pub use media::*;
pub use notification::*;
pub use post::*;
pub use profile::*;
pub use report::*;
pub use search::*;


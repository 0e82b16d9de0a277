pub mod day;
pub mod draft;
pub mod paste;

pub use day::{bucket, bucket_local, DayKey};
pub use draft::Draft;
pub use paste::{classify, Insertion, PasteKind};

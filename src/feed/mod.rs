//! The feed core: viewer lookup, page fetching and the assembler that merges
//! paginated history with realtime inserts.

pub mod assembler;
pub mod fetcher;
pub mod state;
pub mod viewer;

pub use assembler::{FeedAssembler, LoadOutcome, POSTS_TABLE};
pub use fetcher::{PageFetcher, feed_order};
pub use state::{Completion, FeedPhase, FeedSnapshot};
pub use viewer::ViewerLookup;

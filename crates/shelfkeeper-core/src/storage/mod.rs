pub mod snapshot;

pub use snapshot::{LibrarySnapshot, load_snapshot, save_snapshot};

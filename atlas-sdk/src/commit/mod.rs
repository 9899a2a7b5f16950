pub mod listener;

pub use listener::{CommitListener, CommitListenerSet};

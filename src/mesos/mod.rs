mod client;
mod snapshot;
mod state;

pub use client::Client;
pub use snapshot::Snapshot;
pub use state::{Framework, Resources, Slave, State, Task};

mod config;
mod dispatcher;
mod events;
mod link;
mod maintainer;
mod memory;
mod playlist;
mod snapshot;
mod track;

pub use config::*;
pub use dispatcher::*;
pub use events::*;
pub use link::*;
pub use maintainer::*;
pub use memory::*;
pub use playlist::*;
pub use snapshot::*;
pub use track::*;

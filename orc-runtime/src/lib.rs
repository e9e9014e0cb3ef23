//! The three reconciliation loops and the watch multiplexer they (and the REST surface)
//! share: a kind-keyed broadcast over one underlying `orc_store::Store::watch` each,
//! handed to whichever loop needs that kind's stream.
pub mod endpoints;
pub mod replication;
pub mod scheduler;
pub mod watch;

pub use endpoints::EndpointsController;
pub use replication::ReplicationControllerManager;
pub use scheduler::Scheduler;
pub use watch::WatchMultiplexer;

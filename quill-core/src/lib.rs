//! quill-core: database connection bootstrap
//!
//! - [`descriptor`]: validated `postgres://` connection targets
//! - [`resolver`]: best-effort hostname to IPv4 rewriting
//! - [`bootstrap`]: retrying coordinator that publishes one validated pool
//!
//! Nothing here depends on a database driver. The server crate plugs sqlx in
//! through [`Connector`].

pub mod bootstrap;
pub mod descriptor;
pub mod resolver;

pub use bootstrap::{
    Bootstrap, BootstrapError, BootstrapState, Clock, Connector, RetryPolicy, SchemaReport,
    TokioClock,
};
pub use descriptor::{ConnectionDescriptor, DescriptorError, DescriptorParts};
pub use resolver::{ConnectionResolver, HostLookup, SystemLookup};

pub mod error;
pub mod paths;
pub mod settings;
pub mod connector;
pub mod topology;
pub mod fileset;
pub mod symlink;
pub mod host_path;
pub mod bootstrap;
pub mod driver;
pub mod logging;

pub use bootstrap::{BootstrapOrchestrator, ResolvedTopology};
pub use connector::{ClusterConnector, ConnectorError, ConnectorFactory};
pub use error::{BootstrapError, ScaleError, ScaleResult, Stage};
pub use settings::{ClusterConfig, PrimaryConfig, ScaleConfig};

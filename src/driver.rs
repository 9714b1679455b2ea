//! Driver identity and capability registry built on top of the bootstrap.
//! The gRPC identity/controller/node services read from `ScaleDriver`; this
//! module only decides what they advertise and which requests they accept.

use std::sync::Arc;

use tracing::debug;

use crate::bootstrap::{BootstrapOrchestrator, ResolvedTopology};
use crate::error::{BootstrapError, ScaleError, ScaleResult, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeAccessMode {
    SingleNodeWriter,
    SingleNodeReaderOnly,
    MultiNodeReaderOnly,
    MultiNodeSingleWriter,
    MultiNodeMultiWriter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerCapability {
    Unknown,
    CreateDeleteVolume,
    PublishUnpublishVolume,
    ListVolumes,
    GetCapacity,
    CreateDeleteSnapshot,
    ExpandVolume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCapability {
    Unknown,
    StageUnstageVolume,
    GetVolumeStats,
    ExpandVolume,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub volume_access_modes: Vec<VolumeAccessMode>,
    pub controller: Vec<ControllerCapability>,
    pub node: Vec<NodeCapability>,
}

impl Capabilities {
    /// What the plugin supports on a clustered filesystem.
    pub fn scale_defaults() -> Self {
        let caps = Self {
            volume_access_modes: vec![VolumeAccessMode::MultiNodeMultiWriter],
            controller: vec![ControllerCapability::CreateDeleteVolume, ControllerCapability::PublishUnpublishVolume],
            node: vec![NodeCapability::StageUnstageVolume],
        };
        for m in &caps.volume_access_modes {
            debug!(target: "scale_csi::driver", "enabling volume access mode: {:?}", m);
        }
        for c in &caps.controller {
            debug!(target: "scale_csi::driver", "enabling controller service capability: {:?}", c);
        }
        for n in &caps.node {
            debug!(target: "scale_csi::driver", "enabling node service capability: {:?}", n);
        }
        caps
    }
}

#[derive(Debug, Clone)]
pub struct ScaleDriver {
    name: String,
    vendor_version: String,
    node_id: String,
    topology: Arc<ResolvedTopology>,
    capabilities: Capabilities,
}

impl ScaleDriver {
    /// Run the bootstrap and register capabilities. A missing driver name is
    /// rejected before any management-API call is made.
    pub async fn setup(
        name: &str,
        vendor_version: &str,
        node_id: &str,
        orchestrator: BootstrapOrchestrator,
    ) -> Result<Self, BootstrapError> {
        debug!(target: "scale_csi::driver", "setup driver name={} version={} node_id={}", name, vendor_version, node_id);
        if name.trim().is_empty() {
            return Err(BootstrapError::new(Stage::ConfigValidation, ScaleError::config("driver name missing")));
        }
        let topology = orchestrator.run().await?;
        Ok(Self {
            name: name.to_string(),
            vendor_version: vendor_version.to_string(),
            node_id: node_id.to_string(),
            topology: Arc::new(topology),
            capabilities: Capabilities::scale_defaults(),
        })
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn vendor_version(&self) -> &str { &self.vendor_version }

    pub fn node_id(&self) -> &str { &self.node_id }

    pub fn topology(&self) -> Arc<ResolvedTopology> { self.topology.clone() }

    pub fn capabilities(&self) -> &Capabilities { &self.capabilities }

    /// Accept `Unknown` and any enabled controller capability.
    pub fn validate_controller_service_request(&self, cap: ControllerCapability) -> ScaleResult<()> {
        if cap == ControllerCapability::Unknown || self.capabilities.controller.contains(&cap) {
            return Ok(());
        }
        Err(ScaleError::invalid_argument(format!("invalid controller service request: {:?}", cap)))
    }
}

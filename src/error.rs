//! Unified bootstrap error model and mapping helpers.
//! `ScaleError` is the taxonomy every stage reports in; `BootstrapError` tags it
//! with the stage that produced it so startup logs say where things went wrong.

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::connector::ConnectorError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaleError {
    /// Structurally invalid or incomplete declaration, or missing environment.
    #[error("config_error: {0}")]
    Config(String),
    /// A management-API call could not be completed.
    #[error("connectivity_error: {0}")]
    Connectivity(String),
    /// Identity mismatch, unmounted filesystem or host-path containment violation.
    #[error("consistency_error: {0}")]
    Consistency(String),
    /// Fileset exists in a state the bootstrap does not know how to converge.
    #[error("resource_state_error: {0}")]
    ResourceState(String),
    #[error("invalid_argument: {0}")]
    InvalidArgument(String),
}

impl ScaleError {
    pub fn config<S: Into<String>>(msg: S) -> Self { ScaleError::Config(msg.into()) }
    pub fn connectivity<S: Into<String>>(msg: S) -> Self { ScaleError::Connectivity(msg.into()) }
    pub fn consistency<S: Into<String>>(msg: S) -> Self { ScaleError::Consistency(msg.into()) }
    pub fn resource_state<S: Into<String>>(msg: S) -> Self { ScaleError::ResourceState(msg.into()) }
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self { ScaleError::InvalidArgument(msg.into()) }

    pub fn code_str(&self) -> &'static str {
        match self {
            ScaleError::Config(_) => "config_error",
            ScaleError::Connectivity(_) => "connectivity_error",
            ScaleError::Consistency(_) => "consistency_error",
            ScaleError::ResourceState(_) => "resource_state_error",
            ScaleError::InvalidArgument(_) => "invalid_argument",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ScaleError::Config(m)
            | ScaleError::Connectivity(m)
            | ScaleError::Consistency(m)
            | ScaleError::ResourceState(m)
            | ScaleError::InvalidArgument(m) => m.as_str(),
        }
    }

    /// Map to the gRPC status name the CSI transport should answer with.
    pub fn grpc_code(&self) -> &'static str {
        match self {
            ScaleError::Config(_) => "FailedPrecondition",
            ScaleError::Connectivity(_) => "Unavailable",
            ScaleError::Consistency(_) => "FailedPrecondition",
            ScaleError::ResourceState(_) => "Internal",
            ScaleError::InvalidArgument(_) => "InvalidArgument",
        }
    }
}

impl From<ConnectorError> for ScaleError {
    fn from(err: ConnectorError) -> Self {
        ScaleError::Connectivity(err.to_string())
    }
}

pub type ScaleResult<T> = Result<T, ScaleError>;

/// Bootstrap step that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    HostPathSource,
    ConfigValidation,
    ConnectorSetup,
    TopologyResolution,
    PrimaryFileset,
    HostPathValidation,
    SymlinkNamespace,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::HostPathSource => "host_path_source",
            Stage::ConfigValidation => "config_validation",
            Stage::ConnectorSetup => "connector_setup",
            Stage::TopologyResolution => "topology_resolution",
            Stage::PrimaryFileset => "primary_fileset",
            Stage::HostPathValidation => "host_path_validation",
            Stage::SymlinkNamespace => "symlink_namespace",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bootstrap failed during {stage}: {source}")]
pub struct BootstrapError {
    pub stage: Stage,
    #[source]
    pub source: ScaleError,
}

impl BootstrapError {
    pub fn new(stage: Stage, source: ScaleError) -> Self { Self { stage, source } }
}

/// Attach a stage to a stage-local result.
pub trait StageExt<T> {
    fn at_stage(self, stage: Stage) -> Result<T, BootstrapError>;
}

impl<T> StageExt<T> for ScaleResult<T> {
    fn at_stage(self, stage: Stage) -> Result<T, BootstrapError> {
        self.map_err(|e| BootstrapError::new(stage, e))
    }
}

//! Declared cluster intent (`anywhere.eks.amazonaws.com/v1alpha1`)

pub mod bundles;
pub mod cloudstack;
pub mod cluster;
pub mod docker;
pub mod identity;
pub mod nutanix;
pub mod vsphere;

pub use bundles::*;
pub use cloudstack::*;
pub use cluster::*;
pub use docker::*;
pub use identity::*;
pub use nutanix::*;
pub use vsphere::*;

/// API group of the declared objects
pub const GROUP: &str = "anywhere.eks.amazonaws.com";

/// API version (`group/version`) of the declared objects
pub const API_VERSION: &str = "anywhere.eks.amazonaws.com/v1alpha1";

/// Kind names of the declared objects, as they appear in `Ref::kind`
pub mod kinds {
    pub const CLUSTER: &str = "Cluster";
    pub const VSPHERE_DATACENTER_CONFIG: &str = "VSphereDatacenterConfig";
    pub const VSPHERE_MACHINE_CONFIG: &str = "VSphereMachineConfig";
    pub const CLOUDSTACK_DATACENTER_CONFIG: &str = "CloudStackDatacenterConfig";
    pub const CLOUDSTACK_MACHINE_CONFIG: &str = "CloudStackMachineConfig";
    pub const DOCKER_DATACENTER_CONFIG: &str = "DockerDatacenterConfig";
    pub const NUTANIX_DATACENTER_CONFIG: &str = "NutanixDatacenterConfig";
    pub const NUTANIX_MACHINE_CONFIG: &str = "NutanixMachineConfig";
    pub const AWS_IAM_CONFIG: &str = "AWSIamConfig";
    pub const OIDC_CONFIG: &str = "OIDCConfig";
}

/// Machine configs carry the SSH users provisioned on their machines
pub trait MachineConfig {
    /// SSH users declared for machines of this config
    fn users(&self) -> &[UserConfiguration];
}

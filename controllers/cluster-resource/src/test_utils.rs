//! Test utilities for unit testing the fetcher and reconciler
//!
//! Fixtures describe one cluster, `default/prod`, with one worker group
//! `md-0`. The `seed_*` helpers load the declared config and the matching
//! live cluster-api objects into a `MockResourceClient`, so a reconcile pass
//! over an unchanged declared config reuses every live template name.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use crds::anywhere::{
    kinds, AWSIamConfig, AWSIamConfigSpec, Bundles, BundlesRef, BundlesSpec, CloudStackAvailabilityZone,
    CloudStackDatacenterConfig, CloudStackDatacenterConfigSpec, CloudStackMachineConfig, CloudStackMachineConfigSpec,
    CloudStackResourceDiskOffering, CloudStackResourceIdentifier, CloudStackZone, Cluster,
    ClusterSpec as DeclaredClusterSpec, ControlPlaneConfiguration, DockerDatacenterConfig, EksDRelease,
    ExternalEtcdConfiguration, Image, MapRoles, NutanixDatacenterConfig, NutanixDatacenterConfigSpec, NutanixMachineConfig,
    NutanixMachineConfigSpec, NutanixResourceIdentifier, Release, ReleaseSpec, Taint, UserConfiguration,
    VSphereDatacenterConfig, VSphereDatacenterConfigSpec, VSphereMachineConfig, VSphereMachineConfigSpec, VersionsBundle,
    WorkerNodeGroupConfiguration,
};
use crds::capi::{
    self, Bootstrap, CloudStackClusterSpec, CloudStackDiskOffering, CloudStackFailureDomainSpec, CloudStackMachineSpec,
    CloudStackMachineTemplate, CloudStackZoneSpec, DockerMachineSpec, NutanixMachineSpec, NutanixMachineTemplate,
    SecretReference, DockerMachineTemplate, EtcdadmCluster, EtcdadmClusterSpec, EtcdadmConfigSpec, JoinConfiguration,
    KubeadmConfigSpec, KubeadmConfigTemplate, KubeadmControlPlane, KubeadmControlPlaneMachineTemplate,
    KubeadmControlPlaneSpec, MachineDeployment, MachineDeploymentSpec, MachineSpec, MachineTemplateSpec, NetworkDeviceSpec,
    NetworkSpec, NodeRegistrationOptions, User, VSphereMachineSpec, VSphereMachineTemplate,
};
use crds::{ObjectReference, Ref, CLUSTER_NAME_LABEL, EKSA_SYSTEM_NAMESPACE};
use kube::Resource;
use resource_client::MockResourceClient;
use tracing::Span;

use crate::fetcher::ResourceFetcher;
use crate::mapping::{cloudstack_annotation, format_node_labels, format_symlinks, NODE_LABELS_ARG};
use crate::names::NowFn;
use crate::reconciler::Reconciler;
use crate::render::JinjaManifestRenderer;
use crate::spec::BundleSpecBuilder;
use crate::template::bootstrap_users;
use crate::updater::ResourceUpdater;

pub const CLUSTER_NAME: &str = "prod";
pub const CLUSTER_NAMESPACE: &str = "default";
pub const KUBE_VERSION_TAG: &str = "v1.27.1-eks-1-27-4";
pub const KIND_NODE_IMAGE: &str = "public.ecr.aws/eks-anywhere/kind/node:v1.27.1-eks-d-1-27-4";

pub const DATACENTER_NAME: &str = "prod-dc";
pub const CONTROL_PLANE_MACHINE_CONFIG: &str = "prod-cp";
pub const ETCD_MACHINE_CONFIG: &str = "prod-etcd";
pub const WORKER_MACHINE_CONFIG: &str = "prod-worker";

pub const CONTROL_PLANE_TEMPLATE: &str = "prod-control-plane-template-1000";
pub const ETCD_TEMPLATE: &str = "prod-etcd-template-1000";
pub const WORKER_TEMPLATE: &str = "prod-md-0-1000";
pub const KUBEADM_CONFIG_TEMPLATE: &str = "prod-md-0-template-1000";
pub const MACHINE_DEPLOYMENT: &str = "prod-md-0";

pub const INFRASTRUCTURE_API_VERSION: &str = "infrastructure.cluster.x-k8s.io/v1beta1";

/// Set the namespace of a typed object
pub fn namespaced<K: Resource>(mut obj: K, namespace: &str) -> K {
    obj.meta_mut().namespace = Some(namespace.to_string());
    obj
}

/// Clock that always reads `millis`
pub fn fixed_clock(millis: i64) -> NowFn {
    Arc::new(move || Utc.timestamp_millis_opt(millis).unwrap())
}

/// Clock that moves one second forward on every read
pub fn advancing_clock(start_millis: i64) -> NowFn {
    let next = Arc::new(AtomicI64::new(start_millis));
    Arc::new(move || {
        let millis = next.fetch_add(1000, Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis).unwrap()
    })
}

pub fn fetcher(mock: &MockResourceClient) -> ResourceFetcher {
    ResourceFetcher::new(Arc::new(mock.clone()), Arc::new(BundleSpecBuilder))
}

pub fn reconciler(mock: &MockResourceClient, now: NowFn) -> Reconciler {
    let client = Arc::new(mock.clone());
    Reconciler::new(
        Arc::new(ResourceFetcher::new(client.clone(), Arc::new(BundleSpecBuilder))),
        ResourceUpdater::new(client),
        Arc::new(JinjaManifestRenderer::new().unwrap()),
        now,
        Span::none(),
    )
}

// Declared config

pub fn users() -> Vec<UserConfiguration> {
    vec![UserConfiguration {
        name: "capv".to_string(),
        ssh_authorized_keys: vec!["ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC admin@example.com".to_string()],
    }]
}

pub fn worker_group() -> WorkerNodeGroupConfiguration {
    WorkerNodeGroupConfiguration {
        name: "md-0".to_string(),
        count: Some(3),
        machine_group_ref: Some(Ref::new(kinds::VSPHERE_MACHINE_CONFIG, WORKER_MACHINE_CONFIG)),
        taints: vec![Taint {
            key: "dedicated".to_string(),
            value: "gpu".to_string(),
            effect: "NoSchedule".to_string(),
        }],
        labels: BTreeMap::from([("tier".to_string(), "web".to_string())]),
    }
}

/// Self-managed vSphere cluster with stacked etcd
pub fn vsphere_cluster() -> Cluster {
    namespaced(
        Cluster::new(
            CLUSTER_NAME,
            DeclaredClusterSpec {
                kubernetes_version: "1.27".to_string(),
                control_plane_configuration: ControlPlaneConfiguration {
                    count: 3,
                    machine_group_ref: Some(Ref::new(kinds::VSPHERE_MACHINE_CONFIG, CONTROL_PLANE_MACHINE_CONFIG)),
                    ..Default::default()
                },
                worker_node_group_configurations: vec![worker_group()],
                datacenter_ref: Ref::new(kinds::VSPHERE_DATACENTER_CONFIG, DATACENTER_NAME),
                bundles_ref: Some(BundlesRef {
                    name: "bundles-1".to_string(),
                    namespace: EKSA_SYSTEM_NAMESPACE.to_string(),
                    api_version: String::new(),
                }),
                ..Default::default()
            },
        ),
        CLUSTER_NAMESPACE,
    )
}

pub fn with_external_etcd(mut cluster: Cluster) -> Cluster {
    cluster.spec.external_etcd_configuration = Some(ExternalEtcdConfiguration {
        count: 3,
        machine_group_ref: Some(Ref::new(kinds::VSPHERE_MACHINE_CONFIG, ETCD_MACHINE_CONFIG)),
    });
    cluster
}

pub fn managed_by(mut cluster: Cluster, management: &str) -> Cluster {
    cluster.spec.management_cluster.name = management.to_string();
    cluster
}

pub fn vsphere_datacenter() -> VSphereDatacenterConfig {
    namespaced(
        VSphereDatacenterConfig::new(
            DATACENTER_NAME,
            VSphereDatacenterConfigSpec {
                datacenter: "SDDC-Datacenter".to_string(),
                network: "/SDDC-Datacenter/network/sddc-cgw-network-1".to_string(),
                server: "vcenter.example.com".to_string(),
                thumbprint: "AB:CD:EF".to_string(),
                insecure: false,
            },
        ),
        CLUSTER_NAMESPACE,
    )
}

pub fn vsphere_machine(name: &str, num_cpus: i32) -> VSphereMachineConfig {
    namespaced(
        VSphereMachineConfig::new(
            name,
            VSphereMachineConfigSpec {
                disk_gib: 25,
                datastore: "/SDDC-Datacenter/datastore/WorkloadDatastore".to_string(),
                folder: "/SDDC-Datacenter/vm/prod".to_string(),
                num_cpus,
                memory_mib: 8192,
                os_family: "ubuntu".to_string(),
                resource_pool: "*/Resources".to_string(),
                storage_policy_name: String::new(),
                template: "/SDDC-Datacenter/vm/Templates/ubuntu-2204-kube-v1.27".to_string(),
                users: users(),
            },
        ),
        CLUSTER_NAMESPACE,
    )
}

pub fn bundles() -> Bundles {
    namespaced(
        Bundles::new(
            "bundles-1",
            BundlesSpec {
                number: 1,
                versions_bundles: vec![VersionsBundle {
                    kube_version: "1.27".to_string(),
                    eks_d: EksDRelease {
                        name: "kubernetes-1-27-eks-4".to_string(),
                        channel: "1-27".to_string(),
                        kube_version: KUBE_VERSION_TAG.to_string(),
                        kind_node: Image {
                            uri: KIND_NODE_IMAGE.to_string(),
                        },
                    },
                }],
            },
        ),
        EKSA_SYSTEM_NAMESPACE,
    )
}

pub fn eksd_release() -> Release {
    namespaced(
        Release::new(
            "kubernetes-1-27-eks-4",
            ReleaseSpec {
                channel: "1-27".to_string(),
                number: 4,
            },
        ),
        EKSA_SYSTEM_NAMESPACE,
    )
}

pub fn aws_iam_config(name: &str) -> AWSIamConfig {
    namespaced(
        AWSIamConfig::new(
            name,
            AWSIamConfigSpec {
                aws_region: "us-west-2".to_string(),
                backend_mode: vec!["EKSConfigMap".to_string()],
                map_roles: vec![MapRoles {
                    role_arn: "arn:aws:iam::123456789012:role/admin".to_string(),
                    username: "admin".to_string(),
                    groups: vec!["system:masters".to_string()],
                }],
                map_users: vec![],
                partition: "aws".to_string(),
            },
        ),
        CLUSTER_NAMESPACE,
    )
}

// Live objects

pub fn capi_cluster(name: &str) -> capi::Cluster {
    namespaced(
        capi::Cluster::new(
            name,
            capi::ClusterSpec {
                control_plane_ref: Some(ObjectReference::new(
                    "controlplane.cluster.x-k8s.io/v1beta1",
                    "KubeadmControlPlane",
                    name,
                )),
                ..Default::default()
            },
        ),
        EKSA_SYSTEM_NAMESPACE,
    )
}

pub fn kubeadm_control_plane(version: &str, template: &str, infra_kind: &str) -> KubeadmControlPlane {
    namespaced(
        KubeadmControlPlane::new(
            CLUSTER_NAME,
            KubeadmControlPlaneSpec {
                version: version.to_string(),
                replicas: Some(3),
                machine_template: KubeadmControlPlaneMachineTemplate {
                    infrastructure_ref: ObjectReference::new(INFRASTRUCTURE_API_VERSION, infra_kind, template),
                },
                kubeadm_config_spec: KubeadmConfigSpec {
                    users: bootstrap_users(&users()),
                    join_configuration: None,
                },
            },
        ),
        EKSA_SYSTEM_NAMESPACE,
    )
}

pub fn etcdadm_cluster(template: &str, infra_kind: &str) -> EtcdadmCluster {
    namespaced(
        EtcdadmCluster::new(
            "prod-etcd",
            EtcdadmClusterSpec {
                replicas: Some(3),
                infrastructure_template: ObjectReference::new(INFRASTRUCTURE_API_VERSION, infra_kind, template),
                etcdadm_config_spec: EtcdadmConfigSpec {
                    users: bootstrap_users(&users()),
                },
            },
        ),
        EKSA_SYSTEM_NAMESPACE,
    )
}

pub fn kubeadm_config_template(group: &WorkerNodeGroupConfiguration, users: Vec<User>) -> KubeadmConfigTemplate {
    let mut template = KubeadmConfigTemplate::new(KUBEADM_CONFIG_TEMPLATE, Default::default());
    template.spec.template.spec = KubeadmConfigSpec {
        users,
        join_configuration: Some(JoinConfiguration {
            node_registration: NodeRegistrationOptions {
                name: "{{ ds.meta_data.hostname }}".to_string(),
                taints: group.taints.clone(),
                kubelet_extra_args: BTreeMap::from([(NODE_LABELS_ARG.to_string(), format_node_labels(&group.labels))]),
            },
        }),
    };
    namespaced(template, EKSA_SYSTEM_NAMESPACE)
}

pub fn machine_deployment(infra_kind: &str) -> MachineDeployment {
    let mut deployment = MachineDeployment::new(
        MACHINE_DEPLOYMENT,
        MachineDeploymentSpec {
            cluster_name: CLUSTER_NAME.to_string(),
            replicas: Some(3),
            template: MachineTemplateSpec {
                spec: MachineSpec {
                    cluster_name: CLUSTER_NAME.to_string(),
                    bootstrap: Bootstrap {
                        config_ref: Some(ObjectReference::new(
                            "bootstrap.cluster.x-k8s.io/v1beta1",
                            "KubeadmConfigTemplate",
                            KUBEADM_CONFIG_TEMPLATE,
                        )),
                    },
                    infrastructure_ref: ObjectReference::new(INFRASTRUCTURE_API_VERSION, infra_kind, WORKER_TEMPLATE),
                    version: Some(KUBE_VERSION_TAG.to_string()),
                },
            },
        },
    );
    deployment.metadata.labels = Some(BTreeMap::from([(CLUSTER_NAME_LABEL.to_string(), CLUSTER_NAME.to_string())]));
    namespaced(deployment, EKSA_SYSTEM_NAMESPACE)
}

/// vSphere machine spec as the builder renders it
pub fn vsphere_machine_spec(datacenter: &VSphereDatacenterConfig, machine: &VSphereMachineConfig) -> VSphereMachineSpec {
    VSphereMachineSpec {
        server: datacenter.spec.server.clone(),
        datacenter: datacenter.spec.datacenter.clone(),
        thumbprint: datacenter.spec.thumbprint.clone(),
        network: NetworkSpec {
            devices: vec![NetworkDeviceSpec {
                network_name: datacenter.spec.network.clone(),
                dhcp4: true,
            }],
        },
        num_cpus: machine.spec.num_cpus,
        memory_mib: machine.spec.memory_mib,
        disk_gib: machine.spec.disk_gib,
        template: machine.spec.template.clone(),
        resource_pool: machine.spec.resource_pool.clone(),
        datastore: machine.spec.datastore.clone(),
        folder: machine.spec.folder.clone(),
        storage_policy_name: machine.spec.storage_policy_name.clone(),
        clone_mode: String::new(),
    }
}

pub fn vsphere_machine_template(name: &str, spec: VSphereMachineSpec) -> VSphereMachineTemplate {
    let mut template = VSphereMachineTemplate::new(name, Default::default());
    template.spec.template.spec = spec;
    namespaced(template, EKSA_SYSTEM_NAMESPACE)
}

pub fn docker_machine_template(name: &str, image: &str) -> DockerMachineTemplate {
    let mut template = DockerMachineTemplate::new(name, Default::default());
    template.spec.template.spec = DockerMachineSpec {
        custom_image: image.to_string(),
    };
    namespaced(template, EKSA_SYSTEM_NAMESPACE)
}

fn seed_release(mock: &MockResourceClient) {
    mock.add_resource(&bundles());
    mock.add_resource(&eksd_release());
}

/// Declared config and matching live objects for a vSphere cluster
///
/// External etcd objects are seeded when the cluster declares external etcd.
pub fn seed_vsphere(mock: &MockResourceClient, cluster: &Cluster) {
    let datacenter = vsphere_datacenter();
    let control_plane = vsphere_machine(CONTROL_PLANE_MACHINE_CONFIG, 4);
    let worker = vsphere_machine(WORKER_MACHINE_CONFIG, 2);

    mock.add_resource(cluster);
    mock.add_resource(&datacenter);
    mock.add_resource(&control_plane);
    mock.add_resource(&worker);
    seed_release(mock);

    mock.add_resource(&capi_cluster(CLUSTER_NAME));
    mock.add_resource(&kubeadm_control_plane(KUBE_VERSION_TAG, CONTROL_PLANE_TEMPLATE, "VSphereMachineTemplate"));
    mock.add_resource(&vsphere_machine_template(
        CONTROL_PLANE_TEMPLATE,
        vsphere_machine_spec(&datacenter, &control_plane),
    ));
    mock.add_resource(&vsphere_machine_template(WORKER_TEMPLATE, vsphere_machine_spec(&datacenter, &worker)));
    mock.add_resource(&kubeadm_config_template(&worker_group(), bootstrap_users(&users())));
    mock.add_resource(&machine_deployment("VSphereMachineTemplate"));

    if cluster.has_external_etcd() {
        let etcd = vsphere_machine(ETCD_MACHINE_CONFIG, 2);
        mock.add_resource(&etcd);
        mock.add_resource(&etcdadm_cluster(ETCD_TEMPLATE, "VSphereMachineTemplate"));
        mock.add_resource(&vsphere_machine_template(ETCD_TEMPLATE, vsphere_machine_spec(&datacenter, &etcd)));
    }
}

/// Docker cluster whose control plane runs `live_version` and workers `worker_image`
pub fn seed_docker(mock: &MockResourceClient, cluster: &Cluster, live_version: &str, worker_image: &str) {
    mock.add_resource(cluster);
    mock.add_resource(&namespaced(
        DockerDatacenterConfig::new(DATACENTER_NAME, Default::default()),
        CLUSTER_NAMESPACE,
    ));
    seed_release(mock);

    mock.add_resource(&capi_cluster(CLUSTER_NAME));
    mock.add_resource(&kubeadm_control_plane(live_version, CONTROL_PLANE_TEMPLATE, "DockerMachineTemplate"));
    mock.add_resource(&docker_machine_template(CONTROL_PLANE_TEMPLATE, worker_image));
    mock.add_resource(&docker_machine_template(WORKER_TEMPLATE, worker_image));
    mock.add_resource(&kubeadm_config_template(&docker_worker_group(), Vec::new()));
    mock.add_resource(&machine_deployment("DockerMachineTemplate"));
}

pub fn docker_worker_group() -> WorkerNodeGroupConfiguration {
    WorkerNodeGroupConfiguration {
        machine_group_ref: None,
        ..worker_group()
    }
}

/// Docker cluster managed by `mgmt`
pub fn docker_cluster() -> Cluster {
    let mut cluster = managed_by(vsphere_cluster(), "mgmt");
    cluster.spec.datacenter_ref = Ref::new(kinds::DOCKER_DATACENTER_CONFIG, DATACENTER_NAME);
    cluster.spec.control_plane_configuration.machine_group_ref = None;
    cluster.spec.worker_node_group_configurations = vec![docker_worker_group()];
    cluster
}

/// Point the control plane and worker machine group refs at `kind`
fn with_machine_config_kind(mut cluster: Cluster, kind: &str) -> Cluster {
    cluster.spec.control_plane_configuration.machine_group_ref = Some(Ref::new(kind, CONTROL_PLANE_MACHINE_CONFIG));
    for group in &mut cluster.spec.worker_node_group_configurations {
        group.machine_group_ref = Some(Ref::new(kind, WORKER_MACHINE_CONFIG));
    }
    cluster
}

// CloudStack

/// Self-managed CloudStack cluster with stacked etcd
pub fn cloudstack_cluster() -> Cluster {
    let mut cluster = with_machine_config_kind(vsphere_cluster(), kinds::CLOUDSTACK_MACHINE_CONFIG);
    cluster.spec.datacenter_ref = Ref::new(kinds::CLOUDSTACK_DATACENTER_CONFIG, DATACENTER_NAME);
    cluster
}

fn cloudstack_identifier(name: &str) -> CloudStackResourceIdentifier {
    CloudStackResourceIdentifier {
        id: String::new(),
        name: name.to_string(),
    }
}

pub fn cloudstack_datacenter() -> CloudStackDatacenterConfig {
    namespaced(
        CloudStackDatacenterConfig::new(
            DATACENTER_NAME,
            CloudStackDatacenterConfigSpec {
                availability_zones: vec![CloudStackAvailabilityZone {
                    name: "az-1".to_string(),
                    credentials_ref: "global".to_string(),
                    zone: CloudStackZone {
                        id: String::new(),
                        name: "zone1".to_string(),
                        network: cloudstack_identifier("net1"),
                    },
                    domain: "ROOT".to_string(),
                    account: "admin".to_string(),
                    management_api_endpoint: "https://cloudstack.example.com/client/api".to_string(),
                }],
            },
        ),
        CLUSTER_NAMESPACE,
    )
}

pub fn cloudstack_machine(name: &str, compute_offering: &str) -> CloudStackMachineConfig {
    namespaced(
        CloudStackMachineConfig::new(
            name,
            CloudStackMachineConfigSpec {
                template: cloudstack_identifier("rhel-8-kube-v1.27"),
                compute_offering: cloudstack_identifier(compute_offering),
                disk_offering: Some(CloudStackResourceDiskOffering {
                    id: String::new(),
                    name: "data".to_string(),
                    custom_size_in_gb: 100,
                    mount_path: "/data".to_string(),
                    device: "/dev/vdb".to_string(),
                    filesystem: "ext4".to_string(),
                    label: "data_disk".to_string(),
                }),
                os_family: "redhat".to_string(),
                symlinks: BTreeMap::from([("/var/log/pods".to_string(), "/data/pods".to_string())]),
                users: users(),
                ..Default::default()
            },
        ),
        CLUSTER_NAMESPACE,
    )
}

/// Live CloudStack cluster whose failure domains echo the datacenter's zones
pub fn live_cloudstack_cluster(datacenter: &CloudStackDatacenterConfig) -> capi::CloudStackCluster {
    let failure_domains = datacenter
        .spec
        .availability_zones
        .iter()
        .map(|az| CloudStackFailureDomainSpec {
            name: az.name.clone(),
            zone: CloudStackZoneSpec {
                id: az.zone.id.clone(),
                name: az.zone.name.clone(),
                network: az.zone.network.clone(),
            },
            account: az.account.clone(),
            domain: az.domain.clone(),
            acs_endpoint: SecretReference {
                name: az.credentials_ref.clone(),
                namespace: EKSA_SYSTEM_NAMESPACE.to_string(),
            },
        })
        .collect();
    namespaced(
        capi::CloudStackCluster::new(CLUSTER_NAME, CloudStackClusterSpec { failure_domains }),
        EKSA_SYSTEM_NAMESPACE,
    )
}

/// CloudStack machine template as the builder renders it, disk offering settings included
pub fn cloudstack_machine_template(name: &str, machine: &CloudStackMachineConfig) -> CloudStackMachineTemplate {
    let spec = &machine.spec;
    let mut template = CloudStackMachineTemplate::new(name, Default::default());
    template.spec.template.spec = CloudStackMachineSpec {
        offering: spec.compute_offering.clone(),
        template: spec.template.clone(),
        disk_offering: spec.disk_offering.as_ref().map(|offering| CloudStackDiskOffering {
            id: offering.id.clone(),
            name: offering.name.clone(),
            custom_size_in_gb: offering.custom_size_in_gb,
        }),
        affinity: spec.affinity.clone(),
        affinity_group_ids: spec.affinity_group_ids.clone(),
        details: spec.user_custom_details.clone(),
    };

    let mut annotations = BTreeMap::new();
    if let Some(offering) = &spec.disk_offering {
        annotations.insert(cloudstack_annotation("mountpath"), offering.mount_path.clone());
        annotations.insert(cloudstack_annotation("device"), offering.device.clone());
        annotations.insert(cloudstack_annotation("filesystem"), offering.filesystem.clone());
        annotations.insert(cloudstack_annotation("label"), offering.label.clone());
    }
    annotations.insert(cloudstack_annotation("symlinks"), format_symlinks(&spec.symlinks));
    template.metadata.annotations = Some(annotations);
    namespaced(template, EKSA_SYSTEM_NAMESPACE)
}

/// Declared config and matching live objects for a CloudStack cluster
pub fn seed_cloudstack(mock: &MockResourceClient, cluster: &Cluster) {
    let datacenter = cloudstack_datacenter();
    let control_plane = cloudstack_machine(CONTROL_PLANE_MACHINE_CONFIG, "m4-xlarge");
    let worker = cloudstack_machine(WORKER_MACHINE_CONFIG, "m4-large");

    mock.add_resource(cluster);
    mock.add_resource(&datacenter);
    mock.add_resource(&control_plane);
    mock.add_resource(&worker);
    seed_release(mock);

    mock.add_resource(&capi_cluster(CLUSTER_NAME));
    mock.add_resource(&live_cloudstack_cluster(&datacenter));
    mock.add_resource(&kubeadm_control_plane(KUBE_VERSION_TAG, CONTROL_PLANE_TEMPLATE, "CloudStackMachineTemplate"));
    mock.add_resource(&cloudstack_machine_template(CONTROL_PLANE_TEMPLATE, &control_plane));
    mock.add_resource(&cloudstack_machine_template(WORKER_TEMPLATE, &worker));
    mock.add_resource(&kubeadm_config_template(&worker_group(), bootstrap_users(&users())));
    mock.add_resource(&machine_deployment("CloudStackMachineTemplate"));
}

// Nutanix

/// Self-managed Nutanix cluster with stacked etcd
pub fn nutanix_cluster() -> Cluster {
    let mut cluster = with_machine_config_kind(vsphere_cluster(), kinds::NUTANIX_MACHINE_CONFIG);
    cluster.spec.datacenter_ref = Ref::new(kinds::NUTANIX_DATACENTER_CONFIG, DATACENTER_NAME);
    cluster
}

pub fn nutanix_datacenter() -> NutanixDatacenterConfig {
    namespaced(
        NutanixDatacenterConfig::new(
            DATACENTER_NAME,
            NutanixDatacenterConfigSpec {
                endpoint: "prism.example.com".to_string(),
                port: 9440,
                insecure: false,
                credential_ref: None,
            },
        ),
        CLUSTER_NAMESPACE,
    )
}

pub fn nutanix_machine(name: &str, subnet: &str) -> NutanixMachineConfig {
    namespaced(
        NutanixMachineConfig::new(
            name,
            NutanixMachineConfigSpec {
                os_family: "ubuntu".to_string(),
                users: users(),
                vcpus_per_socket: 1,
                vcpu_sockets: 4,
                memory_size: "8Gi".to_string(),
                image: NutanixResourceIdentifier::by_name("ubuntu-2204-kube-v1.27"),
                cluster: NutanixResourceIdentifier::by_name("pe-1"),
                subnet: NutanixResourceIdentifier::by_name(subnet),
                system_disk_size: "40Gi".to_string(),
            },
        ),
        CLUSTER_NAMESPACE,
    )
}

pub fn nutanix_machine_template(name: &str, machine: &NutanixMachineConfig) -> NutanixMachineTemplate {
    let spec = &machine.spec;
    let mut template = NutanixMachineTemplate::new(name, Default::default());
    template.spec.template.spec = NutanixMachineSpec {
        vcpus_per_socket: spec.vcpus_per_socket,
        vcpu_sockets: spec.vcpu_sockets,
        memory_size: spec.memory_size.clone(),
        system_disk_size: spec.system_disk_size.clone(),
        image: spec.image.clone(),
        cluster: spec.cluster.clone(),
        subnet: vec![spec.subnet.clone()],
    };
    namespaced(template, EKSA_SYSTEM_NAMESPACE)
}

/// Declared config and matching live objects for a Nutanix cluster
pub fn seed_nutanix(mock: &MockResourceClient, cluster: &Cluster) {
    let control_plane = nutanix_machine(CONTROL_PLANE_MACHINE_CONFIG, "vlan-10");
    let worker = nutanix_machine(WORKER_MACHINE_CONFIG, "vlan-10");

    mock.add_resource(cluster);
    mock.add_resource(&nutanix_datacenter());
    mock.add_resource(&control_plane);
    mock.add_resource(&worker);
    seed_release(mock);

    mock.add_resource(&capi_cluster(CLUSTER_NAME));
    mock.add_resource(&kubeadm_control_plane(KUBE_VERSION_TAG, CONTROL_PLANE_TEMPLATE, "NutanixMachineTemplate"));
    mock.add_resource(&nutanix_machine_template(CONTROL_PLANE_TEMPLATE, &control_plane));
    mock.add_resource(&nutanix_machine_template(WORKER_TEMPLATE, &worker));
    mock.add_resource(&kubeadm_config_template(&worker_group(), bootstrap_users(&users())));
    mock.add_resource(&machine_deployment("NutanixMachineTemplate"));
}

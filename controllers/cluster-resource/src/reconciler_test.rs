//! Unit tests for the reconciler

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crds::anywhere::{
        kinds, CloudStackDatacenterConfig, CloudStackMachineConfig, WorkerNodeGroupConfiguration,
    };
    use crds::capi::NetworkSpec;
    use crds::{Ref, EKSA_SYSTEM_NAMESPACE};
    use resource_client::{kind_of, MockResourceClient, ObjectKey, RecordedWrite, WriteVerb};
    use serde_json::{json, Value};

    use crate::error::ReconcileError;
    use crate::mapping::cloudstack_annotation;
    use crate::reconciler::Reconcile;
    use crate::test_utils::*;

    fn key() -> ObjectKey {
        ObjectKey::new(CLUSTER_NAMESPACE, CLUSTER_NAME)
    }

    /// Submitted objects with the resourceVersion stripped
    fn payloads(writes: &[RecordedWrite]) -> Vec<(WriteVerb, Value)> {
        writes
            .iter()
            .map(|write| {
                let mut obj = write.object.clone();
                obj.metadata.resource_version = None;
                (write.verb, serde_json::to_value(&obj).unwrap())
            })
            .collect()
    }

    fn write_of<'a>(writes: &'a [RecordedWrite], kind: &str) -> &'a RecordedWrite {
        writes
            .iter()
            .find(|write| write.kind() == kind)
            .unwrap_or_else(|| panic!("no {kind} write in {:?}", names(writes)))
    }

    fn names(writes: &[RecordedWrite]) -> Vec<String> {
        writes.iter().map(|write| write.name().to_string()).collect()
    }

    #[tokio::test]
    async fn test_machine_deployment_named_after_worker_group() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &vsphere_cluster());

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        let deployment = write_of(&writes, "MachineDeployment");
        assert_eq!(deployment.name(), "prod-md-0");
        assert_eq!(deployment.verb, WriteVerb::Update);
        assert_eq!(deployment.object.data["spec"]["replicas"], json!(3));
        assert_eq!(
            deployment.object.data["spec"]["template"]["spec"]["infrastructureRef"]["name"],
            json!(WORKER_TEMPLATE)
        );
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &vsphere_cluster());
        let reconciler = reconciler(&mock, advancing_clock(5000));

        reconciler.reconcile(&key(), false).await.unwrap();
        let first = mock.writes();
        mock.clear_writes();
        reconciler.reconcile(&key(), false).await.unwrap();
        let second = mock.writes();

        assert_eq!(names(&first), vec![WORKER_TEMPLATE, KUBEADM_CONFIG_TEMPLATE, MACHINE_DEPLOYMENT]);
        assert_eq!(names(&first), names(&second));
        assert_eq!(payloads(&first), payloads(&second));
    }

    #[tokio::test]
    async fn test_self_managed_skips_control_plane_and_etcd_templates() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &with_external_etcd(vsphere_cluster()));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let written = names(&mock.writes());
        assert!(!written.iter().any(|name| name.starts_with("prod-control-plane-template")), "{written:?}");
        assert!(!written.iter().any(|name| name.starts_with("prod-etcd-template")), "{written:?}");
        assert_eq!(written, vec![WORKER_TEMPLATE, KUBEADM_CONFIG_TEMPLATE, MACHINE_DEPLOYMENT]);
    }

    #[tokio::test]
    async fn test_managed_cluster_applies_control_plane_and_etcd_templates() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &managed_by(with_external_etcd(vsphere_cluster()), "mgmt"));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        assert_eq!(
            names(&writes),
            vec![
                CONTROL_PLANE_TEMPLATE,
                ETCD_TEMPLATE,
                WORKER_TEMPLATE,
                KUBEADM_CONFIG_TEMPLATE,
                MACHINE_DEPLOYMENT
            ]
        );
        assert!(writes.iter().all(|write| write.verb == WriteVerb::Update));
    }

    #[tokio::test]
    async fn test_annotation_merge_keeps_existing_keys() {
        let mock = MockResourceClient::new();
        let cluster = vsphere_cluster();
        seed_vsphere(&mock, &cluster);
        let mut existing = vsphere_machine_template(
            WORKER_TEMPLATE,
            vsphere_machine_spec(&vsphere_datacenter(), &vsphere_machine(WORKER_MACHINE_CONFIG, 2)),
        );
        existing.metadata.annotations = Some(BTreeMap::from([
            ("my-custom-annotation".to_string(), "keep".to_string()),
            ("eksa-annotation".to_string(), "old".to_string()),
        ]));
        mock.add_resource(&existing);

        let mut desired = mock
            .stored(INFRASTRUCTURE_API_VERSION, "VSphereMachineTemplate", "eksa-system", WORKER_TEMPLATE)
            .unwrap();
        desired.metadata.resource_version = None;
        desired.metadata.annotations = Some(BTreeMap::from([("eksa-annotation".to_string(), "new".to_string())]));

        reconciler(&mock, fixed_clock(2000))
            .apply_templates(&cluster, &[desired], false)
            .await
            .unwrap();

        let writes = mock.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].verb, WriteVerb::Update);
        let annotations = writes[0].object.metadata.annotations.clone().unwrap();
        assert_eq!(annotations["my-custom-annotation"], "keep");
        assert_eq!(annotations["eksa-annotation"], "new");
        assert!(writes[0].object.metadata.resource_version.is_some());
    }

    #[tokio::test]
    async fn test_absent_object_is_force_applied() {
        let mock = MockResourceClient::new();
        let cluster = vsphere_cluster();
        let desired = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "fresh"},
            "data": {"k": "v"},
        }))
        .unwrap();

        reconciler(&mock, fixed_clock(2000))
            .apply_templates(&cluster, &[desired], false)
            .await
            .unwrap();

        let writes = mock.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].verb, WriteVerb::ServerSideApply);
        assert_eq!(writes[0].object.metadata.namespace.as_deref(), Some("eksa-system"));
        assert!(mock.stored("v1", "ConfigMap", "eksa-system", "fresh").is_some());
    }

    #[tokio::test]
    async fn test_changed_sizing_mints_new_worker_template() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &vsphere_cluster());
        mock.add_resource(&vsphere_machine(WORKER_MACHINE_CONFIG, 8));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        let template = write_of(&writes, "VSphereMachineTemplate");
        assert_eq!(template.name(), "prod-md-0-2000");
        assert_eq!(template.verb, WriteVerb::ServerSideApply);
        assert_eq!(template.object.data["spec"]["template"]["spec"]["numCPUs"], json!(8));

        // Bootstrap settings didn't change, so the bootstrap config template is reused
        assert_eq!(write_of(&writes, "KubeadmConfigTemplate").name(), KUBEADM_CONFIG_TEMPLATE);

        let deployment = write_of(&writes, "MachineDeployment");
        assert_eq!(
            deployment.object.data["spec"]["template"]["spec"]["infrastructureRef"]["name"],
            json!("prod-md-0-2000")
        );
    }

    #[tokio::test]
    async fn test_changed_taints_mint_new_bootstrap_config() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &vsphere_cluster());
        let mut cluster = vsphere_cluster();
        cluster.spec.worker_node_group_configurations[0].taints.clear();
        mock.add_resource(&cluster);

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        let bootstrap = write_of(&writes, "KubeadmConfigTemplate");
        assert_eq!(bootstrap.name(), "prod-md-0-template-2000");
        assert_eq!(bootstrap.verb, WriteVerb::ServerSideApply);
        assert_eq!(write_of(&writes, "VSphereMachineTemplate").name(), WORKER_TEMPLATE);
        assert_eq!(
            write_of(&writes, "MachineDeployment").object.data["spec"]["template"]["spec"]["bootstrap"]["configRef"]
                ["name"],
            json!("prod-md-0-template-2000")
        );
    }

    #[tokio::test]
    async fn test_template_without_network_devices_aborts() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &vsphere_cluster());
        let mut spec = vsphere_machine_spec(&vsphere_datacenter(), &vsphere_machine(WORKER_MACHINE_CONFIG, 2));
        spec.network = NetworkSpec::default();
        mock.add_resource(&vsphere_machine_template(WORKER_TEMPLATE, spec));

        let err = reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Mapping { ref kind, .. } if kind == "VSphereMachineTemplate"));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_provider() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &vsphere_cluster());
        let mut cluster = vsphere_cluster();
        cluster.spec.datacenter_ref = Ref::new("TinkerbellDatacenterConfig", DATACENTER_NAME);
        mock.add_resource(&cluster);

        let err = reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap_err();
        assert!(matches!(err, ReconcileError::UnsupportedProvider(ref kind) if kind == "TinkerbellDatacenterConfig"));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_missing_machine_group_ref() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &vsphere_cluster());
        let mut cluster = vsphere_cluster();
        cluster.spec.worker_node_group_configurations[0].machine_group_ref = None;
        mock.add_resource(&cluster);

        let err = reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(ref message) if message.contains("md-0")));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_read_error_aborts_before_any_write() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &vsphere_cluster());
        mock.fail_reads_for_kind("KubeadmConfigTemplate");

        let err = reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_cloudstack_requires_single_worker_group() {
        let mock = MockResourceClient::new();
        let mut cluster = vsphere_cluster();
        cluster.spec.datacenter_ref = Ref::new(kinds::CLOUDSTACK_DATACENTER_CONFIG, DATACENTER_NAME);
        cluster.spec.control_plane_configuration.machine_group_ref =
            Some(Ref::new(kinds::CLOUDSTACK_MACHINE_CONFIG, CONTROL_PLANE_MACHINE_CONFIG));
        let group = |name: &str| WorkerNodeGroupConfiguration {
            name: name.to_string(),
            machine_group_ref: Some(Ref::new(kinds::CLOUDSTACK_MACHINE_CONFIG, WORKER_MACHINE_CONFIG)),
            ..Default::default()
        };
        cluster.spec.worker_node_group_configurations = vec![group("md-0"), group("md-1")];

        // Only the declared side is seeded; validation fails before live objects are read
        mock.add_resource(&cluster);
        mock.add_resource(&namespaced(
            CloudStackDatacenterConfig::new(DATACENTER_NAME, Default::default()),
            CLUSTER_NAMESPACE,
        ));
        for name in [CONTROL_PLANE_MACHINE_CONFIG, WORKER_MACHINE_CONFIG] {
            mock.add_resource(&namespaced(
                CloudStackMachineConfig::new(name, Default::default()),
                CLUSTER_NAMESPACE,
            ));
        }
        mock.add_resource(&bundles());
        mock.add_resource(&eksd_release());

        let err = reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(ref message) if message.contains("exactly one")));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_is_forwarded_on_every_write() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &vsphere_cluster());
        mock.add_resource(&vsphere_machine(WORKER_MACHINE_CONFIG, 8));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), true).await.unwrap();

        let writes = mock.writes();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().all(|write| write.options.dry_run));
        assert!(writes.iter().all(|write| write.options.field_manager == crate::FIELD_MANAGER));

        // Nothing was persisted
        assert!(mock
            .stored(INFRASTRUCTURE_API_VERSION, "VSphereMachineTemplate", "eksa-system", "prod-md-0-2000")
            .is_none());
        let deployment = mock
            .stored("cluster.x-k8s.io/v1beta1", "MachineDeployment", "eksa-system", MACHINE_DEPLOYMENT)
            .unwrap();
        assert_eq!(
            deployment.data["spec"]["template"]["spec"]["infrastructureRef"]["name"],
            json!(WORKER_TEMPLATE)
        );
    }

    fn with_aws_iam(mut cluster: crds::anywhere::Cluster) -> crds::anywhere::Cluster {
        cluster
            .spec
            .identity_provider_refs
            .push(Ref::new(kinds::AWS_IAM_CONFIG, "prod-iam"));
        cluster
    }

    #[tokio::test]
    async fn test_aws_iam_resources_for_self_managed_cluster() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &with_aws_iam(vsphere_cluster()));
        mock.add_resource(&aws_iam_config("prod-iam"));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        let config_map = write_of(&writes, "ConfigMap");
        assert_eq!(config_map.name(), "aws-auth");
        assert_eq!(config_map.verb, WriteVerb::ServerSideApply);
        assert_eq!(config_map.object.metadata.namespace.as_deref(), Some("kube-system"));
    }

    #[tokio::test]
    async fn test_no_aws_iam_resources_for_managed_cluster() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &managed_by(with_aws_iam(vsphere_cluster()), "mgmt"));
        mock.add_resource(&aws_iam_config("prod-iam"));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        assert!(!mock.writes().iter().any(|write| write.kind() == "ConfigMap"));
    }

    #[tokio::test]
    async fn test_docker_version_change_rotates_templates() {
        let mock = MockResourceClient::new();
        seed_docker(&mock, &docker_cluster(), "v1.26.5-eks-1-26-10", "kind/node:v1.26.5");

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        assert_eq!(
            names(&writes),
            vec![
                "prod-control-plane-template-2000",
                "prod-md-0-2000",
                KUBEADM_CONFIG_TEMPLATE,
                MACHINE_DEPLOYMENT
            ]
        );
        let control_plane = &writes[0];
        assert_eq!(kind_of(&control_plane.object), "DockerMachineTemplate");
        assert_eq!(control_plane.verb, WriteVerb::ServerSideApply);
        assert_eq!(
            control_plane.object.data["spec"]["template"]["spec"]["customImage"],
            json!(KIND_NODE_IMAGE)
        );
        assert_eq!(
            write_of(&writes, "MachineDeployment").object.data["spec"]["template"]["spec"]["version"],
            json!(KUBE_VERSION_TAG)
        );
    }

    #[tokio::test]
    async fn test_docker_unchanged_version_reuses_templates() {
        let mock = MockResourceClient::new();
        seed_docker(&mock, &docker_cluster(), KUBE_VERSION_TAG, KIND_NODE_IMAGE);

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        assert_eq!(
            names(&writes),
            vec![CONTROL_PLANE_TEMPLATE, WORKER_TEMPLATE, KUBEADM_CONFIG_TEMPLATE, MACHINE_DEPLOYMENT]
        );
        assert!(writes.iter().all(|write| write.verb == WriteVerb::Update));
    }

    #[tokio::test]
    async fn test_managed_control_plane_change_mints_new_template() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &managed_by(vsphere_cluster(), "mgmt"));
        mock.add_resource(&vsphere_machine(CONTROL_PLANE_MACHINE_CONFIG, 16));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        let template = write_of(&writes, "VSphereMachineTemplate");
        assert_eq!(template.name(), "prod-control-plane-template-2000");
        assert_eq!(template.verb, WriteVerb::ServerSideApply);
        assert_eq!(template.object.data["spec"]["template"]["spec"]["numCPUs"], json!(16));
        assert!(!names(&writes).iter().any(|name| name == CONTROL_PLANE_TEMPLATE), "{:?}", names(&writes));

        // The live template keeps describing the machines already running from it
        let live = mock
            .stored(INFRASTRUCTURE_API_VERSION, "VSphereMachineTemplate", EKSA_SYSTEM_NAMESPACE, CONTROL_PLANE_TEMPLATE)
            .unwrap();
        assert_eq!(live.data["spec"]["template"]["spec"]["numCPUs"], json!(4));
    }

    #[tokio::test]
    async fn test_managed_etcd_change_mints_new_template() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &managed_by(with_external_etcd(vsphere_cluster()), "mgmt"));
        mock.add_resource(&vsphere_machine(ETCD_MACHINE_CONFIG, 8));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        assert_eq!(
            names(&writes),
            vec![
                CONTROL_PLANE_TEMPLATE,
                "prod-etcd-template-2000",
                WORKER_TEMPLATE,
                KUBEADM_CONFIG_TEMPLATE,
                MACHINE_DEPLOYMENT
            ]
        );
        let etcd = &writes[1];
        assert_eq!(etcd.verb, WriteVerb::ServerSideApply);
        assert_eq!(etcd.object.data["spec"]["template"]["spec"]["numCPUs"], json!(8));
        assert_eq!(writes[0].verb, WriteVerb::Update);
    }

    #[tokio::test]
    async fn test_self_managed_control_plane_change_is_left_to_upgrade() {
        let mock = MockResourceClient::new();
        seed_vsphere(&mock, &vsphere_cluster());
        mock.add_resource(&vsphere_machine(CONTROL_PLANE_MACHINE_CONFIG, 16));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        assert_eq!(names(&mock.writes()), vec![WORKER_TEMPLATE, KUBEADM_CONFIG_TEMPLATE, MACHINE_DEPLOYMENT]);
    }

    #[tokio::test]
    async fn test_cloudstack_unchanged_config_reuses_templates() {
        let mock = MockResourceClient::new();
        seed_cloudstack(&mock, &cloudstack_cluster());

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        assert_eq!(names(&writes), vec![WORKER_TEMPLATE, KUBEADM_CONFIG_TEMPLATE, MACHINE_DEPLOYMENT]);
        assert!(writes.iter().all(|write| write.verb == WriteVerb::Update));

        let template = write_of(&writes, "CloudStackMachineTemplate");
        let annotations = template.object.metadata.annotations.clone().unwrap_or_default();
        assert_eq!(annotations[&cloudstack_annotation("mountpath")], "/data");
        assert_eq!(annotations[&cloudstack_annotation("symlinks")], "/var/log/pods:/data/pods");
    }

    #[tokio::test]
    async fn test_cloudstack_changed_offering_mints_new_worker_template() {
        let mock = MockResourceClient::new();
        seed_cloudstack(&mock, &cloudstack_cluster());
        mock.add_resource(&cloudstack_machine(WORKER_MACHINE_CONFIG, "m4-2xlarge"));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        let template = write_of(&writes, "CloudStackMachineTemplate");
        assert_eq!(template.name(), "prod-md-0-2000");
        assert_eq!(template.verb, WriteVerb::ServerSideApply);
        assert_eq!(
            template.object.data["spec"]["template"]["spec"]["offering"]["name"],
            json!("m4-2xlarge")
        );
        assert_eq!(write_of(&writes, "KubeadmConfigTemplate").name(), KUBEADM_CONFIG_TEMPLATE);
        assert_eq!(
            write_of(&writes, "MachineDeployment").object.data["spec"]["template"]["spec"]["infrastructureRef"]["name"],
            json!("prod-md-0-2000")
        );
    }

    #[tokio::test]
    async fn test_nutanix_unchanged_config_reuses_templates() {
        let mock = MockResourceClient::new();
        seed_nutanix(&mock, &nutanix_cluster());

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        assert_eq!(names(&writes), vec![WORKER_TEMPLATE, KUBEADM_CONFIG_TEMPLATE, MACHINE_DEPLOYMENT]);
        assert!(writes.iter().all(|write| write.verb == WriteVerb::Update));
    }

    #[tokio::test]
    async fn test_nutanix_changed_subnet_mints_new_worker_template() {
        let mock = MockResourceClient::new();
        seed_nutanix(&mock, &nutanix_cluster());
        mock.add_resource(&nutanix_machine(WORKER_MACHINE_CONFIG, "vlan-20"));

        reconciler(&mock, fixed_clock(2000)).reconcile(&key(), false).await.unwrap();

        let writes = mock.writes();
        let template = write_of(&writes, "NutanixMachineTemplate");
        assert_eq!(template.name(), "prod-md-0-2000");
        assert_eq!(template.verb, WriteVerb::ServerSideApply);
        assert_eq!(
            template.object.data["spec"]["template"]["spec"]["subnet"][0]["name"],
            json!("vlan-20")
        );
        assert_eq!(
            write_of(&writes, "MachineDeployment").object.data["spec"]["template"]["spec"]["infrastructureRef"]["name"],
            json!("prod-md-0-2000")
        );
    }
}

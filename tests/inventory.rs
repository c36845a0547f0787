//! Inventory report over a seeded in-memory Fusion

use assert_matches::assert_matches;
use fusion_ctl::client::{CallKind, MemoryFusion};
use fusion_ctl::{Error, InventoryAggregator, ResourceCategory, Scope, Subset};
use serde_json::json;
use std::sync::Arc;

fn seeded() -> Arc<MemoryFusion> {
    let fusion = Arc::new(MemoryFusion::new().with_version("1.2"));
    let global = Scope::Global;
    let zone = Scope::zone("zone1");
    let space = Scope::tenant_space("tenant1", "space1");

    let seed = [
        (
            global.clone(),
            ResourceCategory::HardwareType,
            json!({
                "name": "flash-array-x",
                "display_name": "FlashArray//X",
                "array_type": "FA//X",
                "media_type": "flash",
            }),
        ),
        (
            global.clone(),
            ResourceCategory::User,
            json!({
                "name": "pureuser",
                "display_name": "Pure User",
                "email": "user@example.com",
                "id": "u-1",
            }),
        ),
        (
            global.clone(),
            ResourceCategory::AvailabilityZone,
            json!({
                "name": "zone1",
                "display_name": "Zone 1",
                "region": { "name": "pure-us-west" },
            }),
        ),
        (
            global.clone(),
            ResourceCategory::Role,
            json!({
                "name": "tenant-admin",
                "display_name": "Tenant Admin",
                "assignable_scopes": ["tenant"],
            }),
        ),
        (
            Scope::role("tenant-admin"),
            ResourceCategory::RoleAssignment,
            json!({ "name": "assignment1" }),
        ),
        (
            global.clone(),
            ResourceCategory::StorageClass,
            json!({
                "name": "db-high",
                "display_name": "DB",
                "iops_limit": 100000,
                "size_limit": 1024,
                "bandwidth_limit": 2048,
                "hardware_type": "flash-array-x",
            }),
        ),
        (
            global.clone(),
            ResourceCategory::ProtectionPolicy,
            json!({
                "name": "pp1",
                "display_name": "Hourly",
                "local_rpo": 60,
                "local_retention": 1440,
            }),
        ),
        (
            global.clone(),
            ResourceCategory::HostAccessPolicy,
            json!({
                "name": "host1",
                "display_name": "Host 1",
                "personality": "linux",
                "iqn": "iqn.2023-01.com.example:host1",
            }),
        ),
        (
            global.clone(),
            ResourceCategory::Tenant,
            json!({ "name": "tenant1", "display_name": "Tenant 1" }),
        ),
        (
            Scope::tenant("tenant1"),
            ResourceCategory::TenantSpace,
            json!({ "name": "space1", "display_name": "Space 1" }),
        ),
        (
            zone.clone(),
            ResourceCategory::Array,
            json!({
                "name": "array1",
                "display_name": "Array 1",
                "host_name": "flasharray1",
                "hardware_type": { "name": "flash-array-x" },
                "appliance_id": "app-1",
                "apartment_id": "apt-1",
            }),
        ),
        (
            Scope::array("zone1", "array1"),
            ResourceCategory::NetworkInterface,
            json!({
                "name": "ct0.eth4",
                "enabled": true,
                "interface_type": "eth",
                "services": ["iscsi"],
                "speed": 25000000000u64,
                "eth": {
                    "address": "10.21.200.124/24",
                    "gateway": "10.21.200.1",
                    "mac_address": "24:a9:37:11:f8:68",
                    "mtu": 1500,
                    "vlan": 2000,
                    "provider_subnet": { "name": "subnet1" },
                },
            }),
        ),
        (
            zone.clone(),
            ResourceCategory::ProviderSubnet,
            json!({
                "name": "subnet1",
                "display_name": "Subnet 1",
                "prefix": "10.21.200.0/24",
                "gateway": "10.21.200.1",
                "vlan": 2000,
                "mtu": 1500,
            }),
        ),
        (
            zone.clone(),
            ResourceCategory::TenantNetwork,
            json!({
                "name": "net1",
                "display_name": "Network 1",
                "tenant_subnets": [
                    {
                        "name": "ts1",
                        "prefix": "10.0.0.0/24",
                        "gateway": "10.0.0.1",
                        "mtu": 1500,
                        "addresses": ["10.0.0.5"],
                        "provider_subnets": [{ "name": "subnet1" }],
                    },
                ],
            }),
        ),
        (
            space.clone(),
            ResourceCategory::Volume,
            json!({
                "name": "vol1",
                "display_name": "Volume 1",
                "size": 1048576,
                "serial_number": "SN1",
                "storage_class": { "name": "db-high" },
                "placement_group": { "name": "pg1" },
                "array": { "name": "array1" },
                "target": {
                    "iscsi": {
                        "iqn": "iqn.2010-06.com.purestorage:flasharray.1",
                        "addresses": ["10.21.200.124"],
                    },
                },
            }),
        ),
        (
            space.clone(),
            ResourceCategory::PlacementGroup,
            json!({
                "name": "pg1",
                "display_name": "PG 1",
                "placement_engine": "heuristics",
                "availability_zone": { "name": "zone1" },
                "array": { "name": "array1" },
            }),
        ),
        (
            space.clone(),
            ResourceCategory::Snapshot,
            json!({
                "name": "snap1",
                "display_name": "Snap 1",
                "protection_policy": { "name": "pp1" },
                "time_remaining": 3600,
                "destroyed": false,
            }),
        ),
    ];
    for (scope, category, resource) in seed {
        fusion.insert(&scope, category, resource).unwrap();
    }

    fusion.set_array_space(
        "zone1",
        "array1",
        json!({ "space_data": { "total_physical_space": 123456 } }),
    );
    fusion.set_array_performance(
        "zone1",
        "array1",
        json!({
            "perf_data": {
                "read_bandwidth": 10,
                "read_latency": 1,
                "reads_per_sec": 100,
                "write_bandwidth": 20,
                "write_latency": 2,
                "writes_per_sec": 200,
            },
        }),
    );
    fusion
}

fn aggregator(fusion: &Arc<MemoryFusion>) -> InventoryAggregator {
    InventoryAggregator::new(fusion.clone(), fusion.clone())
}

#[tokio::test]
async fn test_default_summary() {
    let fusion = seeded();
    let report = aggregator(&fusion).gather(&[]).await.unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(
        report["default"],
        json!({
            "version": "1.2",
            "storage_classes": 1,
            "protection_policies": 1,
            "users": 1,
            "host_access_policies": 1,
            "hardware_types": 1,
            "tenants": 1,
            "tenant_spaces": 1,
            "roles": 1,
            "role_assignments": 1,
            "availability_zones": 1,
            "appliances": 1,
            "network_interfaces": 1,
            "provider_subnets": 1,
            "tenant_networks": 1,
            "volumes": 1,
            "placements": 0,
            "placement_groups": 1,
            "snapshots": 1,
        })
    );
    assert_eq!(fusion.mutation_count(), 0);
}

#[tokio::test]
async fn test_composite_keys() {
    let fusion = seeded();
    let report = aggregator(&fusion)
        .gather(&[
            Subset::Volumes,
            Subset::TenantSpaces,
            Subset::Subnets,
            Subset::Interfaces,
            Subset::PlacementGroups,
            Subset::Snapshots,
        ])
        .await
        .unwrap();

    let volume = &report["volumes"]["tenant1/space1/vol1"];
    assert_eq!(volume["tenant"], json!("tenant1"));
    assert_eq!(volume["tenant_space"], json!("space1"));
    assert_eq!(volume["storage_class"], json!("db-high"));
    assert_eq!(volume["placement"], json!(null));
    assert_eq!(volume["target"]["iscsi"]["addresses"], json!(["10.21.200.124"]));

    assert_eq!(
        report["tenant_spaces"]["tenant1/space1"],
        json!({ "tenant": "tenant1", "display_name": "Space 1" })
    );
    assert_eq!(report["subnets"]["zone1/subnet1"]["vlan"], json!(2000));

    let nic = &report["interfaces"]["zone1/array1"]["ct0.eth4"];
    assert_eq!(nic["address"], json!("10.21.200.124/24"));
    assert_eq!(nic["provider_subnet"], json!("subnet1"));

    assert_eq!(report["placement_groups"]["tenant1/space1/pg1"]["az"], json!("zone1"));
    assert_eq!(
        report["snapshots"]["tenant1/space1/snap1"]["protection_policy"],
        json!("pp1")
    );
}

#[tokio::test]
async fn test_flat_subsets() {
    let fusion = seeded();
    let report = aggregator(&fusion)
        .gather(&[
            Subset::Hardware,
            Subset::Users,
            Subset::Zones,
            Subset::Roles,
            Subset::Storageclass,
            Subset::Hosts,
            Subset::ProtectionPolicies,
            Subset::Tenants,
        ])
        .await
        .unwrap();

    assert_eq!(report["hardware"]["flash-array-x"]["media_type"], json!("flash"));
    assert_eq!(report["users"]["pureuser"]["email"], json!("user@example.com"));
    assert_eq!(report["zones"]["zone1"]["region"], json!("pure-us-west"));
    assert_eq!(report["roles"]["tenant-admin"]["scopes"], json!(["tenant"]));
    assert_eq!(
        report["storageclass"]["db-high"]["hardware_type"],
        json!("flash-array-x")
    );
    assert_eq!(report["hosts"]["host1"]["personality"], json!("linux"));
    assert_eq!(report["protection_policies"]["pp1"]["local_rpo"], json!(60));
    assert_eq!(report["tenants"]["tenant1"]["display_name"], json!("Tenant 1"));
}

#[tokio::test]
async fn test_arrays_include_space_and_performance() {
    let fusion = seeded();
    let report = aggregator(&fusion).gather(&[Subset::Arrays]).await.unwrap();

    let array = &report["arrays"]["array1"];
    assert_eq!(array["availability_zone"], json!("zone1"));
    assert_eq!(array["hardware_type"], json!("flash-array-x"));
    assert_eq!(array["space"]["total_physical_space"], json!(123456));
    assert_eq!(array["performance"]["writes_per_sec"], json!(200));
}

#[tokio::test]
async fn test_tenant_networks() {
    let fusion = seeded();
    let report = aggregator(&fusion)
        .gather(&[Subset::TenantNetworks])
        .await
        .unwrap();

    assert_eq!(
        report["tenant_networks"]["zone1/net1"],
        json!({
            "availability_zone": "zone1",
            "display_name": "Network 1",
            "tenant_subnets": [{
                "addresses": ["10.0.0.5"],
                "gateway": "10.0.0.1",
                "mtu": 1500,
                "prefix": "10.0.0.0/24",
                "provider_subnets": ["subnet1"],
            }],
        })
    );
}

#[tokio::test]
async fn test_all_gathers_every_subset() {
    let fusion = seeded();
    let report = aggregator(&fusion).gather(&[Subset::All]).await.unwrap();

    assert_eq!(report.len(), Subset::VALID.len() - 1);
    assert!(report.contains_key("default"));
    assert!(!report.contains_key("all"));
    assert!(!report.contains_key("minimum"));
}

#[tokio::test]
async fn test_invalid_subset_fails_before_any_call() {
    let fusion = seeded();

    let err = Subset::parse_all(&["volumes", "bogus"]).unwrap_err();

    assert_matches!(err, Error::Validation(_));
    assert!(fusion.calls().is_empty());
}

#[tokio::test]
async fn test_failure_aborts_report() {
    let fusion = seeded();
    fusion.fail_next(
        CallKind::List,
        Error::Api {
            status: 503,
            message: "unavailable".into(),
        },
    );

    let err = aggregator(&fusion)
        .gather(&[Subset::Zones, Subset::Users])
        .await
        .unwrap_err();

    assert_matches!(err, Error::Api { status: 503, .. });
    assert_eq!(fusion.count(CallKind::List), 1);
}

//! Inventory Aggregator
//!
//! Walks zones, tenants and tenant spaces and flattens every requested
//! collection into a map keyed by composite name (`parent/child`).
//! Categories are independent, but the first failing call aborts the report.

use super::Subset;
use crate::domain::ports::{InventoryApiRef, ResourceApiRef, ResourceCategory, Scope};
use crate::error::{Error, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Subset report key -> composite resource key -> attributes
pub type Inventory = BTreeMap<String, Value>;

/// Record printed by the CLI for a gathered report; gathering never changes anything
pub fn info_record(report: Inventory) -> Value {
    json!({ "changed": false, "fusion_info": report })
}

/// Builds the inventory report
pub struct InventoryAggregator {
    resources: ResourceApiRef,
    inventory: InventoryApiRef,
}

// =============================================================================
// Item helpers
// =============================================================================

fn name_of(item: &Value) -> Result<String> {
    item.get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Internal(format!("Listed item has no name: {}", item)))
}

/// Field by JSON pointer, `null` when missing
fn field(item: &Value, pointer: &str) -> Value {
    item.pointer(pointer).cloned().unwrap_or(Value::Null)
}

/// Name of a referenced resource, whether the reference is bare or an object
fn ref_name(item: &Value, key: &str) -> Value {
    match item.get(key) {
        Some(Value::String(name)) => Value::String(name.clone()),
        Some(Value::Object(obj)) => obj.get("name").cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn ref_names(items: &Value) -> Value {
    let names = items
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|r| match r {
                    Value::String(s) => Some(Value::String(s.clone())),
                    Value::Object(o) => o.get("name").cloned(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    Value::Array(names)
}

impl InventoryAggregator {
    /// Create a new aggregator
    pub fn new(resources: ResourceApiRef, inventory: InventoryApiRef) -> Self {
        Self {
            resources,
            inventory,
        }
    }

    /// Gather every requested subset
    pub async fn gather(&self, requested: &[Subset]) -> Result<Inventory> {
        let mut report = Inventory::new();

        for subset in Subset::resolve(requested) {
            info!("Gathering {} information", subset);
            let data = match subset {
                Subset::All => continue,
                Subset::Minimum => self.default_summary().await?,
                Subset::Hardware => Value::Object(self.hardware().await?),
                Subset::Users => Value::Object(self.users().await?),
                Subset::Subnets => Value::Object(self.provider_subnets().await?),
                Subset::Zones => Value::Object(self.zones().await?),
                Subset::Roles => Value::Object(self.roles().await?),
                Subset::Placements => Value::Object(self.placements().await?),
                Subset::Volumes => Value::Object(self.volumes().await?),
                Subset::ProtectionPolicies => Value::Object(self.protection_policies().await?),
                Subset::PlacementGroups => Value::Object(self.placement_groups().await?),
                Subset::Storageclass => Value::Object(self.storage_classes().await?),
                Subset::Interfaces => Value::Object(self.interfaces().await?),
                Subset::Hosts => Value::Object(self.host_access_policies().await?),
                Subset::Arrays => Value::Object(self.arrays().await?),
                Subset::Tenants => Value::Object(self.tenants().await?),
                Subset::TenantSpaces => Value::Object(self.tenant_spaces().await?),
                Subset::TenantNetworks => Value::Object(self.tenant_networks().await?),
                Subset::Snapshots => Value::Object(self.snapshots().await?),
            };
            report.insert(subset.report_key().to_string(), data);
        }

        Ok(report)
    }

    // =========================================================================
    // Hierarchy walkers
    // =========================================================================

    async fn list(&self, scope: &Scope, category: ResourceCategory) -> Result<Vec<Value>> {
        let items = self.resources.list(scope, category).await?;
        debug!("Listed {} {} item(s) under {:?}", items.len(), category, scope);
        Ok(items)
    }

    async fn zone_names(&self) -> Result<Vec<String>> {
        self.list(&Scope::Global, ResourceCategory::AvailabilityZone)
            .await?
            .iter()
            .map(name_of)
            .collect()
    }

    /// Every `(tenant, tenant space)` pair
    async fn tenant_space_scopes(&self) -> Result<Vec<Scope>> {
        let mut scopes = Vec::new();
        for tenant in self.list(&Scope::Global, ResourceCategory::Tenant).await? {
            let tenant = name_of(&tenant)?;
            for space in self
                .list(&Scope::tenant(&tenant), ResourceCategory::TenantSpace)
                .await?
            {
                scopes.push(Scope::tenant_space(&tenant, name_of(&space)?));
            }
        }
        Ok(scopes)
    }

    /// Every array with the zone it lives in
    async fn zone_arrays(&self) -> Result<Vec<(String, Value)>> {
        let mut arrays = Vec::new();
        for zone in self.zone_names().await? {
            for array in self.list(&Scope::zone(&zone), ResourceCategory::Array).await? {
                arrays.push((zone.clone(), array));
            }
        }
        Ok(arrays)
    }

    /// Flat global collection keyed by name
    async fn flat<F>(&self, category: ResourceCategory, attributes: F) -> Result<Map<String, Value>>
    where
        F: Fn(&Value) -> Value,
    {
        let mut out = Map::new();
        for item in self.list(&Scope::Global, category).await? {
            out.insert(name_of(&item)?, attributes(&item));
        }
        Ok(out)
    }

    /// Collection under every tenant space keyed by `tenant/space/name`
    async fn per_tenant_space<F>(
        &self,
        category: ResourceCategory,
        attributes: F,
    ) -> Result<Map<String, Value>>
    where
        F: Fn(&str, &str, &Value) -> Value,
    {
        let mut out = Map::new();
        for scope in self.tenant_space_scopes().await? {
            let (tenant, space) = match &scope {
                Scope::TenantSpace {
                    tenant,
                    tenant_space,
                } => (tenant.clone(), tenant_space.clone()),
                _ => continue,
            };
            for item in self.list(&scope, category).await? {
                let name = name_of(&item)?;
                out.insert(scope.qualify(&name), attributes(&tenant, &space, &item));
            }
        }
        Ok(out)
    }

    /// Collection under every availability zone keyed by `zone/name`
    async fn per_zone<F>(
        &self,
        category: ResourceCategory,
        attributes: F,
    ) -> Result<Map<String, Value>>
    where
        F: Fn(&str, &Value) -> Value,
    {
        let mut out = Map::new();
        for zone in self.zone_names().await? {
            let scope = Scope::zone(&zone);
            for item in self.list(&scope, category).await? {
                let name = name_of(&item)?;
                out.insert(scope.qualify(&name), attributes(&zone, &item));
            }
        }
        Ok(out)
    }

    // =========================================================================
    // Subsets
    // =========================================================================

    async fn default_summary(&self) -> Result<Value> {
        let global = Scope::Global;
        let version = self.inventory.version().await?;

        let storage_classes = self.list(&global, ResourceCategory::StorageClass).await?.len();
        let protection_policies = self
            .list(&global, ResourceCategory::ProtectionPolicy)
            .await?
            .len();
        let users = self.list(&global, ResourceCategory::User).await?.len();
        let host_access_policies = self
            .list(&global, ResourceCategory::HostAccessPolicy)
            .await?
            .len();
        let hardware_types = self.list(&global, ResourceCategory::HardwareType).await?.len();
        let tenants = self.list(&global, ResourceCategory::Tenant).await?.len();

        let roles = self.list(&global, ResourceCategory::Role).await?;
        let mut role_assignments = 0;
        for role in &roles {
            role_assignments += self
                .list(&Scope::role(name_of(role)?), ResourceCategory::RoleAssignment)
                .await?
                .len();
        }

        let zones = self.zone_names().await?;
        let (mut appliances, mut interfaces, mut subnets, mut networks) = (0, 0, 0, 0);
        for zone in &zones {
            let arrays = self.list(&Scope::zone(zone), ResourceCategory::Array).await?;
            for array in &arrays {
                interfaces += self
                    .list(
                        &Scope::array(zone, name_of(array)?),
                        ResourceCategory::NetworkInterface,
                    )
                    .await?
                    .len();
            }
            appliances += arrays.len();
            subnets += self
                .list(&Scope::zone(zone), ResourceCategory::ProviderSubnet)
                .await?
                .len();
            networks += self
                .list(&Scope::zone(zone), ResourceCategory::TenantNetwork)
                .await?
                .len();
        }

        let spaces = self.tenant_space_scopes().await?;
        let (mut volumes, mut placement_groups, mut placements, mut snapshots) = (0, 0, 0, 0);
        for scope in &spaces {
            volumes += self.list(scope, ResourceCategory::Volume).await?.len();
            placement_groups += self.list(scope, ResourceCategory::PlacementGroup).await?.len();
            placements += self.list(scope, ResourceCategory::Placement).await?.len();
            snapshots += self.list(scope, ResourceCategory::Snapshot).await?.len();
        }

        Ok(json!({
            "version": version,
            "storage_classes": storage_classes,
            "protection_policies": protection_policies,
            "users": users,
            "host_access_policies": host_access_policies,
            "hardware_types": hardware_types,
            "tenants": tenants,
            "tenant_spaces": spaces.len(),
            "roles": roles.len(),
            "role_assignments": role_assignments,
            "availability_zones": zones.len(),
            "appliances": appliances,
            "network_interfaces": interfaces,
            "provider_subnets": subnets,
            "tenant_networks": networks,
            "volumes": volumes,
            "placements": placements,
            "placement_groups": placement_groups,
            "snapshots": snapshots,
        }))
    }

    async fn hardware(&self) -> Result<Map<String, Value>> {
        self.flat(ResourceCategory::HardwareType, |hw| {
            json!({
                "array_type": field(hw, "/array_type"),
                "display_name": field(hw, "/display_name"),
                "media_type": field(hw, "/media_type"),
            })
        })
        .await
    }

    async fn users(&self) -> Result<Map<String, Value>> {
        self.flat(ResourceCategory::User, |user| {
            json!({
                "display_name": field(user, "/display_name"),
                "email": field(user, "/email"),
                "id": field(user, "/id"),
            })
        })
        .await
    }

    async fn zones(&self) -> Result<Map<String, Value>> {
        self.flat(ResourceCategory::AvailabilityZone, |zone| {
            json!({
                "display_name": field(zone, "/display_name"),
                "region": ref_name(zone, "region"),
            })
        })
        .await
    }

    async fn roles(&self) -> Result<Map<String, Value>> {
        self.flat(ResourceCategory::Role, |role| {
            json!({
                "display_name": field(role, "/display_name"),
                "scopes": field(role, "/assignable_scopes"),
            })
        })
        .await
    }

    async fn protection_policies(&self) -> Result<Map<String, Value>> {
        self.flat(ResourceCategory::ProtectionPolicy, |policy| {
            json!({
                "local_rpo": field(policy, "/local_rpo"),
                "display_name": field(policy, "/display_name"),
                "local_retention": field(policy, "/local_retention"),
            })
        })
        .await
    }

    async fn storage_classes(&self) -> Result<Map<String, Value>> {
        self.flat(ResourceCategory::StorageClass, |class| {
            json!({
                "bandwidth_limit": field(class, "/bandwidth_limit"),
                "iops_limit": field(class, "/iops_limit"),
                "size_limit": field(class, "/size_limit"),
                "display_name": field(class, "/display_name"),
                "hardware_type": ref_name(class, "hardware_type"),
            })
        })
        .await
    }

    async fn host_access_policies(&self) -> Result<Map<String, Value>> {
        self.flat(ResourceCategory::HostAccessPolicy, |host| {
            json!({
                "personality": field(host, "/personality"),
                "display_name": field(host, "/display_name"),
                "iqn": field(host, "/iqn"),
            })
        })
        .await
    }

    async fn tenants(&self) -> Result<Map<String, Value>> {
        self.flat(ResourceCategory::Tenant, |tenant| {
            json!({ "display_name": field(tenant, "/display_name") })
        })
        .await
    }

    async fn tenant_spaces(&self) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        for tenant in self.list(&Scope::Global, ResourceCategory::Tenant).await? {
            let tenant = name_of(&tenant)?;
            let scope = Scope::tenant(&tenant);
            for space in self.list(&scope, ResourceCategory::TenantSpace).await? {
                out.insert(
                    scope.qualify(&name_of(&space)?),
                    json!({
                        "tenant": tenant,
                        "display_name": field(&space, "/display_name"),
                    }),
                );
            }
        }
        Ok(out)
    }

    async fn provider_subnets(&self) -> Result<Map<String, Value>> {
        self.per_zone(ResourceCategory::ProviderSubnet, |zone, subnet| {
            json!({
                "availability_zone": zone,
                "display_name": field(subnet, "/display_name"),
                "gateway": field(subnet, "/gateway"),
                "mtu": field(subnet, "/mtu"),
                "vlan": field(subnet, "/vlan"),
                "prefix": field(subnet, "/prefix"),
            })
        })
        .await
    }

    async fn tenant_networks(&self) -> Result<Map<String, Value>> {
        self.per_zone(ResourceCategory::TenantNetwork, |zone, network| {
            let subnets: Vec<Value> = network
                .get("tenant_subnets")
                .and_then(Value::as_array)
                .map(|subnets| {
                    subnets
                        .iter()
                        .map(|subnet| {
                            json!({
                                "addresses": field(subnet, "/addresses"),
                                "gateway": field(subnet, "/gateway"),
                                "mtu": field(subnet, "/mtu"),
                                "prefix": field(subnet, "/prefix"),
                                "provider_subnets": ref_names(&field(subnet, "/provider_subnets")),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            json!({
                "availability_zone": zone,
                "display_name": field(network, "/display_name"),
                "tenant_subnets": subnets,
            })
        })
        .await
    }

    async fn interfaces(&self) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        for (zone, array) in self.zone_arrays().await? {
            let array_name = name_of(&array)?;
            let scope = Scope::array(&zone, &array_name);
            let mut nics = Map::new();
            for nic in self.list(&scope, ResourceCategory::NetworkInterface).await? {
                nics.insert(
                    name_of(&nic)?,
                    json!({
                        "enabled": field(&nic, "/enabled"),
                        "display_name": field(&nic, "/display_name"),
                        "interface_type": field(&nic, "/interface_type"),
                        "services": field(&nic, "/services"),
                        "speed": field(&nic, "/speed"),
                        "vlan": field(&nic, "/eth/vlan"),
                        "address": field(&nic, "/eth/address"),
                        "mac_address": field(&nic, "/eth/mac_address"),
                        "gateway": field(&nic, "/eth/gateway"),
                        "mtu": field(&nic, "/eth/mtu"),
                        "provider_subnet": field(&nic, "/eth/provider_subnet/name"),
                    }),
                );
            }
            out.insert(format!("{}/{}", zone, array_name), Value::Object(nics));
        }
        Ok(out)
    }

    async fn arrays(&self) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        for (zone, array) in self.zone_arrays().await? {
            let name = name_of(&array)?;
            let space = self.inventory.array_space(&zone, &name).await?;
            let perf = self.inventory.array_performance(&zone, &name).await?;
            out.insert(
                name,
                json!({
                    "availability_zone": zone,
                    "host_name": field(&array, "/host_name"),
                    "display_name": field(&array, "/display_name"),
                    "hardware_type": ref_name(&array, "hardware_type"),
                    "appliance_id": field(&array, "/appliance_id"),
                    "apartment_id": field(&array, "/apartment_id"),
                    "space": {
                        "total_physical_space": field(&space, "/space_data/total_physical_space"),
                    },
                    "performance": {
                        "read_bandwidth": field(&perf, "/perf_data/read_bandwidth"),
                        "read_latency": field(&perf, "/perf_data/read_latency"),
                        "reads_per_sec": field(&perf, "/perf_data/reads_per_sec"),
                        "write_bandwidth": field(&perf, "/perf_data/write_bandwidth"),
                        "write_latency": field(&perf, "/perf_data/write_latency"),
                        "writes_per_sec": field(&perf, "/perf_data/writes_per_sec"),
                    },
                }),
            );
        }
        Ok(out)
    }

    async fn placement_groups(&self) -> Result<Map<String, Value>> {
        self.per_tenant_space(ResourceCategory::PlacementGroup, |tenant, space, group| {
            json!({
                "tenant": tenant,
                "display_name": field(group, "/display_name"),
                "placement_engine": field(group, "/placement_engine"),
                "tenant_space": space,
                "az": ref_name(group, "availability_zone"),
                "array": ref_name(group, "array"),
            })
        })
        .await
    }

    async fn placements(&self) -> Result<Map<String, Value>> {
        self.per_tenant_space(ResourceCategory::Placement, |tenant, space, placement| {
            let iscsi = match placement.pointer("/protocols/iscsi") {
                Some(iscsi) if !iscsi.is_null() => json!({
                    "iqn": field(iscsi, "/iqn"),
                    "addresses": field(iscsi, "/addresses"),
                }),
                _ => json!({}),
            };
            json!({
                "tenant": tenant,
                "tenant_space": space,
                "display_name": field(placement, "/display_name"),
                "placement_group": ref_name(placement, "placement_group"),
                "storage_class": ref_name(placement, "storage_class"),
                "array": ref_name(placement, "array"),
                "protocols": {
                    "iscsi": iscsi,
                    "fc": {},
                    "nvme": {},
                },
            })
        })
        .await
    }

    async fn volumes(&self) -> Result<Map<String, Value>> {
        self.per_tenant_space(ResourceCategory::Volume, |tenant, space, volume| {
            json!({
                "tenant": tenant,
                "tenant_space": space,
                "name": field(volume, "/name"),
                "size": field(volume, "/size"),
                "display_name": field(volume, "/display_name"),
                "array": ref_name(volume, "array"),
                "placement": ref_name(volume, "placement"),
                "placement_group": ref_name(volume, "placement_group"),
                "source_volume_snapshot": ref_name(volume, "source_volume_snapshot"),
                "protection_policy": ref_name(volume, "protection_policy"),
                "storage_class": ref_name(volume, "storage_class"),
                "serial_number": field(volume, "/serial_number"),
                "target": {
                    "iscsi": {
                        "addresses": field(volume, "/target/iscsi/addresses"),
                        "iqn": field(volume, "/target/iscsi/iqn"),
                    },
                    "nvme": {
                        "addresses": field(volume, "/target/nvme/addresses"),
                        "nqn": field(volume, "/target/nvme/nqn"),
                    },
                    "fc": {
                        "addresses": field(volume, "/target/fc/addresses"),
                        "wwns": field(volume, "/target/fc/wwns"),
                    },
                },
            })
        })
        .await
    }

    async fn snapshots(&self) -> Result<Map<String, Value>> {
        self.per_tenant_space(ResourceCategory::Snapshot, |tenant, space, snapshot| {
            json!({
                "tenant": tenant,
                "tenant_space": space,
                "display_name": field(snapshot, "/display_name"),
                "protection_policy": ref_name(snapshot, "protection_policy"),
                "time_remaining": field(snapshot, "/time_remaining"),
                "destroyed": field(snapshot, "/destroyed"),
            })
        })
        .await
    }
}

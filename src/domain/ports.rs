//! Domain Ports - Capability traits for talking to a Fusion control plane
//!
//! The reconciler, poller and inventory aggregator only ever see these
//! traits. The HTTP client and the in-memory Fusion both implement them,
//! which is how callers inject a fake in tests.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

// =============================================================================
// Resource Categories
// =============================================================================

/// Every resource collection the tool knows how to address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    StorageService,
    Tenant,
    TenantSpace,
    Volume,
    Snapshot,
    Placement,
    PlacementGroup,
    AvailabilityZone,
    Array,
    NetworkInterface,
    ProviderSubnet,
    TenantNetwork,
    HardwareType,
    HostAccessPolicy,
    ProtectionPolicy,
    StorageClass,
    Role,
    RoleAssignment,
    User,
}

/// Shape of the parent a category lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Tenant,
    TenantSpace,
    AvailabilityZone,
    Array,
    Role,
}

impl ResourceCategory {
    /// URL path segment of the collection
    pub fn segment(&self) -> &'static str {
        match self {
            ResourceCategory::StorageService => "storage-services",
            ResourceCategory::Tenant => "tenants",
            ResourceCategory::TenantSpace => "tenant-spaces",
            ResourceCategory::Volume => "volumes",
            ResourceCategory::Snapshot => "snapshots",
            ResourceCategory::Placement => "placements",
            ResourceCategory::PlacementGroup => "placement-groups",
            ResourceCategory::AvailabilityZone => "availability-zones",
            ResourceCategory::Array => "arrays",
            ResourceCategory::NetworkInterface => "network-interfaces",
            ResourceCategory::ProviderSubnet => "provider-subnets",
            ResourceCategory::TenantNetwork => "tenant-networks",
            ResourceCategory::HardwareType => "hardware-types",
            ResourceCategory::HostAccessPolicy => "host-access-policies",
            ResourceCategory::ProtectionPolicy => "protection-policies",
            ResourceCategory::StorageClass => "storage-classes",
            ResourceCategory::Role => "roles",
            ResourceCategory::RoleAssignment => "role-assignments",
            ResourceCategory::User => "im/users",
        }
    }

    /// Which parent scope the collection is nested under
    pub fn scope_kind(&self) -> ScopeKind {
        match self {
            ResourceCategory::TenantSpace => ScopeKind::Tenant,
            ResourceCategory::Volume
            | ResourceCategory::Snapshot
            | ResourceCategory::Placement
            | ResourceCategory::PlacementGroup => ScopeKind::TenantSpace,
            ResourceCategory::Array
            | ResourceCategory::ProviderSubnet
            | ResourceCategory::TenantNetwork => ScopeKind::AvailabilityZone,
            ResourceCategory::NetworkInterface => ScopeKind::Array,
            ResourceCategory::RoleAssignment => ScopeKind::Role,
            _ => ScopeKind::Global,
        }
    }
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ResourceCategory::StorageService => "StorageService",
            ResourceCategory::Tenant => "Tenant",
            ResourceCategory::TenantSpace => "TenantSpace",
            ResourceCategory::Volume => "Volume",
            ResourceCategory::Snapshot => "Snapshot",
            ResourceCategory::Placement => "Placement",
            ResourceCategory::PlacementGroup => "PlacementGroup",
            ResourceCategory::AvailabilityZone => "AvailabilityZone",
            ResourceCategory::Array => "Array",
            ResourceCategory::NetworkInterface => "NetworkInterface",
            ResourceCategory::ProviderSubnet => "ProviderSubnet",
            ResourceCategory::TenantNetwork => "TenantNetwork",
            ResourceCategory::HardwareType => "HardwareType",
            ResourceCategory::HostAccessPolicy => "HostAccessPolicy",
            ResourceCategory::ProtectionPolicy => "ProtectionPolicy",
            ResourceCategory::StorageClass => "StorageClass",
            ResourceCategory::Role => "Role",
            ResourceCategory::RoleAssignment => "RoleAssignment",
            ResourceCategory::User => "User",
        };
        write!(f, "{}", kind)
    }
}

// =============================================================================
// Scope
// =============================================================================

/// Parent collection a resource is addressed through
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Tenant { tenant: String },
    TenantSpace { tenant: String, tenant_space: String },
    AvailabilityZone { zone: String },
    Array { zone: String, array: String },
    Role { role: String },
}

impl Scope {
    pub fn tenant(tenant: impl Into<String>) -> Self {
        Scope::Tenant {
            tenant: tenant.into(),
        }
    }

    pub fn tenant_space(tenant: impl Into<String>, tenant_space: impl Into<String>) -> Self {
        Scope::TenantSpace {
            tenant: tenant.into(),
            tenant_space: tenant_space.into(),
        }
    }

    pub fn zone(zone: impl Into<String>) -> Self {
        Scope::AvailabilityZone { zone: zone.into() }
    }

    pub fn array(zone: impl Into<String>, array: impl Into<String>) -> Self {
        Scope::Array {
            zone: zone.into(),
            array: array.into(),
        }
    }

    pub fn role(role: impl Into<String>) -> Self {
        Scope::Role { role: role.into() }
    }

    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Global => ScopeKind::Global,
            Scope::Tenant { .. } => ScopeKind::Tenant,
            Scope::TenantSpace { .. } => ScopeKind::TenantSpace,
            Scope::AvailabilityZone { .. } => ScopeKind::AvailabilityZone,
            Scope::Array { .. } => ScopeKind::Array,
            Scope::Role { .. } => ScopeKind::Role,
        }
    }

    /// Percent-encoded path of the parent, empty for global collections
    pub fn path(&self) -> String {
        let enc = |s: &str| urlencoding::encode(s).into_owned();
        match self {
            Scope::Global => String::new(),
            Scope::Tenant { tenant } => format!("/tenants/{}", enc(tenant)),
            Scope::TenantSpace {
                tenant,
                tenant_space,
            } => format!(
                "/tenants/{}/tenant-spaces/{}",
                enc(tenant),
                enc(tenant_space)
            ),
            Scope::AvailabilityZone { zone } => format!("/availability-zones/{}", enc(zone)),
            Scope::Array { zone, array } => format!(
                "/availability-zones/{}/arrays/{}",
                enc(zone),
                enc(array)
            ),
            Scope::Role { role } => format!("/roles/{}", enc(role)),
        }
    }

    /// Human-readable composite key, e.g. `tenant1/space1/vol1`
    pub fn qualify(&self, name: &str) -> String {
        match self {
            Scope::Global => name.to_string(),
            Scope::Tenant { tenant } => format!("{}/{}", tenant, name),
            Scope::TenantSpace {
                tenant,
                tenant_space,
            } => format!("{}/{}/{}", tenant, tenant_space, name),
            Scope::AvailabilityZone { zone } => format!("{}/{}", zone, name),
            Scope::Array { zone, array } => format!("{}/{}/{}", zone, array, name),
            Scope::Role { role } => format!("{}/{}", role, name),
        }
    }
}

/// Relative collection path for `category` under `scope`
pub fn collection_path(scope: &Scope, category: ResourceCategory) -> Result<String> {
    if scope.kind() != category.scope_kind() {
        return Err(Error::Internal(format!(
            "{} cannot be addressed through scope {:?}",
            category, scope
        )));
    }
    Ok(format!("{}/{}", scope.path(), category.segment()))
}

/// Relative path of one named resource
pub fn resource_path(scope: &Scope, category: ResourceCategory, name: &str) -> Result<String> {
    Ok(format!(
        "{}/{}",
        collection_path(scope, category)?,
        urlencoding::encode(name)
    ))
}

// =============================================================================
// Operations
// =============================================================================

/// Lifecycle state of an asynchronous operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    Running,
    Paused,
    Aborting,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Succeeded | OperationStatus::Failed)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "Pending"),
            OperationStatus::Running => write!(f, "Running"),
            OperationStatus::Paused => write!(f, "Paused"),
            OperationStatus::Aborting => write!(f, "Aborting"),
            OperationStatus::Succeeded => write!(f, "Succeeded"),
            OperationStatus::Failed => write!(f, "Failed"),
            OperationStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Error payload attached to a failed operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub pure_code: Option<String>,
    #[serde(default)]
    pub http_code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.message.as_deref().unwrap_or("no error message returned")
        )?;
        if let Some(code) = &self.pure_code {
            write!(f, " (pure_code: {}", code)?;
            if let Some(http) = self.http_code {
                write!(f, ", http_code: {}", http)?;
            }
            write!(f, ")")?;
        }
        if let Some(details) = &self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

/// Handle to asynchronous work returned by every mutating call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub status: OperationStatus,
    #[serde(default)]
    pub request_type: Option<String>,
    /// Milliseconds the service suggests waiting before the next poll
    #[serde(default)]
    pub retry_in: Option<u64>,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Operation {
    pub fn new(id: impl Into<String>, status: OperationStatus) -> Self {
        Self {
            id: id.into(),
            status,
            request_type: None,
            retry_in: None,
            error: None,
            created_at: None,
        }
    }
}

// =============================================================================
// Capability Ports
// =============================================================================

/// Generic CRUD surface over every resource category
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Point read; a missing resource is `Error::ResourceNotFound`
    async fn get(&self, scope: &Scope, category: ResourceCategory, name: &str) -> Result<Value>;

    async fn list(&self, scope: &Scope, category: ResourceCategory) -> Result<Vec<Value>>;

    async fn create(&self, scope: &Scope, category: ResourceCategory, body: Value)
        -> Result<Operation>;

    async fn update(
        &self,
        scope: &Scope,
        category: ResourceCategory,
        name: &str,
        patch: Value,
    ) -> Result<Operation>;

    async fn delete(&self, scope: &Scope, category: ResourceCategory, name: &str)
        -> Result<Operation>;
}

/// Status endpoint for asynchronous operations
#[async_trait]
pub trait OperationsApi: Send + Sync {
    async fn get_operation(&self, id: &str) -> Result<Operation>;
}

/// Read-only endpoints used only by the inventory report
#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn version(&self) -> Result<String>;

    async fn array_space(&self, zone: &str, array: &str) -> Result<Value>;

    async fn array_performance(&self, zone: &str, array: &str) -> Result<Value>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ResourceApiRef = Arc<dyn ResourceApi>;
pub type OperationsApiRef = Arc<dyn OperationsApi>;
pub type InventoryApiRef = Arc<dyn InventoryApi>;

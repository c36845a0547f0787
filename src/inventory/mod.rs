//! Inventory Report
//!
//! Read-only aggregation of Fusion state into name-keyed maps, one per
//! requested subset.

pub mod aggregator;

pub use aggregator::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Category of information the report can gather
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subset {
    All,
    Minimum,
    Hardware,
    Users,
    Subnets,
    Zones,
    Roles,
    Placements,
    Volumes,
    ProtectionPolicies,
    PlacementGroups,
    Storageclass,
    Interfaces,
    Hosts,
    Arrays,
    Tenants,
    TenantSpaces,
    TenantNetworks,
    Snapshots,
}

impl Subset {
    pub const VALID: [Subset; 19] = [
        Subset::All,
        Subset::Minimum,
        Subset::Roles,
        Subset::Users,
        Subset::Placements,
        Subset::Arrays,
        Subset::Hardware,
        Subset::Volumes,
        Subset::Hosts,
        Subset::Storageclass,
        Subset::ProtectionPolicies,
        Subset::PlacementGroups,
        Subset::Interfaces,
        Subset::Zones,
        Subset::Subnets,
        Subset::Snapshots,
        Subset::Tenants,
        Subset::TenantSpaces,
        Subset::TenantNetworks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subset::All => "all",
            Subset::Minimum => "minimum",
            Subset::Hardware => "hardware",
            Subset::Users => "users",
            Subset::Subnets => "subnets",
            Subset::Zones => "zones",
            Subset::Roles => "roles",
            Subset::Placements => "placements",
            Subset::Volumes => "volumes",
            Subset::ProtectionPolicies => "protection_policies",
            Subset::PlacementGroups => "placement_groups",
            Subset::Storageclass => "storageclass",
            Subset::Interfaces => "interfaces",
            Subset::Hosts => "hosts",
            Subset::Arrays => "arrays",
            Subset::Tenants => "tenants",
            Subset::TenantSpaces => "tenant_spaces",
            Subset::TenantNetworks => "tenant_networks",
            Subset::Snapshots => "snapshots",
        }
    }

    /// Key the subset's data is reported under
    pub fn report_key(&self) -> &'static str {
        match self {
            Subset::Minimum => "default",
            other => other.as_str(),
        }
    }

    /// Parse a list of names, failing on the first invalid one
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Subset>> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }

    /// Expand `all` and de-duplicate; an empty request means `minimum`
    pub fn resolve(requested: &[Subset]) -> BTreeSet<Subset> {
        if requested.is_empty() {
            return BTreeSet::from([Subset::Minimum]);
        }
        if requested.contains(&Subset::All) {
            return Subset::VALID
                .iter()
                .copied()
                .filter(|s| *s != Subset::All)
                .collect();
        }
        requested.iter().copied().collect()
    }
}

impl std::fmt::Display for Subset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Subset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Subset::VALID
            .iter()
            .copied()
            .find(|subset| subset.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Subset::VALID.iter().map(Subset::as_str).collect();
                Error::Validation(format!(
                    "gather_subset must be one or more of: {}, got: {}",
                    valid.join(","),
                    s
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Volumes".parse::<Subset>().unwrap(), Subset::Volumes);
        assert_eq!(
            "TENANT_NETWORKS".parse::<Subset>().unwrap(),
            Subset::TenantNetworks
        );
    }

    #[test]
    fn test_invalid_subset_lists_valid_values() {
        let err = Subset::parse_all(&["volumes", "disks"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("got: disks"));
        assert!(msg.contains("tenant_spaces"));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Subset::resolve(&[]), BTreeSet::from([Subset::Minimum]));

        let all = Subset::resolve(&[Subset::All, Subset::Users]);
        assert_eq!(all.len(), Subset::VALID.len() - 1);
        assert!(!all.contains(&Subset::All));

        let some = Subset::resolve(&[Subset::Users, Subset::Users, Subset::Zones]);
        assert_eq!(some.len(), 2);
    }

    #[test]
    fn test_report_keys() {
        assert_eq!(Subset::Minimum.report_key(), "default");
        assert_eq!(Subset::Storageclass.report_key(), "storageclass");
    }
}

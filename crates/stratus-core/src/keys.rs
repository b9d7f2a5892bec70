//! Object store key scheme.
//!
//! Keys are path-shaped and deterministic: `/ns/{ns}/resources/{kind}/{id}`
//! for catalog resources, with nested parent/child keys for dependent kinds
//! (a subnet is keyed under its owning network). Building a key for an
//! unsupported kind yields the [`INVALID_KEY`] sentinel, which callers must
//! treat as an error and never use as a store key.

/// Sentinel returned for any unsupported kind/id combination.
pub const INVALID_KEY: &str = "/invalid-key";

/// Resource kinds that own a top-level key under a namespace.
pub const KIND_SPEC: &str = "spec";
pub const KIND_IMAGE: &str = "image";
pub const KIND_CUSTOM_IMAGE: &str = "custom-image";
pub const KIND_SSH_KEY: &str = "ssh-key";
pub const KIND_VNET: &str = "vnet";
pub const KIND_SECURITY_GROUP: &str = "security-group";
pub const KIND_DATA_DISK: &str = "data-disk";

/// Child kind keyed under its parent network.
pub const KIND_SUBNET: &str = "subnet";

/// All kinds with a top-level resource key.
pub const RESOURCE_KINDS: &[&str] = &[
    KIND_SPEC,
    KIND_IMAGE,
    KIND_CUSTOM_IMAGE,
    KIND_SSH_KEY,
    KIND_VNET,
    KIND_SECURITY_GROUP,
    KIND_DATA_DISK,
];

/// Whether a key is usable (not the invalid sentinel).
pub fn is_valid_key(key: &str) -> bool {
    key != INVALID_KEY
}

/// Key for a top-level resource object.
///
/// Returns [`INVALID_KEY`] for unsupported kinds, including child-only kinds
/// such as `subnet`.
pub fn resource_key(ns: &str, kind: &str, id: &str) -> String {
    if RESOURCE_KINDS.contains(&kind) {
        format!("/ns/{ns}/resources/{kind}/{id}")
    } else {
        INVALID_KEY.to_string()
    }
}

/// Key for a child resource nested under its parent.
///
/// Only `subnet` (under a `vnet`) is a supported child kind; anything else
/// yields [`INVALID_KEY`].
pub fn child_resource_key(ns: &str, kind: &str, parent_id: &str, id: &str) -> String {
    if kind == KIND_SUBNET {
        format!("/ns/{ns}/resources/{KIND_VNET}/{parent_id}/{KIND_SUBNET}/{id}")
    } else {
        INVALID_KEY.to_string()
    }
}

/// Key for an MCIS object, or for a VM within it when `vm_id` is given.
pub fn mcis_key(ns: &str, mcis_id: &str, vm_id: Option<&str>) -> String {
    match vm_id {
        Some(vm) => format!("/ns/{ns}/mcis/{mcis_id}/vm/{vm}"),
        None => format!("/ns/{ns}/mcis/{mcis_id}"),
    }
}

/// Key for a subgroup within an MCIS.
pub fn subgroup_key(ns: &str, mcis_id: &str, group_id: &str) -> String {
    format!("/ns/{ns}/mcis/{mcis_id}/subgroup/{group_id}")
}

/// Key for an MCIS automation policy document.
pub fn policy_key(ns: &str, mcis_id: &str) -> String {
    format!("/ns/{ns}/policy/mcis/{mcis_id}")
}

/// Prefix under which all MCIS objects of a namespace live.
pub fn mcis_prefix(ns: &str) -> String {
    format!("/ns/{ns}/mcis/")
}

/// Prefix under which all policy documents of a namespace live.
pub fn policy_prefix(ns: &str) -> String {
    format!("/ns/{ns}/policy/mcis/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_keys_are_deterministic() {
        assert_eq!(
            resource_key("ns01", KIND_DATA_DISK, "disk01"),
            "/ns/ns01/resources/data-disk/disk01"
        );
        assert_eq!(
            resource_key("ns01", KIND_DATA_DISK, "disk01"),
            resource_key("ns01", KIND_DATA_DISK, "disk01"),
        );
    }

    #[test]
    fn distinct_inputs_yield_distinct_keys() {
        let keys = [
            resource_key("ns01", KIND_SPEC, "a"),
            resource_key("ns01", KIND_IMAGE, "a"),
            resource_key("ns01", KIND_SPEC, "b"),
            resource_key("ns02", KIND_SPEC, "a"),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn unsupported_kind_yields_sentinel() {
        assert_eq!(resource_key("ns01", "public-ip", "x"), INVALID_KEY);
        assert_eq!(resource_key("ns01", "vnic", "x"), INVALID_KEY);
        // subnet has no top-level key; it is child-only.
        assert_eq!(resource_key("ns01", KIND_SUBNET, "x"), INVALID_KEY);
        assert!(!is_valid_key(&resource_key("ns01", "nope", "x")));
    }

    #[test]
    fn subnet_nests_under_its_vnet() {
        assert_eq!(
            child_resource_key("ns01", KIND_SUBNET, "net01", "sub01"),
            "/ns/ns01/resources/vnet/net01/subnet/sub01"
        );
        assert_eq!(child_resource_key("ns01", KIND_DATA_DISK, "p", "c"), INVALID_KEY);
    }

    #[test]
    fn mcis_keys() {
        assert_eq!(mcis_key("ns01", "mcis01", None), "/ns/ns01/mcis/mcis01");
        assert_eq!(
            mcis_key("ns01", "mcis01", Some("g1-1")),
            "/ns/ns01/mcis/mcis01/vm/g1-1"
        );
        assert_eq!(
            subgroup_key("ns01", "mcis01", "g1"),
            "/ns/ns01/mcis/mcis01/subgroup/g1"
        );
    }

    #[test]
    fn policy_keys() {
        assert_eq!(policy_key("ns01", "mcis01"), "/ns/ns01/policy/mcis/mcis01");
        assert!(policy_key("ns01", "mcis01").starts_with(&policy_prefix("ns01")));
    }
}

use workspace_tests::{read_manifest, workspace_root, MEMBER_CRATES};

/// Unit tests for workspace configuration validation
#[cfg(test)]
mod workspace_configuration_tests {
    use super::*;

    /// Test that root Cargo.toml lists every member crate
    #[test]
    fn test_root_cargo_toml_contains_expected_members() {
        let root = read_manifest(&workspace_root().join("Cargo.toml"))
            .expect("Should be able to read root Cargo.toml");

        let members: Vec<&str> = root
            .get("workspace")
            .and_then(|w| w.get("members"))
            .and_then(|m| m.as_array())
            .expect("Root Cargo.toml should contain a members array")
            .iter()
            .filter_map(|m| m.as_str())
            .collect();

        for member in MEMBER_CRATES.iter().chain(["workspace-tests"].iter()) {
            assert!(
                members.contains(member),
                "Root Cargo.toml should contain member: {}",
                member
            );
        }

        assert_eq!(
            root.get("workspace")
                .and_then(|w| w.get("resolver"))
                .and_then(|r| r.as_str()),
            Some("2"),
            "Root Cargo.toml should use resolver version 2"
        );
    }

    /// Test that every member crate has a library entry point
    #[test]
    fn test_member_crates_have_lib_rs() {
        for member in MEMBER_CRATES {
            let lib_rs = workspace_root().join(member).join("src/lib.rs");
            assert!(lib_rs.exists(), "{} should have src/lib.rs", member);
        }
    }
}

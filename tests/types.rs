// ABOUTME: Integration tests for type-safe identifiers and validated types.
// ABOUTME: Tests parsing, validation, and the ID prefix rules the runtime uses.

use dockyard::types::*;

mod image_ref_tests {
    use super::*;

    #[test]
    fn parse_simple_name_defaults_to_latest() {
        let img = ImageRef::parse("nginx").unwrap();
        assert_eq!(img.name(), "nginx");
        assert_eq!(img.tag(), Some("latest"));
        assert!(img.registry().is_none());
    }

    #[test]
    fn parse_with_registry_port() {
        let img = ImageRef::parse("localhost:5000/team/app:v2").unwrap();
        assert_eq!(img.registry(), Some("localhost:5000"));
        assert_eq!(img.name(), "team/app");
        assert_eq!(img.tag(), Some("v2"));
    }

    #[test]
    fn parse_digest_has_no_default_tag() {
        let img = ImageRef::parse("nginx@sha256:abc123def456").unwrap();
        assert_eq!(img.digest(), Some("sha256:abc123def456"));
        assert!(img.tag().is_none());
    }

    #[test]
    fn shell_metacharacters_are_rejected() {
        for input in ["nginx;rm", "nginx latest", "$(id)", "nginx|cat", "nginx`x`"] {
            assert!(ImageRef::parse(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn uppercase_repository_is_rejected() {
        assert_eq!(
            ImageRef::parse("Nginx:latest"),
            Err(ParseImageRefError::NotLowercase)
        );
    }

    #[test]
    fn repository_drops_hub_prefixes() {
        let img = ImageRef::parse("docker.io/library/nginx:1.27").unwrap();
        assert_eq!(img.repository(), "nginx");
        assert!(img.matches_repo_tag("nginx:1.27"));
        assert!(!img.matches_repo_tag("nginx:latest"));
    }

    #[test]
    fn display_round_trips() {
        let img = ImageRef::parse("ghcr.io/org/repo:v1").unwrap();
        assert_eq!(img.to_string(), "ghcr.io/org/repo:v1");
    }
}

mod resource_name_tests {
    use super::*;

    #[test]
    fn accepts_runtime_alphabet() {
        assert!(ResourceName::new("web").is_ok());
        assert!(ResourceName::new("my_app.v2-blue").is_ok());
        assert!(ResourceName::new("0abc").is_ok());
    }

    #[test]
    fn rejects_bad_start_and_characters() {
        assert_eq!(ResourceName::new(""), Err(ResourceNameError::Empty));
        assert_eq!(ResourceName::new("-web"), Err(ResourceNameError::InvalidStart));
        assert_eq!(
            ResourceName::new("web app"),
            Err(ResourceNameError::InvalidChar(' '))
        );
    }

    #[test]
    fn length_limit_is_inclusive() {
        let max = "a".repeat(MAX_NAME_LENGTH);
        assert!(ResourceName::new(&max).is_ok());
        assert_eq!(
            ResourceName::new(&format!("{max}a")),
            Err(ResourceNameError::TooLong)
        );
    }
}

mod port_mapping_tests {
    use super::*;

    #[test]
    fn default_protocol_is_tcp() {
        let port = PortMapping::parse("8080:80").unwrap();
        assert_eq!(port.host_port, 8080);
        assert_eq!(port.container_port, 80);
        assert_eq!(port.protocol, Protocol::Tcp);
    }

    #[test]
    fn udp_is_accepted() {
        assert_eq!(
            PortMapping::parse("53:53/udp").unwrap().protocol,
            Protocol::Udp
        );
    }

    #[test]
    fn malformed_mappings_are_rejected() {
        assert!(matches!(
            PortMapping::parse("8080:80:extra"),
            Err(PortMappingError::InvalidFormat(_))
        ));
        assert!(matches!(
            PortMapping::parse("abc:80"),
            Err(PortMappingError::InvalidPort { role: "host", .. })
        ));
        assert!(PortMapping::parse("0:80").is_err());
        assert!(PortMapping::parse("8080:65536").is_err());
        assert!(PortMapping::parse("8080:80/sctp").is_err());
    }
}

mod env_entry_tests {
    use super::*;

    #[test]
    fn value_may_contain_equals() {
        let entry = EnvEntry::parse("URL=a=b").unwrap();
        assert_eq!(entry.key(), "URL");
        assert_eq!(entry.value(), "a=b");
    }

    #[test]
    fn bad_keys_are_rejected() {
        assert_eq!(EnvEntry::parse("=value"), Err(EnvEntryError::EmptyKey));
        assert!(matches!(
            EnvEntry::parse("1KEY=value"),
            Err(EnvEntryError::InvalidStart(_))
        ));
        assert!(matches!(
            EnvEntry::parse("NOVALUE"),
            Err(EnvEntryError::MissingSeparator(_))
        ));
    }
}

mod id_tests {
    use super::*;

    #[test]
    fn prefix_matches_with_or_without_digest() {
        let id = ImageId::new("sha256:4e1b5d7c9a2f00112233445566778899aabbccddeeff00112233445566778899");
        assert!(id.matches("4e1b5d7c9a2f"));
        assert!(id.matches("sha256:4e1b"));
        assert!(!id.matches("5e1b"));
        assert!(!id.matches(""));
        assert_eq!(id.short(), "4e1b5d7c9a2f");
    }

    #[test]
    fn container_id_short_form() {
        let id = ContainerId::new("abcdef0123456789");
        assert_eq!(id.short(), "abcdef012345");
    }
}

mod label_tests {
    use super::*;

    #[test]
    fn keys_without_separator_or_whitespace() {
        assert!(check_label("com.example.tier", "web").is_ok());
        assert_eq!(check_label("", "x"), Err(LabelError::EmptyKey));
        assert!(check_label("a=b", "x").is_err());
        assert!(check_label("a b", "x").is_err());
        assert!(check_label("ok", "nul\0").is_err());
    }
}

// ABOUTME: Container image reference parsing and validation.
// ABOUTME: Handles formats like nginx, nginx:tag, registry:5000/org/image:tag@digest.

use std::fmt;
use thiserror::Error;

const MAX_LENGTH: usize = 255;
const MAX_TAG_LENGTH: usize = 128;
const DEFAULT_REGISTRIES: [&str; 3] = ["docker.io", "index.docker.io", "registry-1.docker.io"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("image reference exceeds maximum length of {MAX_LENGTH} characters")]
    TooLong,

    #[error("invalid character in image reference: {0:?}")]
    InvalidChar(char),

    #[error("repository name must be lowercase")]
    NotLowercase,

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    registry: Option<String>,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }
        if input.len() > MAX_LENGTH {
            return Err(ParseImageRefError::TooLong);
        }

        // Whitespace and shell metacharacters never reach the command line.
        for c in input.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_' | '@') {
                return Err(ParseImageRefError::InvalidChar(c));
            }
        }

        if !input.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) => {
                Self::check_digest(after, input)?;
                (before, Some(after.to_string()))
            }
            None => (input, None),
        };

        // A colon after the last slash separates the tag; earlier colons
        // belong to a registry port.
        let last_slash = without_digest.rfind('/').map_or(0, |i| i + 1);
        let (without_tag, tag) = match without_digest[last_slash..].rfind(':') {
            Some(offset) => {
                let split = last_slash + offset;
                let tag = &without_digest[split + 1..];
                Self::check_tag(tag, input)?;
                (&without_digest[..split], Some(tag.to_string()))
            }
            None => (without_digest, None),
        };

        let (registry, name) = Self::parse_registry_and_name(without_tag)?;

        // Default tag to "latest" if no tag and no digest
        let tag = match (&tag, &digest) {
            (None, None) => Some("latest".to_string()),
            _ => tag,
        };

        Ok(Self {
            registry,
            name,
            tag,
            digest,
        })
    }

    fn parse_registry_and_name(
        input: &str,
    ) -> Result<(Option<String>, String), ParseImageRefError> {
        // A registry is present if the first component contains a dot or colon,
        // or is "localhost"
        let (registry, path) = match input.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first.to_string()), rest)
            }
            _ => (None, input),
        };

        if path.is_empty() {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        for component in path.split('/') {
            let valid_edges = component.starts_with(|c: char| c.is_ascii_alphanumeric())
                && component.ends_with(|c: char| c.is_ascii_alphanumeric());
            if !valid_edges || component.contains(':') {
                return Err(ParseImageRefError::InvalidFormat(input.to_string()));
            }
        }

        if path.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ParseImageRefError::NotLowercase);
        }

        Ok((registry, path.to_string()))
    }

    fn check_tag(tag: &str, input: &str) -> Result<(), ParseImageRefError> {
        let valid = !tag.is_empty()
            && tag.len() <= MAX_TAG_LENGTH
            && tag.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
            && !tag.contains(['/', '@']);
        if valid {
            Ok(())
        } else {
            Err(ParseImageRefError::InvalidFormat(input.to_string()))
        }
    }

    fn check_digest(digest: &str, input: &str) -> Result<(), ParseImageRefError> {
        let valid = match digest.split_once(':') {
            Some((algorithm, hex)) => {
                !algorithm.is_empty()
                    && algorithm.chars().all(|c| c.is_ascii_alphanumeric())
                    && !hex.is_empty()
                    && hex.chars().all(|c| c.is_ascii_hexdigit())
            }
            None => false,
        };
        if valid {
            Ok(())
        } else {
            Err(ParseImageRefError::InvalidFormat(input.to_string()))
        }
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// The repository as the runtime lists it: Docker Hub's registry host
    /// and `library/` namespace are dropped.
    pub fn repository(&self) -> String {
        match self.registry.as_deref() {
            Some(registry) if !DEFAULT_REGISTRIES.contains(&registry) => {
                format!("{}/{}", registry, self.name)
            }
            _ => self
                .name
                .strip_prefix("library/")
                .unwrap_or(&self.name)
                .to_string(),
        }
    }

    /// Whether a `repository:tag` string reported by the runtime names this
    /// reference.
    pub fn matches_repo_tag(&self, repo_tag: &str) -> bool {
        match &self.tag {
            Some(tag) => repo_tag == format!("{}:{}", self.repository(), tag),
            None => false,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref registry) = self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_port_is_not_a_tag() {
        let img = ImageRef::parse("localhost:5000/app").unwrap();
        assert_eq!(img.registry(), Some("localhost:5000"));
        assert_eq!(img.name(), "app");
        assert_eq!(img.tag(), Some("latest"));
    }

    #[test]
    fn repository_drops_docker_hub_prefixes() {
        let img = ImageRef::parse("docker.io/library/nginx:1.25").unwrap();
        assert_eq!(img.repository(), "nginx");
        assert!(img.matches_repo_tag("nginx:1.25"));
        assert!(!img.matches_repo_tag("nginx:latest"));
    }

    #[test]
    fn rejects_leading_dash() {
        assert!(matches!(
            ImageRef::parse("-nginx"),
            Err(ParseImageRefError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_uppercase_repository() {
        assert_eq!(
            ImageRef::parse("Nginx").unwrap_err(),
            ParseImageRefError::NotLowercase
        );
    }

    #[test]
    fn rejects_empty_tag_and_bad_digest() {
        assert!(ImageRef::parse("nginx:").is_err());
        assert!(ImageRef::parse("nginx@sha256:").is_err());
        assert!(ImageRef::parse("nginx@sha256:xyz").is_err());
    }
}

// ABOUTME: The ordered phrase table that classifies runtime error text.
// ABOUTME: The only place runtime message wording is matched; first match wins.

use super::ErrorKind;

use ErrorKind::{Conflict, InvalidRequest, NotFound, TransportUnavailable, Unauthorized};

/// Phrases are matched against lower-cased daemon messages and CLI stderr.
///
/// Wording checked against Docker Engine 24 through 27 and the matching CLI
/// releases, and Podman 4 and 5. Order matters: transport problems come
/// first because the CLI wraps them in otherwise generic text; "pull access
/// denied ... repository does not exist" must be unauthorized before the
/// not-found phrases see it; a missing executable is the daemon's 400, not a
/// missing resource.
pub(crate) const PATTERNS: &[(&str, ErrorKind)] = &[
    ("cannot connect to the docker daemon", TransportUnavailable),
    ("is the docker daemon running", TransportUnavailable),
    ("permission denied while trying to connect", TransportUnavailable),
    ("error during connect", TransportUnavailable),
    ("cannot connect to podman", TransportUnavailable),
    ("unable to connect to podman socket", TransportUnavailable),
    ("pull access denied", Unauthorized),
    ("unauthorized", Unauthorized),
    ("authentication required", Unauthorized),
    ("no basic auth credentials", Unauthorized),
    ("requested access to the resource is denied", Unauthorized),
    ("already in use", Conflict),
    ("already exists", Conflict),
    ("is already allocated", Conflict),
    ("is in use", Conflict),
    ("has active endpoints", Conflict),
    ("container is running", Conflict),
    ("cannot remove a running container", Conflict),
    ("cannot be removed without force", Conflict),
    ("is being used", Conflict),
    ("image is referenced in multiple repositories", Conflict),
    ("unable to delete", Conflict),
    ("must be forced", Conflict),
    ("must force", Conflict),
    ("conflict", Conflict),
    ("executable file not found", InvalidRequest),
    ("no such container", NotFound),
    ("no such image", NotFound),
    ("no such network", NotFound),
    ("no such volume", NotFound),
    ("no such object", NotFound),
    ("image not known", NotFound),
    ("no container with name or id", NotFound),
    ("unable to find network", NotFound),
    ("manifest unknown", NotFound),
    ("repository does not exist", NotFound),
    ("not found", NotFound),
    ("invalid reference format", InvalidRequest),
    ("pool overlaps", InvalidRequest),
    ("invalid pool request", InvalidRequest),
    ("invalid", InvalidRequest),
    ("requires", InvalidRequest),
    ("not supported", InvalidRequest),
];

/// The kind of the first phrase that appears in `text`.
pub(crate) fn match_text(text: &str) -> Option<ErrorKind> {
    let lower = text.to_lowercase();
    PATTERNS
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, kind)| *kind)
}

/// Like [`match_text`], considering only phrases of the given kinds.
pub(crate) fn match_kinds(text: &str, kinds: &[ErrorKind]) -> Option<ErrorKind> {
    let lower = text.to_lowercase();
    PATTERNS
        .iter()
        .filter(|(_, kind)| kinds.contains(kind))
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, kind)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_denied_is_unauthorized_not_missing() {
        assert_eq!(
            match_text(
                "pull access denied for nosuch, repository does not exist or may require 'docker login'"
            ),
            Some(ErrorKind::Unauthorized)
        );
    }

    #[test]
    fn daemon_down_beats_everything() {
        assert_eq!(
            match_text("Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?"),
            Some(ErrorKind::TransportUnavailable)
        );
    }

    #[test]
    fn name_collision_is_conflict() {
        assert_eq!(
            match_text("Conflict. The container name \"/web\" is already in use by container \"abc\""),
            Some(ErrorKind::Conflict)
        );
    }

    #[test]
    fn missing_executable_is_not_a_missing_resource() {
        assert_eq!(
            match_text("exec: \"nosuch\": executable file not found in $PATH"),
            Some(ErrorKind::InvalidRequest)
        );
    }

    #[test]
    fn unmatched_text() {
        assert_eq!(match_text("something odd happened"), None);
    }

    #[test]
    fn every_phrase_is_lowercase() {
        for (phrase, _) in PATTERNS {
            assert_eq!(*phrase, phrase.to_lowercase());
        }
    }
}

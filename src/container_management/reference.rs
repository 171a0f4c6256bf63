//! Parsing and normalization of image references (`registry/repository:tag`).
//!
//! The accepted grammar is the one used by Docker's distribution library:
//!
//! ```text
//! reference  := name [ ":" tag ] [ "@" digest ]
//! name       := [ domain "/" ] path-component [ "/" path-component ]*
//! domain     := host [ ":" port ]
//! tag        := [\w][\w.-]{0,127}
//! digest     := algorithm ":" hex{32,}
//! ```
//!
//! Normalization fills in the Docker Hub defaults: `alpine` becomes
//! `docker.io/library/alpine`, and `index.docker.io` is folded into `docker.io`.

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error_handling::types::ReferenceError;

pub const DEFAULT_DOMAIN: &str = "docker.io";
pub const DEFAULT_TAG: &str = "latest";

const LEGACY_DEFAULT_DOMAIN: &str = "index.docker.io";
const OFFICIAL_REPO_PREFIX: &str = "library/";
const NAME_TOTAL_LENGTH_MAX: usize = 255;

fn reference_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alphanumeric = "[a-z0-9]+";
        let separator = "(?:[._]|__|[-]+)";
        let path_component = format!("{alphanumeric}(?:{separator}{alphanumeric})*");
        let domain_component = "(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
        let ipv6 = r"\[(?:[a-fA-F0-9:]+)\]";
        let host = format!(r"(?:{domain_component}(?:\.{domain_component})*|{ipv6})");
        let domain = format!("{host}(?::[0-9]+)?");
        let name = format!("(?:{domain}/)?{path_component}(?:/{path_component})*");
        let tag = r"[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}";
        let digest = r"[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}";
        Regex::new(&format!("^({name})(?::({tag}))?(?:@({digest}))?$"))
            .expect("reference pattern is a valid regex")
    })
}

fn identifier_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[a-f0-9]{64}$").expect("identifier pattern is a valid regex"))
}

/// A parsed, normalized image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    domain: String,
    path: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    /// Parses a possibly abbreviated reference (`alpine`, `user/app:1.0`,
    /// `ghcr.io/org/tool@sha256:...`) into its fully qualified form.
    pub fn parse_normalized(input: &str) -> Result<Self, ReferenceError> {
        if identifier_regex().is_match(input) {
            return Err(ReferenceError::HexIdentifier(input.to_string()));
        }

        let (domain, remainder) = split_docker_domain(input);

        let remote_name = match remainder.find(':') {
            Some(idx) => &remainder[..idx],
            None => remainder.as_str(),
        };
        if remote_name.to_lowercase() != remote_name {
            return Err(ReferenceError::NameNotLowercase(input.to_string()));
        }

        let qualified = format!("{}/{}", domain, remainder);
        let captures = match reference_regex().captures(&qualified) {
            Some(c) => c,
            None => {
                if input.is_empty() {
                    return Err(ReferenceError::Empty);
                }
                return Err(ReferenceError::InvalidFormat(input.to_string()));
            }
        };

        let name = &captures[1];
        if name.len() > NAME_TOTAL_LENGTH_MAX {
            return Err(ReferenceError::NameTooLong(input.to_string()));
        }

        // `name` always starts with the domain we prefixed above.
        let path = name[domain.len() + 1..].to_string();

        Ok(ImageReference {
            domain,
            path,
            tag: captures.get(2).map(|m| m.as_str().to_string()),
            digest: captures.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// Registry host (with optional port), used as the credential lookup key.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Fully qualified repository name without tag or digest.
    pub fn name(&self) -> String {
        format!("{}/{}", self.domain, self.path)
    }

    /// Short form used by the Docker CLI: Docker Hub defaults are elided.
    pub fn familiar_name(&self) -> String {
        if self.domain != DEFAULT_DOMAIN {
            return self.name();
        }
        match self.path.strip_prefix(OFFICIAL_REPO_PREFIX) {
            Some(rest) if !rest.contains('/') => rest.to_string(),
            _ => self.path.clone(),
        }
    }

    /// The value sent as the `tag` query parameter of a pull: the digest when
    /// pinned, else the explicit tag, else `latest`.
    pub fn api_tag(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or(DEFAULT_TAG)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.path)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

/// Splits `name` into registry domain and remote path, applying Docker Hub
/// defaults. Does not validate either part.
fn split_docker_domain(name: &str) -> (String, String) {
    let (mut domain, mut remainder) = match name.find('/') {
        Some(i) => {
            let first = &name[..i];
            if first.contains(['.', ':']) || first == "localhost" || first.to_lowercase() != first {
                (first.to_string(), name[i + 1..].to_string())
            } else {
                (DEFAULT_DOMAIN.to_string(), name.to_string())
            }
        }
        None => (DEFAULT_DOMAIN.to_string(), name.to_string()),
    };

    if domain == LEGACY_DEFAULT_DOMAIN {
        domain = DEFAULT_DOMAIN.to_string();
    }
    if domain == DEFAULT_DOMAIN && !remainder.contains('/') {
        remainder = format!("{}{}", OFFICIAL_REPO_PREFIX, remainder);
    }
    (domain, remainder)
}

/// Returns `image` with `:latest` appended when it carries neither a tag nor a
/// digest. The check is purely textual; no validation is performed.
pub fn with_default_tag(image: &str) -> Cow<'_, str> {
    if image.contains('@') {
        return Cow::Borrowed(image);
    }
    let last_segment = match image.rfind('/') {
        Some(i) => &image[i + 1..],
        None => image,
    };
    if last_segment.contains(':') {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(format!("{}:{}", image, DEFAULT_TAG))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn official_image_gets_library_prefix() {
        let r = ImageReference::parse_normalized("alpine").unwrap();
        assert_eq!(r.domain(), "docker.io");
        assert_eq!(r.path(), "library/alpine");
        assert_eq!(r.tag(), None);
        assert_eq!(r.to_string(), "docker.io/library/alpine");
        assert_eq!(r.familiar_name(), "alpine");
        assert_eq!(r.api_tag(), "latest");
    }

    #[test]
    fn user_repository_keeps_its_namespace() {
        let r = ImageReference::parse_normalized("someuser/tool:1.2").unwrap();
        assert_eq!(r.domain(), "docker.io");
        assert_eq!(r.path(), "someuser/tool");
        assert_eq!(r.tag(), Some("1.2"));
        assert_eq!(r.familiar_name(), "someuser/tool");
    }

    #[test]
    fn private_registry_with_port_is_the_domain() {
        let r = ImageReference::parse_normalized("localhost:5000/team/app:dev").unwrap();
        assert_eq!(r.domain(), "localhost:5000");
        assert_eq!(r.path(), "team/app");
        assert_eq!(r.tag(), Some("dev"));
        assert_eq!(r.familiar_name(), "localhost:5000/team/app");

        let r = ImageReference::parse_normalized("ghcr.io/org/tool").unwrap();
        assert_eq!(r.domain(), "ghcr.io");
        assert_eq!(r.path(), "org/tool");

        let r = ImageReference::parse_normalized("localhost/app").unwrap();
        assert_eq!(r.domain(), "localhost");
    }

    #[test]
    fn legacy_hub_domain_is_folded() {
        let r = ImageReference::parse_normalized("index.docker.io/busybox").unwrap();
        assert_eq!(r.domain(), "docker.io");
        assert_eq!(r.path(), "library/busybox");
    }

    #[test]
    fn digest_takes_precedence_for_pull_tag() {
        let digest = format!("sha256:{}", "a".repeat(64));
        let r = ImageReference::parse_normalized(&format!("alpine:3.19@{}", digest)).unwrap();
        assert_eq!(r.tag(), Some("3.19"));
        assert_eq!(r.digest(), Some(digest.as_str()));
        assert_eq!(r.api_tag(), digest);
        assert_eq!(
            r.to_string(),
            format!("docker.io/library/alpine:3.19@{}", digest)
        );
    }

    #[test]
    fn invalid_references_are_rejected() {
        assert_eq!(
            ImageReference::parse_normalized(""),
            Err(ReferenceError::Empty)
        );
        assert!(matches!(
            ImageReference::parse_normalized("alpine:"),
            Err(ReferenceError::InvalidFormat(_))
        ));
        assert!(matches!(
            ImageReference::parse_normalized("bad image!"),
            Err(ReferenceError::InvalidFormat(_))
        ));
        assert!(matches!(
            ImageReference::parse_normalized("foo//bar"),
            Err(ReferenceError::InvalidFormat(_))
        ));
        assert!(matches!(
            ImageReference::parse_normalized("Alpine"),
            Err(ReferenceError::NameNotLowercase(_))
        ));
    }

    #[test]
    fn uppercase_domain_is_allowed_but_not_path() {
        let r = ImageReference::parse_normalized("Registry.Example.com/app").unwrap();
        assert_eq!(r.domain(), "Registry.Example.com");
        assert!(matches!(
            ImageReference::parse_normalized("registry.example.com/App"),
            Err(ReferenceError::NameNotLowercase(_))
        ));
    }

    #[test]
    fn bare_identifier_is_rejected() {
        let id = "f".repeat(64);
        assert!(matches!(
            ImageReference::parse_normalized(&id),
            Err(ReferenceError::HexIdentifier(_))
        ));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let long = format!("org/{}", "a".repeat(260));
        assert!(matches!(
            ImageReference::parse_normalized(&long),
            Err(ReferenceError::NameTooLong(_))
        ));
    }

    #[test]
    fn default_tag_only_added_when_missing() {
        assert_eq!(with_default_tag("alpine"), "alpine:latest");
        assert_eq!(with_default_tag("alpine:3.19"), "alpine:3.19");
        assert_eq!(with_default_tag("org/app"), "org/app:latest");
        assert_eq!(
            with_default_tag("localhost:5000/app"),
            "localhost:5000/app:latest"
        );
        assert_eq!(
            with_default_tag("localhost:5000/app:v1"),
            "localhost:5000/app:v1"
        );
        let pinned = format!("alpine@sha256:{}", "0".repeat(64));
        assert_eq!(with_default_tag(&pinned), pinned);
    }
}

//! Image reference parsing.
//!
//! The verifier receives fully qualified names such as
//! `registry.io/team/app:v1` or `registry.io/team/app@sha256:...`. Scope
//! matching is done against the bare `registry/repository` part, so the tag
//! or digest has to be split off.

use std::fmt;

use crate::error::ReferenceError;

/// The tag or digest part of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Tag(String),
    Digest(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub reference: Option<Reference>,
}

impl ImageReference {
    /// Parse `registry/repository[:tag][@digest]`.
    ///
    /// When both a tag and a digest are present the digest wins, as it does
    /// for registries.
    pub fn parse(raw: &str) -> Result<Self, ReferenceError> {
        let (registry, rest) = raw
            .split_once('/')
            .ok_or_else(|| ReferenceError::MissingRepository(raw.to_string()))?;
        if registry.is_empty() || rest.is_empty() {
            return Err(ReferenceError::MissingRepository(raw.to_string()));
        }
        if !is_valid_registry(registry) {
            return Err(ReferenceError::InvalidRegistry {
                reference: raw.to_string(),
                registry: registry.to_string(),
            });
        }

        let (path, digest) = match rest.split_once('@') {
            Some((path, digest)) => (path, Some(digest)),
            None => (rest, None),
        };
        let (repository, tag) = match path.split_once(':') {
            Some((repository, tag)) => (repository, Some(tag)),
            None => (path, None),
        };

        if !is_valid_repository(repository) {
            return Err(ReferenceError::InvalidRepository {
                reference: raw.to_string(),
                repository: repository.to_string(),
            });
        }
        if let Some(tag) = tag {
            if !is_valid_tag(tag) {
                return Err(ReferenceError::InvalidTag {
                    reference: raw.to_string(),
                    tag: tag.to_string(),
                });
            }
        }
        if let Some(digest) = digest {
            if !is_valid_digest(digest) {
                return Err(ReferenceError::InvalidDigest {
                    reference: raw.to_string(),
                    digest: digest.to_string(),
                });
            }
        }

        let reference = match (digest, tag) {
            (Some(digest), _) => Some(Reference::Digest(digest.to_string())),
            (None, Some(tag)) => Some(Reference::Tag(tag.to_string())),
            (None, None) => None,
        };
        Ok(ImageReference {
            registry: registry.to_string(),
            repository: repository.to_string(),
            reference,
        })
    }

    /// `registry/repository`, the form scopes are declared in.
    pub fn repository_path(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        match &self.reference {
            Some(Reference::Tag(tag)) => write!(f, ":{}", tag),
            Some(Reference::Digest(digest)) => write!(f, "@{}", digest),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

fn is_valid_registry(registry: &str) -> bool {
    !registry.is_empty()
        && registry
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

/// Path components are lowercase alphanumerics joined by `.`, `_`, `__` or
/// any run of `-`.
fn is_valid_repository(repository: &str) -> bool {
    !repository.is_empty() && repository.split('/').all(is_valid_path_component)
}

fn is_valid_path_component(component: &str) -> bool {
    let is_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let mut separator = String::new();
    let mut seen_alnum = false;
    for c in component.chars() {
        if is_alnum(c) {
            if !separator.is_empty() {
                if !seen_alnum || !is_valid_separator(&separator) {
                    return false;
                }
                separator.clear();
            }
            seen_alnum = true;
        } else if matches!(c, '.' | '_' | '-') {
            separator.push(c);
        } else {
            return false;
        }
    }
    seen_alnum && separator.is_empty()
}

fn is_valid_separator(sep: &str) -> bool {
    matches!(sep, "." | "_" | "__") || sep.chars().all(|c| c == '-')
}

fn is_valid_tag(tag: &str) -> bool {
    let word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) if word(first) => {}
        _ => return false,
    }
    tag.len() <= 128 && chars.all(|c| word(c) || c == '.' || c == '-')
}

fn is_valid_digest(digest: &str) -> bool {
    let Some((algorithm, encoded)) = digest.split_once(':') else {
        return false;
    };
    let algorithm_ok = !algorithm.is_empty()
        && algorithm
            .split(|c| matches!(c, '+' | '.' | '_' | '-'))
            .all(|part| {
                !part.is_empty()
                    && part
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            });
    if !algorithm_ok || encoded.is_empty() {
        return false;
    }
    let lower_hex = |len: usize| {
        encoded.len() == len
            && encoded
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    };
    match algorithm {
        "sha256" => lower_hex(64),
        "sha512" => lower_hex(128),
        _ => encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '=' | '_' | '-')),
    }
}

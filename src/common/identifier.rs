//! Build-unique namespace for injected support classes
//!
//! One identifier is chosen per build. It becomes the package of every
//! injected support class and the home of the resolver that namespaced
//! markers bootstrap through.

use std::fmt;

use once_cell::sync::OnceCell;
use uuid::Uuid;

use crate::common::error::{Error, Result};
use crate::consts::{DEFAULT_PROJECT_NAME, IDENTIFIER_PREFIX, PLATFORM_METHODS_SIMPLE_NAME};

static GLOBAL_IDENTIFIER: OnceCell<BuildIdentifier> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildIdentifier(String);

impl BuildIdentifier {
    /// A fresh `architectury_inject_<project>_<uuid>` identifier
    pub fn generate(project: &str) -> Self {
        Self(format!(
            "{}{}_{}",
            IDENTIFIER_PREFIX,
            sanitize_project_name(project),
            Uuid::new_v4().simple()
        ))
    }

    /// Use a caller-supplied identifier. It must be a valid internal package name.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let valid = !value.is_empty()
            && value.split('/').all(|segment| {
                !segment.is_empty() && !segment.contains(['.', ';', '[', '<', '>', ':'])
            });
        if !valid {
            return Err(Error::config_error(format!("'{}' is not a valid package name", value)));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Internal name of the resolver class for namespaced markers
    pub fn resolver_class(&self) -> String {
        format!("{}/{}", self.0, PLATFORM_METHODS_SIMPLE_NAME)
    }

    /// Fix the identifier of the running build. The first caller wins and
    /// every caller gets the identifier actually in effect.
    pub fn init_global(identifier: BuildIdentifier) -> &'static BuildIdentifier {
        GLOBAL_IDENTIFIER.get_or_init(|| identifier)
    }
}

impl fmt::Display for BuildIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BuildIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Keep `[A-Za-z0-9_]`, replace everything else with `_`
pub fn sanitize_project_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        DEFAULT_PROJECT_NAME.to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identifier_shape() {
        let id = BuildIdentifier::generate("my-mod.fabric");
        let rest = id.as_str().strip_prefix("architectury_inject_my_mod_fabric_").unwrap();
        assert_eq!(rest.len(), 32);
        assert!(rest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, BuildIdentifier::generate("my-mod.fabric"));
    }

    #[test]
    fn test_resolver_class() {
        let id = BuildIdentifier::new("abc123").unwrap();
        assert_eq!(id.resolver_class(), "abc123/PlatformMethods");
    }

    #[test]
    fn test_invalid_identifiers() {
        for bad in ["", "a.b", "/a", "a/", "a//b", "a;b", "[a"] {
            assert!(BuildIdentifier::new(bad).is_err(), "{} should be rejected", bad);
        }
        assert!(BuildIdentifier::new("com/example/inject").is_ok());
    }

    #[test]
    fn test_sanitize_project_name() {
        assert_eq!(sanitize_project_name("Hello World-1"), "Hello_World_1");
        assert_eq!(sanitize_project_name(""), "project");
    }

    #[test]
    fn test_global_is_stable() {
        let first = BuildIdentifier::init_global(BuildIdentifier::new("first").unwrap());
        let second = BuildIdentifier::init_global(BuildIdentifier::new("ignored").unwrap());
        assert_eq!(first, second);
        assert_eq!(second.as_str(), "first");
    }
}

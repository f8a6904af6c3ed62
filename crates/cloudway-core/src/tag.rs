// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin tag parsing and formatting.
//!
//! A tag has the form `[service:][namespace/]name[:version]`. The namespace
//! split happens first (at most one `/`), then the remainder is split on `:`.
//! Without a `/`, a two-part `a:b` is read as `name:version` when `b` starts
//! with a digit and as `service:name` otherwise. Component rules are shared
//! with [`PluginTag::new`] so every valid tag formats and parses back to itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CloudwayError;

/// A structured plugin reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PluginTag {
    /// Role hint for the container slot; empty when absent.
    pub service: String,
    /// Owning tenant; empty for system scope.
    pub namespace: String,
    pub name: String,
    /// Requested version; empty resolves the latest installed version.
    pub version: String,
}

impl PluginTag {
    /// Builds a validated tag without a service role.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, CloudwayError> {
        let tag = PluginTag {
            service: String::new(),
            namespace: namespace.into(),
            name: name.into(),
            version: version.into(),
        };
        tag.validate(&tag.to_string())?;
        Ok(tag)
    }

    /// Parses a tag string.
    pub fn parse(input: &str) -> Result<Self, CloudwayError> {
        let fail = |reason: &str| CloudwayError::Parse {
            tag: input.to_string(),
            reason: reason.to_string(),
        };

        if input.matches('/').count() > 1 {
            return Err(fail("more than one `/`"));
        }

        let mut tag = PluginTag::default();

        match input.split_once('/') {
            Some((scope, rest)) => {
                match scope.split_once(':') {
                    Some((service, namespace)) => {
                        tag.service = service.to_string();
                        tag.namespace = namespace.to_string();
                        if service.is_empty() {
                            return Err(fail("empty service"));
                        }
                    }
                    None => tag.namespace = scope.to_string(),
                }
                if tag.namespace.is_empty() {
                    return Err(fail("empty namespace"));
                }
                match rest.split_once(':') {
                    Some((name, version)) => {
                        tag.name = name.to_string();
                        tag.version = version.to_string();
                        if version.is_empty() {
                            return Err(fail("empty version"));
                        }
                    }
                    None => tag.name = rest.to_string(),
                }
            }
            None => {
                let parts: Vec<&str> = input.split(':').collect();
                match parts.as_slice() {
                    [name] => tag.name = name.to_string(),
                    [first, second] => {
                        if starts_with_digit(second) {
                            tag.name = first.to_string();
                            tag.version = second.to_string();
                        } else {
                            if first.is_empty() {
                                return Err(fail("empty service"));
                            }
                            tag.service = first.to_string();
                            tag.name = second.to_string();
                        }
                    }
                    [service, name, version] => {
                        if service.is_empty() {
                            return Err(fail("empty service"));
                        }
                        if version.is_empty() {
                            return Err(fail("empty version"));
                        }
                        tag.service = service.to_string();
                        tag.name = name.to_string();
                        tag.version = version.to_string();
                    }
                    _ => return Err(fail("too many `:` separators")),
                }
            }
        }

        tag.validate(input)?;
        Ok(tag)
    }

    fn validate(&self, input: &str) -> Result<(), CloudwayError> {
        let fail = |reason: String| CloudwayError::Parse {
            tag: input.to_string(),
            reason,
        };

        for (field, value) in [
            ("service", &self.service),
            ("namespace", &self.namespace),
            ("name", &self.name),
            ("version", &self.version),
        ] {
            if value.contains('/') || value.contains(':') {
                return Err(fail(format!("{field} contains a separator")));
            }
        }
        if self.name.is_empty() {
            return Err(fail("empty name".to_string()));
        }
        if starts_with_digit(&self.name) {
            return Err(fail("name must not start with a digit".to_string()));
        }
        if !self.version.is_empty() && !starts_with_digit(&self.version) {
            return Err(fail("version must start with a digit".to_string()));
        }
        Ok(())
    }

    /// Returns this tag without its service role.
    pub fn clean(&self) -> PluginTag {
        PluginTag {
            service: String::new(),
            ..self.clone()
        }
    }

    /// Returns this tag scoped to `namespace`.
    pub fn in_namespace(&self, namespace: &str) -> PluginTag {
        PluginTag {
            namespace: namespace.to_string(),
            ..self.clone()
        }
    }

    /// Returns this tag carrying the given service role.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn is_system(&self) -> bool {
        self.namespace.is_empty()
    }
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

impl fmt::Display for PluginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.service.is_empty() {
            write!(f, "{}:", self.service)?;
        }
        if !self.namespace.is_empty() {
            write!(f, "{}/", self.namespace)?;
        }
        f.write_str(&self.name)?;
        if !self.version.is_empty() {
            write!(f, ":{}", self.version)?;
        }
        Ok(())
    }
}

impl FromStr for PluginTag {
    type Err = CloudwayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PluginTag::parse(s)
    }
}

impl TryFrom<String> for PluginTag {
    type Error = CloudwayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PluginTag::parse(&value)
    }
}

impl From<PluginTag> for String {
    fn from(tag: PluginTag) -> Self {
        tag.to_string()
    }
}

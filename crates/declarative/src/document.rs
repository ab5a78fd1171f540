//! Configuration documents
//!
//! A document is an ordered list of sections, each mapping domain names to
//! declared data, plus before/after hooks and user-declared domains. Both
//! the desired and the previously applied state are documents; neither is
//! mutated once loaded.

use indexmap::IndexMap;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::DomainDefinition;
use crate::error::{Error, Result};
use crate::value::{MapKey, Value};

/// Document versions this crate can read
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// One element of a document's section list
///
/// Entries keep their declaration order, and repeated domain names are kept
/// as parsed so [`Document::validate`] can report them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    entries: Vec<(String, Value)>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a declaration for `domain`
    pub fn with(mut self, domain: &str, value: impl Into<Value>) -> Self {
        self.entries.push((domain.to_string(), value.into()));
        self
    }

    /// Declarations in order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Declared value for `domain`, if any
    pub fn get(&self, domain: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == domain)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First domain name that appears more than once
    fn first_duplicate(&self) -> Option<&str> {
        self.entries.iter().enumerate().find_map(|(i, (name, _))| {
            self.entries[..i]
                .iter()
                .any(|(earlier, _)| earlier == name)
                .then_some(name.as_str())
        })
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(SectionVisitor)
    }
}

struct SectionVisitor;

impl<'de> Visitor<'de> for SectionVisitor {
    type Value = Section;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping from domain name to declared data")
    }

    fn visit_unit<E>(self) -> std::result::Result<Section, E> {
        Ok(Section::new())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Section, A::Error> {
        let mut entries = Vec::new();
        while let Some(key) = access.next_key::<MapKey>()? {
            entries.push((key.0, access.next_value()?));
        }
        Ok(Section { entries })
    }
}

/// A declared machine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: u32,

    /// User-declared domains, by name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub domains: IndexMap<String, DomainDefinition>,

    /// Shell commands run before the first action of a non-empty cycle
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,

    /// Shell commands run after the last action of a non-empty cycle
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,

    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// The "no prior state" document
    pub fn empty() -> Self {
        Self {
            version: 1,
            domains: IndexMap::new(),
            before: Vec::new(),
            after: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// A version-1 document holding the given sections
    pub fn with_sections(sections: Vec<Section>) -> Self {
        Self {
            sections,
            ..Self::empty()
        }
    }

    /// Check version, section uniqueness and domain definitions
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version) {
            return Err(Error::UnsupportedVersion {
                found: self.version,
                supported: SUPPORTED_VERSIONS,
            });
        }

        for (index, section) in self.sections.iter().enumerate() {
            if let Some(domain) = section.first_duplicate() {
                return Err(Error::DuplicateSectionDomain {
                    section: index,
                    domain: domain.to_string(),
                });
            }
        }

        for (name, definition) in &self.domains {
            definition.to_descriptor(name)?;
        }

        Ok(())
    }

    /// Domain names in order of first appearance across sections
    pub fn domain_order(&self) -> Vec<&str> {
        let mut order: Vec<&str> = Vec::new();
        for section in &self.sections {
            for (name, _) in section.entries() {
                if !order.contains(&name) {
                    order.push(name);
                }
            }
        }
        order
    }

    /// Every declaration of `domain`, in section order
    pub fn declarations<'a>(&'a self, domain: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.sections.iter().filter_map(move |s| s.get(domain))
    }
}

//! Domain descriptors and the registry that resolves them
//!
//! A domain is pure data: a collection shape, a key depth and a set of
//! command templates. Built-in domains and user-declared domains go through
//! the same [`Registry`], so adding a backend never needs new code.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::types::{ActionKind, DomainKind, ValueFormat};

/// Command templates for each action kind
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Templates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<String>,
}

impl Templates {
    /// Template for an action kind, if declared
    pub fn get(&self, kind: ActionKind) -> Option<&str> {
        match kind {
            ActionKind::Add => self.add.as_deref(),
            ActionKind::Update => self.update.as_deref(),
            ActionKind::Remove => self.remove.as_deref(),
        }
    }
}

/// Static definition of one configuration domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainDescriptor {
    name: String,
    kind: DomainKind,
    key_depth: usize,
    templates: Templates,
    format: ValueFormat,
}

impl DomainDescriptor {
    /// A list domain with add/remove templates
    pub fn list(name: &str, key_depth: usize, add: &str, remove: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: DomainKind::List,
            key_depth,
            templates: Templates {
                add: Some(add.to_string()),
                update: None,
                remove: Some(remove.to_string()),
            },
            format: ValueFormat::Plain,
        }
    }

    /// A map domain with add/update/remove templates
    pub fn map(name: &str, key_depth: usize, add: &str, update: &str, remove: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: DomainKind::Map,
            key_depth,
            templates: Templates {
                add: Some(add.to_string()),
                update: Some(update.to_string()),
                remove: Some(remove.to_string()),
            },
            format: ValueFormat::Plain,
        }
    }

    /// Build from parts, enforcing that only map domains carry an update template
    pub fn new(
        name: &str,
        kind: DomainKind,
        key_depth: usize,
        templates: Templates,
        format: ValueFormat,
    ) -> Result<Self> {
        if templates.update.is_some() && kind != DomainKind::Map {
            return Err(Error::InvalidDomain {
                name: name.to_string(),
                reason: "an update template is only meaningful for map domains".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            kind,
            key_depth,
            templates,
            format,
        })
    }

    /// Use a different `$value` rendering
    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DomainKind {
        self.kind
    }

    pub fn key_depth(&self) -> usize {
        self.key_depth
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    pub fn format(&self) -> ValueFormat {
        self.format
    }

    /// Template for an action kind, or [`Error::MissingTemplate`]
    pub fn template(&self, kind: ActionKind) -> Result<&str> {
        self.templates.get(kind).ok_or_else(|| Error::MissingTemplate {
            domain: self.name.clone(),
            kind,
        })
    }

    /// Whether changed map values become UPDATE actions
    pub fn supports_update(&self) -> bool {
        self.kind == DomainKind::Map && self.templates.update.is_some()
    }
}

/// A domain as declared in a document's `domains` section
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainDefinition {
    #[serde(default)]
    pub kind: DomainKind,
    #[serde(default)]
    pub depth: usize,
    #[serde(flatten)]
    pub templates: Templates,
    #[serde(default, skip_serializing_if = "is_plain")]
    pub format: ValueFormat,
}

fn is_plain(format: &ValueFormat) -> bool {
    *format == ValueFormat::Plain
}

impl DomainDefinition {
    /// Turn the definition into a descriptor named `name`
    pub fn to_descriptor(&self, name: &str) -> Result<DomainDescriptor> {
        DomainDescriptor::new(
            name,
            self.kind,
            self.depth,
            self.templates.clone(),
            self.format,
        )
    }
}

/// Lookup table of domain descriptors, in registration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    domains: IndexMap<String, DomainDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from descriptors, rejecting duplicates
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = DomainDescriptor>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Register a descriptor
    pub fn register(&mut self, descriptor: DomainDescriptor) -> Result<()> {
        if self.domains.contains_key(descriptor.name()) {
            return Err(Error::DuplicateDomain {
                name: descriptor.name().to_string(),
            });
        }
        log::trace!("Registered domain {}", descriptor.name());
        self.domains.insert(descriptor.name().to_string(), descriptor);
        Ok(())
    }

    /// Resolve a descriptor by name
    pub fn resolve(&self, name: &str) -> Result<&DomainDescriptor> {
        self.domains.get(name).ok_or_else(|| Error::UnknownDomain {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.domains.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainDescriptor> {
        self.domains.values()
    }

    /// Build the registry for one apply cycle
    ///
    /// Built-ins come first, then the desired document's domains, then any
    /// domain only the previous document still defines so that its entries
    /// can be torn down with the templates they were installed with.
    pub fn for_cycle(builtins: &Registry, previous: &Document, desired: &Document) -> Result<Self> {
        let mut registry = builtins.clone();

        for (name, definition) in &desired.domains {
            registry.register(definition.to_descriptor(name)?)?;
        }

        for (name, definition) in &previous.domains {
            if desired.domains.contains_key(name) {
                continue;
            }
            if builtins.contains(name) {
                return Err(Error::DuplicateDomain { name: name.clone() });
            }
            log::debug!("Keeping retired domain {name} from the previous document");
            registry.register(definition.to_descriptor(name)?)?;
        }

        Ok(registry)
    }
}

//! `sysconf domains` - list the domains a configuration can use

use anyhow::Result;
use colored::Colorize;
use declarative::{ActionKind, Document, DomainDescriptor, Registry};
use std::path::Path;

use crate::Context;
use crate::builtins;
use crate::config;
use crate::paths;
use crate::ui;

pub fn run(ctx: &Context, path: Option<&Path>) -> Result<()> {
    let builtins = builtins::registry()?;
    let desired = match path {
        Some(path) => config::load(&paths::expand(&path.to_string_lossy()))?,
        None => Document::empty(),
    };
    let registry = Registry::for_cycle(&builtins, &Document::empty(), &desired)?;

    ui::header("Domains");
    for descriptor in registry.iter() {
        let origin = if desired.domains.contains_key(descriptor.name()) {
            "declared".cyan()
        } else {
            "built-in".dimmed()
        };
        println!(
            "  {} {} {}",
            descriptor.name().bold(),
            describe(descriptor).dimmed(),
            origin
        );
        if ctx.verbose > 0 {
            for kind in [ActionKind::Add, ActionKind::Update, ActionKind::Remove] {
                if let Ok(template) = descriptor.template(kind) {
                    ui::kv(&format!("  {}", kind.verb()), &template.replace('\n', " "));
                }
            }
        }
    }
    Ok(())
}

fn describe(descriptor: &DomainDescriptor) -> String {
    format!("({}, depth {})", descriptor.kind(), descriptor.key_depth())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let registry = builtins::registry().unwrap();
        assert_eq!(describe(registry.resolve("gsettings").unwrap()), "(map, depth 2)");
        assert_eq!(describe(registry.resolve("apt").unwrap()), "(list, depth 0)");
    }
}

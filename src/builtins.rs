//! Built-in domains
//!
//! Every built-in is plain data run through the same registry as the
//! domains a config file declares itself.

use declarative::{DomainDescriptor, Registry, Result, ValueFormat};

/// Replace a symlink at `$key` pointing to `$value`
const SYMLINK_SET: &str = "rm -f $key;\nln -sf $value $key;";

const APT_SOURCE_SET: &str = "echo \"$value\" | sudo tee /etc/apt/sources.list.d/$key > /dev/null;\n\
                              sudo chmod 644 /etc/apt/sources.list.d/$key;\n\
                              sudo apt update;";

const APT_KEYRING_ADD: &str = "sudo install -m 0755 -d $(dirname \"$key\");\n\
                               echo \"$value\" | sudo tee \"$key\" > /dev/null;\n\
                               sudo chmod 644 \"$key\";";

const APT_KEYRING_UPDATE: &str = "echo \"$value\" | sudo tee \"$key\" > /dev/null;\n\
                                  sudo chmod 644 \"$key\";";

/// Descriptors shipped with sysconf, in registration order
pub fn descriptors() -> Vec<DomainDescriptor> {
    vec![
        DomainDescriptor::map(
            "dconf",
            1,
            "dconf write $key '$value'",
            "dconf write $key '$value'",
            "dconf reset $key",
        )
        .with_format(ValueFormat::Gvariant),
        DomainDescriptor::map(
            "gsettings",
            2,
            "gsettings set $key0 $key1 '$value'",
            "gsettings set $key0 $key1 '$value'",
            "gsettings reset $key0 $key1",
        )
        .with_format(ValueFormat::Gvariant),
        DomainDescriptor::list("apt", 0, "sudo apt install -y $value", "sudo apt remove -y $value"),
        DomainDescriptor::list(
            "snap",
            0,
            "sudo snap install $value",
            "value=\"$value\";\nsudo snap remove ${value%% *};",
        ),
        DomainDescriptor::list(
            "pip",
            0,
            "pip install --break-system-packages $value",
            "pip uninstall --break-system-packages -y $value",
        ),
        DomainDescriptor::list("groups", 0, "sudo groupadd \"$value\"", "sudo groupdel \"$value\""),
        DomainDescriptor::list(
            "user-groups",
            1,
            "sudo usermod -aG \"$value\" \"$key\"",
            "sudo gpasswd -d \"$key\" \"$value\"",
        ),
        DomainDescriptor::map(
            "git-config-global",
            1,
            "git config --global \"$key\" \"$value\"",
            "git config --global \"$key\" \"$value\"",
            "git config --global --unset \"$key\"",
        ),
        DomainDescriptor::list(
            "vscode-extensions",
            0,
            "code --install-extension $value",
            "code --uninstall-extension $value",
        ),
        DomainDescriptor::map("symlinks", 1, SYMLINK_SET, SYMLINK_SET, "rm -f $key"),
        DomainDescriptor::list(
            "apt-repository",
            0,
            "sudo add-apt-repository -y $value;\nsudo apt update;",
            "sudo add-apt-repository -r -y $value;\nsudo apt update;",
        ),
        DomainDescriptor::map(
            "apt-source-list",
            1,
            APT_SOURCE_SET,
            APT_SOURCE_SET,
            "sudo rm -f /etc/apt/sources.list.d/$key;\nsudo apt update;",
        ),
        DomainDescriptor::map(
            "apt-keyring",
            1,
            APT_KEYRING_ADD,
            APT_KEYRING_UPDATE,
            "sudo rm -f \"$key\"",
        ),
        DomainDescriptor::list(
            "file-lines",
            1,
            "echo \"$value\" >> $key",
            "sed -i \"/^$value$/d\" $key",
        ),
    ]
}

/// Registry holding every built-in domain
pub fn registry() -> Result<Registry> {
    Registry::from_descriptors(descriptors())
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{ActionKind, DomainAction, DomainKind, Value, expand};

    fn action(kind: ActionKind, key_path: &[&str], value: Value) -> DomainAction {
        DomainAction {
            domain: String::new(),
            kind,
            key_path: key_path.iter().map(ToString::to_string).collect(),
            value,
            previous: None,
        }
    }

    #[test]
    fn test_registry_builds() {
        let registry = registry().unwrap();
        assert_eq!(registry.len(), descriptors().len());
        assert_eq!(registry.resolve("gsettings").unwrap().key_depth(), 2);
        assert_eq!(registry.resolve("apt").unwrap().kind(), DomainKind::List);
    }

    #[test]
    fn test_list_domains_have_no_update() {
        let registry = registry().unwrap();
        for descriptor in registry.iter() {
            if descriptor.kind() == DomainKind::List {
                assert!(!descriptor.supports_update(), "{}", descriptor.name());
            }
        }
    }

    #[test]
    fn test_gsettings_expansion() {
        let registry = registry().unwrap();
        let gsettings = registry.resolve("gsettings").unwrap();

        let set = action(
            ActionKind::Add,
            &["org.gnome.desktop.interface", "color-scheme"],
            Value::from("prefer-dark"),
        );
        assert_eq!(
            expand(&set, gsettings).unwrap(),
            "gsettings set org.gnome.desktop.interface color-scheme '\"prefer-dark\"'"
        );

        let reset = action(
            ActionKind::Remove,
            &["org.gnome.desktop.interface", "color-scheme"],
            Value::from("prefer-dark"),
        );
        assert_eq!(
            expand(&reset, gsettings).unwrap(),
            "gsettings reset org.gnome.desktop.interface color-scheme"
        );
    }

    #[test]
    fn test_dconf_list_value() {
        let registry = registry().unwrap();
        let dconf = registry.resolve("dconf").unwrap();
        let set = action(
            ActionKind::Add,
            &["/org/gnome/shell/favorite-apps"],
            Value::from(vec!["firefox.desktop", "code.desktop"]),
        );
        assert_eq!(
            expand(&set, dconf).unwrap(),
            "dconf write /org/gnome/shell/favorite-apps '[\"firefox.desktop\", \"code.desktop\"]'"
        );
    }

    #[test]
    fn test_dconf_value_with_apostrophe() {
        let registry = registry().unwrap();
        let dconf = registry.resolve("dconf").unwrap();
        let set = action(
            ActionKind::Add,
            &["/org/gnome/desktop/background/picture-uri"],
            Value::from("file:///home/me/it's.png"),
        );
        assert_eq!(
            expand(&set, dconf).unwrap(),
            "dconf write /org/gnome/desktop/background/picture-uri '\"file:///home/me/it\\u0027s.png\"'"
        );
    }

    #[test]
    fn test_snap_remove_keeps_shell_expansion() {
        let registry = registry().unwrap();
        let snap = registry.resolve("snap").unwrap();
        let remove = action(ActionKind::Remove, &[], Value::from("code --classic"));
        assert_eq!(
            expand(&remove, snap).unwrap(),
            "value=\"code --classic\";\nsudo snap remove ${value%% *};"
        );
    }

    #[test]
    fn test_user_groups() {
        let registry = registry().unwrap();
        let user_groups = registry.resolve("user-groups").unwrap();
        let add = action(ActionKind::Add, &["alice"], Value::from("docker"));
        assert_eq!(
            expand(&add, user_groups).unwrap(),
            "sudo usermod -aG \"docker\" \"alice\""
        );
    }
}

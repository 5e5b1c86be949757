//! live-build configuration: APT sources, package lists and `lb config`.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::build_config::BuildConfig;
use crate::defaults::{
    ARCHIVES_DIR, CUSTOM_PACKAGE_LIST_FILE, CUSTOM_REPO_FILE, VYOS_REPO_FILE,
};
use crate::process::Cmd;

const BOOTAPPEND_LIVE: &str = "boot=live components hostname=vyos username=live nopersistence \
noautologin nonetworking union=overlay console=ttyS0,115200 console=tty0 net.ifnames=0 biosdevname=0";

const BOOTAPPEND_LIVE_FAILSAFE: &str = "live components memtest noapic noapm nodma nomce nolapic \
nomodeset nosmp nosplash vga=normal console=ttyS0,115200 console=tty0 net.ifnames=0 biosdevname=0";

const DEBOOTSTRAP_OPTIONS: &str = "--variant=minbase --exclude=isc-dhcp-client,isc-dhcp-common,ifupdown \
--include=apt-utils,ca-certificates,gnupg2";

/// Write APT sources, keys and package lists, then run `lb config`.
pub fn write(config: &BuildConfig) -> Result<()> {
    write_apt_sources(config)?;
    install_apt_keys(config)?;
    write_package_list(config)?;
    run_lb_config(config)
}

/// The VyOS repository line for the configured mirror and branch.
pub fn vyos_repo_entry(config: &BuildConfig) -> String {
    format!("deb {} {} main\n", config.vyos_mirror, config.vyos_branch)
}

/// Write the VyOS repository entry and any additional repositories.
pub fn write_apt_sources(config: &BuildConfig) -> Result<()> {
    println!("Setting up additional APT entries");

    let entry = vyos_repo_entry(config);
    let apt_file = config.build_dir.join(VYOS_REPO_FILE);
    if config.debug {
        println!("Adding these entries to {}:", apt_file.display());
        println!("\t{}", entry);
    }
    write_file(&apt_file, &entry)?;

    if !config.additional_repositories.is_empty() {
        let entries = config.additional_repositories.join("\n");
        if config.debug {
            println!("Adding custom APT entries:");
            println!("{}", entries);
        }
        write_file(&config.build_dir.join(CUSTOM_REPO_FILE), &(entries + "\n"))?;
    }

    Ok(())
}

/// Copy each custom APT key to `<name>.key.chroot` in the archives directory.
pub fn install_apt_keys(config: &BuildConfig) -> Result<()> {
    if config.custom_apt_key.is_empty() {
        return Ok(());
    }

    let key_dir = config.build_dir.join(ARCHIVES_DIR);
    fs::create_dir_all(&key_dir)?;

    for key in &config.custom_apt_key {
        let name = key
            .file_name()
            .with_context(|| format!("invalid APT key path: {}", key.display()))?;
        let dst = key_dir.join(format!("{}.key.chroot", name.to_string_lossy()));
        fs::copy(key, &dst)
            .with_context(|| format!("failed to copy APT key {}", key.display()))?;
    }

    Ok(())
}

/// Write `custom_packages` as a live-build package list.
pub fn write_package_list(config: &BuildConfig) -> Result<()> {
    if config.custom_packages.is_empty() {
        return Ok(());
    }
    write_file(
        &config.build_dir.join(CUSTOM_PACKAGE_LIST_FILE),
        &config.custom_packages.join("\n"),
    )
}

/// Arguments passed to `lb config noauto`, in order.
pub fn lb_config_args(config: &BuildConfig) -> Vec<String> {
    let options: Vec<(&str, Option<String>)> = vec![
        ("architectures", Some(config.build_architecture.clone())),
        ("bootappend-live", Some(BOOTAPPEND_LIVE.to_string())),
        ("bootappend-live-failsafe", Some(BOOTAPPEND_LIVE_FAILSAFE.to_string())),
        ("linux-flavours", Some(config.kernel_flavor.clone())),
        ("linux-packages", Some(format!("linux-image-{}", config.kernel_version))),
        ("bootloader", Some(config.bootloaders.clone())),
        ("binary-images", Some("iso-hybrid".into())),
        ("checksums", Some("sha256 md5".into())),
        ("debian-installer", Some("none".into())),
        ("distribution", Some(config.debian_distribution.clone())),
        ("iso-application", Some("VyOS".into())),
        ("iso-publisher", Some(config.build_by.clone())),
        ("iso-volume", Some("VyOS".into())),
        ("debootstrap-options", Some(DEBOOTSTRAP_OPTIONS.to_string())),
        ("mirror-bootstrap", Some(config.debian_mirror.clone())),
        ("mirror-chroot", Some(config.debian_mirror.clone())),
        ("mirror-chroot-security", Some(config.debian_security_mirror.clone())),
        ("mirror-binary", Some(config.debian_mirror.clone())),
        ("mirror-binary-security", Some(config.debian_security_mirror.clone())),
        ("archive-areas", Some("main contrib non-free".into())),
        ("firmware-chroot", Some("false".into())),
        ("firmware-binary", Some("false".into())),
        ("updates", Some("true".into())),
        ("security", Some("false".into())),
        ("backports", Some("false".into())),
        ("utc-time", Some("true".into())),
        ("apt-recommends", Some("false".into())),
        ("apt-options", Some("--yes -oAPT::Get::allow-downgrades=true".into())),
        ("apt-indices", Some("false".into())),
        ("debug", None),
    ];

    let mut args = vec!["config".to_string(), "noauto".to_string()];
    for (key, value) in options {
        args.push(format!("--{}", key));
        if let Some(value) = value {
            args.push(value);
        }
    }
    args
}

/// Run `lb config` in the build directory.
pub fn run_lb_config(config: &BuildConfig) -> Result<()> {
    println!("Configuring live-build");
    Cmd::new("lb")
        .args(lb_config_args(config))
        .current_dir(&config.build_dir)
        .error_msg("live-build config failed")
        .run_interactive()
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

// Mirrors the clap derive definition in src/main.rs
fn build_cli() -> Command {
    Command::new("latest-version")
        .version(env!("CARGO_PKG_VERSION"))
        .author("latest-version Contributors")
        .about("Find the newest published version of a package")
        .arg(
            Arg::new("ecosystem")
                .required(true)
                .help("Registry kind: package-index (pypi), container-registry (oci, docker), rpm-repository (rpm) or source-host (github)"),
        )
        .arg(
            Arg::new("identifier")
                .required(true)
                .help("Package name, image repository, or owner/repo"),
        )
        .arg(
            Arg::new("base_url")
                .short('b')
                .long("base-url")
                .value_name("URL")
                .help("Registry location overriding the configured or default one"),
        )
        .arg(
            Arg::new("greater_equal")
                .short('g')
                .long("greater-equal")
                .value_name("VERSION")
                .help("Only consider versions greater than or equal to this one"),
        )
        .arg(
            Arg::new("less_than")
                .short('l')
                .long("less-than")
                .value_name("VERSION")
                .help("Only consider versions strictly less than this one"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Configuration file (default: ~/.config/latest-version/config.toml)"),
        )
        .arg(
            Arg::new("tags")
                .long("tags")
                .action(ArgAction::SetTrue)
                .conflicts_with("package_type")
                .help("List source host tags instead of releases"),
        )
        .arg(
            Arg::new("package_type")
                .long("package-type")
                .value_name("TYPE")
                .help("List GitHub Packages versions of this type (container, docker, npm, maven, rubygems, nuget); the identifier is owner/package"),
        )
        .arg(
            Arg::new("arch")
                .long("arch")
                .value_name("ARCH")
                .help("RPM architecture to match besides noarch"),
        )
        .arg(
            Arg::new("mirror_list")
                .long("mirror-list")
                .value_name("URL")
                .help("RPM mirror list; the first mirror it names is used"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("latest-version.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}

//! Command line parsing tests.

use crate::Options;
use std::path::PathBuf;

fn parse(args: &[&str]) -> anyhow::Result<Options> {
    Options::parse(args.iter().map(|arg| arg.to_string()))
}

#[test]
fn no_arguments_means_plain_launch() {
    assert_eq!(parse(&[]).unwrap(), Options::default());
}

#[test]
fn all_flags_are_recognised() {
    let options = parse(&[
        "--stdout",
        "--config",
        "watch.toml",
        "--select",
        "3",
        "--watch",
        "--frame",
        "screen.pbm",
    ])
    .unwrap();

    assert!(options.stdout);
    assert!(options.watch);
    assert!(!options.cancel);
    assert_eq!(options.select, Some(3));
    assert_eq!(options.config, Some(PathBuf::from("watch.toml")));
    assert_eq!(options.frame, Some(PathBuf::from("screen.pbm")));
}

#[test]
fn select_requires_a_number() {
    assert!(parse(&["--select"]).is_err());
    assert!(parse(&["--select", "green"]).is_err());
}

#[test]
fn unknown_argument_is_rejected() {
    let err = parse(&["--brew"]).unwrap_err();
    assert!(err.to_string().contains("--brew"));
}

mod common;

use chrono::{TimeZone, Utc};
use common::{
    HostFile, LATIN1_HOST, LEGACY_HOST, MALFORMED_HOST, NEWER_HOST, NO_BLOCK_HOST,
    UNVERSIONED_HOST,
};
use parser_config::block::find_block;
use parser_config::migrate::standard_steps;
use parser_config::{ConfigGateway, MigrationChain, ParserConfigError, CURRENT_VERSION};
use serde_json::{json, Value};

fn fragment_json(host: &str) -> Value {
    let block = find_block(host.as_bytes()).expect("block present");
    serde_json::from_slice(block.fragment_trimmed()).expect("fragment is JSON")
}

#[test]
fn extract_migrates_legacy_host_without_writing() {
    let host = HostFile::new(LEGACY_HOST);
    let snapshot = ConfigGateway::new()
        .extract(host.path())
        .expect("extract legacy host");

    assert_eq!(snapshot.config.version, CURRENT_VERSION);
    assert_eq!(snapshot.detected_version(), 1);
    assert_eq!(snapshot.migration.applied, vec![1, 2]);
    assert_eq!(snapshot.proxy_source_count(), 2);
    assert_eq!(snapshot.outbound_count(), 2);

    let selector = &snapshot.config.outbounds[0];
    assert_eq!(selector.filters["tag"], json!("!/(RU)/i"));
    assert_eq!(
        selector.add_outbounds,
        vec!["direct-out".to_string(), "auto-proxy-out".to_string()]
    );
    assert_eq!(selector.preferred_default["tag"], json!("/NL/i"));
    assert_eq!(selector.comment, "main selector");

    // Extract neither writes nor applies defaults.
    assert!(snapshot.config.parser.reload_interval.is_empty());
    assert_eq!(host.read(), LEGACY_HOST);
}

#[test]
fn persist_timestamp_rewrites_only_the_fragment() {
    let host = HostFile::new(LEGACY_HOST);
    let instant = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid instant");
    let snapshot = ConfigGateway::new()
        .persist_timestamp(host.path(), instant)
        .expect("persist timestamp");
    assert_eq!(snapshot.config.parser.last_updated, "2024-01-01T00:00:00Z");

    let updated = host.read();
    let before = find_block(LEGACY_HOST.as_bytes()).expect("original block");
    let after = find_block(updated.as_bytes()).expect("updated block");
    assert_eq!(before.prefix, after.prefix);
    assert_eq!(before.suffix, after.suffix);

    let fragment = fragment_json(&updated);
    assert!(fragment.get("version").is_none(), "top-level version re-emitted");
    let parser_config = &fragment["ParserConfig"];
    assert_eq!(parser_config["version"], json!(CURRENT_VERSION));
    assert_eq!(parser_config["parser"]["reload"], json!("4h"));
    assert_eq!(
        parser_config["parser"]["last_updated"],
        json!("2024-01-01T00:00:00Z")
    );
    let selector = &parser_config["outbounds"][0];
    assert!(selector.get("outbounds").is_none(), "legacy selection re-emitted");
    assert_eq!(selector["filters"]["tag"], json!("!/(RU)/i"));
    assert_eq!(selector["options"]["default"], json!("auto-proxy-out"));
    assert_eq!(parser_config["proxies"][0]["skip"][0]["tag"], json!("^RU"));
}

#[test]
fn repeated_persist_is_a_no_op() {
    let host = HostFile::new(LEGACY_HOST);
    let gateway = ConfigGateway::new();
    let instant = Utc
        .with_ymd_and_hms(2024, 6, 1, 8, 0, 0)
        .single()
        .expect("valid instant");
    gateway
        .persist_timestamp(host.path(), instant)
        .expect("first persist");
    let first = host.read();

    gateway.persist(host.path(), None).expect("second persist");
    assert_eq!(host.read(), first);

    gateway
        .persist_timestamp(host.path(), instant)
        .expect("restamp with same instant");
    assert_eq!(host.read(), first);

    let snapshot = gateway.extract(host.path()).expect("extract current");
    assert!(!snapshot.migration.migrated());
    assert_eq!(snapshot.detected_version(), CURRENT_VERSION);
}

#[test]
fn unversioned_fragment_gets_current_version_and_defaults() {
    let host = HostFile::new(UNVERSIONED_HOST);
    let snapshot = ConfigGateway::new()
        .persist(host.path(), None)
        .expect("persist unversioned host");
    assert_eq!(snapshot.config.version, 3);
    assert_eq!(snapshot.config.parser.reload_interval, "4h");
    assert_eq!(snapshot.detected_version(), 1);

    let updated = host.read();
    assert!(updated.starts_with("{\n  \"log\": {}\n}\n/** @ParserConfig\n"));
    assert!(updated.ends_with("\n*/\n// tail\n"));
    let fragment = fragment_json(&updated);
    assert_eq!(fragment["ParserConfig"]["version"], json!(3));
    assert_eq!(fragment["ParserConfig"]["parser"]["reload"], json!("4h"));
    assert!(fragment["ParserConfig"]["parser"].get("last_updated").is_none());
}

#[test]
fn missing_block_fails_both_operations_without_writing() {
    let host = HostFile::new(NO_BLOCK_HOST);
    let gateway = ConfigGateway::new();

    let err = gateway.extract(host.path()).expect_err("no block");
    match &err {
        ParserConfigError::FragmentNotFound { path } => {
            assert_eq!(path.as_deref(), Some(host.path()));
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = gateway
        .persist_timestamp(host.path(), Utc::now())
        .expect_err("no block");
    assert!(matches!(err, ParserConfigError::FragmentNotFound { .. }));
    assert_eq!(host.read(), NO_BLOCK_HOST);
    assert_eq!(host.dir_entries(), 1);
}

#[test]
fn malformed_fragment_is_reported_with_path() {
    let host = HostFile::new(MALFORMED_HOST);
    let err = ConfigGateway::new()
        .persist(host.path(), None)
        .expect_err("malformed JSON");
    match err {
        ParserConfigError::MalformedFragment { path, .. } => {
            assert_eq!(path.as_deref(), Some(host.path()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(host.read(), MALFORMED_HOST);
}

#[test]
fn newer_version_is_rejected_and_left_alone() {
    let host = HostFile::new(NEWER_HOST);
    let err = ConfigGateway::new()
        .persist_timestamp(host.path(), Utc::now())
        .expect_err("newer version");
    match err {
        ParserConfigError::UnsupportedNewerVersion { found, supported } => {
            assert_eq!(found, 99);
            assert_eq!(supported, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(host.read(), NEWER_HOST);
}

#[test]
fn unreadable_host_is_host_io() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let missing = dir.path().join("absent.json");
    let err = ConfigGateway::new()
        .extract(&missing)
        .expect_err("missing file");
    match err {
        ParserConfigError::HostIo { path, source } => {
            assert_eq!(path, missing);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn gap_in_chain_surfaces_as_missing_step() {
    let host = HostFile::new(LEGACY_HOST);
    let chain = MigrationChain::new(
        CURRENT_VERSION,
        standard_steps().into_iter().filter(|step| step.from != 2),
    );
    let err = ConfigGateway::with_chain(chain)
        .persist(host.path(), None)
        .expect_err("gapped chain");
    assert!(matches!(
        err,
        ParserConfigError::MissingMigrationStep { from: 2, .. }
    ));
    assert_eq!(host.read(), LEGACY_HOST);
}

#[test]
fn non_utf8_bytes_outside_block_survive_persist() {
    let host = HostFile::new(LATIN1_HOST);
    let snapshot = ConfigGateway::new()
        .extract(host.path())
        .expect("extract latin-1 host");
    assert_eq!(snapshot.detected_version(), CURRENT_VERSION);

    let instant = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid instant");
    ConfigGateway::new()
        .persist_timestamp(host.path(), instant)
        .expect("persist latin-1 host");

    let updated = host.read_bytes();
    let before = find_block(LATIN1_HOST).expect("original block");
    let after = find_block(&updated).expect("updated block");
    assert_eq!(before.prefix, after.prefix);
    assert_eq!(before.suffix, after.suffix);
    assert!(updated.starts_with(b"// caf\xE9 latin-1 comment\n"));
    assert!(updated.ends_with(b"{ \"note\": \"na\xEFve\" }\n"));

    let fragment: Value =
        serde_json::from_slice(after.fragment_trimmed()).expect("fragment is JSON");
    assert_eq!(
        fragment["ParserConfig"]["parser"]["last_updated"],
        json!("2024-01-01T00:00:00Z")
    );
}

#[test]
fn non_utf8_fragment_is_malformed() {
    let host = HostFile::new(
        b"/** @ParserConfig\n{\"ParserConfig\":{\"parser\":{\"reload\":\"\xE9\"}}}\n*/\n",
    );
    let err = ConfigGateway::new()
        .extract(host.path())
        .expect_err("latin-1 fragment");
    assert!(matches!(err, ParserConfigError::MalformedFragment { .. }));
}

#[cfg(unix)]
#[test]
fn persist_keeps_mode_and_symlink() {
    use std::os::unix::fs::PermissionsExt;

    let host = HostFile::new(LEGACY_HOST);
    std::fs::set_permissions(host.path(), std::fs::Permissions::from_mode(0o644))
        .expect("chmod 644");
    let link = host.path().with_file_name("linked.json");
    std::os::unix::fs::symlink(host.path(), &link).expect("create symlink");

    ConfigGateway::new()
        .persist_timestamp(&link, Utc::now())
        .expect("persist through symlink");

    let link_meta = std::fs::symlink_metadata(&link).expect("lstat link");
    assert!(link_meta.file_type().is_symlink());
    assert_ne!(host.read(), LEGACY_HOST);
    let mode = std::fs::metadata(host.path())
        .expect("stat host")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o644);
}

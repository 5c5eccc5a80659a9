use std::io::Write;
use std::sync::Arc;

use postlook_core::{
    CapturedExpansion, DiscardExpansion, Dispatcher, DispatcherConfig, FileConstraints, Handle,
    LookupError, PartialSpec, Registry, StarFlags, Text,
};
use postlook_driver_lsearch::LsearchDriver;
use tempfile::NamedTempFile;

fn fixture(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create fixture file");
    file.write_all(contents.as_bytes()).expect("write fixture");
    file.flush().expect("flush fixture");
    file
}

fn dispatcher() -> Dispatcher {
    let mut registry = Registry::new();
    registry.register(Arc::new(LsearchDriver::new()));
    Dispatcher::new(registry, DispatcherConfig::default())
}

fn open(dispatcher: &mut Dispatcher, path: &std::path::Path) -> Handle {
    let driver = dispatcher.registry().find_by_name("lsearch").unwrap();
    dispatcher
        .open(
            driver,
            Some(&Text::clean(path.to_string_lossy())),
            &FileConstraints::default(),
        )
        .expect("open lsearch file")
}

fn find_plain(
    dispatcher: &mut Dispatcher,
    handle: Handle,
    key: &str,
) -> Result<Option<String>, LookupError> {
    dispatcher.find(
        handle,
        None,
        &Text::clean(key),
        None,
        StarFlags::empty(),
        &mut DiscardExpansion,
        None,
    )
}

#[test]
fn finds_a_plain_key_and_misses_unknown_ones() {
    let file = fixture("postmaster: sam@example.com\nabuse: complaints@example.com\n");
    let mut dispatcher = dispatcher();
    let handle = open(&mut dispatcher, file.path());

    assert_eq!(
        find_plain(&mut dispatcher, handle, "postmaster").unwrap(),
        Some("sam@example.com".to_string())
    );
    assert_eq!(
        find_plain(&mut dispatcher, handle, "ABUSE").unwrap(),
        Some("complaints@example.com".to_string())
    );
    assert_eq!(find_plain(&mut dispatcher, handle, "nobody").unwrap(), None);
}

#[test]
fn comments_blank_lines_and_foreign_continuations_are_skipped() {
    let file = fixture(
        "# alias table\n\nfirst: one\n    first-continued\nsecond: two\n",
    );
    let mut dispatcher = dispatcher();
    let handle = open(&mut dispatcher, file.path());

    assert_eq!(
        find_plain(&mut dispatcher, handle, "second").unwrap(),
        Some("two".to_string())
    );
    assert_eq!(find_plain(&mut dispatcher, handle, "# alias table").unwrap(), None);
}

#[test]
fn continuation_lines_join_the_data() {
    let file = fixture("list: alice@example.com,\n  bob@example.com,\n\tcarol@example.com\n");
    let mut dispatcher = dispatcher();
    let handle = open(&mut dispatcher, file.path());

    assert_eq!(
        find_plain(&mut dispatcher, handle, "list").unwrap(),
        Some("alice@example.com, bob@example.com, carol@example.com".to_string())
    );
}

#[test]
fn quoted_keys_match_their_unescaped_form() {
    let file = fixture("\"odd: key\" : odd-data\nplain: plain-data\n");
    let mut dispatcher = dispatcher();
    let handle = open(&mut dispatcher, file.path());

    assert_eq!(
        find_plain(&mut dispatcher, handle, "odd: key").unwrap(),
        Some("odd-data".to_string())
    );
}

#[test]
fn partial_match_trims_components_and_sets_expansion_vars() {
    let file = fixture("*.example.com: wild\n");
    let mut dispatcher = dispatcher();
    let handle = open(&mut dispatcher, file.path());

    let mut sink = CapturedExpansion::default();
    let partial = PartialSpec {
        min_components: 2,
        affix: "*.".to_string(),
    };
    let data = dispatcher
        .find(
            handle,
            None,
            &Text::tainted("host.sub.example.com"),
            Some(&partial),
            StarFlags::empty(),
            &mut sink,
            None,
        )
        .unwrap();

    assert_eq!(data, Some("wild".to_string()));
    assert_eq!(sink.values.len(), 2);
    assert_eq!(sink.values[0].as_str(), "host.sub");
    assert!(sink.values[0].is_tainted());
    assert_eq!(sink.values[1].as_str(), "example.com");
    assert!(!sink.values[1].is_tainted());
}

#[test]
fn star_at_falls_back_to_the_domain_default() {
    let file = fixture("*@example.com: starat-data\n");
    let mut dispatcher = dispatcher();
    let handle = open(&mut dispatcher, file.path());

    let mut sink = CapturedExpansion::default();
    let data = dispatcher
        .find(
            handle,
            None,
            &Text::tainted("alice@example.com"),
            None,
            StarFlags::STAR_AT,
            &mut sink,
            None,
        )
        .unwrap();

    assert_eq!(data, Some("starat-data".to_string()));
    assert_eq!(sink.values[0].as_str(), "alice@");
    assert_eq!(sink.values[1].as_str(), "");
}

#[test]
fn bare_star_is_the_last_resort() {
    let file = fixture("*: star-data\n");
    let mut dispatcher = dispatcher();
    let handle = open(&mut dispatcher, file.path());

    let mut sink = CapturedExpansion::default();
    let data = dispatcher
        .find(
            handle,
            None,
            &Text::clean("anything-at-all"),
            None,
            StarFlags::STAR,
            &mut sink,
            None,
        )
        .unwrap();

    assert_eq!(data, Some("star-data".to_string()));
    assert_eq!(sink.values[0].as_str(), "anything-at-all");
    assert_eq!(sink.values[1].as_str(), "");
}

#[test]
fn ret_key_returns_the_key_that_was_looked_up() {
    let file = fixture("*.example.com: wild\n");
    let mut dispatcher = dispatcher();
    let handle = open(&mut dispatcher, file.path());

    let partial = PartialSpec {
        min_components: 2,
        affix: "*.".to_string(),
    };
    let data = dispatcher
        .find(
            handle,
            None,
            &Text::tainted("host.example.com"),
            Some(&partial),
            StarFlags::empty(),
            &mut DiscardExpansion,
            Some("ret=key"),
        )
        .unwrap();

    // The original key comes back, and looking it up again succeeds.
    assert_eq!(data, Some("host.example.com".to_string()));
    let again = dispatcher
        .find(
            handle,
            None,
            &Text::clean("host.example.com"),
            Some(&partial),
            StarFlags::empty(),
            &mut DiscardExpansion,
            None,
        )
        .unwrap();
    assert_eq!(again, Some("wild".to_string()));
}

#[test]
fn opening_a_missing_file_reports_the_driver_error() {
    let mut dispatcher = dispatcher();
    let driver = dispatcher.registry().find_by_name("lsearch").unwrap();
    let result = dispatcher.open(
        driver,
        Some(&Text::clean("/nonexistent/alias/table")),
        &FileConstraints::default(),
    );
    assert!(matches!(result, Err(LookupError::OpenFailed(_))));
}

#[test]
fn reopening_the_same_file_reuses_the_handle() {
    let file = fixture("postmaster: sam\n");
    let mut dispatcher = dispatcher();
    let first = open(&mut dispatcher, file.path());
    let second = open(&mut dispatcher, file.path());
    assert_eq!(first, second);
    assert_eq!(dispatcher.cached_handle_count(), 1);
}

#[cfg(unix)]
#[test]
fn world_writable_files_fail_the_mode_check() {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    let file = fixture("postmaster: sam\n");
    std::fs::set_permissions(file.path(), Permissions::from_mode(0o666))
        .expect("chmod fixture");

    let mut dispatcher = dispatcher();
    let driver = dispatcher.registry().find_by_name("lsearch").unwrap();
    let constraints = FileConstraints::default().with_mode_mask(0o002);
    let result = dispatcher.open(
        driver,
        Some(&Text::clean(file.path().to_string_lossy())),
        &constraints,
    );
    assert!(matches!(result, Err(LookupError::CheckFailed(_))));
}

#[test]
fn tainted_filenames_are_refused_before_the_driver_runs() {
    let mut dispatcher = dispatcher();
    let driver = dispatcher.registry().find_by_name("lsearch").unwrap();
    let result = dispatcher.open(
        driver,
        Some(&Text::tainted("/etc/aliases")),
        &FileConstraints::default(),
    );
    assert!(matches!(result, Err(LookupError::TaintedFilename(_))));
}

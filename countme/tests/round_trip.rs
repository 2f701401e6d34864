use countme::{
    auto_reader, make_writer, write_items, CountmeError, CountmeItem, CountmeMatcher, Input, Item,
    LogItem, LogMatcher, Matcher, MirrorItem, MirrorMatcher, Output, ReaderOptions, Result,
    WriterOptions,
};
use rusqlite::Connection;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tempfile::TempDir;

const ACCESS_LOG: &str = r#"240.0.0.2 - - [29/Mar/2020:16:04:28 -0400] "GET /metalink?repo=updates-released-f32&arch=x86_64&countme=1 HTTP/1.1" 302 0 "-" "libdnf/0.48.0 (Fedora 32; workstation; Linux.x86_64)"
1.2.3.4 - - [29/Mar/2020:16:04:28 +0000] "GET /path?countme=3&repo=fedora&arch=x86_64 HTTP/1.1" 200 123 "-" "libdnf"
1.1.1.1 - - [29/Mar/2020:16:04:29 +0000] "GET /pub/fedora/ HTTP/1.1" 200 1 "-" "dnf"
this line is not a log line at all
2.2.2.2 - - [29/Mar/2020:16:04:30 +0000] "GET /mirrorlist?repo=fedora-32 HTTP/1.1" 200 1 "-" "dnf/4.2.17"
5.6.7.8 - frank [29/Mar/2020:16:04:31 +0200] "HEAD /metalink HTTP/2.0" 404 - "http://example.com/" "curl/7.68.0"
3.3.3.3 - - [29/Mar/2020:16:04:32 +0000] "GET /pub/fedora/linux/releases/32/Everything/x86_64/os/repodata/repomd.xml HTTP/1.1" 200 3094 "-" "libdnf (Fedora 32; workstation; Linux.x86_64)"
3.3.3.3 - - [29/Mar/2020:16:04:33 +0000] "GET /metalink?repo=fedora-32&arch=x86_64 HTTP/1.1" 200 1 "-" "libdnf (Fedora 32; workstation; Linux.x86_64)"
4.4.4.4 - - [29/Mar/2020:16:04:34 +0000] "GET /metalink?repo=&arch=x86_64 HTTP/1.1" 200 1 "-" "dnf/4.2.17"
"#;

fn matched<M: Matcher>(matcher: &M) -> Vec<M::Item> {
    matcher
        .iter_items(Cursor::new(ACCESS_LOG))
        .collect::<Result<_>>()
        .unwrap()
}

fn write_file<T: Item + Clone + 'static>(format: &str, path: &Path, items: &[T]) {
    let output = if format == "sqlite" {
        Output::Database(Connection::open(path).unwrap())
    } else {
        Output::Stream(Box::new(File::create(path).unwrap()))
    };
    let mut writer = make_writer::<T>(format, output, &WriterOptions::default()).unwrap();
    let n = write_items(writer.as_mut(), items.iter().cloned().map(Ok)).unwrap();
    writer.close().unwrap();
    assert_eq!(n, items.len() as u64);
}

fn open_input(path: &Path) -> Input {
    if path.extension().is_some_and(|ext| ext == "db") {
        Input::Database(Connection::open(path).unwrap())
    } else {
        Input::Stream(Box::new(BufReader::new(File::open(path).unwrap())))
    }
}

fn read_file<T: Item + 'static>(path: &Path) -> Result<Vec<T>> {
    let reader = auto_reader::<T>(
        path.to_str().unwrap(),
        open_input(path),
        &ReaderOptions::default(),
    )?;
    reader.collect()
}

fn round_trip<T: Item + Clone + PartialEq + std::fmt::Debug + 'static>(items: Vec<T>) {
    let dir = TempDir::new().unwrap();
    for (format, file) in [
        ("csv", "items.csv"),
        ("json", "items.jsonl"),
        ("awk", "items.tsv"),
        ("sqlite", "items.db"),
    ] {
        let path = dir.path().join(file);
        write_file(format, &path, &items);
        let back: Vec<T> = read_file(&path).unwrap();
        assert_eq!(back, items, "{} round trip for {}", format, T::NAME);
    }
}

#[test]
fn countme_items_survive_every_backend() {
    let matcher = CountmeMatcher::new().unwrap();
    let mut iter = matcher.iter_items(Cursor::new(ACCESS_LOG));
    let items: Vec<CountmeItem> = iter.by_ref().collect::<Result<_>>().unwrap();
    // other libdnf traffic, with or without a query, is skipped
    assert_eq!(iter.lines_read(), 9);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].os_variant, "workstation");
    assert_eq!(items[1].os_name, "");
    round_trip(items);
}

#[test]
fn mirror_items_survive_every_backend() {
    let items = matched(&MirrorMatcher::new().unwrap());
    assert_eq!(items.len(), 5);
    assert_eq!(items[1].repo_tag.as_deref(), Some("fedora-32"));
    assert_eq!(items[1].repo_arch, None);
    assert_eq!(items[4].repo_tag, None);
    assert_eq!(items[4].repo_arch.as_deref(), Some("x86_64"));
    round_trip(items);
}

#[test]
fn log_items_survive_every_backend() {
    let items = matched(&LogMatcher::new().unwrap());
    assert_eq!(items.len(), 8);
    assert_eq!(items[4].identity, "frank");
    assert_eq!(items[4].nbytes, None);
    assert_eq!(items[2].query, None);
    round_trip(items);
}

#[test]
fn sqlite_appends_to_existing_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mirrors.db");
    let items = matched(&MirrorMatcher::new().unwrap());

    write_file("sqlite", &path, &items);
    write_file("sqlite", &path, &items);

    let back: Vec<MirrorItem> = read_file(&path).unwrap();
    assert_eq!(back.len(), items.len() * 2);
    assert_eq!(back[..items.len()], items[..]);
}

#[test]
fn reading_the_wrong_item_type_fails() {
    let dir = TempDir::new().unwrap();
    let items = matched(&MirrorMatcher::new().unwrap());

    for file in ["items.csv", "items.tsv", "items.db"] {
        let path = dir.path().join(file);
        let format = countme::guess_reader(file).unwrap().name();
        write_file(format, &path, &items);
        match read_file::<CountmeItem>(&path) {
            Err(CountmeError::SchemaMismatch { expected, found }) => {
                assert_eq!(expected, CountmeItem::field_names());
                assert_eq!(found, MirrorItem::field_names());
            }
            other => panic!("{}: expected SchemaMismatch, got {:?}", file, other),
        }
    }
}

#[test]
fn reading_a_reordered_csv_fails() {
    let data = "host,timestamp,repo_tag,repo_arch\na,1,,\n";
    let result = auto_reader::<MirrorItem>(
        "items.csv",
        Input::Stream(Box::new(Cursor::new(data))),
        &ReaderOptions::default(),
    );
    assert!(matches!(result, Err(CountmeError::SchemaMismatch { .. })));
}

#[test]
fn sqlite_table_name_is_configurable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.db");
    let items = matched(&LogMatcher::new().unwrap());

    let writer_opts = WriterOptions { table_name: "access".into(), ..Default::default() };
    let mut writer =
        make_writer::<LogItem>("sqlite", Output::Database(Connection::open(&path).unwrap()), &writer_opts)
            .unwrap();
    write_items(writer.as_mut(), items.iter().cloned().map(Ok)).unwrap();
    writer.close().unwrap();

    let default_table = read_file::<LogItem>(&path);
    assert!(matches!(default_table, Err(CountmeError::SchemaMissing)));

    let reader_opts = ReaderOptions { table_name: "access".into(), batch_size: 2, ..Default::default() };
    let reader = auto_reader::<LogItem>("log.db", open_input(&path), &reader_opts).unwrap();
    let back: Vec<LogItem> = reader.collect::<Result<_>>().unwrap();
    assert_eq!(back, items);
}

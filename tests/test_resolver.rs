use std::fs;
use std::time::Duration;

use lantern::gemini::error::{ConnectionError, RequestError, ResourceError};
use lantern::gemini::resolver::{DEFAULT_DOCUMENT, Resolver, check_traversal, clean_path, normalize};
use lantern::gemini::response::Status;
use tempfile::TempDir;
use tokio::time::Instant;

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

fn content_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(DEFAULT_DOCUMENT), "# Home\n").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub").join("index.gmi"), "# Sub\n").unwrap();
    fs::create_dir(dir.path().join("empty")).unwrap();
    fs::write(dir.path().join("data.bin"), [0u8, 1, 2, 3, 255]).unwrap();
    dir
}

#[test]
fn test_normalize() {
    assert_eq!(normalize("a.gmi"), "/a.gmi");
    assert_eq!(normalize("/docs/"), "/docs/index.gmi");
    assert_eq!(normalize("docs/"), "/docs/index.gmi");
}

#[test]
fn test_check_traversal_accepts_clean_paths() {
    assert_eq!(check_traversal("/sub/index.gmi").unwrap(), "/sub/index.gmi");
    assert_eq!(check_traversal("/.well-known/x").unwrap(), "/.well-known/x");
}

#[test]
fn test_check_traversal_rejects_changed_paths() {
    for path in [
        "/../secret.txt",
        "/sub/../index.gmi",
        "/./index.gmi",
        "//index.gmi",
        "/sub//index.gmi",
        "/sub/..",
    ] {
        let err = check_traversal(path).unwrap_err();
        assert!(matches!(err, RequestError::BadPath { .. }), "{path}");
        let reply = err.reply().unwrap();
        assert_eq!(reply.status, Status::BadRequest);
        assert_eq!(reply.meta, "Bad path");
    }
}

#[test]
fn test_clean_path_never_escapes_root() {
    assert_eq!(clean_path("/../../../etc/passwd"), "/etc/passwd");
}

#[tokio::test]
async fn test_resolve_file() {
    let root = content_root();
    let resolver = Resolver::new(root.path());

    let resource = resolver.resolve("/data.bin", deadline()).await.unwrap();
    assert_eq!(resource.path, "/data.bin");
    assert_eq!(&resource.body[..], &[0u8, 1, 2, 3, 255]);
}

#[tokio::test]
async fn test_resolve_default_document() {
    let root = content_root();
    let resolver = Resolver::new(root.path());

    let resource = resolver.resolve("/sub/", deadline()).await.unwrap();
    assert_eq!(resource.path, "/sub/index.gmi");
    assert_eq!(&resource.body[..], b"# Sub\n");

    let resource = resolver.resolve("/", deadline()).await.unwrap();
    assert_eq!(&resource.body[..], b"# Home\n");
}

#[tokio::test]
async fn test_resolve_relative_path() {
    let root = content_root();
    let resolver = Resolver::new(root.path());

    let resource = resolver.resolve("data.bin", deadline()).await.unwrap();
    assert_eq!(resource.path, "/data.bin");
}

#[tokio::test]
async fn test_resolve_traversal_never_opens() {
    let outer = tempfile::tempdir().unwrap();
    fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
    let root = outer.path().join("root");
    fs::create_dir(&root).unwrap();

    let resolver = Resolver::new(&root);
    let err = resolver.resolve("/../secret.txt", deadline()).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Request(RequestError::BadPath { .. })));
}

#[tokio::test]
async fn test_resolve_missing_file() {
    let root = content_root();
    let resolver = Resolver::new(root.path());

    let err = resolver.resolve("/nope.gmi", deadline()).await.unwrap_err();
    let err = match err {
        ConnectionError::Resource(err) => err,
        other => panic!("expected a resource error, got {other:?}"),
    };
    assert!(matches!(err, ResourceError::NotFound { .. }));
    assert_eq!(err.reply().status, Status::NotFound);
    assert_eq!(err.reply().meta, "File not found");
}

#[tokio::test]
async fn test_resolve_directory_without_default_document() {
    let root = content_root();
    let resolver = Resolver::new(root.path());

    for path in ["/empty/", "/sub"] {
        let err = resolver.resolve(path, deadline()).await.unwrap_err();
        assert!(
            matches!(err, ConnectionError::Resource(ResourceError::NotFound { .. })),
            "{path}: {err:?}"
        );
    }
}

#[test]
fn test_read_error_reply() {
    let err = ResourceError::Read {
        path: "/a.gmi".to_string(),
        source: std::io::Error::other("disk gone"),
    };
    assert_eq!(err.reply().status, Status::BadRequest);
    assert_eq!(err.reply().meta, "File read error");
}

//! External CLI backend tests
//!
//! Stand in for the real `backgroundremover` binary with small shell
//! scripts, so exit-status handling, output parsing, and the hard timeout
//! can all be exercised without the tool installed.

#![cfg(unix)]

use bgremove_api::backends::{ExternalCliBackend, SegmentationBackend};
use bgremove_api::error::RemovalError;
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

fn write_script(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "#!/bin/sh\n{body}").unwrap();
    drop(file);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn test_image() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 30, Rgba([10, 20, 30, 255])))
}

#[tokio::test]
async fn test_successful_invocation_reads_output_file() {
    let dir = tempfile::tempdir().unwrap();
    // Invoked as `tool -i <in> -o <out>`: copy input to output
    let script = write_script(dir.path(), "fake-remover", "cp \"$2\" \"$4\"\n");

    let backend = ExternalCliBackend::with_binary(script);
    assert!(backend.is_available());

    let out = backend.segment(&test_image()).await.unwrap();
    assert_eq!(out.dimensions(), (40, 30));
    assert_eq!(out.get_pixel(0, 0).0, [10, 20, 30, 255]);
}

#[tokio::test]
async fn test_nonzero_exit_is_backend_failure() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "fake-remover",
        "echo 'model file missing' >&2\nexit 3\n",
    );

    let backend = ExternalCliBackend::with_binary(script);
    let err = backend.segment(&test_image()).await.unwrap_err();
    match err {
        RemovalError::BackendFailure(msg) => {
            assert!(msg.contains("model file missing"), "message was: {msg}");
        },
        other => panic!("expected BackendFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_output_file_is_backend_failure() {
    let dir = tempfile::tempdir().unwrap();
    // Exits cleanly without writing the output path
    let script = write_script(dir.path(), "fake-remover", "rm -f \"$4\"\nexit 0\n");

    let backend = ExternalCliBackend::with_binary(script);
    let err = backend.segment(&test_image()).await.unwrap_err();
    assert!(matches!(err, RemovalError::BackendFailure(_)));
}

#[tokio::test]
async fn test_timeout_is_backend_failure() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fake-remover", "sleep 5\n");

    let backend =
        ExternalCliBackend::with_binary(script).with_timeout(Duration::from_millis(200));
    let err = backend.segment(&test_image()).await.unwrap_err();
    match err {
        RemovalError::BackendFailure(msg) => {
            assert!(msg.contains("timed out"), "message was: {msg}");
        },
        other => panic!("expected BackendFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_still_falls_back_through_dispatcher() {
    use bgremove_api::backends::MockBackend;
    use bgremove_api::registry::ModelRegistry;
    use bgremove_api::Dispatcher;
    use std::sync::Arc;

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fake-remover", "sleep 5\n");
    let slow = ExternalCliBackend::with_binary(script).with_timeout(Duration::from_millis(200));

    let registry = ModelRegistry::with_backends(vec![
        Arc::new(MockBackend::new("rembg", "Default")) as Arc<dyn SegmentationBackend>,
        Arc::new(slow),
    ]);
    let dispatcher = Dispatcher::new(Arc::new(registry));

    // The slow external tool times out; the request still completes on the
    // default tier
    let out = dispatcher
        .segment(&test_image(), "backgroundremover")
        .await
        .unwrap();
    assert_eq!(out.dimensions(), (40, 30));
}

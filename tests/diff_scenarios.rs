//! Integration coverage of the concrete scenarios in spec.md §8, driving the
//! public `diff`/`diff_with_stats`/`extract_package` entry points end to end
//! over in-memory inline archives (and a mocked HTTP server for the
//! transport-level scenarios).

use archdiff::{diff, diff_with_stats, DiffOptions, InlineData, InlineSource, SourceConfig};
use async_compression::tokio::write::GzipEncoder;
use bytes::Bytes;
use std::io::Cursor;
use tokio::io::AsyncWriteExt;

/// Installs a `tracing` subscriber for the duration of the test binary, so
/// `RUST_LOG=archdiff=debug cargo test` surfaces the per-stage spans.
fn hook_logger() {
    static HOOK: std::sync::Once = std::sync::Once::new();

    HOOK.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(format!("archdiff={}", tracing::Level::DEBUG).parse().unwrap());
        let subscriber = tracing_subscriber::FmtSubscriber::builder().with_env_filter(env_filter);
        tracing::subscriber::set_global_default(subscriber.finish()).ok();
    });
}

async fn gzip_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = async_tar::Builder::new(Vec::new());
    for (path, data) in entries {
        let mut header = async_tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, Cursor::new(data.to_vec()))
            .await
            .unwrap();
    }
    let tar_bytes = builder.into_inner().await.unwrap();

    let mut encoder = GzipEncoder::new(Vec::new());
    encoder.write_all(&tar_bytes).await.unwrap();
    encoder.shutdown().await.unwrap();
    encoder.into_inner()
}

fn inline(bytes: Vec<u8>) -> SourceConfig {
    SourceConfig::Inline(InlineSource {
        data: InlineData::Bytes(Bytes::from(bytes)),
    })
}

#[tokio::test]
async fn scenario_1_identical_archives() {
    hook_logger();
    let archive = gzip_tar(&[
        ("package/index.js", b"const x = 1;\n"),
        ("package/package.json", b"{\"name\":\"t\"}\n"),
    ])
    .await;

    let output = diff(&inline(archive.clone()), &inline(archive), &DiffOptions::default())
        .await
        .unwrap();
    assert_eq!(output, "");
}

#[tokio::test]
async fn scenario_2_modified_file() {
    hook_logger();
    let left = gzip_tar(&[("package/index.js", b"const x = 1;")]).await;
    let right = gzip_tar(&[("package/index.js", b"const x = 2;")]).await;

    let output = diff(&inline(left), &inline(right), &DiffOptions::default())
        .await
        .unwrap();
    assert!(output.contains("diff --git a/index.js b/index.js"));
    assert!(output.contains("-const x = 1;"));
    assert!(output.contains("+const x = 2;"));
}

#[tokio::test]
async fn scenario_3_added_and_deleted() {
    hook_logger();
    let left = gzip_tar(&[
        ("package/deleted.js", b"a"),
        ("package/unchanged.js", b"s"),
    ])
    .await;
    let right = gzip_tar(&[("package/added.js", b"b"), ("package/unchanged.js", b"s")]).await;

    let stats = diff_with_stats(&inline(left), &inline(right), &DiffOptions::default())
        .await
        .unwrap();
    assert_eq!(stats.files_added, 1);
    assert_eq!(stats.files_deleted, 1);
    assert!(stats.output.contains("new file mode 100644"));
    assert!(stats.output.contains("deleted file mode 100644"));
}

#[tokio::test]
async fn scenario_4_binary_default_vs_text_override() {
    hook_logger();
    let left = gzip_tar(&[("package/image.png", &[1, 2, 3, 4])]).await;
    let right = gzip_tar(&[("package/image.png", &[1, 2, 3, 9])]).await;

    let default_output = diff(&inline(left.clone()), &inline(right.clone()), &DiffOptions::default())
        .await
        .unwrap();
    assert!(default_output.contains("Binary files a/image.png and b/image.png differ"));
    assert!(!default_output.contains("@@"));

    let mut text_options = DiffOptions::default();
    text_options.text = true;
    let text_output = diff(&inline(left), &inline(right), &text_options).await.unwrap();
    assert!(text_output.contains('-'));
    assert!(text_output.contains('+'));
    assert!(!text_output.contains("Binary files"));
}

#[tokio::test]
async fn scenario_5_name_only() {
    hook_logger();
    let left = gzip_tar(&[
        ("package/index.js", b"const x = 1;"),
        ("package/unchanged.js", b"s"),
    ])
    .await;
    let right = gzip_tar(&[
        ("package/index.js", b"const x = 2;"),
        ("package/unchanged.js", b"s"),
    ])
    .await;

    let mut options = DiffOptions::default();
    options.name_only = true;
    let output = diff(&inline(left), &inline(right), &options).await.unwrap();
    assert_eq!(output, "index.js\n");
}

#[tokio::test]
async fn scenario_6_size_gate_over_http() {
    hook_logger();
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pkg.tgz"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-length", "20971521")
                .set_body_bytes(vec![0u8; 1]),
        )
        .mount(&server)
        .await;

    let oversized = SourceConfig::Url(archdiff::UrlSource {
        source: url::Url::parse(&format!("{}/pkg.tgz", server.uri())).unwrap(),
        auth: archdiff::AuthKind::None,
        credential: None,
    });
    let small = inline(gzip_tar(&[("package/a.txt", b"hi")]).await);

    let err = diff(&oversized, &small, &DiffOptions::default()).await.unwrap_err();
    assert_eq!(err.phase, archdiff::Phase::Size);
    assert_eq!(err.status, 413);
    assert!(err.message.contains("exceeds limit"));
}

#[tokio::test]
async fn scenario_7_symlink_rejection() {
    hook_logger();
    let mut builder = async_tar::Builder::new(Vec::new());
    let mut header = async_tar::Header::new_gnu();
    header.set_entry_type(async_tar::EntryType::Symlink);
    header.set_size(0);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_link(&mut header, "package/link.js", "index.js")
        .await
        .unwrap();
    let tar_bytes = builder.into_inner().await.unwrap();

    let mut encoder = GzipEncoder::new(Vec::new());
    encoder.write_all(&tar_bytes).await.unwrap();
    encoder.shutdown().await.unwrap();
    let archive = encoder.into_inner();

    let err = diff(&inline(archive.clone()), &inline(archive), &DiffOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.phase, archdiff::Phase::Tar);
    assert!(err.message.contains("Symlinks are not supported"));
    assert!(err.message.contains("link.js"));
}

#[test]
fn scenario_8_credential_redaction() {
    hook_logger();
    let err = archdiff::DiffError::new(
        archdiff::Phase::Fetch,
        "Failed https://u:p@h/pkg.tgz",
    );
    assert!(err.message.contains("://[REDACTED]:[REDACTED]@h"));
    assert!(!err.message.contains(":p@"));
}

#[tokio::test]
async fn extract_package_strips_prefix_and_preserves_order() {
    hook_logger();
    let archive = gzip_tar(&[
        ("package/b.txt", b"second"),
        ("package/a.txt", b"first"),
    ])
    .await;

    let files = archdiff::extract_package(&inline(archive), archdiff::MAX_TARBALL_SIZE)
        .await
        .unwrap();
    let keys: Vec<&str> = files.keys().map(|s| s.as_str()).collect();
    assert_eq!(keys, vec!["b.txt", "a.txt"]);
}

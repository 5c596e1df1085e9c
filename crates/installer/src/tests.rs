//! End-to-end tests against a mock project host

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};
use zip::write::SimpleFileOptions;

use crate::config::{InstallerConfig, InstallerConfigBuilder};
use crate::error::InstallError;
use crate::index::InstallIndex;
use crate::layout::PackLayout;
use crate::locator::{Resolution, ResourceLocator, SkipReason};
use crate::manifest::{GameRequirements, Manifest, ManifestBuilder, PackInput, ResourceReference};
use crate::pack::PackInstaller;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::sync::SyncEngine;

/// Helper struct to capture progress events during testing
#[derive(Debug, Default)]
struct ProgressCapture {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl ProgressCapture {
    fn get_callback(&self) -> ProgressCallback {
        let events = self.events.clone();
        Arc::new(move |event| {
            events.lock().unwrap().push(event);
        })
    }

    fn count(&self, matches: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| matches(e)).count()
    }
}

fn config_for(server: &MockServer) -> InstallerConfig {
    InstallerConfigBuilder::new()
        .project_base_url(server.uri())
        .default_author("tester")
        .build()
}

fn manifest_with(references: Vec<ResourceReference>) -> Manifest {
    Manifest {
        name: "Test Pack".to_string(),
        version: "1.0.0".to_string(),
        author: "tester".to_string(),
        manifest_type: Some("minecraftModpack".to_string()),
        manifest_version: Some(1),
        minecraft: GameRequirements {
            version: "1.12.2".to_string(),
            mod_loaders: Vec::new(),
        },
        references,
        overrides: None,
    }
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

async fn serve_file(server: &MockServer, at: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

async fn serve_redirect(server: &MockServer, at: &str, location: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location))
        .mount(server)
        .await;
}

/// Serve every connection a 200 that advertises `advertised` bytes but sends `body` and hangs up
async fn serve_truncated(body: &'static [u8], advertised: u64) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                advertised
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}", address)
}

fn part_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".part"))
        .collect()
}

#[tokio::test]
async fn test_redirect_chain_names_file_from_final_segment() {
    let server = MockServer::start().await;
    serve_redirect(&server, "/projects/jei/files/100/download", "/cdn/files/1/2/jei_1.12.2-4.15.jar").await;
    serve_file(&server, "/cdn/files/1/2/jei_1.12.2-4.15.jar", b"jei-bytes").await;

    let dir = tempdir().unwrap();
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();
    let url = locator.resource_url("jei", "100");
    let resolution = locator.fetch(&url, dir.path(), "100.jar", None).await.unwrap();

    assert_eq!(
        resolution,
        Resolution::Resolved { file_name: "jei_1.12.2-4.15.jar".to_string(), size: 9 }
    );
    assert_eq!(std::fs::read(dir.path().join("jei_1.12.2-4.15.jar")).unwrap(), b"jei-bytes");
    assert!(part_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_download_segment_falls_back_to_file_id() {
    let server = MockServer::start().await;
    serve_redirect(&server, "/projects/p/files/55/download", "/mirror/download").await;
    serve_file(&server, "/mirror/download", b"abc").await;

    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config_for(&server));
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();

    let report = SyncEngine::new(&locator)
        .sync(&manifest_with(vec![ResourceReference::new("p", "55")]), &layout)
        .await
        .unwrap();

    assert_eq!(report.installed_count, 1);
    assert!(layout.resources_dir().join("55.jar").exists());
    let index = InstallIndex::load(&layout.index_path()).await.unwrap();
    assert_eq!(index.get("p"), Some("55.jar"));
}

#[tokio::test]
async fn test_latest_file_id_uses_bare_files_url() {
    let server = MockServer::start().await;
    serve_redirect(&server, "/projects/journeymap/files/latest", "/cdn/journeymap-5.5.jar").await;
    serve_file(&server, "/cdn/journeymap-5.5.jar", b"map").await;

    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config_for(&server));
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();

    let report = SyncEngine::new(&locator)
        .sync(&manifest_with(vec![ResourceReference::latest("journeymap")]), &layout)
        .await
        .unwrap();

    assert_eq!(report.installed_count, 1);
    assert!(layout.resources_dir().join("journeymap-5.5.jar").exists());
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let server = MockServer::start().await;
    serve_file(&server, "/projects/a/files/1/a.jar", b"a").await;
    serve_redirect(&server, "/projects/a/files/1/download", "/projects/a/files/1/a.jar").await;
    Mock::given(method("GET"))
        .and(path("/projects/b/files/2/download"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    serve_redirect(&server, "/projects/c/files/3/download", "/cdn/c.jar").await;
    serve_file(&server, "/cdn/c.jar", b"c").await;

    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config_for(&server));
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();
    let capture = ProgressCapture::default();

    let manifest = manifest_with(vec![
        ResourceReference::new("a", "1"),
        ResourceReference::new("b", "2"),
        ResourceReference::new("c", "3"),
    ]);
    let report = SyncEngine::new(&locator)
        .with_progress(Some(capture.get_callback()))
        .sync(&manifest, &layout)
        .await
        .unwrap();

    assert_eq!(report.installed_count, 2);
    assert_eq!(report.skipped_count, 1);
    assert!(layout.resources_dir().join("a.jar").exists());
    assert!(layout.resources_dir().join("c.jar").exists());

    let index = InstallIndex::load(&layout.index_path()).await.unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index.get("b"), None);

    assert_eq!(capture.count(|e| matches!(e, ProgressEvent::ResourceStarted { .. })), 3);
    assert_eq!(capture.count(|e| matches!(e, ProgressEvent::ResourceSkipped { .. })), 1);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    serve_redirect(&server, "/projects/jei/files/100/download", "/cdn/jei.jar").await;
    serve_file(&server, "/cdn/jei.jar", b"jei").await;

    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config_for(&server));
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();
    let manifest = manifest_with(vec![ResourceReference::new("jei", "100")]);

    let first = SyncEngine::new(&locator).sync(&manifest, &layout).await.unwrap();
    let index_after_first = std::fs::read_to_string(layout.index_path()).unwrap();

    let second = SyncEngine::new(&locator).sync(&manifest, &layout).await.unwrap();
    let index_after_second = std::fs::read_to_string(layout.index_path()).unwrap();

    assert_eq!(first.installed_count, 1);
    assert_eq!(second.installed_count, 0);
    assert_eq!(second.skipped_count, 1);
    assert_eq!(second.superseded_count, 0);
    assert_eq!(index_after_first, index_after_second);
    assert!(layout.resources_dir().join("jei.jar").exists());
}

#[tokio::test]
async fn test_new_file_supersedes_recorded_one() {
    let server = MockServer::start().await;
    serve_redirect(&server, "/projects/10/files/2/download", "/cdn/new.jar").await;
    serve_file(&server, "/cdn/new.jar", b"new").await;

    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config_for(&server));
    std::fs::create_dir_all(layout.resources_dir()).unwrap();
    std::fs::write(layout.resources_dir().join("old.jar"), b"old").unwrap();
    std::fs::write(layout.resources_dir().join("unrelated.jar"), b"keep").unwrap();
    std::fs::write(layout.index_path(), r#"{"10": "old.jar"}"#).unwrap();

    let locator = ResourceLocator::new(&config_for(&server)).unwrap();
    let capture = ProgressCapture::default();
    let report = SyncEngine::new(&locator)
        .with_progress(Some(capture.get_callback()))
        .sync(&manifest_with(vec![ResourceReference::new("10", "2")]), &layout)
        .await
        .unwrap();

    assert_eq!(report.superseded_count, 1);
    assert!(!layout.resources_dir().join("old.jar").exists());
    assert!(layout.resources_dir().join("new.jar").exists());
    assert!(layout.resources_dir().join("unrelated.jar").exists());

    let index = InstallIndex::load(&layout.index_path()).await.unwrap();
    assert_eq!(index.get("10"), Some("new.jar"));
    assert_eq!(capture.count(|e| matches!(e, ProgressEvent::Superseded { .. })), 1);
}

#[tokio::test]
async fn test_redirect_loop_is_bounded() {
    let server = MockServer::start().await;
    serve_redirect(&server, "/projects/loop/files/1/download", "/a").await;
    serve_redirect(&server, "/a", "/b").await;
    serve_redirect(&server, "/b", "/a").await;

    let config = InstallerConfigBuilder::new()
        .project_base_url(server.uri())
        .max_redirects(3)
        .build();
    let dir = tempdir().unwrap();
    let locator = ResourceLocator::new(&config).unwrap();

    let url = locator.resource_url("loop", "1");
    let err = locator.fetch(&url, dir.path(), "1.jar", None).await.unwrap_err();
    assert!(matches!(err, InstallError::TooManyRedirects { hops: 3, .. }));

    let layout = PackLayout::new(dir.path(), &config);
    let report = SyncEngine::new(&locator)
        .sync(&manifest_with(vec![ResourceReference::new("loop", "1")]), &layout)
        .await
        .unwrap();
    assert_eq!(report.installed_count, 0);
    assert_eq!(report.skipped_count, 1);
}

#[tokio::test]
async fn test_server_error_counts_as_skip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/flaky/files/1/download"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config_for(&server));
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();

    let report = SyncEngine::new(&locator)
        .sync(&manifest_with(vec![ResourceReference::new("flaky", "1")]), &layout)
        .await
        .unwrap();

    assert_eq!(report.skipped_count, 1);
    assert!(!layout.index_path().exists());
}

#[tokio::test]
async fn test_requests_carry_configured_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/ua/files/1/ua.jar"))
        .and(header("user-agent", "curl/7.58.0"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    serve_redirect(&server, "/projects/ua/files/1/download", "/projects/ua/files/1/ua.jar").await;

    let dir = tempdir().unwrap();
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();
    let url = locator.resource_url("ua", "1");
    let resolution = locator.fetch(&url, dir.path(), "1.jar", None).await.unwrap();

    assert!(matches!(resolution, Resolution::Resolved { .. }));
}

#[tokio::test]
async fn test_project_slug_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/project/238222"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/project/238222-jei"))
        .mount(&server)
        .await;
    serve_redirect(&server, "/projects/jei/files/7/download", "/cdn/jei-7.jar").await;
    serve_file(&server, "/cdn/jei-7.jar", b"jei").await;

    let config = InstallerConfigBuilder::new()
        .project_base_url(server.uri())
        .project_lookup_url(format!("{}/project", server.uri()))
        .resolve_project_slugs(true)
        .build();
    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config);
    let locator = ResourceLocator::new(&config).unwrap();

    assert_eq!(locator.project_slug("238222").await, Some("jei".to_string()));

    let report = SyncEngine::new(&locator)
        .sync(&manifest_with(vec![ResourceReference::new("238222", "7")]), &layout)
        .await
        .unwrap();
    assert_eq!(report.installed_count, 1);

    // Index stays keyed by the manifest's project id
    let index = InstallIndex::load(&layout.index_path()).await.unwrap();
    assert_eq!(index.get("238222"), Some("jei-7.jar"));
}

#[tokio::test]
async fn test_mod_list_round_trips_through_structured_manifest() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let mod_list = dir.path().join("mods.txt");
    std::fs::write(
        &mod_list,
        format!(
            "name=Round Trip\nminecraft=1.12.2\nforge=14.23.5.2847\n\n\
             {base}/projects/jei/files/2803400\n\
             {base}/projects/journeymap\n\
             not a directive\n",
            base = server.uri()
        ),
    )
    .unwrap();

    let config = config_for(&server);
    let locator = ResourceLocator::new(&config).unwrap();
    let built = ManifestBuilder::new(&config, &locator, dir.path())
        .build(&PackInput::ModList(mod_list))
        .await
        .unwrap();

    assert_eq!(built.layout.pack_dir(), dir.path().join("packs").join("Round_Trip"));
    assert_eq!(
        built.manifest.references,
        vec![ResourceReference::new("jei", "2803400"), ResourceReference::latest("journeymap")]
    );

    let reloaded = ManifestBuilder::new(&config, &locator, dir.path())
        .build(&PackInput::Structured(built.layout.manifest_path()))
        .await
        .unwrap();

    assert_eq!(reloaded.manifest.references, built.manifest.references);
    assert_eq!(reloaded.manifest.game_version(), "1.12.2");
    assert_eq!(reloaded.manifest.loaders()[0].id, "forge-14.23.5.2847");
    assert_eq!(reloaded.manifest.author, "tester");
    assert_eq!(reloaded.layout.pack_dir(), built.layout.pack_dir());
}

#[tokio::test]
async fn test_mod_list_without_game_version_fails_before_network() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let mod_list = dir.path().join("mods.txt");
    std::fs::write(&mod_list, format!("name=Broken\n{}/projects/jei\n", server.uri())).unwrap();

    let installer = PackInstaller::new(config_for(&server), dir.path()).unwrap();
    let err = installer.install(mod_list.to_str().unwrap()).await.unwrap_err();

    assert!(matches!(err, InstallError::MissingGameVersion { .. }));
    assert!(err.is_fatal());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mod_list_overrides_url_failure_is_a_warning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/overrides.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    serve_redirect(&server, "/projects/jei/files/1/download", "/cdn/jei.jar").await;
    serve_file(&server, "/cdn/jei.jar", b"jei").await;

    let dir = tempdir().unwrap();
    let mod_list = dir.path().join("mods.txt");
    std::fs::write(
        &mod_list,
        format!(
            "minecraft=1.12.2\noverrides_url={base}/overrides.zip\n{base}/projects/jei/files/1\n",
            base = server.uri()
        ),
    )
    .unwrap();

    let capture = ProgressCapture::default();
    let installer = PackInstaller::new(config_for(&server), dir.path())
        .unwrap()
        .with_progress(capture.get_callback());
    let outcome = installer.install(mod_list.to_str().unwrap()).await.unwrap();

    assert!(outcome.manifest.overrides.is_none());
    assert_eq!(outcome.report.installed_count, 1);
    assert_eq!(capture.count(|e| matches!(e, ProgressEvent::Warning { .. })), 1);
}

#[tokio::test]
async fn test_mod_list_overrides_url_is_unpacked_into_pack() {
    let server = MockServer::start().await;
    let overrides = zip_bytes(&[("config/jei.cfg", b"cheat=false")]);
    serve_file(&server, "/overrides.zip", &overrides).await;

    let dir = tempdir().unwrap();
    let mod_list = dir.path().join("mods.txt");
    std::fs::write(
        &mod_list,
        format!("minecraft=1.12.2\nname=Configured\noverrides_url={}/overrides.zip\n", server.uri()),
    )
    .unwrap();

    let installer = PackInstaller::new(config_for(&server), dir.path()).unwrap();
    let outcome = installer.install(mod_list.to_str().unwrap()).await.unwrap();

    assert_eq!(outcome.manifest.overrides.as_deref(), Some("overrides"));
    assert_eq!(outcome.report.override_files, 1);
    assert_eq!(
        std::fs::read(outcome.layout.game_dir().join("config/jei.cfg")).unwrap(),
        b"cheat=false"
    );
}

#[tokio::test]
async fn test_archive_input_installs_resources_and_overrides() {
    let server = MockServer::start().await;
    serve_redirect(&server, "/projects/1/files/5/download", "/cdn/download").await;
    serve_file(&server, "/cdn/download", b"five").await;

    let manifest = r#"{
        "name": "Sky Pack",
        "version": "2.0.0",
        "author": "maker",
        "manifestType": "minecraftModpack",
        "manifestVersion": 1,
        "minecraft": { "version": "1.12.2", "modLoaders": [{ "id": "forge-14.23.5.2847", "primary": true }] },
        "files": [{ "projectID": 1, "fileID": 5, "required": true }],
        "overrides": "overrides"
    }"#;
    let dir = tempdir().unwrap();
    let archive = dir.path().join("sky.zip");
    std::fs::write(
        &archive,
        zip_bytes(&[
            ("manifest.json", manifest.as_bytes()),
            ("overrides/config/a.cfg", b"a=1"),
            ("overrides/options.txt", b"fov:90"),
        ]),
    )
    .unwrap();

    let installer = PackInstaller::new(config_for(&server), dir.path()).unwrap();
    let outcome = installer.install(archive.to_str().unwrap()).await.unwrap();

    let pack_dir = dir.path().join("packs").join("Sky_Pack");
    assert_eq!(outcome.layout.pack_dir(), pack_dir);
    assert!(!dir.path().join("packs").join("sky").exists());
    assert!(pack_dir.join("minecraft/mods/5.jar").exists());
    assert_eq!(std::fs::read(pack_dir.join("minecraft/config/a.cfg")).unwrap(), b"a=1");
    assert_eq!(outcome.report.installed_count, 1);
    assert_eq!(outcome.report.override_files, 2);
    assert_eq!(outcome.manifest.requirements().loaders.len(), 1);
}

#[tokio::test]
async fn test_archive_without_manifest_is_rejected() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let archive = dir.path().join("empty.zip");
    std::fs::write(&archive, zip_bytes(&[("readme.txt", b"hello")])).unwrap();

    let installer = PackInstaller::new(config_for(&server), dir.path()).unwrap();
    let err = installer.install(archive.to_str().unwrap()).await.unwrap_err();

    assert!(matches!(err, InstallError::InvalidManifest { .. }));
}

#[tokio::test]
async fn test_remote_pack_is_downloaded_and_unpacked() {
    let server = MockServer::start().await;
    let pack = zip_bytes(&[(
        "manifest.json",
        br#"{"name": "Remote", "files": [], "minecraft": {"version": "1.12.2"}}"#,
    )]);
    serve_redirect(&server, "/projects/remote-pack/files/latest", "/cdn/remote-1.0.zip").await;
    serve_file(&server, "/cdn/remote-1.0.zip", &pack).await;

    let dir = tempdir().unwrap();
    let installer = PackInstaller::new(config_for(&server), dir.path()).unwrap();
    let outcome = installer
        .install(&format!("{}/projects/remote-pack", server.uri()))
        .await
        .unwrap();

    assert_eq!(outcome.manifest.name, "Remote");
    assert_eq!(outcome.layout.pack_dir(), dir.path().join("packs").join("Remote"));
    assert!(!dir.path().join("packs").join("remote-1.0.zip").exists());
}

#[tokio::test]
async fn test_remote_pack_that_is_not_a_zip_is_rejected() {
    let server = MockServer::start().await;
    serve_redirect(&server, "/projects/odd-pack/files/latest", "/cdn/odd-pack.rar").await;
    serve_file(&server, "/cdn/odd-pack.rar", b"Rar!").await;

    let dir = tempdir().unwrap();
    let installer = PackInstaller::new(config_for(&server), dir.path()).unwrap();
    let err = installer
        .install(&format!("{}/projects/odd-pack", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, InstallError::UnsupportedArchive { ref file_name } if file_name == "odd-pack.rar"));
    assert!(!dir.path().join("packs").join("odd-pack.rar").exists());
}

#[tokio::test]
async fn test_installer_file_resolves_pack_archive() {
    let server = MockServer::start().await;
    let pack = zip_bytes(&[(
        "manifest.json",
        br#"{"name": "From Ccip", "files": [], "minecraft": {"version": "1.10.2"}}"#,
    )]);
    serve_redirect(&server, "/projects/77/files/3/download", "/cdn/from-ccip.zip").await;
    serve_file(&server, "/cdn/from-ccip.zip", &pack).await;

    let dir = tempdir().unwrap();
    let ccip = dir.path().join("pack.ccip");
    std::fs::write(&ccip, r#"<package><project id="77" file="3" /></package>"#).unwrap();

    let installer = PackInstaller::new(config_for(&server), dir.path()).unwrap();
    let outcome = installer.install(ccip.to_str().unwrap()).await.unwrap();

    assert_eq!(outcome.manifest.name, "From Ccip");
    assert_eq!(outcome.manifest.game_version(), "1.10.2");
}

#[tokio::test]
async fn test_missing_overrides_dir_only_warns() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config_for(&server));
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();
    let capture = ProgressCapture::default();

    let mut manifest = manifest_with(Vec::new());
    manifest.overrides = Some("overrides".to_string());

    let report = SyncEngine::new(&locator)
        .with_progress(Some(capture.get_callback()))
        .sync(&manifest, &layout)
        .await
        .unwrap();

    assert_eq!(report.override_files, 0);
    assert_eq!(capture.count(|e| matches!(e, ProgressEvent::Warning { .. })), 1);
}

#[tokio::test]
async fn test_multi_hop_chain_names_file_from_reference() {
    let server = MockServer::start().await;
    serve_redirect(&server, "/projects/p/files/55/download", "/files/p/55").await;
    serve_redirect(&server, "/files/p/55", "/cdn/download").await;
    serve_file(&server, "/cdn/download", b"abc").await;

    let dir = tempdir().unwrap();
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();
    let url = locator.resource_url("p", "55");
    let resolution = locator.fetch(&url, dir.path(), "55.jar", None).await.unwrap();

    assert_eq!(resolution, Resolution::Resolved { file_name: "55.jar".to_string(), size: 3 });
    assert!(dir.path().join("55.jar").exists());
    assert!(!dir.path().join("55").exists());
}

#[tokio::test]
async fn test_latest_chains_ending_in_download_do_not_collide() {
    let server = MockServer::start().await;
    serve_redirect(&server, "/projects/a/files/latest", "/mirror/a/download").await;
    serve_file(&server, "/mirror/a/download", b"aaa").await;
    serve_redirect(&server, "/projects/b/files/latest", "/mirror/b/download").await;
    serve_file(&server, "/mirror/b/download", b"bbbb").await;

    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config_for(&server));
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();

    let manifest = manifest_with(vec![ResourceReference::latest("a"), ResourceReference::latest("b")]);
    let report = SyncEngine::new(&locator).sync(&manifest, &layout).await.unwrap();

    assert_eq!(report.installed_count, 2);
    assert_eq!(report.skipped_count, 0);
    assert_eq!(std::fs::read(layout.resources_dir().join("a-latest.jar")).unwrap(), b"aaa");
    assert_eq!(std::fs::read(layout.resources_dir().join("b-latest.jar")).unwrap(), b"bbbb");
    assert!(!layout.resources_dir().join("latest").exists());

    let index = InstallIndex::load(&layout.index_path()).await.unwrap();
    assert_eq!(index.get("a"), Some("a-latest.jar"));
    assert_eq!(index.get("b"), Some("b-latest.jar"));
}

#[tokio::test]
async fn test_missing_content_length_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/stream/files/1/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("transfer-encoding", "chunked")
                .set_body_bytes(b"chunked-bytes".to_vec()),
        )
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config_for(&server));
    let locator = ResourceLocator::new(&config_for(&server)).unwrap();

    let url = locator.resource_url("stream", "1");
    std::fs::create_dir_all(layout.resources_dir()).unwrap();
    let resolution = locator.fetch(&url, &layout.resources_dir(), "1.jar", None).await.unwrap();
    assert!(matches!(resolution, Resolution::Skipped(SkipReason::UnknownSize { .. })));

    let report = SyncEngine::new(&locator)
        .sync(&manifest_with(vec![ResourceReference::new("stream", "1")]), &layout)
        .await
        .unwrap();

    assert_eq!(report.installed_count, 0);
    assert_eq!(report.skipped_count, 1);
    assert!(!layout.resources_dir().join("1.jar").exists());
    assert!(!layout.index_path().exists());
}

#[tokio::test]
async fn test_truncated_body_leaves_nothing_behind() {
    let base = serve_truncated(b"abc", 100).await;
    let config = InstallerConfigBuilder::new().project_base_url(&base).build();

    let dir = tempdir().unwrap();
    let layout = PackLayout::new(dir.path(), &config);
    let locator = ResourceLocator::new(&config).unwrap();
    std::fs::create_dir_all(layout.resources_dir()).unwrap();

    let url = locator.resource_url("cut", "9");
    let err = locator
        .fetch(&url, &layout.resources_dir(), "9.jar", None)
        .await
        .unwrap_err();
    assert!(matches!(err, InstallError::HttpRequest { .. } | InstallError::SizeMismatch { .. }));
    assert!(!err.is_fatal());
    assert!(part_files(&layout.resources_dir()).is_empty());
    assert!(!layout.resources_dir().join("9.jar").exists());

    let report = SyncEngine::new(&locator)
        .sync(&manifest_with(vec![ResourceReference::new("cut", "9")]), &layout)
        .await
        .unwrap();

    assert_eq!(report.skipped_count, 1);
    assert!(part_files(&layout.resources_dir()).is_empty());
    assert!(!layout.resources_dir().join("9.jar").exists());
}

#[tokio::test]
async fn test_mod_list_local_overrides_are_copied_into_pack() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let lists = dir.path().join("lists");
    std::fs::create_dir_all(lists.join("extra/config")).unwrap();
    std::fs::write(lists.join("extra/config/a.cfg"), b"a=1").unwrap();
    let mod_list = lists.join("mods.txt");
    std::fs::write(&mod_list, "name=Local Extras\nminecraft=1.12.2\noverrides=extra\n").unwrap();

    let installer = PackInstaller::new(config_for(&server), dir.path()).unwrap();
    let outcome = installer.install(mod_list.to_str().unwrap()).await.unwrap();

    assert_eq!(outcome.manifest.overrides.as_deref(), Some("overrides"));
    let persisted: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(outcome.layout.manifest_path()).unwrap()).unwrap();
    assert_eq!(persisted["overrides"], "overrides");

    assert_eq!(std::fs::read(outcome.layout.pack_dir().join("overrides/config/a.cfg")).unwrap(), b"a=1");
    assert_eq!(std::fs::read(outcome.layout.game_dir().join("config/a.cfg")).unwrap(), b"a=1");
    assert_eq!(outcome.report.override_files, 1);
    assert!(lists.join("extra/config/a.cfg").exists());
}

// tests/integration_test.rs

//! Integration tests for latest-version
//!
//! These tests drive the real HTTP transport against local mock registries.

use flate2::Compression;
use flate2::write::GzEncoder;
use latest_version::config::{PackageType, SourceListing};
use latest_version::transport::DEFAULT_USER_AGENT;
use latest_version::{
    Config, Ecosystem, Error, HttpTransport, PackageReference, RegistryError, Resolver, Transport,
    VersionBound,
};
use mockito::{Matcher, Server};
use std::io::Write;
use std::sync::Arc;

fn resolver(config: &Config) -> Resolver {
    let transport = HttpTransport::new(&config.http).unwrap();
    Resolver::new(Arc::new(transport), config)
}

#[test]
fn test_http_transport_sends_headers() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/ping")
        .match_header("user-agent", DEFAULT_USER_AGENT)
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("x-registry", "mock")
        .with_body("pong")
        .create();

    let transport = HttpTransport::new(&Config::default().http).unwrap();
    let response = transport
        .fetch(&format!("{}/ping", server.url()), &[("Accept", "application/json")])
        .unwrap();

    mock.assert();
    assert_eq!(response.status, 200);
    assert_eq!(response.header("x-registry"), Some("mock"));
    assert_eq!(response.body, b"pong");
}

#[test]
fn test_http_transport_returns_error_statuses() {
    let mut server = Server::new();
    let mock = server.mock("GET", "/missing").with_status(404).create();

    let transport = HttpTransport::new(&Config::default().http).unwrap();
    let response = transport
        .fetch(&format!("{}/missing", server.url()), &[])
        .unwrap();

    mock.assert();
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[test]
fn test_http_transport_connection_failure() {
    let transport = HttpTransport::new(&Config::default().http).unwrap();
    let err = transport.fetch("http://127.0.0.1:1/", &[]).unwrap_err();
    assert_eq!(err.url, "http://127.0.0.1:1/");
}

#[test]
fn test_resolve_package_index() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/pypi/requests/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "info": {"version": "2.32.3"},
                "releases": {"1.2.3": [], "2.31.0": [], "2.32.3": [], "3.0.0rc1": []}
            }"#,
        )
        .create();

    let latest = resolver(&Config::default())
        .latest_package_index("requests", Some(&server.url()), Some("2.0"), Some("2.32"))
        .unwrap();

    mock.assert();
    assert_eq!(latest.as_deref(), Some("2.31.0"));
}

#[test]
fn test_resolve_container_with_token_and_pages() {
    let mut server = Server::new();
    let realm = format!("{}/token", server.url());

    let api_check = server
        .mock("GET", "/v2/")
        .with_status(401)
        .with_header(
            "www-authenticate",
            &format!(r#"Bearer realm="{}",service="registry.test""#, realm),
        )
        .create();
    let token = server
        .mock("GET", "/token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("service".into(), "registry.test".into()),
            Matcher::UrlEncoded("scope".into(), "repository:acme/app:pull".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"token": "t0k3n"}"#)
        .create();
    let first = server
        .mock("GET", "/v2/acme/app/tags/list")
        .match_query(Matcher::Exact("n=2".into()))
        .match_header("authorization", "Bearer t0k3n")
        .with_status(200)
        .with_header("link", r#"</v2/acme/app/tags/list?n=2&last=1.1.0>; rel="next""#)
        .with_body(r#"{"name": "acme/app", "tags": ["1.0.0", "1.1.0"]}"#)
        .create();
    let second = server
        .mock("GET", "/v2/acme/app/tags/list")
        .match_query(Matcher::Exact("n=2&last=1.1.0".into()))
        .match_header("authorization", "Bearer t0k3n")
        .with_status(200)
        .with_body(r#"{"name": "acme/app", "tags": ["latest", "1.10.0"]}"#)
        .create();

    let mut config = Config::default();
    config.container_registry.page_size = 2;

    let package =
        PackageReference::new(Ecosystem::ContainerRegistry, "acme/app").with_base_url(server.url());
    let latest = resolver(&config)
        .resolve_latest(&package, &VersionBound::unbounded())
        .unwrap();

    api_check.assert();
    token.assert();
    first.assert();
    second.assert();
    assert_eq!(latest.as_deref(), Some("1.10.0"));
}

#[test]
fn test_resolve_source_host_tags() {
    let mut server = Server::new();
    let first = server
        .mock("GET", "/repos/acme/tool/tags")
        .match_query(Matcher::Exact("per_page=2&page=1".into()))
        .match_header("accept", "application/vnd.github+json")
        .with_status(200)
        .with_body(r#"[{"name": "v2.0.0"}, {"name": "v1.9.0"}]"#)
        .create();
    let second = server
        .mock("GET", "/repos/acme/tool/tags")
        .match_query(Matcher::Exact("per_page=2&page=2".into()))
        .with_status(200)
        .with_body(r#"[{"name": "v1.10.0"}]"#)
        .create();

    let mut config = Config::default();
    config.source_host.listing = SourceListing::Tags;
    config.source_host.per_page = 2;

    let latest = resolver(&config)
        .latest_source_host("acme/tool", Some(&server.url()), None, Some("2.0.0"))
        .unwrap();

    first.assert();
    second.assert();
    assert_eq!(latest.as_deref(), Some("v1.10.0"));
}

#[test]
fn test_resolve_source_host_container_package() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/users/acme/packages/container/app/versions")
        .match_query(Matcher::Exact("per_page=100&page=1".into()))
        .with_status(200)
        .with_body(
            r#"[
                {"id": 2, "name": "sha256:bbb", "metadata": {"container": {"tags": ["1.4.0", "latest"]}}},
                {"id": 1, "name": "sha256:aaa", "metadata": {"container": {"tags": ["1.3.2"]}}}
            ]"#,
        )
        .create();

    let mut config = Config::default();
    config.source_host.listing = SourceListing::Packages;
    config.source_host.package_type = PackageType::Container;

    let latest = resolver(&config)
        .latest_source_host("acme/app", Some(&server.url()), None, Some("1.4.0"))
        .unwrap();

    mock.assert();
    assert_eq!(latest.as_deref(), Some("1.3.2"));
}

#[test]
fn test_resolve_rpm_through_mirror_list() {
    let repomd = r#"<repomd><data type="primary"><location href="repodata/primary.xml"/></data></repomd>"#;
    let primary = r#"<metadata><package type="rpm"><name>jq</name><arch>noarch</arch><version epoch="0" ver="1.7.1" rel="3"/></package></metadata>"#;

    let mut server = Server::new();
    let mirror_list = format!(
        "# fastest first\n\n{url}/mirror-a\n{url}/mirror-b\n",
        url = server.url()
    );
    let mirrors = server
        .mock("GET", "/mirrors")
        .with_status(200)
        .with_body(mirror_list)
        .create();
    let repomd_mock = server
        .mock("GET", "/mirror-a/repodata/repomd.xml")
        .with_status(200)
        .with_body(repomd)
        .create();
    let primary_mock = server
        .mock("GET", "/mirror-a/repodata/primary.xml")
        .with_status(200)
        .with_body(primary)
        .create();
    let unused = server
        .mock("GET", Matcher::Regex("^/mirror-b".into()))
        .expect(0)
        .create();

    let mut config = Config::default();
    config.rpm_repository.mirror_list = Some(format!("{}/mirrors", server.url()));

    let latest = resolver(&config).latest_rpm("jq", None, None, None).unwrap();

    mirrors.assert();
    repomd_mock.assert();
    primary_mock.assert();
    unused.assert();
    assert_eq!(latest.as_deref(), Some("0:1.7.1-3"));
}

#[test]
fn test_resolve_rpm_repository() {
    let repomd = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo">
  <data type="primary">
    <location href="repodata/primary.xml.gz"/>
  </data>
</repomd>"#;
    let primary = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" packages="3">
<package type="rpm"><name>curl</name><arch>x86_64</arch><version epoch="0" ver="8.6.0" rel="1.fc40"/></package>
<package type="rpm"><name>curl</name><arch>x86_64</arch><version epoch="0" ver="8.10.0" rel="2.fc40"/></package>
<package type="rpm"><name>curl</name><arch>s390x</arch><version epoch="0" ver="9.0.0" rel="1.fc40"/></package>
</metadata>"#;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(primary.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut server = Server::new();
    let repomd_mock = server
        .mock("GET", "/fedora/repodata/repomd.xml")
        .with_status(200)
        .with_body(repomd)
        .create();
    let primary_mock = server
        .mock("GET", "/fedora/repodata/primary.xml.gz")
        .with_status(200)
        .with_body(compressed)
        .create();

    let base_url = format!("{}/fedora", server.url());
    let latest = resolver(&Config::default())
        .latest_rpm("curl", Some(&base_url), None, None)
        .unwrap();

    repomd_mock.assert();
    primary_mock.assert();
    assert_eq!(latest.as_deref(), Some("0:8.10.0-2.fc40"));
}

#[test]
fn test_registry_status_propagates() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/pypi/ghost/json")
        .with_status(404)
        .with_body(r#"{"message": "Not Found"}"#)
        .create();

    let err = resolver(&Config::default())
        .latest_package_index("ghost", Some(&server.url()), None, None)
        .unwrap_err();

    mock.assert();
    match err {
        Error::Registry(RegistryError::Status {
            identifier, status, ..
        }) => {
            assert_eq!(identifier, "ghost");
            assert_eq!(status, 404);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_ecosystem_makes_no_requests() {
    let mut server = Server::new();
    let mock = server.mock("GET", Matcher::Any).expect(0).create();

    let err = resolver(&Config::default())
        .resolve_latest_tag("cargo", "serde", Some(&server.url()), &VersionBound::unbounded())
        .unwrap_err();

    mock.assert();
    assert!(matches!(err, Error::UnsupportedEcosystem(_)));
}

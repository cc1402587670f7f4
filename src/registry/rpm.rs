// src/registry/rpm.rs

//! RPM repository adapter
//!
//! Reads yum/dnf repository metadata: repomd.xml points at the primary
//! package index, which is usually compressed and lists every package with
//! its `<version epoch= ver= rel=/>`.
//!
//! The repository root comes from an explicit base URL or from the first
//! entry of a plain-text mirror list. Other mirrors are never tried.

use super::{Ecosystem, RegistryAdapter, fetch_ok, trim_base};
use crate::config::RpmRepositoryConfig;
use crate::error::RegistryError;
use crate::transport::Transport;
use crate::version::VersionFamily;
use flate2::read::GzDecoder;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use tracing::{debug, info, warn};
use xz2::read::XzDecoder;

/// Architecture-independent packages are always eligible
const NOARCH: &str = "noarch";

/// RPM repository adapter
pub struct RpmRepositoryAdapter {
    transport: Arc<dyn Transport>,
    base_url: Option<String>,
    mirror_list: Option<String>,
    architecture: String,
}

impl RpmRepositoryAdapter {
    pub fn new(transport: Arc<dyn Transport>, config: &RpmRepositoryConfig) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
            mirror_list: config.mirror_list.clone(),
            architecture: config.architecture.clone(),
        }
    }

    /// Repository root: the given or configured base URL, else the first mirror
    fn repository_url(
        &self,
        base_url: Option<&str>,
        identifier: &str,
    ) -> Result<String, RegistryError> {
        if let Some(url) = base_url.or(self.base_url.as_deref()) {
            return Ok(trim_base(url).to_string());
        }

        let mirror_list = self
            .mirror_list
            .as_deref()
            .ok_or_else(|| RegistryError::MissingBaseUrl {
                identifier: identifier.to_string(),
            })?;

        debug!("Downloading mirror list from: {}", mirror_list);
        let response = fetch_ok(self.transport.as_ref(), mirror_list, &[], identifier)?;
        let text = String::from_utf8_lossy(&response.body);
        let mirror = first_mirror(&text).ok_or_else(|| {
            RegistryError::invalid(identifier, format!("Mirror list {} has no entries", mirror_list))
        })?;

        info!("Using mirror {}", mirror);
        Ok(trim_base(mirror).to_string())
    }

    /// Download repomd.xml and find the primary metadata location
    fn primary_location(&self, repo_url: &str, identifier: &str) -> Result<String, RegistryError> {
        let repomd_url = format!("{}/repodata/repomd.xml", repo_url);
        debug!("Downloading repomd.xml from: {}", repomd_url);

        let response = fetch_ok(self.transport.as_ref(), &repomd_url, &[], identifier)?;
        find_primary_location(&response.body).map_err(|message| RegistryError::invalid(identifier, message))
    }

    /// Download the primary metadata and collect matching EVRs
    fn primary_versions(
        &self,
        repo_url: &str,
        location: &str,
        identifier: &str,
    ) -> Result<Vec<String>, RegistryError> {
        let primary_url = format!("{}/{}", repo_url, location.trim_start_matches('/'));
        debug!("Downloading primary metadata from: {}", primary_url);

        let response = fetch_ok(self.transport.as_ref(), &primary_url, &[], identifier)?;
        let reader = decompressor(location, &response.body)
            .map_err(|message| RegistryError::invalid(identifier, message))?;

        let arches = [self.architecture.as_str(), NOARCH];
        package_versions(BufReader::new(reader), identifier, &arches)
            .map_err(|message| RegistryError::invalid(identifier, message))
    }
}

impl RegistryAdapter for RpmRepositoryAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::RpmRepository
    }

    fn version_family(&self) -> VersionFamily {
        VersionFamily::Rpm
    }

    fn list_versions(
        &self,
        identifier: &str,
        base_url: Option<&str>,
    ) -> Result<Vec<String>, RegistryError> {
        let repo_url = self.repository_url(base_url, identifier)?;

        let location = self.primary_location(&repo_url, identifier)?;
        let versions = self.primary_versions(&repo_url, &location, identifier)?;

        info!(
            "Found {} builds of {} for {} in {}",
            versions.len(),
            identifier,
            self.architecture,
            repo_url
        );
        Ok(versions)
    }
}

/// First entry of a mirror list, skipping blank lines and comments
fn first_mirror(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Pick a decoder from the metadata file extension
fn decompressor<'a>(location: &str, bytes: &'a [u8]) -> Result<Box<dyn Read + 'a>, String> {
    if location.ends_with(".gz") {
        Ok(Box::new(GzDecoder::new(bytes)))
    } else if location.ends_with(".zst") {
        let decoder = zstd::stream::read::Decoder::new(bytes)
            .map_err(|e| format!("Failed to start zstd decoder: {}", e))?;
        Ok(Box::new(decoder))
    } else if location.ends_with(".xz") {
        Ok(Box::new(XzDecoder::new(bytes)))
    } else if location.ends_with(".xml") {
        Ok(Box::new(bytes))
    } else {
        Err(format!("Unsupported primary metadata compression: {}", location))
    }
}

fn attribute(element: &BytesStart, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Find `<data type="primary"><location href=.../></data>` in repomd.xml
fn find_primary_location(xml: &[u8]) -> Result<String, String> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut in_primary = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"data" => {
                in_primary = attribute(&e, b"type").as_deref() == Some("primary");
            }
            Ok(Event::Start(e) | Event::Empty(e))
                if in_primary && e.name().as_ref() == b"location" =>
            {
                if let Some(href) = attribute(&e, b"href") {
                    return Ok(href);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"data" => {
                in_primary = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse repomd.xml: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Err("Could not find primary data location in repomd.xml".to_string())
}

#[derive(Clone, Copy)]
enum TextField {
    Name,
    Arch,
}

/// Fields of one `<package>` that matter for version listing
#[derive(Default)]
struct PackageEntry {
    name: Option<String>,
    arch: Option<String>,
    epoch: Option<String>,
    ver: Option<String>,
    rel: Option<String>,
}

impl PackageEntry {
    fn evr(&self) -> Option<String> {
        let ver = self.ver.as_deref()?;
        let epoch = self.epoch.as_deref().filter(|e| !e.is_empty()).unwrap_or("0");
        Some(match self.rel.as_deref().filter(|r| !r.is_empty()) {
            Some(rel) => format!("{}:{}-{}", epoch, ver, rel),
            None => format!("{}:{}", epoch, ver),
        })
    }
}

/// Stream primary.xml and return `epoch:ver-rel` for every build of `name`
fn package_versions<R: BufRead>(
    source: R,
    name: &str,
    arches: &[&str],
) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut versions = Vec::new();
    let mut current: Option<PackageEntry> = None;
    let mut text_field: Option<TextField> = None;
    let mut scanned = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.name().as_ref() == b"version" => {
                if let Some(pkg) = current.as_mut() {
                    pkg.epoch = attribute(&e, b"epoch");
                    pkg.ver = attribute(&e, b"ver");
                    pkg.rel = attribute(&e, b"rel");
                }
                text_field = None;
            }
            Ok(Event::Start(e)) => {
                text_field = None;
                match e.name().as_ref() {
                    b"package" => {
                        scanned += 1;
                        // Only binary packages; other types carry no EVR we can use
                        current = (attribute(&e, b"type").as_deref() == Some("rpm"))
                            .then(PackageEntry::default);
                    }
                    b"name" => text_field = Some(TextField::Name),
                    b"arch" => text_field = Some(TextField::Arch),
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(pkg), Some(field)) = (current.as_mut(), text_field) {
                    let text = t
                        .unescape()
                        .map_err(|e| format!("Bad text in primary metadata: {}", e))?
                        .into_owned();
                    match field {
                        TextField::Name => pkg.name = Some(text),
                        TextField::Arch => pkg.arch = Some(text),
                    }
                }
            }
            Ok(Event::End(e)) => {
                text_field = None;
                if e.name().as_ref() == b"package" {
                    if let Some(pkg) = current.take() {
                        let arch_matches = pkg
                            .arch
                            .as_deref()
                            .is_some_and(|arch| arches.contains(&arch));
                        if pkg.name.as_deref() == Some(name) && arch_matches {
                            match pkg.evr() {
                                Some(evr) => versions.push(evr),
                                None => warn!("Package {} has no version attribute", name),
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse primary metadata: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    debug!("Scanned {} packages, {} builds of {}", scanned, versions.len(), name);
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FetchResponse;
    use crate::transport::testing::ScriptedTransport;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const REPOMD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
  <revision>1718000000</revision>
  <data type="filelists">
    <location href="repodata/abc-filelists.xml.gz"/>
  </data>
  <data type="primary">
    <checksum type="sha256">deadbeef</checksum>
    <location href="repodata/def-primary.xml.gz"/>
    <size>1024</size>
  </data>
</repomd>"#;

    const PRIMARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="5">
<package type="rpm">
  <name>bash</name>
  <arch>x86_64</arch>
  <version epoch="0" ver="5.2.21" rel="1.fc40"/>
  <summary>The GNU Bourne Again shell</summary>
  <format>
    <rpm:requires>
      <rpm:entry name="glibc" flags="GE" epoch="0" ver="2.38"/>
    </rpm:requires>
  </format>
</package>
<package type="rpm">
  <name>bash</name>
  <arch>x86_64</arch>
  <version epoch="1" ver="5.2.26" rel="3.fc40"/>
</package>
<package type="rpm">
  <name>bash</name>
  <arch>aarch64</arch>
  <version epoch="0" ver="9.9" rel="1.fc40"/>
</package>
<package type="rpm">
  <name>bash-completion</name>
  <arch>noarch</arch>
  <version epoch="1" ver="2.11" rel="11.fc40"/>
</package>
<package type="rpm">
  <name>bash-doc</name>
  <arch>noarch</arch>
  <version ver="5.2.26" rel="3.fc40"/>
</package>
</metadata>"#;

    fn gzip(data: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn adapter(transport: Arc<ScriptedTransport>) -> RpmRepositoryAdapter {
        RpmRepositoryAdapter::new(transport, &RpmRepositoryConfig::default())
    }

    #[test]
    fn test_find_primary_location() {
        let location = find_primary_location(REPOMD.as_bytes()).unwrap();
        assert_eq!(location, "repodata/def-primary.xml.gz");
    }

    #[test]
    fn test_find_primary_location_missing() {
        let xml = r#"<repomd><data type="other"><location href="x.xml.gz"/></data></repomd>"#;
        assert!(find_primary_location(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_package_versions_filters_name_and_arch() {
        let versions =
            package_versions(PRIMARY.as_bytes(), "bash", &["x86_64", NOARCH]).unwrap();
        assert_eq!(versions, vec!["0:5.2.21-1.fc40", "1:5.2.26-3.fc40"]);

        let aarch64 = package_versions(PRIMARY.as_bytes(), "bash", &["aarch64", NOARCH]).unwrap();
        assert_eq!(aarch64, vec!["0:9.9-1.fc40"]);
    }

    #[test]
    fn test_package_versions_noarch_and_default_epoch() {
        let versions = package_versions(PRIMARY.as_bytes(), "bash-doc", &["x86_64", NOARCH]).unwrap();
        assert_eq!(versions, vec!["0:5.2.26-3.fc40"]);
    }

    #[test]
    fn test_package_versions_rejects_broken_xml() {
        let result = package_versions("<metadata><package type=\"rpm\"></metadata>".as_bytes(), "bash", &["x86_64"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_decompressors() {
        let mut plain = String::new();
        decompressor("primary.xml", PRIMARY.as_bytes())
            .unwrap()
            .read_to_string(&mut plain)
            .unwrap();
        assert_eq!(plain, PRIMARY);

        let gz = gzip(PRIMARY);
        let mut out = String::new();
        decompressor("primary.xml.gz", &gz)
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, PRIMARY);

        let zst = zstd::encode_all(PRIMARY.as_bytes(), 3).unwrap();
        let mut out = String::new();
        decompressor("primary.xml.zst", &zst)
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, PRIMARY);

        let mut xz = xz2::write::XzEncoder::new(Vec::new(), 6);
        xz.write_all(PRIMARY.as_bytes()).unwrap();
        let xz = xz.finish().unwrap();
        let mut out = String::new();
        decompressor("primary.xml.xz", &xz)
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, PRIMARY);

        assert!(decompressor("primary.xml.bz2", b"").is_err());
    }

    #[test]
    fn test_list_versions_from_repository() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    "https://repo.example/fedora/40/repodata/repomd.xml",
                    FetchResponse::new(200, REPOMD),
                )
                .respond(
                    "https://repo.example/fedora/40/repodata/def-primary.xml.gz",
                    FetchResponse::new(200, gzip(PRIMARY)),
                ),
        );

        let versions = adapter(transport)
            .list_versions("bash", Some("https://repo.example/fedora/40/"))
            .unwrap();
        assert_eq!(versions, vec!["0:5.2.21-1.fc40", "1:5.2.26-3.fc40"]);
    }

    #[test]
    fn test_requires_base_url() {
        let transport = Arc::new(ScriptedTransport::new());
        let err = adapter(transport.clone()).list_versions("bash", None).unwrap_err();
        assert!(matches!(err, RegistryError::MissingBaseUrl { .. }));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_repomd_not_found() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            "https://repo.example/repodata/repomd.xml",
            FetchResponse::new(404, "Not Found"),
        ));

        let err = adapter(transport)
            .list_versions("bash", Some("https://repo.example"))
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_corrupt_primary() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond("https://repo.example/repodata/repomd.xml", FetchResponse::new(200, REPOMD))
                .respond(
                    "https://repo.example/repodata/def-primary.xml.gz",
                    FetchResponse::new(200, "not gzip at all"),
                ),
        );

        let err = adapter(transport)
            .list_versions("bash", Some("https://repo.example"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidResponse { .. }));
    }

    #[test]
    fn test_first_mirror() {
        let list = "# repo = baseos-9 arch = x86_64 country = DE\n\n  https://mirror.one/rocky/9/BaseOS/x86_64/os/\nhttps://mirror.two/os/\n";
        assert_eq!(first_mirror(list), Some("https://mirror.one/rocky/9/BaseOS/x86_64/os/"));
        assert_eq!(first_mirror("# only comments\n\n"), None);
    }

    #[test]
    fn test_list_versions_from_mirror_list() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    "https://mirrors.example/mirrorlist?repo=fedora-40&arch=x86_64",
                    FetchResponse::new(
                        200,
                        "# generated\nhttps://mirror.one/fedora/40/\nhttps://mirror.two/fedora/40/\n",
                    ),
                )
                .respond(
                    "https://mirror.one/fedora/40/repodata/repomd.xml",
                    FetchResponse::new(200, REPOMD),
                )
                .respond(
                    "https://mirror.one/fedora/40/repodata/def-primary.xml.gz",
                    FetchResponse::new(200, gzip(PRIMARY)),
                ),
        );

        let config = RpmRepositoryConfig {
            mirror_list: Some("https://mirrors.example/mirrorlist?repo=fedora-40&arch=x86_64".to_string()),
            ..RpmRepositoryConfig::default()
        };
        let versions = RpmRepositoryAdapter::new(transport.clone(), &config)
            .list_versions("bash", None)
            .unwrap();

        assert_eq!(versions, vec!["0:5.2.21-1.fc40", "1:5.2.26-3.fc40"]);
        assert_eq!(transport.request_count(), 3);
    }

    #[test]
    fn test_failed_mirror_is_not_skipped() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    "https://mirrors.example/list",
                    FetchResponse::new(200, "https://mirror.one/os/\nhttps://mirror.two/os/\n"),
                )
                .respond(
                    "https://mirror.one/os/repodata/repomd.xml",
                    FetchResponse::new(503, "down"),
                ),
        );

        let config = RpmRepositoryConfig {
            mirror_list: Some("https://mirrors.example/list".to_string()),
            ..RpmRepositoryConfig::default()
        };
        let err = RpmRepositoryAdapter::new(transport.clone(), &config)
            .list_versions("bash", None)
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn test_empty_mirror_list() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            "https://mirrors.example/list",
            FetchResponse::new(200, "# no mirrors available\n"),
        ));

        let config = RpmRepositoryConfig {
            mirror_list: Some("https://mirrors.example/list".to_string()),
            ..RpmRepositoryConfig::default()
        };
        let err = RpmRepositoryAdapter::new(transport, &config)
            .list_versions("bash", None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidResponse { .. }));
    }

    #[test]
    fn test_explicit_base_url_beats_mirror_list() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            "https://repo.example/repodata/repomd.xml",
            FetchResponse::new(404, "Not Found"),
        ));

        let config = RpmRepositoryConfig {
            mirror_list: Some("https://mirrors.example/list".to_string()),
            ..RpmRepositoryConfig::default()
        };
        let err = RpmRepositoryAdapter::new(transport.clone(), &config)
            .list_versions("bash", Some("https://repo.example"))
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(transport.requests()[0].url, "https://repo.example/repodata/repomd.xml");
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;

use crate::domain::models::RawSoftware;

/// Source of the raw software catalog.
pub trait SoftwareProvider: Send {
    fn fetch_catalog(&self) -> Result<Vec<RawSoftware>>;
}

pub struct HttpSoftwareProvider {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpSoftwareProvider {
    pub fn new_with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build software catalog client")?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }
}

impl SoftwareProvider for HttpSoftwareProvider {
    fn fetch_catalog(&self) -> Result<Vec<RawSoftware>> {
        let response = self.client.get(&self.url).send().map_err(|err| {
            anyhow!(
                "software catalog request failed (timeout={}ms): {err}",
                self.timeout.as_millis()
            )
        })?;

        response
            .error_for_status()
            .context("software catalog returned error status")?
            .json()
            .context("failed to deserialize software catalog response")
    }
}

/// Reads the catalog from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSoftwareProvider {
    path: PathBuf,
}

impl FileSoftwareProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SoftwareProvider for FileSoftwareProvider {
    fn fetch_catalog(&self) -> Result<Vec<RawSoftware>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read catalog file: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse catalog file: {}", self.path.display()))
    }
}

pub struct StaticSoftwareProvider {
    softwares: Vec<RawSoftware>,
}

impl StaticSoftwareProvider {
    pub fn new(softwares: Vec<RawSoftware>) -> Self {
        Self { softwares }
    }
}

impl SoftwareProvider for StaticSoftwareProvider {
    fn fetch_catalog(&self) -> Result<Vec<RawSoftware>> {
        Ok(self.softwares.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    use super::*;
    use crate::domain::models::SoftwareType;

    fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> Option<(String, JoinHandle<()>)> {
        let listener = match TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener,
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => return None,
            Err(err) => panic!("bind listener: {err}"),
        };
        let addr = listener.local_addr().expect("local addr");

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept request");
            let mut buf = [0_u8; 4096];
            let _ = stream.read(&mut buf).expect("read request");
            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            stream
                .write_all(response.as_bytes())
                .expect("write response");
        });

        Some((format!("http://{addr}/api/getSoftwares"), handle))
    }

    #[test]
    fn fetch_decodes_new_and_legacy_shapes() {
        let body = r#"[
            {"softwareName":"GIMP","softwareDescription":"Image editor","addedTime":1,"updateTime":2,
             "categories":["graphics"],"prerogatives":{"isPresentInSupportContract":true,"isFromFrenchPublicServices":false,"doRespectRgaa":false},
             "softwareType":{"type":"desktop","os":{"linux":true,"windows":true,"mac":false}},
             "userAndReferentCountByOrganization":{"DINUM":{"userCount":3,"referentCount":1}}},
            {"softwareName":"Nextcloud","softwareDescription":"File sync","environments":{"browser":true},
             "userAndReferentCountByOrganization":{}}
        ]"#;
        let Some((url, handle)) = serve_once("HTTP/1.1 200 OK", body) else {
            return;
        };

        let provider =
            HttpSoftwareProvider::new_with_timeout(url, Duration::from_secs(1)).expect("provider");
        let softwares = provider.fetch_catalog().expect("fetch catalog");
        handle.join().expect("join server");

        assert_eq!(softwares.len(), 2);
        assert_eq!(softwares[0].software_name, "GIMP");
        assert!(matches!(
            softwares[0].software_type,
            Some(SoftwareType::Desktop { .. })
        ));
        assert_eq!(
            softwares[0].user_and_referent_count_by_organization["DINUM"].user_count,
            3
        );
        assert!(softwares[1].software_type.is_none());
        assert!(softwares[1].environments.is_some_and(|env| env.browser));
    }

    #[test]
    fn fetch_surfaces_server_error() {
        let Some((url, handle)) = serve_once("HTTP/1.1 503 Service Unavailable", "") else {
            return;
        };

        let provider =
            HttpSoftwareProvider::new_with_timeout(url, Duration::from_secs(1)).expect("provider");
        let err = provider.fetch_catalog().expect_err("server error should fail");
        handle.join().expect("join server");
        assert!(err.to_string().contains("error status"));
    }

    #[test]
    fn file_provider_reports_missing_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let provider = FileSoftwareProvider::new(dir.path().join("missing.json"));
        let err = provider.fetch_catalog().expect_err("missing file should fail");
        assert!(err.to_string().contains("failed to read catalog file"));
    }
}

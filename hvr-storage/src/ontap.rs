//! ONTAP-style REST implementation of [`StorageApi`].

use crate::connection::StorageConnection;
use crate::{CloneId, ShareId, StorageApi, StorageSnapshot, VolumeId};
use chrono::{DateTime, Utc};
use hvr_core::error::{HvrError, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

/// Collection envelope returned by list and `return_records=true` calls
#[derive(Debug, Deserialize)]
struct Records<T> {
    #[serde(default = "Vec::new")]
    records: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SnapshotRecord {
    name: String,
    create_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SvmRef {
    uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShareRecord {
    name: String,
    svm: Option<SvmRef>,
}

impl From<ShareRecord> for ShareId {
    fn from(record: ShareRecord) -> Self {
        ShareId {
            name: record.name,
            svm_uuid: record.svm.and_then(|svm| svm.uuid),
        }
    }
}

pub struct OntapClient {
    http: Client,
    base: Url,
    username: String,
    password: String,
    svm: Option<String>,
    accept_invalid_certs: bool,
}

impl OntapClient {
    pub fn new(connection: StorageConnection) -> Result<Self> {
        let http = Client::builder()
            .timeout(connection.timeout)
            .danger_accept_invalid_certs(connection.accept_invalid_certs)
            .user_agent(concat!("hvrestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HvrError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base: connection.endpoint,
            username: connection.username,
            password: connection.password,
            svm: connection.svm,
            accept_invalid_certs: connection.accept_invalid_certs,
        })
    }

    /// Whether this client skips certificate validation
    pub fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| HvrError::Config(format!("storage endpoint '{}' cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send with credentials; any non-2xx status becomes a verbatim remote error
    fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .map_err(|e| HvrError::remote(operation, None, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(operation = %operation, status = %status, "storage call succeeded");
            Ok(response)
        } else {
            let body = response.text().unwrap_or_default();
            Err(HvrError::remote(operation, Some(status.as_u16()), body))
        }
    }

    fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
        let body = response
            .text()
            .map_err(|e| HvrError::remote(operation, None, e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| HvrError::Serialization(format!("{}: {} in response {}", operation, e, body)))
    }

    fn delete(&self, operation: &str, url: Url, resource: &str) -> Result<()> {
        match self.send(operation, self.http.delete(url)) {
            Ok(_) => {
                info!(resource = %resource, "{} succeeded", operation);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(resource = %resource, "{}: already gone", operation);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl StorageApi for OntapClient {
    fn find_volume(&self, name: &str) -> Result<VolumeId> {
        let url = self.url(&["api", "storage", "volumes"])?;
        let request = self
            .http
            .get(url)
            .query(&[("name", name), ("fields", "uuid,name")]);
        let found: Records<VolumeId> = Self::decode("findVolume", self.send("findVolume", request)?)?;

        found
            .records
            .into_iter()
            .find(|v| v.name == name)
            .ok_or_else(|| HvrError::NotFound(format!("volume '{}'", name)))
    }

    fn list_snapshots(&self, volume: &VolumeId) -> Result<Vec<StorageSnapshot>> {
        let url = self.url(&["api", "storage", "volumes", volume.uuid.as_str(), "snapshots"])?;
        let request = self.http.get(url).query(&[("fields", "name,create_time")]);
        let found: Records<SnapshotRecord> =
            Self::decode("listSnapshots", self.send("listSnapshots", request)?)?;

        Ok(found
            .records
            .into_iter()
            .map(|s| StorageSnapshot {
                name: s.name,
                create_time: s.create_time,
                volume: volume.clone(),
            })
            .collect())
    }

    fn create_clone(
        &self,
        name: &str,
        parent: &VolumeId,
        snapshot: &StorageSnapshot,
    ) -> Result<CloneId> {
        let url = self.url(&["api", "storage", "volumes"])?;
        let body = json!({
            "name": name,
            "clone": {
                "parent_volume": { "name": parent.name },
                "parent_snapshot": { "name": snapshot.name },
            },
            "nas": { "path": crate::naming::junction_path(name) },
        });
        let request = self
            .http
            .post(url)
            .query(&[("return_records", "true")])
            .json(&body);
        let created: Records<VolumeId> =
            Self::decode("createClone", self.send("createClone", request)?)?;

        match created.records.into_iter().next() {
            Some(clone) => Ok(clone),
            // Some controllers answer with a job reference only.
            None => self.find_volume(name),
        }
    }

    fn create_share(&self, name: &str, path: &str) -> Result<ShareId> {
        let url = self.url(&["api", "protocols", "cifs", "shares"])?;
        let mut body = json!({ "name": name, "path": path });
        if let (Some(svm), Value::Object(map)) = (&self.svm, &mut body) {
            map.insert("svm".to_string(), json!({ "name": svm }));
        }
        let request = self
            .http
            .post(url)
            .query(&[("return_records", "true")])
            .json(&body);
        let created: Records<ShareRecord> =
            Self::decode("createShare", self.send("createShare", request)?)?;

        Ok(created
            .records
            .into_iter()
            .next()
            .map(ShareId::from)
            .unwrap_or_else(|| ShareId {
                name: name.to_string(),
                svm_uuid: None,
            }))
    }

    fn find_share(&self, name: &str) -> Result<ShareId> {
        let url = self.url(&["api", "protocols", "cifs", "shares"])?;
        let request = self
            .http
            .get(url)
            .query(&[("name", name), ("fields", "name,svm.uuid")]);
        let found: Records<ShareRecord> = Self::decode("findShare", self.send("findShare", request)?)?;

        found
            .records
            .into_iter()
            .find(|s| s.name == name)
            .map(ShareId::from)
            .ok_or_else(|| HvrError::NotFound(format!("share '{}'", name)))
    }

    fn delete_share(&self, share: &ShareId) -> Result<()> {
        let url = match &share.svm_uuid {
            Some(svm) => self.url(&["api", "protocols", "cifs", "shares", svm.as_str(), share.name.as_str()])?,
            None => self.url(&["api", "protocols", "cifs", "shares", share.name.as_str()])?,
        };
        self.delete("deleteShare", url, &share.to_string())
    }

    fn delete_clone(&self, clone: &CloneId) -> Result<()> {
        let url = self.url(&["api", "storage", "volumes", clone.uuid.as_str()])?;
        self.delete("deleteClone", url, &clone.name)
    }
}

//! Upload resolution for pending firmware files

use async_trait::async_trait;
use tracing::{debug, info};

use crate::draft::{normalize_car_types, CarTypeDraft, HexSource, LocalHexFile};
use crate::error::{DraftError, DraftResult, SubmitError};
use crate::models::CarType;

/// Everything the storage backend needs to file one firmware image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub ecu_name: String,
    pub ecu_model: String,
    pub version_number: String,
    pub compatible_car_types: Vec<String>,
    pub file: LocalHexFile,
}

impl UploadRequest {
    /// Upload of a single firmware file outside of any draft
    ///
    /// The source car type, when given, is always compatible. Compatible
    /// names are lowercased and de-duplicated; an empty set is rejected.
    pub fn standalone<S: AsRef<str>>(
        ecu_name: &str,
        ecu_model: &str,
        version_number: &str,
        file: LocalHexFile,
        source_car_type: Option<&str>,
        compatible_car_types: &[S],
    ) -> DraftResult<Self> {
        let ecu_name = ecu_name.trim();
        let ecu_model = ecu_model.trim();
        let version_number = version_number.trim();
        if ecu_name.is_empty() || ecu_model.is_empty() {
            return Err(DraftError::MissingField("ECU"));
        }
        if version_number.is_empty() {
            return Err(DraftError::MissingField("Version number"));
        }

        let mut compatible = normalize_car_types(compatible_car_types);
        if let Some(source) = source_car_type.map(|s| s.trim().to_lowercase()) {
            if !source.is_empty() && !compatible.contains(&source) {
                compatible.insert(0, source);
            }
        }
        if compatible.is_empty() {
            return Err(DraftError::NoCompatibleCarType);
        }

        Ok(Self {
            ecu_name: ecu_name.to_string(),
            ecu_model: ecu_model.to_string(),
            version_number: version_number.to_string(),
            compatible_car_types: compatible,
            file,
        })
    }
}

/// Stores a firmware file and returns its durable path
///
/// Implemented by the HTTP client; tests provide in-memory fakes.
#[async_trait]
pub trait FirmwareUploader: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn upload(&self, request: UploadRequest) -> Result<String, Self::Error>;
}

impl CarTypeDraft {
    /// Upload every pending firmware file and build the wire payload
    ///
    /// Uploads run one at a time in ECU then version order. The first failure
    /// aborts the submission; the draft itself is never modified, so the
    /// operator can retry once the cause is fixed.
    pub async fn to_submission_payload<U>(&self, uploader: &U) -> Result<CarType, SubmitError>
    where
        U: FirmwareUploader + ?Sized,
    {
        self.validate_for_submit()?;

        let pending = self.pending_uploads();
        if pending == 0 {
            return Ok(self.to_payload()?);
        }

        info!(car_type = %self.name(), pending, "Uploading firmware files");
        let mut resolved = self.clone();

        for (ecu_index, ecu) in self.ecus().iter().enumerate() {
            for (version_index, version) in ecu.versions.iter().enumerate() {
                let file = match &version.source {
                    HexSource::Pending { hex_file } => hex_file.clone(),
                    HexSource::Resolved { .. } => continue,
                };

                let request = UploadRequest {
                    ecu_name: ecu.name.clone(),
                    ecu_model: ecu.model_number.clone(),
                    version_number: version.version_number.clone(),
                    compatible_car_types: version.compatible_car_types.clone(),
                    file,
                };

                let path = uploader
                    .upload(request)
                    .await
                    .map_err(|e| SubmitError::Upload {
                        ecu_name: ecu.name.clone(),
                        ecu_model: ecu.model_number.clone(),
                        version_number: version.version_number.clone(),
                        source: Box::new(e),
                    })?;

                debug!(
                    ecu = %ecu.key(),
                    version = %version.version_number,
                    path = %path,
                    "Firmware uploaded"
                );
                resolved.resolve_version(ecu_index, version_index, path);
            }
        }

        Ok(resolved.to_payload()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ecu, FirmwareVersion};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Debug, thiserror::Error)]
    #[error("storage unavailable")]
    struct StorageDown;

    /// Records calls and fails on the configured call number
    #[derive(Default)]
    struct FakeUploader {
        calls: Mutex<Vec<UploadRequest>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl FirmwareUploader for FakeUploader {
        type Error = StorageDown;

        async fn upload(&self, request: UploadRequest) -> Result<String, StorageDown> {
            let mut calls = self.calls.lock();
            calls.push(request.clone());
            if self.fail_on == Some(calls.len()) {
                return Err(StorageDown);
            }
            Ok(format!(
                "https://blob/{}/{}/{}",
                request.ecu_name, request.ecu_model, request.file.file_name
            ))
        }
    }

    fn pending(name: &str) -> HexSource {
        HexSource::pending(LocalHexFile::new(format!("/tmp/{}", name), 64))
    }

    fn draft_with_mixed_sources() -> CarTypeDraft {
        let mut draft = CarTypeDraft::new("Sedan", "M1");
        draft
            .add_existing_ecu(&Ecu {
                name: "ECU-A".into(),
                model_number: "V1".into(),
                versions: vec![FirmwareVersion {
                    version_number: "0.9".into(),
                    compatible_car_types: vec!["sedan".into()],
                    hex_file_path: "https://blob/old.hex".into(),
                }],
            })
            .unwrap();
        draft
            .add_version(0, "1.0", pending("a.hex"), &["coupe"])
            .unwrap();
        draft.add_new_ecu("ECU-B", "V2").unwrap();
        draft
            .add_version(1, "2.0", pending("b.hex"), &[] as &[&str])
            .unwrap();
        draft
    }

    #[tokio::test]
    async fn test_uploads_each_pending_version_once_in_order() {
        let draft = draft_with_mixed_sources();
        let uploader = FakeUploader::default();

        let payload = draft.to_submission_payload(&uploader).await.unwrap();

        let calls = uploader.calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].ecu_name, "ECU-A");
        assert_eq!(calls[0].version_number, "1.0");
        assert_eq!(calls[0].compatible_car_types, vec!["coupe", "sedan"]);
        assert_eq!(calls[1].ecu_name, "ECU-B");
        assert_eq!(calls[1].ecu_model, "V2");

        let a = &payload.ecus[0].versions;
        assert_eq!(a[0].hex_file_path, "https://blob/old.hex");
        assert_eq!(a[1].hex_file_path, "https://blob/ECU-A/V1/a.hex");
        assert_eq!(
            payload.ecus[1].versions[0].hex_file_path,
            "https://blob/ECU-B/V2/b.hex"
        );
    }

    #[tokio::test]
    async fn test_failed_upload_aborts_and_keeps_draft() {
        let draft = draft_with_mixed_sources();
        let before = draft.clone();
        let uploader = FakeUploader {
            fail_on: Some(1),
            ..Default::default()
        };

        let err = draft.to_submission_payload(&uploader).await.unwrap_err();
        match err {
            SubmitError::Upload {
                ecu_name,
                version_number,
                ..
            } => {
                assert_eq!(ecu_name, "ECU-A");
                assert_eq!(version_number, "1.0");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(uploader.calls.lock().len(), 1);
        assert_eq!(draft, before);
        assert_eq!(draft.pending_uploads(), 2);
    }

    #[tokio::test]
    async fn test_resolved_draft_needs_no_uploads() {
        let mut draft = CarTypeDraft::new("Sedan", "M1");
        draft.add_new_ecu("ECU-A", "V1").unwrap();
        draft
            .add_version(0, "1.0", HexSource::resolved("blob"), &[] as &[&str])
            .unwrap();
        let uploader = FakeUploader::default();

        let payload = draft.to_submission_payload(&uploader).await.unwrap();

        assert!(uploader.calls.lock().is_empty());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::to_value(draft.to_payload().unwrap()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_draft_is_not_uploaded() {
        let mut draft = CarTypeDraft::new("", "M1");
        draft.add_new_ecu("ECU-A", "V1").unwrap();
        draft
            .add_version(0, "1.0", pending("a.hex"), &[] as &[&str])
            .unwrap();
        let uploader = FakeUploader::default();

        let err = draft.to_submission_payload(&uploader).await.unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(_)));
        assert!(uploader.calls.lock().is_empty());
    }

    #[test]
    fn test_standalone_upload_keeps_source_car_type() {
        let request = UploadRequest::standalone(
            "ECU-A",
            "V1",
            "1.0",
            LocalHexFile::new("/firmware/a.hex", 64),
            Some("Sedan"),
            &["Coupe", "sedan", "coupe"],
        )
        .unwrap();
        assert_eq!(request.compatible_car_types, vec!["coupe", "sedan"]);

        let request = UploadRequest::standalone(
            "ECU-A",
            "V1",
            "1.0",
            LocalHexFile::new("/firmware/a.hex", 64),
            Some("Sedan"),
            &[] as &[&str],
        )
        .unwrap();
        assert_eq!(request.compatible_car_types, vec!["sedan"]);
    }

    #[test]
    fn test_standalone_upload_needs_a_target() {
        let file = LocalHexFile::new("/firmware/a.hex", 64);
        assert_eq!(
            UploadRequest::standalone("ECU-A", "V1", "1.0", file.clone(), None, &[" "]),
            Err(DraftError::NoCompatibleCarType)
        );
        assert_eq!(
            UploadRequest::standalone("ECU-A", "V1", "1.0", file.clone(), Some(""), &[] as &[&str]),
            Err(DraftError::NoCompatibleCarType)
        );
        assert_eq!(
            UploadRequest::standalone("ECU-A", "V1", " ", file.clone(), Some("sedan"), &[] as &[&str]),
            Err(DraftError::MissingField("Version number"))
        );
        assert_eq!(
            UploadRequest::standalone("", "V1", "1.0", file, Some("sedan"), &[] as &[&str]),
            Err(DraftError::MissingField("ECU"))
        );
    }
}

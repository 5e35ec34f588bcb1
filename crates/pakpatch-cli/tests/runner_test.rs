//! Batch runs against synthetic archives on disk

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use pakpatch_cli::commands::{Context, patch::execute};
use pakpatch_cli::{CliError, ConfigError, DeviceName, FailureKind, RunConfig, RunStatus};
use pakpatch_core::{
    CompressionConfig, ErrorKind, FeedbackCipher, ReplacementKind, SignatureKeyTable, compress,
    decode,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::time::Instant;
use tempfile::TempDir;

const FFFD: &[u8] = b"\xef\xbf\xbd";

fn device_profile() -> Vec<u8> {
    let mut data = b"[DeviceProfiles]\x00".to_vec();
    for device in ["CPH2649", "SM-X910", "V2250", "PGT-AN10"] {
        data.extend_from_slice(device.as_bytes());
        data.extend_from_slice(FFFD);
        data.extend_from_slice(b"r.MaxFPS=120\n");
    }
    data
}

/// Archive with one segment holding the compressed payload at offset 40.
///
/// Returns the archive and the payload it embeds, which may carry a filler
/// suffix chosen to keep stray signatures out of the ciphertext.
fn build_archive(payload: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let cipher = FeedbackCipher::default();
    for salt in 0..64 {
        let mut salted = payload.to_vec();
        salted.extend(std::iter::repeat_n(b'~', salt));

        let mut plain: Vec<u8> = (0..32).map(|i| i as u8 + 1).collect();
        plain.extend_from_slice(b"\x78\x9CENTRY\x01");
        plain.extend_from_slice(&compress(&salted, CompressionConfig::zlib(6)).unwrap());
        plain.extend_from_slice(&[0u8; 16]);

        let mut reference = vec![0u8; plain.len()];
        reference[32..34].copy_from_slice(&[0x9D, 0xC7]);
        let encoded = cipher.encode(&reference, &plain).unwrap();

        if cipher.segments(&encoded).len() == 1 {
            assert_eq!(decode(&encoded), plain);
            return (encoded, salted);
        }
    }
    panic!("payload produced stray signatures; adjust the fixture");
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(payload: &[u8], archive: &[u8]) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pakchunk99.pak"), archive).unwrap();
        std::fs::write(dir.path().join("DeviceProfiles.bin"), payload).unwrap();
        Self { dir }
    }

    fn config(&self, devices: &[&str], jobs: usize) -> RunConfig {
        RunConfig {
            pak: self.dir.path().join("pakchunk99.pak"),
            payload: self.dir.path().join("DeviceProfiles.bin"),
            out_dir: self.dir.path().join("out"),
            devices: devices.iter().map(|d| d.parse::<DeviceName>().unwrap()).collect(),
            jobs,
        }
    }

    fn out(&self, device: &str) -> std::path::PathBuf {
        self.dir.path().join("out").join(device).join("pakchunk99.pak")
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[tokio::test]
async fn test_batch_writes_one_archive_per_device() {
    let (archive, payload) = build_archive(&device_profile());
    let ws = Workspace::new(&payload, &archive);

    let config = ws.config(&["RMX5011", "SM-S9280", "V2309A", "2201116SG"], 2);
    let reports = execute(&config, &Context::default()).await.unwrap();

    assert_eq!(reports.len(), 4);
    for (run_id, report) in reports.iter().enumerate() {
        assert_eq!(report.run_id, run_id);
        assert!(!report.status.is_failed(), "{report:?}");

        let output = ws.out(&report.device);
        assert_eq!(report.output.as_deref(), Some(output.as_path()));
        let written = std::fs::read(&output).unwrap();
        assert_eq!(written.len(), archive.len());
        assert_eq!(&written[..40], &archive[..40]);
    }

    assert_eq!(reports[0].device, "RMX5011");
    assert_eq!(reports[0].old_value.as_deref(), Some("CPH2649"));
    assert_eq!(reports[0].replacement_kind, Some(ReplacementKind::Exact));
    assert_eq!(reports[0].config, Some(CompressionConfig::zlib(6)));
    assert_eq!(reports[0].offset, Some(40));
}

#[tokio::test]
async fn test_identity_device_reproduces_archive() {
    let (archive, payload) = build_archive(&device_profile());
    let ws = Workspace::new(&payload, &archive);

    let reports = execute(&ws.config(&["CPH2649"], 1), &Context::default())
        .await
        .unwrap();

    assert_eq!(reports[0].status, RunStatus::Completed);
    assert_eq!(std::fs::read(ws.out("CPH2649")).unwrap(), archive);
}

#[tokio::test]
async fn test_missing_payload_fails_every_run() {
    let payload = device_profile();
    let (archive, _) = build_archive(b"unrelated payload CPH2649\0");
    let ws = Workspace::new(&payload, &archive);

    let reports = execute(&ws.config(&["RMX5011", "SM-X910"], 4), &Context::default())
        .await
        .unwrap();

    for report in &reports {
        assert!(matches!(
            report.status,
            RunStatus::Failed {
                kind: FailureKind::Patch(ErrorKind::SegmentNotFound),
                ..
            }
        ));
        assert!(report.output.is_none());
    }
    assert!(!ws.path().join("out").exists());
}

#[tokio::test]
async fn test_context_table_is_used() {
    let (archive, payload) = build_archive(&device_profile());
    let ws = Workspace::new(&payload, &archive);

    // A table without the builtin entries cannot decode the archive
    let ctx = Context {
        table: std::sync::Arc::new(SignatureKeyTable::new([])),
        ..Context::default()
    };
    let reports = execute(&ws.config(&["RMX5011"], 1), &ctx).await.unwrap();
    assert!(reports[0].status.is_failed());
}

#[tokio::test]
async fn test_invalid_config_rejected_before_running() {
    let (archive, payload) = build_archive(&device_profile());
    let ws = Workspace::new(&payload, &archive);

    let mut config = ws.config(&["RMX5011"], 1);
    config.pak = ws.path().join("missing.pak");

    let err = execute(&config, &Context::default()).await.unwrap_err();
    assert!(matches!(
        err,
        CliError::Config(ConfigError::MissingInput { what: "pak", .. })
    ));
    assert!(!ws.path().join("out").exists());
}

#[tokio::test]
async fn test_elapsed_excludes_queue_wait() {
    let (archive, payload) = build_archive(&device_profile());
    let ws = Workspace::new(&payload, &archive);

    // One permit: runs execute back to back, so their own times cannot
    // add up to more than the whole batch
    let config = ws.config(&["RMX5011", "SM-S9280", "V2309A", "2201116SG", "PGT-AN20"], 1);
    let started = Instant::now();
    let reports = execute(&config, &Context::default()).await.unwrap();
    let wall_ms = u64::try_from(started.elapsed().as_millis()).unwrap();

    assert_eq!(reports.len(), 5);
    let total: u64 = reports.iter().map(|r| r.elapsed_ms).sum();
    assert!(total <= wall_ms, "runs took {total} ms within a {wall_ms} ms batch");
}

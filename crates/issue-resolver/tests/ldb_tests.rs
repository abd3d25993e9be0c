//! End-to-end tests against `LdbStore` using shell scripts as stand-in binaries
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use purlsight_issue_resolver::{
    ComponentRecord, ComponentRepository, IssueResolverBuilder, IssueResolverError, LdbStore,
    PurlQuery, StoreConfigBuilder,
};

struct OneRecord(ComponentRecord);

impl ComponentRepository for OneRecord {
    async fn find_by_purl_names(
        &self,
        _purl_names: &[String],
    ) -> Result<Vec<ComponentRecord>, IssueResolverError> {
        Ok(vec![self.0.clone()])
    }

    async fn ping(&self) -> Result<(), IssueResolverError> {
        Ok(())
    }
}

fn write_bin(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

#[tokio::test]
async fn resolves_report_through_subprocess_store() {
    let bins = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();

    // Answers by table name found in the script file
    let plain = write_bin(
        bins.path(),
        "ldb",
        r#"if grep -q "oss/pivot" "$2"; then echo "aaaa,ffff,1"; fi
if grep -q "oss/semgrep" "$2"; then echo "ffff,js.xss,4,9,ERROR"; echo "broken-line"; fi"#,
    );
    let encoded = write_bin(bins.path(), "ldb-enc", r#"echo "ffff,aaaa,src/render,v2.js""#);

    let config = StoreConfigBuilder::new()
        .bin_path(plain)
        .enc_bin_path(encoded)
        .scratch_dir(scratch.path())
        .timeout_secs(10)
        .build()
        .unwrap();

    let resolver = IssueResolverBuilder::new()
        .repository(OneRecord(ComponentRecord {
            url_hash: "aaaa".to_owned(),
            component: "vue".to_owned(),
            version: "2.7.14".to_owned(),
            semver: "2.7.14".to_owned(),
            purl_name: "vue".to_owned(),
            purl_type: "npm".to_owned(),
            mine_id: 1,
        }))
        .store(LdbStore::new(config.clone()))
        .store_config(config)
        .build()
        .unwrap();

    let report = resolver
        .resolve(&[PurlQuery::new("pkg:npm/vue", "~2.7")])
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report[0].version, "2.7.14");
    assert_eq!(report[0].files.len(), 1);
    assert_eq!(report[0].files[0].file_hash, "ffff");
    assert_eq!(report[0].files[0].path, "src/render,v2.js");
    assert_eq!(report[0].files[0].issues.len(), 1, "malformed line is dropped");
    assert!(
        std::fs::read_dir(scratch.path()).unwrap().next().is_none(),
        "scratch scripts are removed"
    );
}

#[tokio::test]
async fn failing_binary_degrades_to_empty_files() {
    let bins = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let bin = write_bin(bins.path(), "ldb", "exit 1");

    let config = StoreConfigBuilder::new()
        .bin_path(bin.clone())
        .enc_bin_path(bin)
        .scratch_dir(scratch.path())
        .build()
        .unwrap();

    let resolver = IssueResolverBuilder::new()
        .repository(OneRecord(ComponentRecord {
            url_hash: "aaaa".to_owned(),
            component: "vue".to_owned(),
            version: "3.0.0".to_owned(),
            semver: String::new(),
            purl_name: "vue".to_owned(),
            purl_type: "npm".to_owned(),
            mine_id: 1,
        }))
        .store(LdbStore::new(config.clone()))
        .store_config(config)
        .build()
        .unwrap();

    let report = resolver
        .resolve(&[PurlQuery::new("pkg:npm/vue@3.0.0", "")])
        .await
        .unwrap();
    assert_eq!(report[0].version, "3.0.0");
    assert!(report[0].files.is_empty());
}

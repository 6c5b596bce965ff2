mod test_support;

use serde_json::json;
use test_support::{error_code, request, request_ok, send_line, spawn_sidecar, temp_dir};

#[test]
fn router_reports_health_and_protocol_errors() {
    let mut sidecar = spawn_sidecar();

    let health = request_ok(&mut sidecar, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert!(health.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));

    let bad = send_line(&mut sidecar, "{not json");
    assert_eq!(bad.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&bad), Some("bad_json"));

    let unknown = request(&mut sidecar, "2", "offerings.archive", json!({}));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    // Reads that have a natural empty answer succeed before a workspace is chosen.
    let listed = request_ok(&mut sidecar, "3", "offerings.list", json!({ "schoolYearId": 1 }));
    assert_eq!(listed.get("offerings"), Some(&json!([])));

    let no_ws = request(
        &mut sidecar,
        "4",
        "offerings.blocks.reorder",
        json!({ "offeringId": 1, "blockIds": [1, 2] }),
    );
    assert_eq!(error_code(&no_ws), Some("no_workspace"));

    let workspace = temp_dir("courseseld-smoke");
    let selected = request_ok(
        &mut sidecar,
        "5",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(selected.get("workspacePath").is_some());
    assert!(workspace.join("courseselection.sqlite3").is_file());

    let missing = request(&mut sidecar, "6", "offerings.open", json!({}));
    assert_eq!(error_code(&missing), Some("bad_params"));
    let not_found = request(&mut sidecar, "7", "offerings.open", json!({ "offeringId": 99 }));
    assert_eq!(error_code(&not_found), Some("not_found"));
}

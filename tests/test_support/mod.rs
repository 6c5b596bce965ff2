#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}-{}",
        prefix,
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Sidecar {
    pub child: Child,
    pub stdin: ChildStdin,
    pub reader: BufReader<ChildStdout>,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn spawn_sidecar() -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_courseseld");
    let mut child = Command::new(exe)
        .env_remove("COURSESELD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn courseseld");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
    }
}

pub fn send_line(sidecar: &mut Sidecar, line: &str) -> serde_json::Value {
    writeln!(sidecar.stdin, "{}", line).expect("write request");
    sidecar.stdin.flush().expect("flush request");

    let mut out = String::new();
    sidecar.reader.read_line(&mut out).expect("read response line");
    assert!(!out.trim().is_empty(), "empty response for {}", line);
    serde_json::from_str(out.trim()).expect("parse response json")
}

pub fn request(
    sidecar: &mut Sidecar,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    let value = send_line(sidecar, &payload.to_string());
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    sidecar: &mut Sidecar,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(sidecar, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

pub fn error_code(resp: &serde_json::Value) -> Option<&str> {
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

pub fn id_of(result: &serde_json::Value, key: &str) -> i64 {
    result
        .get(key)
        .and_then(|v| v.as_i64())
        .unwrap_or_else(|| panic!("missing {} in {}", key, result))
}

/// A workspace with one school year, a student, a staff member, and three
/// courses.
pub struct Seeded {
    pub year_id: i64,
    pub student_id: i64,
    pub staff_id: i64,
    pub course_ids: Vec<i64>,
}

pub fn open_seeded_workspace(sidecar: &mut Sidecar, prefix: &str) -> Seeded {
    let workspace = temp_dir(prefix);
    let _ = request_ok(
        sidecar,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let year = request_ok(
        sidecar,
        "year",
        "schoolYears.create",
        json!({ "name": "2026-2027", "sequenceNumber": 1 }),
    );
    let year_id = id_of(&year, "schoolYearId");
    let student = request_ok(
        sidecar,
        "student",
        "people.create",
        json!({ "surname": "Lovelace", "preferredName": "Ada" }),
    );
    let student_id = id_of(&student, "personId");
    let staff = request_ok(
        sidecar,
        "staff",
        "people.create",
        json!({ "surname": "Hopper", "preferredName": "Grace" }),
    );
    let staff_id = id_of(&staff, "personId");
    let _ = request_ok(
        sidecar,
        "enrol",
        "enrolments.create",
        json!({ "personId": student_id, "schoolYearId": year_id }),
    );
    let mut course_ids = Vec::new();
    for (i, (name, short)) in [("Mathematics", "MAT"), ("Visual Art", "ART"), ("Music", "MUS")]
        .iter()
        .enumerate()
    {
        let course = request_ok(
            sidecar,
            &format!("course{}", i),
            "courses.create",
            json!({ "schoolYearId": year_id, "name": name, "nameShort": short }),
        );
        course_ids.push(id_of(&course, "courseId"));
    }
    Seeded {
        year_id,
        student_id,
        staff_id,
        course_ids,
    }
}

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_collegeadmind");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn collegeadmind");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
        .to_string()
}

fn session_params(id: &str, department: &str, start: &str, end: &str) -> serde_json::Value {
    json!({
        "sessionId": id,
        "startDate": start,
        "endDate": end,
        "description": "Academic year",
        "department": department,
    })
}

#[test]
fn create_session_generates_one_batch_per_year() {
    let workspace = temp_dir("collegeadmind-session-create");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.create",
        session_params("2025-26", "BSc", "2025-07-01", "2026-06-30"),
    );
    assert_eq!(created["generatedBatches"], 3);
    assert_eq!(created["sessionId"], "2025-26");

    let batches = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "batches.list",
        json!({ "sessionId": "2025-26" }),
    );
    let years: Vec<u64> = batches["batches"]
        .as_array()
        .expect("batches")
        .iter()
        .map(|b| b["year"].as_u64().expect("year"))
        .collect();
    assert_eq!(years, vec![1, 2, 3]);
}

#[test]
fn invalid_date_range_persists_nothing() {
    let workspace = temp_dir("collegeadmind-session-invalid");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "session.create",
        session_params("2025-26", "BSc", "2026-06-30", "2025-07-01"),
    );
    assert_eq!(code, "validation_error");

    let listed = request_ok(&mut stdin, &mut reader, "3", "sessions.list", json!({}));
    assert_eq!(listed["sessions"].as_array().expect("sessions").len(), 0);

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "batches.list",
        json!({ "sessionId": "2025-26" }),
    );
    assert_eq!(code, "not_found");

    let code = request_err_code(&mut stdin, &mut reader, "5", "session.create", json!({}));
    assert_eq!(code, "bad_params");
}

#[test]
fn duplicate_ids_and_exclusive_activation() {
    let workspace = temp_dir("collegeadmind-session-activate");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.create",
        session_params("2024-25", "BCA", "2024-07-01", "2025-06-30"),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "session.create",
        session_params("2025-26", "BCA", "2025-07-01", "2026-06-30"),
    );
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "session.create",
        session_params("2025-26", "BCA", "2025-07-01", "2026-06-30"),
    );
    assert_eq!(code, "duplicate");

    let a = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "session.activate",
        json!({ "sessionId": "2024-25" }),
    );
    assert_eq!(a["active"], true);
    let b = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "session.activate",
        json!({ "sessionId": "2025-26" }),
    );
    assert_eq!(b["active"], true);

    let old = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "session.get",
        json!({ "sessionId": "2024-25" }),
    );
    assert_eq!(old["active"], false);

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "8",
        "session.activate",
        json!({ "sessionId": "1999-00" }),
    );
    assert_eq!(code, "not_found");

    let bca = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "sessions.list",
        json!({ "department": "bca" }),
    );
    assert_eq!(bca["sessions"].as_array().expect("sessions").len(), 2);
}

#[test]
fn sessions_survive_reopening_workspace() {
    let workspace = temp_dir("collegeadmind-session-reopen");
    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "session.create",
            session_params("2025-26", "MSc", "2025-07-01", "2026-06-30"),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let s = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.get",
        json!({ "sessionId": "2025-26" }),
    );
    assert_eq!(s["department"], "MSc");
    assert_eq!(s["endDate"], "2026-06-30");
}

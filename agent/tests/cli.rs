//! CLI tests for the `agent` binary.
//!
//! Spawns the binary and checks exit codes and output. Model traffic goes to
//! a throwaway local HTTP listener that replays canned `generateContent`
//! responses.

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::thread;

use agent::exit_codes;

/// Serve `bodies` as consecutive 200 responses; returns the base URL and a
/// handle yielding the request bodies received.
fn serve(bodies: Vec<String>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for body in bodies {
            let (mut stream, _) = listener.accept().expect("accept");
            requests.push(read_request_body(&mut stream));
            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(reply.as_bytes()).expect("write reply");
        }
        requests
    });
    (format!("http://{addr}"), handle)
}

fn read_request_body(stream: &mut TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read header");
        if line == "\r\n" || line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().expect("content length");
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).expect("read body");
    String::from_utf8(body).expect("utf8 body")
}

fn write_config(dir: &Path, base_url: &str) -> std::path::PathBuf {
    let sandbox = dir.join("sandbox");
    fs::create_dir_all(&sandbox).expect("mkdir sandbox");
    let path = dir.join("agent.toml");
    fs::write(
        &path,
        format!(
            "working_dir = {:?}\nmax_steps = 4\n\n[script]\ninterpreter = \"sh\"\nextension = \"sh\"\n\n[api]\nbase_url = {:?}\nrequest_timeout_secs = 10\n",
            sandbox.display().to_string(),
            base_url
        ),
    )
    .expect("write config");
    path
}

fn agent(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_agent"));
    cmd.current_dir(dir)
        .env_remove("AGENT_CONFIG")
        .env_remove("RUST_LOG")
        .env("GEMINI_API_KEY", "test-key");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn missing_prompt_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = agent(temp.path()).arg("--verbose").output().expect("run agent");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("You must provide a prompt"));
}

#[test]
fn missing_api_key_exits_invalid_before_any_request() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = agent(temp.path())
        .env_remove("GEMINI_API_KEY")
        .args(["--working-dir", ".", "list", "files"])
        .output()
        .expect("run agent");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("Missing GEMINI_API_KEY"));
    assert!(!stdout(&output).contains("Final response"));
}

#[test]
fn unreachable_model_exits_with_model_failure() {
    let temp = tempfile::tempdir().expect("tempdir");
    // Bind then drop to get a local port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0")
        .expect("bind")
        .local_addr()
        .expect("addr")
        .port();
    let config = write_config(temp.path(), &format!("http://127.0.0.1:{port}"));

    let output = agent(temp.path())
        .arg("--config")
        .arg(&config)
        .arg("hello")
        .output()
        .expect("run agent");

    assert_eq!(output.status.code(), Some(exit_codes::MODEL_FAILURE));
    assert!(
        stderr(&output).contains("Agent error on step 1"),
        "{}",
        stderr(&output)
    );
}

#[test]
fn tool_round_trip_prints_final_response() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (base_url, server) = serve(vec![
        r#"{"candidates":[{"content":{"role":"model","parts":[{"functionCall":{"name":"write_file","args":{"file_path":"hi.sh","content":"echo hi"}}}]}}],"usageMetadata":{"promptTokenCount":42,"candidatesTokenCount":7}}"#.to_string(),
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Created hi.sh."}]}}],"usageMetadata":{"promptTokenCount":60,"candidatesTokenCount":4}}"#.to_string(),
    ]);
    let config = write_config(temp.path(), &base_url);

    let output = agent(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["--verbose", "create", "a", "greeting", "script"])
        .output()
        .expect("run agent");

    assert_eq!(
        output.status.code(),
        Some(exit_codes::OK),
        "{}",
        stderr(&output)
    );
    let out = stdout(&output);
    assert!(out.contains("User prompt: create a greeting script"), "{out}");
    assert!(out.contains("Calling function: write_file("), "{out}");
    assert!(out.contains("Prompt tokens: 42"), "{out}");
    assert!(out.ends_with("Final response:\nCreated hi.sh.\n"), "{out}");
    assert_eq!(
        fs::read_to_string(temp.path().join("sandbox/hi.sh")).expect("read"),
        "echo hi"
    );

    let requests = server.join().expect("server");
    assert_eq!(requests.len(), 2);
    let first: serde_json::Value = serde_json::from_str(&requests[0]).expect("json");
    assert_eq!(
        first["contents"][0]["parts"][0]["text"],
        "create a greeting script"
    );
    assert_eq!(
        first["tools"][0]["functionDeclarations"]
            .as_array()
            .expect("declarations")
            .len(),
        4
    );
    let second: serde_json::Value = serde_json::from_str(&requests[1]).expect("json");
    assert_eq!(
        second["contents"][2]["parts"][0]["functionResponse"],
        serde_json::json!({
            "name": "write_file",
            "response": {"result": "Wrote 7 chars to \"hi.sh\""}
        })
    );
}

#[test]
fn non_verbose_lists_calls_briefly() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (base_url, server) = serve(vec![
        r#"{"candidates":[{"content":{"role":"model","parts":[{"functionCall":{"name":"list_directory","args":{}}}]}}]}"#.to_string(),
        r#"{"candidates":[{"content":{"role":"model","parts":[]}}]}"#.to_string(),
    ]);
    let config = write_config(temp.path(), &base_url);

    let output = agent(temp.path())
        .arg("--config")
        .arg(&config)
        .arg("look around")
        .output()
        .expect("run agent");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        stdout(&output),
        " - Calling function: list_directory\nFinal response:\nI don't know\n"
    );
    server.join().expect("server");
}

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use apex::{
    Database, Details, JobDetails, LocalStore, NewApplication, RemoteClient, RemoteConfig,
    SlotStore, SupabaseClient,
};
use serde_json::Value;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

pub fn db_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("apex.db")
}

pub fn open_store(path: &Path) -> LocalStore {
    LocalStore::new(Database::open_at(path).expect("open database"))
}

pub fn job_draft(title: &str) -> NewApplication {
    NewApplication::new(
        title,
        Details::Job(JobDetails::new("Globex", "Company Site", "https://globex.example")),
    )
}

/// Writes a raw slot value directly, bypassing the store.
pub fn write_raw_slot(path: &Path, key: &str, value: &str) {
    Database::open_at(path)
        .expect("open database")
        .set(key, value)
        .expect("write slot");
}

/// Remote double that records every batch it receives.
#[derive(Default, Clone)]
pub struct RecordingRemote {
    pub batches: Arc<Mutex<Vec<Vec<Value>>>>,
}

impl RemoteClient for RecordingRemote {
    fn upsert(&self, _table: &str, rows: &[Value], _on_conflict: &str) -> Result<Value> {
        self.batches.lock().unwrap().push(rows.to_vec());
        Ok(Value::Array(rows.to_vec()))
    }
}

/// Remote double that always refuses, like an offline network.
pub struct OfflineRemote;

impl RemoteClient for OfflineRemote {
    fn upsert(&self, _table: &str, _rows: &[Value], _on_conflict: &str) -> Result<Value> {
        Err(anyhow!("network unreachable"))
    }
}

/// A request captured by [`serve_once`].
#[derive(Debug)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Accepts a single HTTP request on a local port and answers with `status`
/// and `body`. Returns the base URL and a handle yielding the request.
pub fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((k, v)) = line.split_once(':') {
                headers.push((k.trim().to_string(), v.trim().to_string()));
            }
        }
        let length: usize = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(0);
        let mut raw_body = vec![0; length];
        reader.read_exact(&mut raw_body).unwrap();

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .unwrap();
        stream.flush().unwrap();

        CapturedRequest {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(raw_body).unwrap(),
        }
    });
    (url, handle)
}

/// Supabase client for a local test server, ignoring any proxy settings.
pub fn local_supabase(url: String, anon_key: &str) -> SupabaseClient {
    let config = RemoteConfig::from_values(Some(url), Some(anon_key.to_string())).unwrap();
    let http = reqwest::blocking::Client::builder()
        .no_proxy()
        .build()
        .expect("http client");
    SupabaseClient::with_http_client(config, http).expect("supabase client")
}

/// A local URL nothing is listening on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

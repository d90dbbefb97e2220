#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{header, redirect, Client, StatusCode};
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let fixture = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/demo.yaml");

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tenant-gate"));
        cmd.arg("--port")
            .arg(port.to_string())
            .arg("--fixture")
            .arg(fixture)
            .env("APP_ENV", "development")
            .env("SESSION_DRIVER", "memory")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Client that sends `Accept: application/json` on every request.
pub fn api_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    Ok(Client::builder().default_headers(headers).build()?)
}

/// Client that behaves like a browser and reports redirects instead of following them.
pub fn browser_client() -> Result<Client> {
    Ok(Client::builder().redirect(redirect::Policy::none()).build()?)
}

/// Logs in through `/login` and returns the session token and the login payload.
pub async fn login(server: &TestServer, email: &str) -> Result<(String, Value)> {
    let res = api_client()?
        .post(server.url("/login"))
        .json(&json!({ "email": email, "password": "secret" }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "login for {} failed: {}", email, res.status());

    let body: Value = res.json().await?;
    let token = body["data"]["token"]
        .as_str()
        .context("login response without token")?
        .to_string();
    Ok((token, body))
}

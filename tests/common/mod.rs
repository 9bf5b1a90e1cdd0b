#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;

pub const ROOT_KEY: &str = "integration-root-key";

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

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tenant-security-api"));
        cmd.env("SERVER_PORT", port.to_string())
            .env("SERVER_HOST", "127.0.0.1")
            .env("SECURITY_ROOT_KEY", ROOT_KEY)
            .env_remove("APP_ENV")
            .env_remove("SECURITY_JWT_SECRET")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Sends a request and returns the status with the parsed JSON body
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let client = reqwest::Client::new();
        let mut req = client
            .request(method, format!("{}{}", self.base_url, path))
            .header("x-root-key", ROOT_KEY);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).with_context(|| format!("non-JSON body: {}", text))?
        };
        Ok((status, value))
    }

    /// Onboards a tenant with the given modules
    pub async fn create_tenant(&self, tenant: &str, tenant_type: &str, level: &str, modules: &[&str]) -> Result<Value> {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/root/tenants",
                None,
                Some(serde_json::json!({
                    "tenant_id": tenant,
                    "tenant_type": tenant_type,
                    "security_level": level,
                    "cellular_modules": modules,
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "tenant create failed: {} {}", status, body);
        Ok(body)
    }

    /// Stores a grant and logs the user in, returning the bearer token
    pub async fn login(&self, tenant: &str, user: &str, role: &str, permissions: &[&str]) -> Result<String> {
        let (status, body) = self
            .call(
                Method::PUT,
                &format!("/api/root/tenants/{}/users/{}", tenant, user),
                None,
                Some(serde_json::json!({ "role": role, "permissions": permissions })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "grant failed: {} {}", status, body);

        let (status, body) = self
            .call(Method::POST, &format!("/auth/login/{}/{}", tenant, user), None, None)
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "login failed: {} {}", status, body);

        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    // Use stable get_or_init and convert init errors into a panic with context.
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use academy_api::ApiClient;
use academy_playback::{PlaybackOptions, PlaybackSession, fetch_playback, update_progress};
use academy_storage::{JsonFileStore, KeyValueStore};
use academy_tenant::{TenantRegistry, TenantResolution};
use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::AppConfig;

/// Live objects for one CLI invocation.
pub struct App {
    pub config: AppConfig,
    pub client: ApiClient,
}

impl App {
    /// # Errors
    /// Fails if the HTTP client or the API client cannot be built.
    pub fn new(config: AppConfig) -> Result<Self> {
        let path = config.storage_file();
        tracing::debug!(path = %path.display(), "using session storage");
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(path));
        let http = config.http_client()?;
        let client = ApiClient::from_config(&config.api, &config.tenant, http, &store)
            .context("invalid api configuration")?;
        Ok(Self { config, client })
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct ResolvedTenant<'a> {
    host: Option<&'a str>,
    #[serde(flatten)]
    resolution: &'a TenantResolution,
    name: Option<&'static str>,
    login_path: Option<&'static str>,
}

pub fn tenant_resolve(app: &App, host: Option<&str>) -> Result<()> {
    let host = host.or(app.config.api.host.as_deref());
    let resolver = app.client.interceptor().resolver();
    let resolution = resolver.resolve(host);
    let tenant = resolution
        .code()
        .and_then(|code| resolver.registry().by_code(code));
    print_json(&ResolvedTenant {
        host,
        resolution: &resolution,
        name: tenant.map(|t| t.name),
        login_path: tenant.map(|t| t.login_path),
    })
}

pub fn tenant_set(app: &App, code: &str) -> Result<()> {
    app.client.interceptor().resolver().overrides().set(code)?;
    println!("tenant override set: {}", code.trim().to_ascii_lowercase());
    Ok(())
}

pub fn tenant_clear(app: &App) {
    app.client.interceptor().resolver().overrides().clear();
    println!("tenant override cleared");
}

pub fn tenant_list() {
    for tenant in TenantRegistry::builtin().all() {
        println!(
            "{:>5}  {:<12} {:<20} {}",
            tenant.id,
            tenant.code,
            tenant.name,
            tenant.hostnames.join(", ")
        );
    }
}

fn read_password() -> Result<String> {
    eprint!("password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

pub async fn login(app: &App, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };
    app.client.login(username, &password).await?;
    println!("logged in as {username}");
    Ok(())
}

pub fn logout(app: &App) {
    app.client.logout();
    println!("logged out");
}

pub async fn me(app: &App) -> Result<()> {
    match app.client.current_user().await? {
        Some(user) => print_json(&user),
        None => {
            println!("not logged in");
            Ok(())
        }
    }
}

pub async fn get(app: &App, path: &str, query: &[String]) -> Result<()> {
    let mut request = app.client.get(path);
    for pair in query {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("query must be key=value, got '{pair}'"))?;
        request = request.query(key, value);
    }
    let response = request.send().await?;
    match response.json::<serde_json::Value>() {
        Ok(value) => print_json(&value),
        Err(_) => {
            println!("{}", response.text());
            Ok(())
        }
    }
}

pub async fn playback_info(app: &App, video_id: u64, enrollment: Option<u64>) -> Result<()> {
    let info = fetch_playback(&app.client, video_id, enrollment).await?;
    print_json(&serde_json::json!({
        "video_id": info.video.id,
        "title": info.video.title,
        "duration": info.video.duration,
        "stream_url": info.stream_url(),
        "policy": info.policy(),
    }))
}

/// Upper bound on waiting for the end notice before saving progress.
const END_NOTICE_TIMEOUT: Duration = Duration::from_secs(5);

/// Hold a monitored session open for `length` as if watching at 1x, then
/// end it and save the progress.
pub async fn playback_watch(
    app: &App,
    video_id: u64,
    enrollment: Option<u64>,
    token: String,
    length: Duration,
) -> Result<()> {
    let info = fetch_playback(&app.client, video_id, enrollment).await?;
    let session = PlaybackSession::start(
        app.client.clone(),
        PlaybackOptions {
            video_id,
            enrollment_id: enrollment,
            token,
            policy: info.policy(),
        },
        app.config.playback_timers(),
    );
    tracing::info!(video_id, ?length, monitoring = session.policy().monitoring_enabled, "watching");

    let mut ended = session.subscribe_end();
    let started = tokio::time::Instant::now();
    let changed = tokio::select! {
        () = tokio::time::sleep(length) => None,
        changed = ended.changed() => changed.ok(),
    };
    let stopped_by = changed.and_then(|()| *ended.borrow());
    session.record_position(started.elapsed().as_secs_f64());

    let duration = info.video.duration.unwrap_or(0.0);
    let report = session.finish(duration, END_NOTICE_TIMEOUT).await;
    if let Some(reason) = stopped_by {
        eprintln!("session ended by backend: {reason}");
    }
    let record = update_progress(&app.client, video_id, &report).await?;
    println!(
        "progress saved: {:.1}% at {}s{}",
        record.progress,
        report.last_position,
        if record.completed { " (completed)" } else { "" }
    );
    Ok(())
}

/// # Errors
/// Fails if the configuration cannot be rendered.
pub fn check(config: &AppConfig) -> Result<()> {
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

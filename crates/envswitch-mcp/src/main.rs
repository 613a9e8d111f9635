use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use env_flags::env_flags;
use once_cell::sync::OnceCell;
use rust_mcp_sdk::error::SdkResult;
use rust_mcp_sdk::mcp_server::{
    HyperServerOptions, ServerRuntime, hyper_server_core, server_runtime_core,
};
use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, LATEST_PROTOCOL_VERSION, ServerCapabilities,
    ServerCapabilitiesTools,
};
use rust_mcp_sdk::{McpServer, StdioTransport, TransportOptions};

use envswitch_mcp::config::{expand_home, load_user_config};
use envswitch_mcp::handler::EnvironmentServerHandler;
use envswitch_mcp::manager::EnvironmentManager;
use envswitch_mcp::watcher::spawn_config_watcher;

#[derive(Clone, Copy)]
enum LogStyle {
    Json,
    Compact,
    Pretty,
    Full,
}

fn fmt_layer<S, W>(
    writer: W,
    ansi: bool,
    style: LogStyle,
) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::Layer as _;
    let base = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    match style {
        LogStyle::Json => base.json().boxed(),
        LogStyle::Compact => base.compact().boxed(),
        LogStyle::Pretty => base.pretty().boxed(),
        LogStyle::Full => base.boxed(),
    }
}

fn resolve_home() -> PathBuf {
    if let Ok(home) = std::env::var("ENVSWITCH_HOME")
        && !home.is_empty()
    {
        return PathBuf::from(home);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".envswitch");
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".envswitch")
}

fn init_tracing(home: &std::path::Path) {
    env_flags! {
        /// Tracing filter, e.g. "info", "debug", or targets format.
        RUST_LOG: &str = "info";
        /// Preferred filter env (alias). If set, overrides RUST_LOG.
        TRACING_FILTER: &str = "";
        /// Pretty formatting for logs (ignored if TRACING_JSON=true).
        TRACING_PRETTY: bool = false;
        /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
        TRACING_COMPACT: bool = true;
        /// JSON formatting for logs
        TRACING_JSON: bool = false;
        /// If true, also log to file under <ENVSWITCH_HOME>/logs or LOG_DIR
        LOG_TO_FILE: bool = true;
        /// Optional explicit log directory (absolute). Defaults to <ENVSWITCH_HOME>/logs
        LOG_DIR: &str = "";
    }

    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, prelude::*};

    // Load user config (optional) and let it fill in tracing defaults where
    // the env is not set.
    let user_cfg = load_user_config(home).ok().flatten();
    let logging_cfg = user_cfg.as_ref().and_then(|c| c.logging.as_ref());
    let env_set = |k: &str| std::env::var_os(k).is_some();

    let mut rust_log = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut tracing_json = *TRACING_JSON;
    let mut tracing_compact = *TRACING_COMPACT;
    let mut tracing_pretty = *TRACING_PRETTY;
    let mut log_to_file = *LOG_TO_FILE;
    let mut log_dir: Option<PathBuf> = if !(*LOG_DIR).is_empty() {
        Some(PathBuf::from((*LOG_DIR).to_string()))
    } else {
        None
    };

    if let Some(cfg) = logging_cfg {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            rust_log = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            tracing_json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            tracing_compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            tracing_pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            log_to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(PathBuf::from(dir));
        }
    }

    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("info"));
    let style = if tracing_json {
        LogStyle::Json
    } else if tracing_compact {
        LogStyle::Compact
    } else if tracing_pretty {
        LogStyle::Pretty
    } else {
        LogStyle::Full
    };

    // Always write console logs to stderr to avoid contaminating stdio
    // JSON-RPC.
    static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    let reg = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(std::io::stderr, true, style));

    let file_layer = if log_to_file {
        let dir = log_dir.unwrap_or_else(|| home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "envswitch-mcp.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                Some(fmt_layer(nb, false, style))
            }
            Err(e) => {
                eprintln!("failed to create log dir {}: {}", dir.display(), e);
                None
            }
        }
    } else {
        None
    };

    if let Err(e) = reg.with(file_layer).try_init() {
        tracing::debug!("tracing already set: {:?}", e);
    }
}

#[tokio::main]
async fn main() -> SdkResult<()> {
    let home = resolve_home();
    init_tracing(&home);

    env_flags! {
        /// Transport: "stdio" (default) or "http"
        TRANSPORT: &str = "stdio";
        /// Host for HTTP transport
        HOST: &str = "127.0.0.1";
        /// Port for HTTP transport
        PORT: u16 = 8081;
        /// Ping interval for HTTP SSE
        PING_SECS: u64 = 5;
        /// Enable JSON response mode for HTTP
        HTTP_JSON: bool = false;
        /// Path to the structured multi-environment YAML file
        ENVIRONMENTS_FILE: &str = "environments.yaml";
        /// Path to the legacy flat .env file
        ENV_FILE: &str = ".env";
        /// Watch the configuration files and hot-reload on change
        WATCH_CONFIG: bool = true;
        /// Poll interval for the configuration watcher
        WATCH_INTERVAL_MS: u64 = 2000;
    }

    tracing::info!("starting envswitch-mcp (transport={})", *TRANSPORT);
    tracing::info!("envswitch_home={}", home.display());

    // Env wins over user config, user config over built-in defaults.
    let user_cfg = load_user_config(&home).ok().flatten();
    let env_cfg = user_cfg.as_ref().and_then(|c| c.environments.as_ref());
    let env_set = |k: &str| std::env::var_os(k).is_some();

    let yaml_path = if env_set("ENVIRONMENTS_FILE") {
        expand_home(*ENVIRONMENTS_FILE)
    } else {
        env_cfg
            .and_then(|c| c.yaml_file.as_deref())
            .map(expand_home)
            .unwrap_or_else(|| expand_home(*ENVIRONMENTS_FILE))
    };
    let env_path = if env_set("ENV_FILE") {
        expand_home(*ENV_FILE)
    } else {
        env_cfg
            .and_then(|c| c.env_file.as_deref())
            .map(expand_home)
            .unwrap_or_else(|| expand_home(*ENV_FILE))
    };
    let watch = if env_set("WATCH_CONFIG") {
        *WATCH_CONFIG
    } else {
        env_cfg.and_then(|c| c.watch).unwrap_or(*WATCH_CONFIG)
    };
    let watch_interval_ms = if env_set("WATCH_INTERVAL_MS") {
        *WATCH_INTERVAL_MS
    } else {
        env_cfg
            .and_then(|c| c.watch_interval_ms)
            .unwrap_or(*WATCH_INTERVAL_MS)
    };

    tracing::info!(
        "configuration sources: {} (structured), {} (legacy)",
        yaml_path.display(),
        env_path.display()
    );

    let manager = Arc::new(EnvironmentManager::new(yaml_path, env_path));
    // Startup must not proceed without a valid configuration.
    if let Err(e) = manager.load() {
        tracing::error!("failed to load configuration: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = manager.activate_default() {
        tracing::error!("failed to activate default environment: {}", e);
        std::process::exit(1);
    }
    if let Some(name) = manager.active_name() {
        tracing::info!("active environment: {}", name);
    }

    let _watcher = if watch {
        Some(spawn_config_watcher(
            manager.clone(),
            Duration::from_millis(watch_interval_ms),
        ))
    } else {
        None
    };

    let server_details = InitializeResult {
        server_info: Implementation {
            name: "envswitch-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("Environment Switch MCP Server".to_string()),
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools { list_changed: None }),
            ..Default::default()
        },
        meta: None,
        instructions: Some(
            "Use switch_environment { name } to change the active warehouse environment; \
             current_environment and list_environments describe the configuration."
                .to_string(),
        ),
        protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
    };

    let handler = EnvironmentServerHandler::new(manager);

    if *TRANSPORT == "stdio" {
        let transport = StdioTransport::new(TransportOptions::default())?;
        let server: ServerRuntime =
            server_runtime_core::create_server(server_details, transport, handler);
        tracing::info!("starting stdio server");
        if let Err(e) = server.start().await {
            let msg = match e.rpc_error_message() {
                Some(m) => m.to_string(),
                None => e.to_string(),
            };
            tracing::error!("server runtime error: {}", msg);
        }
    } else {
        let host = (*HOST).to_string();
        let port = *PORT;
        let ping = Duration::from_secs(*PING_SECS);
        let server = hyper_server_core::create_server(
            server_details,
            handler,
            HyperServerOptions {
                host: host.clone(),
                port,
                ping_interval: ping,
                enable_json_response: Some(*HTTP_JSON),
                ..Default::default()
            },
        );
        tracing::info!(
            "http server configured; starting listener on {}:{} (json={}, ping_secs={})",
            host,
            port,
            *HTTP_JSON,
            *PING_SECS
        );
        if let Err(e) = server.start().await {
            let msg = match e.rpc_error_message() {
                Some(m) => m.to_string(),
                None => e.to_string(),
            };
            tracing::error!("hyper server error: {}", msg);
        }
    }
    tracing::info!("server stopped");
    Ok(())
}

//! Daemon server: Unix socket server that handles CLI requests.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::events::ChangeKind;
use crate::graphql::{build_api, CqlApi};
use crate::watcher::{start_watching, WatcherHandle};

use super::protocol::{Request, Response};

/// Default socket path (in project's .cql directory)
pub fn socket_path(root: &Path) -> PathBuf {
    root.join(".cql").join("cql.sock")
}

/// PID file path
pub fn pid_path(root: &Path) -> PathBuf {
    root.join(".cql").join("daemon.pid")
}

/// Build the API, start watching, and serve until shutdown.
pub async fn start_daemon(root: &Path, config: Config) -> Result<()> {
    let root = root.canonicalize()?;
    let sock_path = socket_path(&root);
    let pid_file = pid_path(&root);

    if let Some(dir) = sock_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    // Remove stale socket if exists
    if sock_path.exists() {
        std::fs::remove_file(&sock_path)?;
    }

    info!(data_dir = %config.data_dir.display(), "building api");
    let api = build_api(&config).context("failed to build graphql api")?;

    let _watcher: Option<WatcherHandle> = if config.watch {
        match start_watching(Arc::clone(&api.loader), config.debounce_ms) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "file watcher failed to start");
                None
            }
        }
    } else {
        info!("file watching disabled");
        None
    };

    let listener = UnixListener::bind(&sock_path)?;
    std::fs::write(&pid_file, std::process::id().to_string())?;
    info!(socket = %sock_path.display(), "daemon listening");

    serve(listener, api).await;

    // Cleanup
    info!("daemon shutting down");
    let _ = std::fs::remove_file(&sock_path);
    let _ = std::fs::remove_file(&pid_file);

    Ok(())
}

/// Accept connections until a shutdown request or Ctrl-C.
pub async fn serve(listener: UnixListener, api: CqlApi) {
    let shutdown = Arc::new(Notify::new());

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = tokio::signal::ctrl_c() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let api = api.clone();
                    let shutdown = Arc::clone(&shutdown);
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, &api, &shutdown).await {
                            debug!(error = %e, "client handler error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            },
        }
    }
}

/// Handle a single client connection.
async fn handle_client(
    stream: tokio::net::UnixStream,
    api: &CqlApi,
    shutdown: &Notify,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = tokio::io::BufReader::new(reader).lines();

    let Some(line) = lines.next_line().await? else {
        return Ok(());
    };
    let request: Request = serde_json::from_str(&line)?;
    debug!(?request, "received request");

    if let Request::Subscribe { query } = request {
        let mut responses = Box::pin(api.schema.execute_stream(query));
        loop {
            tokio::select! {
                next = responses.next() => match next {
                    Some(response) => write_response(&mut writer, &Response::event(&response)).await?,
                    None => break,
                },
                // Any input or EOF from the client ends the subscription.
                _ = lines.next_line() => break,
            }
        }
        debug!("subscription closed");
        return Ok(());
    }

    let response = process_request(request, api, shutdown).await;
    write_response(&mut writer, &response).await
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<()> {
    let mut json = serde_json::to_string(response)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Process a request and return a response.
async fn process_request(request: Request, api: &CqlApi, shutdown: &Notify) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Shutdown => {
            shutdown.notify_one();
            Response::Goodbye
        }

        Request::Query { query, variables } => {
            let mut gql = async_graphql::Request::new(query);
            if let Some(vars) = variables {
                gql = gql.variables(async_graphql::Variables::from_json(vars));
            }
            Response::ok(api.schema.execute(gql).await)
        }

        Request::Subscribe { .. } => Response::error("subscriptions need their own connection"),

        Request::Reload { collection } => {
            let loader = Arc::clone(&api.loader);
            match tokio::task::spawn_blocking(move || loader.reload(&collection)).await {
                Ok(Ok(summary)) => Response::ok(summary),
                Ok(Err(e)) => Response::error(e.to_string()),
                Err(e) => Response::error(format!("reload task failed: {}", e)),
            }
        }

        Request::Sdl => Response::ok(api.sdl()),

        Request::Stats => {
            let publisher = api.publisher();
            let collections: Vec<_> = api
                .loader
                .collections()
                .map(|c| {
                    let subscribers: usize = ChangeKind::ALL
                        .iter()
                        .map(|kind| publisher.subscriber_count(c.singular(), *kind))
                        .sum();
                    serde_json::json!({
                        "name": c.name(),
                        "type": c.singular(),
                        "file": c.path().display().to_string(),
                        "records": c.snapshot().len(),
                        "subscribers": subscribers
                    })
                })
                .collect();
            Response::ok(serde_json::json!({
                "types": api.registry.len(),
                "collections": collections
            }))
        }
    }
}

/// Check if daemon is running by checking PID file and process.
pub fn is_daemon_running(root: &Path) -> bool {
    let pid_file = pid_path(root);

    if !pid_file.exists() {
        return false;
    }

    // Read PID and check if process is alive
    if let Ok(pid_str) = std::fs::read_to_string(&pid_file) {
        if let Ok(pid) = pid_str.trim().parse::<i32>() {
            // Check if process exists (signal 0 = check existence)
            unsafe {
                return libc::kill(pid, 0) == 0;
            }
        }
    }

    false
}

/// Send a request to the daemon and get a response.
pub fn send_request(root: &Path, request: Request) -> Result<Response> {
    send_request_to(&socket_path(root), request)
}

pub fn send_request_to(sock_path: &Path, request: Request) -> Result<Response> {
    let mut stream = UnixStream::connect(sock_path)?;

    let request_json = serde_json::to_string(&request)?;
    writeln!(stream, "{}", request_json)?;

    let mut reader = BufReader::new(stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;

    let response: Response = serde_json::from_str(&response_line)?;
    Ok(response)
}

/// Start a subscription and hand each event to `on_event` until it returns
/// `false` or the daemon closes the stream.
pub fn subscribe<F>(root: &Path, query: &str, mut on_event: F) -> Result<()>
where
    F: FnMut(serde_json::Value) -> bool,
{
    let mut stream = UnixStream::connect(socket_path(root))?;
    let request_json = serde_json::to_string(&Request::Subscribe {
        query: query.to_string(),
    })?;
    writeln!(stream, "{}", request_json)?;

    let reader = BufReader::new(stream);
    for line in reader.lines() {
        match serde_json::from_str::<Response>(&line?)? {
            Response::Event { data } => {
                if !on_event(data) {
                    break;
                }
            }
            Response::Error { message } => anyhow::bail!(message),
            other => debug!(?other, "unexpected response during subscription"),
        }
    }
    Ok(())
}

//! Stand-ins for the OpenLaszlo toolchain
//!
//! `install_lzc` writes a shell script that behaves like `lzc` for the
//! sources below, and `FakeServer` answers compile requests the way the
//! OpenLaszlo server does.
//!
//! Sources recognized by both fakes:
//! - `<broken`: fails with `<file>:3:5: element broken is not closed`
//! - `<warn`: succeeds with one `<file>:2:1: unknown attribute "bogus"` warning
//! - anything else: succeeds without warnings

#![allow(dead_code)]

use axum::extract::{Path as UrlPath, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

pub const VALID_SOURCE: &str = "<canvas>\n  <text>Hello</text>\n</canvas>\n";
pub const WARNING_SOURCE: &str = "<canvas>\n  <warn bogus=\"1\"/>\n</canvas>\n";
pub const BROKEN_SOURCE: &str = "<canvas>\n  <view>\n    <broken\n</canvas>\n";

const FAKE_LZC: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/last-args"
printf '%s' "$LPS_HOME" > "$(dirname "$0")/last-lps-home"
dir=""
src=""
runtime=swf8
while [ $# -gt 0 ]; do
  case "$1" in
    --runtime=*) runtime="${1#--runtime=}" ;;
    --debug|--profile) ;;
    --dir) shift; dir="$1" ;;
    *) src="$1" ;;
  esac
  shift
done
echo "Compiling: $src" 1>&2
if grep -q "<broken" "$src"; then
  echo "Compilation errors occurred:"
  echo "$src:3:5: element broken is not closed"
  exit 0
fi
if grep -q "<warn" "$src"; then
  echo "$src:2:1: unknown attribute \"bogus\"" 1>&2
fi
[ -z "$dir" ] && dir="$(dirname "$src")"
stem="$(basename "$src" .lzx)"
printf 'FWS' > "$dir/$stem.lzr=$runtime.swf"
cat "$src" >> "$dir/$stem.lzr=$runtime.swf"
"#;

/// Install a fake `lzc` under `home/bin` and return its path
#[cfg(unix)]
pub fn install_lzc(home: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = home.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let lzc = bin.join("lzc");
    std::fs::write(&lzc, FAKE_LZC).unwrap();
    std::fs::set_permissions(&lzc, std::fs::Permissions::from_mode(0o755)).unwrap();
    lzc
}

/// Arguments the fake `lzc` under `home` was last run with
pub fn last_lzc_args(home: &Path) -> String {
    std::fs::read_to_string(home.join("bin").join("last-args"))
        .unwrap()
        .trim()
        .to_string()
}

/// `LPS_HOME` as the fake `lzc` under `home` last saw it
pub fn last_lzc_lps_home(home: &Path) -> String {
    std::fs::read_to_string(home.join("bin").join("last-lps-home")).unwrap()
}

pub fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

struct ServerState {
    home: PathBuf,
    queries: Mutex<Vec<String>>,
    touch_after_compile: bool,
}

/// A compile server serving sources under `home` at `/lps-dev`
pub struct FakeServer {
    pub base_url: String,
    state: Arc<ServerState>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl FakeServer {
    pub fn start(home: &Path) -> Self {
        Self::spawn(home, false)
    }

    /// A server that modifies each source right after compiling it
    pub fn start_touching(home: &Path) -> Self {
        Self::spawn(home, true)
    }

    fn spawn(home: &Path, touch_after_compile: bool) -> Self {
        let state = Arc::new(ServerState {
            home: home.to_path_buf(),
            queries: Mutex::new(Vec::new()),
            touch_after_compile,
        });

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, signal) = tokio::sync::oneshot::channel::<()>();

        let app = Router::new()
            .route("/lps-dev/*path", get(compile_request))
            .with_state(Arc::clone(&state));

        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = signal.await;
                    })
                    .await
                    .unwrap();
            });
        });

        Self {
            base_url: format!("http://{}/lps-dev", addr),
            state,
            shutdown: Some(shutdown),
            thread: Some(thread),
        }
    }

    /// Raw query strings of every request received so far
    pub fn queries(&self) -> Vec<String> {
        self.state.queries.lock().clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        // idle keep-alive connections may hold the server open; don't wait
        self.thread.take();
    }
}

async fn compile_request(
    State(state): State<Arc<ServerState>>,
    UrlPath(path): UrlPath<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let query = query.unwrap_or_default();
    state.queries.lock().push(query.clone());

    let file = state.home.join(&path);
    let Ok(source) = std::fs::read_to_string(&file) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    let format = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("lzt="))
        .unwrap_or("swf");

    if format == "canvas-xml" {
        return metadata(&path, &source).into_response();
    }

    if state.touch_after_compile {
        let later = SystemTime::now() + Duration::from_secs(60);
        std::fs::File::options()
            .write(true)
            .open(&file)
            .and_then(|f| f.set_modified(later))
            .unwrap();
    }

    let mut body = b"FWS".to_vec();
    body.extend_from_slice(source.as_bytes());
    body.into_response()
}

fn metadata(path: &str, source: &str) -> String {
    if source.contains("<broken") {
        format!(
            "<html><body><h1>Compilation error</h1>\
             <pre>Error: {}:3:5: element broken is not closed\n</pre></body></html>",
            path
        )
    } else if source.contains("<warn") {
        format!(
            "<canvas>\n<warnings>\n  <error>\n    {}:2:1: unknown attribute \"bogus\"\n  </error>\n</warnings>\n</canvas>",
            path
        )
    } else {
        "<canvas>\n<warnings>\n</warnings>\n</canvas>".to_string()
    }
}

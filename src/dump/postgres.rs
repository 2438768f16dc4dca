use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::warn;

use super::{ConnectionParams, DumpDriver, DumpError, DumpOutcome};

const STDERR_TAIL_BYTES: usize = 4096;

/// Invokes the `pg_dump`/`pg_restore` CLI tools directly (argv, never a
/// shell string), passing the password via the `PGPASSWORD` environment
/// variable and piping the dump through a separate `gzip`/`gunzip` process.
pub struct PostgresDumpDriver;

impl PostgresDumpDriver {
    pub fn new() -> Self {
        Self
    }

    fn versioned_binary(tool: &str, version_label: &str) -> String {
        format!("{tool}-{version_label}")
    }

    /// Resolve which binary name to actually invoke, falling back to the
    /// unversioned tool with a warning if the versioned one isn't on PATH.
    /// The bool flags whether the fallback fired, so the caller can record
    /// it to the Activity Log.
    async fn resolve_tool(tool: &str, version_label: &str) -> (String, bool) {
        let versioned = Self::versioned_binary(tool, version_label);
        match Command::new(&versioned).arg("--version").stdout(Stdio::null()).stderr(Stdio::null()).status().await {
            Ok(status) if status.success() => (versioned, false),
            _ => {
                warn!("{versioned} not found on PATH, falling back to plain {tool}");
                (tool.to_string(), true)
            }
        }
    }

    fn spawn(tool_missing: &str, result: std::io::Result<tokio::process::Child>) -> Result<tokio::process::Child, DumpError> {
        result.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DumpError::ToolMissing(tool_missing.to_string()),
            _ => DumpError::Io(e),
        })
    }
}

impl Default for PostgresDumpDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DumpDriver for PostgresDumpDriver {
    async fn dump(&self, conn: &ConnectionParams, version_label: &str, output_path: &Path) -> Result<DumpOutcome, DumpError> {
        let (binary, used_fallback_binary) = Self::resolve_tool("pg_dump", version_label).await;

        let mut dump_child = Self::spawn(
            &binary,
            Command::new(&binary)
                .args([
                    "-h",
                    &conn.host,
                    "-p",
                    &conn.port.to_string(),
                    "-U",
                    &conn.username,
                    "-d",
                    &conn.database_name,
                    "-Fc",
                ])
                .env("PGPASSWORD", &conn.password)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn(),
        )?;

        let mut gzip_child = Self::spawn(
            "gzip",
            Command::new("gzip")
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn(),
        )?;

        let mut dump_stdout = dump_child.stdout.take().expect("dump stdout was piped");
        let mut dump_stderr = dump_child.stderr.take().expect("dump stderr was piped");
        let gzip_stdin = gzip_child.stdin.take().expect("gzip stdin was piped");
        let mut gzip_stdout = gzip_child.stdout.take().expect("gzip stdout was piped");

        let mut output_file = File::create(output_path).await?;

        let pipe_to_gzip = async move {
            let mut gzip_stdin = gzip_stdin;
            tokio::io::copy(&mut dump_stdout, &mut gzip_stdin).await?;
            gzip_stdin.shutdown().await?;
            Ok::<(), std::io::Error>(())
        };
        let write_output = tokio::io::copy(&mut gzip_stdout, &mut output_file);
        let read_stderr = async {
            let mut buf = Vec::new();
            dump_stderr.read_to_end(&mut buf).await?;
            Ok::<Vec<u8>, std::io::Error>(buf)
        };

        let (pipe_result, write_result, stderr_result, dump_status, gzip_status) =
            tokio::join!(pipe_to_gzip, write_output, read_stderr, dump_child.wait(), gzip_child.wait());

        pipe_result?;
        write_result?;
        let stderr_bytes = stderr_result?;
        let dump_status = dump_status?;
        let gzip_status = gzip_status?;

        let stderr_tail = tail(&stderr_bytes);

        if !dump_status.success() {
            return Err(classify_exit(dump_status.code().unwrap_or(-1), &stderr_tail));
        }
        if !gzip_status.success() {
            return Err(DumpError::ExitNonZero { code: gzip_status.code().unwrap_or(-1), stderr_tail: "gzip failed".to_string() });
        }

        let size_bytes = tokio::fs::metadata(output_path).await?.len() as i64;
        Ok(DumpOutcome { size_bytes, used_fallback_binary })
    }

    async fn restore(&self, conn: &ConnectionParams, input_path: &Path) -> Result<(), DumpError> {
        let mut input_file = File::open(input_path).await?;

        let mut gunzip_child = Self::spawn(
            "gunzip",
            Command::new("gunzip")
                .arg("-c")
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn(),
        )?;

        let mut restore_child = Self::spawn(
            "pg_restore",
            Command::new("pg_restore")
                .args([
                    "-h",
                    &conn.host,
                    "-p",
                    &conn.port.to_string(),
                    "-U",
                    &conn.username,
                    "-d",
                    &conn.database_name,
                    "--clean",
                    "--if-exists",
                ])
                .env("PGPASSWORD", &conn.password)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn(),
        )?;

        let gunzip_stdin = gunzip_child.stdin.take().expect("gunzip stdin was piped");
        let mut gunzip_stdout = gunzip_child.stdout.take().expect("gunzip stdout was piped");
        let restore_stdin = restore_child.stdin.take().expect("restore stdin was piped");
        let mut restore_stderr = restore_child.stderr.take().expect("restore stderr was piped");

        let feed_input = async move {
            let mut gunzip_stdin = gunzip_stdin;
            tokio::io::copy(&mut input_file, &mut gunzip_stdin).await?;
            gunzip_stdin.shutdown().await?;
            Ok::<(), std::io::Error>(())
        };
        let pipe_to_restore = async move {
            let mut restore_stdin = restore_stdin;
            tokio::io::copy(&mut gunzip_stdout, &mut restore_stdin).await?;
            restore_stdin.shutdown().await?;
            Ok::<(), std::io::Error>(())
        };
        let read_stderr = async {
            let mut buf = Vec::new();
            restore_stderr.read_to_end(&mut buf).await?;
            Ok::<Vec<u8>, std::io::Error>(buf)
        };

        let (feed_result, pipe_result, stderr_result, gunzip_status, restore_status) =
            tokio::join!(feed_input, pipe_to_restore, read_stderr, gunzip_child.wait(), restore_child.wait());

        feed_result?;
        pipe_result?;
        let stderr_bytes = stderr_result?;
        let gunzip_status = gunzip_status?;
        let restore_status = restore_status?;

        let stderr_tail = tail(&stderr_bytes);

        if !restore_status.success() {
            return Err(classify_exit(restore_status.code().unwrap_or(-1), &stderr_tail));
        }
        if !gunzip_status.success() {
            return Err(DumpError::ExitNonZero { code: gunzip_status.code().unwrap_or(-1), stderr_tail: "gunzip failed".to_string() });
        }

        Ok(())
    }
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start..]).to_string()
}

fn classify_exit(code: i32, stderr_tail: &str) -> DumpError {
    let lower = stderr_tail.to_lowercase();
    if lower.contains("connection refused") {
        DumpError::ConnectionRefused(stderr_tail.to_string())
    } else if lower.contains("password authentication failed") || lower.contains("authentication failed") {
        DumpError::AuthenticationFailed(stderr_tail.to_string())
    } else if lower.contains("server version mismatch") || lower.contains("aborting because of server version mismatch") {
        DumpError::VersionMismatch(stderr_tail.to_string())
    } else {
        DumpError::ExitNonZero { code, stderr_tail: stderr_tail.to_string() }
    }
}

//! The `automation` namespace
//!
//! Concrete desktop/system automation callables: application launchers,
//! system telemetry via sysinfo, shell command execution, and filesystem
//! helpers. Argument values arrive as raw strings; each function parses
//! what it needs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use sysinfo::{Disks, System};
use tokio::process::Command;

use super::{AutomationFn, FunctionProvider, ParameterSpec};

const NAMESPACE: &str = "automation";

pub struct AutomationProvider;

impl FunctionProvider for AutomationProvider {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn functions(&self) -> Vec<Arc<dyn AutomationFn>> {
        vec![
            Arc::new(OpenChrome),
            Arc::new(OpenCalculator),
            Arc::new(OpenNotepad),
            Arc::new(GetCpuUsage),
            Arc::new(GetMemoryUsage),
            Arc::new(GetDiskUsage),
            Arc::new(ListRunningProcesses),
            Arc::new(RunCommand),
            Arc::new(CreateDirectory),
            Arc::new(ListDirectoryContents),
        ]
    }
}

fn str_arg(args: &HashMap<String, Value>, name: &str) -> Option<String> {
    args.get(name).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn str_arg_or(args: &HashMap<String, Value>, name: &str, default: &str) -> String {
    str_arg(args, name).unwrap_or_else(|| default.to_string())
}

fn usize_arg_or(args: &HashMap<String, Value>, name: &str, default: usize) -> Result<usize> {
    match str_arg(args, name) {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("parameter '{}' is not a number: '{}'", name, raw)),
        None => Ok(default),
    }
}

/// Spawn a fire-and-forget desktop process; failure to spawn is the fault.
fn launch(program: &str, args: &[&str]) -> Result<()> {
    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to launch '{}'", program))?;
    Ok(())
}

fn gigabytes(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}

// ── Application control ──────────────────────────────────────────────────────

struct OpenChrome;

#[async_trait]
impl AutomationFn for OpenChrome {
    fn name(&self) -> &str {
        "open_chrome"
    }

    fn docstring(&self) -> &str {
        "Open Google Chrome with an optional URL."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::optional(
            "url",
            json!("https://www.google.com"),
        )]
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let url = str_arg_or(args, "url", "https://www.google.com");
        #[cfg(target_os = "macos")]
        launch("open", &["-a", "Google Chrome", &url])?;
        #[cfg(target_os = "windows")]
        launch("cmd", &["/C", "start", "chrome", &url])?;
        #[cfg(all(not(target_os = "macos"), not(target_os = "windows")))]
        launch("xdg-open", &[&url])?;
        Ok(json!(format!("Chrome opened with URL: {}", url)))
    }
}

struct OpenCalculator;

#[async_trait]
impl AutomationFn for OpenCalculator {
    fn name(&self) -> &str {
        "open_calculator"
    }

    fn docstring(&self) -> &str {
        "Open the calculator application."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    async fn invoke(&self, _args: &HashMap<String, Value>) -> Result<Value> {
        #[cfg(target_os = "macos")]
        launch("open", &["-a", "Calculator"])?;
        #[cfg(target_os = "windows")]
        launch("cmd", &["/C", "calc"])?;
        #[cfg(all(not(target_os = "macos"), not(target_os = "windows")))]
        launch("gnome-calculator", &[])?;
        Ok(json!("Calculator opened"))
    }
}

struct OpenNotepad;

#[async_trait]
impl AutomationFn for OpenNotepad {
    fn name(&self) -> &str {
        "open_notepad"
    }

    fn docstring(&self) -> &str {
        "Open Notepad with an optional filename."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::optional("filename", Value::Null)]
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let filename = str_arg(args, "filename");
        let file_args: Vec<&str> = filename.iter().map(String::as_str).collect();

        #[cfg(target_os = "macos")]
        {
            let mut argv = vec!["-a", "TextEdit"];
            argv.extend(file_args.iter().copied());
            launch("open", &argv)?;
        }
        #[cfg(target_os = "windows")]
        {
            let mut argv = vec!["/C", "notepad"];
            argv.extend(file_args.iter().copied());
            launch("cmd", &argv)?;
        }
        #[cfg(all(not(target_os = "macos"), not(target_os = "windows")))]
        launch("gedit", &file_args)?;

        Ok(json!(match filename {
            Some(f) => format!("Notepad opened with file: {}", f),
            None => "Notepad opened".to_string(),
        }))
    }
}

// ── System monitoring ────────────────────────────────────────────────────────

struct GetCpuUsage;

#[async_trait]
impl AutomationFn for GetCpuUsage {
    fn name(&self) -> &str {
        "get_cpu_usage"
    }

    fn docstring(&self) -> &str {
        "Get the current CPU usage percentage."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    async fn invoke(&self, _args: &HashMap<String, Value>) -> Result<Value> {
        // Two refreshes separated by the minimum interval, otherwise sysinfo
        // reports 0% on the first sample.
        let usage = tokio::task::spawn_blocking(|| {
            let mut sys = System::new();
            sys.refresh_cpu_usage();
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            sys.refresh_cpu_usage();
            sys.global_cpu_usage()
        })
        .await?;
        Ok(json!(format!("Current CPU usage: {:.1}%", usage)))
    }
}

struct GetMemoryUsage;

#[async_trait]
impl AutomationFn for GetMemoryUsage {
    fn name(&self) -> &str {
        "get_memory_usage"
    }

    fn docstring(&self) -> &str {
        "Get the current RAM usage information."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    async fn invoke(&self, _args: &HashMap<String, Value>) -> Result<Value> {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        let used = sys.used_memory();
        let percent = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Ok(json!({
            "total": gigabytes(total),
            "available": gigabytes(sys.available_memory()),
            "used": gigabytes(used),
            "percent": format!("{:.1}%", percent),
        }))
    }
}

struct GetDiskUsage;

#[async_trait]
impl AutomationFn for GetDiskUsage {
    fn name(&self) -> &str {
        "get_disk_usage"
    }

    fn docstring(&self) -> &str {
        "Get disk usage for a specified path."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::optional("path", json!("/"))]
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let path = str_arg_or(args, "path", "/");
        let disks = Disks::new_with_refreshed_list();
        // Deepest mount point containing the path wins.
        let disk = disks
            .iter()
            .filter(|d| path.starts_with(&*d.mount_point().to_string_lossy()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .with_context(|| format!("no disk found for path '{}'", path))?;

        let total = disk.total_space();
        let free = disk.available_space();
        let used = total.saturating_sub(free);
        let percent = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Ok(json!({
            "total": gigabytes(total),
            "used": gigabytes(used),
            "free": gigabytes(free),
            "percent": format!("{:.1}%", percent),
        }))
    }
}

struct ListRunningProcesses;

#[async_trait]
impl AutomationFn for ListRunningProcesses {
    fn name(&self) -> &str {
        "list_running_processes"
    }

    fn docstring(&self) -> &str {
        "List the top running processes by memory usage."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::optional("limit", json!(10))]
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let limit = usize_arg_or(args, "limit", 10)?;
        let processes = tokio::task::spawn_blocking(move || {
            let mut sys = System::new_all();
            sys.refresh_all();
            let total_memory = sys.total_memory().max(1);

            let mut entries: Vec<_> = sys.processes().values().collect();
            entries.sort_by(|a, b| b.memory().cmp(&a.memory()));

            entries
                .iter()
                .take(limit)
                .map(|p| {
                    json!({
                        "pid": p.pid().to_string(),
                        "name": p.name().to_string_lossy(),
                        "memory_percent": format!(
                            "{:.2}%",
                            p.memory() as f64 / total_memory as f64 * 100.0
                        ),
                    })
                })
                .collect::<Vec<_>>()
        })
        .await?;
        Ok(json!(processes))
    }
}

// ── Command execution & filesystem ───────────────────────────────────────────

struct RunCommand;

#[async_trait]
impl AutomationFn for RunCommand {
    fn name(&self) -> &str {
        "run_command"
    }

    fn docstring(&self) -> &str {
        "Run a shell command and return the output."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("command")]
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let command = str_arg(args, "command").context("parameter 'command' missing")?;

        #[cfg(target_os = "windows")]
        let output = Command::new("cmd").args(["/C", &command]).output().await;
        #[cfg(not(target_os = "windows"))]
        let output = Command::new("sh").args(["-c", &command]).output().await;

        let output = output.with_context(|| format!("failed to run command '{}'", command))?;
        if output.status.success() {
            Ok(json!({
                "success": true,
                "output": String::from_utf8_lossy(&output.stdout),
                "command": command,
            }))
        } else {
            Ok(json!({
                "success": false,
                "error": String::from_utf8_lossy(&output.stderr),
                "command": command,
            }))
        }
    }
}

struct CreateDirectory;

#[async_trait]
impl AutomationFn for CreateDirectory {
    fn name(&self) -> &str {
        "create_directory"
    }

    fn docstring(&self) -> &str {
        "Create a directory at the specified path."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("path")]
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let path = str_arg(args, "path").context("parameter 'path' missing")?;
        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("failed to create directory '{}'", path))?;
        Ok(json!(format!("Directory created at: {}", path)))
    }
}

struct ListDirectoryContents;

#[async_trait]
impl AutomationFn for ListDirectoryContents {
    fn name(&self) -> &str {
        "list_directory_contents"
    }

    fn docstring(&self) -> &str {
        "List contents of a directory."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::optional("path", json!("."))]
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let path = str_arg_or(args, "path", ".");
        let mut reader = tokio::fs::read_dir(&path)
            .await
            .with_context(|| format!("failed to list directory '{}'", path))?;

        let mut items = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            items.push(entry.file_name().to_string_lossy().to_string());
        }

        let absolute = tokio::fs::canonicalize(&path)
            .await
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or(path);
        let count = items.len();
        Ok(json!({
            "path": absolute,
            "items": items,
            "count": count,
        }))
    }
}

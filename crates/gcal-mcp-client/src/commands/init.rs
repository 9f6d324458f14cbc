//! The `init` command: register the server with Claude desktop.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tracing::info;

use crate::error::{ClientError, ClientResult};

/// Adds (or replaces) this server under `mcpServers.<name>` in the Claude
/// desktop configuration.
pub fn init(name: &str, claude_config: Option<PathBuf>, config_path: Option<&Path>) -> ClientResult<()> {
    let target = match claude_config {
        Some(path) => path,
        None => default_claude_config_path()?,
    };
    let executable = std::env::current_exe()?;
    register_server(&target, name, server_entry(&executable, config_path)?)?;

    println!("Registered '{}' in {}", name, target.display());
    println!("Restart Claude desktop to load the calendar tools.");
    Ok(())
}

/// Platform location of `claude_desktop_config.json`.
pub fn default_claude_config_path() -> ClientResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("Claude").join("claude_desktop_config.json"))
        .ok_or_else(|| ClientError::config("cannot determine the platform config directory"))
}

/// The `mcpServers` entry that launches `gcal-mcp run`.
///
/// The config path is made absolute: the desktop app starts the server
/// from its own working directory.
pub fn server_entry(executable: &Path, config_path: Option<&Path>) -> ClientResult<Value> {
    let mut args = Vec::new();
    if let Some(path) = config_path {
        let absolute = std::path::absolute(path)?;
        args.push(Value::from("--config"));
        args.push(Value::from(absolute.to_string_lossy().as_ref()));
    }
    args.push(Value::from("run"));

    Ok(json!({
        "command": executable.to_string_lossy(),
        "args": args,
    }))
}

/// Writes `entry` under `mcpServers.<name>`, keeping everything else in
/// the file.
pub fn register_server(path: &Path, name: &str, entry: Value) -> ClientResult<()> {
    let mut root = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(ClientError::config(format!(
                        "{} does not contain a JSON object",
                        path.display()
                    )));
                }
                Err(e) => {
                    return Err(ClientError::config(format!(
                        "failed to parse {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }
    } else {
        Map::new()
    };

    let servers = root
        .entry("mcpServers")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(servers) = servers.as_object_mut() else {
        return Err(ClientError::config(format!(
            "mcpServers in {} is not an object",
            path.display()
        )));
    };
    servers.insert(name.to_string(), entry);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(&Value::Object(root))
        .map_err(|e| ClientError::config(format!("failed to serialize {}: {}", path.display(), e)))?;
    std::fs::write(path, text + "\n")?;
    info!(server = name, path = %path.display(), "registered MCP server");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn entry_runs_the_server() {
        let entry = server_entry(Path::new("/usr/bin/gcal-mcp"), None).unwrap();
        assert_eq!(entry, json!({"command": "/usr/bin/gcal-mcp", "args": ["run"]}));

        let entry = server_entry(
            Path::new("/usr/bin/gcal-mcp"),
            Some(Path::new("/etc/gcal.toml")),
        )
        .unwrap();
        assert_eq!(entry["args"], json!(["--config", "/etc/gcal.toml", "run"]));
    }

    #[test]
    fn relative_config_path_is_made_absolute() {
        let entry = server_entry(
            Path::new("/usr/bin/gcal-mcp"),
            Some(Path::new("./gcal.toml")),
        )
        .unwrap();

        let registered = PathBuf::from(entry["args"][1].as_str().unwrap());
        assert!(registered.is_absolute());
        assert!(registered.ends_with("gcal.toml"));
        assert_eq!(registered, std::path::absolute("./gcal.toml").unwrap());
        assert_eq!(entry["args"][2], "run");
    }

    #[test]
    fn creates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Claude").join("claude_desktop_config.json");

        register_server(&path, "google_calendar", json!({"command": "gcal-mcp"})).unwrap();

        assert_eq!(
            read(&path),
            json!({"mcpServers": {"google_calendar": {"command": "gcal-mcp"}}})
        );
    }

    #[test]
    fn keeps_other_servers_and_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("claude_desktop_config.json");
        std::fs::write(
            &path,
            r#"{"theme": "dark", "mcpServers": {"other": {"command": "x"}, "google_calendar": {"command": "old"}}}"#,
        )
        .unwrap();

        register_server(&path, "google_calendar", json!({"command": "new"})).unwrap();

        let root = read(&path);
        assert_eq!(root["theme"], "dark");
        assert_eq!(root["mcpServers"]["other"]["command"], "x");
        assert_eq!(root["mcpServers"]["google_calendar"]["command"], "new");
    }

    #[test]
    fn rejects_non_object_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("claude_desktop_config.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(register_server(&path, "google_calendar", json!({})).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1, 2]");
    }

    #[test]
    fn rejects_malformed_servers_table() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("claude_desktop_config.json");
        std::fs::write(&path, r#"{"mcpServers": []}"#).unwrap();

        assert!(register_server(&path, "google_calendar", json!({})).is_err());
    }
}

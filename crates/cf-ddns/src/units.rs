// # Periodic Units
//
// Installs a systemd oneshot service plus a timer that runs `cf-ddns sync`
// every minute for one hostname.
//
// Unit names are `cf-ddns-<target>.service` and `cf-ddns-<target>.timer`, so
// several hostnames can be managed side by side on one host.
//
// The API token is passed through `Environment=` rather than the command line,
// and the service file is written with mode 0600.

use anyhow::{Context, Result, bail};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use crate::SyncArgs;

/// Where unit files are installed
pub const UNIT_DIR: &str = "/etc/systemd/system";

/// Journal lines shown by `status`
const STATUS_JOURNAL_LINES: &str = "20";

pub fn service_name(target: &str) -> String {
    format!("cf-ddns-{}.service", target)
}

pub fn timer_name(target: &str) -> String {
    format!("cf-ddns-{}.timer", target)
}

fn unit_path(name: &str) -> PathBuf {
    Path::new(UNIT_DIR).join(name)
}

/// Quote one `ExecStart=` word the way systemd splits them
///
/// Plain words pass through. Anything else is double-quoted with `\` and `"`
/// escaped. `%` and `$` are doubled so systemd does not expand them.
fn exec_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,/:=@+".contains(c));
    if plain {
        return arg.to_string();
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '%' => quoted.push_str("%%"),
            '$' => quoted.push_str("$$"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Render the oneshot service running one pass
pub fn render_service(exe: &Path, args: &SyncArgs) -> String {
    let exec_args: Vec<String> = args.to_args().iter().map(|a| exec_arg(a)).collect();

    format!(
        r#"[Unit]
Description=cf-ddns sync for {target}
Wants=network-online.target
After=network-online.target

[Service]
Type=oneshot
Environment="CF_DDNS_API_TOKEN={token}"
ExecStart={exe} sync {args}
"#,
        target = args.target,
        token = args.api_token,
        exe = exec_arg(&exe.display().to_string()),
        args = exec_args.join(" "),
    )
}

/// Render the timer repeating the service every minute
pub fn render_timer(target: &str) -> String {
    format!(
        r#"[Unit]
Description=Run cf-ddns sync for {target} every minute

[Timer]
OnBootSec=1min
OnUnitActiveSec=1min
AccuracySec=1s
Unit={service}

[Install]
WantedBy=timers.target
"#,
        target = target,
        service = service_name(target),
    )
}

/// Run `systemctl` and fail on a non-zero exit
fn systemctl(args: &[&str]) -> Result<()> {
    let output = Command::new("systemctl")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run systemctl {}", args.join(" ")))?;

    if !output.status.success() {
        bail!(
            "systemctl {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(())
}

fn write_unit(path: &Path, content: &str, private: bool) -> Result<()> {
    let mut file =
        open_unit(path, private).with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote {}", path.display());
    Ok(())
}

/// Open a unit file for rewriting with its final mode already in place
#[cfg(unix)]
fn open_unit(path: &Path, private: bool) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mode = if private { 0o600 } else { 0o644 };
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;

    // `mode` only applies when the file is created
    file.set_permissions(fs::Permissions::from_mode(mode))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_unit(path: &Path, _private: bool) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

/// Write both units and start the timer
pub fn install(args: &SyncArgs) -> Result<()> {
    // Refuse to install something every run would reject
    args.to_config().validate()?;

    let exe = std::env::current_exe().context("Failed to locate the cf-ddns executable")?;
    let service = service_name(&args.target);
    let timer = timer_name(&args.target);

    write_unit(&unit_path(&service), &render_service(&exe, args), true)?;
    write_unit(&unit_path(&timer), &render_timer(&args.target), false)?;

    systemctl(&["daemon-reload"])?;

    if let Err(e) = systemctl(&["stop", &timer]) {
        warn!("Could not stop {}: {}", timer, e);
    }

    systemctl(&["enable", "--now", &timer])
        .with_context(|| format!("Failed to enable {}", timer))?;

    info!("Installed {} for {}", timer, args.target);
    Ok(())
}

/// Stop the timer and remove both units
pub fn uninstall(target: &str) -> Result<()> {
    let service = service_name(target);
    let timer = timer_name(target);

    if let Err(e) = systemctl(&["disable", "--now", &timer]) {
        warn!("Could not disable {}: {}", timer, e);
    }
    if let Err(e) = systemctl(&["stop", &service]) {
        warn!("Could not stop {}: {}", service, e);
    }

    for name in [&service, &timer] {
        let path = unit_path(name);
        match fs::remove_file(&path) {
            Ok(()) => info!("Removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    systemctl(&["daemon-reload"])?;
    info!("Uninstalled {} for {}", timer, target);
    Ok(())
}

/// Print timer and service state plus the last journal lines
///
/// Output from systemctl and journalctl is passed through as-is.
pub fn status(target: &str) -> Result<()> {
    let service = service_name(target);
    let timer = timer_name(target);

    if !unit_path(&service).exists() {
        bail!("{} is not installed", service);
    }

    // `systemctl status` exits non-zero for inactive units
    Command::new("systemctl")
        .args(["status", "--no-pager", timer.as_str(), service.as_str()])
        .status()
        .context("Failed to run systemctl status")?;

    Command::new("journalctl")
        .args(["--no-pager", "-n", STATUS_JOURNAL_LINES, "-u", service.as_str()])
        .status()
        .context("Failed to run journalctl")?;

    Ok(())
}

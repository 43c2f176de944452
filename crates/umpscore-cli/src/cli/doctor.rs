//! Environment readiness check.

use crate::cli::output::{print_json, Output};
use crate::config::{resolve_config_path, ScrapeConfig};
use crate::http_client::HttpClient;
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct DoctorReport {
    os: &'static str,
    arch: &'static str,
    config_file: Option<String>,
    chromium: Option<String>,
    output_dir_writable: bool,
    site_status: Option<u16>,
    ready: bool,
}

/// Check Chromium availability, the output directory, and site reachability.
pub async fn run(
    config: &ScrapeConfig,
    output: Output,
    explicit_config: Option<&Path>,
) -> Result<()> {
    let chromium = find_chromium(config.chromium_path.as_deref());
    let output_dir_writable = check_writable(&config.output_dir);

    let site_status = match HttpClient::new(10_000, &config.user_agent) {
        Ok(client) => client
            .get(&config.base_url, &[], 10_000)
            .await
            .ok()
            .map(|r| r.status),
        Err(_) => None,
    };

    let report = DoctorReport {
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        config_file: resolve_config_path(explicit_config).map(|p| p.display().to_string()),
        chromium: chromium.as_ref().map(|p| p.display().to_string()),
        output_dir_writable,
        site_status,
        ready: chromium.is_some() && output_dir_writable,
    };

    if output.is_json() {
        print_json(&report);
        return Ok(());
    }

    println!("umpscore doctor");
    println!("===============");
    println!();
    println!("OS:   {}", report.os);
    println!("Arch: {}", report.arch);
    match &report.config_file {
        Some(path) => println!("Config: {path}"),
        None => println!("Config: built-in defaults"),
    }
    println!();

    match &report.chromium {
        Some(path) => println!("[OK] Chromium found: {path}"),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome or set UMPSCORE_CHROMIUM_PATH."
        ),
    }

    if report.output_dir_writable {
        println!(
            "[OK] Output directory is writable: {}",
            config.output_dir.display()
        );
    } else {
        println!(
            "[!!] Output directory is not writable: {}",
            config.output_dir.display()
        );
    }

    match report.site_status {
        Some(status) if (200..400).contains(&status) => {
            println!("[OK] {} reachable (HTTP {status})", config.base_url)
        }
        Some(status) => println!("[??] {} answered HTTP {status}", config.base_url),
        None => println!("[??] {} not reachable", config.base_url),
    }

    println!();
    if report.ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}

/// Create the directory if needed and try writing a probe file into it.
fn check_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(format!(".umpscore-probe-{}", uuid::Uuid::new_v4()));
    let ok = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_writable() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/csv");
        assert!(check_writable(&nested));
        assert!(nested.exists());
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 0);
    }
}

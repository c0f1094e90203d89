//! Integration tests for the web2app-admin CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const SECRET_VARS: [&str; 10] = [
    "GITHUB_CLIENT_ID",
    "GITHUB_CLIENT_SECRET",
    "GITHUB_TEMPLATES_TOKEN",
    "GITHUB_ORG",
    "GITHUB_REPO",
    "GITHUB_BRANCH",
    "GITHUB_API_URL",
    "APP_URL",
    "PORT",
    "APP_ENV",
];

/// A command isolated from the caller's environment and `.env`.
fn admin(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("web2app-admin");
    cmd.current_dir(dir.path());
    for var in SECRET_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &TempDir, content: &str) {
    fs::write(dir.path().join("web2app.toml"), content).unwrap();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = TempDir::new().unwrap();
        admin(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("icons"))
            .stdout(predicate::str::contains("counts"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        admin(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("web2app-admin"));
    }

    #[test]
    fn test_serve_help_lists_flags() {
        let dir = TempDir::new().unwrap();
        admin(&dir)
            .args(["serve", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--port"))
            .stdout(predicate::str::contains("--dev"));
    }

    #[test]
    fn test_unknown_command_fails() {
        let dir = TempDir::new().unwrap();
        admin(&dir).arg("frobnicate").assert().failure();
    }
}

// =============================================================================
// Config Command Tests
// =============================================================================

mod config_command {
    use super::*;

    #[test]
    fn test_show_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        admin(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No config file"))
            .stdout(predicate::str::contains("web2app-templates"))
            .stdout(predicate::str::contains(
                "http://localhost:3000/api/admin/callback",
            ));
    }

    #[test]
    fn test_show_reads_file_and_env_and_redacts_secrets() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "[github]\nrepo = \"staging-templates\"\n\n[server]\napp_url = \"https://admin.example.com\"\n",
        );
        admin(&dir)
            .args(["config", "show"])
            .env("GITHUB_CLIENT_SECRET", "very-secret-value")
            .env("GITHUB_ORG", "acme")
            .assert()
            .success()
            .stdout(predicate::str::contains("staging-templates"))
            .stdout(predicate::str::contains("acme"))
            .stdout(predicate::str::contains("https://admin.example.com/api/admin/callback"))
            .stdout(predicate::str::contains("very-secret-value").not())
            .stdout(predicate::str::contains("********"));
    }

    #[test]
    fn test_explicit_config_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[server]\nport = 4100\n").unwrap();
        admin(&dir)
            .args(["--config", path.to_str().unwrap(), "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 4100"));
    }

    #[test]
    fn test_validate_reports_missing_credentials() {
        let dir = TempDir::new().unwrap();
        admin(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"))
            .stdout(predicate::str::contains("GITHUB_TEMPLATES_TOKEN"));
    }

    #[test]
    fn test_validate_clean_configuration() {
        let dir = TempDir::new().unwrap();
        admin(&dir)
            .args(["config", "validate"])
            .env("GITHUB_CLIENT_ID", "Iv1.abc")
            .env("GITHUB_CLIENT_SECRET", "secret")
            .env("GITHUB_TEMPLATES_TOKEN", "ghp_token")
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_invalid_toml_fails() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[github\norg = ");
        admin(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("web2app.toml"));
    }
}

// =============================================================================
// Maintenance Command Tests
// =============================================================================

mod maintenance_commands {
    use super::*;

    #[test]
    fn test_counts_requires_templates_token() {
        let dir = TempDir::new().unwrap();
        admin(&dir)
            .arg("counts")
            .assert()
            .failure()
            .stderr(predicate::str::contains("GITHUB_TEMPLATES_TOKEN"));
    }

    #[test]
    fn test_icons_requires_templates_token() {
        let dir = TempDir::new().unwrap();
        admin(&dir)
            .args(["icons", "--dry-run"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("GITHUB_TEMPLATES_TOKEN"));
    }
}

//! Integration tests for CLI commands
//!
//! Every test runs the binary against its own state directory and a
//! configuration path that does not exist.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use semver::Version;
use stevedore_core::archive::{SHARED_READ_MASK, extract_archive, list_archive};
use stevedore_core::{Item, Locator, Manifest, ManifestKind, write_items};
use tempfile::TempDir;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Run stevedore against this environment's store
    fn run(&self, args: &[&str]) -> Output {
        let state_dir = self.path("state");
        let config = self.path("config.yaml");
        Command::new(env!("CARGO_BIN_EXE_stevedore"))
            .arg("--state-dir")
            .arg(&state_dir)
            .arg("--config")
            .arg(&config)
            .args(args)
            .env_remove("STEVEDORE_STATE_DIR")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute stevedore")
    }

    fn write(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write an application package tarball and import it
    fn import_app(&self, manifest: &Manifest) {
        let name = format!("{}.tar.gz", manifest.metadata.name);
        let mut data = Vec::new();
        write_items(
            &mut data,
            vec![Item::from_string_mode(
                "resources/app.yaml",
                manifest.to_yaml().unwrap(),
                SHARED_READ_MASK,
            )],
        )
        .unwrap();
        let tarball = self.write(&name, &data);

        let output = self.run(&["app", "import", tarball.to_str().unwrap()]);
        assert_success(&output);
    }

    fn import_package(&self, locator: &str) {
        let file = self.write("content.bin", format!("content of {}", locator).as_bytes());
        let output = self.run(&["package", "import", locator, file.to_str().unwrap()]);
        assert_success(&output);
    }
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stevedore failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn cluster_manifest() -> Manifest {
    let mut manifest = Manifest::application("telekube", Version::new(7, 0, 1));
    manifest.kind = ManifestKind::Cluster;
    manifest.dependencies.packages = vec![
        Locator::parse("gravitational.io/gravity:7.0.1").unwrap(),
        Locator::parse("gravitational.io/planet:7.0.1").unwrap(),
    ];
    manifest
}

fn write_chart(dir: &Path) {
    std::fs::create_dir_all(dir.join("templates")).unwrap();
    std::fs::write(dir.join("Chart.yaml"), "name: web\nversion: 0.1.0\n").unwrap();
    std::fs::write(
        dir.join("templates/deployment.yaml"),
        "spec:\n  containers:\n    - image: nginx:1.19\n",
    )
    .unwrap();
}

mod package_command {
    use super::*;

    #[test]
    fn test_import_and_list() {
        let env = Env::new();
        let file = env.write("planet.tar", b"planet");

        let output = env.run(&[
            "package",
            "import",
            "gravitational.io/planet:7.0.1",
            file.to_str().unwrap(),
            "--label",
            "purpose=runtime",
        ]);
        assert_success(&output);
        assert!(stdout(&output).contains("gravitational.io/planet:7.0.1"));

        let output = env.run(&["package", "list"]);
        assert_success(&output);
        let listing = stdout(&output);
        assert!(listing.contains("gravitational.io/planet:7.0.1"));
        assert!(listing.contains("purpose=runtime"));
    }

    #[test]
    fn test_import_twice_fails() {
        let env = Env::new();
        env.import_package("gravitational.io/planet:7.0.1");

        let file = env.write("again.tar", b"again");
        let output = env.run(&[
            "package",
            "import",
            "gravitational.io/planet:7.0.1",
            file.to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn test_invalid_label() {
        let env = Env::new();
        let file = env.write("planet.tar", b"planet");

        let output = env.run(&[
            "package",
            "import",
            "gravitational.io/planet:7.0.1",
            file.to_str().unwrap(),
            "--label",
            "novalue",
        ]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_invalid_locator() {
        let env = Env::new();
        let file = env.write("planet.tar", b"planet");

        let output = env.run(&["package", "import", "planet", file.to_str().unwrap()]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_list_empty_repository() {
        let env = Env::new();
        let output = env.run(&["package", "list", "example.com"]);
        assert_success(&output);
        assert!(stdout(&output).contains("No packages in example.com"));
    }
}

mod app_command {
    use super::*;

    #[test]
    fn test_import_and_list() {
        let env = Env::new();
        env.import_app(&cluster_manifest());

        let output = env.run(&["app", "list"]);
        assert_success(&output);
        let listing = stdout(&output);
        assert!(listing.contains("gravitational.io/telekube:7.0.1"));
        assert!(listing.contains("Cluster"));
    }

    #[test]
    fn test_list_empty_repository() {
        let env = Env::new();
        let output = env.run(&["app", "list", "example.com"]);
        assert_success(&output);
        assert!(stdout(&output).contains("No applications in example.com"));
    }

    #[test]
    fn test_import_without_manifest() {
        let env = Env::new();
        let mut data = Vec::new();
        write_items(
            &mut data,
            vec![Item::from_string_mode("README", "no manifest", SHARED_READ_MASK)],
        )
        .unwrap();
        let tarball = env.write("broken.tar.gz", &data);

        let output = env.run(&["app", "import", tarball.to_str().unwrap()]);
        assert_eq!(output.status.code(), Some(2));
    }
}

mod deps_command {
    use super::*;

    #[test]
    fn test_print_dependencies() {
        let env = Env::new();
        env.import_package("gravitational.io/gravity:7.0.1");
        env.import_package("gravitational.io/planet:7.0.1");
        env.import_app(&cluster_manifest());

        let output = env.run(&["deps", "gravitational.io/telekube:7.0.1"]);
        assert_success(&output);
        let tree = stdout(&output);
        assert!(tree.contains("gravitational.io/gravity:7.0.1"));
        assert!(tree.contains("gravitational.io/planet:7.0.1"));
    }

    #[test]
    fn test_missing_dependency() {
        let env = Env::new();
        env.import_package("gravitational.io/gravity:7.0.1");
        env.import_app(&cluster_manifest());

        let output = env.run(&["deps", "gravitational.io/telekube:7.0.1"]);
        assert_eq!(output.status.code(), Some(4));
    }
}

mod installer_command {
    use super::*;

    #[test]
    fn test_generate_cluster_installer() {
        let env = Env::new();
        env.import_package("gravitational.io/gravity:7.0.1");
        env.import_package("gravitational.io/planet:7.0.1");
        env.import_app(&cluster_manifest());
        let out = env.path("telekube.tar");

        let output = env.run(&[
            "installer",
            "gravitational.io/telekube:7.0.1",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert_success(&output);

        let data = std::fs::read(&out).unwrap();
        let paths: Vec<String> = list_archive(data.as_slice())
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        for expected in ["gravity", "app.yaml", "install", "upload", "gravity.db"] {
            assert!(paths.iter().any(|p| p == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_missing_application() {
        let env = Env::new();
        let out = env.path("missing.tar");

        let output = env.run(&[
            "installer",
            "gravitational.io/missing:1.0.0",
            "-o",
            out.to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(4));
        assert!(!out.exists());
    }

    #[test]
    fn test_invalid_ca_certificate() {
        let env = Env::new();
        env.import_app(&Manifest::application("wordpress", Version::new(1, 2, 0)));
        let cert = env.write("ca.pem", b"not a certificate");
        let out = env.path("wordpress.tar");

        let output = env.run(&[
            "installer",
            "gravitational.io/wordpress:1.2.0",
            "-o",
            out.to_str().unwrap(),
            "--ca-cert",
            cert.to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(2));
        assert!(!out.exists());
    }

    #[test]
    fn test_encrypted_installer() {
        let env = Env::new();
        env.import_package("gravitational.io/gravity:7.0.1");
        env.import_package("gravitational.io/planet:7.0.1");
        env.import_app(&cluster_manifest());
        let out = env.path("telekube.tar");

        let output = env.run(&[
            "installer",
            "gravitational.io/telekube:7.0.1",
            "-o",
            out.to_str().unwrap(),
            "--encryption-key",
            "passphrase",
        ]);
        assert_success(&output);

        let unpacked = env.path("unpacked");
        let data = std::fs::read(&out).unwrap();
        extract_archive(data.as_slice(), &unpacked).unwrap();

        let gravity = std::fs::read(unpacked.join("gravity")).unwrap();
        assert_eq!(gravity, b"content of gravitational.io/gravity:7.0.1");

        let plain = b"content of gravitational.io/planet:7.0.1";
        let mut blobs = 0;
        for shard in std::fs::read_dir(unpacked.join("packages/blobs")).unwrap() {
            for blob in std::fs::read_dir(shard.unwrap().path()).unwrap() {
                let content = std::fs::read(blob.unwrap().path()).unwrap();
                assert!(!content.windows(plain.len()).any(|w| w == plain));
                blobs += 1;
            }
        }
        assert!(blobs > 0);
    }
}

mod build_command {
    use super::*;

    #[test]
    fn test_build_chart() {
        let env = Env::new();
        let chart = env.path("chart");
        write_chart(&chart);
        let out = env.path("web.tar");

        let output = env.run(&["build", chart.to_str().unwrap(), "-o", out.to_str().unwrap()]);
        assert_success(&output);

        let data = std::fs::read(&out).unwrap();
        let paths: Vec<String> = list_archive(data.as_slice())
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert!(paths.iter().any(|p| p == "app.yaml"));
        assert!(!paths.iter().any(|p| p == "gravity"));
    }

    #[test]
    fn test_rebuild_leaves_local_store_alone() {
        let env = Env::new();
        let chart = env.path("chart");
        write_chart(&chart);

        for name in ["first.tar", "second.tar"] {
            let out = env.path(name);
            let output = env.run(&["build", chart.to_str().unwrap(), "-o", out.to_str().unwrap()]);
            assert_success(&output);
        }

        let output = env.run(&["app", "list"]);
        assert_success(&output);
        assert!(!stdout(&output).contains("gravitational.io/web:0.1.0"));
    }

    #[test]
    fn test_existing_output_requires_overwrite() {
        let env = Env::new();
        let chart = env.path("chart");
        write_chart(&chart);
        let out = env.write("web.tar", b"previous");

        let output = env.run(&["build", chart.to_str().unwrap(), "-o", out.to_str().unwrap()]);
        assert_eq!(output.status.code(), Some(2));
        assert_eq!(std::fs::read(&out).unwrap(), b"previous");

        let output = env.run(&[
            "build",
            chart.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--overwrite",
        ]);
        assert_success(&output);
    }
}

//! Dependency resolution
//!
//! Walks an application's manifest and the manifests of its nested
//! applications, collecting every package and application the installer has
//! to carry. Each locator appears once; nested applications come after
//! their own dependencies and the target application comes last.

use indexmap::IndexMap;
use std::collections::HashSet;
use stevedore_core::{Dependencies, Locator, Manifest, PackageEnvelope};
use stevedore_store::{Application, Applications};

use crate::error::{InstallerError, Result};

/// Packages and applications required by an application
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    pub packages: Vec<PackageEnvelope>,
    pub apps: Vec<Application>,
}

impl DependencySet {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.apps.is_empty()
    }

    /// Render the set as a locator tree for display
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        let total = self.packages.len() + self.apps.len();

        let entries = self
            .packages
            .iter()
            .map(|p| (&p.locator, "package"))
            .chain(self.apps.iter().map(|a| (&a.locator, "app")));

        for (i, (locator, kind)) in entries.enumerate() {
            let connector = if i + 1 == total { "└── " } else { "├── " };
            lines.push(format!("{}{} ({})", connector, locator, kind));
        }

        lines.join("\n")
    }
}

/// Request for `get_dependencies`
#[derive(Debug, Clone, Copy)]
pub struct DependencyRequest<'a> {
    /// Application whose dependencies are collected
    pub app: &'a Application,
    /// Extra packages and applications unioned into the result
    pub additional: &'a Dependencies,
}

/// Collect the full dependency closure of an application
///
/// Fails on the first dependency that cannot be read; no partial set is
/// returned.
pub fn get_dependencies(request: DependencyRequest<'_>, apps: &Applications) -> Result<DependencySet> {
    let mut collector = Collector::new(apps);
    collector.visited.insert(request.app.locator.clone());

    collector.visit(&request.app.manifest)?;
    for locator in &request.additional.packages {
        collector.add_package(locator)?;
    }
    for locator in &request.additional.apps {
        collector.add_app(locator)?;
    }

    let mut set = collector.finish();
    set.apps.push(request.app.clone());
    Ok(set)
}

struct Collector<'a> {
    apps: &'a Applications,
    packages: IndexMap<Locator, PackageEnvelope>,
    nested: IndexMap<Locator, Application>,
    visited: HashSet<Locator>,
}

impl<'a> Collector<'a> {
    fn new(apps: &'a Applications) -> Self {
        Self {
            apps,
            packages: IndexMap::new(),
            nested: IndexMap::new(),
            visited: HashSet::new(),
        }
    }

    fn visit(&mut self, manifest: &Manifest) -> Result<()> {
        for locator in &manifest.dependencies.packages {
            self.add_package(locator)?;
        }
        for locator in &manifest.dependencies.apps {
            self.add_app(locator)?;
        }
        Ok(())
    }

    fn add_package(&mut self, locator: &Locator) -> Result<()> {
        if self.packages.contains_key(locator) {
            return Ok(());
        }

        let envelope = self
            .apps
            .packages()
            .read_package_envelope(locator)
            .map_err(InstallerError::dependency(locator))?;
        self.packages.insert(locator.clone(), envelope);
        Ok(())
    }

    fn add_app(&mut self, locator: &Locator) -> Result<()> {
        // Also guards against manifests that reference each other
        if !self.visited.insert(locator.clone()) {
            return Ok(());
        }

        let app = self
            .apps
            .get_app(locator)
            .map_err(InstallerError::dependency(locator))?;
        self.visit(&app.manifest)?;
        self.nested.insert(locator.clone(), app);
        Ok(())
    }

    fn finish(self) -> DependencySet {
        DependencySet {
            packages: self.packages.into_values().collect(),
            apps: self.nested.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stevedore_core::{ErrorKind, ManifestKind};
    use stevedore_store::{LocalPackages, PackageOptions, PackageService};
    use tempfile::TempDir;

    fn loc(s: &str) -> Locator {
        Locator::parse(s).unwrap()
    }

    struct Source {
        _temp: TempDir,
        apps: Applications,
    }

    impl Source {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let packages = LocalPackages::open(temp.path()).unwrap();
            packages.upsert_repository("gravitational.io", None).unwrap();
            Self {
                _temp: temp,
                apps: Applications::new(Arc::new(packages)),
            }
        }

        fn package(&self, locator: &str) {
            self.apps
                .packages()
                .create_package(&loc(locator), &mut locator.as_bytes(), PackageOptions::default())
                .unwrap();
        }

        fn app(&self, locator: &str, kind: ManifestKind, packages: &[&str], apps: &[&str]) -> Application {
            let locator = loc(locator);
            let mut manifest = Manifest::application(&locator.name, locator.version.clone());
            manifest.kind = kind;
            manifest.dependencies.packages = packages.iter().map(|p| loc(p)).collect();
            manifest.dependencies.apps = apps.iter().map(|a| loc(a)).collect();
            self.apps
                .create_app_with_manifest(&locator, manifest, &mut &b"app"[..], Default::default())
                .unwrap()
        }
    }

    fn names(set: &DependencySet) -> (Vec<String>, Vec<String>) {
        (
            set.packages.iter().map(|p| p.locator.name.clone()).collect(),
            set.apps.iter().map(|a| a.locator.name.clone()).collect(),
        )
    }

    #[test]
    fn test_nested_dependencies_deduplicated() {
        let source = Source::new();
        for p in ["a", "b", "c"] {
            source.package(&format!("gravitational.io/{}:1.0.0", p));
        }
        source.app(
            "gravitational.io/nested:1.0.0",
            ManifestKind::Application,
            &["gravitational.io/b:1.0.0", "gravitational.io/c:1.0.0"],
            &[],
        );
        let app = source.app(
            "gravitational.io/cluster:1.0.0",
            ManifestKind::Cluster,
            &["gravitational.io/a:1.0.0", "gravitational.io/b:1.0.0"],
            &["gravitational.io/nested:1.0.0"],
        );

        let set = get_dependencies(
            DependencyRequest {
                app: &app,
                additional: &Dependencies::default(),
            },
            &source.apps,
        )
        .unwrap();

        let (packages, apps) = names(&set);
        assert_eq!(packages, vec!["a", "b", "c"]);
        assert_eq!(apps, vec!["nested", "cluster"]);
    }

    #[test]
    fn test_declaration_order_does_not_duplicate() {
        let source = Source::new();
        for p in ["a", "b", "c"] {
            source.package(&format!("gravitational.io/{}:1.0.0", p));
        }
        source.app(
            "gravitational.io/nested:1.0.0",
            ManifestKind::Application,
            &["gravitational.io/c:1.0.0", "gravitational.io/b:1.0.0"],
            &[],
        );
        let app = source.app(
            "gravitational.io/cluster:1.0.0",
            ManifestKind::Cluster,
            &["gravitational.io/b:1.0.0", "gravitational.io/a:1.0.0"],
            &["gravitational.io/nested:1.0.0"],
        );

        let set = get_dependencies(
            DependencyRequest {
                app: &app,
                additional: &Dependencies::default(),
            },
            &source.apps,
        )
        .unwrap();

        let (mut packages, _) = names(&set);
        packages.sort();
        assert_eq!(packages, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deep_nesting_and_cycles() {
        let source = Source::new();
        source.package("gravitational.io/leaf:1.0.0");
        source.app(
            "gravitational.io/inner:1.0.0",
            ManifestKind::Application,
            &["gravitational.io/leaf:1.0.0"],
            &["gravitational.io/middle:1.0.0"],
        );
        source.app(
            "gravitational.io/middle:1.0.0",
            ManifestKind::Application,
            &[],
            &["gravitational.io/inner:1.0.0"],
        );
        let app = source.app(
            "gravitational.io/top:1.0.0",
            ManifestKind::Cluster,
            &[],
            &["gravitational.io/middle:1.0.0"],
        );

        let set = get_dependencies(
            DependencyRequest {
                app: &app,
                additional: &Dependencies::default(),
            },
            &source.apps,
        )
        .unwrap();

        let (packages, apps) = names(&set);
        assert_eq!(packages, vec!["leaf"]);
        assert_eq!(apps, vec!["inner", "middle", "top"]);
    }

    #[test]
    fn test_additional_dependencies_unioned() {
        let source = Source::new();
        source.package("gravitational.io/a:1.0.0");
        source.package("gravitational.io/extra:1.0.0");
        source.app("gravitational.io/addon:1.0.0", ManifestKind::Application, &[], &[]);
        let app = source.app(
            "gravitational.io/cluster:1.0.0",
            ManifestKind::Cluster,
            &["gravitational.io/a:1.0.0"],
            &[],
        );

        let additional = Dependencies {
            packages: vec![loc("gravitational.io/extra:1.0.0"), loc("gravitational.io/a:1.0.0")],
            apps: vec![loc("gravitational.io/addon:1.0.0")],
        };
        let set = get_dependencies(
            DependencyRequest {
                app: &app,
                additional: &additional,
            },
            &source.apps,
        )
        .unwrap();

        let (packages, apps) = names(&set);
        assert_eq!(packages, vec!["a", "extra"]);
        assert_eq!(apps, vec!["addon", "cluster"]);
    }

    #[test]
    fn test_missing_dependency_fails() {
        let source = Source::new();
        let app = source.app(
            "gravitational.io/cluster:1.0.0",
            ManifestKind::Cluster,
            &["gravitational.io/missing:1.0.0"],
            &[],
        );

        let err = get_dependencies(
            DependencyRequest {
                app: &app,
                additional: &Dependencies::default(),
            },
            &source.apps,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("gravitational.io/missing:1.0.0"));
    }

    #[test]
    fn test_render_tree() {
        let source = Source::new();
        source.package("gravitational.io/planet:7.0.1");
        let app = source.app(
            "gravitational.io/cluster:7.0.1",
            ManifestKind::Cluster,
            &["gravitational.io/planet:7.0.1"],
            &[],
        );

        let set = get_dependencies(
            DependencyRequest {
                app: &app,
                additional: &Dependencies::default(),
            },
            &source.apps,
        )
        .unwrap();

        insta::assert_snapshot!(set.render(), @r"
        ├── gravitational.io/planet:7.0.1 (package)
        └── gravitational.io/cluster:7.0.1 (app)
        ");
    }
}

//! Build-command synthesis.
//!
//! For a chosen category, deduces the single most probable build
//! invocation from the scanned inventory. Non-Android categories pick the
//! shallowest matching manifest and scope the canonical command to its
//! directory; the Android path delegates to the Gradle ranking in
//! [`gradle`]. Synthesis never fails: an unsupported or manifest-less
//! category yields an explicitly failing placeholder command so the
//! eventual exit status still reflects the problem.

pub mod gradle;

use std::path::Path;
use tracing::{debug, info};

use crate::classify::BuildType;
use crate::scan::{DirEntry, FileEntry};

/// Synthesizes the build command for `target`.
pub fn synthesize(root: &Path, target: BuildType, inventory: &[DirEntry]) -> String {
    let cmd = match target {
        BuildType::Android => gradle::synthesize(root),
        BuildType::Cmake => probe_cmake(inventory),
        BuildType::Linux => probe_linux(inventory),
        BuildType::Node => probe_node(root, inventory),
        BuildType::Python => probe_python(inventory),
        BuildType::Rust => probe_rust(inventory),
        BuildType::Go => probe_go(inventory),
        BuildType::Dotnet => probe_dotnet(inventory),
        BuildType::Maven => probe_maven(inventory),
        BuildType::Flutter => probe_flutter(inventory),
        BuildType::Bazel | BuildType::Scons => {
            format!("echo 'No build probe available for {}' && exit 1", target)
        }
        BuildType::Unknown => "echo 'No build system detected' && exit 1".to_string(),
    };
    info!(target = %target, command = %cmd, "synthesized build command");
    cmd
}

/// Relative paths of inventory files matching `pred`, in traversal order.
fn matching_paths(
    inventory: &[DirEntry],
    pred: impl Fn(&str, &FileEntry) -> bool,
) -> Vec<String> {
    let mut paths = Vec::new();
    for entry in inventory {
        for file in &entry.files {
            let low = file.name.to_lowercase();
            if pred(&low, file) {
                paths.push(if entry.dir == "." {
                    file.name.clone()
                } else {
                    format!("{}/{}", entry.dir, file.name)
                });
            }
        }
    }
    paths
}

/// Number of path segments; the tie-break currency for manifest choice.
fn depth_of(path: &str) -> usize {
    path.split('/').count()
}

/// Shallowest path wins; traversal order breaks ties, so the choice is
/// stable across runs.
fn shallowest(paths: &[String]) -> Option<&String> {
    paths.iter().min_by_key(|p| depth_of(p))
}

/// Directory containing `manifest`, "." at root.
fn dir_of(manifest: &str) -> String {
    match manifest.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => ".".to_string(),
    }
}

/// Scopes `cmd` to `dir` unless it is the root.
fn scoped(dir: &str, cmd: &str) -> String {
    if dir == "." {
        cmd.to_string()
    } else {
        format!("cd \"{}\" && {}", dir, cmd)
    }
}

fn probe_cmake(inventory: &[DirEntry]) -> String {
    let paths = matching_paths(inventory, |low, _| low == "cmakelists.txt");
    match shallowest(&paths) {
        Some(manifest) => {
            let dir = dir_of(manifest);
            if dir == "." {
                "cmake -S . -B build && cmake --build build -j".to_string()
            } else {
                let out = format!("build/{}", dir.replace('/', "_"));
                format!(
                    "cmake -S \"{dir}\" -B \"{out}\" && cmake --build \"{out}\" -j"
                )
            }
        }
        None => "echo 'No CMakeLists.txt found' && exit 1".to_string(),
    }
}

fn probe_linux(inventory: &[DirEntry]) -> String {
    let makefiles =
        matching_paths(inventory, |low, _| low == "makefile" || low == "gnumakefile");
    if let Some(manifest) = shallowest(&makefiles) {
        let dir = dir_of(manifest);
        return if dir == "." {
            "make -j".to_string()
        } else {
            format!("make -C \"{}\" -j", dir)
        };
    }

    let meson = matching_paths(inventory, |low, _| low == "meson.build");
    match shallowest(&meson) {
        Some(manifest) => {
            let dir = dir_of(manifest);
            let setup =
                "(meson setup build --wipe || true); meson setup build || true; ninja -C build";
            if dir == "." {
                setup.to_string()
            } else {
                format!("(cd \"{}\" && {})", dir, setup)
            }
        }
        None => "echo 'No Makefile or meson.build found' && exit 1".to_string(),
    }
}

fn probe_node(root: &Path, inventory: &[DirEntry]) -> String {
    let paths = matching_paths(inventory, |low, _| low == "package.json");
    let Some(min_depth) = paths.iter().map(|p| depth_of(p)).min() else {
        return "echo 'No package.json found' && exit 1".to_string();
    };

    // Among equally-shallow manifests, one declaring a build script wins.
    let at_min: Vec<&String> = paths.iter().filter(|p| depth_of(p) == min_depth).collect();
    let chosen = at_min
        .iter()
        .find(|p| declares_build_script(root, p))
        .copied()
        .unwrap_or(at_min[0]);
    debug!(manifest = %chosen, "selected node manifest");

    scoped(&dir_of(chosen), "npm ci && npm run build --if-present")
}

fn declares_build_script(root: &Path, manifest: &str) -> bool {
    std::fs::read_to_string(root.join(manifest))
        .ok()
        .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
        .is_some_and(|pkg| pkg.get("scripts").and_then(|s| s.get("build")).is_some())
}

fn probe_python(inventory: &[DirEntry]) -> String {
    let paths =
        matching_paths(inventory, |low, _| low == "pyproject.toml" || low == "setup.py");
    match shallowest(&paths) {
        Some(manifest) => scoped(
            &dir_of(manifest),
            "pip install -e . && (pytest || python -m pytest || true)",
        ),
        None => "echo 'No python project found' && exit 1".to_string(),
    }
}

fn probe_rust(inventory: &[DirEntry]) -> String {
    let paths = matching_paths(inventory, |low, _| low == "cargo.toml");
    match shallowest(&paths) {
        Some(manifest) => scoped(
            &dir_of(manifest),
            "cargo build --locked --all-targets --verbose",
        ),
        None => "echo 'No Cargo.toml found' && exit 1".to_string(),
    }
}

fn probe_go(inventory: &[DirEntry]) -> String {
    let paths = matching_paths(inventory, |low, _| low == "go.mod");
    match shallowest(&paths) {
        Some(manifest) => scoped(&dir_of(manifest), "go build ./..."),
        None => "echo 'No go.mod found' && exit 1".to_string(),
    }
}

fn probe_dotnet(inventory: &[DirEntry]) -> String {
    let paths = matching_paths(inventory, |low, _| {
        low.ends_with(".sln") || low.ends_with(".csproj") || low.ends_with(".fsproj")
    });
    let Some(min_depth) = paths.iter().map(|p| depth_of(p)).min() else {
        return "echo 'No .NET project or solution found' && exit 1".to_string();
    };

    // A solution outranks a bare project file at equal depth.
    let at_min: Vec<&String> = paths.iter().filter(|p| depth_of(p) == min_depth).collect();
    let chosen = at_min
        .iter()
        .find(|p| p.to_lowercase().ends_with(".sln"))
        .copied()
        .unwrap_or(at_min[0]);

    format!("dotnet restore \"{chosen}\" && dotnet build \"{chosen}\" -c Release")
}

fn probe_maven(inventory: &[DirEntry]) -> String {
    let paths = matching_paths(inventory, |low, _| low == "pom.xml");
    match shallowest(&paths) {
        Some(manifest) => format!("mvn -B package --file \"{}\"", manifest),
        None => "echo 'No pom.xml found' && exit 1".to_string(),
    }
}

fn probe_flutter(inventory: &[DirEntry]) -> String {
    let paths = matching_paths(inventory, |low, _| low == "pubspec.yaml");
    match shallowest(&paths) {
        Some(manifest) => scoped(&dir_of(manifest), "flutter build apk --debug"),
        None => "echo 'No pubspec.yaml found' && exit 1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan_tree;
    use std::fs;
    use tempfile::TempDir;

    fn synth(tmp: &TempDir, target: BuildType) -> String {
        let inventory = scan_tree(tmp.path());
        synthesize(tmp.path(), target, &inventory)
    }

    #[test]
    fn go_command_is_scoped_to_module_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("services/api")).unwrap();
        fs::write(tmp.path().join("services/api/go.mod"), "module api").unwrap();
        assert_eq!(
            synth(&tmp, BuildType::Go),
            "cd \"services/api\" && go build ./..."
        );
    }

    #[test]
    fn root_cmake_builds_into_build_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("CMakeLists.txt"), "project(x)").unwrap();
        assert_eq!(
            synth(&tmp, BuildType::Cmake),
            "cmake -S . -B build && cmake --build build -j"
        );
    }

    #[test]
    fn nested_cmake_derives_build_dir_from_path() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("native/core")).unwrap();
        fs::write(tmp.path().join("native/core/CMakeLists.txt"), "project(x)").unwrap();
        let cmd = synth(&tmp, BuildType::Cmake);
        assert!(cmd.contains("-S \"native/core\""));
        assert!(cmd.contains("-B \"build/native_core\""));
    }

    #[test]
    fn shallowest_manifest_wins() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("deep/nested/dir")).unwrap();
        fs::write(tmp.path().join("deep/nested/dir/Cargo.toml"), "[package]").unwrap();
        fs::create_dir_all(tmp.path().join("shallow")).unwrap();
        fs::write(tmp.path().join("shallow/Cargo.toml"), "[package]").unwrap();
        assert_eq!(
            synth(&tmp, BuildType::Rust),
            "cd \"shallow\" && cargo build --locked --all-targets --verbose"
        );
    }

    #[test]
    fn node_prefers_manifest_with_build_script() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("a/package.json"), r#"{"name":"a"}"#).unwrap();
        fs::write(
            tmp.path().join("b/package.json"),
            r#"{"name":"b","scripts":{"build":"tsc"}}"#,
        )
        .unwrap();
        assert_eq!(
            synth(&tmp, BuildType::Node),
            "cd \"b\" && npm ci && npm run build --if-present"
        );
    }

    #[test]
    fn node_tolerates_malformed_manifest() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("package.json"), "{not json").unwrap();
        assert_eq!(
            synth(&tmp, BuildType::Node),
            "npm ci && npm run build --if-present"
        );
    }

    #[test]
    fn dotnet_prefers_solution_over_project() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("App.csproj"), "<Project/>").unwrap();
        fs::write(tmp.path().join("All.sln"), "").unwrap();
        let cmd = synth(&tmp, BuildType::Dotnet);
        assert_eq!(
            cmd,
            "dotnet restore \"All.sln\" && dotnet build \"All.sln\" -c Release"
        );
    }

    #[test]
    fn maven_targets_discovered_pom() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("service")).unwrap();
        fs::write(tmp.path().join("service/pom.xml"), "<project/>").unwrap();
        assert_eq!(
            synth(&tmp, BuildType::Maven),
            "mvn -B package --file \"service/pom.xml\""
        );
    }

    #[test]
    fn root_makefile_wins_over_nested() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Makefile"), "all:").unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/Makefile"), "all:").unwrap();
        assert_eq!(synth(&tmp, BuildType::Linux), "make -j");
    }

    #[test]
    fn meson_fallback_when_no_makefile() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("engine")).unwrap();
        fs::write(tmp.path().join("engine/meson.build"), "project('x')").unwrap();
        let cmd = synth(&tmp, BuildType::Linux);
        assert!(cmd.starts_with("(cd \"engine\" && "));
        assert!(cmd.contains("ninja -C build"));
    }

    #[test]
    fn missing_manifest_yields_failing_placeholder() {
        let tmp = TempDir::new().unwrap();
        for target in [
            BuildType::Cmake,
            BuildType::Node,
            BuildType::Python,
            BuildType::Go,
            BuildType::Maven,
        ] {
            let cmd = synth(&tmp, target);
            assert!(cmd.contains("exit 1"), "{target}: {cmd}");
        }
    }

    #[test]
    fn unsupported_categories_yield_failing_placeholder() {
        let tmp = TempDir::new().unwrap();
        assert!(synth(&tmp, BuildType::Bazel).contains("exit 1"));
        assert!(synth(&tmp, BuildType::Scons).contains("exit 1"));
        assert!(synth(&tmp, BuildType::Unknown).contains("exit 1"));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("x")).unwrap();
        fs::create_dir_all(tmp.path().join("y")).unwrap();
        fs::write(tmp.path().join("x/go.mod"), "module x").unwrap();
        fs::write(tmp.path().join("y/go.mod"), "module y").unwrap();
        let first = synth(&tmp, BuildType::Go);
        let second = synth(&tmp, BuildType::Go);
        assert_eq!(first, second);
    }
}

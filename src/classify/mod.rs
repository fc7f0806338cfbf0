//! Build-type classification.
//!
//! Maps the scanned inventory to a deterministic, non-empty, priority
//! ordered set of build-system categories, with a flavor
//! sub-classification for every CMake descriptor found. Ambiguity is
//! resolved by the fixed priority order, never by failing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::artifacts;
use crate::scan::DirEntry;

/// Build-system categories, in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Android,
    Linux,
    Cmake,
    Node,
    Python,
    Rust,
    Dotnet,
    Maven,
    Flutter,
    Go,
    Bazel,
    Scons,
    Unknown,
}

impl BuildType {
    /// Fixed priority order used for the final category list and for
    /// default selection downstream.
    pub const PRIORITY: [BuildType; 13] = [
        BuildType::Android,
        BuildType::Linux,
        BuildType::Cmake,
        BuildType::Node,
        BuildType::Python,
        BuildType::Rust,
        BuildType::Dotnet,
        BuildType::Maven,
        BuildType::Flutter,
        BuildType::Go,
        BuildType::Bazel,
        BuildType::Scons,
        BuildType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Android => "android",
            BuildType::Linux => "linux",
            BuildType::Cmake => "cmake",
            BuildType::Node => "node",
            BuildType::Python => "python",
            BuildType::Rust => "rust",
            BuildType::Dotnet => "dotnet",
            BuildType::Maven => "maven",
            BuildType::Flutter => "flutter",
            BuildType::Go => "go",
            BuildType::Bazel => "bazel",
            BuildType::Scons => "scons",
            BuildType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildType::PRIORITY
            .iter()
            .find(|t| t.as_str() == s.to_lowercase())
            .copied()
            .ok_or_else(|| {
                format!(
                    "invalid build type: {}. Valid options: {}",
                    s,
                    BuildType::PRIORITY
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Platform flavor of a CMake descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmakeFlavorKind {
    Android,
    Desktop,
}

/// Flavor verdict for one discovered `CMakeLists.txt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmakeFlavor {
    pub path: String,
    pub flavor: CmakeFlavorKind,
}

/// Full classification output: ordered types plus the evidence behind them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Non-empty category list in [`BuildType::PRIORITY`] order.
    pub types: Vec<BuildType>,
    /// Evidence bucket name → file hits (or `folder-hint:` markers).
    pub hits: BTreeMap<String, Vec<String>>,
    pub cmake_flavors: Vec<CmakeFlavor>,
    /// Lowercased top-level directory names.
    pub folder_hints: Vec<String>,
}

impl Classification {
    /// Highest-priority detected category.
    pub fn primary(&self) -> BuildType {
        self.types.first().copied().unwrap_or(BuildType::Unknown)
    }
}

const ANDROID_HINTS: &[&str] = &[
    "android",
    "android_abi",
    "android_platform",
    "ndk",
    "cmake_android",
    "gradle",
    "externalnativebuild",
    "find_library(log)",
    "log-lib",
    "loglib",
];

const DESKTOP_HINTS: &[&str] = &[
    "add_executable",
    "pkgconfig",
    "find_package(",
    "threads",
    "pthread",
    "x11",
    "wayland",
    "gtk",
    "qt",
    "set(cmake_system_name linux",
];

/// Keyword scan of a CMake descriptor; android hints win, absence of any
/// signal defaults to desktop.
pub fn cmake_flavor_of(content: &str) -> CmakeFlavorKind {
    let t = content.to_lowercase();
    if ANDROID_HINTS.iter().any(|h| t.contains(h)) {
        return CmakeFlavorKind::Android;
    }
    if DESKTOP_HINTS.iter().any(|h| t.contains(h)) {
        return CmakeFlavorKind::Desktop;
    }
    CmakeFlavorKind::Desktop
}

const BUCKETS: &[&str] = &[
    "android_gradle",
    "cmakelists",
    "make_like",
    "node",
    "python",
    "rust",
    "dotnet",
    "maven",
    "flutter",
    "go",
    "bazel",
    "scons",
];

/// Classifies the scanned inventory.
///
/// `root` is only used to read CMake descriptors for the flavor scan;
/// evidence collection itself works off the inventory.
pub fn classify(root: &Path, inventory: &[DirEntry]) -> Classification {
    let mut hits: BTreeMap<String, Vec<String>> = BUCKETS
        .iter()
        .map(|b| (b.to_string(), Vec::new()))
        .collect();
    let mut cmake_flavors = Vec::new();
    let mut folder_hints: Vec<String> = Vec::new();

    for entry in inventory {
        // Top-level folder names are weak evidence on their own.
        if entry.dir != "." && !entry.dir.contains('/') {
            let hint = entry.dir.to_lowercase();
            if !folder_hints.contains(&hint) {
                folder_hints.push(hint);
            }
        }

        for file in &entry.files {
            let low = file.name.to_lowercase();
            let rel = if entry.dir == "." {
                file.name.clone()
            } else {
                format!("{}/{}", entry.dir, file.name)
            };

            if low == "gradlew" || low.starts_with("build.gradle") || low.starts_with("settings.gradle")
            {
                push_hit(&mut hits, "android_gradle", &rel);
            }
            if low == "cmakelists.txt" {
                push_hit(&mut hits, "cmakelists", &rel);
                let content = fs::read(root.join(&rel))
                    .map(|b| String::from_utf8_lossy(&b).into_owned())
                    .unwrap_or_default();
                cmake_flavors.push(CmakeFlavor {
                    path: rel.clone(),
                    flavor: cmake_flavor_of(&content),
                });
            }
            if matches!(low.as_str(), "makefile" | "gnumakefile" | "meson.build" | "build.ninja")
                || low.ends_with(".mk")
            {
                push_hit(&mut hits, "make_like", &rel);
            }
            if low == "package.json" {
                push_hit(&mut hits, "node", &rel);
            }
            if low == "pyproject.toml" || low == "setup.py" {
                push_hit(&mut hits, "python", &rel);
            }
            if low == "cargo.toml" {
                push_hit(&mut hits, "rust", &rel);
            }
            if low.ends_with(".sln") || low.ends_with(".csproj") || low.ends_with(".fsproj") {
                push_hit(&mut hits, "dotnet", &rel);
            }
            if low == "pom.xml" {
                push_hit(&mut hits, "maven", &rel);
            }
            if low == "pubspec.yaml" {
                push_hit(&mut hits, "flutter", &rel);
            }
            if low == "go.mod" {
                push_hit(&mut hits, "go", &rel);
            }
            if matches!(low.as_str(), "workspace" | "workspace.bazel" | "module.bazel")
                || file.name == "BUILD"
                || file.name == "BUILD.bazel"
            {
                push_hit(&mut hits, "bazel", &rel);
            }
            if low == "sconstruct" || low == "sconscript" {
                push_hit(&mut hits, "scons", &rel);
            }
        }
    }

    folder_hints.sort();
    if folder_hints.iter().any(|h| h == "android") {
        push_hit(&mut hits, "android_gradle", "folder-hint:android");
    }
    if folder_hints.iter().any(|h| h == "linux") {
        push_hit(&mut hits, "make_like", "folder-hint:linux");
    }

    let types = decide_types(&hits, &cmake_flavors);
    info!(
        types = %types.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", "),
        "classification complete"
    );
    debug!(?folder_hints, cmake_descriptors = cmake_flavors.len(), "evidence details");

    Classification {
        types,
        hits,
        cmake_flavors,
        folder_hints,
    }
}

fn push_hit(hits: &mut BTreeMap<String, Vec<String>>, bucket: &str, rel: &str) {
    hits.get_mut(bucket)
        .expect("bucket table covers all rule outputs")
        .push(rel.to_string());
}

fn decide_types(hits: &BTreeMap<String, Vec<String>>, flavors: &[CmakeFlavor]) -> Vec<BuildType> {
    let non_empty = |bucket: &str| hits.get(bucket).is_some_and(|v| !v.is_empty());

    let mut detected = Vec::new();
    if non_empty("android_gradle") {
        detected.push(BuildType::Android);
    }
    if non_empty("cmakelists") {
        detected.push(BuildType::Cmake);
        if flavors.iter().any(|f| f.flavor == CmakeFlavorKind::Desktop) {
            detected.push(BuildType::Linux);
        }
    }
    if non_empty("make_like") {
        detected.push(BuildType::Linux);
    }
    if non_empty("node") {
        detected.push(BuildType::Node);
    }
    if non_empty("python") {
        detected.push(BuildType::Python);
    }
    if non_empty("rust") {
        detected.push(BuildType::Rust);
    }
    if non_empty("dotnet") {
        detected.push(BuildType::Dotnet);
    }
    if non_empty("maven") {
        detected.push(BuildType::Maven);
    }
    if non_empty("flutter") {
        detected.push(BuildType::Flutter);
    }
    if non_empty("go") {
        detected.push(BuildType::Go);
    }
    if non_empty("bazel") {
        detected.push(BuildType::Bazel);
    }
    if non_empty("scons") {
        detected.push(BuildType::Scons);
    }
    if detected.is_empty() {
        detected.push(BuildType::Unknown);
    }

    BuildType::PRIORITY
        .iter()
        .filter(|t| detected.contains(*t))
        .copied()
        .collect()
}

/// Writes the classification artifacts under the state directory.
pub fn write_artifacts(root: &Path, classification: &Classification) -> anyhow::Result<()> {
    let dir = artifacts::ensure_state_dir(root)?;

    fs::write(
        dir.join(artifacts::DETECTED_JSON),
        serde_json::to_string_pretty(&serde_json::json!({ "types": classification.types }))?,
    )?;
    fs::write(
        dir.join(artifacts::SCAN_JSON),
        serde_json::to_string_pretty(classification)?,
    )?;

    let labels: &[(&str, &str)] = &[
        ("android_gradle", "Android Gradle files"),
        ("cmakelists", "CMake files"),
        ("make_like", "Make/Meson/Ninja signals"),
        ("node", "Node projects"),
        ("python", "Python projects"),
        ("rust", "Rust projects"),
        ("dotnet", ".NET projects"),
        ("maven", "Maven projects"),
        ("flutter", "Flutter projects"),
        ("go", "Go projects"),
        ("bazel", "Bazel signals"),
        ("scons", "SCons signals"),
    ];

    let mut summary = Vec::new();
    summary.push(format!(
        "[{}] buildmend classifier scan",
        chrono::Utc::now().to_rfc3339()
    ));
    summary.push(format!(
        "Detected build types: {}",
        classification
            .types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    summary.push(String::new());
    for (bucket, label) in labels {
        if let Some(paths) = classification.hits.get(*bucket) {
            if !paths.is_empty() {
                summary.push(format!("- {}: {}", label, paths.len()));
            }
        }
    }
    fs::write(dir.join(artifacts::SUMMARY_TXT), summary.join("\n"))?;

    let mut log = summary;
    log.push(String::new());
    log.push("Detailed file hits:".to_string());
    for (bucket, paths) in &classification.hits {
        if !paths.is_empty() {
            log.push(format!("{}:", bucket));
            for p in paths {
                log.push(format!("  - {}", p));
            }
        }
    }
    if !classification.cmake_flavors.is_empty() {
        log.push(String::new());
        log.push("cmake_flavors:".to_string());
        for f in &classification.cmake_flavors {
            log.push(format!(
                "  - {} -> {}",
                f.path,
                match f.flavor {
                    CmakeFlavorKind::Android => "android",
                    CmakeFlavorKind::Desktop => "desktop",
                }
            ));
        }
    }
    fs::write(dir.join(artifacts::SCAN_LOG), log.join("\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan_tree;
    use std::fs;
    use tempfile::TempDir;

    fn classify_dir(tmp: &TempDir) -> Classification {
        let inventory = scan_tree(tmp.path());
        classify(tmp.path(), &inventory)
    }

    #[test]
    fn empty_tree_falls_back_to_unknown() {
        let tmp = TempDir::new().unwrap();
        let c = classify_dir(&tmp);
        assert_eq!(c.types, vec![BuildType::Unknown]);
    }

    #[test]
    fn desktop_cmake_is_not_android() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("CMakeLists.txt"),
            "project(demo)\nadd_executable(demo main.c)\n",
        )
        .unwrap();
        let c = classify_dir(&tmp);
        assert!(c.types.contains(&BuildType::Cmake));
        assert!(!c.types.contains(&BuildType::Android));
        assert_eq!(c.cmake_flavors[0].flavor, CmakeFlavorKind::Desktop);
    }

    #[test]
    fn ndk_keywords_flavor_cmake_as_android() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("CMakeLists.txt"),
            "set(ANDROID_ABI arm64-v8a)\nfind_library(log-lib log)\n",
        )
        .unwrap();
        let c = classify_dir(&tmp);
        assert_eq!(c.cmake_flavors[0].flavor, CmakeFlavorKind::Android);
        // No desktop flavor present, so no linux category from cmake.
        assert!(!c.types.contains(&BuildType::Linux));
    }

    #[test]
    fn ambiguous_cmake_defaults_to_desktop() {
        assert_eq!(
            cmake_flavor_of("cmake_minimum_required(VERSION 3.10)"),
            CmakeFlavorKind::Desktop
        );
    }

    #[test]
    fn gradle_files_classify_as_android() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("build.gradle.kts"), "plugins {}").unwrap();
        fs::write(tmp.path().join("settings.gradle"), "include ':app'").unwrap();
        let c = classify_dir(&tmp);
        assert_eq!(c.primary(), BuildType::Android);
    }

    #[test]
    fn android_folder_hint_contributes_evidence() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("android")).unwrap();
        fs::write(tmp.path().join("android/notes.txt"), "x").unwrap();
        let c = classify_dir(&tmp);
        assert!(c
            .hits
            .get("android_gradle")
            .unwrap()
            .contains(&"folder-hint:android".to_string()));
        assert!(c.types.contains(&BuildType::Android));
        assert!(c.folder_hints.contains(&"android".to_string()));
    }

    #[test]
    fn categories_come_out_in_priority_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("go.mod"), "module demo").unwrap();
        fs::write(tmp.path().join("Cargo.toml"), "[package]").unwrap();
        fs::write(tmp.path().join("Makefile"), "all:").unwrap();
        let c = classify_dir(&tmp);
        assert_eq!(
            c.types,
            vec![BuildType::Linux, BuildType::Rust, BuildType::Go]
        );
    }

    #[test]
    fn classification_is_stable_across_runs() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("package.json"), "{}").unwrap();
        fs::write(tmp.path().join("pom.xml"), "<project/>").unwrap();
        let first = classify_dir(&tmp);
        let second = classify_dir(&tmp);
        assert_eq!(first.types, second.types);
        assert_eq!(first.hits, second.hits);
    }

    #[test]
    fn mk_extension_counts_as_make_like() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("rules.mk"), "all:").unwrap();
        let c = classify_dir(&tmp);
        assert!(c.types.contains(&BuildType::Linux));
    }

    #[test]
    fn bazel_markers_detected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("WORKSPACE"), "").unwrap();
        fs::write(tmp.path().join("BUILD"), "").unwrap();
        let c = classify_dir(&tmp);
        assert!(c.types.contains(&BuildType::Bazel));
    }

    #[test]
    fn artifacts_round_trip() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("go.mod"), "module demo").unwrap();
        let c = classify_dir(&tmp);
        write_artifacts(tmp.path(), &c).unwrap();

        let detected: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(
                tmp.path()
                    .join(artifacts::STATE_DIR)
                    .join(artifacts::DETECTED_JSON),
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(detected["types"][0], "go");

        let scan_log = fs::read_to_string(
            tmp.path()
                .join(artifacts::STATE_DIR)
                .join(artifacts::SCAN_LOG),
        )
        .unwrap();
        assert!(scan_log.contains("go.mod"));
    }
}

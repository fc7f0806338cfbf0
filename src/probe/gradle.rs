//! Gradle build-command synthesis.
//!
//! The Android path is the hardest part of command synthesis: a tree may
//! carry several wrapper scripts, each with (or without) a settings
//! descriptor declaring modules. Wrappers are ranked deterministically,
//! the winner is queried for its task list, and the invocation is chosen
//! from a fixed task priority, falling back to module-qualified names and
//! finally to an unconditional debug assembly so the real tool surfaces
//! the true problem.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::repo;

/// Plain task names, in selection priority order.
pub const TASK_CANDIDATES: [&str; 5] = [
    "assembleDebug",
    "bundleDebug",
    "assembleRelease",
    "bundleRelease",
    "build",
];

/// Module names worth guessing when settings declared nothing useful.
const MODULE_GUESSES: [&str; 3] = ["app", "mobile", "android"];

/// A module declared by a settings descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradleModule {
    /// Declared identifier without the leading separator, e.g. `lib:core`.
    pub name: String,
    /// Resolved directory relative to the wrapper.
    pub dir: PathBuf,
    /// Whether the module's build descriptor declares an application plugin.
    pub is_app: bool,
}

/// A wrapper script plus the evidence used to rank it.
#[derive(Debug, Clone)]
pub struct WrapperCandidate {
    /// Absolute path to the wrapper script.
    pub wrapper: PathBuf,
    /// Segments between the scan root and the wrapper.
    pub depth: usize,
    pub has_settings: bool,
    pub modules: Vec<GradleModule>,
}

impl WrapperCandidate {
    pub fn has_app_module(&self) -> bool {
        self.modules.iter().any(|m| m.is_app)
    }
}

/// Parses module identifiers from a settings descriptor.
///
/// Both call-style `include(":a", ":b")` and bare-statement
/// `include ':app', ':lib:core'` declarations are recognized. Entries are
/// split on commas and whitespace, stripped of quoting, required to start
/// with `:`, and deduplicated preserving first occurrence.
pub fn parse_modules(settings_text: &str) -> Vec<String> {
    static CALL_STYLE: OnceLock<Regex> = OnceLock::new();
    static BARE_STYLE: OnceLock<Regex> = OnceLock::new();
    let call = CALL_STYLE.get_or_init(|| Regex::new(r"(?s)include\s*\((.*?)\)").unwrap());
    let bare = BARE_STYLE.get_or_init(|| Regex::new(r"(?m)^\s*include\s+([^(\n][^\n]*)$").unwrap());

    let mut raw_lists: Vec<&str> = Vec::new();
    for caps in call.captures_iter(settings_text) {
        if let Some(m) = caps.get(1) {
            raw_lists.push(m.as_str());
        }
    }
    for caps in bare.captures_iter(settings_text) {
        if let Some(m) = caps.get(1) {
            raw_lists.push(m.as_str());
        }
    }

    const SEPARATORS: &[char] = &[',', ' ', '\t', '\n', '\r'];
    const QUOTES: &[char] = &['"', '\''];
    let mut modules = Vec::new();
    for raw in raw_lists {
        for part in raw.split(SEPARATORS) {
            let part = part.trim().trim_matches(QUOTES);
            if let Some(name) = part.strip_prefix(':') {
                if !name.is_empty() && !modules.contains(&name.to_string()) {
                    modules.push(name.to_string());
                }
            }
        }
    }
    modules
}

/// True when the directory's build descriptor declares an application plugin.
fn is_app_module(dir: &Path) -> bool {
    for fname in ["build.gradle", "build.gradle.kts"] {
        if let Ok(text) = std::fs::read_to_string(dir.join(fname)) {
            if text.contains("com.android.application") {
                return true;
            }
        }
    }
    false
}

/// Enumerates every wrapper script under `root`, root wrapper first.
pub fn find_wrappers(root: &Path) -> Vec<PathBuf> {
    let mut wrappers = Vec::new();
    let root_wrapper = root.join("gradlew");
    if root_wrapper.is_file() {
        wrappers.push(root_wrapper);
    }
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == ".git"))
        .flatten()
    {
        if entry.file_type().is_file()
            && entry.file_name() == "gradlew"
            && !wrappers.contains(&entry.path().to_path_buf())
        {
            wrappers.push(entry.path().to_path_buf());
        }
    }
    wrappers
}

/// Builds the ranking evidence for one wrapper.
pub fn inspect_wrapper(root: &Path, wrapper: &Path) -> WrapperCandidate {
    let dir = wrapper.parent().unwrap_or(root);
    let settings = ["settings.gradle", "settings.gradle.kts"]
        .iter()
        .map(|n| dir.join(n))
        .find(|p| p.is_file());
    let has_settings = settings.is_some();

    let names = settings
        .and_then(|p| std::fs::read_to_string(p).ok())
        .map(|text| parse_modules(&text))
        .unwrap_or_default();

    let modules = names
        .into_iter()
        .map(|name| {
            let module_dir = dir.join(name.replace(':', "/"));
            let is_app = is_app_module(&module_dir);
            GradleModule {
                name,
                dir: module_dir,
                is_app,
            }
        })
        .collect();

    let depth = wrapper
        .strip_prefix(root)
        .map(|p| p.components().count())
        .unwrap_or(usize::MAX);

    WrapperCandidate {
        wrapper: wrapper.to_path_buf(),
        depth,
        has_settings,
        modules,
    }
}

/// Ranks wrapper candidates in place.
///
/// Settings presence beats absence, an app module beats none, and the
/// shallower path wins ties. The sort is stable, so equal candidates keep
/// discovery order and the choice is reproducible run-to-run.
pub fn rank_wrappers(candidates: &mut [WrapperCandidate]) {
    candidates.sort_by_key(|c| (!c.has_settings, !c.has_app_module(), c.depth));
}

/// True when `name` appears as a distinct token in the task listing.
fn task_exists(tasks_out: &str, name: &str) -> bool {
    let pattern = format!(r"(^|\s){}(\s|$)", regex::escape(name));
    Regex::new(&pattern)
        .map(|re| re.is_match(tasks_out))
        .unwrap_or(false)
}

/// Chooses the build task from a task listing.
///
/// Plain candidates first, then module-qualified names from the declared
/// modules, then from the common-name guesses. `None` means nothing in
/// the listing matched.
pub fn choose_task(tasks_out: &str, modules: &[String]) -> Option<String> {
    for task in TASK_CANDIDATES {
        if task_exists(tasks_out, task) {
            return Some(task.to_string());
        }
    }

    let qualified_tasks = &TASK_CANDIDATES[..4];
    for module in modules.iter().map(String::as_str).chain(MODULE_GUESSES) {
        for task in qualified_tasks {
            let name = format!(":{}:{}", module, task);
            if task_exists(tasks_out, &name) {
                return Some(name);
            }
        }
    }
    None
}

#[cfg(unix)]
fn mark_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)) {
        warn!(path = %path.display(), error = %err, "could not mark wrapper executable");
    }
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) {}

/// Synthesizes the Android build invocation for `root`.
pub fn synthesize(root: &Path) -> String {
    let wrappers = find_wrappers(root);
    if wrappers.is_empty() {
        debug!("no gradle wrapper found, using generic invocation");
        return "./gradlew assembleDebug --stacktrace".to_string();
    }

    let mut candidates: Vec<WrapperCandidate> = wrappers
        .iter()
        .map(|w| inspect_wrapper(root, w))
        .collect();
    rank_wrappers(&mut candidates);
    let best = &candidates[0];
    let wrapper_dir = best.wrapper.parent().unwrap_or(root);
    info!(
        wrapper = %best.wrapper.display(),
        has_settings = best.has_settings,
        modules = best.modules.len(),
        "selected gradle wrapper"
    );

    mark_executable(&best.wrapper);

    // Non-zero exit still produces a usable listing; scan whatever printed.
    let tasks_out = repo::sh("./gradlew -q tasks --all", wrapper_dir).output;
    let module_names: Vec<String> = best.modules.iter().map(|m| m.name.clone()).collect();
    let task = choose_task(&tasks_out, &module_names).unwrap_or_else(|| {
        debug!("no known task in listing, falling back to assembleDebug");
        "assembleDebug".to_string()
    });

    let rel_dir = wrapper_dir.strip_prefix(root).unwrap_or(wrapper_dir);
    if rel_dir.as_os_str().is_empty() {
        format!("./gradlew {} --stacktrace", task)
    } else {
        format!(
            "cd \"{}\" && ./gradlew {} --stacktrace",
            rel_dir.display(),
            task
        )
    }
}

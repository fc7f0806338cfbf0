//! Generated CI pipeline definition.
//!
//! Emits a manually triggered GitHub Actions workflow that exposes the
//! detected categories as a choice input, defaulting to the
//! highest-priority detection. The android branch invokes live planning;
//! every other branch is a placeholder. Purely declarative output; the
//! enumeration is exactly what the classifier produced.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::classify::BuildType;

/// Workflow file location relative to the repository root.
pub const WORKFLOW_PATH: &str = ".github/workflows/buildmend-probe.yml";

fn android_branch() -> String {
    r#"      # ===== Android (live) =====
      - name: Plan android build
        if: ${{ inputs.target == 'android' }}
        run: |
          set -euxo pipefail
          buildmend probe --target android
"#
    .to_string()
}

fn placeholder_branch(target: &str) -> String {
    format!(
        r#"      - name: Probe {target} (placeholder)
        if: ${{{{ inputs.target == '{target}' }}}}
        run: echo "{target} branch is not automated yet"
"#
    )
}

/// Writes the probe workflow for the detected categories.
///
/// Returns the path of the generated file. An empty detection still
/// produces a valid workflow with the single `unknown` option.
pub fn generate_probe_workflow(root: &Path, types: &[BuildType]) -> Result<PathBuf> {
    let types: Vec<BuildType> = if types.is_empty() {
        vec![BuildType::Unknown]
    } else {
        types.to_vec()
    };

    let options = types
        .iter()
        .map(|t| format!("          - {}", t.as_str()))
        .collect::<Vec<_>>()
        .join("\n");
    let default = types[0].as_str();

    let branches = types
        .iter()
        .map(|t| match t {
            BuildType::Android => android_branch(),
            other => placeholder_branch(other.as_str()),
        })
        .collect::<Vec<_>>()
        .join("\n");

    let yml = format!(
        r#"name: buildmend - Probe

on:
  workflow_dispatch:
    inputs:
      target:
        description: "Build category to probe"
        required: true
        type: choice
        default: {default}
        options:
{options}

permissions:
  contents: write
  pull-requests: write

jobs:
  probe:
    runs-on: ubuntu-latest
    steps:
      - name: Checkout (no credentials)
        uses: actions/checkout@v4
        with:
          fetch-depth: 0
          persist-credentials: false

      - name: Probe build command
        id: probe
        run: |
          set -euxo pipefail
          buildmend probe --target "${{{{ inputs.target }}}}"

      - name: Upload probe report
        if: always()
        uses: actions/upload-artifact@v4
        with:
          name: buildmend-probe-report
          path: |
            .buildmend/probe_report.json
            .buildmend/probe_report.log
          if-no-files-found: warn
          retention-days: 7

{branches}"#
    );

    let path = root.join(WORKFLOW_PATH);
    let dir = path.parent().expect("workflow path has a parent");
    fs::create_dir_all(dir).with_context(|| format!("failed to create {:?}", dir))?;
    fs::write(&path, yml).with_context(|| format!("failed to write {:?}", path))?;
    info!(path = %path.display(), "generated probe workflow");
    Ok(path)
}

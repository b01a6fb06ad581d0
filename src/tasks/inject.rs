// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Index injection task
//!
//! Replaces `<!-- inject:js -->` / `<!-- inject:css -->` ... `<!-- endinject -->`
//! blocks in an HTML template with tags referencing built assets.

use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::patterns::{self, MatchedFile};
use crate::errors::AssetflowError;
use crate::pipeline::PatternSet;

/// Settings for one injection run
#[derive(Debug, Clone)]
pub struct InjectOptions<'a> {
    pub template: &'a Path,
    pub sources: &'a PatternSet,
    pub dest: &'a Path,
    pub ignore_path: Option<&'a str>,
    pub add_root_slash: bool,
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?s)([ \t]*)<!--\s*inject:(\w+)\s*-->.*?<!--\s*endinject\s*-->")
            .expect("injection marker regex is valid")
    })
}

/// Render the template and write it into `dest`; returns the written path
pub async fn run(root: &Path, options: &InjectOptions<'_>) -> Result<PathBuf, AssetflowError> {
    let template_path = root.join(options.template);
    let template = tokio::fs::read_to_string(&template_path)
        .await
        .map_err(|e| AssetflowError::FileRead {
            path: template_path.clone(),
            error: e.to_string(),
        })?;

    let sources = patterns::resolve(options.sources, root)?;
    let references: Vec<String> = sources
        .iter()
        .map(|file| reference_path(file, root, options.ignore_path, options.add_root_slash))
        .collect();

    tracing::debug!(
        template = %options.template.display(),
        sources = references.len(),
        "injecting asset references"
    );

    let rendered = render(&template, &references);

    let file_name = template_path
        .file_name()
        .ok_or_else(|| AssetflowError::InvalidConfig {
            reason: format!("template '{}' has no file name", options.template.display()),
            help: None,
        })?;
    let dest_dir = root.join(options.dest);
    tokio::fs::create_dir_all(&dest_dir)
        .await
        .map_err(|e| AssetflowError::FileWrite {
            path: dest_dir.clone(),
            error: e.to_string(),
        })?;

    let output = dest_dir.join(file_name);
    tokio::fs::write(&output, rendered)
        .await
        .map_err(|e| AssetflowError::FileWrite {
            path: output.clone(),
            error: e.to_string(),
        })?;

    Ok(output)
}

/// Replace every injection block with tags for the matching references
pub fn render(template: &str, references: &[String]) -> String {
    marker_regex()
        .replace_all(template, |caps: &Captures| {
            let indent = &caps[1];
            let kind = &caps[2];

            let mut block = format!("{indent}<!-- inject:{kind} -->\n");
            for reference in references.iter().filter(|r| has_extension(r, kind)) {
                if let Some(tag) = tag_for(kind, reference) {
                    block.push_str(&format!("{indent}{tag}\n"));
                }
            }
            block.push_str(&format!("{indent}<!-- endinject -->"));
            block
        })
        .into_owned()
}

fn has_extension(reference: &str, kind: &str) -> bool {
    Path::new(reference)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(kind))
}

fn tag_for(kind: &str, reference: &str) -> Option<String> {
    match kind {
        "js" => Some(format!("<script src=\"{}\"></script>", reference)),
        "css" => Some(format!("<link rel=\"stylesheet\" href=\"{}\">", reference)),
        _ => None,
    }
}

/// Root-relative reference with `ignore_path` stripped
///
/// `build/contents/js/all.js` with `ignore_path = "/build/"` becomes
/// `contents/js/all.js` (or `/contents/js/all.js` with `add_root_slash`).
pub fn reference_path(
    file: &MatchedFile,
    root: &Path,
    ignore_path: Option<&str>,
    add_root_slash: bool,
) -> String {
    let relative = file.path.strip_prefix(root).unwrap_or(&file.path);
    let mut reference = format!(
        "/{}",
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    );

    if let Some(prefix) = ignore_path {
        let prefix = format!("/{}", prefix.trim_matches('/'));
        if let Some(rest) = reference.strip_prefix(&prefix) {
            if rest.is_empty() || rest.starts_with('/') {
                reference = rest.to_string();
            }
        }
    }

    let bare = reference.trim_start_matches('/');
    if add_root_slash {
        format!("/{}", bare)
    } else {
        bare.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "<html>\n<head>\n    <!-- inject:css -->\n    <link rel=\"stylesheet\" href=\"contents/css/dev.css\">\n    <!-- endinject -->\n</head>\n<body>\n  <!-- inject:js -->\n  <!-- endinject -->\n</body>\n</html>\n";

    fn matched(root: &Path, rel: &str) -> MatchedFile {
        MatchedFile {
            path: root.join(rel),
            relative: PathBuf::from(rel),
        }
    }

    #[test]
    fn test_reference_path_strips_build_prefix() {
        let root = Path::new("/project");
        let file = matched(root, "build/contents/js/all.js");

        assert_eq!(
            reference_path(&file, root, Some("/build/"), false),
            "contents/js/all.js"
        );
        assert_eq!(
            reference_path(&file, root, Some("build"), true),
            "/contents/js/all.js"
        );
        assert_eq!(
            reference_path(&file, root, None, false),
            "build/contents/js/all.js"
        );
        // Prefix must match a whole path component
        assert_eq!(
            reference_path(&file, root, Some("/buil"), false),
            "build/contents/js/all.js"
        );
    }

    #[test]
    fn test_render_replaces_blocks() {
        let references = vec![
            "contents/js/all.js".to_string(),
            "contents/css/all.css".to_string(),
        ];
        let html = render(TEMPLATE, &references);

        assert!(html.contains(
            "    <!-- inject:css -->\n    <link rel=\"stylesheet\" href=\"contents/css/all.css\">\n    <!-- endinject -->"
        ));
        assert!(html.contains(
            "  <!-- inject:js -->\n  <script src=\"contents/js/all.js\"></script>\n  <!-- endinject -->"
        ));
        assert!(!html.contains("dev.css"));
    }

    #[test]
    fn test_render_is_stable() {
        let references = vec!["contents/js/all.js".to_string()];
        let once = render(TEMPLATE, &references);
        assert_eq!(render(&once, &references), once);
    }

    #[tokio::test]
    async fn test_run_writes_index() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/index.html"), TEMPLATE).unwrap();
        std::fs::create_dir_all(root.join("build/contents/js")).unwrap();
        std::fs::write(root.join("build/contents/js/all.js"), "x").unwrap();

        let sources: PatternSet = vec!["build/contents/js/*.js", "build/contents/css/*.css"].into();
        let options = InjectOptions {
            template: Path::new("src/index.html"),
            sources: &sources,
            dest: Path::new("build"),
            ignore_path: Some("/build/"),
            add_root_slash: false,
        };

        let output = run(root, &options).await.unwrap();
        assert_eq!(output, root.join("build/index.html"));

        let html = std::fs::read_to_string(output).unwrap();
        assert!(html.contains("<script src=\"contents/js/all.js\"></script>"));
        assert!(!html.contains("<link"));
    }

    #[tokio::test]
    async fn test_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let sources: PatternSet = "build/*.js".into();
        let options = InjectOptions {
            template: Path::new("src/index.html"),
            sources: &sources,
            dest: Path::new("build"),
            ignore_path: None,
            add_root_slash: false,
        };

        assert!(matches!(
            run(dir.path(), &options).await,
            Err(AssetflowError::FileRead { .. })
        ));
    }
}

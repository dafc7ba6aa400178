//! Test selection: files, directories, `file::test-id`, markers

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

use super::config::{FlowFile, TestCase};

/// Separator between a file path and a test id
pub const ID_SEPARATOR: &str = "::";

/// One flow file to run, optionally narrowed to a single test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub file: PathBuf,
    pub test_id: Option<String>,
}

/// Parse a single CLI target (`path` or `path::test-id`)
pub fn parse_target(target: &str) -> Selection {
    match target.split_once(ID_SEPARATOR) {
        Some((file, id)) if !id.is_empty() => Selection {
            file: PathBuf::from(file),
            test_id: Some(id.to_string()),
        },
        Some((file, _)) => Selection {
            file: PathBuf::from(file),
            test_id: None,
        },
        None => Selection {
            file: PathBuf::from(target),
            test_id: None,
        },
    }
}

/// Expand CLI targets into flow files
///
/// Directories are searched recursively for `*.yaml`/`*.yml`, sorted by
/// path so flows run in a stable order.
pub fn resolve_targets(targets: &[String]) -> Result<Vec<Selection>> {
    let mut selections = Vec::new();

    for target in targets {
        let selection = parse_target(target);

        if selection.file.is_dir() {
            if selection.test_id.is_some() {
                return Err(Error::Config(format!(
                    "'{}': a test id can only follow a file, not a directory",
                    target
                )));
            }
            let mut files = Vec::new();
            collect_flow_files(&selection.file, &mut files)?;
            files.sort();
            selections.extend(files.into_iter().map(|file| Selection {
                file,
                test_id: None,
            }));
        } else if selection.file.is_file() {
            selections.push(selection);
        } else {
            return Err(Error::Config(format!(
                "Test target '{}' not found",
                selection.file.display()
            )));
        }
    }

    Ok(selections)
}

fn collect_flow_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_flow_files(&path, out)?;
        } else if is_flow_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_flow_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Whether a test passes the id and marker filters
///
/// With no markers every test matches; otherwise the test's own markers or
/// the flow's markers must include at least one of them.
pub fn test_matches(flow: &FlowFile, test: &TestCase, test_id: Option<&str>, markers: &[String]) -> bool {
    if let Some(id) = test_id {
        if test.id != id {
            return false;
        }
    }
    if markers.is_empty() {
        return true;
    }
    markers
        .iter()
        .any(|m| test.markers.contains(m) || flow.markers.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target("flows/user.yaml"),
            Selection {
                file: PathBuf::from("flows/user.yaml"),
                test_id: None
            }
        );
        assert_eq!(
            parse_target("flows/user.yaml::create_user"),
            Selection {
                file: PathBuf::from("flows/user.yaml"),
                test_id: Some("create_user".to_string())
            }
        );
        assert_eq!(parse_target("flows/user.yaml::").test_id, None);
    }

    #[test]
    fn test_resolve_directory_sorted_and_recursive() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.yaml"), "").unwrap();
        std::fs::write(dir.path().join("a.yml"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("sub").join("c.yaml"), "").unwrap();

        let selections =
            resolve_targets(&[dir.path().display().to_string()]).unwrap();
        let names: Vec<_> = selections
            .iter()
            .map(|s| s.file.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.yml"),
                PathBuf::from("b.yaml"),
                PathBuf::from("sub").join("c.yaml")
            ]
        );
    }

    #[test]
    fn test_resolve_missing_target() {
        let result = resolve_targets(&["/nonexistent/flow.yaml".to_string()]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_marker_matching() {
        let flow: FlowFile = serde_yaml::from_str(
            "name: f\nmarkers: [flow]\ntests:\n  - id: a\n    markers: [p0]\n    steps: []\n  - id: b\n    steps: []\n",
        )
        .unwrap();
        let (a, b) = (&flow.tests[0], &flow.tests[1]);

        assert!(test_matches(&flow, a, None, &[]));
        assert!(test_matches(&flow, a, None, &["p0".to_string()]));
        assert!(!test_matches(&flow, b, None, &["p0".to_string()]));
        assert!(test_matches(&flow, b, None, &["flow".to_string()]));
        assert!(test_matches(&flow, b, Some("b"), &[]));
        assert!(!test_matches(&flow, a, Some("b"), &[]));
    }
}

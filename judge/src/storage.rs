//! File-backed problem store and submission sink
//!
//! Problems live under a root directory, one directory per problem:
//!
//! ```text
//! problems/
//!   sum/
//!     problem.toml        optional: title, time_limit_ms
//!     tests.json          [{"name", "input", "output", "type"}, ...]
//!     tests/              used when tests.json is absent
//!       01/in
//!       01/out
//!       01/kind           optional: "example" or "test"
//! ```
//!
//! `tests.json` keeps its record order; test directories are ordered by name.
//!
//! Every test directory needs its own `out` file. A `solution.py` next to
//! `tests/` is not run to produce missing expected outputs; such problems
//! must be exported with their outputs first (e.g. as `tests.json`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::{Problem, SubmissionId, SubmissionRecord, TestCase, TestKind};
use crate::error::{JudgeError, Result};

/// Read access to problems and their test cases
#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn problem(&self, id: &str) -> Result<Problem>;

    /// Test cases of `kind` (or all of them) in stored order
    async fn test_cases(&self, id: &str, kind: Option<TestKind>) -> Result<Vec<TestCase>> {
        Ok(self.problem(id).await?.tests_of_kind(kind))
    }
}

/// Persists completed submissions
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn record_submission(&self, record: &SubmissionRecord) -> Result<SubmissionId>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProblemMeta {
    title: Option<String>,
    time_limit_ms: Option<u32>,
}

/// Problems stored as plain files under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn load(&self, id: &str) -> Result<Problem> {
        let fail = |reason: String| JudgeError::ProblemLoad {
            name: id.to_string(),
            reason,
        };

        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(fail("invalid problem name".into()));
        }
        let dir = self.root.join(id);
        if !is_dir(&dir).await {
            return Err(fail(format!("{} is not a directory", dir.display())));
        }

        let meta = match read_optional(&dir.join("problem.toml")).await? {
            Some(content) => {
                toml::from_str::<ProblemMeta>(&content).map_err(|e| fail(e.to_string()))?
            }
            None => ProblemMeta::default(),
        };

        let tests = match read_optional(&dir.join("tests.json")).await? {
            Some(content) => {
                serde_json::from_str::<Vec<TestCase>>(&content).map_err(|e| fail(e.to_string()))?
            }
            None => read_test_dirs(&dir.join("tests")).await.map_err(|e| match e {
                JudgeError::Config(reason) => fail(reason),
                other => other,
            })?,
        };

        debug!("Loaded {} test case(s) for {}", tests.len(), id);
        Ok(Problem {
            title: meta.title.unwrap_or_else(|| id.to_string()),
            time_limit_ms: meta.time_limit_ms,
            tests,
        })
    }
}

#[async_trait]
impl ProblemStore for DirectoryStore {
    async fn problem(&self, id: &str) -> Result<Problem> {
        self.load(id).await
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// File content, or None when the file does not exist
async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Layout problems surface as `Config`; the caller attaches the problem name
async fn read_test_dirs(tests_dir: &Path) -> Result<Vec<TestCase>> {
    if !is_dir(tests_dir).await {
        return Err(JudgeError::Config(format!(
            "neither tests.json nor {} found",
            tests_dir.display()
        )));
    }

    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(tests_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let mut tests = Vec::with_capacity(names.len());
    for name in names {
        let dir = tests_dir.join(&name);
        let input = read_optional(&dir.join("in"))
            .await?
            .ok_or_else(|| JudgeError::Config(format!("test {} has no `in` file", name)))?;
        let expected = read_optional(&dir.join("out"))
            .await?
            .ok_or_else(|| {
                JudgeError::Config(format!(
                    "test {} has no `out` file (reference solutions are not run)",
                    name
                ))
            })?;
        let kind = match read_optional(&dir.join("kind")).await?.as_deref().map(str::trim) {
            None | Some("test") => TestKind::Test,
            Some("example") => TestKind::Example,
            Some(other) => {
                return Err(JudgeError::Config(format!(
                    "test {} has unknown kind `{}`",
                    name, other
                )))
            }
        };
        tests.push(TestCase::new(name, input, expected, kind));
    }
    Ok(tests)
}

#[derive(Serialize)]
struct SinkLine<'a> {
    id: SubmissionId,
    #[serde(flatten)]
    record: &'a SubmissionRecord,
}

/// Appends one JSON line per submission
///
/// Ids continue from the number of records already in the file.
pub struct JsonlSink {
    path: PathBuf,
    next_id: Mutex<Option<SubmissionId>>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            next_id: Mutex::new(None),
        }
    }

    async fn existing_records(&self) -> Result<SubmissionId> {
        let count = read_optional(&self.path)
            .await?
            .map(|content| content.lines().filter(|l| !l.trim().is_empty()).count())
            .unwrap_or(0);
        Ok(count as SubmissionId)
    }
}

#[async_trait]
impl SubmissionSink for JsonlSink {
    async fn record_submission(&self, record: &SubmissionRecord) -> Result<SubmissionId> {
        // Held across the write so ids and line order agree
        let mut next_id = self.next_id.lock().await;
        let id = match *next_id {
            Some(id) => id,
            None => self.existing_records().await? + 1,
        };

        let mut line = serde_json::to_string(&SinkLine { id, record })?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        *next_id = Some(id + 1);
        info!(
            "Recorded submission {} ({} on {}) to {}",
            id,
            record.user,
            record.problem,
            self.path.display()
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Evaluation;
    use crate::languages::Language;
    use chrono::Utc;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_test_directories_are_read_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        let sum = root.path().join("sum");
        write(&sum.join("tests/02/in"), "15\n5");
        write(&sum.join("tests/02/out"), "20");
        write(&sum.join("tests/01/in"), "5\n5");
        write(&sum.join("tests/01/out"), "10");
        write(&sum.join("tests/01/kind"), "example\n");
        write(&sum.join("problem.toml"), "time_limit_ms = 2000\n");

        let store = DirectoryStore::new(root.path());
        let problem = store.problem("sum").await.unwrap();

        assert_eq!(problem.title, "sum");
        assert_eq!(problem.time_limit_ms, Some(2000));
        let names: Vec<_> = problem.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["01", "02"]);
        assert_eq!(problem.tests[0].kind, TestKind::Example);
        assert_eq!(problem.tests[1].expected, "20");

        let graded = store.test_cases("sum", Some(TestKind::Test)).await.unwrap();
        assert_eq!(graded.len(), 1);
        assert_eq!(graded[0].input, "15\n5");
    }

    #[tokio::test]
    async fn test_tests_json_keeps_record_order() {
        let root = tempfile::tempdir().unwrap();
        write(
            &root.path().join("sum/tests.json"),
            r#"[
                {"name": "test 2", "input": "15\n5", "output": "20", "type": "test"},
                {"name": "test 1", "input": "5\n5", "output": "10", "type": "example"},
                {"name": "test 3", "input": "2\n3", "output": "5"}
            ]"#,
        );

        let problem = DirectoryStore::new(root.path()).problem("sum").await.unwrap();
        let names: Vec<_> = problem.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["test 2", "test 1", "test 3"]);
        assert_eq!(problem.tests[2].kind, TestKind::Test);
        assert_eq!(problem.time_limit_ms, None);
    }

    #[tokio::test]
    async fn test_broken_layouts_are_load_errors() {
        let root = tempfile::tempdir().unwrap();
        write(&root.path().join("no_out/tests/01/in"), "1");
        write(&root.path().join("bad_kind/tests/01/in"), "1");
        write(&root.path().join("bad_kind/tests/01/out"), "1");
        write(&root.path().join("bad_kind/tests/01/kind"), "hidden");
        write(&root.path().join("bad_json/tests.json"), "{");
        std::fs::create_dir_all(root.path().join("empty")).unwrap();

        let store = DirectoryStore::new(root.path());
        for id in ["no_out", "bad_kind", "bad_json", "empty", "missing", "../etc"] {
            let result = store.problem(id).await;
            assert!(
                matches!(result, Err(JudgeError::ProblemLoad { .. })),
                "{} loaded: {:?}",
                id,
                result
            );
        }
    }

    #[tokio::test]
    async fn test_reference_solution_does_not_stand_in_for_outputs() {
        let root = tempfile::tempdir().unwrap();
        write(
            &root.path().join("sum/solution.py"),
            "print(sum(map(int, open(0).read().split())))\n",
        );
        write(&root.path().join("sum/tests/01/in"), "5\n5");

        let result = DirectoryStore::new(root.path()).problem("sum").await;
        match result {
            Err(JudgeError::ProblemLoad { name, reason }) => {
                assert_eq!(name, "sum");
                assert!(reason.contains("no `out` file"), "{}", reason);
            }
            other => panic!("expected load error, got {:?}", other),
        }
    }

    fn record(user: &str) -> SubmissionRecord {
        SubmissionRecord::new(
            user,
            "sum",
            Language::Cpp,
            "/subs/1/a.cpp",
            "/subs/1",
            Utc::now(),
            Evaluation::build_failed("error: expected ';'"),
        )
    }

    #[tokio::test]
    async fn test_jsonl_sink_appends_and_continues_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submissions.jsonl");

        let sink = JsonlSink::new(&path);
        assert_eq!(sink.record_submission(&record("alice")).await.unwrap(), 1);
        assert_eq!(sink.record_submission(&record("bob")).await.unwrap(), 2);

        // A fresh sink picks up after the existing lines
        let sink = JsonlSink::new(&path);
        assert_eq!(sink.record_submission(&record("carol")).await.unwrap(), 3);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1]["id"], 2);
        assert_eq!(lines[1]["user"], "bob");
        assert_eq!(lines[0]["language"], "cpp");
        assert_eq!(lines[0]["classification"], "error");
        assert_eq!(lines[0]["results"][0]["name"], "compilation");
    }
}

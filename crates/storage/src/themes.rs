use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use quiz_core::model::{Question, QuestionId, Theme, ThemeBank, ThemeError};

/// Errors raised while building the theme catalog at startup. All of them
/// are fatal configuration errors: the process should refuse to launch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThemeLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid theme in {path}: {source}")]
    Invalid { path: PathBuf, source: ThemeError },

    #[error("theme '{tag}' references missing media files: {files:?}")]
    MissingMedia { tag: String, files: Vec<String> },

    #[error(transparent)]
    Catalog(ThemeError),
}

/// On-disk shape of one theme file.
#[derive(Debug, Deserialize)]
struct ThemeFile {
    tag: String,
    name: String,
    questions: Vec<QuestionFile>,
}

#[derive(Debug, Deserialize)]
struct QuestionFile {
    id: u32,
    text: String,
    correct_answer: String,
    #[serde(default)]
    wrong_answers: Vec<String>,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    explanation: Vec<String>,
}

/// Load every `*.json` theme file under `theme_dir` into an immutable
/// catalog, verifying that all referenced media exist under `media_dir`.
///
/// # Errors
///
/// Returns `ThemeLoadError` on the first unreadable, unparsable, or invalid
/// theme file, on any missing media reference, and on duplicate theme tags.
pub fn load_theme_dir(theme_dir: &Path, media_dir: &Path) -> Result<ThemeBank, ThemeLoadError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(theme_dir)
        .map_err(|source| ThemeLoadError::Io {
            path: theme_dir.to_path_buf(),
            source,
        })?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    // Load order defines catalog order; keep it stable across platforms.
    paths.sort();

    let mut themes = Vec::with_capacity(paths.len());
    for path in paths {
        themes.push(load_theme_file(&path, media_dir)?);
    }

    let bank = ThemeBank::new(themes).map_err(ThemeLoadError::Catalog)?;
    log::info!("loaded {} theme(s) from {}", bank.len(), theme_dir.display());
    Ok(bank)
}

fn load_theme_file(path: &Path, media_dir: &Path) -> Result<Theme, ThemeLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ThemeLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let file: ThemeFile = serde_json::from_str(&raw).map_err(|source| ThemeLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let missing: Vec<String> = file
        .questions
        .iter()
        .flat_map(|q| q.files.iter())
        .filter(|name| !media_dir.join(name).is_file())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ThemeLoadError::MissingMedia {
            tag: file.tag,
            files: missing,
        });
    }

    let mut questions = Vec::with_capacity(file.questions.len());
    for q in file.questions {
        let question = Question::new(
            QuestionId::new(q.id),
            q.text,
            q.correct_answer,
            q.wrong_answers,
            q.files,
            q.explanation,
        )
        .map_err(|source| ThemeLoadError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        questions.push(question);
    }

    let theme = Theme::new(file.tag, file.name, questions).map_err(|source| {
        ThemeLoadError::Invalid {
            path: path.to_path_buf(),
            source,
        }
    })?;

    log::info!(
        "loaded {} question(s) for theme '{}' ({})",
        theme.question_count(),
        theme.tag(),
        theme.display_name()
    );
    Ok(theme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_theme(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn theme_json(tag: &str, files: &str) -> String {
        format!(
            r#"{{
                "tag": "{tag}",
                "name": "Theme {tag}",
                "questions": [
                    {{"id": 1, "text": "Q1", "correct_answer": "A1", "files": {files}}},
                    {{"id": 2, "text": "Q2", "correct_answer": "A2", "explanation": ["Because."]}}
                ]
            }}"#
        )
    }

    #[test]
    fn loads_valid_themes_in_path_order() {
        let themes = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        write_theme(themes.path(), "b.json", &theme_json("beta", "[]"));
        write_theme(themes.path(), "a.json", &theme_json("alpha", "[]"));

        let bank = load_theme_dir(themes.path(), media.path()).unwrap();
        let tags: Vec<_> = bank.iter().map(Theme::tag).collect();
        assert_eq!(tags, vec!["alpha", "beta"]);
        assert_eq!(bank.get("alpha").unwrap().question_count(), 2);
    }

    #[test]
    fn missing_media_aborts_loading() {
        let themes = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        write_theme(
            themes.path(),
            "a.json",
            &theme_json("alpha", r#"["gone.ogg"]"#),
        );

        let err = load_theme_dir(themes.path(), media.path()).unwrap_err();
        assert!(matches!(err, ThemeLoadError::MissingMedia { tag, files }
            if tag == "alpha" && files == vec!["gone.ogg".to_string()]));
    }

    #[test]
    fn present_media_passes_validation() {
        let themes = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        fs::write(media.path().join("beat.ogg"), b"ogg").unwrap();
        write_theme(
            themes.path(),
            "a.json",
            &theme_json("alpha", r#"["beat.ogg"]"#),
        );

        assert!(load_theme_dir(themes.path(), media.path()).is_ok());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let themes = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        write_theme(themes.path(), "a.json", "{ not json");

        let err = load_theme_dir(themes.path(), media.path()).unwrap_err();
        assert!(matches!(err, ThemeLoadError::Parse { .. }));
    }

    #[test]
    fn duplicate_question_ids_are_invalid() {
        let themes = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        write_theme(
            themes.path(),
            "a.json",
            r#"{
                "tag": "alpha",
                "name": "Alpha",
                "questions": [
                    {"id": 1, "text": "Q1", "correct_answer": "A1"},
                    {"id": 1, "text": "Q2", "correct_answer": "A2"}
                ]
            }"#,
        );

        let err = load_theme_dir(themes.path(), media.path()).unwrap_err();
        assert!(matches!(err, ThemeLoadError::Invalid { .. }));
    }

    #[test]
    fn duplicate_tags_across_files_are_rejected() {
        let themes = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        write_theme(themes.path(), "a.json", &theme_json("alpha", "[]"));
        write_theme(themes.path(), "b.json", &theme_json("alpha", "[]"));

        let err = load_theme_dir(themes.path(), media.path()).unwrap_err();
        assert!(matches!(err, ThemeLoadError::Catalog(_)));
    }
}

// Tests for configuration loading and question selection

use anyhow::Result;
use memory_interview::catalog::{CatalogError, QuestionCatalog};
use memory_interview::config::{Config, TurnConfig};
use std::io::Write;
use std::time::Duration;

fn write_config(contents: &str) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn test_defaults_without_file() -> Result<()> {
    let cfg = Config::load("/nonexistent/memory-interview")?;

    assert_eq!(cfg.service.name, "memory-interview");
    assert_eq!(cfg.prompt.locale, "ko-KR");
    assert_eq!(cfg.recognizer.max_restarts, 5);
    assert_eq!(cfg.recognizer.restart_backoff(), Duration::from_millis(150));
    assert_eq!(cfg.recognizer.stop_timeout(), Duration::from_secs(2));
    assert_eq!(cfg.watchdog.soft_silence(), Duration::from_secs(6));
    assert_eq!(cfg.watchdog.hard_cap(), Duration::from_secs(12));
    assert!(cfg.microphone.level_tap);
    assert!(cfg.catalog.questions.is_empty());

    assert_eq!(cfg.turn_config(), TurnConfig::default());
    Ok(())
}

#[test]
fn test_partial_file_keeps_other_defaults() -> Result<()> {
    let file = write_config(
        r#"
[watchdog]
soft_silence_ms = 4000

[recognizer]
max_restarts = 3

[microphone]
input_path = "fixtures/answer.wav"
"#,
    )?;

    let cfg = Config::load(file.path().to_str().unwrap())?;

    assert_eq!(cfg.watchdog.soft_silence_ms, 4000);
    assert_eq!(cfg.watchdog.hard_cap_ms, 12000);
    assert_eq!(cfg.recognizer.max_restarts, 3);
    assert_eq!(cfg.recognizer.restart_backoff_ms, 150);
    assert_eq!(
        cfg.microphone.input_path.as_deref(),
        Some(std::path::Path::new("fixtures/answer.wav"))
    );
    assert_eq!(cfg.microphone.sample_rate, 16000);

    let turn = cfg.turn_config();
    assert_eq!(turn.watchdog.soft_silence_ms, 4000);
    assert_eq!(turn.prompt.rate, 0.9);
    Ok(())
}

#[test]
fn test_catalog_from_config() -> Result<()> {
    let file = write_config(
        r#"
[[catalog.questions]]
id = "a"
prompt = "요즘 잠은 잘 주무세요?"

[[catalog.questions]]
id = "b"
prompt = "최근에 길을 잃은 적이 있나요?"
"#,
    )?;

    let cfg = Config::load(file.path().to_str().unwrap())?;
    let catalog = QuestionCatalog::from_config(&cfg.catalog);

    assert_eq!(catalog.questions().len(), 2);
    assert_eq!(catalog.get("b").unwrap().prompt_text, "최근에 길을 잃은 적이 있나요?");
    assert!(catalog.get("q1").is_none());
    Ok(())
}

#[test]
fn test_shipped_config_loads() -> Result<()> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/memory-interview");
    let cfg = Config::load(path)?;

    assert_eq!(cfg.service.http.port, 8087);
    assert_eq!(cfg.turn_config(), {
        let mut expected = TurnConfig::default();
        expected.microphone.input_path = Some("fixtures/answer.wav".into());
        expected
    });
    Ok(())
}

#[test]
fn test_builtin_catalog() {
    let catalog = QuestionCatalog::builtin();
    let ids: Vec<_> = catalog.questions().iter().map(|q| q.id.as_str()).collect();

    assert_eq!(ids, vec!["q1", "q2", "q3", "q4"]);
    assert!(catalog.questions().iter().all(|q| q.prompt_text.ends_with('?')));
}

#[test]
fn test_select_keeps_user_order() {
    let catalog = QuestionCatalog::builtin();
    let selected = catalog.select(&["q3", "q1"]).unwrap();

    assert_eq!(selected.len(), 2);
    assert_eq!(selected[0].id, "q3");
    assert_eq!(selected[1].id, "q1");
}

#[test]
fn test_select_rejects_bad_selections() {
    let catalog = QuestionCatalog::builtin();

    assert_eq!(
        catalog.select::<&str>(&[]),
        Err(CatalogError::EmptySelection)
    );
    assert_eq!(
        catalog.select(&["q1", "q9"]),
        Err(CatalogError::UnknownQuestion("q9".to_string()))
    );
    assert_eq!(
        catalog.select(&["q2", "q2"]),
        Err(CatalogError::DuplicateQuestion("q2".to_string()))
    );
}

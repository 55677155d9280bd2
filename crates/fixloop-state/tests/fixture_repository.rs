//! Integration tests for the file-backed fixture repository.

use fixloop_state::storage_traits::{FixtureRepository, FixtureSet, TestInput};
use fixloop_state::JsonFixtureRepository;
use serde_json::json;
use std::fs;

fn write_fixture(root: &std::path::Path, problem: &str, set: &str, body: &str) {
    let dir = root.join(problem);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{set}.jsonl")), body).unwrap();
}

#[tokio::test]
async fn loads_python_literal_fixtures() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        dir.path(),
        "p084",
        "official",
        r#"[{"input": "[(1, 2), (10, -3)]", "output": "[3, 7]"}]"#,
    );

    let repo = JsonFixtureRepository::new(dir.path());
    let cases = repo.load("p084", FixtureSet::Official).await.unwrap();

    assert_eq!(cases.len(), 2);
    assert_eq!(cases[1].input, TestInput::Args(vec![json!(10), json!(-3)]));
    assert_eq!(cases[1].expected, json!(7));
}

#[tokio::test]
async fn wide_integer_outputs_keep_every_digit() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        dir.path(),
        "p090",
        "official",
        r#"[{"input": "[20, 21]", "output": "[100000000000000000001, -1000000000000000000001]"}]"#,
    );
    write_fixture(
        dir.path(),
        "p091",
        "official",
        r#"[{"input": [20], "output": [100000000000000000001]}]"#,
    );

    let repo = JsonFixtureRepository::new(dir.path());
    let from_literal = repo.load("p090", FixtureSet::Official).await.unwrap();
    assert_eq!(from_literal[0].expected.to_string(), "100000000000000000001");
    assert_eq!(from_literal[1].expected.to_string(), "-1000000000000000000001");
    let from_json = repo.load("p091", FixtureSet::Official).await.unwrap();
    assert_eq!(from_json[0].expected.to_string(), "100000000000000000001");
}

#[tokio::test]
async fn default_yes_no_problem_is_remapped() {
    let dir = tempfile::tempdir().unwrap();
    let body = r#"[{"input": "['abc', 'a']", "output": "[True, False]"}]"#;
    write_fixture(dir.path(), "p126", "generated", body);
    write_fixture(dir.path(), "p131", "generated", body);

    let repo = JsonFixtureRepository::new(dir.path());
    let remapped = repo.load("p126", FixtureSet::Generated).await.unwrap();
    let plain = repo.load("p131", FixtureSet::Generated).await.unwrap();

    assert_eq!(remapped[0].expected, json!("Yes"));
    assert_eq!(remapped[1].expected, json!("No"));
    assert_eq!(plain[0].expected, json!(true));
}

#[tokio::test]
async fn custom_yes_no_problems_replace_default() {
    let dir = tempfile::tempdir().unwrap();
    let body = r#"[{"input": [1], "output": [true]}]"#;
    write_fixture(dir.path(), "p126", "official", body);
    write_fixture(dir.path(), "p200", "official", body);

    let repo = JsonFixtureRepository::new(dir.path()).with_yes_no_problems(["p200"]);
    assert_eq!(
        repo.load("p126", FixtureSet::Official).await.unwrap()[0].expected,
        json!(true)
    );
    assert_eq!(
        repo.load("p200", FixtureSet::Official).await.unwrap()[0].expected,
        json!("Yes")
    );
}

#[tokio::test]
async fn missing_file_yields_empty_set() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFixtureRepository::new(dir.path());
    assert!(repo
        .load("p404", FixtureSet::Official)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn malformed_file_yields_empty_set() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "p500", "official", "{not json");
    write_fixture(
        dir.path(),
        "p501",
        "official",
        r#"[{"input": "[open('x')]", "output": "[1]"}]"#,
    );

    let repo = JsonFixtureRepository::new(dir.path());
    assert!(repo.load("p500", FixtureSet::Official).await.unwrap().is_empty());
    assert!(repo.load("p501", FixtureSet::Official).await.unwrap().is_empty());
}

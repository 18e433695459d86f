mod common;

use common::{commit_all, grit, init_repo, write_file};
use predicates::prelude::*;

fn three_commits() -> assert_fs::TempDir {
    let repo = init_repo();
    for (index, message) in ["first", "second", "third"].iter().enumerate() {
        write_file(&repo, "file.txt", &format!("revision {index}\n"));
        commit_all(&repo, message);
    }
    repo
}

#[test]
fn log_lists_commits_newest_first() {
    let repo = three_commits();

    let assert = grit(&repo).arg("log").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    let third = stdout.find("third").unwrap();
    let second = stdout.find("second").unwrap();
    let first = stdout.find("first").unwrap();
    assert!(third < second && second < first);

    assert!(stdout.contains("commit "));
    assert!(stdout.contains("Author: Test Author <test@example.com>"));
    assert!(stdout.contains("Date:   "));
}

#[test]
fn oneline_format_is_hash_and_title() {
    let repo = three_commits();

    let assert = grit(&repo).args(["log", "--oneline"]).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        let (hash, _title) = line.split_once(' ').unwrap();
        assert_eq!(hash.len(), 7);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
    assert!(lines[0].ends_with("third"));
}

#[test]
fn max_count_limits_output() {
    let repo = three_commits();

    let assert = grit(&repo)
        .args(["log", "--oneline", "-n", "2"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 2);

    let assert = grit(&repo)
        .args(["log", "--oneline", "--max-count", "1"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("third"));
}

#[test]
fn empty_repository_has_no_commits() {
    let repo = init_repo();
    grit(&repo)
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("No commits yet"));
}

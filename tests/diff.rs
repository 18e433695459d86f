mod common;

use common::{commit_all, grit, init_repo, write_file};
use predicates::prelude::*;

#[test]
fn worktree_diff_shows_removed_added_and_context() {
    let repo = init_repo();
    write_file(&repo, "file.txt", "line1\nline2\nline3\n");
    commit_all(&repo, "base");

    write_file(&repo, "file.txt", "line1\nmodified line2\nline3\nline4\n");

    let assert = grit(&repo).arg("diff").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert!(stdout.contains("diff --git a/file.txt b/file.txt"));
    assert!(stdout.contains("--- a/file.txt"));
    assert!(stdout.contains("+++ b/file.txt"));
    assert!(stdout.contains("-line2"));
    assert!(stdout.contains("+modified line2"));
    assert!(stdout.contains("+line4"));
    assert!(stdout.contains(" line1"));
    assert!(stdout.contains(" line3"));

    // exactly one removal and two additions
    assert_eq!(stdout.lines().filter(|l| l.starts_with('-') && !l.starts_with("---")).count(), 1);
    assert_eq!(stdout.lines().filter(|l| l.starts_with('+') && !l.starts_with("+++")).count(), 2);
}

#[test]
fn unchanged_worktree_produces_no_output() {
    let repo = init_repo();
    write_file(&repo, "file.txt", "same\n");
    commit_all(&repo, "base");

    grit(&repo)
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn cached_diff_compares_index_against_head() {
    let repo = init_repo();
    write_file(&repo, "file.txt", "old\n");
    commit_all(&repo, "base");

    write_file(&repo, "file.txt", "new\n");
    grit(&repo).args(["add", "file.txt"]).assert().success();

    grit(&repo)
        .args(["diff", "--cached"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-old"))
        .stdout(predicate::str::contains("+new"));

    // worktree matches the index, so the plain diff is quiet
    grit(&repo)
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn staged_flag_is_an_alias_for_cached() {
    let repo = init_repo();
    write_file(&repo, "new.txt", "brand new\n");
    grit(&repo).args(["add", "new.txt"]).assert().success();

    grit(&repo)
        .args(["diff", "--staged"])
        .assert()
        .success()
        .stdout(predicate::str::contains("new file: new.txt"));
}

#[test]
fn diff_restricted_to_a_path() {
    let repo = init_repo();
    write_file(&repo, "a.txt", "a\n");
    write_file(&repo, "b.txt", "b\n");
    commit_all(&repo, "base");

    write_file(&repo, "a.txt", "a changed\n");
    write_file(&repo, "b.txt", "b changed\n");

    let assert = grit(&repo).args(["diff", "a.txt"]).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("a/a.txt"));
    assert!(!stdout.contains("b.txt"));
}

#[test]
fn hunk_headers_carry_line_positions() {
    let repo = init_repo();
    let original: String = (1..=20).map(|i| format!("line{i}\n")).collect();
    write_file(&repo, "file.txt", &original);
    commit_all(&repo, "base");

    let modified = original.replace("line10\n", "changed10\n");
    write_file(&repo, "file.txt", &modified);

    grit(&repo)
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::contains("@@ -7,7 +7,7 @@"));
}

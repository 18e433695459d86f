mod common;

use common::{commit_all, grit, head_hash, init_repo, write_file};
use predicates::prelude::*;

#[test]
fn initial_commit_owns_all_lines_with_correct_numbers() {
    let repo = init_repo();
    write_file(&repo, "file.txt", "alpha\nbeta\ngamma\n");
    let commit = commit_all(&repo, "initial");

    let assert = grit(&repo).args(["blame", "file.txt"]).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    for (index, (line, content)) in lines.iter().zip(["alpha", "beta", "gamma"]).enumerate() {
        assert!(line.starts_with(&commit[..8]), "line credited to initial commit");
        assert!(line.contains("Test Author"));
        assert!(line.contains(&format!(" {}) ", index + 1)));
        assert!(line.ends_with(content));
    }
}

#[test]
fn modified_lines_are_credited_to_the_newer_commit() {
    let repo = init_repo();
    write_file(&repo, "file.txt", "stable\nchanging\n");
    let first = commit_all(&repo, "first");

    write_file(&repo, "file.txt", "stable\nchanged!\n");
    let second = commit_all(&repo, "second");

    let assert = grit(&repo).args(["blame", "file.txt"]).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert!(lines[0].starts_with(&first[..8]));
    assert!(lines[1].starts_with(&second[..8]));
    assert_ne!(first, second);
    assert_ne!(head_hash(&repo), first);
}

#[test]
fn blame_of_untracked_file_fails() {
    let repo = init_repo();
    write_file(&repo, "tracked.txt", "x\n");
    commit_all(&repo, "first");

    grit(&repo)
        .args(["blame", "ghost.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost.txt"));
}

#[test]
fn blame_before_any_commit_fails() {
    let repo = init_repo();
    write_file(&repo, "file.txt", "x\n");
    grit(&repo)
        .args(["blame", "file.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no commits yet"));
}

mod common;

use common::{cat_file, commit_tree_hash, grit, head_hash, init_repo, read_file, write_file};
use predicates::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn first_commit_anchors_main_and_builds_the_expected_tree() {
    let repo = init_repo();
    write_file(&repo, "test.txt", "Hello World");

    grit(&repo).args(["add", "test.txt"]).assert().success();
    grit(&repo)
        .args([
            "commit",
            "-m",
            "init",
            "--author-name",
            "A",
            "--author-email",
            "a@x",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("root-commit"));

    // the branch ref exists and equals the stored commit's hash
    let branch_hash = read_file(&repo, ".git/refs/heads/main").trim().to_string();
    assert_eq!(branch_hash, head_hash(&repo));
    assert_eq!(branch_hash.len(), 40);

    // the commit names the configured author
    let commit = cat_file(&repo, &branch_hash);
    assert!(commit.contains("author A <a@x>"));
    assert!(commit.contains("\ninit"));

    // the tree holds test.txt as a regular blob of "Hello World"
    let tree = cat_file(&repo, &commit_tree_hash(&repo, &branch_hash));
    assert!(tree.contains("100644 blob"));
    assert!(tree.contains("test.txt"));
    // well-known hash of the "Hello World" blob
    assert!(tree.contains("5e1c309dae7f45e0f39b1bf3ac3cd9db12e7d689"));
}

#[test]
fn second_commit_links_to_its_parent() {
    let repo = init_repo();
    write_file(&repo, "a.txt", "one\n");
    let first = common::commit_all(&repo, "first");

    write_file(&repo, "a.txt", "two\n");
    let second = common::commit_all(&repo, "second");

    assert_ne!(first, second);
    let commit = cat_file(&repo, &second);
    assert!(commit.contains(&format!("parent {first}")));
}

#[test]
fn commit_with_nothing_staged_fails() {
    let repo = init_repo();
    grit(&repo)
        .args(["commit", "-m", "empty"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to commit"));
}

#[test]
fn commit_message_is_required_by_the_cli() {
    let repo = init_repo();
    grit(&repo).arg("commit").assert().failure();
}

#[test]
fn author_falls_back_to_environment() {
    let repo = init_repo();
    write_file(&repo, "f.txt", "content");
    grit(&repo).args(["add", "f.txt"]).assert().success();
    grit(&repo)
        .args(["commit", "-m", "env author"])
        .assert()
        .success();

    let commit = cat_file(&repo, &head_hash(&repo));
    assert!(commit.contains("author Test Author <test@example.com>"));
}

#[test]
fn nested_directories_produce_subtrees() {
    let repo = init_repo();
    write_file(&repo, "src/lib.rs", "pub fn f() {}\n");
    write_file(&repo, "src/deep/mod.rs", "mod deep;\n");
    write_file(&repo, "readme.md", "# docs\n");
    let commit = common::commit_all(&repo, "tree shapes");

    let root = cat_file(&repo, &commit_tree_hash(&repo, &commit));
    assert!(root.contains("040000 tree"));
    assert!(root.contains("src"));
    assert!(root.contains("readme.md"));

    let src_hash = root
        .lines()
        .find(|line| line.ends_with("\tsrc"))
        .and_then(|line| line.split_whitespace().nth(2))
        .expect("src subtree listed")
        .to_string();
    let src = cat_file(&repo, &src_hash);
    assert!(src.contains("lib.rs"));
    assert!(src.contains("040000 tree"));
}

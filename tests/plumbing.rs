mod common;

use common::{commit_all, grit, init_repo, write_file};
use predicates::prelude::*;

#[test]
fn hash_object_matches_known_blob_hash() {
    let repo = init_repo();
    write_file(&repo, "hello.txt", "Hello World");

    grit(&repo)
        .args(["hash-object", "hello.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "5e1c309dae7f45e0f39b1bf3ac3cd9db12e7d689",
        ));

    // without -w nothing is stored
    assert!(!repo
        .path()
        .join(".git/objects/5e/1c309dae7f45e0f39b1bf3ac3cd9db12e7d689")
        .exists());

    grit(&repo)
        .args(["hash-object", "-w", "hello.txt"])
        .assert()
        .success();
    assert!(repo
        .path()
        .join(".git/objects/5e/1c309dae7f45e0f39b1bf3ac3cd9db12e7d689")
        .exists());
}

#[test]
fn cat_file_round_trips_blob_content() {
    let repo = init_repo();
    write_file(&repo, "data.txt", "some\ncontent\n");
    commit_all(&repo, "store it");

    grit(&repo)
        .args(["hash-object", "data.txt"])
        .assert()
        .success();

    let hash_output = grit(&repo)
        .args(["hash-object", "data.txt"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let hash = String::from_utf8(hash_output).unwrap().trim().to_string();

    grit(&repo)
        .args(["cat-file", "-p", &hash])
        .assert()
        .success()
        .stdout(predicate::str::diff("some\ncontent\n"));
}

#[test]
fn cat_file_resolves_short_hashes() {
    let repo = init_repo();
    write_file(&repo, "data.txt", "short hash me\n");
    commit_all(&repo, "store");

    let head = common::head_hash(&repo);
    grit(&repo)
        .args(["cat-file", "-p", &head[..10]])
        .assert()
        .success()
        .stdout(predicate::str::contains("tree "));
}

#[test]
fn cat_file_unknown_object_fails() {
    let repo = init_repo();
    grit(&repo)
        .args(["cat-file", "-p", &"f".repeat(40)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

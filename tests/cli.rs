use std::fs;
use std::path::Path;

use assert_cmd::Command;

mod common;
use common::write_pools;

fn generate_cmd(root: &Path, out: &Path) -> Command {
    let pools = write_pools(root);
    let mut cmd = Command::cargo_bin("synthdet").unwrap();
    cmd.arg("generate")
        .arg("--objects")
        .arg(&pools.objects)
        .arg("--backgrounds")
        .arg(&pools.backgrounds)
        .arg("--output")
        .arg(out)
        .args(["--seed", "7", "--quiet"]);
    cmd
}

fn label_files(out: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(out.join("labels"))
        .expect("read labels dir")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn runs() {
    let mut cmd = Command::cargo_bin("synthdet").unwrap();
    cmd.assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = Command::cargo_bin("synthdet").unwrap();
    cmd.arg("-V");
    cmd.assert().success().stdout("synthdet 0.1.0\n");
}

// Generate subcommand tests

#[test]
fn generate_writes_requested_examples() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("out");

    let mut cmd = generate_cmd(temp.path(), &out);
    cmd.args(["-n", "4", "--min-objects", "1", "--max-objects", "2"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Generated 4 example(s)"));

    assert_eq!(
        label_files(&out),
        vec!["example_0.txt", "example_1.txt", "example_2.txt", "example_3.txt"]
    );
    assert!(out.join("images/example_3.png").is_file());
    assert!(out.join("data.yaml").is_file());
    assert_eq!(
        fs::read_to_string(out.join("train.txt")).unwrap().lines().count(),
        4
    );

    for name in label_files(&out) {
        let content = fs::read_to_string(out.join("labels").join(name)).unwrap();
        let lines = content.lines().count();
        assert!((1..=2).contains(&lines), "{content}");
    }

    let mut validate = Command::cargo_bin("synthdet").unwrap();
    validate.arg("validate").arg(&out).arg("--strict");
    validate
        .assert()
        .success()
        .stdout(predicates::str::contains("Validation passed"));
}

#[test]
fn generate_without_objects_writes_empty_labels() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("out");

    let mut cmd = generate_cmd(temp.path(), &out);
    cmd.args(["-n", "3", "--min-objects", "0", "--max-objects", "0"]);
    cmd.assert().success();

    for name in label_files(&out) {
        let content = fs::read_to_string(out.join("labels").join(name)).unwrap();
        assert!(content.is_empty());
    }
}

#[test]
fn generate_json_report() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("out");

    let mut cmd = generate_cmd(temp.path(), &out);
    cmd.args(["-n", "2", "--report", "json", "--prefix", "synth"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("\"examples\": 2"))
        .stdout(predicates::str::contains("\"seed\": 7"));
    assert!(out.join("labels/synth_1.txt").is_file());
}

#[test]
fn generate_with_dotted_prefix_keeps_every_example() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("out");

    let mut cmd = generate_cmd(temp.path(), &out);
    cmd.args(["-n", "3", "--prefix", "synth.v2"]);
    cmd.assert().success();

    assert_eq!(
        label_files(&out),
        vec!["synth.v2_0.txt", "synth.v2_1.txt", "synth.v2_2.txt"]
    );
    assert_eq!(fs::read_dir(out.join("images")).unwrap().count(), 3);
    let manifest = fs::read_to_string(out.join("train.txt")).unwrap();
    assert_eq!(
        manifest,
        "images/synth.v2_0.png\nimages/synth.v2_1.png\nimages/synth.v2_2.png\n"
    );
}

#[test]
fn generate_writes_augmented_variants() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("out");

    let mut cmd = generate_cmd(temp.path(), &out);
    cmd.args(["-n", "2", "--augment", "2", "--min-objects", "1", "--max-objects", "2"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("augmented: 4 variant(s)"));

    assert_eq!(
        label_files(&out),
        vec![
            "aug_example_0_0.txt",
            "aug_example_0_1.txt",
            "aug_example_1_0.txt",
            "aug_example_1_1.txt",
            "example_0.txt",
            "example_1.txt",
        ]
    );
    let manifest = fs::read_to_string(out.join("train.txt")).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(
        lines,
        vec![
            "images/example_0.png",
            "images/aug_example_0_0.png",
            "images/aug_example_0_1.png",
            "images/example_1.png",
            "images/aug_example_1_0.png",
            "images/aug_example_1_1.png",
        ]
    );

    let mut validate = Command::cargo_bin("synthdet").unwrap();
    validate.arg("validate").arg(&out).arg("--strict");
    validate
        .assert()
        .success()
        .stdout(predicates::str::contains("Validation passed"));
}

#[test]
fn generate_uses_class_names_file() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("out");
    let names = temp.path().join("names.txt");
    fs::write(&names, "box\nbottle\nmug\n").unwrap();

    let mut cmd = generate_cmd(temp.path(), &out);
    cmd.args(["-n", "1"]).arg("--class-names").arg(&names);
    cmd.assert().success();

    let yaml = fs::read_to_string(out.join("data.yaml")).unwrap();
    assert!(yaml.contains("nc: 3"));
    assert!(yaml.contains("2: 'mug'"));
}

#[test]
fn generate_reads_recipe() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("out");
    let recipe = temp.path().join("recipe.yaml");
    fs::write(&recipe, "count: 3\nmin_objects: 2\nmax_objects: 2\n").unwrap();

    let mut cmd = generate_cmd(temp.path(), &out);
    cmd.arg("--config").arg(&recipe);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Generated 3 example(s) with 6 object(s)"));
}

#[test]
fn generate_rejects_inverted_object_range() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("out");

    let mut cmd = generate_cmd(temp.path(), &out);
    cmd.args(["--min-objects", "3", "--max-objects", "1"]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("Invalid generate parameters"));
}

#[test]
fn generate_rejects_bad_scale() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("out");

    let mut cmd = generate_cmd(temp.path(), &out);
    cmd.args(["--scale-min", "0.6", "--scale-max", "0.2"]);
    cmd.assert().failure();
}

#[test]
fn generate_rejects_unknown_image_format() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let out = temp.path().join("out");

    let mut cmd = generate_cmd(temp.path(), &out);
    cmd.args(["--image-format", "tiff"]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("Unsupported format"));
}

#[test]
fn generate_missing_backgrounds_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let pools = write_pools(temp.path());

    let mut cmd = Command::cargo_bin("synthdet").unwrap();
    cmd.arg("generate")
        .arg("--objects")
        .arg(&pools.objects)
        .arg("--backgrounds")
        .arg(temp.path().join("nope"))
        .arg("--output")
        .arg(temp.path().join("out"));
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("Invalid asset directory"));
}

// Validate subcommand tests

fn broken_output(root: &Path) {
    fs::create_dir_all(root.join("images")).unwrap();
    fs::create_dir_all(root.join("labels")).unwrap();
    fs::write(root.join("labels/orphan.txt"), "0 1.5 0.5 0.1 0.1\n").unwrap();
}

#[test]
fn validate_invalid_output_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    broken_output(temp.path());

    let mut cmd = Command::cargo_bin("synthdet").unwrap();
    cmd.arg("validate").arg(temp.path());
    cmd.assert()
        .failure()
        .stdout(predicates::str::contains("error(s)"))
        .stdout(predicates::str::contains("LabelWithoutImage"))
        .stdout(predicates::str::contains("ValueOutOfRange"));
}

#[test]
fn validate_json_output_format() {
    let temp = tempfile::tempdir().expect("create temp dir");
    broken_output(temp.path());

    let mut cmd = Command::cargo_bin("synthdet").unwrap();
    cmd.arg("validate").arg(temp.path()).args(["--output", "json"]);
    cmd.assert()
        .failure()
        .stdout(predicates::str::contains("\"error_count\":"))
        .stdout(predicates::str::contains("\"code\": \"LabelWithoutImage\""));
}

#[test]
fn validate_nonexistent_dir_fails() {
    let mut cmd = Command::cargo_bin("synthdet").unwrap();
    cmd.args(["validate", "nonexistent_dir"]);
    cmd.assert().failure();
}

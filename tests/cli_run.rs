// tests/cli_run.rs

mod common;
use crate::common::builders::{ProjectBuilder, TempProject};
use crate::common::{init_tracing, with_timeout};

use clap::Parser;
use pageflow::cli::CliArgs;

const PAGE: &str = "<html><head><title>{{ title }}</title></head><body><p>{{ tagline }}</p></body></html>\n";

fn project(config: &str) -> TempProject {
    ProjectBuilder::new()
        .file("pages.toml", config)
        .file("src/index.html", PAGE)
        .file("src/assets/styles/main.scss", "body { color: blue; }\n")
        .file("public/robots.txt", "User-agent: *\n")
        .build()
}

fn args(project: &TempProject, rest: &[&str]) -> CliArgs {
    let root = project.root().display().to_string();
    let mut argv = vec!["pageflow", "--cwd", root.as_str()];
    argv.extend_from_slice(rest);
    CliArgs::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn build_uses_data_from_pages_toml() {
    init_tracing();
    let project = project("[data]\ntitle = \"From file\"\ntagline = \"hello\"\n");

    with_timeout(pageflow::run(args(&project, &["build"]))).await.unwrap();

    let html = project.read("dist/index.html");
    assert!(html.contains("<title>From file</title>"));
    assert!(html.contains("<p>hello</p>"));
    assert!(project.exists("dist/robots.txt"));
}

#[tokio::test]
async fn explicit_config_path_is_relative_to_root() {
    init_tracing();
    let project = project("");
    project.write("conf/site.toml", "[data]\ntitle = \"Alt\"\n");

    with_timeout(pageflow::run(args(&project, &["--config", "conf/site.toml", "build"])))
        .await
        .unwrap();
    assert!(project.read("dist/index.html").contains("<title>Alt</title>"));
}

#[tokio::test]
async fn missing_explicit_config_is_an_error() {
    init_tracing();
    let project = project("");

    let err = with_timeout(pageflow::run(args(&project, &["--config", "conf/typo.toml", "build"])))
        .await
        .unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("typo.toml"), "{message}");
    assert!(message.contains("does not exist"), "{message}");
    assert!(!project.exists("temp"));
    assert!(!project.exists("dist"));
}

#[tokio::test]
async fn absent_pages_toml_falls_back_to_defaults() {
    init_tracing();
    let project = ProjectBuilder::new()
        .file("src/index.html", "<p>plain</p>\n")
        .dir("public")
        .build();

    with_timeout(pageflow::run(args(&project, &["build"]))).await.unwrap();
    assert!(project.read("dist/index.html").contains("<p>plain</p>"));
}

#[tokio::test]
async fn clean_removes_both_output_roots() {
    init_tracing();
    let project = project("");
    project.write("temp/index.html", "old");
    project.write("dist/index.html", "old");

    with_timeout(pageflow::run(args(&project, &["clean"]))).await.unwrap();

    assert!(!project.exists("temp"));
    assert!(!project.exists("dist"));
    assert!(project.exists("src/index.html"));
}

#[tokio::test]
async fn dry_run_executes_nothing() {
    init_tracing();
    let project = project("");

    with_timeout(pageflow::run(args(&project, &["--dry-run", "build"]))).await.unwrap();

    assert!(!project.exists("temp"));
    assert!(!project.exists("dist"));
}

#[tokio::test]
async fn invalid_config_is_rejected_before_running() {
    init_tracing();
    let project = project("[paths]\ntemp = \"out\"\ndist = \"out\"\n");

    let err = with_timeout(pageflow::run(args(&project, &["build"]))).await.unwrap_err();
    assert!(format!("{err:#}").contains("must differ"));
    assert!(!project.exists("out"));
}

#[tokio::test]
async fn develop_port_override_is_validated() {
    init_tracing();
    let project = project("");

    let err = with_timeout(pageflow::run(args(&project, &["develop", "--port", "0"])))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("[server].port"));
    assert!(!project.exists("temp"));
}

#[tokio::test]
async fn failing_task_is_named_in_the_error() {
    init_tracing();
    let project = project("");
    project.write("src/assets/styles/main.scss", "body { color: red;");

    let err = with_timeout(pageflow::run(args(&project, &["build"]))).await.unwrap_err();
    assert!(err.to_string().contains("'build' failed in task 'style'"));
}

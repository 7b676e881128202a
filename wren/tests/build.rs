use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::time::Duration;

use pretty_assertions::assert_eq;

const LOGO: &[u8] = &[0x89, b'P', b'N', b'G', 0xff, 0x00, 0x10];

fn write<C: AsRef<[u8]>>(root: &Path, path: &str, contents: C) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn wren(input: &Path, output: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wren"))
        .arg(input)
        .arg(output)
        .env("RUST_LOG", "info")
        .output()
        .unwrap()
}

fn site(root: &Path) {
    write(root, "config.toml", "lang = 'en'\n");
    write(root, "default.template", "<!DOCTYPE html>\n\
        <html lang=\"{{ node.lang }}\"><head><title>{{ node.meta.title }}</title></head>\n\
        <body><webgen:block name=\"content\"/></body></html>\n");
    write(root, "index.page", "+++\ntitle = \"Home\"\n+++\n# Welcome\n\nSee the [news](news.html).\n");
    write(root, "news.de.page", "+++\ntitle = \"Neues\"\n+++\nNichts.\n");
    write(root, "css/site.scss", "body { p { color: red; } }\n");
    write(root, "images/logo.png", LOGO);
    write(root, "wip.page", "+++\ntitle = \"Soon\"\n+++\nsoon\n");
}

#[test]
fn builds_a_site() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = (dir.path().join("src"), dir.path().join("out"));
    site(&input);

    let result = wren(&input, &output);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let index = fs::read_to_string(output.join("index.html")).unwrap();
    assert_eq!(index, "<!DOCTYPE html>\n\
        <html lang=\"en\"><head><title>Home</title></head>\n\
        <body><h1>Welcome</h1>\n<p>See the <a href=\"news.html\">news</a>.</p>\n</body></html>");

    let news = fs::read_to_string(output.join("news.de.html")).unwrap();
    assert!(news.contains("<html lang=\"de\">"), "{news}");
    assert!(news.contains("<p>Nichts.</p>"), "{news}");

    let css = fs::read_to_string(output.join("css/site.css")).unwrap();
    assert!(css.contains("body p"), "{css}");
    assert_eq!(fs::read(output.join("images/logo.png")).unwrap(), LOGO);

    assert!(output.join("wip.html").is_file());
    assert!(output.join(".wren-stamp").is_file());
    assert!(!output.join("default.template").exists());
    assert!(!output.join("config.toml").exists());
}

#[test]
fn rebuilds_only_what_changed() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = (dir.path().join("src"), dir.path().join("out"));
    site(&input);

    // Keep source and stamp modification times apart.
    std::thread::sleep(Duration::from_millis(1100));
    assert!(wren(&input, &output).status.success());

    write(&output, "index.html", "stale");
    std::thread::sleep(Duration::from_millis(1100));
    write(&input, "news.de.page", "+++\ntitle = \"Neues\"\n+++\nViel.\n");
    write(&input, "wip.page", "+++\ntitle = \"Soon\"\ndraft = true\n+++\nsoon\n");

    let result = wren(&input, &output);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert_eq!(fs::read_to_string(output.join("index.html")).unwrap(), "stale");
    assert!(fs::read_to_string(output.join("news.de.html")).unwrap().contains("<p>Viel.</p>"));
    assert!(!output.join("wip.html").exists());

    let result = Command::new(env!("CARGO_BIN_EXE_wren"))
        .arg("--force")
        .arg(&input)
        .arg(&output)
        .output()
        .unwrap();

    assert!(result.status.success());
    assert!(fs::read_to_string(output.join("index.html")).unwrap().contains("<h1>Welcome</h1>"));
}

#[test]
fn reports_render_failures() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = (dir.path().join("src"), dir.path().join("out"));
    write(&input, "index.page", "--- name:content pipeline:nope\nhello\n");

    let result = wren(&input, &output);
    assert!(!result.status.success());

    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("build failed"), "{stderr}");
    assert!(stderr.contains("nope"), "{stderr}");
    assert!(stderr.contains("/index.html"), "{stderr}");
    assert!(!output.join(".wren-stamp").exists());
}

use std::path::Path;

use vtml::{Context, Engine, TemplateStore};

#[test]
fn test_load_templates_from_directory() {
    let store = TemplateStore::new(Engine::new());
    store
        .load_from_path(Path::new("tests/resources/templates"))
        .expect("templates should load");

    let template = store.get("welcome").expect("welcome should be registered");
    let mut ctx = Context::new();
    ctx.set("name", "Daffy");
    ctx.set("perks", vec!["early access", "free shipping"]);

    let out = template.render(&mut ctx).unwrap();
    assert!(out.contains("<h1>Welcome Daffy!</h1>"));
    assert!(out.contains("<li>early access</li><li>free shipping</li>"));
}

#[test]
fn test_nested_directories_use_slash_names() {
    let store = TemplateStore::new(Engine::new());
    store
        .load_from_path(Path::new("tests/resources/templates"))
        .unwrap();

    let template = store
        .get("digest/weekly")
        .expect("digest/weekly should be registered");
    let mut ctx = Context::new();
    ctx.set("count", 3);

    let out = template.render(&mut ctx).unwrap();
    assert_eq!(out.trim_end(), "<div><p>3 new articles this week.</p></div>");
}

#[test]
fn test_unknown_template_is_none() {
    let store = TemplateStore::new(Engine::new());
    assert!(store.get("nope").is_none());
}

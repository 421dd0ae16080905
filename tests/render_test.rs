use std::sync::Arc;
use std::thread;

use serde::Serialize;
use vtml::{Context, Engine, Error, Value};

fn render(source: &str, ctx: &mut Context) -> String {
    Engine::new()
        .compile(source)
        .expect("template should compile")
        .render(ctx)
        .expect("template should render")
}

#[test]
fn test_loop_with_bound_attribute() {
    let mut ctx = Context::new();
    ctx.set("names", vec!["Daffy", "Bugs"]);

    let out = render(
        r#"<div><p v-for="n in names" :name="n"></p></div>"#,
        &mut ctx,
    );
    assert_eq!(out, r#"<div><p name="Daffy"/><p name="Bugs"/></div>"#);
}

#[test]
fn test_condition_includes_and_excludes_whole_subtrees() {
    let mut ctx = Context::new();
    ctx.set("age", 12);
    ctx.set("firstName", "Daffy");

    let out = render(
        r#"<div>Hello <p v-if="age == 12" :a="firstName">OK</p><p v-if="age != 12">BAD</p></div>"#,
        &mut ctx,
    );
    assert_eq!(out, r#"<div>Hello <p a="Daffy">OK</p></div>"#);
}

#[test]
fn test_text_interpolation() {
    let mut ctx = Context::new();
    ctx.set("firstName", "Daffy");
    ctx.set("lastName", "Duck");

    let out = render("<div>Hello {{firstName}} -- {{lastName}}.</div>", &mut ctx);
    assert_eq!(out, "<div>Hello Daffy -- Duck.</div>");
}

#[test]
fn test_raw_body_from_string() {
    let mut ctx = Context::new();
    ctx.set("message", "<h1>Hi</h1>");

    let out = render(r#"<div v-html="message"></div>"#, &mut ctx);
    assert_eq!(out, "<div><h1>Hi</h1></div>");
}

#[test]
fn test_empty_loop_leaves_siblings_alone() {
    let mut ctx = Context::new();
    ctx.set("names", Value::List(Vec::new()));

    let out = render(
        r#"<div><p v-for="n in names">{{n}}</p><h3>once</h3></div>"#,
        &mut ctx,
    );
    assert_eq!(out, "<div><h3>once</h3></div>");
}

#[test]
fn test_null_interpolation_is_empty_not_literal_null() {
    let mut ctx = Context::new();
    let out = render("<p>a{{missing}}b</p>", &mut ctx);
    assert_eq!(out, "<p>ab</p>");
}

#[test]
fn test_interpolated_text_is_escaped_but_fragments_are_not() {
    let engine = Engine::new();
    let inner = engine.compile("<b>ok</b>").unwrap();
    let fragment = inner.to_fragment(&mut Context::new()).unwrap();

    let mut ctx = Context::new();
    ctx.set("asText", "<b>ok</b>");
    ctx.set("asTree", fragment);

    let out = render("<p>{{asText}}</p><p>{{asTree}}</p>", &mut ctx);
    assert_eq!(out, "<p>&lt;b&gt;ok&lt;/b&gt;</p><p><b>ok</b></p>");
}

#[test]
fn test_loop_filtering_applies_per_iteration() {
    let mut ctx = Context::new();
    ctx.set("nums", vec![1, 2, 3, 4]);

    let out = render(
        r#"<ul><li v-for="n in nums" v-if="n > 2">{{n}}</li></ul>"#,
        &mut ctx,
    );
    assert_eq!(out, "<ul><li>3</li><li>4</li></ul>");
}

#[test]
fn test_loop_over_serialized_structs() {
    #[derive(Serialize)]
    struct Digest {
        articles: Vec<Article>,
    }
    #[derive(Serialize)]
    struct Article {
        title: &'static str,
        url: &'static str,
    }

    let digest = Digest {
        articles: vec![
            Article {
                title: "One",
                url: "https://example.com/1",
            },
            Article {
                title: "Two",
                url: "https://example.com/2",
            },
        ],
    };

    let mut ctx = Context::from_serialize(&digest).unwrap();
    let out = render(
        r#"<div><a v-for="a in articles" :href="a.url">{{a.title}}</a></div>"#,
        &mut ctx,
    );
    assert_eq!(
        out,
        r#"<div><a href="https://example.com/1">One</a><a href="https://example.com/2">Two</a></div>"#
    );
}

#[test]
fn test_evaluation_is_deterministic() {
    let template = Engine::new()
        .compile(r#"<div><p v-for="n in names" v-if="n != 'skip'">{{n}}</p></div>"#)
        .unwrap();

    let make_ctx = || {
        let mut ctx = Context::new();
        ctx.set("names", vec!["a", "skip", "b"]);
        ctx
    };

    let first = template.evaluate(&mut make_ctx()).unwrap();
    for _ in 0..10 {
        assert_eq!(template.evaluate(&mut make_ctx()).unwrap(), first);
    }
}

#[test]
fn test_concurrent_evaluation_of_a_shared_template() {
    let template = Arc::new(
        Engine::new()
            .compile(r#"<div><p v-for="n in names">{{n}}-{{id}}</p></div>"#)
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|id| {
            let template = template.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let mut ctx = Context::new();
                    ctx.set("names", vec!["x", "y"]);
                    ctx.set("id", id as i64);
                    let out = template.render(&mut ctx).unwrap();
                    assert_eq!(out, format!("<div><p>x-{id}</p><p>y-{id}</p></div>"));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_non_iterable_loop_source_is_fatal() {
    let template = Engine::new()
        .compile(r#"<p v-for="n in count"/>"#)
        .unwrap();

    let mut ctx = Context::new();
    ctx.set("count", 5);
    assert!(matches!(
        template.render(&mut ctx),
        Err(Error::NotIterable { .. })
    ));
}

#[test]
fn test_compile_rejects_malformed_loop_directive() {
    assert!(matches!(
        Engine::new().compile(r#"<p v-for="n of names"/>"#),
        Err(Error::DirectiveSyntax(_))
    ));
}

#[test]
fn test_compile_rejects_bad_expression_anywhere() {
    assert!(matches!(
        Engine::new().compile("<p>{{'unterminated}}</p>"),
        Err(Error::ExpressionCompile { .. })
    ));
}

#[test]
fn test_date_and_decimal_values_render() {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    let mut ctx = Context::new();
    ctx.set("due", NaiveDate::from_ymd_opt(2026, 8, 7).unwrap());
    ctx.set("total", Decimal::new(1999, 2));

    let out = render("<p>Due {{due}}, total {{total}}</p>", &mut ctx);
    assert_eq!(out, "<p>Due 2026-08-07, total 19.99</p>");
}

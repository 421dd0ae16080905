use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};
use vtml::{Context, Engine};

#[derive(Serialize)]
struct Order {
    customer: &'static str,
    vip: bool,
    items: Vec<Item>,
}

#[derive(Serialize)]
struct Item {
    name: &'static str,
    qty: i32,
}

fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::new("debug")).init();

    let engine = Engine::new();
    let template = engine.compile(
        r#"<html><body><h1>Hello {{customer}}!</h1><p v-if="vip">Thanks for being a VIP customer.</p><ul><li v-for="item in items">{{item.qty}} x {{item.name}}</li></ul></body></html>"#,
    )?;

    let order = Order {
        customer: "Daffy",
        vip: true,
        items: vec![
            Item {
                name: "birdseed",
                qty: 2,
            },
            Item {
                name: "anvil",
                qty: 1,
            },
        ],
    };

    let mut ctx = Context::from_serialize(&order)?;
    println!("{}", template.render(&mut ctx)?);
    Ok(())
}

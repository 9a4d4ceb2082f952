//! Counter Example - data, computed, methods and listeners
//!
//! This example demonstrates a single component:
//! - Reactive data and a computed property
//! - A click listener calling a method
//! - Batched re-rendering on the next tick
//!
//! Run with: cargo run --example counter

use std::rc::Rc;

use spark_view::{
    mount, reset_runtime, tick, ComponentOptions, Hook, MemoryBackend, Op, Value, VNode,
};

fn main() {
    // Reset to ensure clean state
    reset_runtime();

    println!("=== spark-view Counter Example ===\n");

    let counter = ComponentOptions::named("counter")
        .data(|_| Ok([("count", 0)].into_iter().collect()))
        .computed("parity", |vm| {
            let n = vm.get("count")?.as_f64().unwrap_or(0.0);
            Ok(Value::from(if n % 2.0 == 0.0 { "even" } else { "odd" }))
        })
        .method("increment", |vm, _| {
            let n = vm.get("count")?.as_f64().unwrap_or(0.0);
            vm.set("count", Value::from(n + 1.0))?;
            Ok(Value::Null)
        })
        .hook(Hook::Updated, |vm| {
            println!("  updated: count = {}", vm.get("count")?);
            Ok(())
        })
        .render(|ctx| {
            let vm = ctx.component().clone();
            Ok(VNode::element("div")
                .class("counter")
                .child(
                    VNode::element("span")
                        .text_content(format!("{} ({})", ctx.get("count")?, ctx.get("parity")?)),
                )
                .child(
                    VNode::element("button")
                        .on("click", move |_| vm.call("increment", &[]).map(|_| ()))
                        .text_content("+1"),
                )
                .into())
        })
        .build();

    let backend = Rc::new(MemoryBackend::new());
    let container = backend.create_root();
    let handle = mount(&counter, backend.clone(), container);
    println!("Initial output:\n  {}\n", backend.inner_html(container));

    let button = backend.find(container, "button");
    backend.clear_ops();

    // Three clicks in one turn render once.
    for _ in 0..3 {
        if let Some(button) = button {
            backend.dispatch(button, "click", &Value::Null);
        }
    }
    println!("Clicked 3 times, flushing:");
    tick();

    println!("\nOutput after flush:\n  {}", backend.inner_html(container));
    println!("\nBackend calls made by the update:");
    for op in backend.ops() {
        println!("  {op:?}");
    }
    let text_updates = backend.count_ops(Op::is_text_update);
    println!("\n{text_updates} text update(s), no nodes created or moved.");

    handle.unmount();
    println!("\nUnmounted: {:?}", backend.inner_html(container));
}

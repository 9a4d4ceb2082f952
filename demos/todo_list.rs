//! Todo List Example - child components, props and keyed lists
//!
//! This example demonstrates a parent rendering keyed child components:
//! - Props flowing from parent to child
//! - Keyed reordering that moves nodes instead of rebuilding them
//! - Lifecycle hooks firing as items come and go
//!
//! Run with: cargo run --example todo_list

use std::rc::Rc;

use spark_view::reactive::{Array, Object};
use spark_view::{
    mount, reset_runtime, tick, ComponentOptions, Hook, MemoryBackend, Op, PropDef, PropType,
    Value, VNode,
};

fn todo(id: i32, title: &str, done: bool) -> Value {
    let item: Object = [
        ("id", Value::from(id)),
        ("title", Value::from(title)),
        ("done", Value::from(done)),
    ]
    .into_iter()
    .collect();
    Value::from(item)
}

fn main() {
    // Reset to ensure clean state
    reset_runtime();

    println!("=== spark-view Todo List Example ===\n");

    let item = ComponentOptions::named("todo-item")
        .prop("title", PropDef::new(PropType::Str).required())
        .prop("done", PropDef::new(PropType::Bool))
        .render(|ctx| {
            let done = ctx.get("done")?.truthy();
            let mut li = VNode::element("li").text_content(ctx.get("title")?.to_string());
            if done {
                li = li.class("done");
            }
            Ok(li.into())
        })
        .hook(Hook::Mounted, |vm| {
            println!("  + mounted {}", vm.get("title")?);
            Ok(())
        })
        .hook(Hook::Destroyed, |vm| {
            println!("  - destroyed {}", vm.props().peek("title"));
            Ok(())
        })
        .build();

    let list = ComponentOptions::named("todo-list")
        .data(|_| {
            let todos = Array::from_vec(vec![
                todo(1, "write parser", false),
                todo(2, "write tests", false),
                todo(3, "ship it", false),
            ]);
            Ok([("todos", Value::from(todos))].into_iter().collect())
        })
        .computed("remaining", |vm| {
            let todos = vm.get("todos")?;
            let open = todos
                .as_array()
                .map(Array::to_vec)
                .unwrap_or_default()
                .iter()
                .filter(|t| !t.as_object().is_some_and(|o| o.get("done").truthy()))
                .count();
            Ok(Value::from(open))
        })
        .component("todo-item", &item)
        .render(|ctx| {
            let todos = ctx.get("todos")?;
            let todos = todos.as_array().map(Array::to_vec).unwrap_or_default();
            let items = todos.iter().filter_map(Value::as_object).map(|todo| {
                ctx.child("todo-item")
                    .key(todo.get("id").as_f64().unwrap_or(0.0) as i64)
                    .prop("title", todo.get("title"))
                    .prop("done", todo.get("done"))
            });
            Ok(VNode::element("section")
                .child(VNode::element("h2").text_content(format!("{} left", ctx.get("remaining")?)))
                .child(VNode::element("ul").children(items))
                .into())
        })
        .build();

    let backend = Rc::new(MemoryBackend::new());
    let container = backend.create_root();
    println!("Mounting:");
    let handle = mount(&list, backend.clone(), container);
    println!("\n{}\n", backend.inner_html(container));

    let todos = handle.component().get("todos").unwrap_or_default();
    let Some(todos) = todos.as_array().cloned() else {
        return;
    };

    println!("Completing the first todo:");
    if let Some(first) = todos.peek(0).as_object() {
        first.assign("done", Value::from(true));
    }
    tick();
    println!("{}\n", backend.inner_html(container));

    println!("Moving the last todo to the front:");
    backend.clear_ops();
    if let Some(last) = todos.pop() {
        todos.unshift([last]);
    }
    tick();
    println!("{}", backend.inner_html(container));
    println!(
        "  {} move(s), {} node(s) created\n",
        backend.count_ops(Op::is_insert),
        backend.count_ops(Op::is_create)
    );

    println!("Adding and removing:");
    todos.splice(1, 1, vec![todo(4, "celebrate", false)]);
    tick();
    println!("{}\n", backend.inner_html(container));

    handle.unmount();
}

//! Find and Render Example
//!
//! Builds a small mock UI, resolves fixtures in it, waits for a dialog that
//! appears late, and reads rendered list text through the UI thread.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=remote_fixtures=debug cargo run --example find_and_render -p remote-fixtures
//! ```

use remote_fixtures::mock::{MockComponent, MockRemote, MockUi};
use remote_fixtures::prelude::*;
use remote_fixtures::render::{CellHost, CellResult, CellState, FnRenderer, Label, ListSource, Panel};
use remote_fixtures::{init_logging, LogFormat};
use std::thread;
use std::time::{Duration, Instant};

/// Toolbar button
#[derive(Debug, Fixture)]
#[fixture(kind = "Button")]
struct ButtonFixture {
    remote: RemoteComponent,
}

/// Settings dialog; searches through it stay inside it
#[derive(Debug, Fixture)]
#[fixture(kind = "Dialog", container)]
struct DialogFixture {
    remote: RemoteComponent,
}

fn build_ui() -> MockUi {
    let files = ListSource::new(
        "files",
        vec![("main.rs", 2_048_u32), ("lib.rs", 512)],
        FnRenderer::new(|_: &CellHost, file: &(&'static str, u32), cell: CellState| -> CellResult {
            let mut row = Panel::new()
                .with(Label::new(file.0))
                .with(Label::new(format!("{} bytes", file.1)));
            if cell.selected {
                row = row.with(Label::new("(selected)"));
            }
            Ok(Box::new(row))
        }),
    );

    MockUi::new().with_root(
        MockComponent::new("Frame")
            .name("main")
            .child(MockComponent::new("Button").text("Open"))
            .child(MockComponent::new("Button").text("Save"))
            .child(MockComponent::new("List").name("files").renderer(files)),
    )
}

fn main() -> FixtureResult<()> {
    init_logging(LogFormat::Pretty, "remote_fixtures=info");

    println!("=== Remote Fixtures: Find and Render ===\n");

    let config = FixturesConfig::default().with_env_overrides()?;
    let remote = MockRemote::spawn_with_config(&config, build_ui)?;
    let robot = RemoteRobot::builder(remote.clone())
        .config(config)
        .register::<ButtonFixture>()
        .register::<DialogFixture>()
        .build()?;

    // 1. Default locators and first-match resolution
    let first: ButtonFixture = robot.find_default()?;
    let buttons: Vec<ButtonFixture> = robot.find_all_default()?;
    println!("first button: {}", first.remote());
    println!("all buttons:  {}", buttons.len());

    // 2. Rendered list text
    let list: ListFixture = robot.find(&Locator::by_attribute("name", "files"))?;
    for index in 0..2 {
        println!("row {index}: {}", list.item_text(index)?);
    }
    println!("selected row 1: {}", list.selected_item_text(1)?);
    match list.item_text(5) {
        Ok(text) => println!("unexpected row: {text}"),
        Err(e) => println!("row 5: {e}"),
    }

    // 3. Waiting for a component that shows up later
    let opener = remote.clone();
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        opener.mutate(|ui| {
            ui.add_root(
                MockComponent::new("Dialog")
                    .text("Settings")
                    .child(MockComponent::new("Button").text("OK")),
            )
        })
    });
    let started = Instant::now();
    let dialog: DialogFixture = robot.find_default()?;
    println!("\ndialog appeared after {:?}", started.elapsed());
    let ok: ButtonFixture = dialog.find(&Locator::by_text("OK"))?;
    println!("dialog button: {}", ok.remote());
    let outside: Vec<ButtonFixture> = dialog.find_all(&Locator::by_text("Save"))?;
    println!("'Save' inside dialog: {}", outside.len());
    worker
        .join()
        .map_err(|_| FixtureError::ui_thread("dialog thread panicked"))??;

    // 4. Timeout diagnostics
    let missing = robot.find_with_timeout::<ButtonFixture>(
        &Locator::by_text("Delete"),
        Duration::from_millis(200),
    );
    if let Err(e) = missing {
        println!("\n{e}");
    }

    println!("\n=== Example Complete ===");
    Ok(())
}

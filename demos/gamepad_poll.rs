use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use padlink::{EventLogger, GilrsSource, InputManager, ManagerConfig};

fn main() {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ManagerConfig::load(path).expect("load config"),
        None => ManagerConfig::default(),
    };
    let mut input = InputManager::with_config(config).expect("valid config");
    input.events().on_any(EventLogger::new());
    input.events().on_any(|e: &padlink::InputEvent| {
        println!("{} (player {:?}): {:?}", e.device_id, e.player, e.kind);
    });

    let source = GilrsSource::new().expect("init gilrs");
    input.attach_gamepad_source(Rc::new(RefCell::new(source)));

    println!("Devices:");
    for d in input.devices() {
        println!("- {} ({})", d.name(), d.id());
    }

    let mut last = Instant::now();
    loop {
        let now = Instant::now();
        input.advance(now - last);
        last = now;
        // Sleep a touch to avoid pegging the CPU in the demo
        std::thread::sleep(Duration::from_millis(5));
    }
}

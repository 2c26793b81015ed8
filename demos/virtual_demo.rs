use std::time::Duration;

use padlink::{
    ControlSpec, EventLogger, InputManager, Point, Pointer, PointerEvent, PointerPhase, Rect, Renderer,
    RendererCapabilities, StandardButton, Stick, Surface, VirtualSurfaceDevice, VisualAttributes, VisualHandle,
    VisualKind, VisualPatch, WorldPoint,
};

/// Prints every draw call instead of drawing.
struct ConsoleRenderer {
    next: u64,
}

impl Renderer for ConsoleRenderer {
    fn capabilities(&self) -> RendererCapabilities {
        RendererCapabilities::default()
    }

    fn create_visual(&mut self, kind: VisualKind, attributes: &VisualAttributes) -> VisualHandle {
        self.next += 1;
        println!("(draw) #{} {:?} at {:?} r={}", self.next, kind, attributes.position, attributes.radius);
        VisualHandle(self.next)
    }

    fn update_visual(&mut self, handle: VisualHandle, patch: &VisualPatch) {
        println!("(draw) #{} {:?}", handle.0, patch);
    }

    fn remove_visual(&mut self, handle: VisualHandle) {
        println!("(draw) #{} removed", handle.0);
    }

    fn screen_to_world(&self, x: f32, y: f32) -> WorldPoint {
        WorldPoint {
            point: Point::new(x, y),
            surface: None,
        }
    }

    fn surfaces(&self) -> Vec<Surface> {
        vec![Surface::new("screen", Rect::new(0.0, 0.0, 800.0, 600.0))]
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut input = InputManager::new();
    input.events().on_any(EventLogger::new());
    input.events().on_any(|e: &padlink::InputEvent| {
        println!("(event) player={:?} {:?}", e.player, e.kind);
    });

    let id = input
        .create_virtual_device(
            VirtualSurfaceDevice::builder()
                .id("touch:demo")
                .renderer(ConsoleRenderer { next: 0 }),
        )
        .expect("build touch device");
    let pad = input.virtual_device_mut(&id).expect("registered above");
    pad.create_button(ControlSpec::button("jump", Point::new(700.0, 500.0), StandardButton::A).with_label("A"))
        .expect("add button");
    pad.create_stick(ControlSpec::stick("move", Point::new(100.0, 500.0), Stick::Left))
        .expect("add stick");
    input.assign_device_to_player(&id, 0).expect("assign player");

    let frame = Duration::from_millis(16);
    let script = [
        (PointerPhase::Start, 1, 700.0, 500.0),
        (PointerPhase::Start, 2, 100.0, 500.0),
        (PointerPhase::Move, 2, 130.0, 470.0),
        (PointerPhase::End, 1, 700.0, 500.0),
        (PointerPhase::Move, 2, 60.0, 500.0),
        (PointerPhase::End, 2, 60.0, 500.0),
    ];
    for (phase, pointer, x, y) in script {
        input.handle_pointer(&PointerEvent::single(phase, Pointer::touch(pointer, x, y)));
        input.advance(frame);
        let (sx, sy) = input.stick_for_player(Stick::Left, 0);
        println!(
            "(frame) A={} stick=({sx:.2}, {sy:.2})",
            input.is_button_pressed_for_player(StandardButton::A, 0)
        );
    }
}

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{kinds, ms, recorder, FakePads, RecordingRenderer, FRAME};
use padlink::{
    ControlSpec, Device, InputError, InputKind, InputManager, ManagerConfig, Point, Pointer, PointerEvent,
    PointerPhase, RawButton, Rumble, SharedGamepadSource, StandardAxis, StandardButton, Stick,
    VirtualSurfaceDevice,
};

fn with_pads(config: ManagerConfig, plugged: &[u32]) -> (InputManager, Rc<RefCell<FakePads>>) {
    let pads = Rc::new(RefCell::new(FakePads::default()));
    for index in plugged {
        pads.borrow_mut().plug(*index);
    }
    let mut input = InputManager::with_config(config).unwrap();
    let source: SharedGamepadSource = pads.clone();
    input.attach_gamepad_source(source);
    (input, pads)
}

fn manual() -> ManagerConfig {
    ManagerConfig {
        auto_assign_gamepads: false,
        ..ManagerConfig::default()
    }
}

#[test]
fn hot_plugged_pad_is_assigned_and_rumbles() {
    let pads = Rc::new(RefCell::new(FakePads::default()));
    let mut input = InputManager::new();
    let (log, rec) = recorder();
    input.events().on_any(rec);
    let source: SharedGamepadSource = pads.clone();
    input.attach_gamepad_source(source);

    pads.borrow_mut().plug(3);
    input.advance(FRAME);

    assert_eq!(
        *log.borrow(),
        vec![
            (None, InputKind::Connected),
            (Some(0), InputKind::PlayerDeviceAssigned { player: 0 }),
        ]
    );
    assert_eq!(input.player_device_id(0), Some("gamepad-3"));
    assert_eq!(pads.borrow().rumbles, vec![(3, Rumble::default())]);
    assert_eq!(input.gamepads().count(), 1);
    assert_eq!(input.device("gamepad-3").unwrap().name(), "Fake Pad 3");
}

#[test]
fn pads_beyond_max_players_stay_unassigned() {
    let config = ManagerConfig {
        max_players: 1,
        assign_rumble: None,
        ..ManagerConfig::default()
    };
    let (input, pads) = with_pads(config, &[0, 1]);

    assert_eq!(input.devices().count(), 2);
    assert_eq!(input.players().collect::<Vec<_>>(), vec![(0, "gamepad-0")]);
    assert_eq!(input.player_of("gamepad-1"), None);
    assert!(pads.borrow().rumbles.is_empty());
}

#[test]
fn unplugged_pad_is_unassigned_then_removed() {
    let (mut input, pads) = with_pads(ManagerConfig::default(), &[0]);
    let (log, rec) = recorder();
    input.events().on_any(rec);

    pads.borrow_mut().unplug(0);
    input.advance(FRAME);

    assert_eq!(
        *log.borrow(),
        vec![
            (Some(0), InputKind::PlayerDeviceUnassigned { player: 0 }),
            (None, InputKind::Disconnected),
        ]
    );
    assert!(input.device("gamepad-0").is_none());
    assert!(!input.has_player_device(0));
    assert_eq!(input.player_device_id(0), None);

    // Plugging back in takes the freed slot again.
    pads.borrow_mut().plug(0);
    input.advance(FRAME);
    assert_eq!(input.player_of("gamepad-0"), Some(0));
}

#[test]
fn global_queries_combine_devices() {
    let (mut input, pads) = with_pads(ManagerConfig::default(), &[0, 1]);
    {
        let mut pads = pads.borrow_mut();
        pads.pad(0).buttons[StandardButton::A.index()] = RawButton::down();
        pads.pad(0).axes[0] = -0.8;
        pads.pad(1).axes[0] = 0.5;
        // Raw down on the right stick.
        pads.pad(1).axes[3] = 0.6;
    }
    input.advance(FRAME);

    assert!(input.is_button_pressed(StandardButton::A));
    assert!(input.is_button_pressed("A"));
    assert!(!input.is_button_pressed(StandardButton::B));
    assert!(!input.is_button_pressed("NOT_A_BUTTON"));
    assert_eq!(input.axis(StandardAxis::LeftStickX), -0.8);
    assert_eq!(input.axis("RIGHT_STICK_Y"), -0.6);
    assert_eq!(input.stick(Stick::Left), (-0.8, 0.0));

    assert!(input.is_button_pressed_for_player(StandardButton::A, 0));
    assert!(!input.is_button_pressed_for_player(StandardButton::A, 1));
    assert_eq!(input.axis_for_player(StandardAxis::LeftStickX, 1), 0.5);
    assert_eq!(input.stick_for_player(Stick::Right, 1), (0.0, -0.6));

    let p1 = input.player_input(1).unwrap();
    assert_eq!(p1.player(), 1);
    assert_eq!(p1.device().map(|d| d.id()), Some("gamepad-1"));
    assert_eq!(p1.axis(0), 0.5);
    assert!(input.player_input(2).is_none());
}

#[test]
fn small_axis_readings_fall_in_the_deadzone() {
    let (mut input, pads) = with_pads(ManagerConfig::default(), &[0]);
    pads.borrow_mut().pad(0).axes[0] = 0.05;
    input.advance(FRAME);
    assert_eq!(input.axis(0), 0.0);
}

#[test]
fn press_state_and_duration() {
    let (mut input, pads) = with_pads(ManagerConfig::default(), &[0]);
    pads.borrow_mut().pad(0).buttons[0] = RawButton::down();

    input.advance(FRAME);
    assert!(input.is_button_just_pressed(0));
    assert!(input.is_button_just_pressed_for_player(0, 0));
    assert_eq!(input.button_press_duration(0), ms(0));

    input.advance(FRAME);
    input.advance(FRAME);
    assert!(!input.is_button_just_pressed(0));
    assert_eq!(input.button_press_duration(0), ms(32));
    assert_eq!(input.button_press_duration_for_player(0, 0), ms(32));
    assert_eq!(input.button_press_duration_for_player(0, 1), ms(0));

    pads.borrow_mut().pad(0).buttons[0] = RawButton::default();
    input.advance(FRAME);
    assert!(input.is_button_just_released(0));
    assert!(input.is_button_just_released_for_player(0, 0));
    assert_eq!(input.button_press_duration(0), ms(0));
}

#[test]
fn long_press_reaches_the_player_stream() {
    let (mut input, pads) = with_pads(ManagerConfig::default(), &[0]);
    let (log, rec) = recorder();
    input.events().on_any(rec);

    pads.borrow_mut().pad(0).buttons[1] = RawButton::down();
    input.advance(FRAME);
    input.advance(ms(600));
    pads.borrow_mut().pad(0).buttons[1] = RawButton::default();
    input.advance(FRAME);

    assert_eq!(
        *log.borrow(),
        vec![
            (Some(0), InputKind::ButtonDown { button: 1 }),
            (Some(0), InputKind::ButtonLongPress { button: 1, duration: ms(600) }),
            (Some(0), InputKind::ButtonUp { button: 1, duration: ms(616) }),
        ]
    );
}

#[test]
fn reassigning_moves_a_device_between_slots() {
    let (mut input, _pads) = with_pads(manual(), &[0, 1]);
    let (log, rec) = recorder();
    input.events().on_any(rec);

    input.assign_device_to_player("gamepad-0", 0).unwrap();
    input.assign_device_to_player("gamepad-0", 2).unwrap();
    // Overwriting an occupied slot only announces the newcomer.
    input.assign_device_to_player("gamepad-1", 2).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            (Some(0), InputKind::PlayerDeviceAssigned { player: 0 }),
            (Some(0), InputKind::PlayerDeviceUnassigned { player: 0 }),
            (Some(2), InputKind::PlayerDeviceAssigned { player: 2 }),
            (Some(2), InputKind::PlayerDeviceAssigned { player: 2 }),
        ]
    );
    assert_eq!(input.player_of("gamepad-0"), None);
    assert_eq!(input.player_device_id(2), Some("gamepad-1"));

    assert!(matches!(
        input.assign_device_to_player("nope", 0),
        Err(InputError::UnknownDevice(id)) if id == "nope"
    ));
    assert_eq!(input.unassign_player(2), Some("gamepad-1".to_string()));
    assert_eq!(input.unassign_player(2), None);
    assert_eq!(input.unassign_player(7), None);
}

#[test]
fn removed_device_leaves_a_dangling_slot() {
    let (mut input, pads) = with_pads(ManagerConfig::default(), &[0]);
    pads.borrow_mut().pad(0).buttons[0] = RawButton::down();
    pads.borrow_mut().pad(0).axes[0] = 1.0;
    input.advance(FRAME);

    let removed = input.remove_device("gamepad-0").unwrap();
    assert!(!removed.is_connected());
    assert!(input.remove_device("gamepad-0").is_none());

    assert_eq!(input.player_device_id(0), Some("gamepad-0"));
    assert!(input.player_device(0).is_none());
    assert!(!input.has_player_device(0));
    assert!(input.player_input(0).is_none());
    assert!(!input.is_button_pressed_for_player(0, 0));
    assert_eq!(input.axis_for_player(0, 0), 0.0);
    assert!(!input.is_button_pressed(0));
}

#[test]
fn duplicate_device_ids_are_rejected() {
    let (mut input, pads) = with_pads(manual(), &[0]);
    let source: SharedGamepadSource = pads.clone();
    let twin = padlink::PhysicalGamepadDevice::new(0, source, Default::default(), Default::default());
    assert!(matches!(input.add_device(twin), Err(InputError::DuplicateDevice(_))));
}

#[test]
fn player_listeners_only_hear_their_slot() {
    let (mut input, pads) = with_pads(ManagerConfig::default(), &[0]);
    let (log, rec) = recorder();
    input.on_player(1, rec);

    pads.borrow_mut().plug(1);
    input.advance(FRAME);
    pads.borrow_mut().pad(0).buttons[0] = RawButton::down();
    pads.borrow_mut().pad(1).buttons[2] = RawButton::down();
    input.advance(FRAME);

    assert_eq!(
        kinds(&log),
        vec![
            InputKind::PlayerDeviceAssigned { player: 1 },
            InputKind::ButtonDown { button: 2 },
        ]
    );
    assert!(log.borrow().iter().all(|(p, _)| *p == Some(1)));
}

#[test]
fn rumble_reaches_connected_pads() {
    let config = ManagerConfig {
        assign_rumble: None,
        ..ManagerConfig::default()
    };
    let (mut input, pads) = with_pads(config, &[0, 1]);
    let strong = Rumble {
        duration_ms: 50,
        weak_magnitude: 0.0,
        strong_magnitude: 1.0,
    };

    assert_eq!(input.vibrate(&strong), 2);
    assert!(input.vibrate_for_player(1, &strong));
    assert!(!input.vibrate_for_player(3, &strong));
    assert_eq!(pads.borrow().rumbles.len(), 3);
    assert_eq!(pads.borrow().rumbles[2], (1, strong));
}

#[test]
fn touch_device_drives_a_player() {
    let mut input = InputManager::new();
    let (renderer, _) = RecordingRenderer::screen();
    let id = input
        .create_virtual_device(VirtualSurfaceDevice::builder().id("touch").renderer(renderer))
        .unwrap();
    input
        .virtual_device_mut(&id)
        .unwrap()
        .create_button(ControlSpec::button("jump", Point::new(700.0, 500.0), StandardButton::A))
        .unwrap();
    input.assign_device_to_player(&id, 0).unwrap();
    let (log, rec) = recorder();
    input.events().on_any(rec);

    let tap = |phase| PointerEvent::single(phase, Pointer::touch(9, 705.0, 500.0));
    assert!(input.handle_pointer(&tap(PointerPhase::Start)));
    input.advance(FRAME);
    assert!(input.is_button_pressed_for_player(StandardButton::A, 0));
    assert_eq!(input.virtual_devices().count(), 1);

    input.handle_pointer(&tap(PointerPhase::End));
    input.advance(FRAME);
    assert_eq!(
        *log.borrow(),
        vec![
            (Some(0), InputKind::ButtonDown { button: 0 }),
            (Some(0), InputKind::ButtonUp { button: 0, duration: FRAME }),
            (Some(0), InputKind::ButtonPress { button: 0, duration: FRAME }),
        ]
    );
}

#[test]
fn snapshot_reflects_every_device() {
    let (mut input, pads) = with_pads(manual(), &[0, 1]);
    pads.borrow_mut().pad(1).buttons[4] = RawButton::down();
    pads.borrow_mut().pad(1).axes[2] = 0.25;
    input.advance(FRAME);

    let snap = input.snapshot();
    assert_eq!(snap.len(), 2);
    let pad1 = snap.get("gamepad-1").unwrap();
    assert!(pad1.connected);
    assert!(pad1.pressed(4));
    assert_eq!(pad1.axis(2), 0.25);
    assert_eq!(pad1.timestamp, FRAME);
    assert!(!snap.get("gamepad-0").unwrap().pressed(4));
}

#[test]
fn config_validation_surfaces_through_the_manager() {
    let bad = ManagerConfig {
        max_players: 0,
        ..ManagerConfig::default()
    };
    assert!(matches!(InputManager::with_config(bad), Err(InputError::Config(_))));
}

#[test]
fn stream_timestamps_share_one_clock() {
    let (mut input, pads) = with_pads(manual(), &[]);
    let stamps = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&stamps);
    input
        .events()
        .on_any(move |e: &padlink::InputEvent| sink.borrow_mut().push((e.kind, e.at)));

    for _ in 0..10 {
        input.advance(ms(1000));
    }
    pads.borrow_mut().plug(0);
    input.advance(FRAME);
    input.assign_device_to_player("gamepad-0", 0).unwrap();
    pads.borrow_mut().pad(0).buttons[0] = RawButton::down();
    input.advance(FRAME);
    pads.borrow_mut().pad(0).buttons[0] = RawButton::default();
    input.advance(FRAME);

    let stamps = stamps.borrow();
    assert_eq!(
        *stamps,
        vec![
            (InputKind::Connected, ms(10_000)),
            (InputKind::PlayerDeviceAssigned { player: 0 }, ms(10_016)),
            (InputKind::ButtonDown { button: 0 }, ms(10_032)),
            (InputKind::ButtonUp { button: 0, duration: FRAME }, ms(10_048)),
            (InputKind::ButtonPress { button: 0, duration: FRAME }, ms(10_048)),
        ]
    );
    assert!(stamps.windows(2).all(|w| w[0].1 <= w[1].1));
    assert_eq!(input.now(), ms(10_048));
}

#[test]
fn reused_id_does_not_inherit_a_dangling_slot() {
    let (mut input, pads) = with_pads(ManagerConfig::default(), &[0]);
    input.remove_device("gamepad-0").unwrap();
    assert_eq!(input.player_device_id(0), Some("gamepad-0"));

    let (log, rec) = recorder();
    input.events().on_any(rec);
    let source: SharedGamepadSource = pads.clone();
    let replacement = padlink::PhysicalGamepadDevice::new(0, source, Default::default(), Default::default());
    input.add_device(replacement).unwrap();
    pads.borrow_mut().pad(0).buttons[0] = RawButton::down();
    input.advance(FRAME);

    assert_eq!(
        *log.borrow(),
        vec![
            (Some(0), InputKind::PlayerDeviceUnassigned { player: 0 }),
            (None, InputKind::Connected),
            (None, InputKind::ButtonDown { button: 0 }),
        ]
    );
    assert_eq!(input.player_device_id(0), None);
    assert!(!input.has_player_device(0));
    assert!(!input.is_button_pressed_for_player(StandardButton::A, 0));
    assert!(input.is_button_pressed(StandardButton::A));
}

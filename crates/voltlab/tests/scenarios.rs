//! End-to-end scenarios against the public facade.

use std::sync::Arc;
use std::time::Duration;

use voltlab::{
    solve, solve_with_time, ControllerSimulator, Element, ElementKind, Engine, LedColor, NetMap,
    Node, PinKind, Properties, Runtime, Wire,
};

fn two_terminal(id: &str, kind: ElementKind) -> Element {
    Element::new(
        id,
        kind,
        vec![
            Node::new(format!("{id}.a"), id),
            Node::new(format!("{id}.b"), id),
        ],
    )
}

fn battery(id: &str, volts: f64) -> Element {
    let mut e = two_terminal(id, ElementKind::Battery);
    e.properties.voltage = Some(volts);
    e
}

fn resistor(id: &str, ohms: f64) -> Element {
    let mut e = two_terminal(id, ElementKind::Resistor);
    e.properties.resistance = Some(ohms);
    e
}

fn red_led(id: &str) -> Element {
    let mut e = two_terminal(id, ElementKind::Led);
    e.properties.color = Some(LedColor::Red);
    e
}

fn controller(id: &str) -> Element {
    Element::new(
        id,
        ElementKind::Controller,
        vec![
            Node::with_placeholder(format!("{id}.p0"), id, "P0"),
            Node::with_placeholder(format!("{id}.3v"), id, "3V"),
            Node::with_placeholder(format!("{id}.gnd"), id, "GND"),
        ],
    )
}

fn wire(id: &str, from: &str, to: &str) -> Wire {
    Wire::new(id, from, to)
}

fn by_id<'a>(elements: &'a [Element], id: &str) -> &'a Element {
    elements.iter().find(|e| e.id == id).unwrap()
}

fn exploded(element: &Element) -> bool {
    element.runtime.is_exploded()
}

#[test]
fn series_current_is_source_over_total_resistance() {
    let elements = vec![battery("v1", 6.0), resistor("r1", 1000.0), resistor("r2", 2000.0)];
    let forward = vec![
        wire("w1", "v1.a", "r1.a"),
        wire("w2", "r1.b", "r2.a"),
        wire("w3", "r2.b", "v1.b"),
    ];
    // Same loop, wires reversed and reordered.
    let rerouted = vec![
        wire("w3", "r2.b", "v1.b"),
        wire("w2", "r2.a", "r1.b"),
        wire("w1", "r1.a", "v1.a"),
    ];

    let i = 6.0 / 3000.0;
    for wires in [forward, rerouted] {
        let out = solve(&elements, &wires);
        for id in ["v1", "r1", "r2"] {
            assert!(
                (by_id(&out, id).computed.current - i).abs() < 1e-9,
                "{id} current off"
            );
        }
    }
}

#[test]
fn connectivity_is_transitive_and_splits_on_wire_removal() {
    let elements = vec![
        resistor("r1", 100.0),
        resistor("r2", 100.0),
        resistor("r3", 100.0),
    ];
    let mut wires = vec![wire("w1", "r1.b", "r2.a"), wire("w2", "r2.a", "r3.a")];

    let map = NetMap::build(&elements, &wires);
    assert!(map.connected("r1.b", "r2.a"));
    assert!(map.connected("r2.a", "r3.a"));
    assert!(map.connected("r1.b", "r3.a"));

    // Deleting the sole connecting wire splits the class next tick.
    wires[1].deleted = true;
    let map = NetMap::build(&elements, &wires);
    assert!(map.connected("r1.b", "r2.a"));
    assert!(!map.connected("r1.b", "r3.a"));
}

#[test]
fn closed_switch_is_indistinguishable_from_a_wire() {
    // Position defaults to A, conducting terminal a to the common c.
    let switch = Element::new(
        "s1",
        ElementKind::SlideSwitch,
        vec![
            Node::new("s1.a", "s1"),
            Node::new("s1.c", "s1"),
            Node::new("s1.b", "s1"),
        ],
    );

    let switched = solve(
        &[battery("v1", 5.0), resistor("r1", 500.0), switch],
        &[
            wire("w1", "v1.a", "r1.a"),
            wire("w2", "r1.b", "s1.a"),
            wire("w3", "s1.c", "v1.b"),
        ],
    );
    let wired = solve(
        &[battery("v1", 5.0), resistor("r1", 500.0)],
        &[wire("w1", "v1.a", "r1.a"), wire("w2", "r1.b", "v1.b")],
    );

    let a = &by_id(&switched, "r1").computed;
    let b = &by_id(&wired, "r1").computed;
    assert_eq!(a.current, b.current);
    assert_eq!(a.voltage, b.voltage);
    assert_eq!(a.power, b.power);
}

#[test]
fn led_at_125_percent_explodes_within_one_tick() {
    // (3.3 - 1.0) / 92 = 25 mA, 1.25x the 20 mA rating.
    let elements = vec![battery("v1", 3.3), resistor("r1", 92.0), red_led("d1")];
    let wires = vec![
        wire("w1", "v1.a", "r1.a"),
        wire("w2", "r1.b", "d1.a"),
        wire("w3", "d1.b", "v1.b"),
    ];

    let out = solve_with_time(&elements, &wires, 0.001, 0.0);
    assert!(exploded(by_id(&out, "d1")));

    // Once exploded the junction is gone: the next tick sees an open.
    let next = solve_with_time(&out, &wires, 0.016, 0.016);
    assert!(exploded(by_id(&next, "d1")));
    assert_eq!(by_id(&next, "d1").computed.current, 0.0);
    assert_eq!(by_id(&next, "r1").computed.current, 0.0);
}

#[test]
fn led_at_99_percent_runs_forever() {
    // (3.3 - 1.0) / 116.17 = 19.8 mA, just under the rating.
    let elements = vec![battery("v1", 3.3), resistor("r1", 116.17), red_led("d1")];
    let wires = vec![
        wire("w1", "v1.a", "r1.a"),
        wire("w2", "r1.b", "d1.a"),
        wire("w3", "d1.b", "v1.b"),
    ];

    let mut snapshot = elements;
    let mut now = 0.0;
    for _ in 0..5_000 {
        snapshot = solve_with_time(&snapshot, &wires, 0.02, now);
        now += 0.02;
        assert!(!exploded(by_id(&snapshot, "d1")));
    }
    // It is lit the whole time.
    match &by_id(&snapshot, "d1").runtime {
        Runtime::Led { brightness, .. } => assert!(*brightness > 0.9),
        other => panic!("expected LED runtime, got {other:?}"),
    }
}

#[test]
fn led_under_low_voltage_guard_never_explodes() {
    // 2.2 V through 1 ohm: 1.2 A through the LED, 60x its rating, but
    // the drive sits at the guard threshold so it never dies.
    let elements = vec![battery("v1", 2.2), resistor("r1", 1.0), red_led("d1")];
    let wires = vec![
        wire("w1", "v1.a", "r1.a"),
        wire("w2", "r1.b", "d1.a"),
        wire("w3", "d1.b", "v1.b"),
    ];

    let mut snapshot = elements;
    let mut now = 0.0;
    for _ in 0..5_000 {
        snapshot = solve_with_time(&snapshot, &wires, 0.02, now);
        now += 0.02;
        let d1 = by_id(&snapshot, "d1");
        assert!(!exploded(d1));
        assert!(d1.computed.current > 1.0, "guard must not limit current");
    }
}

#[test]
fn safely_limited_led_survives_a_nine_volt_supply() {
    // 9 V behind 530 ohms: 15.1 mA forward, about 15 mW at the junction.
    // Well inside both ratings, so it runs indefinitely even though the
    // drive is far above the guard threshold.
    let elements = vec![battery("v1", 9.0), resistor("r1", 530.0), red_led("d1")];
    let wires = vec![
        wire("w1", "v1.a", "r1.a"),
        wire("w2", "r1.b", "d1.a"),
        wire("w3", "d1.b", "v1.b"),
    ];

    let mut snapshot = elements;
    let mut now = 0.0;
    for _ in 0..5_000 {
        snapshot = solve_with_time(&snapshot, &wires, 0.02, now);
        now += 0.02;
        assert!(!exploded(by_id(&snapshot, "d1")));
    }
    let d1 = by_id(&snapshot, "d1");
    assert!((d1.computed.power - 8.0 / 530.0).abs() < 1e-6, "P = {}", d1.computed.power);
    match &d1.runtime {
        Runtime::Led { brightness, .. } => assert!(*brightness > 0.7),
        other => panic!("expected LED runtime, got {other:?}"),
    }
}

#[test]
fn repeated_zero_dt_solves_are_idempotent() {
    let mut pot = Element::new(
        "p1",
        ElementKind::Potentiometer,
        vec![
            Node::new("p1.a", "p1"),
            Node::new("p1.w", "p1"),
            Node::new("p1.b", "p1"),
        ],
    );
    pot.properties = Properties {
        resistance: Some(10_000.0),
        ratio: Some(0.3),
        ..Properties::default()
    };
    let elements = vec![battery("v1", 5.0), pot, resistor("r1", 470.0), red_led("d1")];
    let wires = vec![
        wire("w1", "v1.a", "p1.a"),
        wire("w2", "p1.w", "r1.a"),
        wire("w3", "r1.b", "d1.a"),
        wire("w4", "d1.b", "v1.b"),
        wire("w5", "p1.b", "v1.b"),
    ];

    let once = solve_with_time(&elements, &wires, 0.0, 1.0);
    let twice = solve_with_time(&once, &wires, 0.0, 1.0);
    for (a, b) in once.iter().zip(&twice) {
        assert_eq!(a.computed, b.computed, "element {}", a.id);
        assert_eq!(a.runtime, b.runtime, "element {}", a.id);
    }
}

#[test]
fn nine_volt_battery_with_internal_resistance() {
    let mut v1 = battery("v1", 9.0);
    v1.properties.internal_resistance = Some(1.45);
    let out = solve(
        &[v1, resistor("r1", 1000.0)],
        &[wire("w1", "v1.a", "r1.a"), wire("w2", "r1.b", "v1.b")],
    );

    let r1 = &by_id(&out, "r1").computed;
    assert!((r1.current - 0.00899).abs() < 1e-5, "I = {}", r1.current);
    assert!((r1.power - 0.0808).abs() < 1e-4, "P = {}", r1.power);
}

#[test]
fn led_on_the_controller_rail_explodes_in_one_tick() {
    // Red LED off the 3.3 V rail with only 1 ohm of wiring resistance.
    let elements = vec![controller("mb1"), resistor("r1", 1.0), red_led("d1")];
    let wires = vec![
        wire("w1", "mb1.3v", "r1.a"),
        wire("w2", "r1.b", "d1.a"),
        wire("w3", "d1.b", "mb1.gnd"),
    ];

    let out = solve_with_time(&elements, &wires, 0.016, 0.0);
    assert!(exploded(by_id(&out, "d1")));
}

struct Recorder {
    tx: crossbeam_channel::Sender<(String, f64, PinKind)>,
}

impl ControllerSimulator for Recorder {
    fn set_external_pin_value(
        &self,
        pin: &str,
        value: f64,
        kind: PinKind,
    ) -> voltlab_bridge::Result<()> {
        self.tx.send((pin.to_owned(), value, kind)).unwrap();
        Ok(())
    }
}

#[test]
fn controller_pin_reads_follow_wiring() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let engine = Engine::new();
    engine.register_controller("mb1", Arc::new(Recorder { tx }));

    let elements = vec![controller("mb1")];
    // Each tick delivers the pin voltage for analog reads, then the
    // thresholded logic level.
    let recv = || rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // Wired to GND: reads low.
    engine.tick(&elements, &[wire("w1", "mb1.p0", "mb1.gnd")], 0.016, 0.0);
    assert_eq!(recv(), ("P0".to_owned(), 0.0, PinKind::Analog));
    assert_eq!(recv(), ("P0".to_owned(), 0.0, PinKind::Digital));

    // Wired to the 3.3 V rail: reads high.
    engine.tick(&elements, &[wire("w1", "mb1.p0", "mb1.3v")], 0.016, 0.016);
    assert_eq!(recv(), ("P0".to_owned(), 3.3, PinKind::Analog));
    assert_eq!(recv(), ("P0".to_owned(), 1.0, PinKind::Digital));

    // Unconnected: floating reads low.
    engine.tick(&elements, &[], 0.016, 0.032);
    assert_eq!(recv(), ("P0".to_owned(), 0.0, PinKind::Analog));
    assert_eq!(recv(), ("P0".to_owned(), 0.0, PinKind::Digital));
}

#[test]
fn motor_spins_up_toward_steady_state() {
    let mut motor = two_terminal("m1", ElementKind::Motor);
    motor.properties.resistance = Some(12.0);
    // 9 V across a 12 ohm winding: 0.75 A.
    let elements = vec![battery("v1", 9.0), motor];
    let wires = vec![wire("w1", "v1.a", "m1.a"), wire("w2", "m1.b", "v1.b")];

    let mut snapshot = elements;
    let mut now = 0.0;
    let mut last_omega = 0.0;
    for _ in 0..200 {
        snapshot = solve_with_time(&snapshot, &wires, 0.01, now);
        now += 0.01;
        match &by_id(&snapshot, "m1").runtime {
            Runtime::Motor { omega, rpm } => {
                assert!(*omega >= last_omega, "spin-up is monotonic");
                assert!(*rpm >= 0.0);
                last_omega = *omega;
            }
            other => panic!("expected motor runtime, got {other:?}"),
        }
    }
    assert!(last_omega > 0.0);
}

#[test]
fn reset_revives_an_exploded_led() {
    let elements = vec![battery("v1", 3.3), resistor("r1", 92.0), red_led("d1")];
    let wires = vec![
        wire("w1", "v1.a", "r1.a"),
        wire("w2", "r1.b", "d1.a"),
        wire("w3", "d1.b", "v1.b"),
    ];

    let engine = Engine::new();
    let blown = engine.tick(&elements, &wires, 0.016, 0.0);
    assert!(exploded(by_id(&blown, "d1")));

    let fresh = engine.reset(&blown);
    assert!(!exploded(by_id(&fresh, "d1")));

    // With a sane resistor swapped in, the revived LED lights again.
    let mut repaired = fresh;
    repaired
        .iter_mut()
        .find(|e| e.id == "r1")
        .unwrap()
        .properties
        .resistance = Some(330.0);
    let out = engine.tick(&repaired, &wires, 0.016, 1.0);
    assert!(!exploded(by_id(&out, "d1")));
    assert!(by_id(&out, "d1").computed.current > 0.0);
}

use std::collections::HashMap;

use logsim::device::{DeviceKind, DeviceState, Signal};
use logsim::simulator::{SimulationError, Simulator};
use maplit::hashmap;

fn load(source: &str) -> Simulator {
    let mut sim = Simulator::new();
    assert!(sim.load(source), "load failed:\n{}", sim.error_report());
    sim
}

#[test]
fn nand_of_high_and_low_is_high() {
    let mut sim = load(
        "SWITCH a = 1; SWITCH b = 0; NAND g(IN = 2);
         CONNECT a -> g.I1; CONNECT b -> g.I2;
         MONITOR g;",
    );
    sim.run(3).unwrap();
    let traces: HashMap<String, Vec<Signal>> = sim.traces().into_iter().collect();
    assert_eq!(
        traces,
        hashmap! {
            "g".to_string() => vec![Signal::High; 3],
        }
    );
}

#[test]
fn gate_truth_values() {
    // One row of inputs (High, Low) across every two-input gate.
    let mut sim = load(
        "SWITCH a = 1, b = 0;
         AND and1(IN = 2); OR or1(IN = 2); NAND nand1(IN = 2);
         NOR nor1(IN = 2); XOR xor1;
         CONNECT a -> and1.I1, b -> and1.I2;
         CONNECT a -> or1.I1, b -> or1.I2;
         CONNECT a -> nand1.I1, b -> nand1.I2;
         CONNECT a -> nor1.I1, b -> nor1.I2;
         CONNECT a -> xor1.I1, b -> xor1.I2;
         MONITOR and1, or1, nand1, nor1, xor1;",
    );
    sim.run(1).unwrap();
    let traces = sim.traces();
    assert_eq!(traces["and1"], vec![Signal::Low]);
    assert_eq!(traces["or1"], vec![Signal::High]);
    assert_eq!(traces["nand1"], vec![Signal::High]);
    assert_eq!(traces["nor1"], vec![Signal::Low]);
    assert_eq!(traces["xor1"], vec![Signal::High]);

    // Both inputs high flips XOR low and AND high.
    sim.set_switch("b", Signal::High);
    sim.continue_run(1).unwrap();
    let traces = sim.traces();
    assert_eq!(traces["and1"], vec![Signal::Low, Signal::High]);
    assert_eq!(traces["xor1"], vec![Signal::High, Signal::Low]);
}

#[test]
fn not_gate_inverts() {
    let mut sim = load("SWITCH a = 0; NOT n; CONNECT a -> n.I1; MONITOR n;");
    sim.run(2).unwrap();
    sim.set_switch("a", Signal::High);
    sim.continue_run(2).unwrap();
    assert_eq!(
        sim.traces()["n"],
        vec![Signal::High, Signal::High, Signal::Low, Signal::Low]
    );
}

#[test]
fn dtype_latches_high_data_on_a_rising_edge() {
    let mut sim = load(
        "SWITCH hi = 1, lo = 0;
         CLOCK clk(PERIOD = 1);
         DTYPE d;
         CONNECT clk -> d.CLK, hi -> d.DATA, lo -> d.SET, lo -> d.CLEAR;
         MONITOR d.Q;",
    );
    sim.run(6).unwrap();
    let traces = sim.traces();
    let trace = &traces["d.Q"];
    assert_eq!(trace.len(), 6);
    // Every recorded level is a steady one.
    assert!(trace
        .iter()
        .all(|&level| level == Signal::Low || level == Signal::High));
    // A half period of 1 guarantees a rising edge within the first two
    // cycles; Q follows DATA high and never falls again.
    assert!(trace[1..].contains(&Signal::High));
    let first_high = trace.iter().position(|&level| level == Signal::High).unwrap();
    assert!(first_high <= 1);
    assert!(trace[first_high..]
        .iter()
        .all(|&level| level == Signal::High));
}

#[test]
fn dtype_clear_beats_set() {
    let mut sim = load(
        "SWITCH hi = 1;
         CLOCK ck(PERIOD = 1);
         DTYPE d;
         CONNECT ck -> d.CLK, hi -> d.SET, hi -> d.CLEAR, hi -> d.DATA;
         MONITOR d.Q, d.QBAR;",
    );
    sim.run(3).unwrap();
    let traces = sim.traces();
    assert_eq!(traces["d.Q"], vec![Signal::Low; 3]);
    assert_eq!(traces["d.QBAR"], vec![Signal::High; 3]);
}

#[test]
fn clock_toggles_at_its_half_period() {
    let mut sim = load("CLOCK ck(PERIOD = 2); MONITOR ck;");
    sim.run(8).unwrap();
    let traces = sim.traces();
    let trace = &traces["ck"];
    assert_eq!(trace.len(), 8);
    // Edges arrive exactly every two cycles, whatever the random phase.
    let edges: Vec<usize> = trace
        .iter()
        .enumerate()
        .filter(|(_, &level)| level == Signal::Rising || level == Signal::Falling)
        .map(|(cycle, _)| cycle)
        .collect();
    assert!(!edges.is_empty());
    for pair in edges.windows(2) {
        assert_eq!(pair[1] - pair[0], 2);
    }
    // Edge directions alternate.
    let markers: Vec<Signal> = trace
        .iter()
        .copied()
        .filter(|&level| level == Signal::Rising || level == Signal::Falling)
        .collect();
    for pair in markers.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

#[test]
fn feedback_through_an_inverter_oscillates() {
    let mut sim = load("NOT g; CONNECT g -> g.I1;");
    assert_eq!(
        sim.run(1),
        Err(SimulationError::Oscillation { cycle: 1 })
    );
}

#[test]
fn cold_startup_randomises_into_range() {
    let mut sim = load(
        "CLOCK c[1 TO 5](PERIOD = 3);
         SWITCH lo = 0; CLOCK ck(PERIOD = 1); DTYPE d;
         CONNECT ck -> d.CLK, lo -> d.SET, lo -> d.CLEAR, lo -> d.DATA;",
    );
    for _ in 0..20 {
        sim.devices_().cold_startup();
        for id in sim.devices().find_devices(Some(DeviceKind::Clock)) {
            let device = sim.devices().get_device(id).unwrap();
            let DeviceState::Clock {
                half_period,
                counter,
            } = device.state
            else {
                panic!("clock without clock state");
            };
            assert!(counter < half_period);
            assert!(matches!(
                device.output(None),
                Some(Signal::Low | Signal::High)
            ));
        }
        for id in sim.devices().find_devices(Some(DeviceKind::Dtype)) {
            let device = sim.devices().get_device(id).unwrap();
            assert!(matches!(
                device.state,
                DeviceState::Dtype {
                    memory: Signal::Low | Signal::High
                }
            ));
        }
    }
}

#[test]
fn every_monitor_records_once_per_cycle() {
    let mut sim = load(
        "SWITCH a = 1; NAND g(IN = 1); CONNECT a -> g.I1;
         MONITOR g, a;",
    );
    sim.run(5).unwrap();
    for trace in sim.traces().values() {
        assert_eq!(trace.len(), 5);
    }
    sim.continue_run(3).unwrap();
    for trace in sim.traces().values() {
        assert_eq!(trace.len(), 8);
    }
    // A fresh run clears the records.
    sim.run(2).unwrap();
    for trace in sim.traces().values() {
        assert_eq!(trace.len(), 2);
    }
    assert_eq!(sim.cycles_completed(), 2);
}

#[test]
fn runtime_edits_through_the_command_surface() {
    let mut sim = Simulator::new();
    let ok = sim.load(
        "SWITCH a = 1, b = 0; NAND g(IN = 2);
         CONNECT a -> g.I1; CONNECT b -> g.I2;",
    );
    assert!(ok);

    // Rewire g.I2 from b to a.
    assert!(sim.remove_connection("g.I2"));
    assert_eq!(sim.unconnected_signals(), vec!["g.I2".to_string()]);
    sim.add_connection("a", "g.I2").unwrap();

    sim.add_monitor("g").unwrap();
    assert_eq!(
        sim.add_monitor("g"),
        Err(sim.monitors().codes.monitor_present)
    );
    assert_eq!(
        sim.add_monitor("nothere"),
        Err(sim.network().codes.device_absent)
    );
    assert_eq!(
        sim.add_monitor("g.I1"),
        Err(sim.monitors().codes.not_output)
    );

    sim.run(2).unwrap();
    // NAND of (High, High) is Low.
    assert_eq!(sim.traces()["g"], vec![Signal::Low; 2]);

    assert!(sim.remove_monitor("g"));
    assert!(!sim.remove_monitor("g"));
}

#[test]
fn monitored_circuit_outputs_trace_like_any_signal() {
    let mut sim = load(
        "CIRCUIT buf {
             AND g(IN = 1);
             INPUT i = g.I1;
             OUTPUT o = g;
         }
         SWITCH s = 1;
         CONNECT s -> buf.i;
         MONITOR buf.o;",
    );
    sim.run(2).unwrap();
    assert_eq!(sim.traces()["buf_g"], vec![Signal::High; 2]);
}

use logsim::device::{DeviceKind, Signal};
use logsim::names::ErrorCode;
use logsim::simulator::Simulator;

/// Compiles a source, keeping whatever diagnostics it produced.
fn compile(source: &str) -> Simulator {
    let mut sim = Simulator::new();
    sim.load(source);
    sim
}

fn first_error(sim: &Simulator) -> ErrorCode {
    sim.errors().errors().first().expect("an error").code
}

#[test]
fn well_formed_device_statements() {
    let sources = [
        "SWITCH sw[1 TO 2] = 0, sw[11 TO 12] = 1;",
        "NAND nand100(IN = 3), nand6          (IN = 4);",
        "NAND nand[1 TO 2](IN = 3), nand[3 TO 4](IN = 4);",
        "XOR a, b[2 TO 5];",
        "CLOCK clk(PERIOD =           50), ck(PERIOD = 20);",
        "DTYPE d[1 TO 2];",
        "NOR nor1(IN = 2);",
    ];
    for source in sources {
        let sim = compile(source);
        assert_eq!(sim.errors().error_count(), 0, "unexpected errors: {}", source);
    }
}

#[test]
fn switch_loops_expand_with_their_levels() {
    let sim = compile("SWITCH sw[1 TO 2] = 0, sw[11 TO 12] = 1;");
    let switches = sim.devices().find_devices(Some(DeviceKind::Switch));
    assert_eq!(switches.len(), 4);
    for (name, level) in [
        ("sw1", Signal::Low),
        ("sw2", Signal::Low),
        ("sw11", Signal::High),
        ("sw12", Signal::High),
    ] {
        let id = sim.names().query(name).expect(name);
        assert!(switches.contains(&id));
        assert_eq!(sim.devices().get_device(id).unwrap().output(None), Some(level));
    }
}

#[test]
fn clock_loops_expand_like_any_other() {
    let sim = compile("CLOCK c[1 TO 3](PERIOD = 2);");
    assert_eq!(sim.errors().error_count(), 0);
    let clocks = sim.devices().find_devices(Some(DeviceKind::Clock));
    assert_eq!(clocks.len(), 3);
    for name in ["c1", "c2", "c3"] {
        assert!(sim.names().query(name).is_some(), "{} missing", name);
    }
}

#[test]
fn statement_with_syntax_error_creates_nothing() {
    let sim = compile("SWITCH sw[1 TO 2]  0, sw[11 TO 12] = 1;");
    assert_eq!(first_error(&sim), sim.errors().syntax.missing_equals);
    assert!(sim.devices().find_devices(None).is_empty());
}

#[test]
fn first_syntax_error_is_the_right_one() {
    let cases: [(&str, fn(&Simulator) -> ErrorCode); 8] = [
        ("SWITCH sw[1 TO 2]  0, sw[11 TO 12] = 1;", |sim| {
            sim.errors().syntax.missing_equals
        }),
        ("NAND nand100(= 3), nand6          (IN = 4);", |sim| {
            sim.errors().syntax.missing_in
        }),
        ("NAND nand[1 TO 2](IN = 3), nand[3 TO 4](IN = 4)", |sim| {
            sim.errors().syntax.missing_semicolon
        }),
        ("XOR a, b [2 TO 5;", |sim| {
            sim.errors().syntax.missing_close_bracket
        }),
        ("CLOCK clk(PERIOD =           50;", |sim| {
            sim.errors().syntax.missing_close_paren
        }),
        ("CLOCK ck( = 20);", |sim| sim.errors().syntax.missing_period),
        ("CLOCK ck( PERIOD = );", |sim| sim.errors().syntax.not_number),
        ("SWITCH sw1  = ", |sim| {
            sim.errors().syntax.not_binary_digit
        }),
    ];
    for (source, expected) in cases {
        let sim = compile(source);
        assert_eq!(first_error(&sim), expected(&sim), "wrong code for: {}", source);
    }
}

#[test]
fn reserved_words_cannot_name_devices() {
    let sim = compile("SWITCH AND = 0;");
    assert_eq!(first_error(&sim), sim.errors().syntax.reserved_name);

    let sim = compile("XOR TO;");
    assert_eq!(first_error(&sim), sim.errors().syntax.reserved_name);
}

#[test]
fn empty_or_commentary_file_is_reported() {
    for source in ["", "   \n\t\n", "# only a comment\n  # and another\n"] {
        let sim = compile(source);
        assert_eq!(first_error(&sim), sim.errors().syntax.empty_file);
    }
}

#[test]
fn statement_must_open_with_a_keyword() {
    let sim = compile("frobnicate x;");
    assert_eq!(first_error(&sim), sim.errors().syntax.missing_keyword);

    // INPUT is only legal inside a circuit block.
    let sim = compile("INPUT a = g.I1;");
    assert_eq!(first_error(&sim), sim.errors().syntax.missing_keyword);
}

#[test]
fn wiring_violations_surface_their_codes() {
    let cases: [(&str, fn(&Simulator) -> ErrorCode); 6] = [
        ("AND and[1 TO 2](IN = 2); CONNECT and1.I1 -> and2.I1;", |sim| {
            sim.network().codes.input_to_input
        }),
        ("OR or[1 TO 2](IN = 2); CONNECT or1-> or2;", |sim| {
            sim.network().codes.output_to_output
        }),
        (
            "SWITCH sw[1 TO 2] = 0; NAND nand[1 TO 2](IN = 2); \
             CONNECT nand1-> nand2.I1; CONNECT sw1-> nand2.I1;",
            |sim| sim.network().codes.input_connected,
        ),
        ("XOR xor[1 TO 2]; CONNECT xor1 -> xor2.I3;", |sim| {
            sim.network().codes.port_absent
        }),
        ("NAND nand[1 TO 2](IN = 2); CONNECT nand1 -> nand3.I1;", |sim| {
            sim.network().codes.device_absent
        }),
        (
            "DTYPE d; CLOCK clk (PERIOD = 20); NOR nor[1 TO 2](IN=2); \
             CONNECT clk -> d.CLK; CONNECT nor2 -> d.CLK;",
            |sim| sim.network().codes.input_connected,
        ),
    ];
    for (source, expected) in cases {
        let sim = compile(source);
        assert_eq!(first_error(&sim), expected(&sim), "wrong code for: {}", source);
    }
}

#[test]
fn gate_pin_count_is_checked_before_creation() {
    for source in ["AND a(IN = 17);", "AND a(IN = 0);"] {
        let sim = compile(source);
        assert_eq!(first_error(&sim), sim.errors().semantic.invalid_pins);
        assert!(sim.devices().find_devices(None).is_empty());
    }
}

#[test]
fn loop_indices_must_be_ordered() {
    let sim = compile("SWITCH sw[2 TO 1] = 0;");
    assert_eq!(first_error(&sim), sim.errors().semantic.loop_index_bad_order);
    assert!(sim.devices().find_devices(None).is_empty());
}

#[test]
fn duplicate_devices_and_circuits_are_rejected() {
    let sim = compile("SWITCH a = 0; SWITCH a = 1;");
    assert_eq!(first_error(&sim), sim.devices().codes.device_present);

    let sim = compile("CIRCUIT c { AND g(IN = 1); } CIRCUIT c { AND h(IN = 1); }");
    assert_eq!(first_error(&sim), sim.devices().codes.circuit_present);
}

#[test]
fn parsing_continues_after_an_error() {
    // The bad first statement is diagnosed; the rest still parses and is
    // diagnosed too, but nothing is built once a syntax error exists.
    let sim = compile("SWITCH a  0;\nCLOCK ck( = 2);\nSWITCH b = 1;");
    let codes: Vec<ErrorCode> = sim.errors().errors().iter().map(|e| e.code).collect();
    assert_eq!(
        codes,
        vec![
            sim.errors().syntax.missing_equals,
            sim.errors().syntax.missing_period,
        ]
    );
    assert!(sim.devices().find_devices(None).is_empty());
}

#[test]
fn circuit_devices_are_prefixed_and_resolved() {
    let sim = compile(
        "CIRCUIT latch {
             NAND g[1 TO 2](IN = 2);
             CONNECT g1 -> g2.I1, g2 -> g1.I2;
             INPUT s = g1.I1;
             INPUT r = g2.I2;
             OUTPUT q = g1;
         }
         SWITCH set = 1, reset = 1;
         CONNECT set -> latch.s, reset -> latch.r;
         MONITOR latch.q;",
    );
    assert_eq!(sim.errors().error_count(), 0, "{}", sim.error_report());

    // Inner devices exist under their prefixed names; the circuit itself is
    // not a device.
    let g1 = sim.names().query("latch_g1").expect("latch_g1");
    let g2 = sim.names().query("latch_g2").expect("latch_g2");
    assert!(sim.devices().get_device(g1).is_some());
    assert!(sim.devices().get_device(g2).is_some());
    assert_eq!(sim.devices().find_devices(None).len(), 4);
    let latch = sim.names().query("latch").unwrap();
    assert!(sim.devices().get_device(latch).is_none());

    // The circuit input resolved onto the real gate input.
    let set = sim.names().query("set").unwrap();
    let i1 = sim.names().query("I1").unwrap();
    let source = sim.devices().get_device(g1).unwrap().inputs[&i1]
        .source
        .expect("latch_g1.I1 connected");
    assert_eq!(source.device, set);

    // The monitor resolved onto the inner gate output, and no connection
    // references the circuit name.
    assert!(sim.monitors().records().contains_key(&(g1, None)));
    for device in sim.devices().iter() {
        for input in device.inputs.values() {
            if let Some(source) = input.source {
                assert!(!sim.devices().has_circuit(source.device));
            }
        }
    }
}

#[test]
fn circuit_inputs_fan_out() {
    let sim = compile(
        "CIRCUIT buf {
             AND g[1 TO 2](IN = 1);
             INPUT i = g1.I1, i = g2.I1;
             OUTPUT o1 = g1;
             OUTPUT o2 = g2;
         }
         SWITCH s = 1;
         CONNECT s -> buf.i;
         MONITOR buf.o1, buf.o2;",
    );
    assert_eq!(sim.errors().error_count(), 0, "{}", sim.error_report());
    let s = sim.names().query("s").unwrap();
    let i1 = sim.names().query("I1").unwrap();
    for inner in ["buf_g1", "buf_g2"] {
        let id = sim.names().query(inner).expect(inner);
        let source = sim.devices().get_device(id).unwrap().inputs[&i1]
            .source
            .expect("fanned-out input connected");
        assert_eq!(source.device, s);
    }
}

#[test]
fn switches_and_clocks_are_illegal_inside_circuits() {
    let sim = compile("CIRCUIT c { SWITCH s = 1; }");
    assert_eq!(
        first_error(&sim),
        sim.errors().syntax.invalid_circuit_keyword
    );

    let sim = compile("CIRCUIT c { MONITOR x; }");
    assert_eq!(
        first_error(&sim),
        sim.errors().syntax.invalid_circuit_keyword
    );
}

#[test]
fn monitoring_a_multi_output_device_needs_a_port() {
    let sim = compile(
        "DTYPE d; CLOCK ck(PERIOD = 1); SWITCH lo = 0;
         CONNECT ck -> d.CLK, lo -> d.SET, lo -> d.CLEAR, lo -> d.DATA;
         MONITOR d;",
    );
    assert_eq!(first_error(&sim), sim.network().codes.port_absent);
}

#[test]
fn duplicate_monitors_are_rejected() {
    let sim = compile("SWITCH a = 1; MONITOR a, a;");
    assert_eq!(first_error(&sim), sim.monitors().codes.monitor_present);
}

#[test]
fn load_refuses_dangling_inputs() {
    let mut sim = Simulator::new();
    let ok = sim.load("SWITCH a = 1; NAND g(IN = 2); CONNECT a -> g.I1;");
    assert!(!ok);
    assert_eq!(sim.errors().error_count(), 0);
    assert_eq!(sim.unconnected_signals(), vec!["g.I2".to_string()]);
}

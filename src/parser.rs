//! Parses the definition file and builds the logic network.
//!
//! The parser analyses the syntactic and semantic correctness of the symbols
//! it receives from the scanner, and then builds the network. It recovers
//! from errors so the whole file is always processed, giving a diagnostic
//! per problem rather than stopping at the first.
//!
//! ## Error recovery
//! A per-statement `local_error` flag gates every helper: once one helper
//! has reported an error and skipped ahead to the next stopping symbol
//! (`;`, `,`, a keyword, `}` or end of input), the rest of the statement's
//! helpers are no-ops. The flag is cleared between declarations and between
//! statements.
//!
//! ## Two-pass statements
//! Each statement first parses into a list of holder records; the holders
//! are applied to [`Devices`], [`Network`] and [`Monitors`] only while the
//! syntax-error count is still zero, so partially parsed statements never
//! pollute the network. Semantic errors found while applying are recorded
//! against the originating line and abandon the rest of that statement's
//! holders.
//!
//! ## Expansion
//! Indexed-name loops `name[i TO j]` expand into one declaration per index,
//! and every device declared inside `CIRCUIT foo { … }` has its name
//! rewritten to `foo_name`, keeping inner devices of separate circuit
//! instances distinct.

use log::{debug, trace};

use crate::device::{DeviceKind, Devices, SignalRef, MAX_GATE_INPUTS};
use crate::errors::ErrorBus;
use crate::monitor::Monitors;
use crate::names::{ErrorCode, NameId, NameTable};
use crate::network::Network;
use crate::scanner::{Scanner, Symbol, SymbolKind};

/// Interned IDs of the statement keywords, for dispatch.
pub struct Keywords {
    pub and: NameId,
    pub or: NameId,
    pub nand: NameId,
    pub nor: NameId,
    pub xor: NameId,
    pub not: NameId,
    pub dtype: NameId,
    pub clock: NameId,
    pub switch: NameId,
    pub connect: NameId,
    pub circuit: NameId,
    pub monitor: NameId,
    pub input: NameId,
    pub output: NameId,
}

impl Keywords {
    pub fn intern(names: &mut NameTable) -> Self {
        Self {
            and: names.intern("AND"),
            or: names.intern("OR"),
            nand: names.intern("NAND"),
            nor: names.intern("NOR"),
            xor: names.intern("XOR"),
            not: names.intern("NOT"),
            dtype: names.intern("DTYPE"),
            clock: names.intern("CLOCK"),
            switch: names.intern("SWITCH"),
            connect: names.intern("CONNECT"),
            circuit: names.intern("CIRCUIT"),
            monitor: names.intern("MONITOR"),
            input: names.intern("INPUT"),
            output: names.intern("OUTPUT"),
        }
    }

    /// The device kind declared by a statement keyword, if it is one.
    fn device_kind(&self, keyword: NameId) -> Option<DeviceKind> {
        [
            (self.and, DeviceKind::And),
            (self.or, DeviceKind::Or),
            (self.nand, DeviceKind::Nand),
            (self.nor, DeviceKind::Nor),
            (self.xor, DeviceKind::Xor),
            (self.not, DeviceKind::Not),
            (self.dtype, DeviceKind::Dtype),
            (self.clock, DeviceKind::Clock),
            (self.switch, DeviceKind::Switch),
        ]
        .into_iter()
        .find(|&(id, _)| id == keyword)
        .map(|(_, kind)| kind)
    }

    /// Device kinds permitted inside a circuit block: gates and D-types
    /// only, never switches or clocks.
    fn circuit_device_kind(&self, keyword: NameId) -> Option<DeviceKind> {
        match self.device_kind(keyword) {
            Some(DeviceKind::Switch) | Some(DeviceKind::Clock) => None,
            other => other,
        }
    }
}

/// One expanded device declaration, waiting to be applied.
struct DeviceHolder {
    id: NameId,
    property: Option<u32>,
    line: usize,
}

/// One parsed connection, endpoints already circuit-qualified.
struct ConnectionHolder {
    src: SignalRef,
    dst: SignalRef,
    line: usize,
}

/// One parsed monitor target.
struct MonitorHolder {
    target: SignalRef,
    line: usize,
}

/// One parsed `INPUT`/`OUTPUT` binding inside a circuit block.
struct PortBindHolder {
    port: NameId,
    target: SignalRef,
    line: usize,
}

/// Recursive-descent parser over the definition-file grammar.
pub struct Parser<'a> {
    names: &'a mut NameTable,
    devices: &'a mut Devices,
    network: &'a Network,
    monitors: &'a mut Monitors,
    scanner: &'a mut Scanner,
    errors: &'a mut ErrorBus,
    keywords: Keywords,
    symbol: Symbol,
    local_error: bool,
}

impl<'a> Parser<'a> {
    pub fn new(
        names: &'a mut NameTable,
        devices: &'a mut Devices,
        network: &'a Network,
        monitors: &'a mut Monitors,
        scanner: &'a mut Scanner,
        errors: &'a mut ErrorBus,
    ) -> Self {
        let keywords = Keywords::intern(names);
        Self {
            names,
            devices,
            network,
            monitors,
            scanner,
            errors,
            keywords,
            symbol: Symbol {
                kind: SymbolKind::Eof,
                line: 0,
                column: 0,
            },
            local_error: false,
        }
    }

    /// Parses the whole definition file, building the network as statements
    /// complete cleanly. Returns `true` when no error was recorded.
    pub fn parse_network(&mut self) -> bool {
        self.advance();
        if self.symbol.kind == SymbolKind::Eof {
            let code = self.errors.syntax.empty_file;
            self.report_here(code);
        }
        while self.symbol.kind != SymbolKind::Eof {
            match self.symbol.kind {
                SymbolKind::Keyword(keyword) => self.statement(keyword),
                SymbolKind::Semicolon | SymbolKind::Comma => {
                    self.local_error = false;
                    self.advance();
                }
                _ => {
                    let code = self.errors.syntax.missing_keyword;
                    self.fail(code);
                    self.local_error = false;
                    // A stray closing brace is a stopping symbol, but out
                    // here it is not a statement boundary.
                    if self.symbol.kind == SymbolKind::CloseBrace {
                        self.advance();
                    }
                }
            }
        }
        self.errors.error_count() == 0
    }

    /// Dispatches one top-level statement on its keyword.
    fn statement(&mut self, keyword: NameId) {
        trace!("statement at line {}", self.symbol.line + 1);
        if let Some(kind) = self.keywords.device_kind(keyword) {
            self.device_statement(kind, None);
        } else if keyword == self.keywords.connect {
            self.connect_statement(None);
        } else if keyword == self.keywords.monitor {
            self.monitor_statement();
        } else if keyword == self.keywords.circuit {
            self.circuit_statement();
        } else {
            // INPUT and OUTPUT are only meaningful inside a circuit block.
            let code = self.errors.syntax.missing_keyword;
            self.fail(code);
            self.local_error = false;
        }
    }

    // ------------------------------------------------------------------ //
    // Statements

    /// Parses and applies one device-declaration statement of any kind.
    fn device_statement(&mut self, kind: DeviceKind, circuit: Option<NameId>) {
        self.advance();
        let mut holders = Vec::new();
        self.one_device_decl(kind, circuit, &mut holders);
        self.local_error = false;
        while self.symbol.kind == SymbolKind::Comma {
            self.advance();
            self.one_device_decl(kind, circuit, &mut holders);
            self.local_error = false;
        }
        self.local_error = false;
        self.expect_semicolon();
        self.local_error = false;
        if self.errors.syntax_error_count() == 0 {
            self.apply_devices(kind, holders);
        }
    }

    /// Parses a single declaration: a name, an optional `[i TO j]` loop and
    /// the kind's qualifier; expands into holders.
    fn one_device_decl(
        &mut self,
        kind: DeviceKind,
        circuit: Option<NameId>,
        out: &mut Vec<DeviceHolder>,
    ) {
        let Some((name_id, line)) = self.name() else {
            return;
        };
        let mut range = None;
        if self.symbol.kind == SymbolKind::OpenBracket {
            self.advance();
            range = self.loop_range();
            self.expect_close_bracket();
        }
        let property = match kind {
            DeviceKind::Switch => {
                self.expect_equals();
                self.binary_digit()
            }
            DeviceKind::Clock => self.clock_period(),
            DeviceKind::And | DeviceKind::Or | DeviceKind::Nand | DeviceKind::Nor => {
                self.pin_count()
            }
            _ => None,
        };
        if self.local_error {
            return;
        }
        for id in self.expand(name_id, range, circuit) {
            out.push(DeviceHolder { id, property, line });
        }
    }

    /// Applies a statement's device holders, stopping at the first semantic
    /// error.
    fn apply_devices(&mut self, kind: DeviceKind, holders: Vec<DeviceHolder>) {
        for holder in holders {
            if matches!(
                kind,
                DeviceKind::And | DeviceKind::Or | DeviceKind::Nand | DeviceKind::Nor
            ) && !(1..=MAX_GATE_INPUTS).contains(&holder.property.unwrap_or(0))
            {
                let code = self.errors.semantic.invalid_pins;
                self.report_at_line(code, holder.line);
                break;
            }
            debug!(
                "making {:?} {:?}",
                kind,
                self.names.stringify(holder.id).unwrap_or("?")
            );
            if let Err(code) = self
                .devices
                .make_device(self.names, holder.id, kind, holder.property)
            {
                self.report_at_line(code, holder.line);
                break;
            }
        }
    }

    /// Parses and applies a `CONNECT` statement.
    fn connect_statement(&mut self, circuit: Option<NameId>) {
        self.advance();
        let mut holders = Vec::new();
        self.one_connection(circuit, &mut holders);
        self.local_error = false;
        while self.symbol.kind == SymbolKind::Comma {
            self.advance();
            self.one_connection(circuit, &mut holders);
            self.local_error = false;
        }
        self.local_error = false;
        self.expect_semicolon();
        self.local_error = false;
        if self.errors.syntax_error_count() == 0 {
            for holder in holders {
                if let Err(code) = self.network.connect(self.devices, holder.src, holder.dst) {
                    self.report_at_line(code, holder.line);
                    break;
                }
            }
        }
    }

    /// Parses a single `signame -> signame` connection.
    fn one_connection(&mut self, circuit: Option<NameId>, out: &mut Vec<ConnectionHolder>) {
        let Some((src, line)) = self.signame() else {
            return;
        };
        self.expect_connection();
        let Some((dst, _)) = self.signame() else {
            return;
        };
        if self.local_error {
            return;
        }
        let src = self.qualify(circuit, src);
        let dst = self.qualify(circuit, dst);
        out.push(ConnectionHolder { src, dst, line });
    }

    /// Parses and applies a `MONITOR` statement.
    fn monitor_statement(&mut self) {
        self.advance();
        let mut holders = Vec::new();
        self.one_monitor(&mut holders);
        self.local_error = false;
        while self.symbol.kind == SymbolKind::Comma {
            self.advance();
            self.one_monitor(&mut holders);
            self.local_error = false;
        }
        self.local_error = false;
        self.expect_semicolon();
        self.local_error = false;
        if self.errors.syntax_error_count() == 0 {
            for holder in holders {
                // A monitor on a circuit output watches the inner signal it
                // is bound to.
                let target = match self.devices.resolve_output(holder.target) {
                    Some(target) => target,
                    None => {
                        let code = self.network.codes.port_absent;
                        self.report_at_line(code, holder.line);
                        break;
                    }
                };
                if let Err(code) =
                    self.monitors
                        .make_monitor(self.devices, self.network, target.device, target.port)
                {
                    self.report_at_line(code, holder.line);
                    break;
                }
            }
        }
    }

    fn one_monitor(&mut self, out: &mut Vec<MonitorHolder>) {
        let Some((target, line)) = self.signame() else {
            return;
        };
        if self.local_error {
            return;
        }
        out.push(MonitorHolder { target, line });
    }

    /// Parses a `CIRCUIT name { … }` block.
    fn circuit_statement(&mut self) {
        self.advance();
        let Some((circuit_id, line)) = self.name() else {
            self.local_error = false;
            return;
        };
        if let Err(code) = self.devices.make_circuit(circuit_id) {
            self.report_at_line(code, line);
        }
        self.expect_open_brace();
        self.local_error = false;
        loop {
            match self.symbol.kind {
                SymbolKind::Keyword(keyword) => {
                    if let Some(kind) = self.keywords.circuit_device_kind(keyword) {
                        self.device_statement(kind, Some(circuit_id));
                    } else if keyword == self.keywords.connect {
                        self.connect_statement(Some(circuit_id));
                    } else if keyword == self.keywords.input {
                        self.port_bind_statement(circuit_id, false);
                    } else if keyword == self.keywords.output {
                        self.port_bind_statement(circuit_id, true);
                    } else {
                        let code = self.errors.syntax.invalid_circuit_keyword;
                        self.fail(code);
                        self.local_error = false;
                        break;
                    }
                }
                SymbolKind::Semicolon | SymbolKind::Comma => {
                    self.local_error = false;
                    self.advance();
                }
                SymbolKind::CloseBrace | SymbolKind::Eof => break,
                _ => {
                    let code = self.errors.syntax.invalid_circuit_keyword;
                    self.fail(code);
                    self.local_error = false;
                    break;
                }
            }
        }
        self.expect_close_brace();
        self.local_error = false;
    }

    /// Parses and applies an `INPUT` or `OUTPUT` statement of a circuit
    /// block, populating the circuit's template.
    fn port_bind_statement(&mut self, circuit_id: NameId, output: bool) {
        self.advance();
        let mut holders = Vec::new();
        self.one_port_bind(circuit_id, &mut holders);
        self.local_error = false;
        while self.symbol.kind == SymbolKind::Comma {
            self.advance();
            self.one_port_bind(circuit_id, &mut holders);
            self.local_error = false;
        }
        self.local_error = false;
        self.expect_semicolon();
        self.local_error = false;
        if self.errors.syntax_error_count() == 0 {
            for holder in holders {
                let result = if output {
                    self.network.add_circuit_output(
                        self.devices,
                        circuit_id,
                        holder.port,
                        holder.target,
                    )
                } else {
                    self.network.add_circuit_input(
                        self.devices,
                        circuit_id,
                        holder.port,
                        holder.target,
                    )
                };
                if let Err(code) = result {
                    self.report_at_line(code, holder.line);
                    break;
                }
            }
        }
    }

    /// Parses a single `port = signame` binding.
    fn one_port_bind(&mut self, circuit_id: NameId, out: &mut Vec<PortBindHolder>) {
        let line = self.symbol.line;
        let Some(port) = self.port() else {
            return;
        };
        self.expect_equals();
        let Some((target, _)) = self.signame() else {
            return;
        };
        if self.local_error {
            return;
        }
        let target = self.qualify(Some(circuit_id), target);
        out.push(PortBindHolder { port, target, line });
    }

    // ------------------------------------------------------------------ //
    // Expansion

    /// Expands a declaration into its device IDs: one per loop index, with
    /// the circuit prefix applied inside a circuit block.
    fn expand(
        &mut self,
        name_id: NameId,
        range: Option<(u32, u32)>,
        circuit: Option<NameId>,
    ) -> Vec<NameId> {
        let prefix = match circuit {
            Some(circuit_id) => format!("{}_", self.name_string(circuit_id)),
            None => String::new(),
        };
        match range {
            Some((first, last)) => {
                let base = self.name_string(name_id);
                (first..=last)
                    .map(|index| self.names.intern(&format!("{}{}{}", prefix, base, index)))
                    .collect()
            }
            None if circuit.is_some() => {
                let base = self.name_string(name_id);
                vec![self.names.intern(&format!("{}{}", prefix, base))]
            }
            None => vec![name_id],
        }
    }

    /// Rewrites a signal's device name with the circuit prefix.
    fn qualify(&mut self, circuit: Option<NameId>, signal: SignalRef) -> SignalRef {
        match circuit {
            Some(circuit_id) => {
                let name = format!(
                    "{}_{}",
                    self.name_string(circuit_id),
                    self.name_string(signal.device)
                );
                SignalRef::new(self.names.intern(&name), signal.port)
            }
            None => signal,
        }
    }

    fn name_string(&self, id: NameId) -> String {
        self.names.stringify(id).unwrap_or_default().to_string()
    }

    // ------------------------------------------------------------------ //
    // Token-level helpers

    fn advance(&mut self) {
        self.symbol = self.scanner.next_symbol(self.names);
    }

    /// Records an error at the current symbol.
    fn report_here(&mut self, code: ErrorCode) {
        let (line_number, line, column) = self.scanner.line_details(None);
        self.errors.add_error(code, line_number, line, column);
    }

    /// Records an error against an already-consumed line; no caret.
    fn report_at_line(&mut self, code: ErrorCode, line: usize) {
        let (line_number, text, _) = self.scanner.line_details(Some(line));
        self.errors.add_error(code, line_number, text, None);
    }

    /// Reports an error at the current symbol, raises the statement's local
    /// error and resynchronises at the next stopping symbol.
    fn fail(&mut self, code: ErrorCode) {
        self.report_here(code);
        self.local_error = true;
        self.skip_to_stopping_symbol();
    }

    /// Skips to the next of `;`, `,`, a keyword, `}` or end of input.
    fn skip_to_stopping_symbol(&mut self) {
        while !matches!(
            self.symbol.kind,
            SymbolKind::Semicolon
                | SymbolKind::Comma
                | SymbolKind::Keyword(_)
                | SymbolKind::CloseBrace
                | SymbolKind::Eof
        ) {
            self.advance();
        }
    }

    /// Checks the current symbol is a user name and consumes it.
    fn name(&mut self) -> Option<(NameId, usize)> {
        if self.local_error {
            return None;
        }
        match self.symbol.kind {
            SymbolKind::Name(id) => {
                let line = self.symbol.line;
                self.advance();
                Some((id, line))
            }
            SymbolKind::Keyword(_)
            | SymbolKind::To
            | SymbolKind::In
            | SymbolKind::Out
            | SymbolKind::Period => {
                let code = self.errors.syntax.reserved_name;
                self.fail(code);
                None
            }
            _ => {
                let code = self.errors.syntax.not_name;
                self.fail(code);
                None
            }
        }
    }

    /// Checks the current symbol names a port and consumes it.
    fn port(&mut self) -> Option<NameId> {
        if self.local_error {
            return None;
        }
        match self.symbol.kind {
            SymbolKind::Name(id) => {
                self.advance();
                Some(id)
            }
            _ => {
                let code = self.errors.syntax.missing_port;
                self.fail(code);
                None
            }
        }
    }

    /// Parses `name` or `name.port` into a signal reference.
    fn signame(&mut self) -> Option<(SignalRef, usize)> {
        let (device, line) = self.name()?;
        let mut port = None;
        if self.symbol.kind == SymbolKind::Fullstop {
            self.advance();
            port = Some(self.port()?);
        }
        Some((SignalRef::new(device, port), line))
    }

    /// Checks the current symbol is a number and consumes it.
    fn number(&mut self) -> Option<u32> {
        if self.local_error {
            return None;
        }
        match self.symbol.kind {
            SymbolKind::Number(value) => {
                self.advance();
                Some(value)
            }
            _ => {
                let code = self.errors.syntax.not_number;
                self.fail(code);
                None
            }
        }
    }

    /// Checks the current symbol is a `0` or `1` and consumes it.
    fn binary_digit(&mut self) -> Option<u32> {
        if self.local_error {
            return None;
        }
        match self.symbol.kind {
            SymbolKind::Number(value @ (0 | 1)) => {
                self.advance();
                Some(value)
            }
            _ => {
                let code = self.errors.syntax.not_binary_digit;
                self.fail(code);
                None
            }
        }
    }

    /// Parses `(IN = number)`.
    fn pin_count(&mut self) -> Option<u32> {
        self.expect_open_paren();
        self.expect_in();
        self.expect_equals();
        let count = self.number();
        self.expect_close_paren();
        count
    }

    /// Parses `(PERIOD = number)`.
    fn clock_period(&mut self) -> Option<u32> {
        self.expect_open_paren();
        self.expect_period();
        self.expect_equals();
        let period = self.number();
        self.expect_close_paren();
        period
    }

    /// Parses the two numbers of a `[i TO j]` loop, verifying their order.
    fn loop_range(&mut self) -> Option<(u32, u32)> {
        let first = self.number();
        self.expect_to();
        let last = self.number();
        if self.local_error {
            return None;
        }
        let (first, last) = (first?, last?);
        if first > last {
            let code = self.errors.semantic.loop_index_bad_order;
            self.report_here(code);
            self.local_error = true;
            self.skip_to_stopping_symbol();
            return None;
        }
        Some((first, last))
    }

    /// One expected-symbol check; on a mismatch reports and resynchronises.
    fn expect(&mut self, kind: SymbolKind, code: ErrorCode) {
        if self.local_error {
            return;
        }
        if self.symbol.kind == kind {
            self.advance();
        } else {
            self.fail(code);
        }
    }

    fn expect_semicolon(&mut self) {
        let code = self.errors.syntax.missing_semicolon;
        self.expect(SymbolKind::Semicolon, code);
    }

    fn expect_equals(&mut self) {
        let code = self.errors.syntax.missing_equals;
        self.expect(SymbolKind::Equals, code);
    }

    fn expect_close_bracket(&mut self) {
        let code = self.errors.syntax.missing_close_bracket;
        self.expect(SymbolKind::CloseBracket, code);
    }

    fn expect_to(&mut self) {
        let code = self.errors.syntax.missing_to;
        self.expect(SymbolKind::To, code);
    }

    fn expect_in(&mut self) {
        let code = self.errors.syntax.missing_in;
        self.expect(SymbolKind::In, code);
    }

    fn expect_period(&mut self) {
        let code = self.errors.syntax.missing_period;
        self.expect(SymbolKind::Period, code);
    }

    fn expect_connection(&mut self) {
        let code = self.errors.syntax.missing_connection;
        self.expect(SymbolKind::Connection, code);
    }

    fn expect_open_paren(&mut self) {
        let code = self.errors.syntax.missing_open_paren;
        self.expect(SymbolKind::OpenParen, code);
    }

    fn expect_close_paren(&mut self) {
        let code = self.errors.syntax.missing_close_paren;
        self.expect(SymbolKind::CloseParen, code);
    }

    fn expect_open_brace(&mut self) {
        let code = self.errors.syntax.missing_open_brace;
        self.expect(SymbolKind::OpenBrace, code);
    }

    fn expect_close_brace(&mut self) {
        let code = self.errors.syntax.missing_close_brace;
        self.expect(SymbolKind::CloseBrace, code);
    }
}

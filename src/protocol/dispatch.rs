//! Opcode dispatch table (spec §4.6, §7).
//!
//! A received opcode with no table entry is *unknown*; one with a table
//! entry but no bound handler is *unhandled*; a bound handler that returns
//! an error is a *handler error*. None of the three are fatal to the
//! connection — the dispatch boundary swallows all of them into a logged
//! outcome and the session loop continues, mirroring the pack's
//! `soir20-oxide` `ProcessPacketError` handling (never fatal to the
//! connection, always recorded).

use std::collections::HashMap;

use crate::error::ProtocolError;
use crate::protocol::opcodes::OpcodeTable;

pub type HandlerResult = Result<(), ProtocolError>;

type Handler<Ctx> = Box<dyn Fn(&mut Ctx, &[u8]) -> HandlerResult + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    UnknownOpcode(u16),
    UnhandledOpcode(u16),
    HandlerError(u16, String),
}

pub struct DispatchTable<Ctx> {
    opcodes: OpcodeTable,
    handlers: HashMap<u16, Handler<Ctx>>,
}

impl<Ctx> DispatchTable<Ctx> {
    pub fn new(opcodes: OpcodeTable) -> Self {
        Self {
            opcodes,
            handlers: HashMap::new(),
        }
    }

    pub fn bind(
        &mut self,
        opcode: u16,
        handler: impl Fn(&mut Ctx, &[u8]) -> HandlerResult + Send + Sync + 'static,
    ) {
        self.handlers.insert(opcode, Box::new(handler));
    }

    /// Dispatches one frame's payload to its bound handler, if any.
    pub fn dispatch(&self, ctx: &mut Ctx, opcode: u16, payload: &[u8]) -> DispatchOutcome {
        if !self.opcodes.is_known(opcode) {
            tracing::warn!(opcode = format!("{opcode:#06x}"), "unknown opcode");
            return DispatchOutcome::UnknownOpcode(opcode);
        }
        let Some(handler) = self.handlers.get(&opcode) else {
            tracing::warn!(opcode = format!("{opcode:#06x}"), "unhandled opcode");
            return DispatchOutcome::UnhandledOpcode(opcode);
        };
        match handler(ctx, payload) {
            Ok(()) => DispatchOutcome::Handled,
            Err(err) => {
                tracing::error!(opcode = format!("{opcode:#06x}"), error = %err, "handler error");
                DispatchOutcome::HandlerError(opcode, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        calls: u32,
    }

    #[test]
    fn unknown_opcode_never_reaches_a_handler() {
        let table: DispatchTable<Counter> = DispatchTable::new(OpcodeTable::world());
        let mut ctx = Counter { calls: 0 };
        let outcome = table.dispatch(&mut ctx, 0xBEEF, &[]);
        assert_eq!(outcome, DispatchOutcome::UnknownOpcode(0xBEEF));
        assert_eq!(ctx.calls, 0);
    }

    #[test]
    fn known_opcode_without_bound_handler_is_unhandled() {
        let table: DispatchTable<Counter> = DispatchTable::new(OpcodeTable::world());
        let mut ctx = Counter { calls: 0 };
        let outcome = table.dispatch(&mut ctx, crate::protocol::opcodes::world::SERVER_CHAT, &[]);
        assert_eq!(
            outcome,
            DispatchOutcome::UnhandledOpcode(crate::protocol::opcodes::world::SERVER_CHAT)
        );
    }

    #[test]
    fn handler_error_does_not_panic_and_is_reported() {
        let mut table: DispatchTable<Counter> = DispatchTable::new(OpcodeTable::world());
        table.bind(crate::protocol::opcodes::world::SERVER_CHAT, |ctx, _payload| {
            ctx.calls += 1;
            Err(ProtocolError::StringTooLong)
        });
        let mut ctx = Counter { calls: 0 };
        let outcome = table.dispatch(&mut ctx, crate::protocol::opcodes::world::SERVER_CHAT, &[]);
        assert!(matches!(outcome, DispatchOutcome::HandlerError(_, _)));
        assert_eq!(ctx.calls, 1);
    }
}

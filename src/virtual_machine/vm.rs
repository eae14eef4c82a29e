//! Core interpreter implementation.
//!
//! The interpreter runs a strictly sequential fetch-decode-execute loop over its
//! own auto-extending memory. Each step decodes one [`Instruction`] at the program
//! counter, resolves its parameters through their modes, executes it and then either
//! falls through to the next instruction or jumps. All arithmetic uses wrapping
//! semantics to prevent overflow panics.

mod memory;

use crate::debug;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::io::{Input, Output};
use crate::virtual_machine::isa::{Instruction, Opcode, ParamKind};
use crate::virtual_machine::operand::{Mode, Parameter, decode_modes, to_address};
use crate::virtual_machine::program::Program;
use memory::Memory;

/// Lifecycle of an interpreter.
///
/// `Ready` loops back to itself after every retired instruction; `Halted` and
/// `Faulted` are terminal.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Status {
    #[default]
    Ready,
    Halted,
    Faulted,
}

/// Resource limits and write policy for one interpreter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Limits {
    /// Maximum number of memory cells, `None` for unbounded.
    pub max_memory: Option<usize>,
    /// Maximum number of retired instructions, `None` for unbounded.
    pub max_steps: Option<u64>,
    /// Reject write targets in immediate mode. When disabled the write lands
    /// on the cell that held the parameter.
    pub strict_writes: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_memory: None,
            max_steps: None,
            strict_writes: true,
        }
    }
}

/// Where execution continues once an instruction retires.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Next {
    /// Advance past the instruction and its parameters.
    FallThrough,
    /// Continue at an absolute address.
    Jump(usize),
    /// Stop.
    Halt,
}

macro_rules! exec_vm {
    // Entry point
    (
        vm = $vm:ident,
        input = $input:ident,
        output = $output:ident,
        instr = $instr:ident,
        { $( $variant:ident => $handler:ident $args:tt ),* $(,)? }
    ) => {{
        match $instr.opcode {
            $(
                Opcode::$variant => {
                    debug_assert_eq!(
                        Opcode::$variant.kinds(),
                        exec_vm!(@kinds $args),
                        "dispatch operands of {} disagree with the instruction table",
                        Opcode::$variant.mnemonic()
                    );
                    #[allow(unused_mut, unused_variables)]
                    let mut params = $instr.params.iter();
                    exec_vm!(@call $vm, $input, $output, $instr, params, $handler, $args)
                }
            ),*
        }
    }};

    // Operand kinds a handler declares, in slot order
    (@kinds (input; $( $field:ident : $kind:ident ),* $(,)? )) => {
        exec_vm!(@kinds ( $( $field : $kind ),* ))
    };
    (@kinds (output; $( $field:ident : $kind:ident ),* $(,)? )) => {
        exec_vm!(@kinds ( $( $field : $kind ),* ))
    };
    (@kinds ( $( $field:ident : $kind:ident ),* $(,)? )) => {{
        let kinds: &[ParamKind] = &[ $( ParamKind::$kind ),* ];
        kinds
    }};

    // Handler consuming the input stream
    (@call $vm:ident, $input:ident, $output:ident, $instr:ident, $params:ident, $handler:ident,
        (input; $( $field:ident : $kind:ident ),* $(,)? )
    ) => {{
        $( let $field = exec_vm!(@operand $vm, $instr, $params, $kind)?; )*
        $vm.$handler($input, $( $field ),*)
    }};

    // Handler producing on the output stream
    (@call $vm:ident, $input:ident, $output:ident, $instr:ident, $params:ident, $handler:ident,
        (output; $( $field:ident : $kind:ident ),* $(,)? )
    ) => {{
        $( let $field = exec_vm!(@operand $vm, $instr, $params, $kind)?; )*
        $vm.$handler($output, $( $field ),*)
    }};

    // Handler without streams
    (@call $vm:ident, $input:ident, $output:ident, $instr:ident, $params:ident, $handler:ident,
        ( $( $field:ident : $kind:ident ),* $(,)? )
    ) => {{
        $( let $field = exec_vm!(@operand $vm, $instr, $params, $kind)?; )*
        $vm.$handler($( $field ),*)
    }};

    // Resolve to a value
    (@operand $vm:ident, $instr:ident, $params:ident, Read) => {{
        let param = exec_vm!(@next $vm, $instr, $params)?;
        $vm.load(param)
    }};

    // Resolve to a write address
    (@operand $vm:ident, $instr:ident, $params:ident, Write) => {{
        let param = exec_vm!(@next $vm, $instr, $params)?;
        $vm.target(param)
    }};

    // Hand the raw parameter to the handler, resolved only if the jump is taken
    (@operand $vm:ident, $instr:ident, $params:ident, Jump) => {{
        exec_vm!(@next $vm, $instr, $params)
    }};

    (@next $vm:ident, $instr:ident, $params:ident) => {
        $params
            .next()
            .copied()
            .ok_or(VMError::InvalidInstruction {
                opcode: $instr.opcode as i64,
                position: $vm.pc,
            })
    };
}

/// Intcode interpreter.
///
/// Owns its memory, program counter and relative base for its whole
/// lifetime. Streams are borrowed per call to [`VM::run`] or [`VM::step`],
/// so the same interpreter can be driven by in-memory buffers, text
/// streams or channels.
pub struct VM {
    /// Program memory, initialised from the program image.
    memory: Memory,
    /// Address of the next instruction.
    pc: usize,
    /// Base for relative-mode parameters.
    relative_base: i64,
    /// Current lifecycle state.
    status: Status,
    /// Number of retired instructions.
    steps: u64,
    limits: Limits,
}

impl VM {
    /// Creates an interpreter with its own copy of `program` and no limits.
    pub fn new(program: &Program) -> Self {
        Self::with_limits(program, Limits::default())
    }

    /// Creates an interpreter with its own copy of `program`.
    pub fn with_limits(program: &Program, limits: Limits) -> Self {
        Self {
            memory: Memory::new(program.as_slice().to_vec(), limits.max_memory),
            pc: 0,
            relative_base: 0,
            status: Status::Ready,
            steps: 0,
            limits,
        }
    }

    /// Sets the position of the first instruction.
    pub fn start_at(mut self, position: usize) -> Self {
        self.pc = position;
        self
    }

    /// Runs until the program halts or faults.
    ///
    /// Returns immediately if the interpreter already halted. A fault leaves
    /// the interpreter in [`Status::Faulted`].
    pub fn run<I, O>(&mut self, input: &mut I, output: &mut O) -> Result<(), VMError>
    where
        I: Input + ?Sized,
        O: Output + ?Sized,
    {
        while self.step(input, output)? == Status::Ready {}
        debug!(
            "interpreter halted after {} steps with {} memory cells",
            self.steps,
            self.memory.len()
        );
        Ok(())
    }

    /// Fetches, decodes and executes exactly one instruction.
    ///
    /// Once halted, further calls do nothing and report [`Status::Halted`];
    /// once faulted, they fail with [`VMError::Faulted`].
    pub fn step<I, O>(&mut self, input: &mut I, output: &mut O) -> Result<Status, VMError>
    where
        I: Input + ?Sized,
        O: Output + ?Sized,
    {
        match self.status {
            Status::Halted => return Ok(Status::Halted),
            Status::Faulted => return Err(VMError::Faulted),
            Status::Ready => {}
        }

        match self.cycle(input, output) {
            Ok(status) => {
                self.status = status;
                Ok(status)
            }
            Err(e) => {
                self.status = Status::Faulted;
                Err(e)
            }
        }
    }

    fn cycle<I, O>(&mut self, input: &mut I, output: &mut O) -> Result<Status, VMError>
    where
        I: Input + ?Sized,
        O: Output + ?Sized,
    {
        if let Some(limit) = self.limits.max_steps
            && self.steps >= limit
        {
            return Err(VMError::StepLimitExceeded { limit });
        }

        let instruction = self.decode()?;
        let next = self
            .exec(&instruction, input, output)
            .inspect_err(|e| debug!("`{instruction}` at {} failed: {e}", instruction.position))?;
        self.steps += 1;

        match next {
            Next::FallThrough => {
                self.pc = instruction.fall_through();
                Ok(Status::Ready)
            }
            Next::Jump(target) => {
                self.pc = target;
                Ok(Status::Ready)
            }
            Next::Halt => Ok(Status::Halted),
        }
    }

    /// Decodes the instruction at the program counter without executing it.
    ///
    /// Reading the header and parameter cells may extend memory.
    pub fn decode(&mut self) -> Result<Instruction, VMError> {
        let position = self.pc;
        let header = self.memory.read(position)?;
        if header < 0 {
            return Err(VMError::InvalidInstruction {
                opcode: header,
                position,
            });
        }

        let opcode = Opcode::try_from(header % 100).map_err(|_| VMError::InvalidInstruction {
            opcode: header,
            position,
        })?;
        let modes = decode_modes(header, opcode.arity(), position)?;

        let mut params = Vec::with_capacity(modes.len());
        for (slot, mode) in modes.into_iter().enumerate() {
            let address = position + 1 + slot;
            params.push(Parameter {
                value: self.memory.read(address)?,
                address,
                mode,
            });
        }

        Ok(Instruction {
            opcode,
            position,
            params,
        })
    }

    /// Executes a decoded instruction.
    fn exec<I, O>(
        &mut self,
        instruction: &Instruction,
        input: &mut I,
        output: &mut O,
    ) -> Result<Next, VMError>
    where
        I: Input + ?Sized,
        O: Output + ?Sized,
    {
        exec_vm! {
            vm = self,
            input = input,
            output = output,
            instr = instruction,
            {
                Add => op_add(a: Read, b: Read, t: Write),
                Mul => op_mul(a: Read, b: Read, t: Write),
                In => op_in(input; t: Write),
                Out => op_out(output; a: Read),
                JumpIfTrue => op_jump_if_true(a: Read, b: Jump),
                JumpIfFalse => op_jump_if_false(a: Read, b: Jump),
                LessThan => op_less_than(a: Read, b: Read, t: Write),
                Equals => op_equals(a: Read, b: Read, t: Write),
                AdjustBase => op_adjust_base(a: Read),
                Halt => op_halt(),
            }
        }
    }

    /// Resolves a parameter to its effective value.
    fn load(&mut self, param: Parameter) -> Result<i64, VMError> {
        match param.mode {
            Mode::Immediate => Ok(param.value),
            Mode::Position => {
                let address = to_address(param.value, self.pc)?;
                self.memory.read(address)
            }
            Mode::Relative => {
                let address = to_address(self.relative_base.wrapping_add(param.value), self.pc)?;
                self.memory.read(address)
            }
        }
    }

    /// Resolves a write-target parameter to an address.
    fn target(&self, param: Parameter) -> Result<usize, VMError> {
        match param.mode {
            Mode::Position => to_address(param.value, self.pc),
            Mode::Relative => to_address(self.relative_base.wrapping_add(param.value), self.pc),
            Mode::Immediate if self.limits.strict_writes => {
                Err(VMError::ImmediateWrite { position: self.pc })
            }
            Mode::Immediate => Ok(param.address),
        }
    }

    /// Resolves a jump target parameter to an address.
    fn jump_target(&mut self, param: Parameter) -> Result<Next, VMError> {
        let target = self.load(param)?;
        Ok(Next::Jump(to_address(target, self.pc)?))
    }

    fn op_add(&mut self, a: i64, b: i64, dst: usize) -> Result<Next, VMError> {
        self.memory.write(dst, a.wrapping_add(b))?;
        Ok(Next::FallThrough)
    }

    fn op_mul(&mut self, a: i64, b: i64, dst: usize) -> Result<Next, VMError> {
        self.memory.write(dst, a.wrapping_mul(b))?;
        Ok(Next::FallThrough)
    }

    fn op_in<I: Input + ?Sized>(&mut self, input: &mut I, dst: usize) -> Result<Next, VMError> {
        let value = input.read()?;
        self.memory.write(dst, value)?;
        Ok(Next::FallThrough)
    }

    fn op_out<O: Output + ?Sized>(&mut self, output: &mut O, value: i64) -> Result<Next, VMError> {
        output.write(value)?;
        Ok(Next::FallThrough)
    }

    fn op_jump_if_true(&mut self, cond: i64, target: Parameter) -> Result<Next, VMError> {
        if cond != 0 {
            self.jump_target(target)
        } else {
            Ok(Next::FallThrough)
        }
    }

    fn op_jump_if_false(&mut self, cond: i64, target: Parameter) -> Result<Next, VMError> {
        if cond == 0 {
            self.jump_target(target)
        } else {
            Ok(Next::FallThrough)
        }
    }

    fn op_less_than(&mut self, a: i64, b: i64, dst: usize) -> Result<Next, VMError> {
        self.memory.write(dst, i64::from(a < b))?;
        Ok(Next::FallThrough)
    }

    fn op_equals(&mut self, a: i64, b: i64, dst: usize) -> Result<Next, VMError> {
        self.memory.write(dst, i64::from(a == b))?;
        Ok(Next::FallThrough)
    }

    fn op_adjust_base(&mut self, delta: i64) -> Result<Next, VMError> {
        self.relative_base = self.relative_base.wrapping_add(delta);
        Ok(Next::FallThrough)
    }

    fn op_halt(&mut self) -> Result<Next, VMError> {
        Ok(Next::Halt)
    }

    /// Returns the current memory contents.
    pub fn memory(&self) -> &[i64] {
        self.memory.as_slice()
    }

    /// Returns the address of the next instruction.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the number of retired instructions.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

//! A MIPS lexer, parser, assembler, and simulator.
//!
//! This is a small suite covering a reduced MIPS instruction set
//! (`add`, `j`, `beq`, `lw`, `sw`), from assembly text down to executed machine words.
//!
//! # Usage
//!
//! To convert MIPS source code to an object file, it must be parsed and assembled:
//! ```
//! use mips_ensemble::parse::parse_ast;
//! use mips_ensemble::asm::{assemble, ObjectFile};
//!
//! let code = "
//!     add $t1, $t2, $t3
//!     lw $t1, 0x30($zero)
//!     j 0
//! ";
//! let ast = parse_ast(code).unwrap();
//! let obj_file: ObjectFile = assemble(&ast).unwrap();
//! assert_eq!(obj_file.words(), [0x014B4820, 0x8C090030, 0x08000000]);
//! ```
//!
//! Once an object file has been created, it can be executed with the simulator:
//! ```
//! # // Parsing and assembling was shown in the previous example, so this doesn't need to be shown again.
//! # use mips_ensemble::parse::parse_ast;
//! # use mips_ensemble::asm::assemble;
//! #
//! # let code = "add $t1, $t2, $t3\nj 0";
//! # let obj_file = assemble(&parse_ast(code).unwrap()).unwrap();
//! #
//! use mips_ensemble::sim::Simulator;
//!
//! let mut simulator = Simulator::new(Default::default());
//! simulator.load_obj_file(&obj_file, 0).unwrap();
//! simulator.run_with_limit(100).unwrap(); // <-- Result can be handled accordingly
//! ```
//!
//! If more granularity is needed for simulation, there are also step-in and breakpoint functions.
//! See the [`sim`] module for more details.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod asm;
pub mod sim;
pub mod err;
pub mod isa;
